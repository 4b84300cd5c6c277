//! Backend error types
//!
//! Every failed call to the backend API ends up as a [`BackendError`].
//! Pages never show these directly; they show [`BackendError::user_message`].

use thiserror::Error;

/// Errors returned by the backend client
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request did not complete within the configured timeout
    #[error("backend request timed out")]
    Timeout,

    /// The backend could not be reached
    #[error("backend unavailable")]
    Unavailable,

    /// The backend answered with a non-success status
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    /// Any other transport failure
    #[error("backend request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl BackendError {
    /// Build a status error
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        BackendError::Status {
            status,
            message: message.into(),
        }
    }

    /// Classify a transport error from reqwest
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_connect() {
            BackendError::Unavailable
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Request(err)
        }
    }

    /// HTTP status reported by the backend, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    /// Message safe to show to the person using the site
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Timeout | BackendError::Unavailable | BackendError::Request(_) => {
                "Unable to reach the server. Please try again later.".to_string()
            }
            BackendError::Decode(_) => {
                "The server ran into a problem. Please try again later.".to_string()
            }
            BackendError::Status { status, message } => {
                let backend_message = Some(message.trim()).filter(|m| !m.is_empty());
                match status {
                    400 | 422 => backend_message
                        .unwrap_or("Please check the form and try again.")
                        .to_string(),
                    401 => "Your session has expired. Please log in again.".to_string(),
                    403 => "You do not have permission to do that.".to_string(),
                    404 => "The requested item could not be found.".to_string(),
                    409 => backend_message
                        .unwrap_or("That item already exists.")
                        .to_string(),
                    413 => "The file is too large.".to_string(),
                    429 => "Too many requests. Please slow down.".to_string(),
                    s if *s >= 500 => {
                        "The server ran into a problem. Please try again later.".to_string()
                    }
                    _ => "Something went wrong. Please try again.".to_string(),
                }
            }
        }
    }
}
