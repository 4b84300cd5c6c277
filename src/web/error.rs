//! Web error handling
//!
//! Handlers return [`WebError`]; its response carries an [`ErrorPage`]
//! extension that [`render_error_pages`] turns into the themed error page.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tera::Context as TeraContext;

use crate::services::ServiceError;
use crate::web::middleware::{AppState, Viewer};
use crate::web::session;
use crate::web::view::Page;

/// Error returned by page handlers
#[derive(Debug)]
pub enum WebError {
    /// Show the error page with this status and message
    Page { status: StatusCode, message: String },
    /// The backend rejected the session; sign in again
    LoginRequired,
}

/// Marker left on error responses for [`render_error_pages`]
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        WebError::Page {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "The requested item could not be found.")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::Page { status, .. } => *status,
            WebError::LoginRequired => StatusCode::SEE_OTHER,
        }
    }
}

/// HTTP status for a failed service call
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ServiceError::Backend(backend) => match backend.status_code() {
            Some(status) if (400..500).contains(&status) => {
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

/// Status and page-level message for a failed form submission.
///
/// Validation failures carry no page message; their field errors are
/// shown next to the inputs.
pub fn form_failure(err: &ServiceError) -> (StatusCode, Option<String>) {
    match err {
        ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, None),
        other => (status_for(other), Some(other.user_message())),
    }
}

/// The backend no longer accepts the viewer's token
pub fn requires_login(err: &ServiceError) -> bool {
    matches!(err, ServiceError::Backend(backend) if backend.is_unauthorized())
}

impl From<ServiceError> for WebError {
    fn from(err: ServiceError) -> Self {
        if requires_login(&err) {
            return WebError::LoginRequired;
        }

        let status = status_for(&err);
        if status == StatusCode::BAD_GATEWAY {
            tracing::error!("Backend call failed: {}", err);
        }
        WebError::Page {
            status,
            message: err.user_message(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::Page { status, message } => {
                let mut response = (status, message.clone()).into_response();
                response
                    .extensions_mut()
                    .insert(ErrorPage { status, message });
                response
            }
            WebError::LoginRequired => (
                [(header::SET_COOKIE, session::clear_cookie())],
                Redirect::to("/login"),
            )
                .into_response(),
        }
    }
}

/// Render the error template for responses marked with [`ErrorPage`]
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let viewer = request
        .extensions()
        .get::<Viewer>()
        .cloned()
        .unwrap_or_default();
    let headers = request.headers().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let Some(error) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let page = Page::new(&state, &viewer, &headers, &path);
    let mut context = TeraContext::new();
    context.insert("status", &error.status.as_u16());
    context.insert("error_message", &error.message);
    page.render_status(error.status, "error.html", &context)
}

/// Router fallback
pub async fn not_found() -> WebError {
    WebError::new(StatusCode::NOT_FOUND, "The page you are looking for does not exist.")
}
