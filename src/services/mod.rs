//! Services layer
//!
//! Everything between a route handler and the backend:
//! - Form validation before a request leaves the process
//! - Role checks for actions the viewer asks for
//! - Short-lived caching of backend reads
//! - Shaping backend data for templates, degrading to empty values when
//!   the backend cannot be reached

pub mod admin;
pub mod article;
pub mod auth;
pub mod category;
pub mod comment;
pub mod embed;
pub mod engagement;
pub mod markdown;
pub mod rate_limiter;
pub mod validation;

pub use admin::AdminService;
pub use article::{ArticleService, ArticleView};
pub use auth::AuthService;
pub use category::CategoryService;
pub use comment::CommentService;
pub use engagement::{EngagementService, LikeOutcome};
pub use markdown::ContentRenderer;
pub use rate_limiter::LoginRateLimiter;
pub use validation::{slugify, ValidationErrors};

use crate::backend::BackendError;
use crate::models::{AuthSession, Role};

/// Errors returned by services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Form input failed validation
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The viewer's role does not allow the action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The target does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Too many attempts
    #[error("rate limited")]
    RateLimited,

    /// The backend call failed
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl ServiceError {
    /// A single-field validation error
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        ServiceError::Validation(errors)
    }

    pub fn forbidden() -> Self {
        ServiceError::Forbidden("You do not have permission to do that.".to_string())
    }

    /// Message safe to show to the person using the site
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(errors) => errors
                .first_message()
                .unwrap_or("Please check the form and try again.")
                .to_string(),
            ServiceError::Forbidden(message) => message.clone(),
            ServiceError::NotFound(_) => "The requested item could not be found.".to_string(),
            ServiceError::RateLimited => {
                "Too many attempts. Please wait a few minutes and try again.".to_string()
            }
            ServiceError::Backend(err) => err.user_message(),
        }
    }

    /// Field errors, when this is a validation failure
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ServiceError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Fail with `Forbidden` unless the viewer holds one of `roles`
pub fn require_roles(session: &AuthSession, roles: &[Role]) -> Result<(), ServiceError> {
    if session.user.has_any_role(roles) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %session.user.id,
            role = %session.user.role,
            "Role check failed"
        );
        Err(ServiceError::forbidden())
    }
}
