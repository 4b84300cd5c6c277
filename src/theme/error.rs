//! Theme engine error types

use thiserror::Error;

/// Theme-specific errors
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Template not registered
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template parse or render error
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Override directory could not be read
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
