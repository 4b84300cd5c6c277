//! Authentication session model

use serde::{Deserialize, Serialize};

use super::User;

/// Token and user returned by the backend after login or registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    /// Bearer token for subsequent backend calls
    #[serde(alias = "accessToken")]
    pub token: String,
    /// Signed-in user
    pub user: User,
}
