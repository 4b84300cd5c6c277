//! Auth repository
//!
//! Login, registration, session lookup and account self-service against
//! `/api/auth/*`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backend::{BackendClient, BackendError};
use crate::models::{AuthSession, User};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Some endpoints answer `{"user": {...}}`, others the bare user
#[derive(Deserialize)]
#[serde(untagged)]
enum UserBody {
    Wrapped { user: User },
    Bare(User),
}

impl From<UserBody> for User {
    fn from(body: UserBody) -> Self {
        match body {
            UserBody::Wrapped { user } => user,
            UserBody::Bare(user) => user,
        }
    }
}

/// Auth repository trait
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Exchange credentials for a session token
    async fn login(&self, request: &LoginRequest) -> Result<AuthSession, BackendError>;

    /// Create an account and sign it in
    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, BackendError>;

    /// Revoke a session token
    async fn logout(&self, token: &str) -> Result<(), BackendError>;

    /// User owning a session token
    async fn me(&self, token: &str) -> Result<User, BackendError>;

    /// Ask the backend to send a reset link
    async fn forgot_password(&self, email: &str) -> Result<(), BackendError>;

    /// Set a new password using a reset token
    async fn reset_password(&self, reset_token: &str, password: &str) -> Result<(), BackendError>;

    /// Update the signed-in user's profile
    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<User, BackendError>;

    /// Change the signed-in user's password
    async fn change_password(&self, token: &str, change: &PasswordChange) -> Result<(), BackendError>;
}

/// HTTP auth repository
pub struct HttpAuthRepository {
    client: Arc<BackendClient>,
}

impl HttpAuthRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(client: Arc<BackendClient>) -> Arc<dyn AuthRepository> {
        Arc::new(Self::new(client))
    }
}

#[async_trait]
impl AuthRepository for HttpAuthRepository {
    async fn login(&self, request: &LoginRequest) -> Result<AuthSession, BackendError> {
        self.client.post("/api/auth/login", request, None).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, BackendError> {
        self.client.post("/api/auth/register", request, None).await
    }

    async fn logout(&self, token: &str) -> Result<(), BackendError> {
        let _: serde::de::IgnoredAny = self
            .client
            .post("/api/auth/logout", &json!({}), Some(token))
            .await?;
        Ok(())
    }

    async fn me(&self, token: &str) -> Result<User, BackendError> {
        let body: UserBody = self.client.get("/api/auth/me", Some(token)).await?;
        Ok(body.into())
    }

    async fn forgot_password(&self, email: &str) -> Result<(), BackendError> {
        let _: serde::de::IgnoredAny = self
            .client
            .post("/api/auth/forgot-password", &json!({ "email": email }), None)
            .await?;
        Ok(())
    }

    async fn reset_password(&self, reset_token: &str, password: &str) -> Result<(), BackendError> {
        let _: serde::de::IgnoredAny = self
            .client
            .post(
                "/api/auth/reset-password",
                &json!({ "token": reset_token, "password": password }),
                None,
            )
            .await?;
        Ok(())
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<User, BackendError> {
        let body: UserBody = self
            .client
            .put("/api/auth/profile", update, Some(token))
            .await?;
        Ok(body.into())
    }

    async fn change_password(&self, token: &str, change: &PasswordChange) -> Result<(), BackendError> {
        let _: serde::de::IgnoredAny = self
            .client
            .put("/api/auth/password", change, Some(token))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::time::Duration;

    async fn spawn(router: Router) -> Arc<BackendClient> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Arc::new(
            BackendClient::with_timeout(&format!("http://{}", addr), Duration::from_secs(5))
                .unwrap(),
        )
    }

    fn user_json() -> serde_json::Value {
        json!({"_id": "u1", "name": "Ada", "email": "ada@example.com", "role": "WRITER"})
    }

    #[tokio::test]
    async fn test_login_and_me() {
        let router = Router::new()
            .route(
                "/api/auth/login",
                post(|Json(body): Json<LoginRequest>| async move {
                    if body.password == "secret123" {
                        (
                            StatusCode::OK,
                            Json(json!({"success": true, "data": {"token": "t1", "user": user_json()}})),
                        )
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({"message": "Invalid credentials"})),
                        )
                    }
                }),
            )
            .route(
                "/api/auth/me",
                get(|headers: HeaderMap| async move {
                    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                        Some("Bearer t1") => (StatusCode::OK, Json(json!({"user": user_json()}))),
                        _ => (StatusCode::UNAUTHORIZED, Json(json!({}))),
                    }
                }),
            );
        let repo = HttpAuthRepository::new(spawn(router).await);

        let session = repo
            .login(&LoginRequest {
                email: "ada@example.com".into(),
                password: "secret123".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.token, "t1");
        assert_eq!(session.user.role, crate::models::Role::Writer);

        let err = repo
            .login(&LoginRequest {
                email: "ada@example.com".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        let me = repo.me("t1").await.unwrap();
        assert_eq!(me.id, "u1");
        assert!(repo.me("bad").await.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn test_forgot_password_accepts_empty_response() {
        let router = Router::new().route(
            "/api/auth/forgot-password",
            post(|| async { StatusCode::NO_CONTENT }),
        );
        let repo = HttpAuthRepository::new(spawn(router).await);
        repo.forgot_password("ada@example.com").await.unwrap();
    }
}
