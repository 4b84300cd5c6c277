//! User administration repository

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use super::{optional, PageWire};
use crate::backend::{BackendClient, BackendError};
use crate::models::{PagedResult, Role, User};

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// List users, optionally filtered by a search term
    async fn list(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<PagedResult<User>, BackendError>;

    /// Get user by ID
    async fn get_by_id(&self, token: &str, id: &str) -> Result<Option<User>, BackendError>;

    /// Change a user's role
    async fn set_role(&self, token: &str, id: &str, role: Role) -> Result<User, BackendError>;

    /// Activate or deactivate a user
    async fn set_active(&self, token: &str, id: &str, active: bool) -> Result<User, BackendError>;

    /// Delete a user
    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError>;
}

#[derive(Serialize)]
struct UserQuery<'a> {
    page: u32,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
}

/// HTTP user repository
pub struct HttpUserRepository {
    client: Arc<BackendClient>,
}

impl HttpUserRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub fn boxed(client: Arc<BackendClient>) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(client))
    }
}

#[async_trait]
impl UserRepository for HttpUserRepository {
    async fn list(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<PagedResult<User>, BackendError> {
        let query = UserQuery {
            page,
            limit,
            search,
        };
        let wire: PageWire<User> = self.client.get_query("/api/users", &query, Some(token)).await?;
        Ok(wire.into_paged(page, limit))
    }

    async fn get_by_id(&self, token: &str, id: &str) -> Result<Option<User>, BackendError> {
        let path = format!("/api/users/{}", urlencoding::encode(id));
        optional(self.client.get(&path, Some(token)).await)
    }

    async fn set_role(&self, token: &str, id: &str, role: Role) -> Result<User, BackendError> {
        let path = format!("/api/users/{}/role", urlencoding::encode(id));
        self.client
            .put(&path, &json!({ "role": role }), Some(token))
            .await
    }

    async fn set_active(&self, token: &str, id: &str, active: bool) -> Result<User, BackendError> {
        let path = format!("/api/users/{}/status", urlencoding::encode(id));
        self.client
            .put(&path, &json!({ "isActive": active }), Some(token))
            .await
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let path = format!("/api/users/{}", urlencoding::encode(id));
        self.client.delete(&path, Some(token)).await
    }
}
