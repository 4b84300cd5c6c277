//! Article repository
//!
//! Article reads and writes against `/api/articles`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{optional, PageWire};
use crate::backend::{BackendClient, BackendError};
use crate::models::{Article, ArticleInput, ArticleStatus, ListParams, PagedResult};

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// List articles with filters and pagination
    async fn list(
        &self,
        params: &ListParams,
        token: Option<&str>,
    ) -> Result<PagedResult<Article>, BackendError>;

    /// Get article by slug
    async fn get_by_slug(&self, slug: &str, token: Option<&str>)
        -> Result<Option<Article>, BackendError>;

    /// Get article by ID
    async fn get_by_id(&self, id: &str, token: Option<&str>) -> Result<Option<Article>, BackendError>;

    /// Articles written by the signed-in user
    async fn list_mine(
        &self,
        token: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, BackendError>;

    /// Create a new article
    async fn create(&self, token: &str, input: &ArticleInput) -> Result<Article, BackendError>;

    /// Update an existing article
    async fn update(
        &self,
        token: &str,
        id: &str,
        input: &ArticleInput,
    ) -> Result<Article, BackendError>;

    /// Change publication status
    async fn set_status(
        &self,
        token: &str,
        id: &str,
        status: ArticleStatus,
    ) -> Result<Article, BackendError>;

    /// Delete an article
    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError>;
}

/// HTTP article repository
pub struct HttpArticleRepository {
    client: Arc<BackendClient>,
}

impl HttpArticleRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(client: Arc<BackendClient>) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(client))
    }
}

#[async_trait]
impl ArticleRepository for HttpArticleRepository {
    async fn list(
        &self,
        params: &ListParams,
        token: Option<&str>,
    ) -> Result<PagedResult<Article>, BackendError> {
        let wire: PageWire<Article> = self
            .client
            .get_query("/api/articles", params, token)
            .await?;
        Ok(wire.into_paged(params.page, params.limit))
    }

    async fn get_by_slug(
        &self,
        slug: &str,
        token: Option<&str>,
    ) -> Result<Option<Article>, BackendError> {
        let path = format!("/api/articles/slug/{}", urlencoding::encode(slug));
        optional(self.client.get(&path, token).await)
    }

    async fn get_by_id(&self, id: &str, token: Option<&str>) -> Result<Option<Article>, BackendError> {
        let path = format!("/api/articles/{}", urlencoding::encode(id));
        optional(self.client.get(&path, token).await)
    }

    async fn list_mine(
        &self,
        token: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, BackendError> {
        let wire: PageWire<Article> = self
            .client
            .get_query("/api/articles/mine", params, Some(token))
            .await?;
        Ok(wire.into_paged(params.page, params.limit))
    }

    async fn create(&self, token: &str, input: &ArticleInput) -> Result<Article, BackendError> {
        self.client.post("/api/articles", input, Some(token)).await
    }

    async fn update(
        &self,
        token: &str,
        id: &str,
        input: &ArticleInput,
    ) -> Result<Article, BackendError> {
        let path = format!("/api/articles/{}", urlencoding::encode(id));
        self.client.put(&path, input, Some(token)).await
    }

    async fn set_status(
        &self,
        token: &str,
        id: &str,
        status: ArticleStatus,
    ) -> Result<Article, BackendError> {
        let path = format!("/api/articles/{}/status", urlencoding::encode(id));
        self.client
            .patch(&path, &json!({ "status": status }), Some(token))
            .await
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let path = format!("/api/articles/{}", urlencoding::encode(id));
        self.client.delete(&path, Some(token)).await
    }
}
