//! Comment repository

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::PageWire;
use crate::backend::{BackendClient, BackendError};
use crate::models::{Comment, CreateCommentInput, PagedResult};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// All comments on an article, flat
    async fn list_for_article(&self, article_id: &str) -> Result<Vec<Comment>, BackendError>;

    /// Post a comment
    async fn create(&self, token: &str, input: &CreateCommentInput) -> Result<Comment, BackendError>;

    /// Delete a comment
    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError>;

    /// Every comment on the site, newest first (moderation)
    async fn list_all(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> Result<PagedResult<Comment>, BackendError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommentList {
    Wrapped { comments: Vec<Comment> },
    Bare(Vec<Comment>),
}

/// HTTP comment repository
pub struct HttpCommentRepository {
    client: Arc<BackendClient>,
}

impl HttpCommentRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub fn boxed(client: Arc<BackendClient>) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(client))
    }
}

#[async_trait]
impl CommentRepository for HttpCommentRepository {
    async fn list_for_article(&self, article_id: &str) -> Result<Vec<Comment>, BackendError> {
        let path = format!("/api/comments/{}", urlencoding::encode(article_id));
        let list: CommentList = self.client.get(&path, None).await?;
        Ok(match list {
            CommentList::Wrapped { comments } => comments,
            CommentList::Bare(comments) => comments,
        })
    }

    async fn create(&self, token: &str, input: &CreateCommentInput) -> Result<Comment, BackendError> {
        self.client.post("/api/comments", input, Some(token)).await
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let path = format!("/api/comments/{}", urlencoding::encode(id));
        self.client.delete(&path, Some(token)).await
    }

    async fn list_all(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> Result<PagedResult<Comment>, BackendError> {
        let wire: PageWire<Comment> = self
            .client
            .get_query("/api/comments", &[("page", page), ("limit", limit)], Some(token))
            .await?;
        Ok(wire.into_paged(page, limit))
    }
}
