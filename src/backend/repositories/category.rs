//! Category repository

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::{BackendClient, BackendError};
use crate::models::{Category, CategoryInput};

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// List all categories
    async fn list(&self) -> Result<Vec<Category>, BackendError>;

    /// Create a new category
    async fn create(&self, token: &str, input: &CategoryInput) -> Result<Category, BackendError>;

    /// Update a category
    async fn update(&self, token: &str, id: &str, input: &CategoryInput)
        -> Result<Category, BackendError>;

    /// Delete a category
    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryList {
    Wrapped { categories: Vec<Category> },
    Bare(Vec<Category>),
}

/// HTTP category repository
pub struct HttpCategoryRepository {
    client: Arc<BackendClient>,
}

impl HttpCategoryRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub fn boxed(client: Arc<BackendClient>) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(client))
    }
}

#[async_trait]
impl CategoryRepository for HttpCategoryRepository {
    async fn list(&self) -> Result<Vec<Category>, BackendError> {
        let list: CategoryList = self.client.get("/api/categories", None).await?;
        Ok(match list {
            CategoryList::Wrapped { categories } => categories,
            CategoryList::Bare(categories) => categories,
        })
    }

    async fn create(&self, token: &str, input: &CategoryInput) -> Result<Category, BackendError> {
        self.client.post("/api/categories", input, Some(token)).await
    }

    async fn update(
        &self,
        token: &str,
        id: &str,
        input: &CategoryInput,
    ) -> Result<Category, BackendError> {
        let path = format!("/api/categories/{}", urlencoding::encode(id));
        self.client.put(&path, input, Some(token)).await
    }

    async fn delete(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let path = format!("/api/categories/{}", urlencoding::encode(id));
        self.client.delete(&path, Some(token)).await
    }
}
