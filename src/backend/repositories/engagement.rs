//! Likes and saved articles

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::backend::{BackendClient, BackendError};
use crate::models::{Article, LikeState};

/// Engagement repository trait
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Flip the viewer's like; returns the authoritative state
    async fn toggle_like(&self, token: &str, article_id: &str) -> Result<LikeState, BackendError>;

    /// Whether the viewer likes an article
    async fn like_status(&self, token: &str, article_id: &str) -> Result<LikeState, BackendError>;

    /// Articles the viewer saved
    async fn saved(&self, token: &str) -> Result<Vec<Article>, BackendError>;

    /// Save an article for later
    async fn save(&self, token: &str, article_id: &str) -> Result<(), BackendError>;

    /// Remove a saved article
    async fn unsave(&self, token: &str, article_id: &str) -> Result<(), BackendError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SavedList {
    Wrapped {
        #[serde(alias = "saved")]
        articles: Vec<Article>,
    },
    Bare(Vec<Article>),
}

/// HTTP engagement repository
pub struct HttpEngagementRepository {
    client: Arc<BackendClient>,
}

impl HttpEngagementRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub fn boxed(client: Arc<BackendClient>) -> Arc<dyn EngagementRepository> {
        Arc::new(Self::new(client))
    }
}

#[async_trait]
impl EngagementRepository for HttpEngagementRepository {
    async fn toggle_like(&self, token: &str, article_id: &str) -> Result<LikeState, BackendError> {
        let path = format!("/api/articles/{}/like", urlencoding::encode(article_id));
        self.client.post(&path, &json!({}), Some(token)).await
    }

    async fn like_status(&self, token: &str, article_id: &str) -> Result<LikeState, BackendError> {
        let path = format!("/api/articles/{}/like", urlencoding::encode(article_id));
        self.client.get(&path, Some(token)).await
    }

    async fn saved(&self, token: &str) -> Result<Vec<Article>, BackendError> {
        let list: SavedList = self.client.get("/api/saved", Some(token)).await?;
        Ok(match list {
            SavedList::Wrapped { articles } => articles,
            SavedList::Bare(articles) => articles,
        })
    }

    async fn save(&self, token: &str, article_id: &str) -> Result<(), BackendError> {
        let path = format!("/api/saved/{}", urlencoding::encode(article_id));
        let _: serde::de::IgnoredAny = self.client.post(&path, &json!({}), Some(token)).await?;
        Ok(())
    }

    async fn unsave(&self, token: &str, article_id: &str) -> Result<(), BackendError> {
        let path = format!("/api/saved/{}", urlencoding::encode(article_id));
        self.client.delete(&path, Some(token)).await
    }
}
