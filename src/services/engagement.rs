//! Likes and saved articles

use std::sync::Arc;

use serde::Serialize;

use crate::backend::repositories::EngagementRepository;
use crate::models::{Article, AuthSession, LikeState};
use crate::services::ServiceError;

/// Result of a like click
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LikeOutcome {
    /// State shown before the backend answered
    pub optimistic: LikeState,
    /// Settled state: the backend's on success, the previous one on failure
    pub state: LikeState,
    /// Message for the reader when the backend call failed
    pub error: Option<String>,
}

impl LikeOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct EngagementService {
    repo: Arc<dyn EngagementRepository>,
}

impl EngagementService {
    pub fn new(repo: Arc<dyn EngagementRepository>) -> Self {
        Self { repo }
    }

    /// Flip the viewer's like, starting from the state the page showed
    pub async fn toggle_like(
        &self,
        session: &AuthSession,
        article_id: &str,
        current: LikeState,
    ) -> LikeOutcome {
        let optimistic = current.toggled();
        let result = self.repo.toggle_like(&session.token, article_id).await;
        let state = LikeState::reconcile(current, &result);

        let error = match result {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(article_id, user_id = %session.user.id, "Like failed: {}", e);
                Some(e.user_message())
            }
        };

        LikeOutcome {
            optimistic,
            state,
            error,
        }
    }

    /// Like state for the article page; unknown when the backend is down
    pub async fn like_status(
        &self,
        session: &AuthSession,
        article_id: &str,
        fallback_likes: u64,
    ) -> LikeState {
        self.repo
            .like_status(&session.token, article_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(article_id, "Failed to load like status: {}", e);
                LikeState::new(false, fallback_likes)
            })
    }

    /// The viewer's saved articles
    pub async fn saved(&self, session: &AuthSession) -> Vec<Article> {
        self.repo.saved(&session.token).await.unwrap_or_else(|e| {
            tracing::warn!(user_id = %session.user.id, "Failed to load saved articles: {}", e);
            Vec::new()
        })
    }

    pub async fn is_saved(&self, session: &AuthSession, article_id: &str) -> bool {
        self.saved(session).await.iter().any(|a| a.id == article_id)
    }

    pub async fn save(&self, session: &AuthSession, article_id: &str) -> Result<(), ServiceError> {
        self.repo.save(&session.token, article_id).await?;
        Ok(())
    }

    pub async fn unsave(&self, session: &AuthSession, article_id: &str) -> Result<(), ServiceError> {
        self.repo.unsave(&session.token, article_id).await?;
        Ok(())
    }
}
