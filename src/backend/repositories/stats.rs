//! Admin statistics repository

use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{BackendClient, BackendError};
use crate::models::SystemStats;

#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Site-wide counters
    async fn stats(&self, token: &str) -> Result<SystemStats, BackendError>;
}

/// HTTP stats repository
pub struct HttpStatsRepository {
    client: Arc<BackendClient>,
}

impl HttpStatsRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub fn boxed(client: Arc<BackendClient>) -> Arc<dyn StatsRepository> {
        Arc::new(Self::new(client))
    }
}

#[async_trait]
impl StatsRepository for HttpStatsRepository {
    async fn stats(&self, token: &str) -> Result<SystemStats, BackendError> {
        self.client.get("/api/admin/stats", Some(token)).await
    }
}
