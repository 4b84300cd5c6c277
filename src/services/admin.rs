//! Admin back office: system stats and user moderation
//!
//! Role and status changes end the affected user's cached sessions so the
//! new permissions apply on their next request.

use std::sync::Arc;

use crate::backend::repositories::{StatsRepository, UserRepository};
use crate::cache::SharedCache;
use crate::models::{
    assignable_roles, AuthSession, PagedResult, Role, SystemStats, User, ADMIN_ROLES,
    SUPERADMIN_ROLES,
};
use crate::services::{require_roles, ServiceError};

/// Users per page in the user-management table
pub const USERS_PER_PAGE: u32 = 20;

pub struct AdminService {
    users: Arc<dyn UserRepository>,
    stats: Arc<dyn StatsRepository>,
    cache: SharedCache,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        stats: Arc<dyn StatsRepository>,
        cache: SharedCache,
    ) -> Self {
        Self { users, stats, cache }
    }

    /// Dashboard numbers; zeros when the backend cannot answer
    pub async fn stats(&self, session: &AuthSession) -> Result<SystemStats, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        Ok(self.stats.stats(&session.token).await.unwrap_or_else(|e| {
            tracing::warn!("Failed to load system stats: {}", e);
            SystemStats::default()
        }))
    }

    pub async fn users(
        &self,
        session: &AuthSession,
        page: u32,
        search: Option<&str>,
    ) -> Result<PagedResult<User>, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self
            .users
            .list(&session.token, page.max(1), USERS_PER_PAGE, search)
            .await?)
    }

    async fn target(&self, session: &AuthSession, id: &str) -> Result<User, ServiceError> {
        self.users
            .get_by_id(&session.token, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", id)))
    }

    async fn end_sessions(&self) {
        // Session keys hold tokens, not user ids, so every cached session goes.
        self.cache.delete_pattern("session:*").await;
    }

    pub async fn change_role(
        &self,
        session: &AuthSession,
        id: &str,
        role: Role,
    ) -> Result<User, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        let target = self.target(session, id).await?;
        if !assignable_roles(&session.user, &target).contains(&role) {
            return Err(ServiceError::forbidden());
        }

        let user = self.users.set_role(&session.token, id, role).await?;
        self.end_sessions().await;
        tracing::info!(
            target_id = %id,
            from = %target.role,
            to = %role,
            actor = %session.user.id,
            "User role changed"
        );
        Ok(user)
    }

    pub async fn set_active(
        &self,
        session: &AuthSession,
        id: &str,
        active: bool,
    ) -> Result<User, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        if session.user.id == id {
            return Err(ServiceError::Forbidden(
                "You cannot change the status of your own account.".to_string(),
            ));
        }
        let target = self.target(session, id).await?;
        if target.role == Role::Superadmin {
            return Err(ServiceError::forbidden());
        }

        let user = self.users.set_active(&session.token, id, active).await?;
        self.end_sessions().await;
        tracing::info!(target_id = %id, active, actor = %session.user.id, "User status changed");
        Ok(user)
    }

    pub async fn delete_user(&self, session: &AuthSession, id: &str) -> Result<(), ServiceError> {
        require_roles(session, SUPERADMIN_ROLES)?;
        if session.user.id == id {
            return Err(ServiceError::Forbidden(
                "You cannot delete your own account.".to_string(),
            ));
        }

        self.users.delete(&session.token, id).await?;
        self.end_sessions().await;
        tracing::info!(target_id = %id, actor = %session.user.id, "User deleted");
        Ok(())
    }
}
