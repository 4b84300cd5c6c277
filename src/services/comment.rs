//! Comment service

use std::sync::Arc;

use crate::backend::repositories::CommentRepository;
use crate::models::{
    build_threads, AuthSession, Comment, CommentThread, CreateCommentInput, PagedResult,
    ADMIN_ROLES,
};
use crate::services::{require_roles, validation, ServiceError};

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    /// Threads for an article page; an unreachable backend shows no comments
    pub async fn threads(&self, article_id: &str) -> Vec<CommentThread> {
        match self.repo.list_for_article(article_id).await {
            Ok(comments) => build_threads(comments),
            Err(e) => {
                tracing::warn!(article_id, "Failed to load comments: {}", e);
                Vec::new()
            }
        }
    }

    /// Post a comment or a reply
    pub async fn create(
        &self,
        session: &AuthSession,
        article_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<Comment, ServiceError> {
        let content = content.trim();
        validation::validate_comment(content)?;

        let input = CreateCommentInput {
            article_id: article_id.to_string(),
            content: content.to_string(),
            parent_id: parent_id
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
        };
        let comment = self.repo.create(&session.token, &input).await?;
        tracing::debug!(comment_id = %comment.id, article_id, "Comment created");
        Ok(comment)
    }

    /// Delete a comment on `article_id`; only its author or an admin may
    pub async fn delete(
        &self,
        session: &AuthSession,
        article_id: &str,
        comment_id: &str,
    ) -> Result<(), ServiceError> {
        let comments = self.repo.list_for_article(article_id).await?;
        let comment = comments
            .iter()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| ServiceError::NotFound(format!("comment {}", comment_id)))?;

        let allowed = match comment.author_id() {
            Some(author) => session.user.can_delete_comment(author),
            None => session.user.is_admin(),
        };
        if !allowed {
            return Err(ServiceError::forbidden());
        }

        self.repo.delete(&session.token, comment_id).await?;
        Ok(())
    }

    /// Moderation delete, without looking the comment up first
    pub async fn delete_as_admin(
        &self,
        session: &AuthSession,
        comment_id: &str,
    ) -> Result<(), ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        self.repo.delete(&session.token, comment_id).await?;
        tracing::info!(comment_id, user_id = %session.user.id, "Comment removed by moderator");
        Ok(())
    }

    /// Every comment, newest pages first, for moderation
    pub async fn list_all(
        &self,
        session: &AuthSession,
        page: u32,
        limit: u32,
    ) -> Result<PagedResult<Comment>, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        Ok(self.repo.list_all(&session.token, page.max(1), limit).await?)
    }
}
