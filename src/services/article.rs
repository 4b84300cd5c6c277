//! Article service
//!
//! Public listings and article pages (cached for the stale window), the
//! writer's own articles, and moderation. Premium articles show only their
//! excerpt to readers without a subscription.

use std::sync::Arc;

use serde::Serialize;

use crate::backend::repositories::ArticleRepository;
use crate::cache::{keys, CacheWindows, SharedCache};
use crate::models::{
    Article, ArticleInput, ArticleStatus, AuthSession, ListParams, PagedResult, ADMIN_ROLES,
    WRITER_ROLES,
};
use crate::services::markdown::ContentRenderer;
use crate::services::{require_roles, validation, ServiceError};

/// Length of excerpts derived from article bodies
pub const EXCERPT_LENGTH: usize = 200;

/// Most articles listed in the sitemap
pub const SITEMAP_LIMIT: usize = 1000;

/// An article prepared for the reader page
#[derive(Debug, Clone, Serialize)]
pub struct ArticleView {
    pub article: Article,
    /// Rendered body, or the excerpt when `locked`
    pub html: String,
    pub reading_minutes: u32,
    /// Premium article shown to a reader without access
    pub locked: bool,
    /// Viewer may edit or delete this article
    pub can_edit: bool,
}

/// Article service
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    cache: SharedCache,
    windows: CacheWindows,
    renderer: Arc<ContentRenderer>,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        cache: SharedCache,
        windows: CacheWindows,
        renderer: Arc<ContentRenderer>,
    ) -> Self {
        Self {
            repo,
            cache,
            windows,
            renderer,
        }
    }

    /// Published articles for public pages.
    ///
    /// Cached per filter set; an unreachable backend yields an empty page.
    pub async fn list_published(&self, params: ListParams) -> PagedResult<Article> {
        let params = params.with_status(ArticleStatus::Published);
        let key = keys::article_list(&params.cache_key());

        if let Ok(Some(cached)) = self.cache.get::<PagedResult<Article>>(&key).await {
            return cached;
        }

        match self.repo.list(&params, None).await {
            Ok(page) => {
                if let Err(e) = self.cache.set(&key, &page, self.windows.stale).await {
                    tracing::warn!("Failed to cache article list: {}", e);
                }
                page
            }
            Err(e) => {
                tracing::warn!("Failed to list articles: {}", e);
                PagedResult::empty(params.page)
            }
        }
    }

    async fn published_by_slug(&self, slug: &str) -> Result<Option<Article>, ServiceError> {
        let key = keys::article_slug(slug);
        if let Ok(Some(cached)) = self.cache.get::<Article>(&key).await {
            return Ok(Some(cached));
        }

        let article = self.repo.get_by_slug(slug, None).await?;
        if let Some(article) = article.as_ref().filter(|a| a.is_published()) {
            if let Err(e) = self.cache.set(&key, article, self.windows.stale).await {
                tracing::warn!("Failed to cache article: {}", e);
            }
        }
        Ok(article)
    }

    /// Article page for `slug`, as the viewer is allowed to see it.
    ///
    /// Unpublished articles are visible only to people who may edit them.
    pub async fn get_for_reader(
        &self,
        slug: &str,
        viewer: Option<&AuthSession>,
    ) -> Result<Option<ArticleView>, ServiceError> {
        let mut article = self.published_by_slug(slug).await?;

        if article.as_ref().map_or(true, |a| !a.is_published()) {
            if let Some(session) = viewer {
                article = self.repo.get_by_slug(slug, Some(&session.token)).await?;
            }
        }

        let Some(article) = article else {
            return Ok(None);
        };

        let can_edit = viewer.map_or(false, |s| {
            article
                .author_id()
                .map_or(s.user.is_admin(), |author| s.user.can_edit_article(author))
        });
        if !article.is_published() && !can_edit {
            return Ok(None);
        }

        let locked = article.premium
            && !can_edit
            && !viewer.map_or(false, |s| s.user.can_read_premium());

        let html = if locked {
            let teaser = article
                .excerpt
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| self.renderer.excerpt(&article.content, EXCERPT_LENGTH));
            format!("<p>{}</p>", crate::services::embed::escape_attr(&teaser))
        } else {
            self.renderer.render(&article.content)
        };

        Ok(Some(ArticleView {
            reading_minutes: self.renderer.reading_time(&article.content),
            html,
            locked,
            can_edit,
            article,
        }))
    }

    /// Articles written by the viewer
    pub async fn list_mine(
        &self,
        session: &AuthSession,
        page: u32,
        limit: u32,
    ) -> Result<PagedResult<Article>, ServiceError> {
        require_roles(session, WRITER_ROLES)?;
        Ok(self
            .repo
            .list_mine(&session.token, &ListParams::new(page, limit))
            .await?)
    }

    /// Article loaded for the editor; only its author or an admin may edit
    pub async fn get_for_edit(
        &self,
        session: &AuthSession,
        id: &str,
    ) -> Result<Article, ServiceError> {
        require_roles(session, WRITER_ROLES)?;
        let article = self
            .repo
            .get_by_id(id, Some(&session.token))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("article {}", id)))?;

        if !Self::may_edit(session, &article) {
            return Err(ServiceError::forbidden());
        }
        Ok(article)
    }

    fn may_edit(session: &AuthSession, article: &Article) -> bool {
        match article.author_id() {
            Some(author) => session.user.can_edit_article(author),
            None => session.user.is_admin(),
        }
    }

    fn prepare(&self, mut input: ArticleInput) -> Result<ArticleInput, ServiceError> {
        input.title = input.title.trim().to_string();
        input.excerpt = input
            .excerpt
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        input.cover_image = input
            .cover_image
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        validation::validate_article(&input)?;

        if input.excerpt.is_none() {
            input.excerpt = Some(self.renderer.excerpt(&input.content, EXCERPT_LENGTH));
        }
        Ok(input)
    }

    async fn invalidate(&self, slugs: &[&str]) {
        self.cache.delete_pattern(keys::ARTICLE_LISTS).await;
        for slug in slugs {
            self.cache.delete(&keys::article_slug(slug)).await;
        }
    }

    pub async fn create(
        &self,
        session: &AuthSession,
        input: ArticleInput,
    ) -> Result<Article, ServiceError> {
        require_roles(session, WRITER_ROLES)?;
        let input = self.prepare(input)?;

        let article = self.repo.create(&session.token, &input).await?;
        self.invalidate(&[&article.slug]).await;
        tracing::info!(article_id = %article.id, user_id = %session.user.id, "Article created");
        Ok(article)
    }

    pub async fn update(
        &self,
        session: &AuthSession,
        id: &str,
        input: ArticleInput,
    ) -> Result<Article, ServiceError> {
        let existing = self.get_for_edit(session, id).await?;
        let input = self.prepare(input)?;

        let article = self.repo.update(&session.token, id, &input).await?;
        self.invalidate(&[&existing.slug, &article.slug]).await;
        tracing::info!(article_id = %id, user_id = %session.user.id, "Article updated");
        Ok(article)
    }

    pub async fn delete(&self, session: &AuthSession, id: &str) -> Result<(), ServiceError> {
        let existing = self.get_for_edit(session, id).await?;
        self.repo.delete(&session.token, id).await?;
        self.invalidate(&[&existing.slug]).await;
        tracing::info!(article_id = %id, user_id = %session.user.id, "Article deleted");
        Ok(())
    }

    /// Moderation: change publication status
    pub async fn set_status(
        &self,
        session: &AuthSession,
        id: &str,
        status: ArticleStatus,
    ) -> Result<Article, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        let article = self.repo.set_status(&session.token, id, status).await?;
        self.invalidate(&[&article.slug]).await;
        tracing::info!(article_id = %id, status = %status, "Article status changed");
        Ok(article)
    }

    /// Moderation: every article regardless of status
    pub async fn list_admin(
        &self,
        session: &AuthSession,
        params: ListParams,
    ) -> Result<PagedResult<Article>, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        Ok(self.repo.list(&params, Some(&session.token)).await?)
    }

    /// Editor preview of unsaved markdown
    pub fn preview(&self, markdown: &str) -> String {
        self.renderer.render(markdown)
    }

    /// Published articles for the sitemap, newest pages first
    pub async fn sitemap_articles(&self) -> Vec<Article> {
        let mut articles = Vec::new();
        let mut page = 1;

        while articles.len() < SITEMAP_LIMIT {
            let result = self.list_published(ListParams::new(page, 100)).await;
            let done = !result.has_next() || result.is_empty();
            articles.extend(result.items);
            if done {
                break;
            }
            page += 1;
        }

        articles.truncate(SITEMAP_LIMIT);
        articles
    }
}
