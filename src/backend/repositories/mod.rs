//! Backend repositories
//!
//! One trait per backend resource, each with an HTTP implementation that
//! talks to the backend through [`BackendClient`]. Services hold the traits
//! as `Arc<dyn ...>` so tests can swap in an in-memory backend.

pub mod article;
pub mod auth;
pub mod category;
pub mod comment;
pub mod engagement;
pub mod media;
pub mod stats;
pub mod user;

pub use article::{ArticleRepository, HttpArticleRepository};
pub use auth::{
    AuthRepository, HttpAuthRepository, LoginRequest, PasswordChange, ProfileUpdate,
    RegisterRequest,
};
pub use category::{CategoryRepository, HttpCategoryRepository};
pub use comment::{CommentRepository, HttpCommentRepository};
pub use engagement::{EngagementRepository, HttpEngagementRepository};
pub use media::{HttpMediaRepository, MediaRepository, UploadedMedia};
pub use stats::{HttpStatsRepository, StatsRepository};
pub use user::{HttpUserRepository, UserRepository};

use std::sync::Arc;

use serde::Deserialize;

use super::{BackendClient, BackendError};
use crate::models::PagedResult;

/// Every repository the application uses, bundled for wiring
#[derive(Clone)]
pub struct Repositories {
    pub auth: Arc<dyn AuthRepository>,
    pub articles: Arc<dyn ArticleRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub engagement: Arc<dyn EngagementRepository>,
    pub users: Arc<dyn UserRepository>,
    pub stats: Arc<dyn StatsRepository>,
    pub media: Arc<dyn MediaRepository>,
}

impl Repositories {
    /// HTTP-backed repositories sharing one client
    pub fn http(client: Arc<BackendClient>) -> Self {
        Self {
            auth: HttpAuthRepository::boxed(client.clone()),
            articles: HttpArticleRepository::boxed(client.clone()),
            comments: HttpCommentRepository::boxed(client.clone()),
            categories: HttpCategoryRepository::boxed(client.clone()),
            engagement: HttpEngagementRepository::boxed(client.clone()),
            users: HttpUserRepository::boxed(client.clone()),
            stats: HttpStatsRepository::boxed(client.clone()),
            media: HttpMediaRepository::boxed(client),
        }
    }
}

/// Turn a 404 on a single-item read into `Ok(None)`
pub(crate) fn optional<T>(result: Result<T, BackendError>) -> Result<Option<T>, BackendError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Paginated list as the backend sends it.
///
/// Items may be under `items`, `data`, or a resource-named key, and the
/// counters either at the top level or inside a `pagination` object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageWire<T> {
    #[serde(
        alias = "data",
        alias = "articles",
        alias = "comments",
        alias = "users"
    )]
    items: Vec<T>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default, alias = "pages")]
    total_pages: Option<u32>,
    #[serde(default)]
    pagination: Option<PaginationWire>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationWire {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default, alias = "pages")]
    total_pages: Option<u32>,
}

impl<T> PageWire<T> {
    /// Fill in whatever the backend left out from the request parameters
    pub(crate) fn into_paged(self, page: u32, limit: u32) -> PagedResult<T> {
        let pagination = self.pagination.unwrap_or_default();
        let total = self
            .total
            .or(pagination.total)
            .unwrap_or(self.items.len() as u64);
        let page = self.page.or(pagination.page).unwrap_or(page);

        let mut result = PagedResult::new(self.items, total, page, limit);
        if let Some(pages) = self.total_pages.or(pagination.total_pages) {
            result.total_pages = pages;
        }
        result
    }
}
