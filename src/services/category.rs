//! Category service
//!
//! The category list appears on nearly every page, so it is cached for the
//! stale window and cleared whenever an administrator changes it.

use std::sync::Arc;

use crate::backend::repositories::CategoryRepository;
use crate::cache::{keys, CacheWindows, SharedCache};
use crate::models::{AuthSession, Category, CategoryInput, ADMIN_ROLES};
use crate::services::{require_roles, slugify, validation, ServiceError};

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: SharedCache,
    windows: CacheWindows,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: SharedCache, windows: CacheWindows) -> Self {
        Self {
            repo,
            cache,
            windows,
        }
    }

    /// All categories, empty when the backend cannot be reached
    pub async fn list(&self) -> Vec<Category> {
        if let Ok(Some(cached)) = self.cache.get::<Vec<Category>>(keys::CATEGORIES).await {
            return cached;
        }

        match self.repo.list().await {
            Ok(categories) => {
                if let Err(e) = self
                    .cache
                    .set(keys::CATEGORIES, &categories, self.windows.stale)
                    .await
                {
                    tracing::warn!("Failed to cache categories: {}", e);
                }
                categories
            }
            Err(e) => {
                tracing::warn!("Failed to list categories: {}", e);
                Vec::new()
            }
        }
    }

    /// Look a category up by slug; categories without one match on their name
    pub async fn find_by_slug(&self, slug: &str) -> Option<Category> {
        self.list().await.into_iter().find(|c| {
            if c.slug.is_empty() {
                slugify(&c.name) == slug
            } else {
                c.slug == slug
            }
        })
    }

    fn prepare(
        name: &str,
        slug: Option<&str>,
        description: Option<&str>,
    ) -> Result<CategoryInput, ServiceError> {
        let name = name.trim();
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        validation::validate_category(name, description)?;

        let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(given) => slugify(given),
            None => slugify(name),
        };
        if slug.is_empty() {
            return Err(ServiceError::invalid(
                "slug",
                "Slug must contain at least one letter or digit.",
            ));
        }

        Ok(CategoryInput {
            name: name.to_string(),
            slug,
            description: description.map(String::from),
        })
    }

    async fn invalidate(&self) {
        self.cache.delete(keys::CATEGORIES).await;
        self.cache.delete_pattern(keys::ARTICLE_LISTS).await;
        self.cache.delete_pattern(keys::ARTICLE_SLUGS).await;
    }

    pub async fn create(
        &self,
        session: &AuthSession,
        name: &str,
        slug: Option<&str>,
        description: Option<&str>,
    ) -> Result<Category, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        let input = Self::prepare(name, slug, description)?;

        let category = self.repo.create(&session.token, &input).await?;
        self.invalidate().await;
        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn update(
        &self,
        session: &AuthSession,
        id: &str,
        name: &str,
        slug: Option<&str>,
        description: Option<&str>,
    ) -> Result<Category, ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        let input = Self::prepare(name, slug, description)?;

        let category = self.repo.update(&session.token, id, &input).await?;
        self.invalidate().await;
        tracing::info!(category_id = %id, "Category updated");
        Ok(category)
    }

    pub async fn delete(&self, session: &AuthSession, id: &str) -> Result<(), ServiceError> {
        require_roles(session, ADMIN_ROLES)?;
        self.repo.delete(&session.token, id).await?;
        self.invalidate().await;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::cache::MemoryCache;
    use crate::config::CacheConfig;
    use crate::models::Role;
    use crate::testing::{Failure, FakeBackend};

    fn service(backend: &Arc<FakeBackend>) -> CategoryService {
        CategoryService::new(
            backend.clone(),
            Arc::new(MemoryCache::new()),
            CacheWindows::from(&CacheConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_list_is_cached() {
        let backend = FakeBackend::new();
        backend.add_category("1", "Tech", "tech");
        let service = service(&backend);

        assert_eq!(service.list().await.len(), 1);
        assert_eq!(service.list().await.len(), 1);
        assert_eq!(backend.calls("categories.list"), 1);
    }

    #[tokio::test]
    async fn test_list_degrades_to_empty() {
        let backend = FakeBackend::new();
        backend.fail_with(Some(Failure::Unavailable));
        assert!(service(&backend).list().await.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_slug_falls_back_to_name() {
        let backend = FakeBackend::new();
        backend.add_category("1", "Tech", "tech");
        backend.add_category("2", "World News", "");
        let service = service(&backend);

        assert_eq!(service.find_by_slug("tech").await.unwrap().id, "1");
        assert_eq!(service.find_by_slug("world-news").await.unwrap().id, "2");
        assert!(service.find_by_slug("sport").await.is_none());
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_invalidates() {
        let backend = FakeBackend::new();
        let admin = backend.add_user("a", Role::Admin, "pw");
        let service = service(&backend);

        assert!(service.list().await.is_empty());
        let category = service
            .create(&admin, "  Local Politics ", None, Some("  "))
            .await
            .unwrap();
        assert_eq!(category.slug, "local-politics");
        assert_eq!(category.description, None);
        assert_eq!(service.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rules() {
        let backend = FakeBackend::new();
        let admin = backend.add_user("a", Role::Admin, "pw");
        let writer = backend.add_user("w", Role::Writer, "pw");
        backend.add_category("1", "Tech", "tech");
        let service = service(&backend);

        assert!(matches!(
            service.create(&writer, "Science", None, None).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service.create(&admin, "X", None, None).await,
            Err(ServiceError::Validation(_))
        ));
        let err = service
            .create(&admin, "Science", Some("!!!"), None)
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().get("slug").is_some());

        let err = service.create(&admin, "Tech", None, None).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Backend(BackendError::Status { status: 409, .. })
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let backend = FakeBackend::new();
        let admin = backend.add_user("a", Role::Superadmin, "pw");
        backend.add_category("1", "Tech", "tech");
        let service = service(&backend);

        let updated = service
            .update(&admin, "1", "Technology", Some("Tech Stuff"), Some("Gadgets"))
            .await
            .unwrap();
        assert_eq!(updated.slug, "tech-stuff");
        assert_eq!(updated.description.as_deref(), Some("Gadgets"));

        service.delete(&admin, "1").await.unwrap();
        assert!(service.list().await.is_empty());
    }
}
