//! Cache layer
//!
//! Short stale-time windows over backend reads. Every entry expires on its
//! own; writes that change backend state invalidate matching keys by glob
//! pattern.
//!
//! # Usage
//!
//! ```rust,ignore
//! use newsroom::cache::{keys, create_cache};
//! use newsroom::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.set(&keys::article_slug("hello"), &article, Duration::from_secs(30)).await?;
//! cache.delete_pattern(keys::ARTICLE_LISTS).await;
//! ```

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache shared by all services
pub type SharedCache = Arc<MemoryCache>;

/// Create the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> SharedCache {
    tracing::info!(
        max_capacity = config.max_capacity,
        stale_seconds = config.stale_seconds,
        "Using in-memory cache"
    );
    Arc::new(MemoryCache::with_capacity(config.max_capacity))
}

/// Time windows applied to cached reads
#[derive(Debug, Clone, Copy)]
pub struct CacheWindows {
    /// Public listings and article pages
    pub stale: Duration,
    /// Session lookups
    pub session: Duration,
}

impl From<&CacheConfig> for CacheWindows {
    fn from(config: &CacheConfig) -> Self {
        Self {
            stale: Duration::from_secs(config.stale_seconds),
            session: Duration::from_secs(config.session_seconds),
        }
    }
}

/// Cache key layout
pub mod keys {
    /// Every cached article listing
    pub const ARTICLE_LISTS: &str = "articles:list:*";
    /// Every cached single article
    pub const ARTICLE_SLUGS: &str = "articles:slug:*";
    /// Category listing
    pub const CATEGORIES: &str = "categories:all";

    pub fn article_list(fragment: &str) -> String {
        format!("articles:list:{}", fragment)
    }

    pub fn article_slug(slug: &str) -> String {
        format!("articles:slug:{}", slug)
    }

    pub fn session(token: &str) -> String {
        format!("session:{}", token)
    }
}
