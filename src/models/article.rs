//! Article model
//!
//! This module provides:
//! - `Article` as decoded from the backend
//! - `ArticleStatus` enum for publication states
//! - `ArticleInput` sent when creating or updating
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

/// Article as shown to readers and writers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Backend identifier
    #[serde(alias = "_id", deserialize_with = "super::de_id")]
    pub id: String,
    /// Article title
    pub title: String,
    /// URL-friendly slug
    pub slug: String,
    /// Short summary
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Markdown body
    #[serde(default)]
    pub content: String,
    /// Cover image URL
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Category the article is filed under
    #[serde(default)]
    pub category: Option<Category>,
    /// Author summary
    #[serde(default)]
    pub author: Option<AuthorSummary>,
    /// Publication status
    #[serde(default)]
    pub status: ArticleStatus,
    /// Whether the full body is reserved for subscribers
    #[serde(default, alias = "isPremium")]
    pub premium: bool,
    /// Like count
    #[serde(default, alias = "likeCount")]
    pub likes: u64,
    /// View count
    #[serde(default, alias = "viewCount")]
    pub views: u64,
    /// Comment count
    #[serde(default)]
    pub comment_count: u64,
    /// Publication timestamp
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Identifier of the author, if the backend embedded one
    pub fn author_id(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.id.as_str())
    }

    /// Whether readers can see the article
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }

    /// Most relevant timestamp for listings and the sitemap
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.published_at).or(self.created_at)
    }
}

/// Embedded author info
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorSummary {
    #[serde(alias = "_id", deserialize_with = "super::de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Article publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArticleStatus {
    /// Draft - not visible to public
    #[default]
    #[serde(alias = "draft")]
    Draft,
    /// Published - visible to public
    #[serde(alias = "published")]
    Published,
    /// Archived - hidden but not deleted
    #[serde(alias = "archived")]
    Archived,
}

impl ArticleStatus {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "DRAFT",
            ArticleStatus::Published => "PUBLISHED",
            ArticleStatus::Archived => "ARCHIVED",
        }
    }

    /// Parse a status from form input (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(ArticleStatus::Draft),
            "published" => Some(ArticleStatus::Published),
            "archived" => Some(ArticleStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body sent to the backend when creating or updating an article
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub category_id: String,
    pub status: ArticleStatus,
    pub premium: bool,
}

/// Query parameters for article listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
    /// Category slug filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-text search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Status filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
    /// Author filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            category: None,
            search: None,
            status: None,
            author: None,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, 100),
            ..Default::default()
        }
    }

    /// Restrict to a category slug
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restrict to a search term (blank terms are ignored)
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        let trimmed = search.trim();
        self.search = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Restrict to a status
    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Stable cache key fragment for these parameters
    ///
    /// Free-text fields are percent-encoded so a `:` inside one cannot
    /// shift the boundaries between fields.
    pub fn cache_key(&self) -> String {
        let field = |value: Option<&str>| urlencoding::encode(value.unwrap_or("")).into_owned();
        format!(
            "p{}:l{}:c{}:s{}:st{}:a{}",
            self.page,
            self.limit,
            field(self.category.as_deref()),
            field(self.search.as_deref()),
            self.status.map(|s| s.as_str()).unwrap_or(""),
            field(self.author.as_deref()),
        )
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of pages
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    /// Create a paginated result, deriving the page count from the total
    pub fn new(items: Vec<T>, total: u64, page: u32, per_page: u32) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page as u64) as u32
        };
        Self {
            items,
            total,
            page: page.max(1),
            total_pages,
        }
    }

    /// An empty page, used when the backend cannot be reached
    pub fn empty(page: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: page.max(1),
            total_pages: 0,
        }
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Transform the items, keeping the paging info
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self::empty(1)
    }
}

#[cfg(test)]
pub(crate) fn test_article(id: &str, slug: &str, author_id: &str) -> Article {
    Article {
        id: id.to_string(),
        title: format!("Article {}", id),
        slug: slug.to_string(),
        excerpt: Some("A short summary".to_string()),
        content: "# Heading\n\nBody text for the article.".to_string(),
        cover_image: None,
        category: None,
        author: Some(AuthorSummary {
            id: author_id.to_string(),
            name: format!("Author {}", author_id),
            avatar: None,
        }),
        status: ArticleStatus::Published,
        premium: false,
        likes: 0,
        views: 0,
        comment_count: 0,
        published_at: None,
        created_at: None,
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_decodes_backend_shape() {
        let json = serde_json::json!({
            "_id": "a1",
            "title": "Hello",
            "slug": "hello",
            "content": "Body",
            "coverImage": "/uploads/x.png",
            "category": {"_id": "c1", "name": "World", "slug": "world"},
            "author": {"_id": "u1", "name": "Ada"},
            "status": "published",
            "isPremium": true,
            "likeCount": 4,
            "commentCount": 2,
            "publishedAt": "2024-01-02T03:04:05Z"
        });
        let article: Article = serde_json::from_value(json).unwrap();
        assert_eq!(article.id, "a1");
        assert_eq!(article.cover_image.as_deref(), Some("/uploads/x.png"));
        assert_eq!(article.category.as_ref().unwrap().slug, "world");
        assert_eq!(article.author_id(), Some("u1"));
        assert_eq!(article.status, ArticleStatus::Published);
        assert!(article.premium);
        assert_eq!(article.likes, 4);
        assert_eq!(article.comment_count, 2);
        assert!(article.is_published());
    }

    #[test]
    fn test_article_input_serializes_camel_case() {
        let input = ArticleInput {
            title: "T".into(),
            content: "C".into(),
            excerpt: None,
            cover_image: Some("https://cdn/x.png".into()),
            category_id: "c1".into(),
            status: ArticleStatus::Draft,
            premium: false,
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["categoryId"], "c1");
        assert_eq!(json["coverImage"], "https://cdn/x.png");
        assert_eq!(json["status"], "DRAFT");
        assert!(json.get("excerpt").is_none());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ArticleStatus::parse("Published"), Some(ArticleStatus::Published));
        assert_eq!(ArticleStatus::parse("ARCHIVED"), Some(ArticleStatus::Archived));
        assert_eq!(ArticleStatus::parse("deleted"), None);
    }

    #[test]
    fn test_list_params_clamps_and_ignores_blank_search() {
        let params = ListParams::new(0, 500).with_search("   ");
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 100);
        assert!(params.search.is_none());

        let params = ListParams::new(2, 10).with_search("  rust ").with_category("tech");
        assert_eq!(params.search.as_deref(), Some("rust"));
        assert_eq!(params.category.as_deref(), Some("tech"));
    }

    #[test]
    fn test_cache_key_differs_by_filter() {
        let a = ListParams::new(1, 10).with_category("tech");
        let b = ListParams::new(1, 10).with_category("world");
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), a.clone().cache_key());
    }

    #[test]
    fn test_cache_key_separator_in_values() {
        let a = ListParams::new(1, 10).with_category("a:sb");
        let b = ListParams::new(1, 10).with_category("a").with_search("b:s");
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_paged_result_navigation() {
        let result = PagedResult::new(vec![1, 2, 3], 25, 2, 10);
        assert_eq!(result.total_pages, 3);
        assert!(result.has_prev());
        assert!(result.has_next());

        let last = PagedResult::new(vec![1], 21, 3, 10);
        assert!(!last.has_next());

        let empty: PagedResult<i32> = PagedResult::empty(0);
        assert_eq!(empty.page, 1);
        assert!(!empty.has_next() && !empty.has_prev());
    }

    #[test]
    fn test_paged_result_map() {
        let result = PagedResult::new(vec![1, 2], 2, 1, 10).map(|n| n * 10);
        assert_eq!(result.items, vec![10, 20]);
        assert_eq!(result.total_pages, 1);
    }
}
