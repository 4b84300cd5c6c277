//! Category model

use serde::{Deserialize, Serialize};

/// Category as listed by the backend (also embedded in articles)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Backend identifier
    #[serde(alias = "_id", deserialize_with = "super::de_id")]
    pub id: String,
    /// Category name
    pub name: String,
    /// URL-friendly slug
    #[serde(default)]
    pub slug: String,
    /// Category description
    #[serde(default)]
    pub description: Option<String>,
    /// Number of articles filed under the category
    #[serde(default)]
    pub article_count: u64,
}

/// Body sent when creating or renaming a category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
