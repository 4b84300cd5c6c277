//! System statistics shown on the admin dashboard

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate counters reported by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemStats {
    pub total_users: u64,
    pub active_users: u64,
    pub total_articles: u64,
    pub published_articles: u64,
    pub draft_articles: u64,
    pub total_comments: u64,
    pub total_categories: u64,
    pub total_likes: u64,
    /// User count per role name
    pub users_by_role: BTreeMap<String, u64>,
}
