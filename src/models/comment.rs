//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::AuthorSummary;

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id", deserialize_with = "super::de_id")]
    pub id: String,
    #[serde(alias = "article", deserialize_with = "super::de_id")]
    pub article_id: String,
    #[serde(default)]
    pub author: Option<AuthorSummary>,
    pub content: String,
    #[serde(default, alias = "parent", deserialize_with = "super::de_opt_id")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Identifier of the author, if known
    pub fn author_id(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.id.as_str())
    }
}

/// Body sent when posting a comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub article_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// A top-level comment and its direct replies
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Group a flat comment list into threads.
///
/// Top-level comments are newest first, replies oldest first. Replies whose
/// parent is missing from the list are shown as top-level comments.
pub fn build_threads(comments: Vec<Comment>) -> Vec<CommentThread> {
    let ids: std::collections::HashSet<String> = comments.iter().map(|c| c.id.clone()).collect();

    let mut roots = Vec::new();
    let mut replies: HashMap<String, Vec<Comment>> = HashMap::new();
    for comment in comments {
        match comment.parent_id.clone() {
            Some(parent) if ids.contains(&parent) && parent != comment.id => {
                replies.entry(parent).or_default().push(comment);
            }
            _ => roots.push(comment),
        }
    }

    roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    roots
        .into_iter()
        .map(|comment| {
            let mut children = replies.remove(&comment.id).unwrap_or_default();
            children.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            CommentThread {
                comment,
                replies: children,
            }
        })
        .collect()
}
