//! Data models
//!
//! UI-shaped projections of the entities owned by the backend API:
//! - Users and roles (with the flat role groups used for page gating)
//! - Articles, comments, categories
//! - Like state, saved articles, system stats
//!
//! Nothing here is persisted locally; every value is decoded from or
//! encoded for a backend call.

mod article;
mod category;
mod comment;
mod like;
mod session;
mod stats;
mod user;

pub use article::{Article, ArticleInput, ArticleStatus, AuthorSummary, ListParams, PagedResult};
pub use category::{Category, CategoryInput};
pub use comment::{build_threads, Comment, CommentThread, CreateCommentInput};
pub use like::LikeState;
pub use session::AuthSession;
pub use stats::SystemStats;
pub use user::{
    assignable_roles, Role, User, ADMIN_ROLES, ALL_ROLES, SUBSCRIBER_ROLES, SUPERADMIN_ROLES,
    WRITER_ROLES,
};

#[cfg(test)]
pub(crate) use article::test_article;
#[cfg(test)]
pub(crate) use user::test_user;

use serde::{Deserialize, Deserializer};

/// Decode an identifier the backend may send as either a string or a number.
pub(crate) fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Same as [`de_id`] for optional identifiers.
pub(crate) fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}
