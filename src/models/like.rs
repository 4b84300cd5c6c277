//! Like state for the optimistic like button

use serde::{Deserialize, Serialize};

/// Whether the viewer likes an article and how many likes it has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    #[serde(alias = "likeCount")]
    pub likes: u64,
}

impl LikeState {
    pub fn new(liked: bool, likes: u64) -> Self {
        Self { liked, likes }
    }

    /// State shown immediately after the viewer clicks, before the backend answers
    pub fn toggled(self) -> Self {
        if self.liked {
            Self {
                liked: false,
                likes: self.likes.saturating_sub(1),
            }
        } else {
            Self {
                liked: true,
                likes: self.likes.saturating_add(1),
            }
        }
    }

    /// Settle an optimistic update: the backend's answer wins, a failure
    /// restores the state from before the click.
    pub fn reconcile<E>(previous: LikeState, result: &Result<LikeState, E>) -> LikeState {
        match result {
            Ok(confirmed) => *confirmed,
            Err(_) => previous,
        }
    }
}
