//! Backend API access
//!
//! The backend is the system of record for users, articles, comments,
//! categories, likes and saved articles. This module is the only place
//! that speaks HTTP to it.

pub mod client;
pub mod error;
pub mod repositories;

pub use client::BackendClient;
pub use error::BackendError;
pub use repositories::Repositories;
