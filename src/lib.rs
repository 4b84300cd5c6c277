//! Newsroom - server-rendered front end for a news and article platform
//!
//! This library provides the page routing, session handling and service
//! layer over the platform's backend API.

pub mod backend;
pub mod cache;
pub mod config;
pub mod models;
pub mod services;
pub mod theme;
pub mod web;

#[cfg(test)]
mod testing;
