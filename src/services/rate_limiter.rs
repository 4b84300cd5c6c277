//! Rate limiter for login attempts
//!
//! Slows down credential guessing before requests reach the backend:
//! - Failed logins per account identifier (5 per 15 minutes)
//! - Login attempts per client IP (10 per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Limits for a sliding window
#[derive(Debug, Clone, Copy)]
struct Window {
    max: usize,
    span: Duration,
}

type Attempts<K> = Arc<RwLock<HashMap<K, Vec<DateTime<Utc>>>>>;

/// Login rate limiter
pub struct LoginRateLimiter {
    identifier_attempts: Attempts<String>,
    ip_attempts: Attempts<IpAddr>,
    identifier_window: Window,
    ip_window: Window,
}

impl LoginRateLimiter {
    /// Create a rate limiter with the default windows
    pub fn new() -> Self {
        Self::with_limits(5, Duration::minutes(15), 10, Duration::minutes(1))
    }

    /// Create a rate limiter with custom windows
    pub fn with_limits(
        max_failures: usize,
        failure_window: Duration,
        max_ip_attempts: usize,
        ip_window: Duration,
    ) -> Self {
        Self {
            identifier_attempts: Arc::new(RwLock::new(HashMap::new())),
            ip_attempts: Arc::new(RwLock::new(HashMap::new())),
            identifier_window: Window {
                max: max_failures,
                span: failure_window,
            },
            ip_window: Window {
                max: max_ip_attempts,
                span: ip_window,
            },
        }
    }

    /// Whether the identifier has too many recent failures
    pub async fn is_identifier_limited(&self, identifier: &str) -> bool {
        let mut attempts = self.identifier_attempts.write().await;
        let cutoff = Utc::now() - self.identifier_window.span;

        let recent = attempts.entry(normalize(identifier)).or_default();
        recent.retain(|time| *time > cutoff);
        recent.len() >= self.identifier_window.max
    }

    /// Record a failed login for the identifier
    pub async fn record_failed_attempt(&self, identifier: &str) {
        let mut attempts = self.identifier_attempts.write().await;
        attempts
            .entry(normalize(identifier))
            .or_default()
            .push(Utc::now());
    }

    /// Forget failures after a successful login
    pub async fn clear_identifier_attempts(&self, identifier: &str) {
        let mut attempts = self.identifier_attempts.write().await;
        attempts.remove(&normalize(identifier));
    }

    /// Whether the IP has made too many recent attempts
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let mut attempts = self.ip_attempts.write().await;
        let cutoff = Utc::now() - self.ip_window.span;

        let recent = attempts.entry(ip).or_default();
        recent.retain(|time| *time > cutoff);
        recent.len() >= self.ip_window.max
    }

    /// Record an attempt from the IP
    pub async fn record_ip_request(&self, ip: IpAddr) {
        let mut attempts = self.ip_attempts.write().await;
        attempts.entry(ip).or_default().push(Utc::now());
    }

    /// Drop expired entries (called periodically)
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let identifier_cutoff = now - self.identifier_window.span;
        let ip_cutoff = now - self.ip_window.span;

        {
            let mut attempts = self.identifier_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > identifier_cutoff);
                !times.is_empty()
            });
        }

        {
            let mut attempts = self.ip_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
        }
    }

    /// Number of identifiers and IPs currently tracked
    pub async fn tracked(&self) -> (usize, usize) {
        (
            self.identifier_attempts.read().await.len(),
            self.ip_attempts.read().await.len(),
        )
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}
