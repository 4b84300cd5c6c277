//! Configuration management
//!
//! This module handles loading and parsing configuration for the newsroom front end.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Backend API configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Theme (template override) configuration
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Site presentation settings
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL of the site (used for sitemap links and origin checks)
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend API (without the `/api` suffix)
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long public backend reads may be served from cache
    #[serde(default = "default_stale_seconds")]
    pub stale_seconds: u64,
    /// How long a validated session is trusted before re-checking the backend
    #[serde(default = "default_session_seconds")]
    pub session_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_seconds: default_stale_seconds(),
            session_seconds: default_session_seconds(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_stale_seconds() -> u64 {
    30
}

fn default_session_seconds() -> u64 {
    60
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Theme configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Optional directory whose templates override the embedded ones
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Upload configuration for editor paste/drag-drop uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image and video MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "video/mp4".to_string(),
        "video/webm".to_string(),
    ]
}

/// Kind of media accepted by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Classify an allowed MIME type
    pub fn media_kind(&self, mime_type: &str) -> Option<MediaKind> {
        if !self.is_type_allowed(mime_type) {
            return None;
        }
        if mime_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Site presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name shown in the header and title
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Short site description
    #[serde(default = "default_site_description")]
    pub description: String,
    /// Articles per listing page
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,
    /// Lines served verbatim at /ads.txt
    #[serde(default)]
    pub ads_txt: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            description: default_site_description(),
            posts_per_page: default_posts_per_page(),
            ads_txt: Vec::new(),
        }
    }
}

fn default_site_name() -> String {
    "Newsroom".to_string()
}

fn default_site_description() -> String {
    "News, analysis and opinion".to_string()
}

fn default_posts_per_page() -> u32 {
    10
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - NEWSROOM_SERVER_HOST
    /// - NEWSROOM_SERVER_PORT
    /// - NEWSROOM_SERVER_PUBLIC_URL
    /// - NEWSROOM_BACKEND_URL
    /// - NEWSROOM_BACKEND_TIMEOUT_SECS
    /// - NEWSROOM_CACHE_STALE_SECONDS
    /// - NEWSROOM_CACHE_SESSION_SECONDS
    /// - NEWSROOM_THEME_PATH
    /// - NEWSROOM_SITE_NAME
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("NEWSROOM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("NEWSROOM_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(public_url) = std::env::var("NEWSROOM_SERVER_PUBLIC_URL") {
            self.server.public_url = public_url;
        }

        if let Ok(url) = std::env::var("NEWSROOM_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Ok(timeout) = std::env::var("NEWSROOM_BACKEND_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.backend.timeout_secs = timeout;
            }
        }

        if let Ok(stale) = std::env::var("NEWSROOM_CACHE_STALE_SECONDS") {
            if let Ok(stale) = stale.parse::<u64>() {
                self.cache.stale_seconds = stale;
            }
        }
        if let Ok(session) = std::env::var("NEWSROOM_CACHE_SESSION_SECONDS") {
            if let Ok(session) = session.parse::<u64>() {
                self.cache.session_seconds = session;
            }
        }

        if let Ok(path) = std::env::var("NEWSROOM_THEME_PATH") {
            self.theme.path = Some(PathBuf::from(path));
        }
        if let Ok(name) = std::env::var("NEWSROOM_SITE_NAME") {
            self.site.name = name;
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.base_url must not be empty".to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must start with http:// or https://, got '{}'",
                url
            )));
        }
        let public_url = self.public_url();
        let authority = public_url
            .strip_prefix("http://")
            .or_else(|| public_url.strip_prefix("https://"))
            .and_then(|rest| rest.split(['/', '?', '#']).next())
            .unwrap_or("");
        if authority.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "server.public_url must be an http:// or https:// URL with a host, got '{}'",
                public_url
            )));
        }
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }
        if self.site.posts_per_page == 0 {
            return Err(ConfigError::ValidationError(
                "site.posts_per_page must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Public URL without a trailing slash
    pub fn public_url(&self) -> &str {
        self.server.public_url.trim_end_matches('/')
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
