//! Media upload repository

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendClient, BackendError};

/// Stored file as reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedMedia {
    /// Public URL of the stored file
    #[serde(alias = "path", alias = "location")]
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Upload a file as multipart field `file`
    async fn upload(
        &self,
        token: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedMedia, BackendError>;
}

/// HTTP media repository
pub struct HttpMediaRepository {
    client: Arc<BackendClient>,
}

impl HttpMediaRepository {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub fn boxed(client: Arc<BackendClient>) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(client))
    }
}

#[async_trait]
impl MediaRepository for HttpMediaRepository {
    async fn upload(
        &self,
        token: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedMedia, BackendError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.client
            .post_multipart("/api/upload", form, Some(token))
            .await
    }
}
