//! Backend REST API client
//!
//! Thin wrapper over `reqwest::Client` that knows the backend base URL,
//! attaches bearer tokens, and turns every failure into a [`BackendError`].

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::BackendError;
use crate::config::BackendConfig;

/// HTTP client for the backend API
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

/// Error body the backend sends alongside non-success statuses
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl BackendClient {
    /// Create a client from configuration
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Create a client with an explicit timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("newsroom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BackendError::Request)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET and decode
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, BackendError> {
        self.send(self.request(Method::GET, path, token)).await
    }

    /// GET with query-string parameters and decode
    pub async fn get_query<T, Q>(
        &self,
        path: &str,
        query: &Q,
        token: Option<&str>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::GET, path, token).query(query))
            .await
    }

    /// POST a JSON body and decode
    pub async fn post<T, B>(&self, path: &str, body: &B, token: Option<&str>) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, path, token).json(body))
            .await
    }

    /// PUT a JSON body and decode
    pub async fn put<T, B>(&self, path: &str, body: &B, token: Option<&str>) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PUT, path, token).json(body))
            .await
    }

    /// PATCH a JSON body and decode
    pub async fn patch<T, B>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PATCH, path, token).json(body))
            .await
    }

    /// DELETE, ignoring any response body
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(), BackendError> {
        let _: serde::de::IgnoredAny = self.send(self.request(Method::DELETE, path, token)).await?;
        Ok(())
    }

    /// POST a multipart form and decode
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        token: Option<&str>,
    ) -> Result<T, BackendError> {
        self.send(self.request(Method::POST, path, token).multipart(form))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = builder.send().await.map_err(BackendError::from_reqwest)?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(BackendError::from_reqwest)?;
        decode_body(&bytes)
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body.message.or(body.error).unwrap_or_default();

    tracing::debug!(status = status.as_u16(), %message, "Backend returned error status");
    Err(BackendError::status(status.as_u16(), message))
}

/// Decode a response body.
///
/// The backend wraps some payloads as `{"data": ...}`; the wrapped value is
/// tried first, then the body as a whole. An empty body decodes as `null`.
pub(crate) fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BackendError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(serde_json::Value::Null)
            .map_err(|e| BackendError::Decode(e.to_string()));
    }

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;

    if let Some(inner) = value.get("data") {
        if let Ok(decoded) = T::deserialize(inner) {
            return Ok(decoded);
        }
    }

    T::deserialize(&value).map_err(|e| BackendError::Decode(e.to_string()))
}
