//! Remote image-edit service.
//!
//! [`EditService`] is the seam between the transform pipeline and the
//! network. [`FalClient`] is the production implementation: one JSON POST
//! to a fal.ai model endpoint, authenticated with `Authorization: Key …`.
//!
//! The service's failure reports are opaque text, so [`ServiceError`] keeps
//! them as text; turning that into a category is the job of
//! [`classify`](crate::classify).

use crate::asset::ImageAsset;
use crate::config::ServiceConfig;
use crate::encoding::from_data_uri;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// The API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` for empty or whitespace-only keys.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key.trim().to_string()))
        }
    }

    /// Read the key from the named environment variable.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().and_then(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Input body for one edit call.
///
/// By the service's convention the first image is the primary edit target
/// and the second is the reference, so the garment goes first and the
/// person second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditRequest {
    pub prompt: String,
    pub image_urls: Vec<String>,
    pub num_images: u32,
    pub output_format: String,
    pub seed: u64,
    pub enable_safety_checker: bool,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("response body is not valid JSON: {0}")]
    InvalidBody(String),
}

impl ServiceError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        // reqwest's top-level message hides the cause ("connection refused"
        // etc.) in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        Self::Transport(message)
    }
}

/// A remote service that performs one image edit per call.
#[async_trait]
pub trait EditService: Send + Sync {
    /// Submit the request and return the raw success payload.
    async fn edit(
        &self,
        credential: &Credential,
        request: &EditRequest,
    ) -> Result<Value, ServiceError>;
}

/// fal.ai synchronous-run client.
pub struct FalClient {
    http: reqwest::Client,
    endpoint: String,
}

impl FalClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ServiceError::from_reqwest)?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch a result image. `data:` URIs are decoded locally; anything
    /// else is fetched over HTTP.
    pub async fn download(&self, url: &str, name: &str) -> Result<ImageAsset, ServiceError> {
        if url.starts_with("data:") {
            return from_data_uri(url, name).map_err(|e| ServiceError::InvalidBody(e.to_string()));
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let bytes = response.bytes().await.map_err(ServiceError::from_reqwest)?;
        Ok(ImageAsset::new(name, mime, bytes.to_vec()))
    }
}

#[async_trait]
impl EditService for FalClient {
    async fn edit(
        &self,
        credential: &Credential,
        request: &EditRequest,
    ) -> Result<Value, ServiceError> {
        tracing::debug!(endpoint = %self.endpoint, seed = request.seed, "calling edit service");

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Key {}", credential.expose()))
            .json(request)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = match status.canonical_reason() {
                Some(reason) if body.trim().is_empty() => reason.to_string(),
                Some(reason) => format!("{reason}: {}", body.trim()),
                None => body.trim().to_string(),
            };
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ServiceError::InvalidBody(e.to_string()))
    }
}
