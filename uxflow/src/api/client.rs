//! HTTP client for the compute service.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::{ApiKey, PipelineConfig};
use crate::errors::ApiError;

/// A response from the compute service, preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl ApiResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a 200 response with a JSON body.
    #[must_use]
    pub fn ok_json(body: &serde_json::Value) -> Self {
        Self::new(200, body.to_string())
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::decode(endpoint, e))
    }

    /// Decodes the body of a 2xx response, or reports the status as a fault.
    pub fn success_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(ApiError::status(endpoint, self.status, self.body.clone()));
        }
        self.json(endpoint)
    }
}

/// Remote calls the pipeline needs.
///
/// Implementations attach credentials, never retry and never interpret status
/// codes on `submit`/`fetch`; that is left to the stage drivers.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// `POST`s a JSON body to an authenticated endpoint.
    async fn submit(&self, endpoint: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError>;

    /// `GET`s an authenticated endpoint.
    async fn fetch(&self, endpoint: &str) -> Result<ApiResponse, ApiError>;

    /// Dereferences an output URL without credentials and returns its text.
    ///
    /// Unlike `fetch`, a non-2xx answer is a fault since there is no status
    /// to hand back alongside the text.
    async fn fetch_raw(&self, url: &str) -> Result<String, ApiError>;
}

/// `reqwest`-backed [`ComputeApi`].
#[derive(Debug, Clone)]
pub struct ComputeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

impl ComputeClient {
    /// Creates a client for a base URL.
    pub fn new(base_url: impl Into<String>, api_key: ApiKey, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
        })
    }

    /// Creates a client from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ApiError> {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        )
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves an endpoint against the base URL. Absolute URLs pass through.
    pub fn resolve(&self, endpoint: &str) -> Result<Url, ApiError> {
        let raw = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            )
        };
        Url::parse(&raw).map_err(|_| ApiError::InvalidUrl(raw))
    }

    fn authenticated(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(AUTHORIZATION, self.api_key.expose())
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<ApiResponse, ApiError> {
        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(
            endpoint,
            status,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Compute API call finished"
        );
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl ComputeApi for ComputeClient {
    async fn submit(&self, endpoint: &str, body: &serde_json::Value) -> Result<ApiResponse, ApiError> {
        let url = self.resolve(endpoint)?;
        let request = self.authenticated(self.http.post(url)).json(body);
        self.send(endpoint, request).await
    }

    async fn fetch(&self, endpoint: &str) -> Result<ApiResponse, ApiError> {
        let url = self.resolve(endpoint)?;
        let request = self.authenticated(self.http.get(url));
        self.send(endpoint, request).await
    }

    async fn fetch_raw(&self, url: &str) -> Result<String, ApiError> {
        let parsed = Url::parse(url).map_err(|_| ApiError::InvalidUrl(url.to_string()))?;
        let response = self.http.get(parsed).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        if !(200..300).contains(&status) {
            return Err(ApiError::status(url, status, text));
        }
        debug!(url, bytes = text.len(), "Fetched raw output");
        Ok(text)
    }
}
