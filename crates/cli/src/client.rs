//! API client for a running adoption server

use adoption_lib::{DiagnosticsReport, ModelInfo, PredictionRequest, PredictionResult};
use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error ({status}): {body}")]
    Status { status: StatusCode, body: String },
}

/// API client for the adoption server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // a trailing slash keeps any path prefix when joining endpoints
        let mut base_url = Url::parse(base_url).context("Invalid server URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;
        Self::parse(response, &[]).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;
        Self::parse(response, &[]).await
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.post("predict", request).await
    }

    pub async fn model_info(&self) -> Result<ModelInfo> {
        self.get("model").await
    }

    pub async fn reload_model(&self) -> Result<ModelInfo> {
        self.post("model/reload", &serde_json::Value::Null).await
    }

    /// Run diagnostics on the server
    ///
    /// An unhealthy server answers 503 with a full report, which is
    /// returned rather than treated as a transport error.
    pub async fn diagnostics(&self) -> Result<DiagnosticsReport> {
        let url = self.base_url.join("diagnostics").context("Invalid path")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;
        Self::parse(response, &[StatusCode::SERVICE_UNAVAILABLE]).await
    }

    async fn parse<T: DeserializeOwned>(response: Response, accepted: &[StatusCode]) -> Result<T> {
        let status = response.status();
        if !status.is_success() && !accepted.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body }.into());
        }
        response.json().await.context("Failed to parse response")
    }
}
