//! API client for communicating with a hostwatch agent

use anyhow::{anyhow, Context, Result};
use hostwatch_lib::{ErrorResponse, HealthResponse, MetricsReport};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// API client for the agent HTTP surface
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            // Sampling plus a cold-start model training can take a while
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid API URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    async fn send(&self, path: &str) -> Result<Response> {
        let url = self.base_url.join(path).context("Invalid path")?;

        self.client
            .get(url)
            .send()
            .await
            .context("Failed to send request")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(path).await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Current host metrics with the anomaly verdict
    pub async fn metrics(&self) -> Result<MetricsReport> {
        self.get("metrics").await
    }

    /// Component health; an unhealthy agent still reports its components
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.send("healthz").await?;
        let status = response.status();

        if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.context("Failed to parse response");
        }

        Err(api_error(response).await)
    }
}

async fn api_error(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => anyhow!("API error ({}): {}", status, err.error),
        Err(_) => anyhow!("API error ({}): {}", status, body),
    }
}
