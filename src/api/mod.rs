pub mod types;

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::core::error::{PollError, RcaError};
use types::{ClustersResponse, JobSnapshot, KomodorCluster, SessionRequest, SessionResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.komodor.com";

const TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_TIMEOUT: Duration = Duration::from_secs(360);
const CLUSTERS_TIMEOUT: Duration = Duration::from_secs(30);

/// The three calls this tool makes against the Komodor API.
#[async_trait]
pub trait RcaApi: Send + Sync {
    /// Submit an RCA session. Only 200/201 count as accepted.
    async fn trigger_session(&self, request: &SessionRequest) -> Result<SessionResponse, RcaError>;

    /// Fetch the current state of a session. Only 200 with a decodable body succeeds.
    async fn fetch_session(&self, session_id: &str) -> Result<JobSnapshot, PollError>;

    async fn list_clusters(&self) -> Result<Vec<KomodorCluster>>;
}

#[derive(Clone)]
pub struct KomodorClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for KomodorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KomodorClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl KomodorClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sessions_url(&self) -> String {
        format!("{}/api/v2/klaudia/rca/sessions", self.base_url)
    }
}

#[async_trait]
impl RcaApi for KomodorClient {
    async fn trigger_session(&self, request: &SessionRequest) -> Result<SessionResponse, RcaError> {
        let url = self.sessions_url();
        debug!("POST {}", url);

        let res = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(request)
            .timeout(TRIGGER_TIMEOUT)
            .send()
            .await
            .map_err(|e| RcaError::Trigger(format!("failed to make request: {}", e)))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| RcaError::Trigger(format!("failed to read response body: {}", e)))?;

        if status != StatusCode::OK && status != StatusCode::CREATED {
            warn!("RCA trigger rejected (HTTP {}): {}", status.as_u16(), body);
            return Err(RcaError::Trigger(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            RcaError::Trigger(format!("failed to unmarshal response: {} (body: {})", e, body))
        })
    }

    async fn fetch_session(&self, session_id: &str) -> Result<JobSnapshot, PollError> {
        let url = format!("{}/{}", self.sessions_url(), session_id);

        let req = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .timeout(POLL_TIMEOUT)
            .build()
            .map_err(|e| PollError::Request(e.to_string()))?;

        let res = self
            .client
            .execute(req)
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| PollError::Transport(format!("failed to read response: {}", e)))?;

        if status != StatusCode::OK {
            return Err(PollError::Status {
                code: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            debug!("Undecodable poll body: {}", body);
            PollError::from_decode(e)
        })
    }

    async fn list_clusters(&self) -> Result<Vec<KomodorCluster>> {
        info!("Fetching Komodor clusters from API...");
        let url = format!("{}/api/v2/clusters", self.base_url);

        let res = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .timeout(CLUSTERS_TIMEOUT)
            .send()
            .await
            .context("failed to make request")?;

        let status = res.status();
        let body = res.text().await.context("failed to read response body")?;

        if status != StatusCode::OK {
            warn!(
                "Cluster list request failed with status {}: {}",
                status.as_u16(),
                body
            );
            bail!("API request failed (HTTP {}): {}", status.as_u16(), body);
        }

        let parsed: ClustersResponse =
            serde_json::from_str(&body).context("failed to unmarshal cluster list")?;

        info!(
            "Successfully fetched {} clusters from Komodor API",
            parsed.data.clusters.len()
        );
        Ok(parsed.data.clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = KomodorClient::new("https://api.komodor.com/", "key");
        assert_eq!(client.base_url(), "https://api.komodor.com");
        assert_eq!(
            client.sessions_url(),
            "https://api.komodor.com/api/v2/klaudia/rca/sessions"
        );
    }

    #[test]
    fn debug_output_hides_api_key() {
        let client = KomodorClient::new(DEFAULT_BASE_URL, "super-secret");
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("super-secret"));
    }

    #[tokio::test]
    async fn invalid_base_url_is_a_request_error() {
        let client = KomodorClient::new("not a url", "key");
        let err = client.fetch_session("abc").await.unwrap_err();
        assert!(matches!(err, PollError::Request(_)), "got {:?}", err);
    }
}
