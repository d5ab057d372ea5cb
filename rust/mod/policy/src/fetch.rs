use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error raised by the snapshot fetcher.
///
/// The refresh flow does not distinguish 4xx from 5xx: anything that is
/// not a parsed 2xx body collapses into a fetch failure, and user-facing
/// messaging is the caller's concern. The variants exist for logging.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("controller request failed: {0}")]
    Transport(String),

    #[error("controller returned status {0}")]
    Status(u16),

    #[error("controller body was not valid JSON: {0}")]
    Decode(String),
}

/// Source of raw policy records.
///
/// The production implementation is [`ControllerClient`]; tests substitute
/// a stub returning fixture data.
#[async_trait]
pub trait PolicyFetcher: Send + Sync {
    /// Fetch the current policy set as loosely-typed records.
    ///
    /// Returns the controller body's `result.data` list unmodified. Record
    /// shape is the normalizer's concern, not the fetcher's.
    async fn fetch(&self) -> Result<Vec<Value>, FetchError>;
}

/// Connection settings for the remote controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Endpoint returning the policy definition list.
    pub url: String,

    /// Skip TLS certificate verification when talking to the controller.
    ///
    /// Controllers in lab deployments commonly serve self-signed
    /// certificates; enabling this is an explicit operator decision
    /// recorded in the configuration file, never a silent default.
    pub insecure_skip_verify: bool,
}

/// HTTP client for the remote controller endpoint.
///
/// One synchronous GET per refresh. No retry, no pagination, and no
/// client-side timeout: a hung controller blocks that refresh request
/// until an external timeout cuts it off.
pub struct ControllerClient {
    http: reqwest::Client,
    url: String,
}

impl ControllerClient {
    /// Build a client from controller settings.
    pub fn new(config: &ControllerConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl PolicyFetcher for ControllerClient {
    async fn fetch(&self) -> Result<Vec<Value>, FetchError> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(extract_data(&body))
    }
}

/// Pull `result.data` out of the controller body.
///
/// A body without the nested list yields an empty batch rather than an
/// error, matching the permissiveness of the controller contract.
fn extract_data(body: &Value) -> Vec<Value> {
    body.get("result")
        .and_then(|r| r.get("data"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}
