use std::time::Duration;

use async_trait::async_trait;
use bitcoin::Txid;
use onesat_primitives::ExplorerNetwork;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::*;

use super::{error::ClientError, traits::BlockExplorer, types::EsploraTx, ClientResult};

/// Retry and timeout knobs for [`EsploraClient`].
#[derive(Clone, Debug)]
pub struct ExplorerClientConfig {
    /// The maximum number of attempts for a request.
    pub max_retries: u8,

    /// Pause between attempts.
    pub retry_interval: Duration,

    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ExplorerClientConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_interval: Duration::from_millis(1_000),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// An `async` client for an esplora-compatible REST API (mempool.space,
/// blockstream.info, a local electrs).
#[derive(Debug)]
pub struct EsploraClient {
    /// API root, without trailing slash.
    base_url: String,
    /// The underlying `async` HTTP client.
    client: Client,
    config: ExplorerClientConfig,
}

impl EsploraClient {
    /// Creates a new [`EsploraClient`] rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, config: ExplorerClientConfig) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Other(format!("Could not create client: {e}")))?;

        trace!(url = %base_url, "Created explorer client");

        Ok(Self {
            base_url,
            client,
            config,
        })
    }

    /// Creates a client for `network`, using `base_url` if given and the
    /// public default otherwise.
    pub fn for_network(
        network: ExplorerNetwork,
        base_url: Option<String>,
        config: ExplorerClientConfig,
    ) -> ClientResult<Self> {
        let url = match base_url {
            Some(url) => url,
            None => network
                .default_base_url()
                .ok_or_else(|| ClientError::MissingBaseUrl(network.to_string()))?
                .to_string(),
        };
        Self::new(url, config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches `path` and returns the body, or `None` on 404.
    async fn get(&self, path: &str) -> ClientResult<Option<String>> {
        let url = format!("{}/{}", self.base_url, path);
        let mut retries = 0;
        loop {
            trace!(%url, %retries, "Calling explorer");

            let response = self.client.get(&url).send().await;
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }

                    if status.is_success() {
                        let body = resp
                            .text()
                            .await
                            .map_err(|e| ClientError::Body(e.to_string()))?;
                        return Ok(Some(body));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        // Rate limiting and server hiccups, might be recoverable
                        let e = ClientError::TransientStatus(status.as_u16());
                        warn!(%e, "explorer unavailable, retrying...");
                    } else {
                        let text = resp.text().await.unwrap_or_default();
                        return Err(ClientError::Status(status.as_u16(), text));
                    }
                }
                Err(err) => {
                    warn!(err = %err, "Error calling explorer");

                    if err.is_body() {
                        // Body error is unrecoverable
                        return Err(ClientError::Body(err.to_string()));
                    } else if err.is_decode() {
                        // Error decoding response, might be recoverable
                        let e = ClientError::MalformedResponse(err.to_string());
                        warn!(%e, "decoding error, retrying...");
                    } else if err.is_connect() {
                        // Connection error, might be recoverable
                        let e = ClientError::Connection(err.to_string());
                        warn!(%e, "connection error, retrying...");
                    } else if err.is_timeout() {
                        // Timeout error, might be recoverable
                        let e = ClientError::Timeout;
                        warn!(%e, "timeout error, retrying...");
                    } else if err.is_request() {
                        // General request error, might be recoverable
                        let e = ClientError::Request(err.to_string());
                        warn!(%e, "request error, retrying...");
                    } else if err.is_builder() {
                        // Request builder error is unrecoverable
                        return Err(ClientError::ReqBuilder(err.to_string()));
                    } else if err.is_redirect() {
                        // Redirect error is unrecoverable
                        return Err(ClientError::HttpRedirect(err.to_string()));
                    } else {
                        // Unknown error is unrecoverable
                        return Err(ClientError::Other("Unknown error".to_string()));
                    }
                }
            }
            retries += 1;
            if retries >= self.config.max_retries {
                return Err(ClientError::MaxRetriesExceeded(self.config.max_retries));
            }
            sleep(self.config.retry_interval).await;
        }
    }
}

#[async_trait]
impl BlockExplorer for EsploraClient {
    async fn tip_height(&self) -> ClientResult<u64> {
        let body = self
            .get("blocks/tip/height")
            .await?
            .ok_or_else(|| ClientError::Status(404, "tip height not found".to_string()))?;

        body.trim()
            .parse::<u64>()
            .map_err(|e| ClientError::Parse(format!("tip height '{}': {e}", body.trim())))
    }

    async fn tx_block_height(&self, txid: &Txid) -> ClientResult<Option<u64>> {
        let Some(body) = self.get(&format!("tx/{txid}")).await? else {
            debug!(%txid, "transaction unknown to explorer");
            return Ok(None);
        };

        let tx: EsploraTx = serde_json::from_str(&body)?;
        Ok(tx.status.included_height())
    }
}
