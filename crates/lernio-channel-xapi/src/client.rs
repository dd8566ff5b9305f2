//! xAPI channel client
//!
//! Saves one statement per request to the configured LRS. The LRS contract
//! gives no per-item granularity: a chunk (always a single statement)
//! succeeds or fails atomically on the whole-request response.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, instrument};

use lernio_channel::chunk::{ChunkOutcome, TransmissionChunk};
use lernio_channel::error::{ChannelError, ChannelResult};
use lernio_channel::traits::ChannelClient;
use lernio_channel::types::ChannelType;

use crate::config::{XapiConfig, XAPI_VERSION};

/// Client for any xAPI 1.0.3 learning record store.
pub struct XapiClient {
    config: XapiConfig,
    display_name: String,
    client: Arc<Client>,
}

impl XapiClient {
    /// Create a new LRS client with the given configuration.
    pub fn new(config: XapiConfig) -> ChannelResult<Self> {
        config.validate()?;

        let display_name = format!("xAPI: {}", config.endpoint);
        let client = Client::builder()
            .timeout(config.connection.read_timeout())
            .connect_timeout(config.connection.connection_timeout())
            .build()
            .map_err(|e| {
                ChannelError::invalid_configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            display_name,
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl ChannelClient for XapiClient {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Xapi
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self, chunk), fields(size = chunk.len()))]
    async fn send(&self, chunk: &TransmissionChunk) -> ChannelResult<ChunkOutcome> {
        // The chunker is configured to 1 for this channel; a larger chunk
        // means a misconfigured pipeline, not a retryable condition.
        if chunk.len() > 1 {
            return Err(ChannelError::invalid_configuration(format!(
                "xAPI chunk carries {} statements, expected 1",
                chunk.len()
            )));
        }

        let Some(unit) = chunk.items.first() else {
            return Ok(ChunkOutcome::new());
        };

        debug!(item_key = %unit.item_key, "Saving xAPI statement");

        let response = self
            .client
            .post(self.config.statements_url())
            .basic_auth(&self.config.key, Some(&self.config.secret))
            .header("X-Experience-API-Version", XAPI_VERSION)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&unit.payload)
            .send()
            .await;

        let outcome = match response {
            Ok(resp) if resp.status().is_success() => ChunkOutcome::all_succeeded(chunk),
            Ok(resp)
                if resp.status() == StatusCode::UNAUTHORIZED
                    || resp.status() == StatusCode::FORBIDDEN =>
            {
                ChunkOutcome::all_failed(chunk, ChannelError::AuthenticationFailed.to_string())
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                ChunkOutcome::all_failed(chunk, format!("LRS rejected statement: HTTP {status}: {body}"))
            }
            Err(err) => ChunkOutcome::all_failed(chunk, format!("LRS unreachable: {err}")),
        };

        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn probe(&self) -> ChannelResult<()> {
        let response = self
            .client
            .get(self.config.about_url())
            .basic_auth(&self.config.key, Some(&self.config.secret))
            .header("X-Experience-API-Version", XAPI_VERSION)
            .send()
            .await
            .map_err(|e| ChannelError::connection_failed_with_source("LRS unreachable", e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ChannelError::AuthenticationFailed)
            }
            status => Err(ChannelError::remote_unavailable(format!(
                "LRS probe returned HTTP {status}"
            ))),
        }
    }
}
