//! Canvas channel client
//!
//! Exchanges the customer's refresh token for an access token, posts content
//! and completion batches to the bulk endpoints, and translates Canvas
//! responses into per-item outcomes. The access token is cached for the
//! lifetime of the client; clients are constructed per run, so a token never
//! outlives the run that fetched it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use lernio_channel::chunk::{ChunkOutcome, TransmissionChunk};
use lernio_channel::error::{ChannelError, ChannelResult};
use lernio_channel::traits::ChannelClient;
use lernio_channel::types::{ChannelType, UnitType};
use lernio_channel::unit::SerializedUnit;

use crate::config::CanvasConfig;

/// Canvas client for bulk course and completion transmission.
pub struct CanvasClient {
    config: CanvasConfig,
    display_name: String,
    client: Arc<Client>,
    /// Access token cached for the lifetime of this client.
    access_token: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for CanvasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasClient")
            .field("config", &self.config.redacted())
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl CanvasClient {
    /// Create a new Canvas client with the given configuration.
    pub fn new(config: CanvasConfig) -> ChannelResult<Self> {
        config.validate()?;

        let display_name = format!("Canvas: {}", config.base_url);
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
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Get a bearer token, exchanging the refresh token on first use.
    async fn bearer_token(&self) -> ChannelResult<String> {
        {
            let token = self.access_token.read().await;
            if let Some(ref token) = *token {
                return Ok(token.clone());
            }
        }

        let token = self.exchange_refresh_token().await?;

        {
            let mut cached = self.access_token.write().await;
            *cached = Some(token.clone());
        }

        Ok(token)
    }

    /// Exchange the refresh token for an access token.
    async fn exchange_refresh_token(&self) -> ChannelResult<String> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", self.config.refresh_token.as_str()),
        ];

        let response = self
            .client
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|_e| ChannelError::AuthenticationFailed)?;

        if !response.status().is_success() {
            return Err(ChannelError::AuthenticationFailed);
        }

        let body: Value = response.json().await.map_err(|e| {
            ChannelError::connection_failed_with_source("Failed to parse OAuth response", e)
        })?;

        body.get("access_token")
            .and_then(|v| v.as_str())
            .map(std::string::ToString::to_string)
            .ok_or(ChannelError::AuthenticationFailed)
    }

    fn bulk_url(&self, unit_type: UnitType) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let account = &self.config.account_id;
        match unit_type {
            UnitType::ContentMetadata => {
                format!("{base}/api/v1/accounts/{account}/bulk_courses")
            }
            UnitType::LearnerData => {
                format!("{base}/api/v1/accounts/{account}/bulk_completions")
            }
        }
    }

    fn bulk_body(unit_type: UnitType, items: &[&SerializedUnit]) -> Value {
        let payloads: Vec<&Value> = items.iter().map(|u| &u.payload).collect();
        match unit_type {
            UnitType::ContentMetadata => json!({ "courses": payloads }),
            UnitType::LearnerData => json!({ "completions": payloads }),
        }
    }

    /// Post one type-homogeneous group of units, retrying once on a 429.
    async fn post_bulk(
        &self,
        unit_type: UnitType,
        items: &[&SerializedUnit],
        outcome: &mut ChunkOutcome,
    ) -> ChannelResult<()> {
        let token = match self.bearer_token().await {
            Ok(token) => token,
            Err(err) => {
                // Token acquisition failures fail the group, not the run.
                fail_all(items, &err.to_string(), outcome);
                return Ok(());
            }
        };

        let url = self.bulk_url(unit_type);
        let body = Self::bulk_body(unit_type, items);

        let mut response = self.post_json(&url, &token, &body).await;

        // Canvas signals throttling with 429 and a Retry-After in seconds;
        // honor it once, then give up on the chunk.
        let throttle_wait = match &response {
            Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => Some(
                resp.headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after)
                    .unwrap_or(Duration::from_secs(1)),
            ),
            _ => None,
        };
        if let Some(wait) = throttle_wait {
            warn!(url = %url, wait_ms = wait.as_millis(), "Canvas rate limited, retrying once");
            tokio::time::sleep(wait).await;
            response = self.post_json(&url, &token, &body).await;
        }

        match response {
            Ok(resp) => self.apply_response(resp, items, outcome).await,
            Err(err) => {
                fail_all(items, &err.to_string(), outcome);
                Ok(())
            }
        }
    }

    async fn post_json(&self, url: &str, token: &str, body: &Value) -> ChannelResult<Response> {
        self.client
            .post(url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChannelError::Timeout {
                        timeout_secs: self.config.connection.read_timeout_secs,
                    }
                } else {
                    ChannelError::network_with_source(format!("POST {url} failed"), e)
                }
            })
    }

    /// Translate one bulk response into per-item outcomes.
    ///
    /// Canvas returns `results` in request order; an item without a result
    /// entry is failed rather than silently dropped. A 2xx response without
    /// a parseable results array acknowledges the whole group.
    async fn apply_response(
        &self,
        response: Response,
        items: &[&SerializedUnit],
        outcome: &mut ChunkOutcome,
    ) -> ChannelResult<()> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            fail_all(items, &ChannelError::AuthenticationFailed.to_string(), outcome);
            return Ok(());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                ChannelError::remote_unavailable(format!("HTTP {status}: {body}")).to_string()
            } else {
                format!("HTTP {status}: {body}")
            };
            fail_all(items, &detail, outcome);
            return Ok(());
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(_) => {
                // Acknowledged without a body; count the whole group as sent.
                for item in items {
                    outcome.record_success(item.item_key.clone());
                }
                return Ok(());
            }
        };

        let Some(results) = body.get("results").and_then(|v| v.as_array()) else {
            for item in items {
                outcome.record_success(item.item_key.clone());
            }
            return Ok(());
        };

        for (index, item) in items.iter().enumerate() {
            match results.get(index) {
                Some(result) => {
                    let ok = result
                        .get("status")
                        .and_then(|v| v.as_str())
                        .is_some_and(|s| s == "success" || s == "ok");
                    if ok {
                        outcome.record_success(item.item_key.clone());
                    } else {
                        let message = result
                            .get("message")
                            .and_then(|v| v.as_str())
                            .unwrap_or("rejected by Canvas");
                        outcome.record_failure(item.item_key.clone(), message);
                    }
                }
                None => {
                    outcome.record_failure(
                        item.item_key.clone(),
                        "no per-item result in Canvas response",
                    );
                }
            }
        }

        Ok(())
    }
}

fn fail_all(items: &[&SerializedUnit], detail: &str, outcome: &mut ChunkOutcome) {
    for item in items {
        outcome.record_failure(item.item_key.clone(), detail);
    }
}

/// Parse a Retry-After header value given in seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.parse::<u64>().ok().map(Duration::from_secs)
}

#[async_trait]
impl ChannelClient for CanvasClient {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Canvas
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self, chunk), fields(size = chunk.len()))]
    async fn send(&self, chunk: &TransmissionChunk) -> ChannelResult<ChunkOutcome> {
        let mut outcome = ChunkOutcome::new();

        // Chunks arrive type-homogeneous from the transmitter; handle a
        // mixed chunk anyway by posting each group to its own endpoint.
        for unit_type in [UnitType::ContentMetadata, UnitType::LearnerData] {
            let group: Vec<&SerializedUnit> = chunk
                .items
                .iter()
                .filter(|u| u.unit_type == unit_type)
                .collect();
            if group.is_empty() {
                continue;
            }
            debug!(unit_type = %unit_type, count = group.len(), "Posting Canvas bulk group");
            self.post_bulk(unit_type, &group, &mut outcome).await?;
        }

        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn probe(&self) -> ChannelResult<()> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/api/v1/users/self",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| ChannelError::connection_failed_with_source("Canvas unreachable", e))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ChannelError::AuthenticationFailed)
            }
            status => Err(ChannelError::remote_unavailable(format!(
                "Canvas probe returned HTTP {status}"
            ))),
        }
    }
}
