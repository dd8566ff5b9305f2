//! xAPI adapter configuration

use serde::{Deserialize, Serialize};

use lernio_channel::config::{AuthConfig, ChannelConfiguration, ConnectionSettings};
use lernio_channel::error::{ChannelError, ChannelResult};

/// The xAPI version header sent with every request.
pub const XAPI_VERSION: &str = "1.0.3";

/// Configuration for one LRS (learning record store) connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XapiConfig {
    /// LRS endpoint root (e.g. "https://lrs.example.com/xapi").
    pub endpoint: String,

    /// LRS basic-auth key.
    pub key: String,

    /// LRS basic-auth secret.
    pub secret: String,

    /// Connection timeouts.
    #[serde(default)]
    pub connection: ConnectionSettings,
}

impl XapiConfig {
    /// Create a config with required fields.
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            secret: secret.into(),
            connection: ConnectionSettings::default(),
        }
    }

    /// Extract an xAPI config from a channel configuration.
    ///
    /// The configuration must carry `Basic` credentials (the LRS key/secret
    /// pair) and a chunk size of 1: the LRS contract here is strict
    /// synchronous per-statement calls.
    pub fn from_channel_config(config: &ChannelConfiguration) -> ChannelResult<Self> {
        if config.transmission_chunk_size != 1 {
            return Err(ChannelError::invalid_configuration(
                "xAPI transmits one statement per request; chunk size must be 1",
            ));
        }

        match &config.auth {
            AuthConfig::Basic { username, password } => Ok(Self {
                endpoint: config.endpoint.clone(),
                key: username.clone(),
                secret: password.clone().unwrap_or_default(),
                connection: config.connection.clone(),
            }),
            _ => Err(ChannelError::invalid_configuration(
                "xAPI requires basic credentials (LRS key/secret)",
            )),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ChannelResult<()> {
        if self.endpoint.is_empty() {
            return Err(ChannelError::invalid_configuration("LRS endpoint is empty"));
        }
        if self.key.is_empty() {
            return Err(ChannelError::invalid_configuration("LRS key is empty"));
        }
        Ok(())
    }

    /// The statements resource URL.
    pub fn statements_url(&self) -> String {
        format!("{}/statements", self.endpoint.trim_end_matches('/'))
    }

    /// The about resource URL, used by the health probe.
    pub fn about_url(&self) -> String {
        format!("{}/about", self.endpoint.trim_end_matches('/'))
    }
}
