//! Canvas adapter configuration

use serde::{Deserialize, Serialize};

use lernio_channel::config::{AuthConfig, ChannelConfiguration, ConnectionSettings};
use lernio_channel::error::{ChannelError, ChannelResult};

/// Configuration for one Canvas connection.
///
/// Canvas hands out a long-lived refresh token when the customer admin
/// authorizes the integration; the client exchanges it for short-lived
/// access tokens at `login/oauth2/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Canvas instance root (e.g. "https://acme.instructure.com").
    pub base_url: String,

    /// OAuth2 developer key client id.
    pub client_id: String,

    /// OAuth2 developer key client secret.
    pub client_secret: String,

    /// Long-lived refresh token granted by the customer admin.
    pub refresh_token: String,

    /// Canvas account the integration operates under.
    #[serde(default = "default_account_id")]
    pub account_id: String,

    /// Connection timeouts.
    #[serde(default)]
    pub connection: ConnectionSettings,
}

fn default_account_id() -> String {
    "self".to_string()
}

impl CanvasConfig {
    /// Create a config with required fields.
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            account_id: default_account_id(),
            connection: ConnectionSettings::default(),
        }
    }

    /// Set the Canvas account id.
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    /// Set connection timeouts.
    pub fn with_connection(mut self, connection: ConnectionSettings) -> Self {
        self.connection = connection;
        self
    }

    /// Extract a Canvas config from a channel configuration.
    ///
    /// The configuration must carry `OAuth2RefreshToken` credentials.
    pub fn from_channel_config(config: &ChannelConfiguration) -> ChannelResult<Self> {
        match &config.auth {
            AuthConfig::OAuth2RefreshToken {
                token_url: _,
                client_id,
                client_secret,
                refresh_token,
            } => Ok(Self {
                base_url: config.endpoint.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                refresh_token: refresh_token.clone(),
                account_id: default_account_id(),
                connection: config.connection.clone(),
            }),
            other => Err(ChannelError::invalid_configuration(format!(
                "Canvas requires oauth2_refresh_token credentials, got {}",
                auth_kind(other)
            ))),
        }
    }

    /// The token exchange URL for this instance.
    pub fn token_url(&self) -> String {
        format!("{}/login/oauth2/token", self.base_url.trim_end_matches('/'))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ChannelResult<()> {
        if self.base_url.is_empty() {
            return Err(ChannelError::invalid_configuration("base URL is empty"));
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ChannelError::invalid_configuration(
                "Canvas client id and secret are required",
            ));
        }
        if self.refresh_token.is_empty() {
            return Err(ChannelError::invalid_configuration("refresh token is empty"));
        }
        Ok(())
    }

    /// Create a redacted version for logging/display.
    pub fn redacted(&self) -> Self {
        Self {
            client_secret: "***REDACTED***".to_string(),
            refresh_token: "***REDACTED***".to_string(),
            ..self.clone()
        }
    }
}

fn auth_kind(auth: &AuthConfig) -> &'static str {
    match auth {
        AuthConfig::None => "none",
        AuthConfig::Basic { .. } => "basic",
        AuthConfig::ApiKey { .. } => "api_key",
        AuthConfig::Bearer { .. } => "bearer",
        AuthConfig::OAuth2 { .. } => "oauth2",
        AuthConfig::OAuth2RefreshToken { .. } => "oauth2_refresh_token",
    }
}
