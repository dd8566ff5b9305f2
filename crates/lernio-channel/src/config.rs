//! Channel configuration types
//!
//! One `ChannelConfiguration` describes one enterprise customer's connection
//! to one channel: credentials, endpoint, and sync preferences. Configurations
//! are owned by the external configuration service and read-only here.

use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, ChannelResult};
use crate::ids::{ConfigurationId, CustomerId};
use crate::types::ChannelType;

/// Common connection settings shared across channel adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    60
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl ConnectionSettings {
    /// Create new connection settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Get connection timeout as Duration.
    pub fn connection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get read timeout as Duration.
    pub fn read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.read_timeout_secs)
    }
}

/// Authentication method configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,

    /// Basic authentication (username/password, or LRS key/secret).
    Basic {
        username: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },

    /// API key authentication.
    ApiKey {
        key: String,
        #[serde(default = "default_api_key_header")]
        header_name: String,
    },

    /// Bearer token authentication.
    Bearer { token: String },

    /// OAuth2 client credentials flow.
    #[serde(rename = "oauth2")]
    OAuth2 {
        token_url: String,
        client_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_secret: Option<String>,
        #[serde(default)]
        scopes: Vec<String>,
    },

    /// OAuth2 refresh-token grant: a long-lived refresh token is exchanged
    /// for short-lived access tokens. Used by channels whose admin grants
    /// access once (e.g. Canvas).
    #[serde(rename = "oauth2_refresh_token")]
    OAuth2RefreshToken {
        token_url: String,
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

impl AuthConfig {
    /// Create basic authentication config.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthConfig::Basic {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    /// Create API key authentication config.
    pub fn api_key(key: impl Into<String>) -> Self {
        AuthConfig::ApiKey {
            key: key.into(),
            header_name: default_api_key_header(),
        }
    }

    /// Create bearer token authentication config.
    pub fn bearer(token: impl Into<String>) -> Self {
        AuthConfig::Bearer {
            token: token.into(),
        }
    }

    /// Create OAuth2 client credentials config.
    pub fn oauth2(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        AuthConfig::OAuth2 {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            scopes: Vec::new(),
        }
    }

    /// Create OAuth2 refresh-token config.
    pub fn oauth2_refresh_token(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        AuthConfig::OAuth2RefreshToken {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Validate that the required credential material is present.
    pub fn validate(&self) -> ChannelResult<()> {
        match self {
            AuthConfig::None => Ok(()),
            AuthConfig::Basic { username, .. } => {
                if username.is_empty() {
                    return Err(ChannelError::invalid_configuration(
                        "basic auth username is empty",
                    ));
                }
                Ok(())
            }
            AuthConfig::ApiKey { key, .. } => {
                if key.is_empty() {
                    return Err(ChannelError::invalid_configuration("API key is empty"));
                }
                Ok(())
            }
            AuthConfig::Bearer { token } => {
                if token.is_empty() {
                    return Err(ChannelError::invalid_configuration("bearer token is empty"));
                }
                Ok(())
            }
            AuthConfig::OAuth2 {
                token_url,
                client_id,
                ..
            } => {
                if token_url.is_empty() || client_id.is_empty() {
                    return Err(ChannelError::invalid_configuration(
                        "oauth2 token URL and client id are required",
                    ));
                }
                Ok(())
            }
            AuthConfig::OAuth2RefreshToken {
                token_url,
                client_id,
                refresh_token,
                ..
            } => {
                if token_url.is_empty() || client_id.is_empty() {
                    return Err(ChannelError::invalid_configuration(
                        "oauth2 token URL and client id are required",
                    ));
                }
                if refresh_token.is_empty() {
                    return Err(ChannelError::invalid_configuration(
                        "oauth2 refresh token is empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Create a redacted version for logging/display.
    pub fn redacted(&self) -> Self {
        match self {
            AuthConfig::None => AuthConfig::None,
            AuthConfig::Basic { username, .. } => AuthConfig::Basic {
                username: username.clone(),
                password: Some("***REDACTED***".to_string()),
            },
            AuthConfig::ApiKey { header_name, .. } => AuthConfig::ApiKey {
                key: "***REDACTED***".to_string(),
                header_name: header_name.clone(),
            },
            AuthConfig::Bearer { .. } => AuthConfig::Bearer {
                token: "***REDACTED***".to_string(),
            },
            AuthConfig::OAuth2 {
                token_url,
                client_id,
                scopes,
                ..
            } => AuthConfig::OAuth2 {
                token_url: token_url.clone(),
                client_id: client_id.clone(),
                client_secret: Some("***REDACTED***".to_string()),
                scopes: scopes.clone(),
            },
            AuthConfig::OAuth2RefreshToken {
                token_url,
                client_id,
                ..
            } => AuthConfig::OAuth2RefreshToken {
                token_url: token_url.clone(),
                client_id: client_id.clone(),
                client_secret: "***REDACTED***".to_string(),
                refresh_token: "***REDACTED***".to_string(),
            },
        }
    }
}

/// One enterprise customer's connection settings for one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfiguration {
    /// Configuration identifier.
    pub id: ConfigurationId,

    /// Owning enterprise customer.
    pub customer_id: CustomerId,

    /// Target channel.
    pub channel_type: ChannelType,

    /// Human-readable name shown in admin surfaces.
    pub display_name: String,

    /// Deactivated configurations are skipped by the scheduler but kept for
    /// audit-history linkage.
    pub active: bool,

    /// Export completions for audit-track enrollments. Off by default;
    /// most channels only want paid/completed track data.
    #[serde(default)]
    pub include_audit_enrollments: bool,

    /// Hard cap on units per request for this channel. `1` means strict
    /// synchronous per-item calls.
    pub transmission_chunk_size: usize,

    /// Channel API root (base URL or LRS statement endpoint).
    pub endpoint: String,

    /// Channel authentication.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Connection timeouts.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// When non-empty, only content from these catalogs is exported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalogs_to_transmit: Vec<String>,
}

impl ChannelConfiguration {
    /// Create a configuration with default sync preferences.
    pub fn new(
        customer_id: CustomerId,
        channel_type: ChannelType,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: ConfigurationId::new(),
            customer_id,
            channel_type,
            display_name: String::new(),
            active: true,
            include_audit_enrollments: false,
            transmission_chunk_size: default_chunk_size(channel_type),
            endpoint: endpoint.into(),
            auth: AuthConfig::None,
            connection: ConnectionSettings::default(),
            catalogs_to_transmit: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Set the authentication method.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Set the per-request unit cap.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.transmission_chunk_size = size;
        self
    }

    /// Enable export of audit-track completions.
    pub fn with_audit_enrollments(mut self) -> Self {
        self.include_audit_enrollments = true;
        self
    }

    /// Restrict exports to the given catalogs.
    pub fn with_catalogs(mut self, catalogs: Vec<String>) -> Self {
        self.catalogs_to_transmit = catalogs;
        self
    }

    /// The stable channel code for this configuration, as reported by the
    /// configuration API.
    pub fn channel_code(&self) -> &'static str {
        self.channel_type.as_str()
    }

    /// Validate the configuration before any network activity.
    pub fn validate(&self) -> ChannelResult<()> {
        if self.transmission_chunk_size == 0 {
            return Err(ChannelError::invalid_configuration(
                "transmission chunk size must be at least 1",
            ));
        }
        if self.endpoint.is_empty() {
            return Err(ChannelError::invalid_configuration("endpoint is empty"));
        }
        self.auth.validate()
    }

    /// Create a redacted version of this configuration for logging.
    pub fn redacted(&self) -> Self {
        Self {
            auth: self.auth.redacted(),
            ..self.clone()
        }
    }
}

/// Default per-request unit cap per channel. Channels with strict synchronous
/// APIs get 1; batch-capable APIs get a larger window.
fn default_chunk_size(channel_type: ChannelType) -> usize {
    match channel_type {
        ChannelType::Xapi | ChannelType::Moodle => 1,
        ChannelType::SapSuccessFactors => 500,
        _ => 100,
    }
}
