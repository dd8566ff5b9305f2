//! Channel framework error types
//!
//! Error definitions with transient/permanent classification, so callers can
//! decide whether a failed unit is worth re-attempting on a later run.

use thiserror::Error;

/// Error that can occur while talking to a learning channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    // Connection errors (usually transient)
    /// Failed to establish a connection to the channel.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Request timed out.
    #[error("request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Channel is temporarily unavailable (5xx, throttled past retry budget).
    #[error("channel unavailable: {message}")]
    RemoteUnavailable { message: String },

    /// Network error during communication.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Authentication errors (permanent until credentials change)
    /// Channel rejected the credentials.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    // Configuration errors (permanent)
    /// Channel configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// No adapter is registered for the channel type. A programmer error,
    /// not a runtime condition to recover from.
    #[error("unknown channel type: {channel_type}")]
    UnknownChannelType { channel_type: String },

    // Per-unit errors
    /// Serializing one unit into the channel wire shape failed.
    #[error("serialization failed for unit '{item_key}': {message}")]
    Serialization { item_key: String, message: String },

    /// The operation is not implemented by this channel. Raised by the
    /// abstract serializer contract when no channel override exists.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: String },
}

impl ChannelError {
    /// Check if this error is transient and a later run may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChannelError::ConnectionFailed { .. }
                | ChannelError::Timeout { .. }
                | ChannelError::RemoteUnavailable { .. }
                | ChannelError::Network { .. }
        )
    }

    /// Check if this error is permanent and needs configuration or code changes.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification and reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            ChannelError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ChannelError::Timeout { .. } => "TIMEOUT",
            ChannelError::RemoteUnavailable { .. } => "REMOTE_UNAVAILABLE",
            ChannelError::Network { .. } => "NETWORK_ERROR",
            ChannelError::AuthenticationFailed => "AUTH_FAILED",
            ChannelError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ChannelError::UnknownChannelType { .. } => "UNKNOWN_CHANNEL_TYPE",
            ChannelError::Serialization { .. } => "SERIALIZATION_FAILED",
            ChannelError::Unsupported { .. } => "UNSUPPORTED_OPERATION",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ChannelError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ChannelError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        ChannelError::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ChannelError::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a remote unavailable error.
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        ChannelError::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ChannelError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a per-unit serialization error.
    pub fn serialization(item_key: impl Into<String>, message: impl Into<String>) -> Self {
        ChannelError::Serialization {
            item_key: item_key.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        ChannelError::Unsupported {
            operation: operation.into(),
        }
    }
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
