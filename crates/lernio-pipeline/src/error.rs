//! Pipeline error types

use thiserror::Error;

use lernio_channel::error::ChannelError;
use lernio_channel::ids::ConfigurationId;

use crate::audit::AuditError;

/// Error that can occur while orchestrating a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream catalog/progress source unreachable. Aborts the run before
    /// any transmission; the scheduler applies its own retry policy.
    #[error("upstream data unavailable: {message}")]
    DataUnavailable { message: String },

    /// Another run currently holds the configuration's run guard.
    #[error("a run is already in progress for configuration {configuration_id}")]
    RunInProgress { configuration_id: ConfigurationId },

    /// No configuration with this id exists.
    #[error("configuration not found: {configuration_id}")]
    ConfigurationNotFound { configuration_id: ConfigurationId },

    /// Audit store failure.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Channel-level failure (configuration, transport, serialization).
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl PipelineError {
    /// Create a data unavailable error.
    pub fn data_unavailable(message: impl Into<String>) -> Self {
        PipelineError::DataUnavailable {
            message: message.into(),
        }
    }

    /// Get an error code for classification and reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::DataUnavailable { .. } => "DATA_UNAVAILABLE",
            PipelineError::RunInProgress { .. } => "RUN_IN_PROGRESS",
            PipelineError::ConfigurationNotFound { .. } => "CONFIGURATION_NOT_FOUND",
            PipelineError::Audit(_) => "AUDIT_ERROR",
            PipelineError::Channel(err) => err.error_code(),
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
