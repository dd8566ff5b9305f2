//! Channel health checks
//!
//! Verifies that a channel configuration is reachable and authenticated
//! without touching the audit store or exporting anything. Expected failure
//! modes come back as a status enum, never as an error; the only error path
//! is the programmer error of an unregistered channel type.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use lernio_channel::config::ChannelConfiguration;
use lernio_channel::error::{ChannelError, ChannelResult};
use lernio_channel::registry::ChannelRegistry;
use lernio_channel::types::HealthStatus;

/// Outcome of one health check, consumed by the configuration API's
/// health-check endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Whether the channel is usable as configured.
    pub is_healthy: bool,

    /// Status detail.
    pub health_status: HealthStatus,
}

impl HealthCheckResult {
    fn from_status(health_status: HealthStatus) -> Self {
        Self {
            is_healthy: health_status.is_healthy(),
            health_status,
        }
    }
}

/// Performs the cheapest possible channel-specific probe.
pub struct HealthChecker {
    registry: Arc<ChannelRegistry>,
}

impl HealthChecker {
    /// Create a checker over the adapter registry.
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Check one configuration.
    ///
    /// Returns `Err` only for an unregistered channel type; every expected
    /// failure mode maps to a status.
    #[instrument(skip(self, config), fields(configuration_id = %config.id, channel = %config.channel_type))]
    pub async fn check(&self, config: &ChannelConfiguration) -> ChannelResult<HealthCheckResult> {
        if let Err(err) = config.validate() {
            debug!(error = %err, "Configuration failed validation");
            return Ok(HealthCheckResult::from_status(HealthStatus::InvalidConfig));
        }

        let adapter = match self.registry.create(config).await {
            Ok(adapter) => adapter,
            Err(err @ ChannelError::UnknownChannelType { .. }) => return Err(err),
            Err(err) => {
                debug!(error = %err, "Adapter construction failed");
                return Ok(HealthCheckResult::from_status(HealthStatus::InvalidConfig));
            }
        };

        let status = match adapter.client.probe().await {
            Ok(()) => HealthStatus::Ok,
            Err(ChannelError::AuthenticationFailed) => HealthStatus::AuthFailed,
            Err(ChannelError::InvalidConfiguration { .. })
            | Err(ChannelError::Unsupported { .. }) => HealthStatus::InvalidConfig,
            Err(err) => {
                debug!(error = %err, "Probe failed");
                HealthStatus::Unreachable
            }
        };

        Ok(HealthCheckResult::from_status(status))
    }
}
