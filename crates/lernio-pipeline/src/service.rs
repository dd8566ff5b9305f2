//! Sync service
//!
//! Entry points the scheduler and configuration API call into: trigger one
//! sync run by configuration id, and run a health check. Trigger delivery is
//! at-least-once; the due-set diff and the run guard make a duplicate
//! trigger harmless.

use std::sync::Arc;

use tracing::{info, instrument};

use lernio_channel::config::ChannelConfiguration;
use lernio_channel::error::ChannelError;
use lernio_channel::ids::ConfigurationId;
use lernio_channel::types::UnitType;

use crate::configs::ConfigurationProvider;
use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::health::{HealthCheckResult, HealthChecker};
use crate::transmitter::{RunResult, Transmitter};

/// Facade over the transmitter and health checker, resolving configurations
/// through the external configuration service.
pub struct SyncService {
    provider: Arc<dyn ConfigurationProvider>,
    transmitter: Arc<Transmitter>,
    health: HealthChecker,
}

impl SyncService {
    /// Create a service.
    pub fn new(
        provider: Arc<dyn ConfigurationProvider>,
        transmitter: Arc<Transmitter>,
        health: HealthChecker,
    ) -> Self {
        Self {
            provider,
            transmitter,
            health,
        }
    }

    /// Run one sync for a configuration, on behalf of `acting_user`.
    #[instrument(skip(self, unit_types, acting_user))]
    pub async fn trigger_sync(
        &self,
        configuration_id: ConfigurationId,
        unit_types: &[UnitType],
        acting_user: &str,
    ) -> PipelineResult<RunResult> {
        let config = self.resolve(configuration_id).await?;
        if !config.active {
            return Err(ChannelError::invalid_configuration(format!(
                "configuration {configuration_id} is deactivated"
            ))
            .into());
        }

        let ctx = RunContext::new(config.customer_id, acting_user);
        info!(
            configuration_id = %configuration_id,
            run_id = %ctx.run_id,
            acting_user = %ctx.acting_user,
            "Sync triggered"
        );
        self.transmitter.run(&config, &ctx, unit_types, None).await
    }

    /// Health-check a configuration for the configuration API.
    pub async fn check_health(
        &self,
        configuration_id: ConfigurationId,
    ) -> PipelineResult<HealthCheckResult> {
        let config = self.resolve(configuration_id).await?;
        Ok(self.health.check(&config).await?)
    }

    async fn resolve(
        &self,
        configuration_id: ConfigurationId,
    ) -> PipelineResult<ChannelConfiguration> {
        self.provider
            .get_configuration(configuration_id)
            .await?
            .ok_or(PipelineError::ConfigurationNotFound { configuration_id })
    }
}
