//! Configuration collaborator boundary
//!
//! Channel configurations are created and edited by the external
//! configuration service; the pipeline reads them through this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lernio_channel::config::ChannelConfiguration;
use lernio_channel::ids::{ConfigurationId, CustomerId};

use crate::error::PipelineResult;

/// Read-only access to channel configurations.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    /// Fetch one configuration by id.
    async fn get_configuration(
        &self,
        id: ConfigurationId,
    ) -> PipelineResult<Option<ChannelConfiguration>>;

    /// All active configurations for a customer, ordered by channel code.
    async fn list_active_configurations(
        &self,
        customer_id: CustomerId,
    ) -> PipelineResult<Vec<ChannelConfiguration>>;
}

/// In-memory configuration provider for tests and embedding.
#[derive(Default)]
pub struct MemoryConfigurationProvider {
    configs: RwLock<HashMap<ConfigurationId, ChannelConfiguration>>,
}

impl MemoryConfigurationProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a configuration.
    pub async fn upsert(&self, config: ChannelConfiguration) {
        self.configs.write().await.insert(config.id, config);
    }
}

#[async_trait]
impl ConfigurationProvider for MemoryConfigurationProvider {
    async fn get_configuration(
        &self,
        id: ConfigurationId,
    ) -> PipelineResult<Option<ChannelConfiguration>> {
        Ok(self.configs.read().await.get(&id).cloned())
    }

    async fn list_active_configurations(
        &self,
        customer_id: CustomerId,
    ) -> PipelineResult<Vec<ChannelConfiguration>> {
        let configs = self.configs.read().await;
        let mut out: Vec<ChannelConfiguration> = configs
            .values()
            .filter(|c| c.customer_id == customer_id && c.active)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.channel_code());
        Ok(out)
    }
}
