//! Channel adapter registry
//!
//! Maps the channel-type tag on a configuration to the factory that builds
//! that channel's client + serializer pair. Asking for an unregistered type
//! is a programmer/integration error, not a runtime condition.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::ChannelConfiguration;
use crate::error::{ChannelError, ChannelResult};
use crate::traits::{ChannelClient, WireSerializer};
use crate::types::ChannelType;

/// A client + serializer pair for one channel configuration.
#[derive(Clone)]
pub struct ChannelAdapter {
    /// Transport client.
    pub client: Arc<dyn ChannelClient>,
    /// Wire serializer.
    pub serializer: Arc<dyn WireSerializer>,
}

impl std::fmt::Debug for ChannelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelAdapter").finish_non_exhaustive()
    }
}

/// Factory building an adapter from a configuration.
pub type AdapterFactory =
    Arc<dyn Fn(&ChannelConfiguration) -> ChannelResult<ChannelAdapter> + Send + Sync>;

/// Registry of adapter factories keyed by channel type.
#[derive(Default)]
pub struct ChannelRegistry {
    factories: RwLock<HashMap<ChannelType, AdapterFactory>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a channel type, replacing any previous one.
    pub async fn register<F>(&self, channel_type: ChannelType, factory: F)
    where
        F: Fn(&ChannelConfiguration) -> ChannelResult<ChannelAdapter> + Send + Sync + 'static,
    {
        debug!(channel_type = %channel_type, "Registering channel adapter factory");
        let mut factories = self.factories.write().await;
        factories.insert(channel_type, Arc::new(factory));
    }

    /// Build an adapter for the configuration's channel type.
    ///
    /// Fails with `UnknownChannelType` when no factory is registered.
    pub async fn create(&self, config: &ChannelConfiguration) -> ChannelResult<ChannelAdapter> {
        let factory = {
            let factories = self.factories.read().await;
            factories.get(&config.channel_type).cloned()
        };

        match factory {
            Some(factory) => factory(config),
            None => Err(ChannelError::UnknownChannelType {
                channel_type: config.channel_type.to_string(),
            }),
        }
    }

    /// Whether a factory is registered for the channel type.
    pub async fn is_registered(&self, channel_type: ChannelType) -> bool {
        self.factories.read().await.contains_key(&channel_type)
    }

    /// The channel types with a registered factory.
    pub async fn supported_types(&self) -> Vec<ChannelType> {
        let mut types: Vec<ChannelType> =
            self.factories.read().await.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }
}
