//! # xAPI Channel Adapter
//!
//! Generic activity-stream adapter for any xAPI 1.0.3 learning record
//! store. Learner completions become xAPI statements saved one per request;
//! the chunk size for this channel is hard-capped at 1, and outcomes are
//! whole-chunk only because the LRS offers no per-item status.
//!
//! Register with the channel registry:
//!
//! ```ignore
//! use lernio_channel::prelude::*;
//! use lernio_channel_xapi::xapi_factory;
//!
//! registry.register(ChannelType::Xapi, xapi_factory).await;
//! ```

use std::sync::Arc;

use lernio_channel::config::ChannelConfiguration;
use lernio_channel::error::ChannelResult;
use lernio_channel::registry::ChannelAdapter;

pub mod client;
pub mod config;
pub mod serializer;

pub use client::XapiClient;
pub use config::{XapiConfig, XAPI_VERSION};
pub use serializer::XapiSerializer;

/// Build an xAPI adapter from a channel configuration.
pub fn xapi_factory(config: &ChannelConfiguration) -> ChannelResult<ChannelAdapter> {
    let xapi_config = XapiConfig::from_channel_config(config)?;
    Ok(ChannelAdapter {
        client: Arc::new(XapiClient::new(xapi_config)?),
        serializer: Arc::new(XapiSerializer::new()),
    })
}
