//! # Canvas Channel Adapter
//!
//! Reference batch-capable adapter: OAuth2 refresh-token authentication,
//! bulk course/completion endpoints, and per-item outcome mapping (Canvas
//! returns bulk results in request order).
//!
//! Register with the channel registry:
//!
//! ```ignore
//! use lernio_channel::prelude::*;
//! use lernio_channel_canvas::canvas_factory;
//!
//! registry.register(ChannelType::Canvas, canvas_factory).await;
//! ```

use std::sync::Arc;

use lernio_channel::config::ChannelConfiguration;
use lernio_channel::error::ChannelResult;
use lernio_channel::registry::ChannelAdapter;

pub mod client;
pub mod config;
pub mod serializer;

pub use client::CanvasClient;
pub use config::CanvasConfig;
pub use serializer::CanvasSerializer;

/// Build a Canvas adapter from a channel configuration.
pub fn canvas_factory(config: &ChannelConfiguration) -> ChannelResult<ChannelAdapter> {
    let canvas_config = CanvasConfig::from_channel_config(config)?;
    Ok(ChannelAdapter {
        client: Arc::new(CanvasClient::new(canvas_config)?),
        serializer: Arc::new(CanvasSerializer::new()),
    })
}
