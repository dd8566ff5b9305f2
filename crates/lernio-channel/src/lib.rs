//! # Channel Integration Framework
//!
//! Core abstractions for transmitting enterprise learning data to external
//! learning channels (Canvas, Blackboard, Moodle, SAP SuccessFactors,
//! Cornerstone, Degreed, xAPI activity streams).
//!
//! ## Architecture
//!
//! Each channel contributes one [`ChannelClient`] (transport, auth, response
//! translation) and one [`WireSerializer`] (normalized fields → wire schema),
//! registered in a [`ChannelRegistry`] keyed by [`ChannelType`]. The
//! orchestration layer in `lernio-pipeline` stays channel-agnostic: it works
//! in [`ExportableUnit`]s, batches them into [`TransmissionChunk`]s honoring
//! the per-channel cap, and interprets uniform [`ChunkOutcome`]s.
//!
//! ## Example
//!
//! ```ignore
//! use lernio_channel::prelude::*;
//!
//! let registry = ChannelRegistry::new();
//! registry.register(ChannelType::Canvas, canvas_factory).await;
//!
//! let adapter = registry.create(&configuration).await?;
//! adapter.client.probe().await?;
//!
//! let chunks = chunk_units(serialized, configuration.transmission_chunk_size)?;
//! for chunk in &chunks {
//!     let outcome = adapter.client.send(chunk).await?;
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`ids`] - Type-safe identifiers (`ConfigurationId`, `CustomerId`, `RunId`)
//! - [`types`] - Channel, unit, status, and health enums
//! - [`error`] - Error types with transient/permanent classification
//! - [`config`] - `ChannelConfiguration` and authentication settings
//! - [`unit`] - Exportable units and deterministic content hashing
//! - [`chunk`] - Chunking and the per-chunk outcome shape
//! - [`traits`] - `ChannelClient` / `WireSerializer` contracts
//! - [`registry`] - Adapter factory registry

pub mod chunk;
pub mod config;
pub mod error;
pub mod ids;
pub mod registry;
pub mod traits;
pub mod types;
pub mod unit;

/// Prelude module for convenient imports.
///
/// ```
/// use lernio_channel::prelude::*;
/// ```
pub mod prelude {
    // IDs
    pub use crate::ids::{ConfigurationId, CustomerId, RunId};

    // Types and enums
    pub use crate::types::{ChannelType, HealthStatus, TransmissionStatus, UnitType};

    // Error handling
    pub use crate::error::{ChannelError, ChannelResult};

    // Configuration
    pub use crate::config::{AuthConfig, ChannelConfiguration, ConnectionSettings};

    // Units and chunks
    pub use crate::chunk::{chunk_units, ChunkOutcome, TransmissionChunk};
    pub use crate::unit::{content_hash, ExportableUnit, SerializedUnit};

    // Traits
    pub use crate::traits::{ChannelClient, WireSerializer};

    // Registry
    pub use crate::registry::{AdapterFactory, ChannelAdapter, ChannelRegistry};
}

// Re-export async_trait for client implementors
pub use async_trait::async_trait;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _id = ConfigurationId::new();
        let _ct = ChannelType::Canvas;
        let _ts = TransmissionStatus::Pending;
        let _hs = HealthStatus::Ok;
        let unit = ExportableUnit::new(
            "course-1",
            UnitType::ContentMetadata,
            serde_json::json!({"title": "Intro"}),
        );
        assert_eq!(unit.content_hash.len(), 64);
    }
}
