//! Channel contract traits
//!
//! One `ChannelClient` + one `WireSerializer` pair per channel, resolved
//! through the registry by the channel-type tag on a configuration.

use async_trait::async_trait;

use crate::chunk::{ChunkOutcome, TransmissionChunk};
use crate::error::{ChannelError, ChannelResult};
use crate::types::ChannelType;
use crate::unit::ExportableUnit;

/// Transport client for one channel.
///
/// A client owns connection setup, auth-token acquisition, and the
/// translation of remote responses into the uniform `ChunkOutcome` shape.
/// Clients are constructed per run, so cached tokens never outlive a run.
#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// The channel this client talks to.
    fn channel_type(&self) -> ChannelType;

    /// Display name for this client instance.
    fn display_name(&self) -> &str;

    /// Transmit one chunk and report the per-item outcome.
    ///
    /// A whole-chunk failure (timeout, 5xx, auth failure) must be reported
    /// as an outcome with every item failed, never as dropped items. An
    /// `Err` return is reserved for conditions the client cannot attribute
    /// to the chunk at all; the transmitter treats it as a whole-chunk
    /// failure too.
    async fn send(&self, chunk: &TransmissionChunk) -> ChannelResult<ChunkOutcome>;

    /// Cheapest possible credential-validating call, used by the health
    /// checker. Must not transmit any learning data.
    async fn probe(&self) -> ChannelResult<()>;
}

/// Serialization of normalized units into one channel's wire schema.
///
/// The default method bodies fail with `Unsupported`: the trait is the
/// abstract contract, and a channel only overrides the unit kinds it can
/// carry. Serialization is CPU-bound and must not block.
pub trait WireSerializer: Send + Sync {
    /// Serialize one content-metadata unit.
    fn serialize_content(&self, unit: &ExportableUnit) -> ChannelResult<serde_json::Value> {
        let _ = unit;
        Err(ChannelError::unsupported("serialize_content"))
    }

    /// Serialize one learner-data unit.
    fn serialize_learner(&self, unit: &ExportableUnit) -> ChannelResult<serde_json::Value> {
        let _ = unit;
        Err(ChannelError::unsupported("serialize_learner"))
    }
}
