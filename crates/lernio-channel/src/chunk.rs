//! Transmission chunking
//!
//! Splits a run's serialized units into transmission-sized batches and
//! defines the uniform per-chunk outcome shape all channel clients report.

use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, ChannelResult};
use crate::unit::SerializedUnit;

/// An ordered batch of serialized units bounded by the channel's per-request
/// cap. Exists only within one transmitter run; never persisted.
#[derive(Debug, Clone)]
pub struct TransmissionChunk {
    /// Units in this chunk, in export order.
    pub items: Vec<SerializedUnit>,
}

impl TransmissionChunk {
    /// Number of units in the chunk.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item keys of every unit in the chunk, in order.
    pub fn item_keys(&self) -> Vec<String> {
        self.items.iter().map(|u| u.item_key.clone()).collect()
    }

    /// The wire payloads of every unit in the chunk, in order.
    pub fn payloads(&self) -> Vec<&serde_json::Value> {
        self.items.iter().map(|u| &u.payload).collect()
    }
}

/// Split serialized units into chunks of at most `max_size` units.
///
/// Grouping is deterministic and left-to-right: input order is preserved and
/// every chunk except possibly the last contains exactly `max_size` units.
/// A `max_size` of zero is a configuration error and fails before any network
/// activity.
pub fn chunk_units(
    units: Vec<SerializedUnit>,
    max_size: usize,
) -> ChannelResult<Vec<TransmissionChunk>> {
    if max_size == 0 {
        return Err(ChannelError::invalid_configuration(
            "transmission chunk size must be at least 1",
        ));
    }

    let mut chunks = Vec::with_capacity(units.len().div_ceil(max_size));
    let mut items = Vec::with_capacity(max_size.min(units.len()));

    for unit in units {
        items.push(unit);
        if items.len() == max_size {
            chunks.push(TransmissionChunk {
                items: std::mem::take(&mut items),
            });
        }
    }
    if !items.is_empty() {
        chunks.push(TransmissionChunk { items });
    }

    Ok(chunks)
}

/// Per-item outcome of sending one chunk.
///
/// Clients must account for every unit in the chunk: a whole-chunk failure
/// marks every item failed with the same detail rather than dropping any.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkOutcome {
    /// Item keys acknowledged by the remote channel.
    pub succeeded: Vec<String>,

    /// Item keys rejected or not delivered, with error detail.
    pub failed: Vec<(String, String)>,
}

impl ChunkOutcome {
    /// Create an empty outcome to fill in item by item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every unit in the chunk succeeded.
    pub fn all_succeeded(chunk: &TransmissionChunk) -> Self {
        Self {
            succeeded: chunk.item_keys(),
            failed: Vec::new(),
        }
    }

    /// Mark every unit in the chunk failed with the same error detail.
    pub fn all_failed(chunk: &TransmissionChunk, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            succeeded: Vec::new(),
            failed: chunk
                .item_keys()
                .into_iter()
                .map(|key| (key, detail.clone()))
                .collect(),
        }
    }

    /// Record one succeeded item.
    pub fn record_success(&mut self, item_key: impl Into<String>) {
        self.succeeded.push(item_key.into());
    }

    /// Record one failed item.
    pub fn record_failure(&mut self, item_key: impl Into<String>, detail: impl Into<String>) {
        self.failed.push((item_key.into(), detail.into()));
    }

    /// Total number of items accounted for.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
