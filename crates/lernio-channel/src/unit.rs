//! Exportable units
//!
//! An `ExportableUnit` is the channel-agnostic representation of one
//! exportable thing: one content catalog item or one learner-progress event.
//! Units are produced fresh every run; only their transmission outcome is
//! persisted (in the audit store), keyed by `item_key` and `unit_type`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::UnitType;

/// Channel-agnostic representation of one exportable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableUnit {
    /// Stable key, unique within one channel configuration.
    pub item_key: String,

    /// Kind of unit.
    pub unit_type: UnitType,

    /// Normalized field set. Serialized per channel by a `WireSerializer`.
    pub fields: serde_json::Value,

    /// Digest over the normalized fields, used for change detection.
    pub content_hash: String,
}

impl ExportableUnit {
    /// Create a unit, computing the content hash from the normalized fields.
    ///
    /// The hash is deterministic: identical fields produce an identical hash
    /// regardless of JSON key order, so two builds of unchanged upstream data
    /// compare equal against the audit history.
    pub fn new(
        item_key: impl Into<String>,
        unit_type: UnitType,
        fields: serde_json::Value,
    ) -> Self {
        let content_hash = content_hash(&fields);
        Self {
            item_key: item_key.into(),
            unit_type,
            fields,
            content_hash,
        }
    }
}

/// One unit serialized into a channel wire payload, ready for chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedUnit {
    /// Stable key of the source unit.
    pub item_key: String,

    /// Kind of the source unit.
    pub unit_type: UnitType,

    /// Hash of the source unit, written to the audit store on success.
    pub content_hash: String,

    /// Channel-specific wire payload.
    pub payload: serde_json::Value,
}

impl SerializedUnit {
    /// Pair a unit with its channel wire payload.
    pub fn new(unit: &ExportableUnit, payload: serde_json::Value) -> Self {
        Self {
            item_key: unit.item_key.clone(),
            unit_type: unit.unit_type,
            content_hash: unit.content_hash.clone(),
            payload,
        }
    }
}

/// Compute the sha256 hex digest of the canonical form of a JSON value.
///
/// Object keys are sorted recursively before hashing so that key order never
/// affects change detection.
pub fn content_hash(fields: &serde_json::Value) -> String {
    let canonical =
        serde_json::to_string(&sort_json_keys(fields)).unwrap_or_else(|_| fields.to_string());
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recursively sort JSON object keys for a canonical representation.
fn sort_json_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), sort_json_keys(v)))
                .collect();
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sort_json_keys).collect())
        }
        other => other.clone(),
    }
}
