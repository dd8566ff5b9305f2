//! Due-set exporter
//!
//! Decides which units are due against the audit history and serializes the
//! due ones into channel wire payloads. The due-set rules are shared across
//! all channels and never overridden; channels only contribute the
//! serialization step through `WireSerializer`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use lernio_channel::config::ChannelConfiguration;
use lernio_channel::traits::WireSerializer;
use lernio_channel::types::{TransmissionStatus, UnitType};
use lernio_channel::unit::{ExportableUnit, SerializedUnit};

use crate::audit::AuditStore;
use crate::error::PipelineResult;

/// One unit that could not be exported or transmitted, for caller-visible
/// reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Stable key of the failed unit.
    pub item_key: String,

    /// Kind of the failed unit.
    pub unit_type: UnitType,

    /// Error detail.
    pub detail: String,
}

/// Result of one export pass.
#[derive(Debug, Default)]
pub struct ExportOutcome {
    /// Units due for transmission, serialized, in input order.
    pub due: Vec<SerializedUnit>,

    /// Units skipped because their hash matches a prior success.
    pub skipped: usize,

    /// Units that failed to serialize. Recorded as failed and excluded from
    /// the chunk stream; the export continues past them.
    pub export_failures: Vec<UnitFailure>,
}

/// Shared due-set computation over the audit history.
pub struct Exporter {
    audit: Arc<dyn AuditStore>,
}

impl Exporter {
    /// Create an exporter over an audit store.
    pub fn new(audit: Arc<dyn AuditStore>) -> Self {
        Self { audit }
    }

    /// Export the due subset of `units` for this configuration.
    ///
    /// A unit is due when no audit record exists for its key, when the stored
    /// hash differs from the unit's current hash, or when the last attempt
    /// failed. Units whose hash matches a prior success are skipped, which is
    /// what makes re-runs idempotent.
    #[instrument(skip(self, config, units, serializer), fields(configuration_id = %config.id))]
    pub async fn export(
        &self,
        config: &ChannelConfiguration,
        units: Vec<ExportableUnit>,
        serializer: &dyn WireSerializer,
    ) -> PipelineResult<ExportOutcome> {
        let mut outcome = ExportOutcome::default();

        for unit in units {
            if !self.is_due(config, &unit).await? {
                outcome.skipped += 1;
                continue;
            }

            let serialized = match unit.unit_type {
                UnitType::ContentMetadata => serializer.serialize_content(&unit),
                UnitType::LearnerData => serializer.serialize_learner(&unit),
            };

            match serialized {
                Ok(payload) => outcome.due.push(SerializedUnit::new(&unit, payload)),
                Err(err) => {
                    warn!(
                        item_key = %unit.item_key,
                        error = %err,
                        "Unit failed to serialize, continuing export"
                    );
                    outcome.export_failures.push(UnitFailure {
                        item_key: unit.item_key,
                        unit_type: unit.unit_type,
                        detail: err.to_string(),
                    });
                }
            }
        }

        debug!(
            due = outcome.due.len(),
            skipped = outcome.skipped,
            failed = outcome.export_failures.len(),
            "Export pass complete"
        );
        Ok(outcome)
    }

    /// Apply the shared due-set rules for one unit.
    async fn is_due(
        &self,
        config: &ChannelConfiguration,
        unit: &ExportableUnit,
    ) -> PipelineResult<bool> {
        let record = self
            .audit
            .get(config.id, &unit.item_key, unit.unit_type)
            .await?;

        Ok(match record {
            None => true,
            Some(record) => {
                record.last_status == TransmissionStatus::Failed
                    || record.last_content_hash != unit.content_hash
            }
        })
    }
}
