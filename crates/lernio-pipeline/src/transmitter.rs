//! Transmitter
//!
//! Orchestrates one run for one channel configuration: build payloads,
//! compute the due set, chunk, send, and write audit outcomes. Chunks are
//! sent strictly sequentially per configuration, and every chunk's audit
//! write completes before the next chunk goes out, so a crash mid-run leaves
//! the audit store consistent with exactly the chunks actually sent.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use lernio_channel::chunk::{chunk_units, ChunkOutcome, TransmissionChunk};
use lernio_channel::config::ChannelConfiguration;
use lernio_channel::ids::{ConfigurationId, RunId};
use lernio_channel::registry::{ChannelAdapter, ChannelRegistry};
use lernio_channel::types::UnitType;
use lernio_channel::unit::ExportableUnit;

use crate::audit::{AuditRecord, AuditStore};
use crate::builder::{ContentPayloadBuilder, LearnerPayloadBuilder};
use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::exporter::{Exporter, UnitFailure};
use crate::sources::{ContentCatalogSource, LearnerProgressSource};

/// Failure details reported per run are capped at this many entries; the
/// counters always reflect the full totals.
pub const MAX_REPORTED_FAILURES: usize = 25;

/// State of one transmitter run.
///
/// `Done` is reachable even when some units failed; failure is per-unit,
/// not fatal to the run. `Failed` is reserved for runs that terminate before
/// any transmission (upstream data unavailable); `Cancelled` for cooperative
/// cancellation between chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Exporting,
    Transmitting,
    Finalizing,
    Done,
    Failed,
    Cancelled,
}

impl RunState {
    /// Get the string representation used in logs and the API surface.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Exporting => "exporting",
            RunState::Transmitting => "transmitting",
            RunState::Finalizing => "finalizing",
            RunState::Done => "done",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        }
    }

    /// Whether the run has reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed | RunState::Cancelled)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of one transmitter run, surfaced to the scheduler and the
/// reporting API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Identifier of the run.
    pub run_id: RunId,

    /// Configuration the run exported for.
    pub configuration_id: ConfigurationId,

    /// Terminal state (`Done` or `Cancelled`).
    pub state: RunState,

    /// Units that reached an attempt: export failures plus every unit in a
    /// sent chunk. For cancelled runs this is less than the due count.
    pub attempted: usize,

    /// Units acknowledged by the channel.
    pub succeeded: usize,

    /// Units that failed at export or transmission.
    pub failed: usize,

    /// Units skipped as not due (hash matched a prior success).
    pub skipped: usize,

    /// First [`MAX_REPORTED_FAILURES`] per-unit failure details.
    pub failures: Vec<UnitFailure>,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run reached its terminal state.
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Whether every attempted unit was acknowledged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.state == RunState::Done
    }
}

/// Per-run bookkeeping while chunks are in flight.
struct RunTally {
    attempted: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    failures: Vec<UnitFailure>,
}

impl RunTally {
    fn new() -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    fn record_failure(&mut self, item_key: &str, unit_type: UnitType, detail: &str) {
        self.failed += 1;
        if self.failures.len() < MAX_REPORTED_FAILURES {
            self.failures.push(UnitFailure {
                item_key: item_key.to_string(),
                unit_type,
                detail: detail.to_string(),
            });
        }
    }
}

/// Orchestrates Exporter → Chunker → Client → Audit Store for one channel
/// configuration per run.
pub struct Transmitter {
    audit: Arc<dyn AuditStore>,
    registry: Arc<ChannelRegistry>,
    exporter: Exporter,
    content_builder: ContentPayloadBuilder,
    learner_builder: LearnerPayloadBuilder,
}

impl Transmitter {
    /// Create a transmitter over the audit store, adapter registry, and data
    /// sources.
    pub fn new(
        audit: Arc<dyn AuditStore>,
        registry: Arc<ChannelRegistry>,
        catalog_source: Arc<dyn ContentCatalogSource>,
        progress_source: Arc<dyn LearnerProgressSource>,
    ) -> Self {
        Self {
            exporter: Exporter::new(audit.clone()),
            content_builder: ContentPayloadBuilder::new(catalog_source),
            learner_builder: LearnerPayloadBuilder::new(progress_source),
            audit,
            registry,
        }
    }

    /// Execute one run for `config`.
    ///
    /// Acquires the configuration's run guard first; a concurrent trigger
    /// for the same configuration gets `RunInProgress`. The guard is
    /// released in every terminal state. `DataUnavailable` and
    /// `InvalidConfiguration` abort before any transmission and surface as
    /// errors for the scheduler's retry policy.
    #[instrument(
        skip(self, config, ctx, unit_types, since),
        fields(configuration_id = %config.id, run_id = %ctx.run_id, channel = %config.channel_type)
    )]
    pub async fn run(
        &self,
        config: &ChannelConfiguration,
        ctx: &RunContext,
        unit_types: &[UnitType],
        since: Option<DateTime<Utc>>,
    ) -> PipelineResult<RunResult> {
        config.validate()?;

        if !self.audit.try_begin_run(config.id, ctx.run_id).await? {
            return Err(PipelineError::RunInProgress {
                configuration_id: config.id,
            });
        }

        let result = self.run_locked(config, ctx, unit_types, since).await;
        let released = self.audit.finish_run(config.id, ctx.run_id).await;

        match (result, released) {
            (Ok(run), Ok(())) => Ok(run),
            (Err(err), _) => {
                warn!(state = %RunState::Failed, error = %err, "Run terminated early");
                Err(err)
            }
            (Ok(_), Err(err)) => Err(err.into()),
        }
    }

    async fn run_locked(
        &self,
        config: &ChannelConfiguration,
        ctx: &RunContext,
        unit_types: &[UnitType],
        since: Option<DateTime<Utc>>,
    ) -> PipelineResult<RunResult> {
        let started_at = Utc::now();
        let mut state = RunState::Pending;

        let adapter = self.registry.create(config).await?;

        state = transition(state, RunState::Exporting);
        let units = self.build_units(config, unit_types, since).await?;
        let export = self
            .exporter
            .export(config, units, adapter.serializer.as_ref())
            .await?;

        let mut tally = RunTally::new();
        tally.skipped = export.skipped;

        // Failed-at-export units are audited immediately and excluded from
        // the chunk stream.
        for failure in &export.export_failures {
            self.audit
                .upsert(&AuditRecord::failed(
                    config.id,
                    failure.item_key.clone(),
                    failure.unit_type,
                    "",
                    failure.detail.clone(),
                ))
                .await?;
            tally.attempted += 1;
            tally.record_failure(&failure.item_key, failure.unit_type, &failure.detail);
        }

        // Chunks are kept type-homogeneous so clients can route each chunk
        // to one endpoint: content chunks first, then learner chunks.
        let (content, learner): (Vec<_>, Vec<_>) = export
            .due
            .into_iter()
            .partition(|u| u.unit_type == UnitType::ContentMetadata);
        let mut chunks = chunk_units(content, config.transmission_chunk_size)?;
        chunks.extend(chunk_units(learner, config.transmission_chunk_size)?);
        debug!(chunks = chunks.len(), "Chunked due units");

        state = transition(state, RunState::Transmitting);
        let mut cancelled = false;
        for chunk in &chunks {
            // Cooperative checkpoint: never cancel mid-chunk.
            if ctx.is_cancelled() {
                info!("Run cancelled between chunks");
                cancelled = true;
                break;
            }
            self.send_chunk(config, &adapter, chunk, &mut tally).await?;
        }

        state = transition(state, RunState::Finalizing);
        let terminal = if cancelled {
            RunState::Cancelled
        } else {
            RunState::Done
        };
        state = transition(state, terminal);

        info!(
            state = %state,
            attempted = tally.attempted,
            succeeded = tally.succeeded,
            failed = tally.failed,
            skipped = tally.skipped,
            "Run complete"
        );

        Ok(RunResult {
            run_id: ctx.run_id,
            configuration_id: config.id,
            state,
            attempted: tally.attempted,
            succeeded: tally.succeeded,
            failed: tally.failed,
            skipped: tally.skipped,
            failures: tally.failures,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Build the normalized units for the requested unit types, content
    /// metadata first.
    async fn build_units(
        &self,
        config: &ChannelConfiguration,
        unit_types: &[UnitType],
        since: Option<DateTime<Utc>>,
    ) -> PipelineResult<Vec<ExportableUnit>> {
        let mut units = Vec::new();
        if unit_types.contains(&UnitType::ContentMetadata) {
            units.extend(self.content_builder.build(config, since).await?);
        }
        if unit_types.contains(&UnitType::LearnerData) {
            units.extend(self.learner_builder.build(config, since).await?);
        }
        Ok(units)
    }

    /// Send one chunk and write its audit outcome before returning, so the
    /// audit store is always a true prefix of what was sent.
    async fn send_chunk(
        &self,
        config: &ChannelConfiguration,
        adapter: &ChannelAdapter,
        chunk: &TransmissionChunk,
        tally: &mut RunTally,
    ) -> PipelineResult<()> {
        let outcome = match adapter.client.send(chunk).await {
            Ok(outcome) => outcome,
            // A client-level error is attributed to every unit in the chunk.
            Err(err) => {
                warn!(error = %err, size = chunk.len(), "Chunk send failed");
                ChunkOutcome::all_failed(chunk, err.to_string())
            }
        };

        let by_key: HashMap<&str, &lernio_channel::unit::SerializedUnit> = chunk
            .items
            .iter()
            .map(|u| (u.item_key.as_str(), u))
            .collect();
        let mut accounted: Vec<&str> = Vec::with_capacity(chunk.len());

        tally.attempted += chunk.len();

        for item_key in &outcome.succeeded {
            let Some(unit) = by_key.get(item_key.as_str()) else {
                warn!(item_key = %item_key, "Client reported success for unknown item");
                continue;
            };
            accounted.push(&unit.item_key);
            self.audit
                .upsert(&AuditRecord::success(
                    config.id,
                    unit.item_key.clone(),
                    unit.unit_type,
                    unit.content_hash.clone(),
                ))
                .await?;
            tally.succeeded += 1;
        }

        for (item_key, detail) in &outcome.failed {
            let Some(unit) = by_key.get(item_key.as_str()) else {
                warn!(item_key = %item_key, "Client reported failure for unknown item");
                continue;
            };
            accounted.push(&unit.item_key);
            self.audit
                .upsert(&AuditRecord::failed(
                    config.id,
                    unit.item_key.clone(),
                    unit.unit_type,
                    unit.content_hash.clone(),
                    detail.clone(),
                ))
                .await?;
            tally.record_failure(&unit.item_key, unit.unit_type, detail);
        }

        // A chunk item the client never accounted for is a failure, not a
        // silent drop.
        for unit in &chunk.items {
            if !accounted.contains(&unit.item_key.as_str()) {
                let detail = "no per-item outcome reported by channel client";
                self.audit
                    .upsert(&AuditRecord::failed(
                        config.id,
                        unit.item_key.clone(),
                        unit.unit_type,
                        unit.content_hash.clone(),
                        detail,
                    ))
                    .await?;
                tally.record_failure(&unit.item_key, unit.unit_type, detail);
            }
        }

        Ok(())
    }
}

/// Log and apply one state-machine transition.
fn transition(from: RunState, to: RunState) -> RunState {
    debug!(from = %from, to = %to, "Run state transition");
    to
}
