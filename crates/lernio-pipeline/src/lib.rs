//! # Export/Transmit Pipeline
//!
//! Orchestration layer for synchronizing enterprise learning data out to
//! external channels. One scheduled run per channel configuration flows
//! through: payload builders (raw records → normalized units), the due-set
//! exporter (diff against audit history), the chunker, the channel client,
//! and back into the audit store.
//!
//! ## Incremental by construction
//!
//! The audit store keeps one record per (configuration, item key, unit type)
//! with the hash of the last successfully transmitted payload. A unit is due
//! when it is new, changed, or previously failed, so re-running a
//! configuration with unchanged upstream data transmits nothing, and a
//! doubly-delivered trigger is harmless.
//!
//! ## Failure isolation
//!
//! Failure is per-unit, never fatal to a run: serialization errors drop the
//! one unit, chunk failures mark that chunk's items failed, and later chunks
//! still go out. The audit write for a chunk completes before the next chunk
//! is sent, so audit state is always a true prefix of what was sent.
//!
//! ## Crate Organization
//!
//! - [`audit`] - Durable transmission audit store (in-memory and Postgres)
//! - [`sources`] - Data-access collaborator traits and raw records
//! - [`builder`] - Content/learner payload builders
//! - [`exporter`] - Shared due-set computation
//! - [`transmitter`] - Per-run state machine and orchestration
//! - [`health`] - Channel health checks
//! - [`service`] - Scheduler/API entry points (trigger sync, health check)
//! - [`context`] - Explicit per-run context
//! - [`configs`] - Configuration collaborator boundary

pub mod audit;
pub mod builder;
pub mod configs;
pub mod context;
pub mod error;
pub mod exporter;
pub mod health;
pub mod service;
pub mod sources;
pub mod transmitter;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::audit::{AuditError, AuditRecord, AuditResult, AuditStore, MemoryAuditStore, PgAuditStore};
    pub use crate::builder::{ContentPayloadBuilder, LearnerPayloadBuilder};
    pub use crate::configs::{ConfigurationProvider, MemoryConfigurationProvider};
    pub use crate::context::RunContext;
    pub use crate::error::{PipelineError, PipelineResult};
    pub use crate::exporter::{ExportOutcome, Exporter, UnitFailure};
    pub use crate::health::{HealthCheckResult, HealthChecker};
    pub use crate::service::SyncService;
    pub use crate::sources::{
        ContentCatalogSource, ContentRecord, LearnerProgressSource, MemoryCatalogSource,
        MemoryProgressSource, ProgressRecord,
    };
    pub use crate::transmitter::{RunResult, RunState, Transmitter, MAX_REPORTED_FAILURES};
}
