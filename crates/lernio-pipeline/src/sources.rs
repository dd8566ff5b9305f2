//! Data-access collaborators
//!
//! The catalog and progress sources are external systems; the pipeline only
//! sees them through these traits. Raw records carry the field set the
//! payload builders normalize into exportable units.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lernio_channel::ids::CustomerId;

use crate::error::PipelineResult;

/// One raw content-catalog record as the platform stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Stable content key (e.g. `course-v1:AcmeX+RUST101+2026`).
    pub content_key: String,

    /// Course/program title.
    pub title: String,

    /// Short description.
    pub description: String,

    /// Deep link into the learning platform.
    pub content_url: String,

    /// Card image URL.
    pub image_url: Option<String>,

    /// Content kind (course, program, pathway).
    pub content_type: String,

    /// Catalog the record belongs to.
    pub catalog: String,

    /// List price, if the content is paid.
    pub price: Option<f64>,

    /// Content language tag.
    pub language: String,
}

/// One raw learner-progress record as the platform stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Learner identifier (platform email or LMS user id).
    pub learner_id: String,

    /// Content the progress applies to.
    pub content_key: String,

    /// Progress status (completed, in_progress, passed, failed).
    pub status: String,

    /// Completion timestamp, when completed.
    pub completed_at: Option<DateTime<Utc>>,

    /// Grade in percent, when graded.
    pub grade_percent: Option<f64>,

    /// Total learning hours recorded.
    pub total_hours: Option<f64>,

    /// Whether the enrollment is audit-track.
    pub is_audit_enrollment: bool,
}

/// Read access to the platform's content catalog.
#[async_trait]
pub trait ContentCatalogSource: Send + Sync {
    /// Fetch all catalog records for a customer.
    ///
    /// Fails with `DataUnavailable` when the upstream source is unreachable;
    /// an empty result set is valid.
    async fn fetch_content_catalog(
        &self,
        customer_id: CustomerId,
    ) -> PipelineResult<Vec<ContentRecord>>;
}

/// Read access to learner completion/progress data.
#[async_trait]
pub trait LearnerProgressSource: Send + Sync {
    /// Fetch progress records for a customer, optionally bounded to records
    /// changed since the watermark.
    async fn fetch_learner_progress(
        &self,
        customer_id: CustomerId,
        since: Option<DateTime<Utc>>,
    ) -> PipelineResult<Vec<ProgressRecord>>;
}

/// Fixed-content catalog source for tests and embedding.
#[derive(Default)]
pub struct MemoryCatalogSource {
    records: Vec<ContentRecord>,
}

impl MemoryCatalogSource {
    /// Create a source serving the given records.
    pub fn new(records: Vec<ContentRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl ContentCatalogSource for MemoryCatalogSource {
    async fn fetch_content_catalog(
        &self,
        _customer_id: CustomerId,
    ) -> PipelineResult<Vec<ContentRecord>> {
        Ok(self.records.clone())
    }
}

/// Fixed-content progress source for tests and embedding.
#[derive(Default)]
pub struct MemoryProgressSource {
    records: Vec<ProgressRecord>,
}

impl MemoryProgressSource {
    /// Create a source serving the given records.
    pub fn new(records: Vec<ProgressRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl LearnerProgressSource for MemoryProgressSource {
    async fn fetch_learner_progress(
        &self,
        _customer_id: CustomerId,
        since: Option<DateTime<Utc>>,
    ) -> PipelineResult<Vec<ProgressRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| match (since, r.completed_at) {
                (Some(watermark), Some(completed_at)) => completed_at >= watermark,
                _ => true,
            })
            .cloned()
            .collect())
    }
}
