//! End-to-end pipeline tests over an in-memory audit store and a scripted
//! channel client: incremental re-runs, change detection, partial failure
//! isolation, cancellation, and the run guard.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use lernio_channel::chunk::{ChunkOutcome, TransmissionChunk};
use lernio_channel::config::ChannelConfiguration;
use lernio_channel::error::ChannelResult;
use lernio_channel::ids::CustomerId;
use lernio_channel::registry::{ChannelAdapter, ChannelRegistry};
use lernio_channel::traits::{ChannelClient, WireSerializer};
use lernio_channel::types::{ChannelType, TransmissionStatus, UnitType};
use lernio_channel::unit::ExportableUnit;

use lernio_pipeline::audit::{AuditStore, MemoryAuditStore};
use lernio_pipeline::context::RunContext;
use lernio_pipeline::sources::{ContentRecord, MemoryCatalogSource, MemoryProgressSource};
use lernio_pipeline::transmitter::{RunState, Transmitter};

// =============================================================================
// Test Harness
// =============================================================================

/// Opt into log output with `RUST_LOG=lernio_pipeline=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Channel client with scripted per-item and per-chunk failures.
#[derive(Default)]
struct ScriptedClient {
    /// Item keys that fail with an auth error detail.
    fail_keys: HashSet<String>,
    /// Zero-based chunk indices that fail wholesale.
    fail_chunk_indices: HashSet<usize>,
    /// Cancel this token once the given number of chunks has been sent.
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    /// Chunks sent so far.
    chunks_sent: AtomicUsize,
    /// Every item key handed to `send`, in order.
    sent_keys: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn failing_items(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| (*k).to_string()).collect(),
            ..Self::default()
        }
    }

    fn failing_chunks(indices: &[usize]) -> Self {
        Self {
            fail_chunk_indices: indices.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn cancel_token_after(&self, chunks: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((chunks, token));
    }

    fn chunks_sent(&self) -> usize {
        self.chunks_sent.load(Ordering::SeqCst)
    }

    fn sent_keys(&self) -> Vec<String> {
        self.sent_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelClient for ScriptedClient {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Canvas
    }

    fn display_name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, chunk: &TransmissionChunk) -> ChannelResult<ChunkOutcome> {
        let index = self.chunks_sent.fetch_add(1, Ordering::SeqCst);
        self.sent_keys
            .lock()
            .unwrap()
            .extend(chunk.item_keys());

        {
            let mut cancel = self.cancel_after.lock().unwrap();
            if let Some((after, token)) = cancel.take() {
                if index + 1 >= after {
                    token.cancel();
                } else {
                    *cancel = Some((after, token));
                }
            }
        }

        if self.fail_chunk_indices.contains(&index) {
            return Ok(ChunkOutcome::all_failed(chunk, "channel returned 503"));
        }

        let mut outcome = ChunkOutcome::new();
        for key in chunk.item_keys() {
            if self.fail_keys.contains(&key) {
                outcome.record_failure(key, "AUTH_FAILED: token rejected");
            } else {
                outcome.record_success(key);
            }
        }
        Ok(outcome)
    }

    async fn probe(&self) -> ChannelResult<()> {
        Ok(())
    }
}

struct EchoSerializer;

impl WireSerializer for EchoSerializer {
    fn serialize_content(&self, unit: &ExportableUnit) -> ChannelResult<serde_json::Value> {
        Ok(unit.fields.clone())
    }

    fn serialize_learner(&self, unit: &ExportableUnit) -> ChannelResult<serde_json::Value> {
        Ok(unit.fields.clone())
    }
}

fn content_record(key: &str, title: &str) -> ContentRecord {
    ContentRecord {
        content_key: key.to_string(),
        title: title.to_string(),
        description: format!("About {title}"),
        content_url: format!("https://learn.example.com/{key}"),
        image_url: None,
        content_type: "course".to_string(),
        catalog: "main".to_string(),
        price: None,
        language: "en".to_string(),
    }
}

struct Harness {
    transmitter: Transmitter,
    audit: Arc<MemoryAuditStore>,
    config: ChannelConfiguration,
}

impl Harness {
    async fn new(
        records: Vec<ContentRecord>,
        client: Arc<ScriptedClient>,
        chunk_size: usize,
    ) -> Self {
        let audit = Arc::new(MemoryAuditStore::new());
        let registry = Arc::new(ChannelRegistry::new());
        let factory_client = client.clone();
        registry
            .register(ChannelType::Canvas, move |_config| {
                Ok(ChannelAdapter {
                    client: factory_client.clone(),
                    serializer: Arc::new(EchoSerializer),
                })
            })
            .await;

        let transmitter = Transmitter::new(
            audit.clone(),
            registry,
            Arc::new(MemoryCatalogSource::new(records)),
            Arc::new(MemoryProgressSource::default()),
        );

        let config = ChannelConfiguration::new(
            CustomerId::new(),
            ChannelType::Canvas,
            "https://lms.example.com",
        )
        .with_chunk_size(chunk_size);

        Self {
            transmitter,
            audit,
            config,
        }
    }

    async fn run(&self) -> lernio_pipeline::error::PipelineResult<lernio_pipeline::transmitter::RunResult> {
        let ctx = RunContext::new(self.config.customer_id, "scheduler");
        self.transmitter
            .run(&self.config, &ctx, &[UnitType::ContentMetadata], None)
            .await
    }

    async fn audit_status(&self, item_key: &str) -> Option<TransmissionStatus> {
        self.audit
            .get(self.config.id, item_key, UnitType::ContentMetadata)
            .await
            .unwrap()
            .map(|r| r.last_status)
    }
}

// =============================================================================
// Single-item chunks: three new units, one auth failure
// =============================================================================

#[tokio::test]
async fn test_single_item_chunks_with_one_auth_failure() {
    init_tracing();
    let client = Arc::new(ScriptedClient::failing_items(&["course-b"]));
    let harness = Harness::new(
        vec![
            content_record("course-a", "A"),
            content_record("course-b", "B"),
            content_record("course-c", "C"),
        ],
        client.clone(),
        1,
    )
    .await;

    let result = harness.run().await.unwrap();

    assert_eq!(result.state, RunState::Done);
    assert_eq!(result.attempted, 3);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(client.chunks_sent(), 3);

    assert_eq!(
        harness.audit_status("course-a").await,
        Some(TransmissionStatus::Success)
    );
    assert_eq!(
        harness.audit_status("course-b").await,
        Some(TransmissionStatus::Failed)
    );
    assert_eq!(
        harness.audit_status("course-c").await,
        Some(TransmissionStatus::Success)
    );

    let failure = &result.failures[0];
    assert_eq!(failure.item_key, "course-b");
    assert!(failure.detail.contains("AUTH_FAILED"));

    // A subsequent run with unchanged data re-attempts only the failed unit.
    let second = harness.run().await.unwrap();
    assert_eq!(second.attempted, 1);
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.failed, 1);
    assert_eq!(second.skipped, 2);
    assert_eq!(client.sent_keys().last().unwrap(), "course-b");
}

// =============================================================================
// Idempotence and change detection
// =============================================================================

#[tokio::test]
async fn test_second_run_with_unchanged_data_transmits_nothing() {
    let client = Arc::new(ScriptedClient::default());
    let harness = Harness::new(
        vec![
            content_record("course-a", "A"),
            content_record("course-b", "B"),
        ],
        client.clone(),
        10,
    )
    .await;

    let first = harness.run().await.unwrap();
    assert_eq!(first.succeeded, 2);

    let second = harness.run().await.unwrap();
    assert_eq!(second.attempted, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.state, RunState::Done);
    // No second round of network calls
    assert_eq!(client.chunks_sent(), 1);
}

#[tokio::test]
async fn test_mutating_one_field_makes_exactly_that_unit_due() {
    let client = Arc::new(ScriptedClient::default());
    let records = vec![
        content_record("course-a", "A"),
        content_record("course-b", "B"),
        content_record("course-c", "C"),
    ];
    let harness = Harness::new(records.clone(), client.clone(), 10).await;
    harness.run().await.unwrap();

    // Rebuild the harness over the same audit store with one title changed
    let mut changed = records;
    changed[1].title = "B, second edition".to_string();
    let registry = Arc::new(ChannelRegistry::new());
    let factory_client = client.clone();
    registry
        .register(ChannelType::Canvas, move |_config| {
            Ok(ChannelAdapter {
                client: factory_client.clone(),
                serializer: Arc::new(EchoSerializer),
            })
        })
        .await;
    let transmitter = Transmitter::new(
        harness.audit.clone(),
        registry,
        Arc::new(MemoryCatalogSource::new(changed)),
        Arc::new(MemoryProgressSource::default()),
    );

    let ctx = RunContext::new(harness.config.customer_id, "scheduler");
    let result = transmitter
        .run(&harness.config, &ctx, &[UnitType::ContentMetadata], None)
        .await
        .unwrap();

    assert_eq!(result.attempted, 1);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.skipped, 2);
    assert_eq!(client.sent_keys().last().unwrap(), "course-b");
}

// =============================================================================
// Partial failure isolation
// =============================================================================

#[tokio::test]
async fn test_failed_middle_chunk_does_not_stop_later_chunks() {
    let client = Arc::new(ScriptedClient::failing_chunks(&[1]));
    let harness = Harness::new(
        vec![
            content_record("course-a", "A"),
            content_record("course-b", "B"),
            content_record("course-c", "C"),
            content_record("course-d", "D"),
            content_record("course-e", "E"),
            content_record("course-f", "F"),
        ],
        client.clone(),
        2,
    )
    .await;

    let result = harness.run().await.unwrap();

    // All three chunks attempted; only the middle chunk's items failed
    assert_eq!(client.chunks_sent(), 3);
    assert_eq!(result.attempted, 6);
    assert_eq!(result.succeeded, 4);
    assert_eq!(result.failed, 2);

    for key in ["course-a", "course-b", "course-e", "course-f"] {
        assert_eq!(
            harness.audit_status(key).await,
            Some(TransmissionStatus::Success),
            "{key}"
        );
    }
    for key in ["course-c", "course-d"] {
        assert_eq!(
            harness.audit_status(key).await,
            Some(TransmissionStatus::Failed),
            "{key}"
        );
    }

    // Only the failed chunk's items are due again
    let second = harness.run().await.unwrap();
    assert_eq!(second.attempted, 2);
    assert_eq!(second.skipped, 4);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancellation_between_chunks_leaves_audit_prefix() {
    let client = Arc::new(ScriptedClient::default());
    let harness = Harness::new(
        vec![
            content_record("course-a", "A"),
            content_record("course-b", "B"),
            content_record("course-c", "C"),
            content_record("course-d", "D"),
        ],
        client.clone(),
        2,
    )
    .await;

    let ctx = RunContext::new(harness.config.customer_id, "scheduler");
    // The scripted client cancels this context's token after the first chunk
    client.cancel_token_after(1, ctx.cancellation_token());

    let result = harness
        .transmitter
        .run(&harness.config, &ctx, &[UnitType::ContentMetadata], None)
        .await
        .unwrap();

    assert_eq!(result.state, RunState::Cancelled);
    assert_eq!(client.chunks_sent(), 1);
    assert_eq!(result.attempted, 2);
    assert_eq!(result.succeeded, 2);

    // Audit state is a true prefix: first chunk acknowledged, the rest absent
    assert_eq!(
        harness.audit_status("course-a").await,
        Some(TransmissionStatus::Success)
    );
    assert_eq!(
        harness.audit_status("course-b").await,
        Some(TransmissionStatus::Success)
    );
    assert_eq!(harness.audit_status("course-c").await, None);
    assert_eq!(harness.audit_status("course-d").await, None);

    // The cancelled run released the guard; a fresh run picks up the rest
    let second = harness.run().await.unwrap();
    assert_eq!(second.state, RunState::Done);
    assert_eq!(second.attempted, 2);
    assert_eq!(second.skipped, 2);
}

// =============================================================================
// Run guard and pre-transmission aborts
// =============================================================================

#[tokio::test]
async fn test_concurrent_run_for_same_configuration_rejected() {
    let client = Arc::new(ScriptedClient::default());
    let harness = Harness::new(vec![content_record("course-a", "A")], client, 10).await;

    // Simulate a concurrent run holding the guard
    let holder = lernio_channel::ids::RunId::new();
    assert!(harness
        .audit
        .try_begin_run(harness.config.id, holder)
        .await
        .unwrap());

    let err = harness.run().await.unwrap_err();
    assert_eq!(err.error_code(), "RUN_IN_PROGRESS");

    // Once the holder finishes, the configuration can run again
    harness
        .audit
        .finish_run(harness.config.id, holder)
        .await
        .unwrap();
    assert!(harness.run().await.is_ok());
}

#[tokio::test]
async fn test_zero_chunk_size_aborts_before_any_network_activity() {
    let client = Arc::new(ScriptedClient::default());
    let mut harness = Harness::new(vec![content_record("course-a", "A")], client.clone(), 1).await;
    harness.config.transmission_chunk_size = 0;

    let err = harness.run().await.unwrap_err();
    assert_eq!(err.error_code(), "INVALID_CONFIG");
    assert_eq!(client.chunks_sent(), 0);
    assert!(harness.audit.is_empty().await);
}
