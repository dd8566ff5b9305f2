//! Per-run context
//!
//! Every run carries an explicit context (who triggered it, for which
//! customer, with which cancellation token) instead of ambient task state.

use tokio_util::sync::CancellationToken;

use lernio_channel::ids::{CustomerId, RunId};

/// Identity and control state for one transmitter run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Identifier of this run.
    pub run_id: RunId,

    /// Enterprise customer the run exports data for.
    pub customer_id: CustomerId,

    /// Acting user recorded for audit trails (scheduler identity for
    /// scheduled runs).
    pub acting_user: String,

    /// Cooperative cancellation token, checked between chunks.
    cancel: CancellationToken,
}

impl RunContext {
    /// Create a context for a new run.
    pub fn new(customer_id: CustomerId, acting_user: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            customer_id,
            acting_user: acting_user.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// The run's cancellation token. Cancelling it stops the run at the next
    /// between-chunks checkpoint; a chunk in flight always completes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
