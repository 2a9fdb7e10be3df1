//! Logical ids and the "start or adopt" helper shared by all three
//! fixed-id long-running tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::traits::WorkflowLeaseStore;

pub const OBSERVATION_LOOP_LOGICAL_ID: &str = "copilot-observe-cluster";
pub const LOG_WATCHER_LOGICAL_ID: &str = "copilot-watch-logs";
pub const SCHEDULED_ASSESSMENT_LOGICAL_ID: &str = "copilot-scheduled-assessment";

/// How long a claimed lease is valid before another process is allowed to
/// adopt the logical id, absent a renewal.
pub const LEASE_TTL: Duration = Duration::from_secs(120);

/// Claims `logical_id` and, only if the claim succeeds, spawns `make_future`
/// as a detached Tokio task. If another process already holds a live
/// lease, logs that this process is adopting the existing owner (i.e.
/// deliberately not starting a duplicate) and returns `None`.
///
/// This is the idiomatic-Rust stand-in for Temporal's
/// `WorkflowIDConflictPolicy::UseExisting`: the crate has no Temporal
/// runtime underneath it, so "don't start a second copy of a fixed-id
/// workflow" is reimplemented as a claim against a lease table.
pub async fn start_or_adopt<F, Fut>(
    lease_store: Arc<dyn WorkflowLeaseStore>,
    logical_id: &'static str,
    make_future: F,
) -> Option<JoinHandle<()>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    match lease_store.try_acquire(logical_id, LEASE_TTL).await {
        Ok(true) => {
            info!(logical_id, "claimed workflow lease, starting loop");
            Some(tokio::spawn(make_future()))
        }
        Ok(false) => {
            info!(logical_id, "lease already held elsewhere, adopting existing owner");
            None
        }
        Err(e) => {
            warn!(logical_id, error = %e, "failed to claim workflow lease, not starting loop");
            None
        }
    }
}
