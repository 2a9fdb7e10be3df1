//! The bottleneck classifier: a narrative-only read on which side of the
//! server/worker boundary is limiting throughput. Never consulted by
//! [`super::state_machine::evaluate_health_state`] — this has no Python
//! source counterpart, it is specified directly in terms of primary and
//! worker signals.

use crate::types::health::Bottleneck;
use crate::types::signals::{PrimarySignals, WorkerSignals};

/// Worker-side schedule-to-start latency above which workers are judged
/// to be the limiting factor, even if slots are not fully exhausted.
pub const WORKER_LIMITED_SCHEDULE_TO_START_P95_MAX_MS: f64 = 50.0;

/// Server-side history backlog age above which the server is judged to be
/// the limiting factor.
pub const SERVER_LIMITED_HISTORY_BACKLOG_MAX_SEC: f64 = 30.0;

/// Server-side persistence latency above which the server is judged to be
/// the limiting factor.
pub const SERVER_LIMITED_PERSISTENCE_LATENCY_P95_MAX_MS: f64 = 100.0;

/// Classifies which side of the boundary is limiting throughput.
///
/// `worker_limited` fires when either task slot pool is exhausted or
/// schedule-to-start latency has crept past its ceiling — the worker
/// fleet cannot keep up with available work. `server_limited` fires when
/// the history shard backlog or persistence latency has crept past its
/// ceiling — the server side cannot hand out or durably record work fast
/// enough. Both firing at once means scaling either side alone will not
/// fix it.
pub fn classify_bottleneck(primary: &PrimarySignals, worker: &WorkerSignals) -> Bottleneck {
    let worker_limited = worker.is_starved()
        || worker.schedule_to_start_workflow_p95_ms > WORKER_LIMITED_SCHEDULE_TO_START_P95_MAX_MS;

    let server_limited = primary.history.backlog_age_sec > SERVER_LIMITED_HISTORY_BACKLOG_MAX_SEC
        || primary.persistence.latency_p95_ms > SERVER_LIMITED_PERSISTENCE_LATENCY_P95_MAX_MS;

    match (server_limited, worker_limited) {
        (true, true) => Bottleneck::Mixed,
        (true, false) => Bottleneck::ServerLimited,
        (false, true) => Bottleneck::WorkerLimited,
        (false, false) => Bottleneck::Healthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::signals::{
        FrontendSignals, HistorySignals, MatchingSignals, PersistenceSignals, PollerSignals,
        StateTransitionSignals, WorkflowCompletionSignals,
    };

    fn baseline_primary() -> PrimarySignals {
        PrimarySignals::clamped(
            StateTransitionSignals { throughput_per_sec: 100.0, latency_p95_ms: 10.0, latency_p99_ms: 20.0 },
            WorkflowCompletionSignals { success_per_sec: 95.0, failed_per_sec: 5.0, completion_rate: 0.96 },
            HistorySignals { backlog_age_sec: 1.0, task_processing_rate_per_sec: 90.0, shard_churn_rate_per_sec: 0.0 },
            FrontendSignals { error_rate_per_sec: 0.1, latency_p95_ms: 50.0, latency_p99_ms: 90.0 },
            MatchingSignals { workflow_backlog_age_sec: 0.5, activity_backlog_age_sec: 0.5 },
            PollerSignals { poll_timeout_rate: 0.01 },
            PersistenceSignals { error_rate_per_sec: 0.1, latency_p95_ms: 5.0, latency_p99_ms: 10.0 },
        )
    }

    fn baseline_worker() -> WorkerSignals {
        WorkerSignals {
            schedule_to_start_workflow_p95_ms: 5.0,
            schedule_to_start_workflow_p99_ms: 10.0,
            schedule_to_start_activity_p95_ms: 5.0,
            schedule_to_start_activity_p99_ms: 10.0,
            workflow_slots_available: 10,
            workflow_slots_used: 2,
            activity_slots_available: 10,
            activity_slots_used: 2,
            workflow_pollers: 2,
            activity_pollers: 2,
            sticky_cache_hit_rate: 0.9,
        }
    }

    #[test]
    fn healthy_when_neither_side_fires() {
        assert_eq!(
            classify_bottleneck(&baseline_primary(), &baseline_worker()),
            Bottleneck::Healthy
        );
    }

    #[test]
    fn worker_limited_when_slots_starved() {
        let mut w = baseline_worker();
        w.workflow_slots_available = 0;
        assert_eq!(classify_bottleneck(&baseline_primary(), &w), Bottleneck::WorkerLimited);
    }

    #[test]
    fn server_limited_when_backlog_high() {
        let mut p = baseline_primary();
        p.history.backlog_age_sec = 45.0;
        assert_eq!(classify_bottleneck(&p, &baseline_worker()), Bottleneck::ServerLimited);
    }

    #[test]
    fn mixed_when_both_sides_fire() {
        let mut p = baseline_primary();
        p.persistence.latency_p95_ms = 150.0;
        let mut w = baseline_worker();
        w.schedule_to_start_workflow_p95_ms = 80.0;
        assert_eq!(classify_bottleneck(&p, &w), Bottleneck::Mixed);
    }
}
