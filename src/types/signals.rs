//! The signal model: primary signals drive the health state machine, amplifier
//! signals and worker signals only ever reach the narrator and the read API.
//!
//! Primary signals are the seven groups the orchestration cluster emits about
//! its own control plane. Amplifiers are context that explains *why* a state
//! was reached but never decides *what* the state is — keeping that boundary
//! at the type level (no amplifier field is ever passed to
//! `evaluate_health_state`) is what makes the state machine auditable.

use serde::{Deserialize, Serialize};

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn nonneg(v: f64) -> f64 {
    v.max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateTransitionSignals {
    pub throughput_per_sec: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCompletionSignals {
    pub success_per_sec: f64,
    pub failed_per_sec: f64,
    /// success / (success + failed), or 1.0 when there is no completion demand at all.
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySignals {
    pub backlog_age_sec: f64,
    pub task_processing_rate_per_sec: f64,
    pub shard_churn_rate_per_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontendSignals {
    pub error_rate_per_sec: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchingSignals {
    pub workflow_backlog_age_sec: f64,
    pub activity_backlog_age_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollerSignals {
    pub poll_timeout_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistenceSignals {
    pub error_rate_per_sec: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
}

/// The signals the health state machine is allowed to read. Nothing else
/// reaches `evaluate_health_state` — see the module doc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimarySignals {
    pub state_transitions: StateTransitionSignals,
    pub workflow_completion: WorkflowCompletionSignals,
    pub history: HistorySignals,
    pub frontend: FrontendSignals,
    pub matching: MatchingSignals,
    pub poller: PollerSignals,
    pub persistence: PersistenceSignals,
}

impl PrimarySignals {
    /// Builds a signal snapshot, clamping rates to be non-negative and ratios
    /// to `[0, 1]`. Upstream scrapers occasionally return small negative
    /// artifacts from counter resets; clamping here keeps every downstream
    /// consumer free of that defensive check.
    #[allow(clippy::too_many_arguments)]
    pub fn clamped(
        state_transitions: StateTransitionSignals,
        workflow_completion: WorkflowCompletionSignals,
        history: HistorySignals,
        frontend: FrontendSignals,
        matching: MatchingSignals,
        poller: PollerSignals,
        persistence: PersistenceSignals,
    ) -> Self {
        Self {
            state_transitions: StateTransitionSignals {
                throughput_per_sec: nonneg(state_transitions.throughput_per_sec),
                latency_p95_ms: nonneg(state_transitions.latency_p95_ms),
                latency_p99_ms: nonneg(state_transitions.latency_p99_ms),
            },
            workflow_completion: WorkflowCompletionSignals {
                success_per_sec: nonneg(workflow_completion.success_per_sec),
                failed_per_sec: nonneg(workflow_completion.failed_per_sec),
                completion_rate: clamp01(workflow_completion.completion_rate),
            },
            history: HistorySignals {
                backlog_age_sec: nonneg(history.backlog_age_sec),
                task_processing_rate_per_sec: nonneg(history.task_processing_rate_per_sec),
                shard_churn_rate_per_sec: nonneg(history.shard_churn_rate_per_sec),
            },
            frontend: FrontendSignals {
                error_rate_per_sec: nonneg(frontend.error_rate_per_sec),
                latency_p95_ms: nonneg(frontend.latency_p95_ms),
                latency_p99_ms: nonneg(frontend.latency_p99_ms),
            },
            matching: MatchingSignals {
                workflow_backlog_age_sec: nonneg(matching.workflow_backlog_age_sec),
                activity_backlog_age_sec: nonneg(matching.activity_backlog_age_sec),
            },
            poller: PollerSignals {
                poll_timeout_rate: clamp01(poller.poll_timeout_rate),
            },
            persistence: PersistenceSignals {
                error_rate_per_sec: nonneg(persistence.error_rate_per_sec),
                latency_p95_ms: nonneg(persistence.latency_p95_ms),
                latency_p99_ms: nonneg(persistence.latency_p99_ms),
            },
        }
    }

    /// True when the cluster has no meaningful request demand at all — the
    /// idle gate, evaluated before anything else in the state machine.
    pub fn is_idle(&self) -> bool {
        self.state_transitions.throughput_per_sec < 0.1
            && self.workflow_completion.success_per_sec < 0.1
            && self.workflow_completion.failed_per_sec < 0.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistenceContentionAmplifiers {
    pub occ_conflicts_per_sec: f64,
    pub exhausted_retries_per_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolAmplifiers {
    pub open_count: u32,
    pub in_use_count: u32,
    pub idle_count: u32,
    pub wait_duration_ms: f64,
    pub reservoir_size: u32,
    pub reservoir_empty_events: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueAmplifiers {
    pub task_queue_backlog_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerAmplifiers {
    pub task_slot_utilization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheAmplifiers {
    pub sticky_cache_hit_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShardAmplifiers {
    pub ownership_churn_per_sec: f64,
    pub membership_changes_per_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrpcAmplifiers {
    pub request_latency_p99_ms: f64,
    pub error_rate_per_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimeAmplifiers {
    pub gc_pause_p99_ms: f64,
    pub goroutine_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostAmplifiers {
    pub cpu_throttle_pct: f64,
    pub memory_pressure_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrottlingAmplifiers {
    pub rate_limiter_rejection_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeployAmplifiers {
    pub recent_deploy: bool,
    pub version_changed: bool,
}

/// Context-only signals. Never read by `evaluate_health_state` — they explain
/// a state, they never choose one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplifierSignals {
    pub persistence_contention: PersistenceContentionAmplifiers,
    pub pool: PoolAmplifiers,
    pub queue: QueueAmplifiers,
    pub worker: WorkerAmplifiers,
    pub cache: CacheAmplifiers,
    pub shard: ShardAmplifiers,
    pub grpc: GrpcAmplifiers,
    pub runtime: RuntimeAmplifiers,
    pub host: HostAmplifiers,
    pub throttling: ThrottlingAmplifiers,
    pub deploy: DeployAmplifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkerSignals {
    pub schedule_to_start_workflow_p95_ms: f64,
    pub schedule_to_start_workflow_p99_ms: f64,
    pub schedule_to_start_activity_p95_ms: f64,
    pub schedule_to_start_activity_p99_ms: f64,
    pub workflow_slots_available: u32,
    pub workflow_slots_used: u32,
    pub activity_slots_available: u32,
    pub activity_slots_used: u32,
    pub workflow_pollers: u32,
    pub activity_pollers: u32,
    pub sticky_cache_hit_rate: f64,
}

impl WorkerSignals {
    /// True iff either slot pool is fully exhausted — a worker cannot pull
    /// more work even if the server has it queued.
    pub fn is_starved(&self) -> bool {
        self.workflow_slots_available == 0 || self.activity_slots_available == 0
    }
}

/// A curated, narrative-only log pattern match. Never consulted by the
/// state machine or the config compiler — only by the deep narrator stage
/// and the `/status/timeline` projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPattern {
    pub service: String,
    pub pattern: String,
    pub count: u64,
    pub sample: String,
}

/// One curated entry in the narrative log-pattern catalogue the log watcher
/// scans for. `pattern` is matched as a substring, not a full regex — this
/// catalogue is meant to stay small and human-curated, not grow into a
/// general rules engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativePatternEntry {
    pub service: String,
    pub pattern: String,
    pub description: String,
}

pub fn default_narrative_patterns() -> Vec<NarrativePatternEntry> {
    vec![
        NarrativePatternEntry {
            service: "history".into(),
            pattern: "deadline exceeded".into(),
            description: "persistence calls timing out under load".into(),
        },
        NarrativePatternEntry {
            service: "matching".into(),
            pattern: "context canceled".into(),
            description: "client gave up waiting on a long poll".into(),
        },
        NarrativePatternEntry {
            service: "history".into(),
            pattern: "shard ownership lost".into(),
            description: "shard moved to another host, in-flight work was abandoned".into(),
        },
        NarrativePatternEntry {
            service: "matching".into(),
            pattern: "membership changed".into(),
            description: "ring membership churn, partitions are being rebalanced".into(),
        },
        NarrativePatternEntry {
            service: "matching".into(),
            pattern: "no poller".into(),
            description: "task queue has no active worker poller".into(),
        },
        NarrativePatternEntry {
            service: "matching".into(),
            pattern: "reservoir discard".into(),
            description: "sync-match reservoir is full, tasks are falling back to async match".into(),
        },
        NarrativePatternEntry {
            service: "persistence".into(),
            pattern: "serialization failure".into(),
            description: "optimistic concurrency conflict on a shared row".into(),
        },
        NarrativePatternEntry {
            service: "frontend".into(),
            pattern: "rate limit exceeded".into(),
            description: "client was throttled at the frontend".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_primary() -> PrimarySignals {
        PrimarySignals::clamped(
            StateTransitionSignals { throughput_per_sec: 100.0, latency_p95_ms: 10.0, latency_p99_ms: 20.0 },
            WorkflowCompletionSignals { success_per_sec: 95.0, failed_per_sec: 5.0, completion_rate: 0.95 },
            HistorySignals { backlog_age_sec: 1.0, task_processing_rate_per_sec: 90.0, shard_churn_rate_per_sec: 0.0 },
            FrontendSignals { error_rate_per_sec: 0.1, latency_p95_ms: 50.0, latency_p99_ms: 90.0 },
            MatchingSignals { workflow_backlog_age_sec: 0.5, activity_backlog_age_sec: 0.5 },
            PollerSignals { poll_timeout_rate: 0.01 },
            PersistenceSignals { error_rate_per_sec: 0.1, latency_p95_ms: 5.0, latency_p99_ms: 10.0 },
        )
    }

    #[test]
    fn clamped_never_produces_negative_rates() {
        let s = PrimarySignals::clamped(
            StateTransitionSignals { throughput_per_sec: -5.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
            WorkflowCompletionSignals { success_per_sec: -1.0, failed_per_sec: -1.0, completion_rate: 1.5 },
            HistorySignals { backlog_age_sec: -1.0, task_processing_rate_per_sec: -1.0, shard_churn_rate_per_sec: -1.0 },
            FrontendSignals { error_rate_per_sec: -1.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
            MatchingSignals { workflow_backlog_age_sec: -1.0, activity_backlog_age_sec: -1.0 },
            PollerSignals { poll_timeout_rate: -1.0 },
            PersistenceSignals { error_rate_per_sec: -1.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
        );
        assert_eq!(s.state_transitions.throughput_per_sec, 0.0);
        assert_eq!(s.workflow_completion.completion_rate, 1.0);
        assert_eq!(s.poller.poll_timeout_rate, 0.0);
    }

    #[test]
    fn not_idle_with_real_traffic() {
        assert!(!sample_primary().is_idle());
    }

    #[test]
    fn worker_starved_when_either_pool_exhausted() {
        let mut w = WorkerSignals {
            schedule_to_start_workflow_p95_ms: 1.0,
            schedule_to_start_workflow_p99_ms: 2.0,
            schedule_to_start_activity_p95_ms: 1.0,
            schedule_to_start_activity_p99_ms: 2.0,
            workflow_slots_available: 4,
            workflow_slots_used: 0,
            activity_slots_available: 0,
            activity_slots_used: 10,
            workflow_pollers: 1,
            activity_pollers: 1,
            sticky_cache_hit_rate: 0.9,
        };
        assert!(w.is_starved());
        w.activity_slots_available = 4;
        assert!(!w.is_starved());
    }

    #[test]
    fn signal_round_trips_through_json() {
        let s = sample_primary();
        let json = serde_json::to_string(&s).expect("serialize");
        let back: PrimarySignals = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(s, back);
    }
}
