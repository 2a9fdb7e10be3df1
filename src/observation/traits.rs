//! The seams between the observation loops and everything they depend on
//! but do not own: where signals come from, where the running-workflow
//! lease table lives, where assessments are persisted, and how the
//! Assessment Pipeline is actually invoked. Each is a trait so the
//! concrete Prometheus/Loki/Postgres-backed implementations (in
//! `src/store` and `src/acquisition`-equivalent adapters) can be swapped
//! for fakes in tests, mirroring the teacher's `SensorSource` pattern.

use crate::types::assessment::{Assessment, AssessmentTrigger};
use crate::types::health::HealthState;
use crate::types::signals::{AmplifierSignals, LogPattern, NarrativePatternEntry, PrimarySignals, WorkerSignals};
use async_trait::async_trait;
use std::time::Duration;

use super::error::ObservationError;

/// Where the Observation Loop gets its primary/amplifier/worker signal
/// snapshots from. A real implementation queries Prometheus; a test
/// implementation can just return canned snapshots from a queue.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn fetch_primary(&self) -> Result<PrimarySignals, ObservationError>;
    async fn fetch_worker(&self) -> Result<WorkerSignals, ObservationError>;
    async fn fetch_amplifiers(&self) -> Result<AmplifierSignals, ObservationError>;
}

/// Where the Log Watcher gets its curated pattern matches from. A real
/// implementation queries Loki for each `NarrativePatternEntry`'s
/// substring; a test implementation can return canned matches.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_recent_patterns(
        &self,
        patterns: &[NarrativePatternEntry],
    ) -> Result<Vec<LogPattern>, ObservationError>;
}

/// The `running_workflows` table stand-in: a claim-based lease per
/// logical id, giving the three fixed-id long-running tasks "start or
/// adopt" semantics without a real Temporal runtime underneath them.
#[async_trait]
pub trait WorkflowLeaseStore: Send + Sync {
    /// Attempts to claim `logical_id` for `lease_ttl`. Returns `true` if
    /// the lease was acquired (no live lease existed, or it expired) and
    /// `false` if another process already holds a live lease.
    async fn try_acquire(&self, logical_id: &str, lease_ttl: Duration) -> Result<bool, ObservationError>;

    /// Extends a held lease. Called periodically by the loop that holds
    /// it; never called by anyone else.
    async fn renew(&self, logical_id: &str, lease_ttl: Duration) -> Result<(), ObservationError>;
}

/// Persistence the observation loops need directly — reconciling state
/// on startup, recording signal snapshots, and checking the scheduled
/// loop's dedup window. Persisting the `Assessment` itself is the
/// Assessment Pipeline's job, not the observation loops'.
#[async_trait]
pub trait AssessmentRecordStore: Send + Sync {
    /// The most recently persisted assessment, if any — used to adopt a
    /// health state on startup instead of defaulting blind to `Happy`.
    async fn latest_assessment(&self) -> Result<Option<Assessment>, ObservationError>;

    /// Records one signal snapshot. Best-effort: a failure here is
    /// logged and the loop continues, it never blocks the next tick.
    async fn persist_signal_snapshot(
        &self,
        primary: &PrimarySignals,
        amplifiers: &AmplifierSignals,
    ) -> Result<(), ObservationError>;

    /// Whether an assessment has been recorded within `window` of now —
    /// the Scheduled Assessment loop's dedup check.
    async fn has_recent_assessment(&self, window: Duration) -> Result<bool, ObservationError>;
}

/// Invokes the Assessment Pipeline as an independent task. The
/// observation loops never run the pipeline inline — they spawn it and
/// move on, exactly like a Temporal workflow starting a child workflow
/// and not waiting on it.
#[async_trait]
pub trait AssessmentRunner: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        trigger: AssessmentTrigger,
        health_state: HealthState,
        consecutive_critical_count: u32,
        primary: PrimarySignals,
        amplifiers: AmplifierSignals,
        worker: WorkerSignals,
    );
}
