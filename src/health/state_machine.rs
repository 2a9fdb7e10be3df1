//! The Health State Machine: deterministic health evaluation from primary
//! signals only. No amplifier, worker, or narrator output is ever read
//! here — "rules decide, AI explains" is enforced at the type level, not
//! just by convention: `evaluate_health_state` has no parameter an
//! amplifier signal could be passed through.
//!
//! Gates, in order: idle short-circuit, critical (any-of), recovery
//! hysteresis (only while currently Critical), stressed (any-of), healthy
//! (all-of), default to Stressed when none of the above resolve it.
//!
//! INVARIANT: a Happy -> Critical transition must pass through Stressed in
//! between. Critical itself requires `CONSECUTIVE_CRITICAL_THRESHOLD`
//! consecutive evaluations before it is reported — a single bad tick is
//! reported as Stressed, carrying the count forward.

use crate::health::thresholds::{CriticalThresholds, HealthyThresholds, StressedThresholds};
use crate::types::health::HealthState;
use crate::types::signals::PrimarySignals;

/// How many consecutive evaluations must show Critical before it is
/// reported as such. At a 30s observation interval this is 90 seconds of
/// sustained failure.
pub const CONSECUTIVE_CRITICAL_THRESHOLD: u32 = 3;

/// Evaluates the next health state and consecutive-critical count from
/// the current primary signal snapshot. Pure and deterministic: the same
/// inputs always produce the same outputs, and no I/O or clock read ever
/// happens inside it.
pub fn evaluate_health_state(
    primary: &PrimarySignals,
    current_state: HealthState,
    consecutive_critical_count: u32,
    critical: &CriticalThresholds,
    stressed: &StressedThresholds,
    healthy: &HealthyThresholds,
) -> (HealthState, u32) {
    if is_idle(primary) {
        return (HealthState::Happy, 0);
    }

    if is_critical(primary, critical) {
        let new_count = consecutive_critical_count + 1;

        if new_count >= CONSECUTIVE_CRITICAL_THRESHOLD {
            return (
                apply_transition_invariant(current_state, HealthState::Critical),
                new_count,
            );
        }

        return (
            apply_transition_invariant(current_state, HealthState::Stressed),
            new_count,
        );
    }

    let new_count = 0;

    if current_state == HealthState::Critical && is_near_critical(primary, critical) {
        return (HealthState::Stressed, new_count);
    }

    if is_stressed(primary, stressed) {
        return (HealthState::Stressed, new_count);
    }

    if is_healthy(primary, healthy) {
        return (HealthState::Happy, new_count);
    }

    (HealthState::Stressed, new_count)
}

/// An idle cluster has no meaningful throughput, no errors, and no
/// backlog — that is "quiet", not "broken", and must not be scored as
/// either Stressed or Critical.
///
/// Also used directly by the Read API's `/status` projection to force
/// `Happy` when the latest snapshot is idle, even if the stored
/// assessment predates the idle window.
pub fn is_idle(primary: &PrimarySignals) -> bool {
    let has_no_throughput = primary.state_transitions.throughput_per_sec < 1.0
        && primary.history.task_processing_rate_per_sec < 1.0;

    let has_no_errors = primary.frontend.error_rate_per_sec < 0.1
        && primary.persistence.error_rate_per_sec < 0.1
        && primary.workflow_completion.failed_per_sec < 0.1;

    let has_no_backlog = primary.history.backlog_age_sec < 1.0
        && primary.matching.workflow_backlog_age_sec < 1.0
        && primary.matching.activity_backlog_age_sec < 1.0;

    has_no_throughput && has_no_errors && has_no_backlog
}

/// Any one gate firing is sufficient: forward progress has collapsed.
fn is_critical(primary: &PrimarySignals, thresholds: &CriticalThresholds) -> bool {
    if primary.state_transitions.throughput_per_sec < thresholds.state_transitions_min_per_sec {
        return true;
    }

    let total_terminal =
        primary.workflow_completion.success_per_sec + primary.workflow_completion.failed_per_sec;
    if total_terminal >= thresholds.completion_rate_demand_floor_per_sec
        && primary.workflow_completion.completion_rate < thresholds.workflow_completion_rate_min
    {
        return true;
    }

    if primary.history.backlog_age_sec > thresholds.history_backlog_age_max_sec {
        return true;
    }

    if primary.history.task_processing_rate_per_sec
        < thresholds.history_processing_rate_min_per_sec
    {
        return true;
    }

    primary.persistence.error_rate_per_sec > thresholds.persistence_error_rate_max_per_sec
}

/// Hysteresis band checked only while currently Critical: signals must
/// clear a margin above/below the critical thresholds before the cluster
/// is allowed to downgrade, so it doesn't flap at the boundary.
fn is_near_critical(primary: &PrimarySignals, thresholds: &CriticalThresholds) -> bool {
    if primary.state_transitions.throughput_per_sec < thresholds.state_transitions_min_per_sec * 1.5 {
        return true;
    }

    if primary.history.backlog_age_sec > thresholds.history_backlog_age_max_sec * 0.75 {
        return true;
    }

    primary.history.task_processing_rate_per_sec
        < thresholds.history_processing_rate_min_per_sec * 1.5
}

/// Any one gate firing is sufficient: progress continues but is trending
/// wrong.
fn is_stressed(primary: &PrimarySignals, thresholds: &StressedThresholds) -> bool {
    if primary.state_transitions.latency_p99_ms > thresholds.state_transition_latency_p99_max_ms {
        return true;
    }

    if primary.history.backlog_age_sec > thresholds.history_backlog_age_stress_sec {
        return true;
    }

    if primary.frontend.latency_p99_ms > thresholds.frontend_latency_p99_max_ms {
        return true;
    }

    if primary.persistence.latency_p99_ms > thresholds.persistence_latency_p99_max_ms {
        return true;
    }

    if primary.history.shard_churn_rate_per_sec > thresholds.shard_churn_rate_max_per_sec {
        return true;
    }

    primary.poller.poll_timeout_rate > thresholds.poller_timeout_rate_max
}

/// All gates must pass.
fn is_healthy(primary: &PrimarySignals, thresholds: &HealthyThresholds) -> bool {
    primary.state_transitions.throughput_per_sec >= thresholds.state_transitions_healthy_per_sec
        && primary.history.backlog_age_sec <= thresholds.history_backlog_age_healthy_sec
        && primary.workflow_completion.completion_rate >= thresholds.workflow_completion_rate_healthy
}

fn apply_transition_invariant(current_state: HealthState, raw_state: HealthState) -> HealthState {
    if current_state == HealthState::Happy && raw_state == HealthState::Critical {
        return HealthState::Stressed;
    }
    raw_state
}
