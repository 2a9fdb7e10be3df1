//! Worker scaling rule evaluator: checks a proposed worker fleet action
//! against known footguns and returns the warnings that apply. This never
//! blocks or performs an action itself — there is no automated
//! remediation here, only advice about advice someone else is about to
//! act on. Rust-native, specified directly in terms of worker signals;
//! no Python source counterpart.

use crate::types::health::{ProposedWorkerAction, WorkerScalingWarning};
use crate::types::signals::WorkerSignals;

/// Sticky cache hit rate at or above which the task queue is considered
/// "sticky" — workflows are pinned to specific workers for cache reuse,
/// and scaling up fragments that locality rather than adding capacity.
pub const STICKY_QUEUE_HIT_RATE_THRESHOLD: f64 = 0.8;

/// Sticky cache hit rate below which the cache is already doing the fleet
/// little good, making a restart-to-redistribute worth the disruption.
pub const LOW_STICKY_HIT_RATE_THRESHOLD: f64 = 0.3;

/// Worker count above which a restart's redistribution benefit plausibly
/// outweighs the disruption of bouncing the whole fleet.
pub const RESTART_WORTHWHILE_WORKER_COUNT: u32 = 5;

/// Context the scaling-rule evaluator needs beyond the worker signal
/// snapshot itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerScalingContext {
    pub worker_count: u32,
}

/// Evaluates a proposed worker fleet action against the four named rules
/// and returns every warning that applies. An empty result means the
/// proposed action has no known footgun, not that it is necessarily
/// correct.
pub fn evaluate_worker_scaling_rules(
    worker: &WorkerSignals,
    proposed_action: ProposedWorkerAction,
    context: &WorkerScalingContext,
) -> Vec<WorkerScalingWarning> {
    let mut warnings = Vec::new();

    if proposed_action == ProposedWorkerAction::ScaleDown && worker.is_starved() {
        warnings.push(WorkerScalingWarning::NeverScaleDownAtZero);
    }

    if proposed_action == ProposedWorkerAction::ScaleUp
        && worker.sticky_cache_hit_rate >= STICKY_QUEUE_HIT_RATE_THRESHOLD
    {
        warnings.push(WorkerScalingWarning::StickyQueueWarning);
    }

    if proposed_action == ProposedWorkerAction::Restart
        && worker.sticky_cache_hit_rate < LOW_STICKY_HIT_RATE_THRESHOLD
        && context.worker_count >= RESTART_WORTHWHILE_WORKER_COUNT
    {
        warnings.push(WorkerScalingWarning::RestartToRedistribute);
    }

    let total_pollers = worker.workflow_pollers + worker.activity_pollers;
    let total_slots = worker.workflow_slots_available
        + worker.workflow_slots_used
        + worker.activity_slots_available
        + worker.activity_slots_used;
    if total_pollers > total_slots && total_slots > 0 {
        warnings.push(WorkerScalingWarning::PollerExecutorMismatch);
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

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
            sticky_cache_hit_rate: 0.5,
        }
    }

    #[test]
    fn scale_down_at_zero_slots_is_blocked() {
        let mut w = baseline_worker();
        w.activity_slots_available = 0;
        let ctx = WorkerScalingContext { worker_count: 3 };
        let warnings = evaluate_worker_scaling_rules(&w, ProposedWorkerAction::ScaleDown, &ctx);
        assert!(warnings.contains(&WorkerScalingWarning::NeverScaleDownAtZero));
    }

    #[test]
    fn scale_up_on_sticky_queue_warns() {
        let mut w = baseline_worker();
        w.sticky_cache_hit_rate = 0.95;
        let ctx = WorkerScalingContext { worker_count: 3 };
        let warnings = evaluate_worker_scaling_rules(&w, ProposedWorkerAction::ScaleUp, &ctx);
        assert!(warnings.contains(&WorkerScalingWarning::StickyQueueWarning));
    }

    #[test]
    fn restart_on_low_hit_rate_with_many_workers_warns() {
        let mut w = baseline_worker();
        w.sticky_cache_hit_rate = 0.1;
        let ctx = WorkerScalingContext { worker_count: 20 };
        let warnings = evaluate_worker_scaling_rules(&w, ProposedWorkerAction::Restart, &ctx);
        assert!(warnings.contains(&WorkerScalingWarning::RestartToRedistribute));
    }

    #[test]
    fn restart_with_few_workers_does_not_warn() {
        let mut w = baseline_worker();
        w.sticky_cache_hit_rate = 0.1;
        let ctx = WorkerScalingContext { worker_count: 2 };
        let warnings = evaluate_worker_scaling_rules(&w, ProposedWorkerAction::Restart, &ctx);
        assert!(!warnings.contains(&WorkerScalingWarning::RestartToRedistribute));
    }

    #[test]
    fn poller_executor_mismatch_detected() {
        let mut w = baseline_worker();
        w.workflow_pollers = 50;
        w.activity_pollers = 50;
        let ctx = WorkerScalingContext { worker_count: 3 };
        let warnings = evaluate_worker_scaling_rules(&w, ProposedWorkerAction::NoAction, &ctx);
        assert!(warnings.contains(&WorkerScalingWarning::PollerExecutorMismatch));
    }

    #[test]
    fn no_warnings_for_sensible_no_action() {
        let w = baseline_worker();
        let ctx = WorkerScalingContext { worker_count: 3 };
        let warnings = evaluate_worker_scaling_rules(&w, ProposedWorkerAction::NoAction, &ctx);
        assert!(warnings.is_empty());
    }
}
