//! Threshold bundles for the health state machine, ported field-for-field
//! from the reference implementation's `config.py`.

use serde::{Deserialize, Serialize};

/// Thresholds that trigger Critical. Signals 1/3/4/5/12.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalThresholds {
    pub state_transitions_min_per_sec: f64,
    pub workflow_completion_rate_min: f64,
    /// Minimum combined success+failed rate before the completion-rate gate
    /// is allowed to fire. Not present in the retrieved reference config —
    /// resolved as an Open Question in DESIGN.md.
    pub completion_rate_demand_floor_per_sec: f64,
    pub history_backlog_age_max_sec: f64,
    pub history_processing_rate_min_per_sec: f64,
    pub persistence_error_rate_max_per_sec: f64,
}

impl Default for CriticalThresholds {
    fn default() -> Self {
        Self {
            state_transitions_min_per_sec: 10.0,
            workflow_completion_rate_min: 0.5,
            completion_rate_demand_floor_per_sec: 10.0,
            history_backlog_age_max_sec: 120.0,
            history_processing_rate_min_per_sec: 10.0,
            persistence_error_rate_max_per_sec: 10.0,
        }
    }
}

/// Thresholds that trigger Stressed. Signals 2/4/6/8/10/11.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressedThresholds {
    pub state_transition_latency_p99_max_ms: f64,
    pub history_backlog_age_stress_sec: f64,
    pub frontend_latency_p99_max_ms: f64,
    pub persistence_latency_p99_max_ms: f64,
    pub shard_churn_rate_max_per_sec: f64,
    pub poller_timeout_rate_max: f64,
}

impl Default for StressedThresholds {
    fn default() -> Self {
        Self {
            state_transition_latency_p99_max_ms: 500.0,
            history_backlog_age_stress_sec: 30.0,
            frontend_latency_p99_max_ms: 1000.0,
            persistence_latency_p99_max_ms: 100.0,
            shard_churn_rate_max_per_sec: 5.0,
            poller_timeout_rate_max: 0.1,
        }
    }
}

/// Thresholds for Happy (all must pass).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthyThresholds {
    pub state_transitions_healthy_per_sec: f64,
    pub history_backlog_age_healthy_sec: f64,
    pub workflow_completion_rate_healthy: f64,
}

impl Default for HealthyThresholds {
    fn default() -> Self {
        Self {
            state_transitions_healthy_per_sec: 50.0,
            history_backlog_age_healthy_sec: 10.0,
            workflow_completion_rate_healthy: 0.95,
        }
    }
}

/// Thresholds for amplifier signals. Never consulted by the state machine —
/// only by the narrator and the read API, to explain a state, not choose one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplifierThresholds {
    pub occ_conflicts_pressure_per_sec: f64,
    pub pool_utilization_pressure_pct: f64,
    pub pool_wait_duration_pressure_ms: f64,
    pub connection_churn_pressure_per_sec: f64,
    pub cache_hit_rate_min: f64,
    pub cpu_throttle_pressure_pct: f64,
    pub gc_pause_pressure_ms: f64,
}

impl Default for AmplifierThresholds {
    fn default() -> Self {
        Self {
            occ_conflicts_pressure_per_sec: 30.0,
            pool_utilization_pressure_pct: 80.0,
            pool_wait_duration_pressure_ms: 100.0,
            connection_churn_pressure_per_sec: 10.0,
            cache_hit_rate_min: 0.8,
            cpu_throttle_pressure_pct: 10.0,
            gc_pause_pressure_ms: 100.0,
        }
    }
}

/// Error raised by [`HealthThresholds::validate`] when the Threshold
/// Ordering Invariant does not hold. The caller panics on this at boot —
/// a misconfigured threshold set is a programming bug, not a recoverable
/// condition.
#[derive(Debug, thiserror::Error)]
pub enum ThresholdOrderingError {
    #[error("healthy backlog ceiling ({healthy}) must be <= stressed backlog ceiling ({stressed})")]
    BacklogHealthyExceedsStressed { healthy: f64, stressed: f64 },
    #[error("stressed backlog ceiling ({stressed}) must be < critical backlog max ({critical})")]
    BacklogStressedNotBelowCritical { stressed: f64, critical: f64 },
    #[error("critical throughput floor ({critical}) must be <= healthy throughput floor ({healthy})")]
    ThroughputCriticalExceedsHealthy { critical: f64, healthy: f64 },
    #[error("critical completion floor ({critical}) must be < healthy completion floor ({healthy})")]
    CompletionCriticalNotBelowHealthy { critical: f64, healthy: f64 },
}

/// The full threshold bundle the state machine is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct HealthThresholds {
    pub critical: CriticalThresholds,
    pub stressed: StressedThresholds,
    pub healthy: HealthyThresholds,
    pub amplifiers: AmplifierThresholds,
}

impl HealthThresholds {
    /// Enforces the Threshold Ordering Invariant from spec §4.1:
    /// `healthy.backlog_ceiling <= stressed.backlog_stress < critical.backlog_max`,
    /// `critical.throughput_min <= healthy.throughput_floor`,
    /// `critical.completion_min < healthy.completion_floor`.
    pub fn validate(&self) -> Result<(), ThresholdOrderingError> {
        if self.healthy.history_backlog_age_healthy_sec > self.stressed.history_backlog_age_stress_sec {
            return Err(ThresholdOrderingError::BacklogHealthyExceedsStressed {
                healthy: self.healthy.history_backlog_age_healthy_sec,
                stressed: self.stressed.history_backlog_age_stress_sec,
            });
        }
        if self.stressed.history_backlog_age_stress_sec >= self.critical.history_backlog_age_max_sec {
            return Err(ThresholdOrderingError::BacklogStressedNotBelowCritical {
                stressed: self.stressed.history_backlog_age_stress_sec,
                critical: self.critical.history_backlog_age_max_sec,
            });
        }
        if self.critical.state_transitions_min_per_sec > self.healthy.state_transitions_healthy_per_sec {
            return Err(ThresholdOrderingError::ThroughputCriticalExceedsHealthy {
                critical: self.critical.state_transitions_min_per_sec,
                healthy: self.healthy.state_transitions_healthy_per_sec,
            });
        }
        if self.critical.workflow_completion_rate_min >= self.healthy.workflow_completion_rate_healthy {
            return Err(ThresholdOrderingError::CompletionCriticalNotBelowHealthy {
                critical: self.critical.workflow_completion_rate_min,
                healthy: self.healthy.workflow_completion_rate_healthy,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_satisfy_ordering_invariant() {
        HealthThresholds::default().validate().expect("defaults must be internally consistent");
    }

    #[test]
    fn backlog_healthy_exceeding_stressed_is_rejected() {
        let mut t = HealthThresholds::default();
        t.healthy.history_backlog_age_healthy_sec = 35.0;
        assert!(matches!(
            t.validate(),
            Err(ThresholdOrderingError::BacklogHealthyExceedsStressed { .. })
        ));
    }

    #[test]
    fn critical_completion_equal_to_healthy_is_rejected() {
        let mut t = HealthThresholds::default();
        t.critical.workflow_completion_rate_min = t.healthy.workflow_completion_rate_healthy;
        assert!(matches!(
            t.validate(),
            Err(ThresholdOrderingError::CompletionCriticalNotBelowHealthy { .. })
        ));
    }
}
