//! The Health State Machine and its two narrative-only companion
//! classifiers (bottleneck, worker scaling rules). This is the one module
//! in the crate that is not allowed to read amplifier, worker, or
//! narrator output when deciding a health state — see
//! [`state_machine::evaluate_health_state`].

pub mod bottleneck;
pub mod state_machine;
pub mod thresholds;
pub mod worker_scaling;

pub use bottleneck::classify_bottleneck;
pub use state_machine::{evaluate_health_state, is_idle, CONSECUTIVE_CRITICAL_THRESHOLD};
pub use thresholds::{
    AmplifierThresholds, CriticalThresholds, HealthThresholds, HealthyThresholds,
    StressedThresholds, ThresholdOrderingError,
};
pub use worker_scaling::{evaluate_worker_scaling_rules, WorkerScalingContext};
