//! The three health states and the supporting classification types the
//! state machine and the narrator both speak.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Happy,
    Stressed,
    Critical,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Happy => write!(f, "happy"),
            HealthState::Stressed => write!(f, "stressed"),
            HealthState::Critical => write!(f, "critical"),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        HealthState::Happy
    }
}

/// Which side of the server/worker boundary is limiting throughput, per
/// spec's bottleneck classifier. Narrative-only — never fed back into the
/// state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bottleneck {
    ServerLimited,
    WorkerLimited,
    Mixed,
    Healthy,
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bottleneck::ServerLimited => write!(f, "server_limited"),
            Bottleneck::WorkerLimited => write!(f, "worker_limited"),
            Bottleneck::Mixed => write!(f, "mixed"),
            Bottleneck::Healthy => write!(f, "healthy"),
        }
    }
}

/// A proposed worker fleet action the scaling-rule evaluator checks for
/// known footguns. Not a command the copilot issues — see spec's
/// "no automated remediation" Non-goal; this only classifies advice that
/// some other human or system is already about to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposedWorkerAction {
    ScaleUp,
    ScaleDown,
    Restart,
    NoAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerScalingWarning {
    /// Proposing scale-down while the fleet is already at zero workers.
    NeverScaleDownAtZero,
    /// Sticky task queue: scaling will fragment cache locality, not add capacity.
    StickyQueueWarning,
    /// Restarting workers to redistribute sticky load, rather than fixing the cause.
    RestartToRedistribute,
    /// Poller count and executor slot count are badly mismatched.
    PollerExecutorMismatch,
}

impl fmt::Display for WorkerScalingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerScalingWarning::NeverScaleDownAtZero => {
                write!(f, "scale-down proposed while worker fleet is already at zero")
            }
            WorkerScalingWarning::StickyQueueWarning => {
                write!(f, "task queue is sticky, scaling changes cache locality not capacity")
            }
            WorkerScalingWarning::RestartToRedistribute => {
                write!(f, "restart proposed to redistribute sticky load rather than add capacity")
            }
            WorkerScalingWarning::PollerExecutorMismatch => {
                write!(f, "poller count and executor slot count are mismatched")
            }
        }
    }
}
