//! Behaviour-profile data model: a profile is a time-windowed snapshot of
//! cluster config plus aggregated telemetry, captured for later comparison,
//! drift detection, and preset-conformance checking.

use serde::{Deserialize, Serialize};

/// `min/max/mean/p50/p95/p99` over the raw samples in a capture window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregate {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl MetricAggregate {
    /// Aggregates a non-empty sample vector. Callers with no samples for a
    /// window should use `zero()` rather than calling this with an empty
    /// slice — a profile with genuinely no traffic is a real, reportable
    /// state, not an error.
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::zero();
        }
        let mut sorted: Vec<f64> = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let len = sorted.len();
        let percentile = |p: f64| -> f64 {
            let idx = ((len.saturating_sub(1)) as f64 * p).round() as usize;
            sorted[idx.min(len - 1)]
        };
        let sum: f64 = sorted.iter().sum();
        Self {
            min: sorted[0],
            max: sorted[len - 1],
            mean: sum / len as f64,
            p50: percentile(0.50),
            p95: percentile(0.95),
            p99: percentile(0.99),
        }
    }

    pub fn zero() -> Self {
        Self { min: 0.0, max: 0.0, mean: 0.0, p50: 0.0, p95: 0.0, p99: 0.0 }
    }

    /// Percent change of `self` relative to `baseline`, `0.0` when baseline's
    /// mean is zero (avoids a divide-by-zero explosion turning a small
    /// absolute change into a meaningless huge percentage).
    pub fn pct_change_from(&self, baseline: &MetricAggregate) -> f64 {
        if baseline.mean.abs() < f64::EPSILON {
            return 0.0;
        }
        ((self.mean - baseline.mean) / baseline.mean.abs()) * 100.0
    }
}

/// Per-service aggregate, used for resource metrics which are naturally
/// scoped to a service (e.g. `history`, `matching`, `worker`) rather than
/// cluster-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetrics {
    pub by_service: std::collections::BTreeMap<String, MetricAggregate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicConfigEntry {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVarEntry {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub redacted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerOptionsSnapshot {
    pub max_concurrent_activities: Option<u32>,
    pub max_concurrent_workflow_tasks: Option<u32>,
    pub max_concurrent_local_activities: Option<u32>,
    pub workflow_task_pollers: Option<u32>,
    pub activity_task_pollers: Option<u32>,
    pub sticky_schedule_to_start_timeout_sec: Option<f64>,
    pub disable_eager_activities: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsqlPluginSnapshot {
    pub reservoir_enabled: bool,
    pub reservoir_target_ready: u32,
    pub reservoir_base_lifetime_min: f64,
    pub reservoir_lifetime_jitter_min: f64,
    pub reservoir_guard_window_sec: f64,
    pub max_conns: u32,
    pub max_idle_conns: u32,
    pub max_conn_lifetime_min: f64,
    pub distributed_rate_limiter_enabled: bool,
    pub token_bucket_enabled: bool,
    pub token_bucket_rate: Option<u32>,
    pub token_bucket_capacity: Option<u32>,
    pub slot_block_enabled: bool,
    pub slot_block_size: Option<u32>,
    pub slot_block_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub dynamic_config: Vec<DynamicConfigEntry>,
    pub server_env_vars: Vec<EnvVarEntry>,
    pub worker_options: WorkerOptionsSnapshot,
    pub dsql_plugin_config: DsqlPluginSnapshot,
    pub config_profile: Option<crate::config_compiler::model::ConfigProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputMetrics {
    pub workflows_started_per_sec: MetricAggregate,
    pub workflows_completed_per_sec: MetricAggregate,
    pub state_transitions_per_sec: MetricAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub workflow_schedule_to_start_p95: MetricAggregate,
    pub workflow_schedule_to_start_p99: MetricAggregate,
    pub activity_schedule_to_start_p95: MetricAggregate,
    pub activity_schedule_to_start_p99: MetricAggregate,
    pub persistence_latency_p95: MetricAggregate,
    pub persistence_latency_p99: MetricAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingMetrics {
    pub sync_match_rate: MetricAggregate,
    pub async_match_rate: MetricAggregate,
    pub task_dispatch_latency: MetricAggregate,
    pub backlog_count: MetricAggregate,
    pub backlog_age: MetricAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsqlPoolMetrics {
    pub pool_open_count: MetricAggregate,
    pub pool_in_use_count: MetricAggregate,
    pub pool_idle_count: MetricAggregate,
    pub reservoir_size: MetricAggregate,
    pub reservoir_empty_events: MetricAggregate,
    pub open_failures: MetricAggregate,
    pub reconnect_count: MetricAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub occ_conflicts_per_sec: MetricAggregate,
    pub exhausted_retries_per_sec: MetricAggregate,
    pub dsql_auth_failures: MetricAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub cpu_utilization: ServiceMetrics,
    pub memory_utilization: ServiceMetrics,
    pub worker_task_slot_utilization: MetricAggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub throughput: ThroughputMetrics,
    pub latency: LatencyMetrics,
    pub matching: MatchingMetrics,
    pub dsql_pool: DsqlPoolMetrics,
    pub errors: ErrorMetrics,
    pub resources: ResourceMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviourProfile {
    pub id: uuid::Uuid,
    pub name: String,
    pub label: Option<String>,
    pub cluster_id: String,
    pub namespace: Option<String>,
    pub task_queue: Option<String>,
    pub time_window_start: chrono::DateTime<chrono::Utc>,
    pub time_window_end: chrono::DateTime<chrono::Utc>,
    pub temporal_server_version: Option<String>,
    pub dsql_plugin_version: Option<String>,
    pub worker_code_sha: Option<String>,
    pub config_snapshot: Option<ConfigSnapshot>,
    pub telemetry: TelemetrySummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub is_baseline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDiff {
    pub key: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub classification: Option<crate::config_compiler::model::ParameterClassification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffDirection {
    Improved,
    Regressed,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryDiff {
    pub metric: String,
    pub old_value: MetricAggregate,
    pub new_value: MetricAggregate,
    pub change_pct: f64,
    pub direction: DiffDirection,
    pub severity: DiffSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub component: String,
    pub old_version: Option<String>,
    pub new_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileComparison {
    pub profile_a_id: uuid::Uuid,
    pub profile_b_id: uuid::Uuid,
    pub config_diffs: Vec<ConfigDiff>,
    pub telemetry_diffs: Vec<TelemetryDiff>,
    pub version_diffs: Vec<VersionDiff>,
}

/// Output of [`crate::profiles::drift::detect_drift`]: the current
/// telemetry summary compared against the cluster/namespace's
/// `is_baseline=true` profile, filtered to metrics that actually moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAssessment {
    pub current_profile_id: uuid::Uuid,
    pub baseline_profile_id: uuid::Uuid,
    pub drifted_metrics: Vec<TelemetryDiff>,
    pub is_drifted: bool,
}

/// One curated config-key -> regressed-metric linkage emitted by
/// [`crate::profiles::correlation::correlate_drift`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftCorrelation {
    pub config_key: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub regressed_metrics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAssessment {
    pub correlations: Vec<DriftCorrelation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConformanceLabel {
    Conforming,
    Drifted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundCheck {
    pub metric: String,
    pub lower: f64,
    pub upper: f64,
    pub observed_mean: f64,
    pub pass: bool,
}

/// Output of [`crate::profiles::conformance::assess_conformance`]: every
/// bound in the preset's `expected_bounds` checked against the profile's
/// telemetry mean, labelled all-or-nothing per spec §4.4.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformanceAssessment {
    pub profile_id: uuid::Uuid,
    pub preset_name: String,
    pub bounds: Vec<BoundCheck>,
    pub label: ConformanceLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_aggregate_handles_single_sample() {
        let agg = MetricAggregate::from_samples(&[42.0]);
        assert_eq!(agg.min, 42.0);
        assert_eq!(agg.max, 42.0);
        assert_eq!(agg.p99, 42.0);
    }

    #[test]
    fn pct_change_is_zero_against_zero_baseline() {
        let baseline = MetricAggregate::zero();
        let current = MetricAggregate::from_samples(&[10.0, 20.0]);
        assert_eq!(current.pct_change_from(&baseline), 0.0);
    }

    #[test]
    fn pct_change_sign_matches_direction() {
        let baseline = MetricAggregate::from_samples(&[100.0]);
        let worse = MetricAggregate::from_samples(&[150.0]);
        assert!(worse.pct_change_from(&baseline) > 0.0);
    }
}
