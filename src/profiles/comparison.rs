//! Profile comparison: flattens two `TelemetrySummary`s into named metrics,
//! diffs each pair, classifies direction from name semantics, grades
//! severity against category-specific thresholds, and sorts the result —
//! grounded in `original_source/packages/behaviour_profiles/.../comparison.py`.

use serde::{Deserialize, Serialize};

use crate::config_compiler::model::ParameterClassification;
use crate::types::profile::{
    BehaviourProfile, ConfigDiff, DiffDirection, DiffSeverity, MetricAggregate, ProfileComparison,
    TelemetryDiff, TelemetrySummary, VersionDiff,
};

/// Category-specific regression thresholds. `|change_pct| > threshold`
/// grades a metric `warning`; `> 2x threshold` grades it `critical`.
/// Defaults match spec §4.4 (latency 20%, error 50%, throughput 30%) and
/// are caller-overridable — the Read API's `/profiles/compare` accepts
/// them in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonThresholds {
    pub latency_pct: f64,
    pub error_pct: f64,
    pub throughput_pct: f64,
}

impl Default for ComparisonThresholds {
    fn default() -> Self {
        Self { latency_pct: 20.0, error_pct: 50.0, throughput_pct: 30.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricCategory {
    ErrorLike,
    Throughput,
    Latency,
}

/// Names containing these substrings are error-like regardless of any
/// other naming convention (e.g. `occ_conflicts_per_sec` is error-like
/// despite ending in `per_sec`) — this check runs first.
const ERROR_MARKERS: &[&str] = &["error", "conflict", "failure", "empty"];

fn classify_metric_name(name: &str) -> MetricCategory {
    if ERROR_MARKERS.iter().any(|m| name.contains(m)) {
        MetricCategory::ErrorLike
    } else if name.contains("per_sec") {
        MetricCategory::Throughput
    } else {
        MetricCategory::Latency
    }
}

impl ComparisonThresholds {
    fn for_category(&self, category: MetricCategory) -> f64 {
        match category {
            MetricCategory::ErrorLike => self.error_pct,
            MetricCategory::Throughput => self.throughput_pct,
            MetricCategory::Latency => self.latency_pct,
        }
    }
}

/// Flattens a `TelemetrySummary` into `(dotted_name, aggregate)` pairs.
/// The name is what drift/comparison/conformance all key metrics by —
/// centralising it here means a rename only has to happen in one place,
/// per spec §9's "Shared signal vocabulary" design note.
pub fn flatten_telemetry(t: &TelemetrySummary) -> Vec<(String, MetricAggregate)> {
    let mut out = vec![
        ("throughput.workflows_started_per_sec".to_string(), t.throughput.workflows_started_per_sec),
        ("throughput.workflows_completed_per_sec".to_string(), t.throughput.workflows_completed_per_sec),
        ("throughput.state_transitions_per_sec".to_string(), t.throughput.state_transitions_per_sec),
        ("latency.workflow_schedule_to_start_p95".to_string(), t.latency.workflow_schedule_to_start_p95),
        ("latency.workflow_schedule_to_start_p99".to_string(), t.latency.workflow_schedule_to_start_p99),
        ("latency.activity_schedule_to_start_p95".to_string(), t.latency.activity_schedule_to_start_p95),
        ("latency.activity_schedule_to_start_p99".to_string(), t.latency.activity_schedule_to_start_p99),
        ("latency.persistence_latency_p95".to_string(), t.latency.persistence_latency_p95),
        ("latency.persistence_latency_p99".to_string(), t.latency.persistence_latency_p99),
        ("matching.sync_match_rate".to_string(), t.matching.sync_match_rate),
        ("matching.async_match_rate".to_string(), t.matching.async_match_rate),
        ("matching.task_dispatch_latency".to_string(), t.matching.task_dispatch_latency),
        ("matching.backlog_count".to_string(), t.matching.backlog_count),
        ("matching.backlog_age".to_string(), t.matching.backlog_age),
        ("dsql_pool.pool_open_count".to_string(), t.dsql_pool.pool_open_count),
        ("dsql_pool.pool_in_use_count".to_string(), t.dsql_pool.pool_in_use_count),
        ("dsql_pool.pool_idle_count".to_string(), t.dsql_pool.pool_idle_count),
        ("dsql_pool.reservoir_size".to_string(), t.dsql_pool.reservoir_size),
        ("dsql_pool.reservoir_empty_events".to_string(), t.dsql_pool.reservoir_empty_events),
        ("dsql_pool.open_failures".to_string(), t.dsql_pool.open_failures),
        ("dsql_pool.reconnect_count".to_string(), t.dsql_pool.reconnect_count),
        ("errors.occ_conflicts_per_sec".to_string(), t.errors.occ_conflicts_per_sec),
        ("errors.exhausted_retries_per_sec".to_string(), t.errors.exhausted_retries_per_sec),
        ("errors.dsql_auth_failures".to_string(), t.errors.dsql_auth_failures),
        ("resources.worker_task_slot_utilization".to_string(), t.resources.worker_task_slot_utilization),
    ];
    for (service, agg) in &t.resources.cpu_utilization.by_service {
        out.push((format!("resources.cpu_utilization.{service}"), *agg));
    }
    for (service, agg) in &t.resources.memory_utilization.by_service {
        out.push((format!("resources.memory_utilization.{service}"), *agg));
    }
    out
}

/// Diffs one metric pair. `None` when both values are unchanged within
/// the `< 5%` "unchanged" band from spec §4.4.
fn diff_metric(
    name: &str,
    old: MetricAggregate,
    new: MetricAggregate,
    thresholds: &ComparisonThresholds,
) -> TelemetryDiff {
    let category = classify_metric_name(name);
    let change_pct = new.pct_change_from(&old);
    let abs_change = change_pct.abs();

    let direction = if abs_change < 5.0 {
        DiffDirection::Unchanged
    } else {
        let increased = change_pct > 0.0;
        let higher_is_better = category == MetricCategory::Throughput;
        if increased == higher_is_better {
            DiffDirection::Improved
        } else {
            DiffDirection::Regressed
        }
    };

    let threshold = thresholds.for_category(category);
    let severity = if direction != DiffDirection::Regressed {
        DiffSeverity::Info
    } else if abs_change > 2.0 * threshold {
        DiffSeverity::Critical
    } else if abs_change > threshold {
        DiffSeverity::Warning
    } else {
        DiffSeverity::Info
    };

    TelemetryDiff { metric: name.to_string(), old_value: old, new_value: new, change_pct, direction, severity }
}

/// Rank used for the comparison ordering invariant: critical sorts first.
fn severity_rank(s: DiffSeverity) -> u8 {
    match s {
        DiffSeverity::Critical => 0,
        DiffSeverity::Warning => 1,
        DiffSeverity::Info => 2,
    }
}

fn sort_telemetry_diffs(diffs: &mut [TelemetryDiff]) {
    diffs.sort_by(|a, b| {
        severity_rank(a.severity)
            .cmp(&severity_rank(b.severity))
            .then(b.change_pct.abs().partial_cmp(&a.change_pct.abs()).unwrap_or(std::cmp::Ordering::Equal))
    });
}

fn diff_config_snapshots(a: &BehaviourProfile, b: &BehaviourProfile) -> Vec<ConfigDiff> {
    let (Some(ca), Some(cb)) = (&a.config_snapshot, &b.config_snapshot) else {
        return Vec::new();
    };

    let mut diffs = Vec::new();
    for entry_b in &cb.dynamic_config {
        let old = ca.dynamic_config.iter().find(|e| e.key == entry_b.key);
        let changed = match old {
            Some(e) => e.value != entry_b.value,
            None => true,
        };
        if changed {
            let classification = cb
                .config_profile
                .as_ref()
                .and_then(|p| p.get_param(&entry_b.key))
                .map(|p| p.classification)
                .or_else(|| classification_hint(&entry_b.key));
            diffs.push(ConfigDiff {
                key: entry_b.key.clone(),
                old_value: old.map(|e| e.value.clone()).unwrap_or(serde_json::Value::Null),
                new_value: entry_b.value.clone(),
                classification,
            });
        }
    }
    diffs
}

fn classification_hint(_key: &str) -> Option<ParameterClassification> {
    None
}

fn diff_versions(a: &BehaviourProfile, b: &BehaviourProfile) -> Vec<VersionDiff> {
    let mut out = Vec::new();
    if a.temporal_server_version != b.temporal_server_version {
        out.push(VersionDiff {
            component: "temporal_server".into(),
            old_version: a.temporal_server_version.clone(),
            new_version: b.temporal_server_version.clone(),
        });
    }
    if a.dsql_plugin_version != b.dsql_plugin_version {
        out.push(VersionDiff {
            component: "dsql_plugin".into(),
            old_version: a.dsql_plugin_version.clone(),
            new_version: b.dsql_plugin_version.clone(),
        });
    }
    if a.worker_code_sha != b.worker_code_sha {
        out.push(VersionDiff {
            component: "worker_code".into(),
            old_version: a.worker_code_sha.clone(),
            new_version: b.worker_code_sha.clone(),
        });
    }
    out
}

/// Compares two profiles: config diffs (key-level), telemetry diffs (per
/// flattened metric, sorted `(severity asc, |change_pct| desc)`), version
/// diffs. Pure and deterministic — calling twice with the same inputs
/// produces structurally equal output.
pub fn compare_profiles(
    a: &BehaviourProfile,
    b: &BehaviourProfile,
    thresholds: &ComparisonThresholds,
) -> ProfileComparison {
    let flat_a = flatten_telemetry(&a.telemetry);
    let flat_b = flatten_telemetry(&b.telemetry);

    let mut telemetry_diffs: Vec<TelemetryDiff> = flat_b
        .iter()
        .filter_map(|(name, new_agg)| {
            flat_a
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, old_agg)| diff_metric(name, *old_agg, *new_agg, thresholds))
        })
        .collect();
    sort_telemetry_diffs(&mut telemetry_diffs);

    ProfileComparison {
        profile_a_id: a.id,
        profile_b_id: b.id,
        config_diffs: diff_config_snapshots(a, b),
        telemetry_diffs,
        version_diffs: diff_versions(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::capture::tests::sample_profile;

    #[test]
    fn unchanged_band_is_below_five_percent() {
        let a = MetricAggregate { mean: 100.0, ..MetricAggregate::zero() };
        let b = MetricAggregate { mean: 103.0, ..MetricAggregate::zero() };
        let diff = diff_metric("latency.persistence_latency_p95", a, b, &ComparisonThresholds::default());
        assert_eq!(diff.direction, DiffDirection::Unchanged);
    }

    #[test]
    fn error_marker_wins_over_per_sec_suffix() {
        assert_eq!(classify_metric_name("errors.occ_conflicts_per_sec"), MetricCategory::ErrorLike);
    }

    #[test]
    fn throughput_increase_is_improved_and_never_graded_above_info() {
        let a = MetricAggregate { mean: 100.0, ..MetricAggregate::zero() };
        let b = MetricAggregate { mean: 150.0, ..MetricAggregate::zero() };
        let diff = diff_metric("throughput.state_transitions_per_sec", a, b, &ComparisonThresholds::default());
        assert_eq!(diff.direction, DiffDirection::Improved);
        assert_eq!(diff.severity, DiffSeverity::Info);
    }

    #[test]
    fn comparison_ordering_is_severity_then_magnitude() {
        let mut a = sample_profile();
        let mut b = sample_profile();
        a.id = uuid::Uuid::new_v4();
        b.id = uuid::Uuid::new_v4();
        b.telemetry.throughput.state_transitions_per_sec.mean = 40.0; // -60%, critical
        b.telemetry.errors.occ_conflicts_per_sec.mean =
            a.telemetry.errors.occ_conflicts_per_sec.mean * 1.6; // +60%, warning-ish error category
        let cmp = compare_profiles(&a, &b, &ComparisonThresholds::default());
        for pair in cmp.telemetry_diffs.windows(2) {
            let (x, y) = (pair[0].severity, pair[1].severity);
            assert!(severity_rank(x) <= severity_rank(y));
        }
    }

    #[test]
    fn comparison_is_deterministic() {
        let a = sample_profile();
        let b = sample_profile();
        let t = ComparisonThresholds::default();
        assert_eq!(compare_profiles(&a, &b, &t), compare_profiles(&a, &b, &t));
    }
}
