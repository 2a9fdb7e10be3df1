//! Drift correlation: cross-references each changed config key against a
//! curated, static `config key -> affected metrics` table and links it to
//! any of those metrics that also show up as a regressed telemetry diff.
//! No statistical inference — purely table lookup, per spec §4.4 and
//! grounded in `original_source/.../copilot/workflows/drift.py`'s
//! `CONFIG_METRIC_CORRELATIONS`.

use crate::types::profile::{DiffDirection, DiffSeverity, DriftCorrelation, ProfileComparison, CorrelationAssessment};

/// `(config key, metrics it is known to affect)`. Curated domain
/// knowledge lifted from the reference implementation: pool sizing,
/// reservoir behaviour, the distributed rate limiter, matching partition
/// count, and persistence throughput all have well-understood blast
/// radii on specific telemetry metrics.
const CONFIG_TELEMETRY_CORRELATIONS: &[(&str, &[&str])] = &[
    (
        "persistence.maxConns",
        &["dsql_pool.pool_open_count", "dsql_pool.open_failures", "latency.persistence_latency_p95"],
    ),
    (
        "persistence.maxIdleConns",
        &["dsql_pool.pool_idle_count", "dsql_pool.reconnect_count"],
    ),
    (
        "dsql.reservoir_enabled",
        &["dsql_pool.reservoir_size", "dsql_pool.reservoir_empty_events", "matching.sync_match_rate"],
    ),
    (
        "dsql.reservoir_target_ready",
        &["dsql_pool.reservoir_size", "dsql_pool.reservoir_empty_events"],
    ),
    (
        "dsql.reservoir_lifetime_jitter",
        &["dsql_pool.reconnect_count", "errors.dsql_auth_failures"],
    ),
    (
        "dsql.distributed_rate_limiter_enabled",
        &["errors.exhausted_retries_per_sec", "throughput.state_transitions_per_sec"],
    ),
    (
        "matching.numTaskqueueReadPartitions",
        &["matching.backlog_age", "matching.backlog_count", "matching.task_dispatch_latency"],
    ),
    (
        "target_state_transitions_per_sec",
        &["throughput.state_transitions_per_sec", "throughput.workflows_completed_per_sec"],
    ),
];

fn correlated_metrics_for(key: &str) -> Option<&'static [&'static str]> {
    CONFIG_TELEMETRY_CORRELATIONS.iter().find(|(k, _)| *k == key).map(|(_, m)| *m)
}

/// Given a profile comparison, finds every changed config key whose
/// curated metric set overlaps with a regressed telemetry diff, and
/// emits one `DriftCorrelation` per such key naming the overlapping
/// metrics.
pub fn correlate_drift(comparison: &ProfileComparison) -> CorrelationAssessment {
    let regressed: Vec<&str> = comparison
        .telemetry_diffs
        .iter()
        .filter(|d| d.direction == DiffDirection::Regressed && d.severity != DiffSeverity::Info)
        .map(|d| d.metric.as_str())
        .collect();

    let mut correlations = Vec::new();
    for config_diff in &comparison.config_diffs {
        let Some(candidates) = correlated_metrics_for(&config_diff.key) else { continue };
        let hits: Vec<String> =
            candidates.iter().filter(|m| regressed.contains(&m.as_ref())).map(|m| m.to_string()).collect();
        if !hits.is_empty() {
            correlations.push(DriftCorrelation {
                config_key: config_diff.key.clone(),
                old_value: config_diff.old_value.clone(),
                new_value: config_diff.new_value.clone(),
                regressed_metrics: hits,
            });
        }
    }

    CorrelationAssessment { correlations }
}
