//! Builds a [`BehaviourProfile`] by bounding a time window, aggregating raw
//! samples per curated metric into a [`MetricAggregate`], and attaching
//! whatever config snapshot and version metadata the caller already has —
//! grounded in `original_source/packages/behaviour_profiles/.../capture.py`.
//!
//! Fetching the raw samples from Prometheus is the caller's job (an
//! activity, per spec §5's "metric/log/KB fetch adapters are out of
//! scope" framing) — this module only validates the window and does the
//! aggregation arithmetic.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::profile::{BehaviourProfile, ConfigSnapshot, TelemetrySummary};

const MAX_WINDOW_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("window_end ({end}) must be after window_start ({start})")]
    NonPositiveWindow { start: DateTime<Utc>, end: DateTime<Utc> },
    #[error("window spans {hours}h, exceeding the {MAX_WINDOW_HOURS}h cap")]
    WindowTooWide { hours: i64 },
}

/// Validates the window and assembles the profile. The caller supplies an
/// already-aggregated [`TelemetrySummary`] — produced by calling
/// `MetricAggregate::from_samples` per curated metric over raw
/// `query_range` samples, which is mechanical enough not to need its own
/// abstraction here.
pub struct ProfileBuilder;

impl ProfileBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        name: String,
        label: Option<String>,
        cluster_id: String,
        namespace: Option<String>,
        task_queue: Option<String>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        telemetry: TelemetrySummary,
        config_snapshot: Option<ConfigSnapshot>,
        temporal_server_version: Option<String>,
        dsql_plugin_version: Option<String>,
        worker_code_sha: Option<String>,
    ) -> Result<BehaviourProfile, CaptureError> {
        if window_end <= window_start {
            return Err(CaptureError::NonPositiveWindow { start: window_start, end: window_end });
        }
        let hours = (window_end - window_start).num_hours();
        if (window_end - window_start).num_seconds() > MAX_WINDOW_HOURS * 3600 {
            return Err(CaptureError::WindowTooWide { hours });
        }

        Ok(BehaviourProfile {
            id: Uuid::new_v4(),
            name,
            label,
            cluster_id,
            namespace,
            task_queue,
            time_window_start: window_start,
            time_window_end: window_end,
            temporal_server_version,
            dsql_plugin_version,
            worker_code_sha,
            config_snapshot,
            telemetry,
            created_at: Utc::now(),
            is_baseline: false,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::profile::*;
    use std::collections::BTreeMap;

    pub fn sample_profile() -> BehaviourProfile {
        let agg = |v: f64| MetricAggregate::from_samples(&[v, v, v]);
        ProfileBuilder::build(
            "nightly".into(),
            None,
            "cluster-a".into(),
            Some("default".into()),
            None,
            Utc::now() - chrono::Duration::hours(1),
            Utc::now(),
            TelemetrySummary {
                throughput: ThroughputMetrics {
                    workflows_started_per_sec: agg(100.0),
                    workflows_completed_per_sec: agg(95.0),
                    state_transitions_per_sec: agg(100.0),
                },
                latency: LatencyMetrics {
                    workflow_schedule_to_start_p95: agg(10.0),
                    workflow_schedule_to_start_p99: agg(20.0),
                    activity_schedule_to_start_p95: agg(10.0),
                    activity_schedule_to_start_p99: agg(20.0),
                    persistence_latency_p95: agg(5.0),
                    persistence_latency_p99: agg(10.0),
                },
                matching: MatchingMetrics {
                    sync_match_rate: agg(0.9),
                    async_match_rate: agg(0.1),
                    task_dispatch_latency: agg(5.0),
                    backlog_count: agg(0.0),
                    backlog_age: agg(0.5),
                },
                dsql_pool: DsqlPoolMetrics {
                    pool_open_count: agg(50.0),
                    pool_in_use_count: agg(20.0),
                    pool_idle_count: agg(30.0),
                    reservoir_size: agg(10.0),
                    reservoir_empty_events: agg(0.0),
                    open_failures: agg(0.0),
                    reconnect_count: agg(0.0),
                },
                errors: ErrorMetrics {
                    occ_conflicts_per_sec: agg(1.0),
                    exhausted_retries_per_sec: agg(0.1),
                    dsql_auth_failures: agg(0.0),
                },
                resources: ResourceMetrics {
                    cpu_utilization: ServiceMetrics { by_service: BTreeMap::new() },
                    memory_utilization: ServiceMetrics { by_service: BTreeMap::new() },
                    worker_task_slot_utilization: agg(0.4),
                },
            },
            None,
            Some("1.26.2".into()),
            Some("1.26.2".into()),
            None,
        )
        .expect("sample window is valid")
    }

    #[test]
    fn rejects_inverted_window() {
        let now = Utc::now();
        let err = ProfileBuilder::build(
            "x".into(), None, "c".into(), None, None, now, now - chrono::Duration::hours(1),
            sample_profile().telemetry, None, None, None, None,
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::NonPositiveWindow { .. }));
    }

    #[test]
    fn rejects_window_over_24h() {
        let start = Utc::now() - chrono::Duration::hours(25);
        let end = Utc::now();
        let err = ProfileBuilder::build(
            "x".into(), None, "c".into(), None, None, start, end,
            sample_profile().telemetry, None, None, None, None,
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::WindowTooWide { .. }));
    }

    #[test]
    fn accepts_exactly_24h() {
        let start = Utc::now() - chrono::Duration::hours(24);
        let end = Utc::now();
        assert!(ProfileBuilder::build(
            "x".into(), None, "c".into(), None, None, start, end,
            sample_profile().telemetry, None, None, None, None,
        )
        .is_ok());
    }
}
