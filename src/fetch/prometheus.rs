//! Prometheus-backed [`SignalSource`], grounded in
//! `original_source/packages/behaviour_profiles/.../telemetry.py`'s named
//! PromQL query map and instant-query HTTP shape
//! (`{endpoint}/api/v1/query`), translated to the seven primary-signal
//! groups and eleven amplifier groups instead of that module's flat
//! telemetry summary.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;

use crate::observation::error::ObservationError;
use crate::observation::traits::SignalSource;
use crate::types::signals::{
    AmplifierSignals, CacheAmplifiers, DeployAmplifiers, FrontendSignals, GrpcAmplifiers,
    HistorySignals, HostAmplifiers, MatchingSignals, PersistenceContentionAmplifiers,
    PersistenceSignals, PollerSignals, PoolAmplifiers, PrimarySignals, QueueAmplifiers,
    RuntimeAmplifiers, ShardAmplifiers, StateTransitionSignals, ThrottlingAmplifiers,
    WorkerAmplifiers, WorkerSignals, WorkflowCompletionSignals,
};

#[derive(Debug, Deserialize)]
struct InstantQueryResponse {
    status: String,
    data: InstantQueryData,
}

#[derive(Debug, Deserialize)]
struct InstantQueryData {
    result: Vec<InstantQueryResult>,
}

#[derive(Debug, Deserialize)]
struct InstantQueryResult {
    value: (f64, String),
}

pub struct PrometheusSignalSource {
    http: reqwest::Client,
    endpoint: String,
}

impl PrometheusSignalSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(crate::config::defaults::FETCH_HTTP_TIMEOUT_SECS))
            .build()
            .expect("failed to build Prometheus HTTP client");

        Self { http, endpoint: endpoint.into().trim_end_matches('/').to_string() }
    }

    /// Executes one PromQL instant query and returns its scalar value, or
    /// `0.0` (logged) if the series is empty — an absent metric means
    /// "nothing happened", not "unknown", for every query this source runs.
    async fn query(&self, promql: &str) -> f64 {
        match self.try_query(promql).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(query = promql, error = %e, "prometheus query failed, treating as zero");
                0.0
            }
        }
    }

    async fn try_query(&self, promql: &str) -> Result<f64, ObservationError> {
        let resp = self
            .http
            .get(format!("{}/api/v1/query", self.endpoint))
            .query(&[("query", promql)])
            .send()
            .await
            .map_err(|e| ObservationError::FetchFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ObservationError::FetchFailed(format!("prometheus returned {}", resp.status())));
        }

        let body: InstantQueryResponse =
            resp.json().await.map_err(|e| ObservationError::FetchFailed(e.to_string()))?;

        if body.status != "success" {
            return Err(ObservationError::FetchFailed(format!("prometheus query status {}", body.status)));
        }

        match body.data.result.first() {
            Some(r) => r.value.1.parse::<f64>().map_err(|e| ObservationError::FetchFailed(e.to_string())),
            None => Ok(0.0),
        }
    }

    /// Runs several PromQL queries concurrently and returns their values
    /// in the same order.
    async fn query_all(&self, queries: &[&str]) -> Vec<f64> {
        join_all(queries.iter().map(|q| self.query(q))).await
    }
}

#[async_trait]
impl SignalSource for PrometheusSignalSource {
    async fn fetch_primary(&self) -> Result<PrimarySignals, ObservationError> {
        let values = self
            .query_all(&[
                "sum(rate(sdk_temporal_request_count[1m]))",
                "histogram_quantile(0.95, sum(rate(sdk_temporal_request_latency_bucket[1m])) by (le))",
                "histogram_quantile(0.99, sum(rate(sdk_temporal_request_latency_bucket[1m])) by (le))",
                "sum(rate(workflow_success_count[1m]))",
                "sum(rate(workflow_failed_count[1m]))",
                "sum(rate(workflow_success_count[1m])) / (sum(rate(workflow_success_count[1m])) + sum(rate(workflow_failed_count[1m])) + 1e-9)",
                "max(history_backlog_age_seconds)",
                "sum(rate(task_processing_count[1m]))",
                "sum(rate(shard_ownership_churn_count[1m]))",
                "sum(rate(frontend_error_count[1m]))",
                "histogram_quantile(0.95, sum(rate(frontend_latency_bucket[1m])) by (le))",
                "histogram_quantile(0.99, sum(rate(frontend_latency_bucket[1m])) by (le))",
                "max(matching_workflow_task_backlog_age_seconds)",
                "max(matching_activity_task_backlog_age_seconds)",
                "avg(poller_timeout_ratio)",
                "sum(rate(persistence_error_count[1m]))",
                "histogram_quantile(0.95, sum(rate(persistence_latency_bucket[1m])) by (le))",
                "histogram_quantile(0.99, sum(rate(persistence_latency_bucket[1m])) by (le))",
            ])
            .await;

        Ok(PrimarySignals::clamped(
            StateTransitionSignals {
                throughput_per_sec: values[0],
                latency_p95_ms: values[1],
                latency_p99_ms: values[2],
            },
            WorkflowCompletionSignals {
                success_per_sec: values[3],
                failed_per_sec: values[4],
                completion_rate: values[5],
            },
            HistorySignals {
                backlog_age_sec: values[6],
                task_processing_rate_per_sec: values[7],
                shard_churn_rate_per_sec: values[8],
            },
            FrontendSignals { error_rate_per_sec: values[9], latency_p95_ms: values[10], latency_p99_ms: values[11] },
            MatchingSignals { workflow_backlog_age_sec: values[12], activity_backlog_age_sec: values[13] },
            PollerSignals { poll_timeout_rate: values[14] },
            PersistenceSignals {
                error_rate_per_sec: values[15],
                latency_p95_ms: values[16],
                latency_p99_ms: values[17],
            },
        ))
    }

    async fn fetch_worker(&self) -> Result<WorkerSignals, ObservationError> {
        let values = self
            .query_all(&[
                "histogram_quantile(0.95, sum(rate(schedule_to_start_workflow_latency_bucket[1m])) by (le))",
                "histogram_quantile(0.99, sum(rate(schedule_to_start_workflow_latency_bucket[1m])) by (le))",
                "histogram_quantile(0.95, sum(rate(schedule_to_start_activity_latency_bucket[1m])) by (le))",
                "histogram_quantile(0.99, sum(rate(schedule_to_start_activity_latency_bucket[1m])) by (le))",
                "sum(worker_workflow_slots_available)",
                "sum(worker_workflow_slots_used)",
                "sum(worker_activity_slots_available)",
                "sum(worker_activity_slots_used)",
                "sum(worker_workflow_pollers)",
                "sum(worker_activity_pollers)",
                "avg(worker_sticky_cache_hit_rate)",
            ])
            .await;

        Ok(WorkerSignals {
            schedule_to_start_workflow_p95_ms: values[0],
            schedule_to_start_workflow_p99_ms: values[1],
            schedule_to_start_activity_p95_ms: values[2],
            schedule_to_start_activity_p99_ms: values[3],
            workflow_slots_available: values[4] as u32,
            workflow_slots_used: values[5] as u32,
            activity_slots_available: values[6] as u32,
            activity_slots_used: values[7] as u32,
            workflow_pollers: values[8] as u32,
            activity_pollers: values[9] as u32,
            sticky_cache_hit_rate: values[10],
        })
    }

    async fn fetch_amplifiers(&self) -> Result<AmplifierSignals, ObservationError> {
        let values = self
            .query_all(&[
                "sum(rate(persistence_occ_conflict_count[1m]))",
                "sum(rate(persistence_occ_exhausted_retry_count[1m]))",
                "sum(dsql_pool_open_count)",
                "sum(dsql_pool_in_use_count)",
                "sum(dsql_pool_idle_count)",
                "histogram_quantile(0.95, sum(rate(dsql_pool_wait_duration_bucket[1m])) by (le))",
                "sum(dsql_reservoir_size)",
                "sum(rate(dsql_reservoir_empty_count[1m]))",
                "sum(task_queue_backlog_count)",
                "avg(worker_task_slot_utilization)",
                "avg(worker_sticky_cache_hit_rate)",
                "sum(rate(shard_ownership_churn_count[1m]))",
                "sum(rate(membership_change_count[1m]))",
                "histogram_quantile(0.99, sum(rate(grpc_request_latency_bucket[1m])) by (le))",
                "sum(rate(grpc_error_count[1m]))",
                "histogram_quantile(0.99, sum(rate(go_gc_pause_bucket[1m])) by (le))",
                "avg(go_goroutines)",
                "avg(host_cpu_throttle_ratio) * 100",
                "avg(host_memory_pressure_ratio) * 100",
                "sum(rate(rate_limiter_rejection_count[1m]))",
                "max(deploy_recent_marker)",
                "max(deploy_version_changed)",
            ])
            .await;

        Ok(AmplifierSignals {
            persistence_contention: PersistenceContentionAmplifiers {
                occ_conflicts_per_sec: values[0],
                exhausted_retries_per_sec: values[1],
            },
            pool: PoolAmplifiers {
                open_count: values[2] as u32,
                in_use_count: values[3] as u32,
                idle_count: values[4] as u32,
                wait_duration_ms: values[5],
                reservoir_size: values[6] as u32,
                reservoir_empty_events: values[7] as u64,
            },
            queue: QueueAmplifiers { task_queue_backlog_count: values[8] as u64 },
            worker: WorkerAmplifiers { task_slot_utilization: values[9] },
            cache: CacheAmplifiers { sticky_cache_hit_rate: values[10] },
            shard: ShardAmplifiers { ownership_churn_per_sec: values[11], membership_changes_per_sec: values[12] },
            grpc: GrpcAmplifiers { request_latency_p99_ms: values[13], error_rate_per_sec: values[14] },
            runtime: RuntimeAmplifiers { gc_pause_p99_ms: values[15], goroutine_count: values[16] as u32 },
            host: HostAmplifiers { cpu_throttle_pct: values[17], memory_pressure_pct: values[18] },
            throttling: ThrottlingAmplifiers { rate_limiter_rejection_rate: values[19] },
            deploy: DeployAmplifiers { recent_deploy: values[20] > 0.0, version_changed: values[21] > 0.0 },
        })
    }
}
