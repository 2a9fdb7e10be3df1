//! End-to-end scenario tests, one per named scenario in the health
//! model's design notes: ramp-up vs. collapse, the debounce/transition
//! invariants, the idle override at the Read API boundary, a guard rail
//! violation, a drift correlation, and baseline uniqueness. Each test
//! exercises public crate entry points directly, with the exact
//! numeric inputs the scenarios were written against.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use copilot::config_compiler::{
    modifiers::build_default_modifiers, presets::build_default_presets, registry::build_default_registry,
    CompilationError, ConfigCompiler, ParamValue, ParameterOverrides,
};
use copilot::health::{evaluate_health_state, CriticalThresholds, HealthyThresholds, StressedThresholds};
use copilot::profiles::comparison::{compare_profiles, ComparisonThresholds};
use copilot::profiles::correlation::correlate_drift;
use copilot::profiles::store::{BehaviourProfileStore, ProfileListFilter, ProfileStoreError};
use copilot::types::assessment::{Assessment, AssessmentTrigger};
use copilot::types::health::{Bottleneck, HealthState};
use copilot::types::profile::{
    BehaviourProfile, ConfigSnapshot, DsqlPluginSnapshot, DynamicConfigEntry, MetricAggregate, TelemetrySummary,
    ThroughputMetrics, WorkerOptionsSnapshot,
};
use copilot::types::signals::{
    AmplifierSignals, CacheAmplifiers, DeployAmplifiers, FrontendSignals, GrpcAmplifiers, HistorySignals,
    HostAmplifiers, MatchingSignals, PersistenceContentionAmplifiers, PersistenceSignals, PollerSignals,
    PoolAmplifiers, PrimarySignals, QueueAmplifiers, RuntimeAmplifiers, ShardAmplifiers, StateTransitionSignals,
    ThrottlingAmplifiers, WorkerAmplifiers, WorkflowCompletionSignals,
};

fn zero_amplifiers() -> AmplifierSignals {
    AmplifierSignals {
        persistence_contention: PersistenceContentionAmplifiers { occ_conflicts_per_sec: 0.0, exhausted_retries_per_sec: 0.0 },
        pool: PoolAmplifiers {
            open_count: 0,
            in_use_count: 0,
            idle_count: 0,
            wait_duration_ms: 0.0,
            reservoir_size: 0,
            reservoir_empty_events: 0,
        },
        queue: QueueAmplifiers { task_queue_backlog_count: 0 },
        worker: WorkerAmplifiers { task_slot_utilization: 0.0 },
        cache: CacheAmplifiers { sticky_cache_hit_rate: 1.0 },
        shard: ShardAmplifiers { ownership_churn_per_sec: 0.0, membership_changes_per_sec: 0.0 },
        grpc: GrpcAmplifiers { request_latency_p99_ms: 0.0, error_rate_per_sec: 0.0 },
        runtime: RuntimeAmplifiers { gc_pause_p99_ms: 0.0, goroutine_count: 0 },
        host: HostAmplifiers { cpu_throttle_pct: 0.0, memory_pressure_pct: 0.0 },
        throttling: ThrottlingAmplifiers { rate_limiter_rejection_rate: 0.0 },
        deploy: DeployAmplifiers { recent_deploy: false, version_changed: false },
    }
}

/// Scenario A — ramp-up is not Critical. 100 starts/s, 2 completions/s
/// split 0.4/1.6 (completion_rate 0.2), backlog 5s, processing_rate
/// 100/s. The demand-floor gate should block the completion-rate check
/// entirely, since total terminal demand (2/s) is below the floor
/// (10/s) -- this is ramp-up, not collapse.
#[test]
fn scenario_a_ramp_up_is_not_critical() {
    let primary = PrimarySignals::clamped(
        StateTransitionSignals { throughput_per_sec: 100.0, latency_p95_ms: 10.0, latency_p99_ms: 20.0 },
        WorkflowCompletionSignals { success_per_sec: 0.4, failed_per_sec: 1.6, completion_rate: 0.2 },
        HistorySignals { backlog_age_sec: 5.0, task_processing_rate_per_sec: 100.0, shard_churn_rate_per_sec: 0.0 },
        FrontendSignals { error_rate_per_sec: 0.1, latency_p95_ms: 50.0, latency_p99_ms: 90.0 },
        MatchingSignals { workflow_backlog_age_sec: 0.5, activity_backlog_age_sec: 0.5 },
        PollerSignals { poll_timeout_rate: 0.01 },
        PersistenceSignals { error_rate_per_sec: 0.1, latency_p95_ms: 5.0, latency_p99_ms: 10.0 },
    );

    let (state, _count) = evaluate_health_state(
        &primary,
        HealthState::Happy,
        0,
        &CriticalThresholds::default(),
        &StressedThresholds::default(),
        &HealthyThresholds::default(),
    );

    assert_ne!(state, HealthState::Critical);
}

/// Scenario B — sustained collapse triggers Critical from Stressed.
/// Three consecutive calls at 1/s throughput (critical floor 10/s),
/// starting `current_state=Stressed, counter=0`. Expected after the
/// third call: `(Critical, 3)`.
#[test]
fn scenario_b_sustained_collapse_triggers_critical_from_stressed() {
    let primary = PrimarySignals::clamped(
        StateTransitionSignals { throughput_per_sec: 1.0, latency_p95_ms: 10.0, latency_p99_ms: 20.0 },
        WorkflowCompletionSignals { success_per_sec: 0.9, failed_per_sec: 0.1, completion_rate: 0.9 },
        HistorySignals { backlog_age_sec: 1.0, task_processing_rate_per_sec: 90.0, shard_churn_rate_per_sec: 0.0 },
        FrontendSignals { error_rate_per_sec: 0.1, latency_p95_ms: 50.0, latency_p99_ms: 90.0 },
        MatchingSignals { workflow_backlog_age_sec: 0.5, activity_backlog_age_sec: 0.5 },
        PollerSignals { poll_timeout_rate: 0.01 },
        PersistenceSignals { error_rate_per_sec: 0.1, latency_p95_ms: 5.0, latency_p99_ms: 10.0 },
    );

    let critical = CriticalThresholds::default();
    let stressed = StressedThresholds::default();
    let healthy = HealthyThresholds::default();

    let mut state = HealthState::Stressed;
    let mut count = 0;
    for _ in 0..3 {
        (state, count) = evaluate_health_state(&primary, state, count, &critical, &stressed, &healthy);
    }

    assert_eq!(state, HealthState::Critical);
    assert_eq!(count, 3);
}

/// Scenario C — invariant blocks sudden Critical. One call with
/// throughput 0/s and backlog 500s, from `current_state=Happy,
/// counter=10`. Even though the counter is already past the debounce
/// threshold, the Happy -> Critical transition invariant still forces
/// the result to Stressed on this one call.
#[test]
fn scenario_c_transition_invariant_blocks_sudden_critical() {
    let primary = PrimarySignals::clamped(
        StateTransitionSignals { throughput_per_sec: 0.0, latency_p95_ms: 10.0, latency_p99_ms: 20.0 },
        WorkflowCompletionSignals { success_per_sec: 0.0, failed_per_sec: 0.0, completion_rate: 1.0 },
        HistorySignals { backlog_age_sec: 500.0, task_processing_rate_per_sec: 0.0, shard_churn_rate_per_sec: 0.0 },
        FrontendSignals { error_rate_per_sec: 0.1, latency_p95_ms: 50.0, latency_p99_ms: 90.0 },
        MatchingSignals { workflow_backlog_age_sec: 0.5, activity_backlog_age_sec: 0.5 },
        PollerSignals { poll_timeout_rate: 0.01 },
        PersistenceSignals { error_rate_per_sec: 0.1, latency_p95_ms: 5.0, latency_p99_ms: 10.0 },
    );

    let (state, count) = evaluate_health_state(
        &primary,
        HealthState::Happy,
        10,
        &CriticalThresholds::default(),
        &StressedThresholds::default(),
        &HealthyThresholds::default(),
    );

    assert_eq!(state, HealthState::Stressed);
    assert_eq!(count, 11);
}

/// Scenario D — idle cluster overrides a stored Critical. A stored
/// assessment carries `health_state = Critical` from before the
/// cluster went quiet; the Read API's projection must report Happy
/// once the assessment's own snapshot satisfies the idle detector.
#[test]
fn scenario_d_idle_overrides_stored_critical() {
    let idle_primary = PrimarySignals::clamped(
        StateTransitionSignals { throughput_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
        WorkflowCompletionSignals { success_per_sec: 0.0, failed_per_sec: 0.0, completion_rate: 1.0 },
        HistorySignals { backlog_age_sec: 0.0, task_processing_rate_per_sec: 0.0, shard_churn_rate_per_sec: 0.0 },
        FrontendSignals { error_rate_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
        MatchingSignals { workflow_backlog_age_sec: 0.0, activity_backlog_age_sec: 0.0 },
        PollerSignals { poll_timeout_rate: 0.0 },
        PersistenceSignals { error_rate_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
    );

    let stale_critical = Assessment {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        health_state: HealthState::Critical,
        trigger: AssessmentTrigger::Scheduled,
        consecutive_critical_count: 3,
        bottleneck: Bottleneck::Healthy,
        primary_snapshot: idle_primary,
        amplifier_snapshot: zero_amplifiers(),
        log_patterns: vec![],
        summary: String::new(),
        suggested_actions: vec![],
        issues: vec![],
    };

    assert_eq!(copilot::api::projection::effective_health_state(&stale_critical), HealthState::Happy);
}

/// Scenario E — guard rail: idle != max. Compiling with
/// `persistence.maxIdleConns` one below `persistence.maxConns` must
/// fail with the `max_idle_equals_max_conns` guard rail.
#[test]
fn scenario_e_guard_rail_idle_conns_must_equal_max_conns() {
    let compiler = ConfigCompiler::new(build_default_registry(), build_default_presets(), build_default_modifiers());

    let mut values = HashMap::new();
    values.insert("persistence.maxConns".to_string(), ParamValue::Int(20));
    values.insert("persistence.maxIdleConns".to_string(), ParamValue::Int(19));
    let overrides = ParameterOverrides { values };

    let err = compiler.compile("starter", None, &overrides).unwrap_err();
    match err {
        CompilationError::GuardRailsFailed(messages) => {
            assert!(messages.iter().any(|m| m.contains("max_idle_equals_max_conns")));
        }
        other => panic!("expected GuardRailsFailed, got {other:?}"),
    }
}

fn profile_with(id: Uuid, max_conns: i64, state_transitions_per_sec: f64) -> BehaviourProfile {
    let agg = |v: f64| MetricAggregate::from_samples(&[v, v, v]);
    let mut telemetry = minimal_telemetry();
    telemetry.throughput = ThroughputMetrics {
        workflows_started_per_sec: agg(100.0),
        workflows_completed_per_sec: agg(95.0),
        state_transitions_per_sec: agg(state_transitions_per_sec),
    };

    BehaviourProfile {
        id,
        name: "scenario-f".to_string(),
        label: None,
        cluster_id: "cluster-a".to_string(),
        namespace: Some("default".to_string()),
        task_queue: None,
        time_window_start: Utc::now() - chrono::Duration::hours(1),
        time_window_end: Utc::now(),
        temporal_server_version: None,
        dsql_plugin_version: None,
        worker_code_sha: None,
        config_snapshot: Some(ConfigSnapshot {
            dynamic_config: vec![DynamicConfigEntry {
                key: "target_state_transitions_per_sec".to_string(),
                value: serde_json::json!(max_conns),
            }],
            server_env_vars: vec![],
            worker_options: WorkerOptionsSnapshot::default(),
            dsql_plugin_config: DsqlPluginSnapshot {
                reservoir_enabled: false,
                reservoir_target_ready: 10,
                reservoir_base_lifetime_min: 11.0,
                reservoir_lifetime_jitter_min: 2.0,
                reservoir_guard_window_sec: 30.0,
                max_conns: 10,
                max_idle_conns: 10,
                max_conn_lifetime_min: 55.0,
                distributed_rate_limiter_enabled: false,
                token_bucket_enabled: false,
                token_bucket_rate: None,
                token_bucket_capacity: None,
                slot_block_enabled: false,
                slot_block_size: None,
                slot_block_count: None,
            },
            config_profile: None,
        }),
        telemetry,
        created_at: Utc::now(),
        is_baseline: false,
    }
}

fn minimal_telemetry() -> TelemetrySummary {
    use copilot::types::profile::{
        DsqlPoolMetrics, ErrorMetrics, LatencyMetrics, MatchingMetrics, ResourceMetrics, ServiceMetrics,
    };
    let agg = MetricAggregate::zero;
    TelemetrySummary {
        throughput: ThroughputMetrics {
            workflows_started_per_sec: agg(),
            workflows_completed_per_sec: agg(),
            state_transitions_per_sec: agg(),
        },
        latency: LatencyMetrics {
            workflow_schedule_to_start_p95: agg(),
            workflow_schedule_to_start_p99: agg(),
            activity_schedule_to_start_p95: agg(),
            activity_schedule_to_start_p99: agg(),
            persistence_latency_p95: agg(),
            persistence_latency_p99: agg(),
        },
        matching: MatchingMetrics {
            sync_match_rate: agg(),
            async_match_rate: agg(),
            task_dispatch_latency: agg(),
            backlog_count: agg(),
            backlog_age: agg(),
        },
        dsql_pool: DsqlPoolMetrics {
            pool_open_count: agg(),
            pool_in_use_count: agg(),
            pool_idle_count: agg(),
            reservoir_size: agg(),
            reservoir_empty_events: agg(),
            open_failures: agg(),
            reconnect_count: agg(),
        },
        errors: ErrorMetrics { occ_conflicts_per_sec: agg(), exhausted_retries_per_sec: agg(), dsql_auth_failures: agg() },
        resources: ResourceMetrics {
            cpu_utilization: ServiceMetrics { by_service: Default::default() },
            memory_utilization: ServiceMetrics { by_service: Default::default() },
            worker_task_slot_utilization: agg(),
        },
    }
}

/// Scenario F — drift correlation. Profile A -> B changes
/// `target_state_transitions_per_sec` and the current telemetry shows
/// `throughput.state_transitions_per_sec` regressed 50%. Expected: one
/// correlation linking the config key to the regressed metric.
#[test]
fn scenario_f_drift_correlation_links_config_change_to_regressed_metric() {
    let a = profile_with(Uuid::new_v4(), 1000, 100.0);
    let b = profile_with(Uuid::new_v4(), 500, 50.0);

    let comparison = compare_profiles(&a, &b, &ComparisonThresholds::default());
    let assessment = correlate_drift(&comparison);

    assert_eq!(assessment.correlations.len(), 1);
    let correlation = &assessment.correlations[0];
    assert_eq!(correlation.config_key, "target_state_transitions_per_sec");
    assert!(correlation.regressed_metrics.iter().any(|m| m == "throughput.state_transitions_per_sec"));
}

/// In-memory stand-in for [`BehaviourProfileStore`], mirroring the
/// Postgres implementation's "clear old baseline, set new one in one
/// step" contract without a live DSQL connection.
struct FakeProfileStore {
    profiles: Mutex<HashMap<Uuid, BehaviourProfile>>,
}

impl FakeProfileStore {
    fn new() -> Self {
        Self { profiles: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl BehaviourProfileStore for FakeProfileStore {
    async fn save(&self, profile: &BehaviourProfile) -> Result<(), ProfileStoreError> {
        self.profiles.lock().unwrap().insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<BehaviourProfile>, ProfileStoreError> {
        Ok(self.profiles.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, _filter: &ProfileListFilter) -> Result<Vec<BehaviourProfile>, ProfileStoreError> {
        Ok(self.profiles.lock().unwrap().values().cloned().collect())
    }

    async fn get_baseline(&self, cluster_id: &str, namespace: Option<&str>) -> Result<Option<BehaviourProfile>, ProfileStoreError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .find(|p| p.cluster_id == cluster_id && p.namespace.as_deref() == namespace && p.is_baseline)
            .cloned())
    }

    async fn designate_baseline(&self, profile_id: Uuid, cluster_id: &str, namespace: Option<&str>) -> Result<(), ProfileStoreError> {
        let mut profiles = self.profiles.lock().unwrap();
        if !profiles.contains_key(&profile_id) {
            return Err(ProfileStoreError::NotFound(profile_id));
        }
        for profile in profiles.values_mut() {
            if profile.cluster_id == cluster_id && profile.namespace.as_deref() == namespace {
                profile.is_baseline = profile.id == profile_id;
            }
        }
        Ok(())
    }
}

/// Scenario G — baseline uniqueness. Designating profile `X` as
/// baseline while profile `Y` is already baseline for the same
/// `(cluster, namespace)` clears `Y.is_baseline` and sets
/// `X.is_baseline`, atomically with respect to any caller reading
/// through the same store.
#[tokio::test]
async fn scenario_g_designating_new_baseline_clears_the_old_one() {
    let store = FakeProfileStore::new();

    let mut x = profile_with(Uuid::new_v4(), 10, 100.0);
    let mut y = profile_with(Uuid::new_v4(), 10, 100.0);
    y.is_baseline = true;
    x.is_baseline = false;

    store.save(&x).await.unwrap();
    store.save(&y).await.unwrap();
    store.designate_baseline(y.id, &y.cluster_id, y.namespace.as_deref()).await.unwrap();

    store.designate_baseline(x.id, &x.cluster_id, x.namespace.as_deref()).await.unwrap();

    let baseline = store.get_baseline(&x.cluster_id, x.namespace.as_deref()).await.unwrap().unwrap();
    assert_eq!(baseline.id, x.id);

    let old = store.get(y.id).await.unwrap().unwrap();
    assert!(!old.is_baseline);
}
