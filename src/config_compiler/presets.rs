//! Scale presets: the primary input to the Config Compiler. An adopter picks
//! one preset and optionally layers a workload modifier and overrides on
//! top. `starter` mirrors the reference implementation's preset field for
//! field; `standard`/`scale`/`extreme` extrapolate the same parameter set
//! across the throughput axis (see DESIGN.md).

use super::model::{
    DerivationRule, Expr, PresetDefault, ScalePreset, TelemetryBound, ThroughputRange,
};
use std::collections::HashMap;

fn lit_int(v: i64) -> Expr {
    Expr::Int(v)
}
fn lit_bool(v: bool) -> Expr {
    Expr::Bool(v)
}
fn lit_str(v: &str) -> Expr {
    Expr::Str(v.to_string())
}
fn rule(key: &str, expr: Expr, depends_on: &[&str]) -> DerivationRule {
    DerivationRule {
        key: key.to_string(),
        expression: expr,
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}
fn default_(key: &str, value: super::model::ParamValue) -> PresetDefault {
    PresetDefault { key: key.to_string(), value }
}

struct Tier {
    reservoir: bool,
    distributed_limiter: bool,
    max_conns: i64,
    persistence_qps: i64,
    read_partitions: i64,
}

fn build_tier(
    name: &str,
    description: &str,
    min_st: f64,
    max_st: Option<f64>,
    range_desc: &str,
    shards: i64,
    replicas: i64,
    worker_replicas: i64,
    tier: Tier,
    expected_bounds: Option<Vec<TelemetryBound>>,
) -> ScalePreset {
    use super::model::ParamValue::{Bool as B, Int as I};

    let safety_derivations = vec![
        rule("persistence.maxConns", lit_int(tier.max_conns), &[]),
        rule("persistence.maxIdleConns", Expr::Ref("persistence.maxConns".into()), &["persistence.maxConns"]),
        rule("dsql.max_conn_lifetime", lit_str("55m"), &[]),
        rule("dsql.connection_timeout", lit_str("30s"), &[]),
        rule("dsql.reservoir_enabled", lit_bool(tier.reservoir), &[]),
        rule("dsql.reservoir_target_ready", lit_int(if tier.reservoir { tier.max_conns } else { 0 }), &[]),
        rule("dsql.reservoir_base_lifetime", lit_str("11m"), &[]),
        rule("dsql.reservoir_lifetime_jitter", lit_str(if tier.reservoir { "2m" } else { "0m" }), &[]),
        rule("dsql.reservoir_guard_window", lit_str("45s"), &[]),
        rule("dsql.reservoir_inflight_limit", lit_int(4), &[]),
        rule("dsql.connection_rate_limit", lit_int(10), &[]),
        rule("dsql.connection_burst_limit", lit_int(50), &[]),
        rule("dsql.distributed_rate_limiter_enabled", lit_bool(tier.distributed_limiter), &[]),
        rule(
            "dsql.distributed_rate_limiter_table",
            lit_str(if tier.distributed_limiter { "copilot-dsql-rate-limits" } else { "" }),
            &[],
        ),
        rule("dsql.token_bucket_enabled", lit_bool(false), &[]),
        rule("dsql.token_bucket_rate", lit_int(100), &[]),
        rule("dsql.token_bucket_capacity", lit_int(1000), &[]),
        rule("dsql.slot_block_enabled", lit_bool(false), &[]),
        rule("dsql.slot_block_size", lit_int(100), &[]),
        rule("dsql.slot_block_count", lit_int(100), &[]),
    ];

    let tuning_derivations = vec![
        rule("history.persistenceMaxQPS", lit_int(tier.persistence_qps), &[]),
        rule("matching.persistenceMaxQPS", lit_int(tier.persistence_qps), &[]),
        rule("frontend.persistenceMaxQPS", lit_int(tier.persistence_qps), &[]),
        rule("matching.maxTaskBatchSize", lit_int(100), &[]),
        rule("matching.getTasksBatchSize", lit_int(500), &[]),
        rule("matching.longPollExpirationInterval", lit_str("60s"), &[]),
        rule("history.timerProcessorMaxPollRPS", lit_int(10), &[]),
        rule("history.timerProcessorUpdateAckInterval", lit_str("30s"), &[]),
        rule("system.enableActivityEagerExecution", lit_bool(true), &[]),
        rule("sdk.max_concurrent_activities", lit_int(100), &[]),
        rule("sdk.max_concurrent_workflow_tasks", lit_int(100), &[]),
        rule("sdk.max_concurrent_local_activities", lit_int(100), &[]),
        rule("sdk.workflow_task_pollers", lit_int(4), &[]),
        rule("sdk.activity_task_pollers", lit_int(4), &[]),
        rule("sdk.sticky_schedule_to_start_timeout", lit_str("0s"), &[]),
        rule("sdk.disable_eager_activities", lit_bool(false), &[]),
    ];

    ScalePreset {
        name: name.to_string(),
        description: description.to_string(),
        throughput_range: ThroughputRange {
            min_st_per_sec: min_st,
            max_st_per_sec: max_st,
            description: range_desc.to_string(),
        },
        slo_defaults: vec![
            default_("target_state_transitions_per_sec", I(min_st as i64 + 1)),
            default_("target_workflow_completion_rate", I(min_st as i64 + 1)),
            default_("max_schedule_to_start_latency_ms", I(500)),
            default_("max_e2e_workflow_latency_ms", I(1000)),
        ],
        topology_defaults: vec![
            default_("history.shards", I(shards)),
            default_("history.replicas", I(replicas)),
            default_("matching.replicas", I(replicas)),
            default_("frontend.replicas", I(replicas)),
            default_("worker.replicas", I(worker_replicas)),
            default_("matching.numTaskqueueReadPartitions", I(tier.read_partitions)),
            default_("matching.numTaskqueueWritePartitions", I(tier.read_partitions)),
            default_("sdk.worker_count", I(worker_replicas)),
        ],
        safety_derivations,
        tuning_derivations,
        expected_bounds,
    }
}

pub fn build_default_presets() -> HashMap<String, ScalePreset> {
    let mut presets = HashMap::new();

    let starter = build_tier(
        "starter",
        "Low-throughput deployment for development, testing, or light production workloads",
        0.0,
        Some(50.0),
        "Under 50 state transitions per second",
        512,
        2,
        1,
        Tier { reservoir: false, distributed_limiter: false, max_conns: 10, persistence_qps: 1000, read_partitions: 4 },
        None,
    );

    let standard = build_tier(
        "standard",
        "Mid-throughput production deployment with moderate connection pooling",
        50.0,
        Some(500.0),
        "50 to 500 state transitions per second",
        1024,
        3,
        3,
        Tier { reservoir: false, distributed_limiter: false, max_conns: 25, persistence_qps: 3000, read_partitions: 8 },
        Some(vec![
            TelemetryBound { metric: "throughput.state_transitions_per_sec".into(), lower: 50.0, upper: 500.0 },
            TelemetryBound { metric: "latency.workflow_schedule_to_start_p99".into(), lower: 0.0, upper: 500.0 },
        ]),
    );

    let scale = build_tier(
        "scale",
        "High-throughput deployment requiring a pre-warmed connection reservoir",
        500.0,
        Some(5000.0),
        "500 to 5000 state transitions per second",
        4096,
        6,
        8,
        Tier { reservoir: true, distributed_limiter: false, max_conns: 50, persistence_qps: 8000, read_partitions: 16 },
        Some(vec![
            TelemetryBound { metric: "throughput.state_transitions_per_sec".into(), lower: 500.0, upper: 5000.0 },
            TelemetryBound { metric: "latency.workflow_schedule_to_start_p99".into(), lower: 0.0, upper: 500.0 },
        ]),
    );

    let extreme = build_tier(
        "extreme",
        "Very high-throughput deployment requiring cluster-wide distributed rate limiting",
        5000.0,
        None,
        "Above 5000 state transitions per second",
        8192,
        12,
        20,
        Tier { reservoir: true, distributed_limiter: true, max_conns: 80, persistence_qps: 20000, read_partitions: 32 },
        Some(vec![
            TelemetryBound { metric: "throughput.state_transitions_per_sec".into(), lower: 5000.0, upper: 1_000_000.0 },
            TelemetryBound { metric: "latency.workflow_schedule_to_start_p99".into(), lower: 0.0, upper: 500.0 },
        ]),
    );

    for p in [starter, standard, scale, extreme] {
        presets.insert(p.name.clone(), p);
    }
    presets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_has_matching_read_write_partitions() {
        for (_, p) in build_default_presets() {
            let read = p.topology_defaults.iter().find(|d| d.key == "matching.numTaskqueueReadPartitions").unwrap();
            let write = p.topology_defaults.iter().find(|d| d.key == "matching.numTaskqueueWritePartitions").unwrap();
            assert_eq!(read.value, write.value);
        }
    }

    #[test]
    fn scale_and_extreme_enable_reservoir_with_nonzero_jitter() {
        let presets = build_default_presets();
        for name in ["scale", "extreme"] {
            let p = &presets[name];
            let jitter = p.safety_derivations.iter().find(|r| r.key == "dsql.reservoir_lifetime_jitter").unwrap();
            assert_ne!(jitter.expression, Expr::Str("0m".into()));
        }
    }
}
