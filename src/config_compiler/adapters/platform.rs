//! ECS platform adapter: renders a compiled profile into per-service
//! environment variable maps suitable for pasting into ECS task
//! definitions, grounded in the reference implementation's `ecs.py`.

use super::super::model::{ConfigProfile, RenderedSnippet};
use super::ConfigAdapter;

const DSQL_ENV_MAP: &[(&str, &str)] = &[
    ("persistence.maxConns", "TEMPORAL_SQL_MAX_CONNS"),
    ("persistence.maxIdleConns", "TEMPORAL_SQL_MAX_IDLE_CONNS"),
    ("dsql.max_conn_lifetime", "TEMPORAL_SQL_MAX_CONN_LIFETIME"),
    ("dsql.connection_timeout", "TEMPORAL_SQL_CONNECTION_TIMEOUT"),
    ("dsql.reservoir_enabled", "DSQL_RESERVOIR_ENABLED"),
    ("dsql.reservoir_target_ready", "DSQL_RESERVOIR_TARGET_READY"),
    ("dsql.reservoir_base_lifetime", "DSQL_RESERVOIR_BASE_LIFETIME"),
    ("dsql.reservoir_lifetime_jitter", "DSQL_RESERVOIR_LIFETIME_JITTER"),
    ("dsql.reservoir_guard_window", "DSQL_RESERVOIR_GUARD_WINDOW"),
    ("dsql.reservoir_inflight_limit", "DSQL_RESERVOIR_INFLIGHT_LIMIT"),
    ("dsql.connection_rate_limit", "DSQL_CONNECTION_RATE_LIMIT"),
    ("dsql.connection_burst_limit", "DSQL_CONNECTION_BURST_LIMIT"),
    ("dsql.distributed_rate_limiter_enabled", "DSQL_DISTRIBUTED_RATE_LIMITER_ENABLED"),
    ("dsql.distributed_rate_limiter_table", "DSQL_DISTRIBUTED_RATE_LIMITER_TABLE"),
    ("dsql.token_bucket_enabled", "DSQL_TOKEN_BUCKET_ENABLED"),
    ("dsql.token_bucket_rate", "DSQL_TOKEN_BUCKET_RATE"),
    ("dsql.token_bucket_capacity", "DSQL_TOKEN_BUCKET_CAPACITY"),
    ("dsql.slot_block_enabled", "DSQL_DISTRIBUTED_CONN_LEASE_ENABLED"),
    ("dsql.slot_block_size", "DSQL_SLOT_BLOCK_SIZE"),
    ("dsql.slot_block_count", "DSQL_SLOT_BLOCK_COUNT"),
];

/// Per-service dynamic config keys surfaced as service-scoped env entries,
/// in addition to each service's replica count.
const SERVICE_DYNAMIC_CONFIG: &[(&str, &[&str])] = &[
    (
        "history",
        &[
            "history.persistenceMaxQPS",
            "history.timerProcessorMaxPollRPS",
            "history.timerProcessorUpdateAckInterval",
        ],
    ),
    (
        "matching",
        &[
            "matching.persistenceMaxQPS",
            "matching.maxTaskBatchSize",
            "matching.getTasksBatchSize",
            "matching.longPollExpirationInterval",
            "matching.numTaskqueueReadPartitions",
            "matching.numTaskqueueWritePartitions",
        ],
    ),
    ("frontend", &["frontend.persistenceMaxQPS"]),
    ("worker", &[]),
];

pub struct EcsAdapter;

impl ConfigAdapter for EcsAdapter {
    fn name(&self) -> &str {
        "ecs"
    }

    fn render(&self, profile: &ConfigProfile) -> Vec<RenderedSnippet> {
        render(profile)
    }
}

fn env_entry(name: &str, value: &str) -> String {
    format!("  {{ \"name\": \"{name}\", \"value\": \"{value}\" }}")
}

fn render_shared_env(profile: &ConfigProfile) -> String {
    let mut entries = Vec::new();
    for (key, env_name) in DSQL_ENV_MAP {
        if let Some(p) = profile.get_param(key) {
            entries.push(env_entry(env_name, &p.value.to_string()));
        }
    }
    format!("[\n{}\n]\n", entries.join(",\n"))
}

fn render_service_env(profile: &ConfigProfile, service: &str, dynamic_keys: &[&str]) -> String {
    let mut entries = Vec::new();

    let replicas_key = format!("{service}.replicas");
    if let Some(p) = profile.get_param(&replicas_key) {
        entries.push(env_entry(
            &format!("TEMPORAL_{}_REPLICAS", service.to_uppercase()),
            &p.value.to_string(),
        ));
    }

    for key in dynamic_keys {
        if let Some(p) = profile.get_param(key) {
            let env_name = key.to_uppercase().replace('.', "_");
            entries.push(env_entry(&env_name, &p.value.to_string()));
        }
    }

    if entries.is_empty() {
        "[]\n".to_string()
    } else {
        format!("[\n{}\n]\n", entries.join(",\n"))
    }
}

pub fn render(profile: &ConfigProfile) -> Vec<RenderedSnippet> {
    let mut snippets = vec![RenderedSnippet {
        language: "json".into(),
        filename: "ecs-shared-env.json".into(),
        content: render_shared_env(profile),
    }];

    for (service, dynamic_keys) in SERVICE_DYNAMIC_CONFIG {
        snippets.push(RenderedSnippet {
            language: "json".into(),
            filename: format!("ecs-{service}-env.json"),
            content: render_service_env(profile, service, dynamic_keys),
        });
    }

    snippets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_compiler::compiler::ConfigCompiler;
    use crate::config_compiler::model::ParameterOverrides;
    use crate::config_compiler::modifiers::build_default_modifiers;
    use crate::config_compiler::presets::build_default_presets;
    use crate::config_compiler::registry::build_default_registry;

    fn compiled_starter() -> ConfigProfile {
        let compiler = ConfigCompiler::new(
            build_default_registry(),
            build_default_presets(),
            build_default_modifiers(),
        );
        compiler
            .resolve_profile("starter", None, &ParameterOverrides::default())
            .expect("starter should resolve")
    }

    #[test]
    fn renders_one_shared_snippet_and_one_per_service() {
        let profile = compiled_starter();
        let snippets = render(&profile);
        assert_eq!(snippets.len(), 5);
        assert_eq!(snippets[0].filename, "ecs-shared-env.json");
        assert!(snippets.iter().any(|s| s.filename == "ecs-worker-env.json"));
    }

    #[test]
    fn shared_env_carries_reservoir_flag() {
        let profile = compiled_starter();
        let shared = render_shared_env(&profile);
        assert!(shared.contains("DSQL_RESERVOIR_ENABLED"));
    }

    #[test]
    fn matching_service_env_includes_partition_counts() {
        let profile = compiled_starter();
        let matching = render_service_env(
            &profile,
            "matching",
            SERVICE_DYNAMIC_CONFIG
                .iter()
                .find(|(s, _)| *s == "matching")
                .map(|(_, k)| *k)
                .unwrap_or(&[]),
        );
        assert!(matching.contains("MATCHING_NUMTASKQUEUEREADPARTITIONS"));
        assert!(matching.contains("TEMPORAL_MATCHING_REPLICAS"));
    }

    #[test]
    fn worker_service_env_has_only_replicas() {
        let profile = compiled_starter();
        let worker = render_service_env(&profile, "worker", &[]);
        assert!(worker.contains("TEMPORAL_WORKER_REPLICAS"));
        assert!(!worker.contains("maxConns"));
    }
}
