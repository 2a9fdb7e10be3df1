//! The parameter registry: one entry per tunable, each classified into
//! exactly one of SLO / Topology / Safety / Tuning. Built once at process
//! start and wrapped in `ArcSwap` so a registry reload never requires a
//! restart, mirroring the teacher's hot-reloadable config pointer.

use super::model::{
    OutputTarget, ParameterClassification, ParameterConstraints, ParameterEntry, ParameterUnit,
    ParameterValueType,
};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("parameter '{0}' is already registered")]
    DuplicateKey(String),
}

#[derive(Debug, Default)]
pub struct ParameterRegistry {
    entries: HashMap<String, ParameterEntry>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: ParameterEntry) -> Result<(), RegistryError> {
        if self.entries.contains_key(&entry.key) {
            return Err(RegistryError::DuplicateKey(entry.key));
        }
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ParameterEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn entry(
    key: &str,
    classification: ParameterClassification,
    description: &str,
    rationale: &str,
    default_value: super::model::ParamValue,
    value_type: ParameterValueType,
    unit: Option<ParameterUnit>,
    constraints: Option<ParameterConstraints>,
    output_targets: &[OutputTarget],
) -> ParameterEntry {
    ParameterEntry {
        key: key.to_string(),
        classification,
        description: description.to_string(),
        rationale: rationale.to_string(),
        default_value,
        value_type,
        unit,
        constraints,
        output_targets: output_targets.to_vec(),
    }
}

/// Builds the default registry of every parameter the presets, modifiers,
/// and guard rails in this crate reference. Panics (at process start, via
/// the caller) if a key is accidentally registered twice — a programming
/// bug, not a runtime condition.
pub fn build_default_registry() -> ParameterRegistry {
    let mut r = ParameterRegistry::new();
    let mut add = |e: ParameterEntry| {
        r.register(e).expect("duplicate key in built-in parameter registry");
    };
    use super::model::ParamValue::{Bool as B, Int as I, Str as S};
    use OutputTarget::{DsqlPlugin, DynamicConfig, EnvVars, WorkerOptions};
    use ParameterClassification::{Safety, Slo, Topology, Tuning};
    use ParameterValueType as VT;

    // SLO
    add(entry("target_state_transitions_per_sec", Slo, "Target sustained state-transition throughput", "Primary sizing input for every derived topology and safety parameter", I(25), VT::Int, Some(ParameterUnit::PerSec), None, &[]));
    add(entry("target_workflow_completion_rate", Slo, "Target sustained workflow completion throughput", "Secondary sizing input alongside state transitions", I(25), VT::Int, Some(ParameterUnit::PerSec), None, &[]));
    add(entry("max_schedule_to_start_latency_ms", Slo, "Acceptable worst-case schedule-to-start latency", "Bounds how aggressively workers must poll", I(500), VT::Int, Some(ParameterUnit::Milliseconds), None, &[]));
    add(entry("max_e2e_workflow_latency_ms", Slo, "Acceptable worst-case end-to-end workflow latency", "Drives the sticky-cache guard rail", I(1000), VT::Int, Some(ParameterUnit::Milliseconds), None, &[]));

    // Topology
    add(entry("history.shards", Topology, "Number of history shards", "Determines parallelism ceiling for workflow state", I(512), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("history.replicas", Topology, "History service replica count", "Scales with shard count and throughput", I(2), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("matching.replicas", Topology, "Matching service replica count", "Scales with task dispatch throughput", I(2), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("frontend.replicas", Topology, "Frontend service replica count", "Scales with client request rate", I(2), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("worker.replicas", Topology, "SDK worker process replica count", "Scales with activity/workflow task volume", I(1), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("matching.numTaskqueueReadPartitions", Topology, "Task queue read partition count", "Bounds dispatch parallelism per task queue", I(4), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("matching.numTaskqueueWritePartitions", Topology, "Task queue write partition count", "Must track read partitions for correct dispatch", I(4), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("sdk.worker_count", Topology, "Number of SDK worker processes to run", "Matches worker.replicas for capacity planning", I(2), VT::Int, Some(ParameterUnit::Count), None, &[WorkerOptions]));

    // Safety
    add(entry("persistence.maxConns", Safety, "Max persistence connections per instance", "Cluster connection ceiling input for the guard rails", I(10), VT::Int, Some(ParameterUnit::Connections), Some(ParameterConstraints { min_value: Some(1.0), max_value: None, allowed_values: None }), &[DynamicConfig]));
    add(entry("persistence.maxIdleConns", Safety, "Max idle persistence connections per instance", "Must equal maxConns or Go's database/sql prunes idle conns under load", I(10), VT::Int, Some(ParameterUnit::Connections), None, &[DynamicConfig]));
    add(entry("dsql.max_conn_lifetime", Safety, "Max DSQL connection lifetime", "Forces periodic rotation ahead of DSQL's own connection limits", S("55m".into()), VT::Duration, Some(ParameterUnit::Minutes), None, &[DsqlPlugin]));
    add(entry("dsql.connection_timeout", Safety, "DSQL connection establishment timeout", "Bounds how long a stalled connect attempt blocks a pool slot", S("30s".into()), VT::Duration, Some(ParameterUnit::Seconds), None, &[DsqlPlugin]));
    add(entry("dsql.reservoir_enabled", Safety, "Enable the pre-warmed connection reservoir", "Trades idle connection cost for lower connect-latency variance", B(false), VT::Bool, None, None, &[DsqlPlugin]));
    add(entry("dsql.reservoir_target_ready", Safety, "Target number of ready reservoir connections", "Must be positive whenever the reservoir is enabled", I(10), VT::Int, Some(ParameterUnit::Connections), None, &[DsqlPlugin]));
    add(entry("dsql.reservoir_base_lifetime", Safety, "Base reservoir connection lifetime before rotation", "Paired with jitter to avoid synchronized expiry", S("11m".into()), VT::Duration, Some(ParameterUnit::Minutes), None, &[DsqlPlugin]));
    add(entry("dsql.reservoir_lifetime_jitter", Safety, "Random jitter applied to reservoir connection lifetime", "Zero jitter risks a thundering herd of simultaneous reconnects", S("2m".into()), VT::Duration, Some(ParameterUnit::Minutes), None, &[DsqlPlugin]));
    add(entry("dsql.reservoir_guard_window", Safety, "Window before expiry during which a reservoir conn is replaced early", "Keeps the reservoir from dipping below target during rotation", S("45s".into()), VT::Duration, Some(ParameterUnit::Seconds), None, &[DsqlPlugin]));
    add(entry("dsql.reservoir_inflight_limit", Safety, "Max in-flight reservoir connection requests", "Caps burst reconnect load on DSQL", I(4), VT::Int, Some(ParameterUnit::Count), None, &[DsqlPlugin]));
    add(entry("dsql.connection_rate_limit", Safety, "Sustained new-connection rate limit", "Stays under DSQL's own connect rate ceiling", I(10), VT::Int, Some(ParameterUnit::PerSec), None, &[DsqlPlugin]));
    add(entry("dsql.connection_burst_limit", Safety, "Burst new-connection limit", "Allows short bursts above the sustained rate without tripping DSQL", I(50), VT::Int, Some(ParameterUnit::Count), None, &[DsqlPlugin]));
    add(entry("dsql.distributed_rate_limiter_enabled", Safety, "Enable the cross-instance distributed rate limiter", "Required once connection limiting must hold across replicas", B(false), VT::Bool, None, None, &[DsqlPlugin]));
    add(entry("dsql.distributed_rate_limiter_table", Safety, "Backing table name for the distributed rate limiter", "Required whenever the distributed limiter is enabled", S(String::new()), VT::Str, None, None, &[DsqlPlugin]));
    add(entry("dsql.token_bucket_enabled", Safety, "Enable local token-bucket rate limiting", "Cheaper fallback to the distributed limiter for single-instance deployments", B(false), VT::Bool, None, None, &[DsqlPlugin]));
    add(entry("dsql.token_bucket_rate", Safety, "Token bucket refill rate", "Paired with capacity to bound burst size", I(100), VT::Int, Some(ParameterUnit::PerSec), None, &[DsqlPlugin]));
    add(entry("dsql.token_bucket_capacity", Safety, "Token bucket capacity", "Paired with rate to bound burst size", I(1000), VT::Int, Some(ParameterUnit::Count), None, &[DsqlPlugin]));
    add(entry("dsql.slot_block_enabled", Safety, "Enable slot-block connection allocation", "Alternate allocation strategy for high-connection-churn workloads", B(false), VT::Bool, None, None, &[DsqlPlugin]));
    add(entry("dsql.slot_block_size", Safety, "Slot block size", "Sizes each allocation unit when slot-block mode is enabled", I(100), VT::Int, Some(ParameterUnit::Count), None, &[DsqlPlugin]));
    add(entry("dsql.slot_block_count", Safety, "Slot block count", "Number of allocation units when slot-block mode is enabled", I(100), VT::Int, Some(ParameterUnit::Count), None, &[DsqlPlugin]));

    // Tuning
    add(entry("history.persistenceMaxQPS", Tuning, "History service persistence QPS ceiling", "Protects DSQL from a runaway history service", I(1000), VT::Int, Some(ParameterUnit::PerSec), None, &[DynamicConfig]));
    add(entry("matching.persistenceMaxQPS", Tuning, "Matching service persistence QPS ceiling", "Protects DSQL from a runaway matching service", I(1000), VT::Int, Some(ParameterUnit::PerSec), None, &[DynamicConfig]));
    add(entry("frontend.persistenceMaxQPS", Tuning, "Frontend service persistence QPS ceiling", "Protects DSQL from a runaway frontend service", I(1000), VT::Int, Some(ParameterUnit::PerSec), None, &[DynamicConfig]));
    add(entry("matching.maxTaskBatchSize", Tuning, "Max tasks fetched per matching batch", "Trades dispatch latency for persistence efficiency", I(100), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("matching.getTasksBatchSize", Tuning, "Max tasks returned per GetTasks call", "Bounds matching-to-history round trip size", I(500), VT::Int, Some(ParameterUnit::Count), None, &[DynamicConfig]));
    add(entry("matching.longPollExpirationInterval", Tuning, "Matching long-poll expiration interval", "Bounds how long an idle poller holds a connection open", S("60s".into()), VT::Duration, Some(ParameterUnit::Seconds), None, &[DynamicConfig]));
    add(entry("history.timerProcessorMaxPollRPS", Tuning, "History timer processor poll rate ceiling", "Limits timer-queue processing pressure on persistence", I(10), VT::Int, Some(ParameterUnit::PerSec), None, &[DynamicConfig]));
    add(entry("history.timerProcessorUpdateAckInterval", Tuning, "History timer processor ack-update interval", "Trades checkpoint overhead for replay distance on restart", S("30s".into()), VT::Duration, Some(ParameterUnit::Seconds), None, &[DynamicConfig]));
    add(entry("system.enableActivityEagerExecution", Tuning, "Enable eager activity execution", "Skips a matching round trip for activities scheduled from the same worker", B(true), VT::Bool, None, None, &[DynamicConfig]));
    add(entry("sdk.max_concurrent_activities", Tuning, "Max concurrent activity executions per worker", "Primary worker-side capacity knob", I(100), VT::Int, Some(ParameterUnit::Count), None, &[WorkerOptions]));
    add(entry("sdk.max_concurrent_workflow_tasks", Tuning, "Max concurrent workflow task executions per worker", "Bounds workflow-side worker capacity", I(100), VT::Int, Some(ParameterUnit::Count), None, &[WorkerOptions]));
    add(entry("sdk.max_concurrent_local_activities", Tuning, "Max concurrent local activity executions per worker", "Bounds in-process local-activity capacity", I(100), VT::Int, Some(ParameterUnit::Count), None, &[WorkerOptions]));
    add(entry("sdk.workflow_task_pollers", Tuning, "Workflow task poller count per worker", "Matched against worker.replicas to avoid poller/executor mismatch", I(4), VT::Int, Some(ParameterUnit::Count), None, &[WorkerOptions]));
    add(entry("sdk.activity_task_pollers", Tuning, "Activity task poller count per worker", "Matched against worker.replicas to avoid poller/executor mismatch", I(4), VT::Int, Some(ParameterUnit::Count), None, &[WorkerOptions]));
    add(entry("sdk.sticky_schedule_to_start_timeout", Tuning, "Sticky execution schedule-to-start timeout", "Zero-benefit when e2e latency is already sub-2s, see guard rail", S("0s".into()), VT::Duration, Some(ParameterUnit::Seconds), None, &[WorkerOptions]));
    add(entry("sdk.disable_eager_activities", Tuning, "Disable eager activity execution on the SDK side", "Must track system.enableActivityEagerExecution", B(true), VT::Bool, None, None, &[WorkerOptions, EnvVars]));

    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_has_exactly_one_classification() {
        let r = build_default_registry();
        assert!(r.len() > 30);
        for key in r.keys() {
            let e = r.get(key).expect("just listed");
            // A ParameterClassification is a Rust enum with four variants and
            // no "multi" variant, so this is really just asserting the entry
            // resolved at all -- the strict partition is enforced by the type.
            let _ = e.classification;
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut r = ParameterRegistry::new();
        let e = entry("k", ParameterClassification::Tuning, "d", "r", super::super::model::ParamValue::Int(1), ParameterValueType::Int, None, None, &[]);
        r.register(e.clone()).unwrap();
        assert!(r.register(e).is_err());
    }
}
