//! Workload-shape modifiers: a named set of parameter adjustments layered
//! on top of a scale preset's derived values, ported verbatim in shape from
//! the reference implementation's four named modifiers.

use super::model::{ParamValue::Bool as B, ParamValue::Int as I, ParamValue::Str as S, WorkloadModifier};
use std::collections::HashMap;

fn modifier(name: &str, description: &str, adjustments: Vec<(&str, super::model::ParamValue)>) -> WorkloadModifier {
    WorkloadModifier {
        name: name.to_string(),
        description: description.to_string(),
        adjustments: adjustments.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    }
}

pub fn build_default_modifiers() -> HashMap<String, WorkloadModifier> {
    let mut m = HashMap::new();

    m.insert(
        "simple-crud".to_string(),
        modifier(
            "simple-crud",
            "Short-lived workflows with 1-2 activities; optimised for low latency via eager execution",
            vec![
                ("system.enableActivityEagerExecution", B(true)),
                ("sdk.disable_eager_activities", B(false)),
                ("matching.numTaskqueueReadPartitions", I(4)),
                ("matching.numTaskqueueWritePartitions", I(4)),
                ("sdk.max_concurrent_activities", I(100)),
                ("sdk.max_concurrent_workflow_tasks", I(100)),
            ],
        ),
    );

    m.insert(
        "orchestrator".to_string(),
        modifier(
            "orchestrator",
            "Workflows that coordinate child workflows and multiple activity types; balanced dispatch",
            vec![
                ("matching.numTaskqueueReadPartitions", I(8)),
                ("matching.numTaskqueueWritePartitions", I(8)),
                ("sdk.max_concurrent_workflow_tasks", I(150)),
                ("sdk.max_concurrent_activities", I(150)),
                ("sdk.workflow_task_pollers", I(16)),
                ("sdk.activity_task_pollers", I(8)),
            ],
        ),
    );

    m.insert(
        "batch-processor".to_string(),
        modifier(
            "batch-processor",
            "High-volume activity processing with many parallel activities per workflow",
            vec![
                ("matching.numTaskqueueReadPartitions", I(16)),
                ("matching.numTaskqueueWritePartitions", I(16)),
                ("sdk.max_concurrent_activities", I(500)),
                ("sdk.max_concurrent_local_activities", I(500)),
                ("sdk.activity_task_pollers", I(16)),
                ("sdk.workflow_task_pollers", I(16)),
            ],
        ),
    );

    m.insert(
        "long-running".to_string(),
        modifier(
            "long-running",
            "Workflows that run for minutes to hours; optimised for sticky execution and state caching",
            vec![
                ("sdk.sticky_schedule_to_start_timeout", S("10s".into())),
                ("matching.numTaskqueueReadPartitions", I(4)),
                ("matching.numTaskqueueWritePartitions", I(4)),
                ("sdk.workflow_task_pollers", I(8)),
                ("sdk.activity_task_pollers", I(4)),
            ],
        ),
    );

    m
}
