//! Go SDK adapter: renders a compiled profile's `sdk.*` parameters into a
//! `worker.Options` literal an operator can paste directly into a worker
//! binary.

use super::super::model::{ConfigProfile, RenderedSnippet};
use super::ConfigAdapter;

pub struct GoSdkAdapter;

impl ConfigAdapter for GoSdkAdapter {
    fn name(&self) -> &str {
        "go"
    }

    fn render(&self, profile: &ConfigProfile) -> Vec<RenderedSnippet> {
        render(profile)
    }
}

pub fn render(profile: &ConfigProfile) -> Vec<RenderedSnippet> {
    let get_i = |k: &str| profile.get_param(k).and_then(|p| p.value.as_f64()).unwrap_or(0.0) as i64;
    let sticky = profile
        .get_param("sdk.sticky_schedule_to_start_timeout")
        .map(|p| p.value.to_string())
        .unwrap_or_else(|| "0s".into());
    let eager = profile
        .get_param("sdk.disable_eager_activities")
        .and_then(|p| p.value.as_bool())
        .unwrap_or(false);

    let content = format!(
        "// generated from preset '{preset}'{modifier}\nworker.Options{{\n\tMaxConcurrentActivityExecutionSize:     {max_act},\n\tMaxConcurrentWorkflowTaskExecutionSize: {max_wf},\n\tMaxConcurrentLocalActivityExecutionSize: {max_local},\n\tMaxConcurrentActivityTaskPollers:        {act_pollers},\n\tMaxConcurrentWorkflowTaskPollers:        {wf_pollers},\n\tStickyScheduleToStartTimeout:            {sticky},\n\tDisableEagerActivities:                  {eager},\n}}\n",
        preset = profile.preset_name,
        modifier = profile.modifier.as_deref().map(|m| format!(" + modifier '{m}'")).unwrap_or_default(),
        max_act = get_i("sdk.max_concurrent_activities"),
        max_wf = get_i("sdk.max_concurrent_workflow_tasks"),
        max_local = get_i("sdk.max_concurrent_local_activities"),
        act_pollers = get_i("sdk.activity_task_pollers"),
        wf_pollers = get_i("sdk.workflow_task_pollers"),
        sticky = sticky,
        eager = eager,
    );

    vec![RenderedSnippet {
        language: "go".into(),
        filename: "worker_options.go".into(),
        content,
    }]
}
