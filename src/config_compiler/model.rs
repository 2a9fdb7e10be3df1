//! Shared data model for the Config Compiler: parameter values, the
//! registry entry shape, scale presets, and the artifacts `compile()`
//! produces.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterClassification {
    Slo,
    Topology,
    Safety,
    Tuning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterValueType {
    Int,
    Float,
    Str,
    Duration,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterUnit {
    PerSec,
    Milliseconds,
    Seconds,
    Minutes,
    Connections,
    Count,
    Percent,
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    DynamicConfig,
    EnvVars,
    WorkerOptions,
    DsqlPlugin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterConstraints {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub allowed_values: Option<Vec<ParamValue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub key: String,
    pub classification: ParameterClassification,
    pub description: String,
    pub rationale: String,
    pub default_value: ParamValue,
    pub value_type: ParameterValueType,
    pub unit: Option<ParameterUnit>,
    pub constraints: Option<ParameterConstraints>,
    pub output_targets: Vec<OutputTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    Preset,
    Modifier,
    Override,
    Derived,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedParameter {
    pub key: String,
    pub value: ParamValue,
    pub classification: ParameterClassification,
    pub source: ParamSource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterOverrides {
    pub values: HashMap<String, ParamValue>,
}

/// The compile-time expression language for derivation rules: a literal, or
/// a bare reference to an already-resolved parameter in the same
/// compilation context. Deliberately nothing richer — see the module doc
/// in `compiler.rs` for why this must never grow arithmetic or control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Ref(String),
}

#[derive(Debug, Clone)]
pub struct DerivationRule {
    pub key: String,
    pub expression: Expr,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PresetDefault {
    pub key: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputRange {
    pub min_st_per_sec: f64,
    pub max_st_per_sec: Option<f64>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryBound {
    pub metric: String,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone)]
pub struct ScalePreset {
    pub name: String,
    pub description: String,
    pub throughput_range: ThroughputRange,
    pub slo_defaults: Vec<PresetDefault>,
    pub topology_defaults: Vec<PresetDefault>,
    pub safety_derivations: Vec<DerivationRule>,
    pub tuning_derivations: Vec<DerivationRule>,
    pub expected_bounds: Option<Vec<TelemetryBound>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetSummary {
    pub name: String,
    pub description: String,
    pub throughput_range: ThroughputRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetDescription {
    pub name: String,
    pub description: String,
    pub throughput_range: ThroughputRange,
    pub slo_params: Vec<ResolvedParameter>,
    pub topology_params: Vec<ResolvedParameter>,
    pub safety_params: Vec<ResolvedParameter>,
    pub tuning_params: Vec<ResolvedParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigProfile {
    pub preset_name: String,
    pub modifier: Option<String>,
    pub overrides: ParameterOverrides,
    pub slo_params: Vec<ResolvedParameter>,
    pub topology_params: Vec<ResolvedParameter>,
    pub safety_params: Vec<ResolvedParameter>,
    pub tuning_params: Vec<ResolvedParameter>,
    pub temporal_server_version: String,
    pub dsql_plugin_version: String,
    pub compiled_at: chrono::DateTime<chrono::Utc>,
    pub compiler_version: String,
}

impl ConfigProfile {
    pub fn get_param(&self, key: &str) -> Option<&ResolvedParameter> {
        self.slo_params
            .iter()
            .chain(self.topology_params.iter())
            .chain(self.safety_params.iter())
            .chain(self.tuning_params.iter())
            .find(|p| p.key == key)
    }

    pub fn all_params(&self) -> Vec<&ResolvedParameter> {
        self.slo_params
            .iter()
            .chain(self.topology_params.iter())
            .chain(self.safety_params.iter())
            .chain(self.tuning_params.iter())
            .collect()
    }

    pub fn params_by_classification(&self, c: ParameterClassification) -> &[ResolvedParameter] {
        match c {
            ParameterClassification::Slo => &self.slo_params,
            ParameterClassification::Topology => &self.topology_params,
            ParameterClassification::Safety => &self.safety_params,
            ParameterClassification::Tuning => &self.tuning_params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationTrace {
    pub parameter_key: String,
    pub source: ParamSource,
    pub base_value: ParamValue,
    pub final_value: ParamValue,
    pub derivation_chain: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsqlPluginConfig {
    pub reservoir_enabled: bool,
    pub reservoir_target_ready: i64,
    pub reservoir_base_lifetime: String,
    pub reservoir_lifetime_jitter: String,
    pub reservoir_guard_window: String,
    pub reservoir_inflight_limit: i64,
    pub max_conns: i64,
    pub max_idle_conns: i64,
    pub max_conn_lifetime: String,
    pub connection_rate_limit: i64,
    pub connection_burst_limit: i64,
    pub distributed_rate_limiter_enabled: bool,
    pub distributed_rate_limiter_table: Option<String>,
    pub token_bucket_enabled: bool,
    pub token_bucket_rate: Option<i64>,
    pub token_bucket_capacity: Option<i64>,
    pub slot_block_enabled: bool,
    pub slot_block_size: Option<i64>,
    pub slot_block_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedSnippet {
    pub language: String,
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardRailSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardRailResult {
    pub rule_name: String,
    pub severity: GuardRailSeverity,
    pub message: String,
    pub parameter_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationResult {
    pub profile: ConfigProfile,
    pub dynamic_config_yaml: String,
    pub dsql_plugin_config: DsqlPluginConfig,
    pub sdk_snippets: Vec<RenderedSnippet>,
    pub platform_snippets: Vec<RenderedSnippet>,
    pub guard_rail_results: Vec<GuardRailResult>,
    pub trace: Vec<CompilationTrace>,
    pub why_section: String,
}

#[derive(Debug, Clone)]
pub struct WorkloadModifier {
    pub name: String,
    pub description: String,
    pub adjustments: HashMap<String, ParamValue>,
}
