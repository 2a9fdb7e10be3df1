//! The compilation pipeline: resolve SLO -> resolve Topology -> resolve
//! Safety -> resolve Tuning -> guard rails -> emit artifacts. Guard rails
//! never short-circuit the pipeline: every rail runs and every error
//! accumulates before `compile()` decides whether to halt.

use super::guard_rails::GuardRailEngine;
use super::model::{
    CompilationResult, CompilationTrace, ConfigProfile, DsqlPluginConfig, Expr, GuardRailSeverity,
    ParamSource, ParamValue, ParameterOverrides, PresetDescription, PresetSummary,
    ResolvedParameter, ScalePreset, WorkloadModifier,
};
use super::registry::ParameterRegistry;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum CompilationError {
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("unknown parameter key '{0}'")]
    UnknownParameter(String),
    #[error("override for '{key}' violates constraints: {reason}")]
    ConstraintViolation { key: String, reason: String },
    #[error("compilation failed with {} error(s): {}", .0.len(), .0.join("; "))]
    GuardRailsFailed(Vec<String>),
}

pub struct ConfigCompiler {
    registry: ParameterRegistry,
    presets: HashMap<String, ScalePreset>,
    modifiers: HashMap<String, WorkloadModifier>,
    temporal_server_version: String,
    dsql_plugin_version: String,
    compiler_version: String,
}

impl ConfigCompiler {
    pub fn new(
        registry: ParameterRegistry,
        presets: HashMap<String, ScalePreset>,
        modifiers: HashMap<String, WorkloadModifier>,
    ) -> Self {
        Self {
            registry,
            presets,
            modifiers,
            temporal_server_version: "1.26.2".into(),
            dsql_plugin_version: "1.26.2".into(),
            compiler_version: "0.1.0".into(),
        }
    }

    pub(crate) fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn list_presets(&self) -> Vec<PresetSummary> {
        let mut out: Vec<PresetSummary> = self
            .presets
            .values()
            .map(|p| PresetSummary {
                name: p.name.clone(),
                description: p.description.clone(),
                throughput_range: p.throughput_range.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn describe_preset(&self, name: &str) -> Result<PresetDescription, CompilationError> {
        let profile = self.resolve_profile(name, None, &ParameterOverrides::default())?;
        let preset = self.presets.get(name).ok_or_else(|| CompilationError::UnknownPreset(name.to_string()))?;
        Ok(PresetDescription {
            name: preset.name.clone(),
            description: preset.description.clone(),
            throughput_range: preset.throughput_range.clone(),
            slo_params: profile.slo_params,
            topology_params: profile.topology_params,
            safety_params: profile.safety_params,
            tuning_params: profile.tuning_params,
        })
    }

    fn resolve_expr(expr: &Expr, ctx: &HashMap<String, ParamValue>) -> Result<ParamValue, CompilationError> {
        match expr {
            Expr::Int(v) => Ok(ParamValue::Int(*v)),
            Expr::Float(v) => Ok(ParamValue::Float(*v)),
            Expr::Bool(v) => Ok(ParamValue::Bool(*v)),
            Expr::Str(v) => Ok(ParamValue::Str(v.clone())),
            Expr::Ref(name) => ctx
                .get(name)
                .cloned()
                .ok_or_else(|| CompilationError::UnknownParameter(name.clone())),
        }
    }

    /// Resolves a single parameter's value and provenance, preferring an
    /// adopter override, then a workload modifier adjustment, then the
    /// preset/derived base value -- in that fixed order, for every
    /// parameter in every classification.
    fn pick(
        key: &str,
        base: ParamValue,
        base_source: ParamSource,
        overrides: &ParameterOverrides,
        modifier: Option<&WorkloadModifier>,
    ) -> (ParamValue, ParamSource) {
        if let Some(v) = overrides.values.get(key) {
            return (v.clone(), ParamSource::Override);
        }
        if let Some(m) = modifier {
            if let Some(v) = m.adjustments.get(key) {
                return (v.clone(), ParamSource::Modifier);
            }
        }
        (base, base_source)
    }

    pub fn resolve_profile(
        &self,
        preset_name: &str,
        modifier_name: Option<&str>,
        overrides: &ParameterOverrides,
    ) -> Result<ConfigProfile, CompilationError> {
        let preset = self
            .presets
            .get(preset_name)
            .ok_or_else(|| CompilationError::UnknownPreset(preset_name.to_string()))?;

        let modifier = match modifier_name {
            Some(name) => Some(
                self.modifiers
                    .get(name)
                    .ok_or_else(|| CompilationError::UnknownModifier(name.to_string()))?,
            ),
            None => None,
        };

        for key in overrides.values.keys() {
            let entry = self
                .registry
                .get(key)
                .ok_or_else(|| CompilationError::UnknownParameter(key.clone()))?;
            if let (Some(constraints), Some(v)) = (&entry.constraints, overrides.values.get(key).and_then(ParamValue::as_f64)) {
                if let Some(min) = constraints.min_value {
                    if v < min {
                        return Err(CompilationError::ConstraintViolation {
                            key: key.clone(),
                            reason: format!("{v} is below minimum {min}"),
                        });
                    }
                }
                if let Some(max) = constraints.max_value {
                    if v > max {
                        return Err(CompilationError::ConstraintViolation {
                            key: key.clone(),
                            reason: format!("{v} exceeds maximum {max}"),
                        });
                    }
                }
            }
        }

        let mut ctx: HashMap<String, ParamValue> = HashMap::new();
        let mut slo_params = Vec::new();
        let mut topology_params = Vec::new();
        let mut safety_params = Vec::new();
        let mut tuning_params = Vec::new();

        for d in &preset.slo_defaults {
            let entry = self.registry.get(&d.key);
            let classification = entry.map(|e| e.classification).unwrap_or(super::model::ParameterClassification::Slo);
            let (value, source) = Self::pick(&d.key, d.value.clone(), ParamSource::Preset, overrides, modifier);
            ctx.insert(d.key.clone(), value.clone());
            slo_params.push(ResolvedParameter { key: d.key.clone(), value, classification, source });
        }

        for d in &preset.topology_defaults {
            let entry = self.registry.get(&d.key);
            let classification = entry.map(|e| e.classification).unwrap_or(super::model::ParameterClassification::Topology);
            let (value, source) = Self::pick(&d.key, d.value.clone(), ParamSource::Preset, overrides, modifier);
            ctx.insert(d.key.clone(), value.clone());
            topology_params.push(ResolvedParameter { key: d.key.clone(), value, classification, source });
        }

        for r in &preset.safety_derivations {
            let base = Self::resolve_expr(&r.expression, &ctx)?;
            let entry = self.registry.get(&r.key);
            let classification = entry.map(|e| e.classification).unwrap_or(super::model::ParameterClassification::Safety);
            let (value, source) = Self::pick(&r.key, base, ParamSource::Derived, overrides, modifier);
            ctx.insert(r.key.clone(), value.clone());
            safety_params.push(ResolvedParameter { key: r.key.clone(), value, classification, source });
        }

        for r in &preset.tuning_derivations {
            let base = Self::resolve_expr(&r.expression, &ctx)?;
            let entry = self.registry.get(&r.key);
            let classification = entry.map(|e| e.classification).unwrap_or(super::model::ParameterClassification::Tuning);
            let (value, source) = Self::pick(&r.key, base, ParamSource::Derived, overrides, modifier);
            ctx.insert(r.key.clone(), value.clone());
            tuning_params.push(ResolvedParameter { key: r.key.clone(), value, classification, source });
        }

        Ok(ConfigProfile {
            preset_name: preset_name.to_string(),
            modifier: modifier_name.map(str::to_string),
            overrides: overrides.clone(),
            slo_params,
            topology_params,
            safety_params,
            tuning_params,
            temporal_server_version: self.temporal_server_version.clone(),
            dsql_plugin_version: self.dsql_plugin_version.clone(),
            compiled_at: chrono::Utc::now(),
            compiler_version: self.compiler_version.clone(),
        })
    }

    pub fn compile(
        &self,
        preset_name: &str,
        modifier_name: Option<&str>,
        overrides: &ParameterOverrides,
    ) -> Result<CompilationResult, CompilationError> {
        let profile = self.resolve_profile(preset_name, modifier_name, overrides)?;
        let guard_rail_results = GuardRailEngine::evaluate(&profile);

        let errors: Vec<String> = guard_rail_results
            .iter()
            .filter(|r| r.severity == GuardRailSeverity::Error)
            .map(|r| format!("[{}] {}", r.rule_name, r.message))
            .collect();
        if !errors.is_empty() {
            return Err(CompilationError::GuardRailsFailed(errors));
        }

        let dynamic_config_yaml = self.emit_dynamic_config_yaml(&profile);
        let dsql_plugin_config = self.build_dsql_plugin_config(&profile);
        let sdk_snippets = super::adapters::sdk::render(&profile);
        let platform_snippets = super::adapters::platform::render(&profile);
        let trace = self.build_trace(&profile);
        let why_section = self.generate_why_section(&profile, &guard_rail_results);

        Ok(CompilationResult {
            profile,
            dynamic_config_yaml,
            dsql_plugin_config,
            sdk_snippets,
            platform_snippets,
            guard_rail_results,
            trace,
            why_section,
        })
    }

    fn emit_dynamic_config_yaml(&self, profile: &ConfigProfile) -> String {
        use super::model::OutputTarget;
        let mut lines = vec!["# generated by the config compiler, do not edit by hand".to_string()];
        for p in profile.all_params() {
            if let Some(entry) = self.registry.get(&p.key) {
                if entry.output_targets.contains(&OutputTarget::DynamicConfig) {
                    lines.push(format!("{}: {}", p.key, p.value));
                }
            }
        }
        lines.join("\n")
    }

    fn build_dsql_plugin_config(&self, profile: &ConfigProfile) -> DsqlPluginConfig {
        let s = |k: &str| -> String {
            profile.get_param(k).map(|p| p.value.to_string()).unwrap_or_default()
        };
        let i = |k: &str| -> i64 {
            profile.get_param(k).and_then(|p| p.value.as_f64()).unwrap_or(0.0) as i64
        };
        let b = |k: &str| -> bool {
            profile.get_param(k).and_then(|p| p.value.as_bool()).unwrap_or(false)
        };
        let opt_i = |k: &str| -> Option<i64> {
            profile.get_param(k).and_then(|p| p.value.as_f64()).map(|f| f as i64)
        };
        let opt_s = |k: &str| -> Option<String> {
            profile.get_param(k).map(|p| p.value.to_string()).filter(|v| !v.is_empty())
        };

        DsqlPluginConfig {
            reservoir_enabled: b("dsql.reservoir_enabled"),
            reservoir_target_ready: i("dsql.reservoir_target_ready"),
            reservoir_base_lifetime: s("dsql.reservoir_base_lifetime"),
            reservoir_lifetime_jitter: s("dsql.reservoir_lifetime_jitter"),
            reservoir_guard_window: s("dsql.reservoir_guard_window"),
            reservoir_inflight_limit: i("dsql.reservoir_inflight_limit"),
            max_conns: i("persistence.maxConns"),
            max_idle_conns: i("persistence.maxIdleConns"),
            max_conn_lifetime: s("dsql.max_conn_lifetime"),
            connection_rate_limit: i("dsql.connection_rate_limit"),
            connection_burst_limit: i("dsql.connection_burst_limit"),
            distributed_rate_limiter_enabled: b("dsql.distributed_rate_limiter_enabled"),
            distributed_rate_limiter_table: opt_s("dsql.distributed_rate_limiter_table"),
            token_bucket_enabled: b("dsql.token_bucket_enabled"),
            token_bucket_rate: opt_i("dsql.token_bucket_rate"),
            token_bucket_capacity: opt_i("dsql.token_bucket_capacity"),
            slot_block_enabled: b("dsql.slot_block_enabled"),
            slot_block_size: opt_i("dsql.slot_block_size"),
            slot_block_count: opt_i("dsql.slot_block_count"),
        }
    }

    pub(crate) fn build_trace(&self, profile: &ConfigProfile) -> Vec<CompilationTrace> {
        profile
            .all_params()
            .into_iter()
            .map(|p| CompilationTrace {
                parameter_key: p.key.clone(),
                source: p.source,
                base_value: p.value.clone(),
                final_value: p.value.clone(),
                derivation_chain: vec![format!("{:?}", p.source)],
            })
            .collect()
    }

    pub(crate) fn generate_why_section(
        &self,
        profile: &ConfigProfile,
        results: &[super::model::GuardRailResult],
    ) -> String {
        let mut s = format!(
            "Compiled preset '{}'{} with {} parameters.\n",
            profile.preset_name,
            profile.modifier.as_deref().map(|m| format!(" + modifier '{m}'")).unwrap_or_default(),
            profile.all_params().len(),
        );
        if results.is_empty() {
            s.push_str("All guard rails passed with no findings.\n");
        } else {
            s.push_str("Guard rail findings:\n");
            for r in results {
                s.push_str(&format!("  [{:?}] {}: {}\n", r.severity, r.rule_name, r.message));
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_compiler::modifiers::build_default_modifiers;
    use crate::config_compiler::presets::build_default_presets;
    use crate::config_compiler::registry::build_default_registry;

    fn make_compiler() -> ConfigCompiler {
        ConfigCompiler::new(build_default_registry(), build_default_presets(), build_default_modifiers())
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let c = make_compiler();
        let err = c.resolve_profile("nonexistent", None, &ParameterOverrides::default()).unwrap_err();
        assert!(matches!(err, CompilationError::UnknownPreset(_)));
    }

    #[test]
    fn override_wins_over_preset_and_modifier() {
        let c = make_compiler();
        let mut overrides = ParameterOverrides::default();
        overrides.values.insert("sdk.max_concurrent_activities".into(), ParamValue::Int(777));
        let profile = c.resolve_profile("starter", Some("batch-processor"), &overrides).unwrap();
        let p = profile.get_param("sdk.max_concurrent_activities").unwrap();
        assert_eq!(p.value, ParamValue::Int(777));
        assert_eq!(p.source, ParamSource::Override);
    }

    #[test]
    fn max_idle_conns_tracks_max_conns_by_reference() {
        let c = make_compiler();
        let profile = c.resolve_profile("scale", None, &ParameterOverrides::default()).unwrap();
        let max_conns = profile.get_param("persistence.maxConns").unwrap();
        let max_idle = profile.get_param("persistence.maxIdleConns").unwrap();
        assert_eq!(max_conns.value, max_idle.value);
    }

    #[test]
    fn compile_starter_succeeds_with_no_guard_rail_errors() {
        let c = make_compiler();
        let result = c.compile("starter", None, &ParameterOverrides::default()).unwrap();
        assert!(result.guard_rail_results.iter().all(|r| r.severity != GuardRailSeverity::Error));
    }

    #[test]
    fn explain_is_deterministic_across_two_calls() {
        let c = make_compiler();
        let a = c.describe_preset("starter").unwrap();
        let b = c.describe_preset("starter").unwrap();
        assert_eq!(a.slo_params.len(), b.slo_params.len());
        assert_eq!(a.safety_params.len(), b.safety_params.len());
    }
}
