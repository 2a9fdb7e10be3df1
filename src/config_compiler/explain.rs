//! The three explain modes: `explain-key` (what a single parameter means
//! and why it defaults the way it does), `explain-preset` (the full
//! parameter set a preset resolves to, by classification), and
//! `explain-profile` (the full derivation trace plus guard rail verdicts
//! for one compiled preset+modifier+overrides combination). Each has a
//! `Display` impl for the CLI's text output and derives `Serialize` for
//! its JSON output -- the same data, two renderings, one source of
//! truth, per the "why" panel pattern in the teacher's
//! `hub::explain`-style diagnostics endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::compiler::{CompilationError, ConfigCompiler};
use super::model::{
    CompilationTrace, GuardRailResult, OutputTarget, ParamValue, ParameterClassification,
    ParameterConstraints, ParameterOverrides, ParameterUnit, PresetDescription,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyExplanation {
    pub key: String,
    pub classification: ParameterClassification,
    pub description: String,
    pub rationale: String,
    pub default_value: ParamValue,
    pub unit: Option<ParameterUnit>,
    pub constraints: Option<ParameterConstraints>,
    pub output_targets: Vec<OutputTarget>,
}

impl fmt::Display for KeyExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:?})", self.key, self.classification)?;
        writeln!(f, "  {}", self.description)?;
        writeln!(f, "  why: {}", self.rationale)?;
        writeln!(f, "  default: {}", self.default_value)?;
        if let Some(unit) = self.unit {
            writeln!(f, "  unit: {unit:?}")?;
        }
        if let Some(c) = &self.constraints {
            if c.min_value.is_some() || c.max_value.is_some() {
                writeln!(f, "  bounds: [{:?}, {:?}]", c.min_value, c.max_value)?;
            }
        }
        write!(f, "  feeds: {:?}", self.output_targets)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileExplanation {
    pub preset_name: String,
    pub modifier: Option<String>,
    pub trace: Vec<CompilationTrace>,
    pub guard_rail_results: Vec<GuardRailResult>,
    pub why_section: String,
}

impl fmt::Display for ProfileExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "preset '{}'{}",
            self.preset_name,
            self.modifier.as_deref().map(|m| format!(" + modifier '{m}'")).unwrap_or_default()
        )?;
        for t in &self.trace {
            writeln!(f, "  {} = {} (via {:?})", t.parameter_key, t.final_value, t.source)?;
        }
        write!(f, "{}", self.why_section)
    }
}

impl fmt::Display for PresetDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.name, self.description)?;
        for (label, params) in [
            ("slo", &self.slo_params),
            ("topology", &self.topology_params),
            ("safety", &self.safety_params),
            ("tuning", &self.tuning_params),
        ] {
            if params.is_empty() {
                continue;
            }
            writeln!(f, "  {label}:")?;
            for p in params {
                writeln!(f, "    {} = {} (via {:?})", p.key, p.value, p.source)?;
            }
        }
        Ok(())
    }
}

impl ConfigCompiler {
    /// `explain-key`: registry metadata for one parameter, independent of
    /// any preset or compilation.
    pub fn explain_key(&self, key: &str) -> Result<KeyExplanation, CompilationError> {
        let entry =
            self.registry().get(key).ok_or_else(|| CompilationError::UnknownParameter(key.to_string()))?;
        Ok(KeyExplanation {
            key: entry.key.clone(),
            classification: entry.classification,
            description: entry.description.clone(),
            rationale: entry.rationale.clone(),
            default_value: entry.default_value.clone(),
            unit: entry.unit,
            constraints: entry.constraints.clone(),
            output_targets: entry.output_targets.clone(),
        })
    }

    /// `explain-preset`: the same data `describe_preset` returns, exposed
    /// under the explain-mode name so the CLI/API naming matches.
    pub fn explain_preset(&self, name: &str) -> Result<PresetDescription, CompilationError> {
        self.describe_preset(name)
    }

    /// `explain-profile`: full derivation trace and guard rail verdicts
    /// for one compiled combination. Never returns `Err` solely because a
    /// guard rail failed -- the point of this mode is to show the failure,
    /// not hide it behind `CompilationError::GuardRailsFailed`.
    pub fn explain_profile(
        &self,
        preset_name: &str,
        modifier_name: Option<&str>,
        overrides: &ParameterOverrides,
    ) -> Result<ProfileExplanation, CompilationError> {
        let profile = self.resolve_profile(preset_name, modifier_name, overrides)?;
        let guard_rail_results = super::guard_rails::GuardRailEngine::evaluate(&profile);
        let trace = self.build_trace(&profile);
        let why_section = self.generate_why_section(&profile, &guard_rail_results);

        Ok(ProfileExplanation {
            preset_name: preset_name.to_string(),
            modifier: modifier_name.map(str::to_string),
            trace,
            guard_rail_results,
            why_section,
        })
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
    fn explain_key_reports_classification_and_rationale() {
        let c = make_compiler();
        let e = c.explain_key("persistence.maxIdleConns").unwrap();
        assert_eq!(e.classification, ParameterClassification::Safety);
        assert!(!e.rationale.is_empty());
    }

    #[test]
    fn explain_key_unknown_is_an_error() {
        let c = make_compiler();
        assert!(matches!(c.explain_key("nonexistent.key"), Err(CompilationError::UnknownParameter(_))));
    }

    #[test]
    fn explain_profile_is_deterministic() {
        let c = make_compiler();
        let a = c.explain_profile("starter", None, &ParameterOverrides::default()).unwrap();
        let b = c.explain_profile("starter", None, &ParameterOverrides::default()).unwrap();
        assert_eq!(a.trace.len(), b.trace.len());
        assert_eq!(a.why_section, b.why_section);
    }

    #[test]
    fn explain_profile_surfaces_guard_rail_failures_instead_of_erroring() {
        let c = make_compiler();
        let mut overrides = ParameterOverrides::default();
        overrides.values.insert("persistence.maxConns".into(), ParamValue::Int(5));
        overrides.values.insert("persistence.maxIdleConns".into(), ParamValue::Int(2));
        let explained = c.explain_profile("starter", None, &overrides).unwrap();
        assert!(!explained.guard_rail_results.is_empty());
    }
}
