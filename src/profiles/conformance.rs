//! Preset conformance: checks a profile's telemetry means against the
//! preset's `expected_bounds`, grounded in
//! `original_source/.../copilot/workflows/conformance.py`.

use crate::config_compiler::model::ScalePreset;
use crate::types::profile::{BehaviourProfile, BoundCheck, ConformanceAssessment, ConformanceLabel};

use super::comparison::flatten_telemetry;

/// `pass` iff `lower <= mean <= upper` for every named bound. A preset
/// with no `expected_bounds` is vacuously `conforming` — ported verbatim
/// from the reference implementation's early return.
pub fn assess_conformance(profile: &BehaviourProfile, preset: &ScalePreset) -> ConformanceAssessment {
    let Some(bounds) = &preset.expected_bounds else {
        return ConformanceAssessment {
            profile_id: profile.id,
            preset_name: preset.name.clone(),
            bounds: Vec::new(),
            label: ConformanceLabel::Conforming,
        };
    };

    let flat = flatten_telemetry(&profile.telemetry);
    let checks: Vec<BoundCheck> = bounds
        .iter()
        .map(|b| {
            let observed_mean = flat.iter().find(|(n, _)| n == &b.metric).map(|(_, a)| a.mean).unwrap_or(0.0);
            BoundCheck {
                metric: b.metric.clone(),
                lower: b.lower,
                upper: b.upper,
                observed_mean,
                pass: observed_mean >= b.lower && observed_mean <= b.upper,
            }
        })
        .collect();

    let label =
        if checks.iter().all(|c| c.pass) { ConformanceLabel::Conforming } else { ConformanceLabel::Drifted };

    ConformanceAssessment { profile_id: profile.id, preset_name: preset.name.clone(), bounds: checks, label }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_compiler::model::{ThroughputRange, TelemetryBound};
    use crate::profiles::capture::tests::sample_profile;

    fn preset_with_bounds(bounds: Option<Vec<TelemetryBound>>) -> ScalePreset {
        ScalePreset {
            name: "starter".into(),
            description: "test".into(),
            throughput_range: ThroughputRange { min_st_per_sec: 0.0, max_st_per_sec: Some(100.0), description: String::new() },
            slo_defaults: vec![],
            topology_defaults: vec![],
            safety_derivations: vec![],
            tuning_derivations: vec![],
            expected_bounds: bounds,
        }
    }

    #[test]
    fn no_bounds_is_vacuously_conforming() {
        let profile = sample_profile();
        let preset = preset_with_bounds(None);
        let assessment = assess_conformance(&profile, &preset);
        assert_eq!(assessment.label, ConformanceLabel::Conforming);
        assert!(assessment.bounds.is_empty());
    }

    #[test]
    fn out_of_bound_metric_drifts_the_label() {
        let profile = sample_profile();
        let preset = preset_with_bounds(Some(vec![TelemetryBound {
            metric: "throughput.state_transitions_per_sec".into(),
            lower: 500.0,
            upper: 1000.0,
        }]));
        let assessment = assess_conformance(&profile, &preset);
        assert_eq!(assessment.label, ConformanceLabel::Drifted);
        assert!(!assessment.bounds[0].pass);
    }

    #[test]
    fn all_bounds_passing_is_conforming() {
        let profile = sample_profile();
        let preset = preset_with_bounds(Some(vec![TelemetryBound {
            metric: "throughput.state_transitions_per_sec".into(),
            lower: 50.0,
            upper: 200.0,
        }]));
        let assessment = assess_conformance(&profile, &preset);
        assert_eq!(assessment.label, ConformanceLabel::Conforming);
    }
}
