//! Drift detection: compares a current profile's telemetry against the
//! designated baseline for the same cluster/namespace and reports only
//! the metrics that actually moved past threshold — grounded in
//! `original_source/.../copilot/workflows/drift.py`.

use crate::types::profile::{BehaviourProfile, DiffSeverity, DriftAssessment};

use super::comparison::{compare_profiles, ComparisonThresholds};

/// Compares `current` against `baseline` (must have `is_baseline == true`
/// for the caller's `(cluster_id, namespace)` — enforced by whoever looks
/// the baseline up, not by this pure function). Emits only metrics whose
/// `|change_pct|` exceeds its category threshold; `is_drifted` is true
/// iff any of those carries `severity >= warning`.
pub fn detect_drift(
    current: &BehaviourProfile,
    baseline: &BehaviourProfile,
    thresholds: &ComparisonThresholds,
) -> DriftAssessment {
    let comparison = compare_profiles(baseline, current, thresholds);
    let drifted_metrics: Vec<_> =
        comparison.telemetry_diffs.into_iter().filter(|d| d.severity != DiffSeverity::Info).collect();
    let is_drifted = drifted_metrics.iter().any(|d| d.severity >= DiffSeverity::Warning);

    DriftAssessment {
        current_profile_id: current.id,
        baseline_profile_id: baseline.id,
        drifted_metrics,
        is_drifted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::capture::tests::sample_profile;

    #[test]
    fn no_drift_against_identical_baseline() {
        let baseline = sample_profile();
        let current = sample_profile();
        let assessment = detect_drift(&current, &baseline, &ComparisonThresholds::default());
        assert!(!assessment.is_drifted);
        assert!(assessment.drifted_metrics.is_empty());
    }

    #[test]
    fn throughput_collapse_drifts() {
        let baseline = sample_profile();
        let mut current = sample_profile();
        current.telemetry.throughput.state_transitions_per_sec.mean = 40.0;
        let assessment = detect_drift(&current, &baseline, &ComparisonThresholds::default());
        assert!(assessment.is_drifted);
        assert!(assessment
            .drifted_metrics
            .iter()
            .any(|d| d.metric == "throughput.state_transitions_per_sec"));
    }
}
