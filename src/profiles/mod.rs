//! The Behaviour-Profile & Drift Engine: capturing labelled snapshots of
//! config + aggregated telemetry, comparing two of them, detecting drift
//! against a designated baseline, correlating drift against config
//! changes via a curated static table, and checking preset conformance.
//!
//! Every function here is pure and deterministic over its inputs — the
//! same separation of concerns as [`crate::health::state_machine`] and
//! [`crate::config_compiler`]: this module decides nothing about what the
//! data *means* operationally, it only diffs, labels, and links it.

pub mod capture;
pub mod comparison;
pub mod conformance;
pub mod correlation;
pub mod drift;
pub mod store;

pub use capture::{CaptureError, ProfileBuilder};
pub use comparison::{compare_profiles, ComparisonThresholds};
pub use conformance::assess_conformance;
pub use correlation::correlate_drift;
pub use drift::detect_drift;
pub use store::{BehaviourProfileStore, ProfileStoreError};
