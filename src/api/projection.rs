//! Read-only projections over stored state. The idle-override rule lives
//! here once, so every handler that surfaces a health state applies it
//! the same way instead of re-deriving it per endpoint.

use crate::health;
use crate::types::assessment::Assessment;
use crate::types::health::HealthState;

/// The health state a caller should see for `assessment`: forced to
/// `Happy` when the assessment's own primary-signal snapshot satisfies
/// the idle detector, even if it was persisted with a stale
/// `Stressed`/`Critical` state from before the cluster went quiet.
pub fn effective_health_state(assessment: &Assessment) -> HealthState {
    if health::is_idle(&assessment.primary_snapshot) {
        HealthState::Happy
    } else {
        assessment.health_state
    }
}
