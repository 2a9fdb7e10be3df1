//! Output of the Assessment Pipeline: the persisted `Assessment` row plus the
//! `Issue` rows it fans out into, and the triage dispatcher's own output
//! type.

use super::health::{Bottleneck, HealthState};
use super::signals::{AmplifierSignals, LogPattern, PrimarySignals};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What triggered an assessment run. Scheduled runs never carry a
/// consecutive-critical count (only the Observation Loop tracks that).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentTrigger {
    StateChange,
    Scheduled,
    Manual,
}

/// The triage dispatcher's output. Matched exhaustively everywhere it is
/// consumed — no wildcard arm — so adding a variant here is a compile-time
/// forcing function on every call site, not a silent behavior change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriageOutcome {
    NoExplanationNeeded,
    QuickExplanation {
        summary: String,
        primary_factor: String,
    },
    NeedsDeepExplanation {
        complexity_reason: String,
        contributing_factors: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Info,
    Warning,
    Critical,
}

/// A single narrated issue within an assessment. One row per issue in the
/// store, so the read API can filter/paginate without deserializing a whole
/// assessment blob per item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub severity: IssueSeverity,
    pub title: String,
    pub narrative: String,
    pub likely_cause: String,
    pub contributing_factors: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub related_metrics: Vec<String>,
}

/// The authoritative record of one health assessment. `health_state`,
/// `trigger`, `primary_snapshot`, and `amplifier_snapshot` are set by the
/// pipeline itself and overwritten after any narrator call completes --
/// the narrator explains, it never gets to redecide these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub health_state: HealthState,
    pub trigger: AssessmentTrigger,
    pub consecutive_critical_count: u32,
    pub bottleneck: Bottleneck,
    pub primary_snapshot: PrimarySignals,
    pub amplifier_snapshot: AmplifierSignals,
    pub log_patterns: Vec<LogPattern>,
    pub summary: String,
    pub suggested_actions: Vec<String>,
    pub issues: Vec<Issue>,
}

impl Assessment {
    /// Forces the fields the pipeline owns back to the values computed by the
    /// state machine, discarding anything a narrator call may have written
    /// into them. Always called once, immediately after the narrator
    /// returns, on both the triage and the deep path.
    pub fn reassert_authoritative_fields(
        &mut self,
        timestamp: DateTime<Utc>,
        health_state: HealthState,
        trigger: AssessmentTrigger,
        primary_snapshot: PrimarySignals,
        amplifier_snapshot: AmplifierSignals,
    ) {
        self.timestamp = timestamp;
        self.health_state = health_state;
        self.trigger = trigger;
        self.primary_snapshot = primary_snapshot;
        self.amplifier_snapshot = amplifier_snapshot;
    }
}
