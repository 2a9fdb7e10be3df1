//! The two-stage narrator invocation contract (spec §4.3, §9's "LLM
//! Narrator Invocation Contract"). Internal prompting is out of scope —
//! only the shape of what goes in and what comes out is specified here,
//! mirroring the teacher's `llm::tactical_llm`/`llm::strategic_llm` split
//! (cheap P0 role vs. expensive P1 role) renamed to triage/deep.
//!
//! Both traits are invoked by [`super::pipeline::AssessmentPipeline`] and
//! never anywhere else — nothing downstream of the state machine is
//! allowed to call a narrator directly and short-circuit the pipeline's
//! authoritative-field overwrite.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::assessment::{Issue, TriageOutcome};
use crate::types::health::{Bottleneck, HealthState};
use crate::types::signals::{AmplifierSignals, LogPattern, PrimarySignals};

#[derive(Debug, thiserror::Error)]
pub enum NarratorError {
    #[error("narrator backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("narrator returned malformed output: {0}")]
    MalformedOutput(String),
}

/// A compact summary of the current state change, cheap enough to
/// narrate without retrieval or log fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageInput {
    pub health_state: HealthState,
    pub previous_state: HealthState,
    pub bottleneck: Bottleneck,
    pub primary: PrimarySignals,
}

/// Cheap, P0-priority narrator: the teacher's `Tactical` role. Decides how
/// much further narration this state change deserves — it never sees
/// logs or retrieval context, keeping it fast enough to never be starved
/// behind a deep narration in flight.
#[async_trait]
pub trait TriageNarrator: Send + Sync {
    async fn triage(&self, input: &TriageInput) -> Result<TriageOutcome, NarratorError>;
}

/// Everything the deep narrator is allowed to see: state + amplifiers +
/// logs + retrieval + trend window. It may never see a field that would
/// let it relitigate the state decision — `health_state` here is for
/// *narration*, and is discarded the moment the pipeline overwrites it
/// back onto the assessment post-hoc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepNarratorInput {
    pub health_state: HealthState,
    pub bottleneck: Bottleneck,
    pub primary: PrimarySignals,
    pub amplifiers: AmplifierSignals,
    pub logs: Vec<LogPattern>,
    pub retrieval_context: Vec<String>,
    pub trend_window: Vec<PrimarySignals>,
    pub contributing_factors: Vec<String>,
}

/// What the deep narrator is allowed to produce: narrative content only.
/// No field here can change the assessment's `health_state`, `trigger`,
/// `primary_snapshot`, or `amplifier_snapshot` — the pipeline always
/// overwrites those four fields after this call returns, per spec §4.3's
/// "CRITICAL: override fields the LLM may have hallucinated."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepNarratorOutput {
    pub summary: String,
    pub suggested_actions: Vec<String>,
    pub issues: Vec<Issue>,
}

/// Expensive, P1-priority narrator: the teacher's `Strategic` role.
#[async_trait]
pub trait DeepNarrator: Send + Sync {
    async fn narrate(&self, input: &DeepNarratorInput) -> Result<DeepNarratorOutput, NarratorError>;
}

/// Used when `narrator.enabled = false`. Every assessment degrades to the
/// pipeline's own triage-level summary -- classification and persistence
/// are unaffected either way.
pub struct NoOpTriageNarrator;

#[async_trait]
impl TriageNarrator for NoOpTriageNarrator {
    async fn triage(&self, input: &TriageInput) -> Result<TriageOutcome, NarratorError> {
        Ok(TriageOutcome::QuickExplanation {
            summary: format!("Cluster is {} ({}); narration disabled.", input.health_state, input.bottleneck),
            primary_factor: input.bottleneck.to_string(),
        })
    }
}

/// Never actually invoked by the pipeline when [`NoOpTriageNarrator`] is
/// paired with it, since it never returns `NeedsDeepExplanation`.
pub struct NoOpDeepNarrator;

#[async_trait]
impl DeepNarrator for NoOpDeepNarrator {
    async fn narrate(&self, _input: &DeepNarratorInput) -> Result<DeepNarratorOutput, NarratorError> {
        Ok(DeepNarratorOutput { summary: String::new(), suggested_actions: Vec::new(), issues: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::health::Bottleneck;
    use crate::types::signals::{
        FrontendSignals, HistorySignals, MatchingSignals, PersistenceSignals, PollerSignals, PrimarySignals,
        StateTransitionSignals, WorkflowCompletionSignals,
    };

    #[tokio::test]
    async fn noop_triage_never_escalates_to_deep() {
        let narrator = NoOpTriageNarrator;
        let input = TriageInput {
            health_state: HealthState::Critical,
            previous_state: HealthState::Happy,
            bottleneck: Bottleneck::ServerLimited,
            primary: PrimarySignals::clamped(
                StateTransitionSignals { throughput_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
                WorkflowCompletionSignals { success_per_sec: 0.0, failed_per_sec: 0.0, completion_rate: 1.0 },
                HistorySignals { backlog_age_sec: 0.0, task_processing_rate_per_sec: 0.0, shard_churn_rate_per_sec: 0.0 },
                FrontendSignals { error_rate_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
                MatchingSignals { workflow_backlog_age_sec: 0.0, activity_backlog_age_sec: 0.0 },
                PollerSignals { poll_timeout_rate: 0.0 },
                PersistenceSignals { error_rate_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
            ),
        };
        assert!(matches!(narrator.triage(&input).await, Ok(TriageOutcome::QuickExplanation { .. })));
    }
}
