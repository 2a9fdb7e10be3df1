//! Concrete [`TriageNarrator`]/[`DeepNarrator`] implementations backed by
//! `MistralRsBackend`: a cheap low-token-budget role for triage, an
//! expensive higher-token-budget role for deep narration, both parsed
//! with the same line-oriented `KEY: value` regex style the teacher's
//! strategic advisory parser used. When the `llm` feature is off, both
//! roles fall back to a small deterministic heuristic instead of
//! running inference.

use std::sync::Arc;

use async_trait::async_trait;

#[cfg(feature = "llm")]
use regex::Regex;

#[cfg(feature = "llm")]
use crate::llm::MistralRsBackend;

use crate::types::assessment::{Issue, IssueSeverity, TriageOutcome};
use crate::types::health::HealthState;

use super::narrator::{DeepNarrator, DeepNarratorInput, DeepNarratorOutput, NarratorError, TriageInput, TriageNarrator};

const TRIAGE_MAX_TOKENS: usize = 160;
const TRIAGE_TEMPERATURE: f64 = 0.2;
const DEEP_MAX_TOKENS: usize = 512;
const DEEP_TEMPERATURE: f64 = 0.3;

const TRIAGE_PROMPT_HEADER: &str = r#"You are the triage narrator for a workflow-orchestration cluster's health copilot.
Given the rule engine's already-decided health state, judge only how much narration this change deserves.
Output ONLY the lines below. No preamble, no markdown.

OUTCOME: [NONE | QUICK | DEEP]
SUMMARY: [one sentence, only if OUTCOME is QUICK]
PRIMARY_FACTOR: [short label, only if OUTCOME is QUICK]
COMPLEXITY_REASON: [one sentence, only if OUTCOME is DEEP]
FACTORS: [comma-separated labels, only if OUTCOME is DEEP]
"#;

const DEEP_PROMPT_HEADER: &str = r#"You are the deep narrator for a workflow-orchestration cluster's health copilot.
You may only narrate; the health state itself is already decided and cannot be changed by you.
Output ONLY the lines below. No preamble, no markdown.

SUMMARY: [two to three sentences explaining what is happening and why]
ACTIONS: [comma-separated list of concrete suggested actions]
ISSUE_TITLE: [short label for the single most important open issue]
ISSUE_CAUSE: [one sentence likely cause]
"#;

/// Backed by `MistralRsBackend` when the `llm` feature is enabled; a
/// heuristic fallback otherwise.
pub struct LlmTriageNarrator {
    #[cfg(feature = "llm")]
    backend: Arc<MistralRsBackend>,
    #[cfg(not(feature = "llm"))]
    _phantom: std::marker::PhantomData<()>,
}

impl LlmTriageNarrator {
    #[cfg(feature = "llm")]
    pub async fn load(model_path: &str) -> anyhow::Result<Self> {
        let backend = MistralRsBackend::load(model_path).await?;
        Ok(Self { backend: Arc::new(backend) })
    }

    #[cfg(not(feature = "llm"))]
    pub async fn load(_model_path: &str) -> anyhow::Result<Self> {
        Ok(Self { _phantom: std::marker::PhantomData })
    }
}

#[cfg(feature = "llm")]
fn build_triage_prompt(input: &TriageInput) -> String {
    format!(
        "{header}\nCURRENT STATE: {state}\nPREVIOUS STATE: {previous}\nBOTTLENECK: {bottleneck}\nFRONTEND ERROR RATE: {err:.2}/s\nHISTORY BACKLOG AGE: {backlog:.0}s\n",
        header = TRIAGE_PROMPT_HEADER,
        state = input.health_state,
        previous = input.previous_state,
        bottleneck = input.bottleneck,
        err = input.primary.frontend.error_rate_per_sec,
        backlog = input.primary.history.backlog_age_sec,
    )
}

#[cfg(feature = "llm")]
fn parse_triage_response(response: &str) -> Result<TriageOutcome, NarratorError> {
    let outcome_re = Regex::new(r"(?i)OUTCOME:\s*(.+?)(?:\n|$)").unwrap();
    let summary_re = Regex::new(r"(?i)SUMMARY:\s*(.+?)(?:\n|$)").unwrap();
    let factor_re = Regex::new(r"(?i)PRIMARY_FACTOR:\s*(.+?)(?:\n|$)").unwrap();
    let reason_re = Regex::new(r"(?i)COMPLEXITY_REASON:\s*(.+?)(?:\n|$)").unwrap();
    let factors_re = Regex::new(r"(?i)FACTORS:\s*(.+?)(?:\n|$)").unwrap();

    let outcome = outcome_re
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_uppercase())
        .ok_or_else(|| NarratorError::MalformedOutput("missing OUTCOME line".to_string()))?;

    if outcome.contains("NONE") {
        return Ok(TriageOutcome::NoExplanationNeeded);
    }

    if outcome.contains("QUICK") {
        let summary = summary_re
            .captures(response)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .ok_or_else(|| NarratorError::MalformedOutput("missing SUMMARY line".to_string()))?;
        let primary_factor = factor_re
            .captures(response)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "unspecified".to_string());
        return Ok(TriageOutcome::QuickExplanation { summary, primary_factor });
    }

    if outcome.contains("DEEP") {
        let complexity_reason = reason_re
            .captures(response)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .ok_or_else(|| NarratorError::MalformedOutput("missing COMPLEXITY_REASON line".to_string()))?;
        let contributing_factors = factors_re
            .captures(response)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        return Ok(TriageOutcome::NeedsDeepExplanation { complexity_reason, contributing_factors });
    }

    Err(NarratorError::MalformedOutput(format!("unrecognised OUTCOME value: {outcome}")))
}

fn rule_based_triage(input: &TriageInput) -> TriageOutcome {
    match input.health_state {
        HealthState::Happy => TriageOutcome::NoExplanationNeeded,
        HealthState::Stressed => TriageOutcome::QuickExplanation {
            summary: format!("Cluster is stressed; bottleneck is {}.", input.bottleneck),
            primary_factor: input.bottleneck.to_string(),
        },
        HealthState::Critical => TriageOutcome::NeedsDeepExplanation {
            complexity_reason: format!("Cluster is critical with bottleneck {}.", input.bottleneck),
            contributing_factors: vec![input.bottleneck.to_string()],
        },
    }
}

#[async_trait]
impl TriageNarrator for LlmTriageNarrator {
    #[cfg(feature = "llm")]
    async fn triage(&self, input: &TriageInput) -> Result<TriageOutcome, NarratorError> {
        let prompt = build_triage_prompt(input);
        let response = self
            .backend
            .generate_with_params(&prompt, TRIAGE_MAX_TOKENS, TRIAGE_TEMPERATURE)
            .await
            .map_err(|e| NarratorError::BackendUnavailable(e.to_string()))?;
        parse_triage_response(&response)
    }

    #[cfg(not(feature = "llm"))]
    async fn triage(&self, input: &TriageInput) -> Result<TriageOutcome, NarratorError> {
        Ok(rule_based_triage(input))
    }
}

/// Backed by `MistralRsBackend` when the `llm` feature is enabled; a
/// heuristic fallback otherwise.
pub struct LlmDeepNarrator {
    #[cfg(feature = "llm")]
    backend: Arc<MistralRsBackend>,
    #[cfg(not(feature = "llm"))]
    _phantom: std::marker::PhantomData<()>,
}

impl LlmDeepNarrator {
    #[cfg(feature = "llm")]
    pub async fn load(model_path: &str) -> anyhow::Result<Self> {
        let backend = MistralRsBackend::load(model_path).await?;
        Ok(Self { backend: Arc::new(backend) })
    }

    #[cfg(not(feature = "llm"))]
    pub async fn load(_model_path: &str) -> anyhow::Result<Self> {
        Ok(Self { _phantom: std::marker::PhantomData })
    }
}

#[cfg(feature = "llm")]
fn build_deep_prompt(input: &DeepNarratorInput) -> String {
    let logs = if input.logs.is_empty() {
        "none observed".to_string()
    } else {
        input
            .logs
            .iter()
            .map(|p| format!("{} x{} ({})", p.pattern, p.count, p.service))
            .collect::<Vec<_>>()
            .join("; ")
    };

    let context = if input.retrieval_context.is_empty() {
        "no additional context retrieved".to_string()
    } else {
        input.retrieval_context.join("\n")
    };

    format!(
        "{header}\nSTATE: {state}\nBOTTLENECK: {bottleneck}\nCONTRIBUTING FACTORS: {factors}\nLOG PATTERNS: {logs}\nCONTEXT:\n{context}\n",
        header = DEEP_PROMPT_HEADER,
        state = input.health_state,
        bottleneck = input.bottleneck,
        factors = input.contributing_factors.join(", "),
        logs = logs,
        context = context,
    )
}

#[cfg(feature = "llm")]
fn parse_deep_response(response: &str) -> Result<DeepNarratorOutput, NarratorError> {
    let summary_re = Regex::new(r"(?i)SUMMARY:\s*(.+?)(?:\n|$)").unwrap();
    let actions_re = Regex::new(r"(?i)ACTIONS:\s*(.+?)(?:\n|$)").unwrap();
    let title_re = Regex::new(r"(?i)ISSUE_TITLE:\s*(.+?)(?:\n|$)").unwrap();
    let cause_re = Regex::new(r"(?i)ISSUE_CAUSE:\s*(.+?)(?:\n|$)").unwrap();

    let summary = summary_re
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| NarratorError::MalformedOutput("missing SUMMARY line".to_string()))?;

    let suggested_actions = actions_re
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let title = title_re
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| "unexplained degradation".to_string());

    let cause = cause_re
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| "cause not isolated".to_string());

    let issues = vec![Issue {
        id: uuid::Uuid::new_v4(),
        assessment_id: uuid::Uuid::nil(),
        severity: IssueSeverity::Warning,
        title,
        narrative: summary.clone(),
        likely_cause: cause,
        contributing_factors: Vec::new(),
        suggested_actions: suggested_actions.clone(),
        related_metrics: Vec::new(),
    }];

    Ok(DeepNarratorOutput { summary, suggested_actions, issues })
}

fn rule_based_deep(input: &DeepNarratorInput) -> DeepNarratorOutput {
    let factors = input.contributing_factors.join(", ");
    let summary = format!(
        "Cluster is {} with bottleneck {} driven by: {}.",
        input.health_state, input.bottleneck, factors
    );
    DeepNarratorOutput {
        summary: summary.clone(),
        suggested_actions: vec!["Investigate the listed contributing factors.".to_string()],
        issues: vec![Issue {
            id: uuid::Uuid::new_v4(),
            assessment_id: uuid::Uuid::nil(),
            severity: IssueSeverity::Warning,
            title: input.bottleneck.to_string(),
            narrative: summary,
            likely_cause: factors,
            contributing_factors: input.contributing_factors.clone(),
            suggested_actions: Vec::new(),
            related_metrics: Vec::new(),
        }],
    }
}

#[async_trait]
impl DeepNarrator for LlmDeepNarrator {
    #[cfg(feature = "llm")]
    async fn narrate(&self, input: &DeepNarratorInput) -> Result<DeepNarratorOutput, NarratorError> {
        let prompt = build_deep_prompt(input);
        let response = self
            .backend
            .generate_with_params(&prompt, DEEP_MAX_TOKENS, DEEP_TEMPERATURE)
            .await
            .map_err(|e| NarratorError::BackendUnavailable(e.to_string()))?;
        parse_deep_response(&response)
    }

    #[cfg(not(feature = "llm"))]
    async fn narrate(&self, input: &DeepNarratorInput) -> Result<DeepNarratorOutput, NarratorError> {
        Ok(rule_based_deep(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::health::Bottleneck;
    use crate::types::signals::{
        FrontendSignals, HistorySignals, MatchingSignals, PersistenceSignals, PollerSignals,
        PrimarySignals, StateTransitionSignals, WorkflowCompletionSignals,
    };

    fn zero_primary() -> PrimarySignals {
        PrimarySignals::clamped(
            StateTransitionSignals { throughput_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
            WorkflowCompletionSignals { success_per_sec: 0.0, failed_per_sec: 0.0, completion_rate: 1.0 },
            HistorySignals { backlog_age_sec: 0.0, task_processing_rate_per_sec: 0.0, shard_churn_rate_per_sec: 0.0 },
            FrontendSignals { error_rate_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
            MatchingSignals { workflow_backlog_age_sec: 0.0, activity_backlog_age_sec: 0.0 },
            PollerSignals { poll_timeout_rate: 0.0 },
            PersistenceSignals { error_rate_per_sec: 0.0, latency_p95_ms: 0.0, latency_p99_ms: 0.0 },
        )
    }

    #[test]
    fn rule_based_triage_maps_happy_to_no_explanation() {
        let input = TriageInput {
            health_state: HealthState::Happy,
            previous_state: HealthState::Happy,
            bottleneck: Bottleneck::Healthy,
            primary: zero_primary(),
        };
        assert!(matches!(rule_based_triage(&input), TriageOutcome::NoExplanationNeeded));
    }

    #[test]
    fn rule_based_triage_maps_critical_to_deep_explanation() {
        let input = TriageInput {
            health_state: HealthState::Critical,
            previous_state: HealthState::Happy,
            bottleneck: Bottleneck::ServerLimited,
            primary: zero_primary(),
        };
        assert!(matches!(rule_based_triage(&input), TriageOutcome::NeedsDeepExplanation { .. }));
    }

    #[cfg(feature = "llm")]
    #[test]
    fn parse_triage_response_rejects_missing_outcome() {
        let err = parse_triage_response("SUMMARY: nothing here\n").unwrap_err();
        assert!(matches!(err, NarratorError::MalformedOutput(_)));
    }

    #[cfg(feature = "llm")]
    #[test]
    fn parse_triage_response_parses_quick_explanation() {
        let response = "OUTCOME: QUICK\nSUMMARY: Frontend latency rose briefly.\nPRIMARY_FACTOR: frontend_latency\n";
        let outcome = parse_triage_response(response).unwrap();
        match outcome {
            TriageOutcome::QuickExplanation { summary, primary_factor } => {
                assert_eq!(summary, "Frontend latency rose briefly.");
                assert_eq!(primary_factor, "frontend_latency");
            }
            other => panic!("expected QuickExplanation, got {other:?}"),
        }
    }
}
