//! The Assessment Pipeline: the concrete [`AssessmentRunner`] the
//! Observation Loop, Log Watcher, and Scheduled Assessment all spawn into
//! whenever they decide an assessment is warranted. Drives the
//! triage-then-maybe-deep narration flow and is the single place that
//! reasserts the authoritative fields on the resulting
//! [`Assessment`] after any narrator call returns — grounded in the
//! teacher's `llm::scheduler::LlmScheduler` priority dispatch and
//! `pipeline::coordinator`'s fetch-then-narrate shape.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::health::classify_bottleneck;
use crate::types::assessment::{Assessment, AssessmentTrigger, Issue, IssueSeverity, TriageOutcome};
use crate::types::health::HealthState;
use crate::types::signals::{default_narrative_patterns, AmplifierSignals, PrimarySignals, WorkerSignals};

use super::knowledge::KnowledgeBaseClient;
use super::narrator::{DeepNarrator, DeepNarratorInput, TriageInput, TriageNarrator};
use super::store::AssessmentStore;
use crate::observation::traits::{AssessmentRunner, LogSource};

/// How much of the in-memory signal trend window the deep narrator gets
/// to see. The pipeline itself holds no trend history; a caller that
/// wants trend data wired in passes it through `trend_window` on
/// `new` — kept empty by default since the Observation Loop's window is
/// not threaded through yet everywhere the pipeline is constructed.
const DEFAULT_RETRIEVAL_RESULTS: usize = 5;

pub struct AssessmentPipeline {
    triage: Arc<dyn TriageNarrator>,
    deep: Arc<dyn DeepNarrator>,
    knowledge_base: Arc<dyn KnowledgeBaseClient>,
    log_source: Arc<dyn LogSource>,
    store: Arc<dyn AssessmentStore>,
}

impl AssessmentPipeline {
    pub fn new(
        triage: Arc<dyn TriageNarrator>,
        deep: Arc<dyn DeepNarrator>,
        knowledge_base: Arc<dyn KnowledgeBaseClient>,
        log_source: Arc<dyn LogSource>,
        store: Arc<dyn AssessmentStore>,
    ) -> Self {
        Self { triage, deep, knowledge_base, log_source, store }
    }

    async fn build_assessment(
        &self,
        trigger: AssessmentTrigger,
        health_state: HealthState,
        consecutive_critical_count: u32,
        primary: PrimarySignals,
        amplifiers: AmplifierSignals,
        worker: WorkerSignals,
    ) -> Assessment {
        let timestamp = Utc::now();
        let bottleneck = classify_bottleneck(&primary, &worker);

        let previous_state = self
            .store
            .latest()
            .await
            .ok()
            .flatten()
            .map(|a| a.health_state)
            .unwrap_or(HealthState::Happy);

        let mut assessment = Assessment {
            id: Uuid::new_v4(),
            timestamp,
            health_state,
            trigger,
            consecutive_critical_count,
            bottleneck,
            primary_snapshot: primary.clone(),
            amplifier_snapshot: amplifiers.clone(),
            log_patterns: Vec::new(),
            summary: String::new(),
            suggested_actions: Vec::new(),
            issues: Vec::new(),
        };

        let triage_input =
            TriageInput { health_state, previous_state, bottleneck, primary: primary.clone() };

        let outcome = match self.triage.triage(&triage_input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "triage narrator unavailable, falling back to minimal assessment");
                assessment.summary = minimal_fallback_summary(health_state, bottleneck);
                assessment.reassert_authoritative_fields(
                    timestamp,
                    health_state,
                    trigger,
                    primary,
                    amplifiers,
                );
                return assessment;
            }
        };

        self.apply_outcome(&mut assessment, outcome, &primary, &amplifiers).await;

        assessment.reassert_authoritative_fields(timestamp, health_state, trigger, primary, amplifiers);
        assessment
    }

    async fn apply_outcome(
        &self,
        assessment: &mut Assessment,
        outcome: TriageOutcome,
        primary: &PrimarySignals,
        amplifiers: &AmplifierSignals,
    ) {
        match outcome {
            TriageOutcome::NoExplanationNeeded => {
                assessment.summary = "No change worth narrating.".to_string();
            }
            TriageOutcome::QuickExplanation { summary, primary_factor } => {
                assessment.summary = summary;
                assessment.issues.push(Issue {
                    id: Uuid::new_v4(),
                    assessment_id: assessment.id,
                    severity: severity_for(assessment.health_state),
                    title: primary_factor.clone(),
                    narrative: assessment.summary.clone(),
                    likely_cause: primary_factor,
                    contributing_factors: Vec::new(),
                    suggested_actions: Vec::new(),
                    related_metrics: Vec::new(),
                });
            }
            TriageOutcome::NeedsDeepExplanation { complexity_reason, contributing_factors } => {
                self.run_deep_narration(assessment, primary, amplifiers, complexity_reason, contributing_factors)
                    .await;
            }
        }
    }

    async fn run_deep_narration(
        &self,
        assessment: &mut Assessment,
        primary: &PrimarySignals,
        amplifiers: &AmplifierSignals,
        complexity_reason: String,
        contributing_factors: Vec<String>,
    ) {
        let patterns = default_narrative_patterns();

        // Fanned out concurrently: retrieval and log fetch are independent
        // reads, neither depends on the other's result.
        let (logs, retrieval_context) = tokio::join!(
            self.log_source.fetch_recent_patterns(&patterns),
            self.knowledge_base.retrieve(&contributing_factors, DEFAULT_RETRIEVAL_RESULTS),
        );

        let logs = logs.unwrap_or_else(|e| {
            warn!(error = %e, "log fetch failed for deep narration, continuing without logs");
            Vec::new()
        });

        let input = DeepNarratorInput {
            health_state: assessment.health_state,
            bottleneck: assessment.bottleneck,
            primary: primary.clone(),
            amplifiers: amplifiers.clone(),
            logs: logs.clone(),
            retrieval_context,
            trend_window: Vec::new(),
            contributing_factors: contributing_factors.clone(),
        };

        assessment.log_patterns = logs;

        match self.deep.narrate(&input).await {
            Ok(output) => {
                assessment.summary = output.summary;
                assessment.suggested_actions = output.suggested_actions;
                assessment.issues = output
                    .issues
                    .into_iter()
                    .map(|mut issue| {
                        issue.assessment_id = assessment.id;
                        issue
                    })
                    .collect();
            }
            Err(e) => {
                warn!(error = %e, "deep narrator unavailable, falling back to triage-level summary");
                assessment.summary = complexity_reason;
            }
        }
    }
}

fn severity_for(state: HealthState) -> IssueSeverity {
    match state {
        HealthState::Happy => IssueSeverity::Info,
        HealthState::Stressed => IssueSeverity::Warning,
        HealthState::Critical => IssueSeverity::Critical,
    }
}

fn minimal_fallback_summary(state: HealthState, bottleneck: crate::types::health::Bottleneck) -> String {
    format!("Cluster is {state} ({bottleneck}); narrator unavailable.")
}

#[async_trait]
impl AssessmentRunner for AssessmentPipeline {
    async fn run(
        &self,
        trigger: AssessmentTrigger,
        health_state: HealthState,
        consecutive_critical_count: u32,
        primary: PrimarySignals,
        amplifiers: AmplifierSignals,
        worker: WorkerSignals,
    ) {
        let assessment = self
            .build_assessment(trigger, health_state, consecutive_critical_count, primary, amplifiers, worker)
            .await;

        if let Err(e) = self.store.persist(&assessment).await {
            warn!(error = %e, "failed to persist assessment");
        }
    }
}
