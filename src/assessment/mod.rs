//! The Assessment Pipeline: triages every state change or scheduled tick,
//! escalates to a deep narrator only when triage says it's warranted, and
//! is the single place that reasserts the fields the state machine owns
//! before anything gets persisted. See [`pipeline::AssessmentPipeline`].

pub mod knowledge;
pub mod narrator;
pub mod narrator_llm;
pub mod pipeline;
pub mod store;

pub use knowledge::{KnowledgeBaseClient, NoOpKnowledgeBase};
pub use narrator::{
    DeepNarrator, DeepNarratorInput, DeepNarratorOutput, NarratorError, NoOpDeepNarrator, NoOpTriageNarrator,
    TriageInput, TriageNarrator,
};
pub use narrator_llm::{LlmDeepNarrator, LlmTriageNarrator};
pub use pipeline::AssessmentPipeline;
pub use store::{AssessmentStore, AssessmentStoreError};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::sync::Mutex;

    use crate::observation::error::ObservationError;
    use crate::observation::traits::{AssessmentRunner, LogSource};
    use crate::types::assessment::{Assessment, AssessmentTrigger, TriageOutcome};
    use crate::types::health::HealthState;
    use crate::types::signals::{
        AmplifierSignals, CacheAmplifiers, DeployAmplifiers, FrontendSignals, GrpcAmplifiers, HistorySignals,
        HostAmplifiers, LogPattern, MatchingSignals, NarrativePatternEntry, PersistenceContentionAmplifiers,
        PersistenceSignals, PollerSignals, PoolAmplifiers, PrimarySignals, QueueAmplifiers, RuntimeAmplifiers,
        ShardAmplifiers, StateTransitionSignals, ThrottlingAmplifiers, WorkerAmplifiers, WorkerSignals,
        WorkflowCompletionSignals,
    };

    use super::knowledge::NoOpKnowledgeBase;
    use super::narrator::{DeepNarratorInput, DeepNarratorOutput, NarratorError, TriageNarrator};
    use super::pipeline::AssessmentPipeline;
    use super::store::{AssessmentStore, AssessmentStoreError};
    use super::DeepNarrator;

    fn sample_primary() -> PrimarySignals {
        PrimarySignals::clamped(
            StateTransitionSignals { throughput_per_sec: 100.0, latency_p95_ms: 10.0, latency_p99_ms: 20.0 },
            WorkflowCompletionSignals { success_per_sec: 95.0, failed_per_sec: 5.0, completion_rate: 0.96 },
            HistorySignals {
                backlog_age_sec: 1.0,
                task_processing_rate_per_sec: 90.0,
                shard_churn_rate_per_sec: 0.0,
            },
            FrontendSignals { error_rate_per_sec: 0.1, latency_p95_ms: 50.0, latency_p99_ms: 90.0 },
            MatchingSignals { workflow_backlog_age_sec: 0.5, activity_backlog_age_sec: 0.5 },
            PollerSignals { poll_timeout_rate: 0.01 },
            PersistenceSignals { error_rate_per_sec: 0.1, latency_p95_ms: 5.0, latency_p99_ms: 10.0 },
        )
    }

    fn zero_amplifiers() -> AmplifierSignals {
        AmplifierSignals {
            persistence_contention: PersistenceContentionAmplifiers {
                occ_conflicts_per_sec: 0.0,
                exhausted_retries_per_sec: 0.0,
            },
            pool: PoolAmplifiers {
                open_count: 0,
                in_use_count: 0,
                idle_count: 0,
                wait_duration_ms: 0.0,
                reservoir_size: 0,
                reservoir_empty_events: 0,
            },
            queue: QueueAmplifiers { task_queue_backlog_count: 0 },
            worker: WorkerAmplifiers { task_slot_utilization: 0.0 },
            cache: CacheAmplifiers { sticky_cache_hit_rate: 1.0 },
            shard: ShardAmplifiers { ownership_churn_per_sec: 0.0, membership_changes_per_sec: 0.0 },
            grpc: GrpcAmplifiers { request_latency_p99_ms: 0.0, error_rate_per_sec: 0.0 },
            runtime: RuntimeAmplifiers { gc_pause_p99_ms: 0.0, goroutine_count: 0 },
            host: HostAmplifiers { cpu_throttle_pct: 0.0, memory_pressure_pct: 0.0 },
            throttling: ThrottlingAmplifiers { rate_limiter_rejection_rate: 0.0 },
            deploy: DeployAmplifiers { recent_deploy: false, version_changed: false },
        }
    }

    fn sample_worker() -> WorkerSignals {
        WorkerSignals {
            schedule_to_start_workflow_p95_ms: 5.0,
            schedule_to_start_workflow_p99_ms: 10.0,
            schedule_to_start_activity_p95_ms: 5.0,
            schedule_to_start_activity_p99_ms: 10.0,
            workflow_slots_available: 10,
            workflow_slots_used: 2,
            activity_slots_available: 10,
            activity_slots_used: 2,
            workflow_pollers: 2,
            activity_pollers: 2,
            sticky_cache_hit_rate: 0.9,
        }
    }

    struct StubLogSource;

    #[async_trait]
    impl LogSource for StubLogSource {
        async fn fetch_recent_patterns(
            &self,
            _patterns: &[NarrativePatternEntry],
        ) -> Result<Vec<LogPattern>, ObservationError> {
            Ok(Vec::new())
        }
    }

    struct RecordingStore {
        saved: Mutex<Vec<Assessment>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self { saved: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl AssessmentStore for RecordingStore {
        async fn persist(&self, assessment: &Assessment) -> Result<(), AssessmentStoreError> {
            self.saved.lock().await.push(assessment.clone());
            Ok(())
        }

        async fn latest(&self) -> Result<Option<Assessment>, AssessmentStoreError> {
            Ok(self.saved.lock().await.last().cloned())
        }

        async fn timeline(
            &self,
            _since: DateTime<Utc>,
            _until: DateTime<Utc>,
        ) -> Result<Vec<Assessment>, AssessmentStoreError> {
            Ok(self.saved.lock().await.clone())
        }
    }

    struct AlwaysNeedsDeep;

    #[async_trait]
    impl TriageNarrator for AlwaysNeedsDeep {
        async fn triage(&self, _input: &super::super::narrator::TriageInput) -> Result<TriageOutcome, NarratorError> {
            Ok(TriageOutcome::NeedsDeepExplanation {
                complexity_reason: "multiple amplifiers moved together".into(),
                contributing_factors: vec!["dsql_pool_exhaustion".into()],
            })
        }
    }

    struct HallucinatingDeepNarrator;

    #[async_trait]
    impl DeepNarrator for HallucinatingDeepNarrator {
        async fn narrate(&self, input: &DeepNarratorInput) -> Result<DeepNarratorOutput, NarratorError> {
            // Deliberately reports a state inconsistent with `input.health_state`
            // in its summary text, simulating a hallucinating backend; the
            // pipeline must still overwrite the authoritative fields from its
            // own computation, not from anything in this output.
            assert_eq!(input.health_state, HealthState::Critical);
            Ok(DeepNarratorOutput {
                summary: "Everything is fine".into(),
                suggested_actions: vec!["scale up matching".into()],
                issues: Vec::new(),
            })
        }
    }

    struct AlwaysFailingTriage;

    #[async_trait]
    impl TriageNarrator for AlwaysFailingTriage {
        async fn triage(&self, _input: &super::super::narrator::TriageInput) -> Result<TriageOutcome, NarratorError> {
            Err(NarratorError::BackendUnavailable("connection refused".into()))
        }
    }

    struct UnreachableDeep;

    #[async_trait]
    impl DeepNarrator for UnreachableDeep {
        async fn narrate(&self, _input: &DeepNarratorInput) -> Result<DeepNarratorOutput, NarratorError> {
            panic!("deep narrator must not be invoked when triage failed");
        }
    }

    #[tokio::test]
    async fn deep_path_cannot_override_authoritative_fields() {
        let store = Arc::new(RecordingStore::new());
        let pipeline = AssessmentPipeline::new(
            Arc::new(AlwaysNeedsDeep),
            Arc::new(HallucinatingDeepNarrator),
            Arc::new(NoOpKnowledgeBase),
            Arc::new(StubLogSource),
            store.clone(),
        );

        pipeline
            .run(
                AssessmentTrigger::StateChange,
                HealthState::Critical,
                3,
                sample_primary(),
                zero_amplifiers(),
                sample_worker(),
            )
            .await;

        let saved = store.saved.lock().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].health_state, HealthState::Critical);
        assert_eq!(saved[0].trigger, AssessmentTrigger::StateChange);
        assert_eq!(saved[0].consecutive_critical_count, 3);
        // The narrator's hallucinated summary content is kept (narration is
        // its job) but the state fields are the pipeline's own.
        assert_eq!(saved[0].summary, "Everything is fine");
    }

    #[tokio::test]
    async fn triage_failure_falls_back_without_calling_deep_narrator() {
        let store = Arc::new(RecordingStore::new());
        let pipeline = AssessmentPipeline::new(
            Arc::new(AlwaysFailingTriage),
            Arc::new(UnreachableDeep),
            Arc::new(NoOpKnowledgeBase),
            Arc::new(StubLogSource),
            store.clone(),
        );

        pipeline
            .run(
                AssessmentTrigger::Scheduled,
                HealthState::Stressed,
                0,
                sample_primary(),
                zero_amplifiers(),
                sample_worker(),
            )
            .await;

        let saved = store.saved.lock().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].health_state, HealthState::Stressed);
        assert!(saved[0].summary.contains("stressed"));
    }
}
