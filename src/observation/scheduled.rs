//! The Scheduled Assessment loop: a coarser-cadence backstop on top of
//! the state-change-triggered Observation Loop, grounded in
//! `original_source/.../workflows/scheduled.py`. Every 5 minutes, unless
//! an assessment was already recorded within the last 4 minutes (the
//! dedup window), fetch signals, evaluate the state machine fresh with
//! count=0 — scheduled runs never track consecutive-critical, only the
//! Observation Loop does — and spawn an Assessment Pipeline run tagged
//! `scheduled`.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::health::{evaluate_health_state, HealthThresholds};
use crate::types::assessment::AssessmentTrigger;
use crate::types::health::HealthState;

use super::error::ObservationError;
use super::traits::{AssessmentRecordStore, AssessmentRunner, SignalSource};

pub const DEFAULT_SCHEDULED_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEDUP_WINDOW: Duration = Duration::from_secs(4 * 60);

pub struct ScheduledAssessment {
    signal_source: Arc<dyn SignalSource>,
    record_store: Arc<dyn AssessmentRecordStore>,
    assessment_runner: Arc<dyn AssessmentRunner>,
    thresholds: HealthThresholds,
    interval: Duration,
}

impl ScheduledAssessment {
    pub fn new(
        signal_source: Arc<dyn SignalSource>,
        record_store: Arc<dyn AssessmentRecordStore>,
        assessment_runner: Arc<dyn AssessmentRunner>,
        thresholds: HealthThresholds,
        interval: Duration,
    ) -> Self {
        Self { signal_source, record_store, assessment_runner, thresholds, interval }
    }

    pub async fn run(self) {
        self.run_until_cancelled(tokio_util::sync::CancellationToken::new()).await
    }

    pub async fn run_until_cancelled(self, token: tokio_util::sync::CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "scheduled assessment tick failed, continuing");
                    }
                }
            }
        }
    }

    async fn tick(&self) -> Result<(), ObservationError> {
        if self.record_store.has_recent_assessment(DEDUP_WINDOW).await? {
            return Ok(());
        }

        let primary = self.signal_source.fetch_primary().await?;
        let amplifiers = self.signal_source.fetch_amplifiers().await?;
        let worker = self.signal_source.fetch_worker().await?;

        let (health_state, _count) = evaluate_health_state(
            &primary,
            HealthState::Happy,
            0,
            &self.thresholds.critical,
            &self.thresholds.stressed,
            &self.thresholds.healthy,
        );

        self.assessment_runner
            .run(AssessmentTrigger::Scheduled, health_state, 0, primary, amplifiers, worker)
            .await;

        Ok(())
    }
}
