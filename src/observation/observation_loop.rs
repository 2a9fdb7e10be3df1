//! The Observation Loop: the primary long-running task. Polls signals on a
//! fixed cadence, evaluates the health state machine, and spawns the
//! Assessment Pipeline whenever the state changes. Grounded in the
//! teacher's `hub::intelligence::run_intelligence_scheduler` loop shape
//! (`tokio::time::interval` with `MissedTickBehavior::Delay`, so a slow
//! tick is skipped rather than busy-caught-up) and
//! `background::self_healer::SelfHealer`'s "log and continue" failure
//! posture.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::health::{evaluate_health_state, HealthThresholds};
use crate::types::assessment::AssessmentTrigger;
use crate::types::health::HealthState;
use crate::types::signals::PrimarySignals;

use super::error::ObservationError;
use super::sliding_window::SlidingWindow;
use super::traits::{AssessmentRecordStore, AssessmentRunner, SignalSource};

/// Default cadence between ticks. Matches the reference implementation's
/// 30-second observation interval (3 consecutive critical ticks = 90s of
/// sustained failure before Critical is reported).
pub const DEFAULT_OBSERVATION_INTERVAL: Duration = Duration::from_secs(30);

/// Capacity of the in-memory signal history window.
pub const SIGNAL_WINDOW_CAPACITY: usize = 10;

struct ObservationState {
    current_state: HealthState,
    consecutive_critical_count: u32,
    window: SlidingWindow<PrimarySignals>,
}

/// A cheap, `Clone`-able handle to the loop's shared state, consumed by
/// the read API and by tests — the same shape as the teacher's
/// `SchedulerHandle` wrapping shared channel/lock state.
#[derive(Clone)]
pub struct ObservationLoopHandle {
    state: Arc<RwLock<ObservationState>>,
}

impl ObservationLoopHandle {
    pub async fn current_state(&self) -> HealthState {
        self.state.read().await.current_state
    }

    pub async fn window_len(&self) -> usize {
        self.state.read().await.window.len()
    }

    pub async fn consecutive_critical_count(&self) -> u32 {
        self.state.read().await.consecutive_critical_count
    }

    pub async fn recent_signals(&self) -> Vec<PrimarySignals> {
        self.state.read().await.window.as_vec()
    }
}

pub struct ObservationLoop {
    signal_source: Arc<dyn SignalSource>,
    record_store: Arc<dyn AssessmentRecordStore>,
    assessment_runner: Arc<dyn AssessmentRunner>,
    thresholds: HealthThresholds,
    interval: Duration,
    state: Arc<RwLock<ObservationState>>,
}

impl ObservationLoop {
    pub fn new(
        signal_source: Arc<dyn SignalSource>,
        record_store: Arc<dyn AssessmentRecordStore>,
        assessment_runner: Arc<dyn AssessmentRunner>,
        thresholds: HealthThresholds,
        interval: Duration,
    ) -> Self {
        Self {
            signal_source,
            record_store,
            assessment_runner,
            thresholds,
            interval,
            state: Arc::new(RwLock::new(ObservationState {
                current_state: HealthState::Happy,
                consecutive_critical_count: 0,
                window: SlidingWindow::new(SIGNAL_WINDOW_CAPACITY),
            })),
        }
    }

    pub fn handle(&self) -> ObservationLoopHandle {
        ObservationLoopHandle { state: self.state.clone() }
    }

    /// Adopts the last persisted assessment's health state, or defaults
    /// to Happy if there is none — called once before entering the loop.
    async fn reconcile_state_from_last_assessment(&self) {
        match self.record_store.latest_assessment().await {
            Ok(Some(assessment)) => {
                let mut state = self.state.write().await;
                state.current_state = assessment.health_state;
                state.consecutive_critical_count = assessment.consecutive_critical_count;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "failed to reconcile state from last assessment, defaulting to Happy");
            }
        }
    }

    /// Runs forever. Call via `tokio::spawn` from [`super::lease::start_or_adopt`].
    pub async fn run(self) {
        self.run_until_cancelled(tokio_util::sync::CancellationToken::new()).await
    }

    /// Runs until `token` is cancelled, checked between ticks so a
    /// shutdown never lands mid-tick.
    pub async fn run_until_cancelled(self, token: tokio_util::sync::CancellationToken) {
        self.reconcile_state_from_last_assessment().await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "observation tick failed, continuing");
                    }
                }
            }
        }
    }

    async fn tick(&self) -> Result<(), ObservationError> {
        let primary = self.signal_source.fetch_primary().await?;
        let amplifiers = self.signal_source.fetch_amplifiers().await?;
        let worker = self.signal_source.fetch_worker().await?;

        if let Err(e) = self.record_store.persist_signal_snapshot(&primary, &amplifiers).await {
            warn!(error = %e, "failed to persist signal snapshot, continuing");
        }

        let (previous_state, previous_count) = {
            let state = self.state.read().await;
            (state.current_state, state.consecutive_critical_count)
        };

        let (new_state, new_count) = evaluate_health_state(
            &primary,
            previous_state,
            previous_count,
            &self.thresholds.critical,
            &self.thresholds.stressed,
            &self.thresholds.healthy,
        );

        {
            let mut state = self.state.write().await;
            state.current_state = new_state;
            state.consecutive_critical_count = new_count;
            state.window.push(primary.clone());
        }

        if new_state != previous_state {
            // Spawned, not awaited: the pipeline runs as its own task, the
            // same way a Temporal workflow starts a child workflow and
            // moves on without blocking on its completion.
            let runner = self.assessment_runner.clone();
            tokio::spawn(async move {
                runner
                    .run(
                        AssessmentTrigger::StateChange,
                        new_state,
                        new_count,
                        primary,
                        amplifiers,
                        worker,
                    )
                    .await;
            });
        }

        Ok(())
    }
}
