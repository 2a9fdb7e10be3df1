//! The Log Watcher: structurally identical to the Observation Loop but
//! polling Loki for curated narrative pattern matches instead of
//! Prometheus for primary signals. Its output only ever reaches the deep
//! narrator stage — it never feeds the health state machine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::types::signals::{default_narrative_patterns, LogPattern, NarrativePatternEntry};

use super::error::ObservationError;
use super::traits::LogSource;

pub const DEFAULT_LOG_WATCH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct LogWatcherHandle {
    patterns: Arc<RwLock<Vec<LogPattern>>>,
}

impl LogWatcherHandle {
    pub async fn recent_patterns(&self) -> Vec<LogPattern> {
        self.patterns.read().await.clone()
    }
}

pub struct LogWatcher {
    log_source: Arc<dyn LogSource>,
    catalogue: Vec<NarrativePatternEntry>,
    interval: Duration,
    patterns: Arc<RwLock<Vec<LogPattern>>>,
}

impl LogWatcher {
    pub fn new(log_source: Arc<dyn LogSource>, interval: Duration) -> Self {
        Self {
            log_source,
            catalogue: default_narrative_patterns(),
            interval,
            patterns: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> LogWatcherHandle {
        LogWatcherHandle { patterns: self.patterns.clone() }
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
                        warn!(error = %e, "log watcher tick failed, continuing");
                    }
                }
            }
        }
    }

    async fn tick(&self) -> Result<(), ObservationError> {
        let matches = self.log_source.fetch_recent_patterns(&self.catalogue).await?;
        *self.patterns.write().await = matches;
        Ok(())
    }
}
