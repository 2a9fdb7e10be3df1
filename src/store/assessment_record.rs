//! Postgres-backed [`AssessmentRecordStore`]: the narrow persistence slice
//! the observation loops need directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::observation::error::ObservationError;
use crate::observation::traits::AssessmentRecordStore;
use crate::types::assessment::Assessment;
use crate::types::signals::{AmplifierSignals, PrimarySignals};

pub struct PgAssessmentRecordStore {
    pool: PgPool,
}

impl PgAssessmentRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> ObservationError {
    ObservationError::StoreError(e.to_string())
}

#[async_trait]
impl AssessmentRecordStore for PgAssessmentRecordStore {
    async fn latest_assessment(&self) -> Result<Option<Assessment>, ObservationError> {
        let row = sqlx::query("SELECT data FROM health_assessments ORDER BY ts DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.map(|r| {
            let data: serde_json::Value = r.try_get("data").map_err(store_err)?;
            serde_json::from_value(data)
                .map_err(|e| ObservationError::StoreError(format!("malformed assessment row: {e}")))
        })
        .transpose()
    }

    async fn persist_signal_snapshot(
        &self,
        primary: &PrimarySignals,
        amplifiers: &AmplifierSignals,
    ) -> Result<(), ObservationError> {
        sqlx::query(
            "INSERT INTO metrics_snapshots (ts, primary_signals, amplifier_signals) VALUES ($1, $2, $3)",
        )
        .bind(Utc::now())
        .bind(serde_json::to_value(primary).map_err(|e| ObservationError::StoreError(e.to_string()))?)
        .bind(serde_json::to_value(amplifiers).map_err(|e| ObservationError::StoreError(e.to_string()))?)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn has_recent_assessment(&self, window: Duration) -> Result<bool, ObservationError> {
        let cutoff: DateTime<Utc> = Utc::now() - chrono::Duration::from_std(window)
            .map_err(|e| ObservationError::StoreError(e.to_string()))?;
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM health_assessments WHERE ts >= $1) AS present")
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        row.try_get::<bool, _>("present").map_err(store_err)
    }
}
