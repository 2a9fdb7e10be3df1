//! Postgres-backed [`AssessmentStore`]: the Assessment Pipeline's full
//! read/write surface, including the issue fan-out insert and the
//! timeline query the Read API serves off of.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::assessment::store::{AssessmentStore, AssessmentStoreError};
use crate::types::assessment::Assessment;

pub struct PgAssessmentStore {
    pool: PgPool,
}

impl PgAssessmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> AssessmentStoreError {
    AssessmentStoreError::Unavailable(e.to_string())
}

/// Renders a serde-tagged snake_case enum as a bare string (`"critical"`,
/// not `"\"critical\""`) for a TEXT column.
fn enum_tag<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        other => other.map(|v| v.to_string()).unwrap_or_default(),
    }
}

fn row_to_assessment(data: serde_json::Value) -> Result<Assessment, AssessmentStoreError> {
    serde_json::from_value(data)
        .map_err(|e| AssessmentStoreError::Unavailable(format!("malformed assessment row: {e}")))
}

#[async_trait]
impl AssessmentStore for PgAssessmentStore {
    async fn persist(&self, assessment: &Assessment) -> Result<(), AssessmentStoreError> {
        let data = serde_json::to_value(assessment).map_err(|e| AssessmentStoreError::Unavailable(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            "INSERT INTO health_assessments (id, ts, health_state, trigger, consecutive_critical_count, data)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(assessment.id)
        .bind(assessment.timestamp)
        .bind(assessment.health_state.to_string())
        .bind(enum_tag(&assessment.trigger))
        .bind(assessment.consecutive_critical_count as i32)
        .bind(data)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        for issue in &assessment.issues {
            let issue_data =
                serde_json::to_value(issue).map_err(|e| AssessmentStoreError::Unavailable(e.to_string()))?;
            sqlx::query("INSERT INTO issues (id, assessment_id, severity, data) VALUES ($1, $2, $3, $4)")
                .bind(issue.id)
                .bind(issue.assessment_id)
                .bind(enum_tag(&issue.severity))
                .bind(issue_data)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)
    }

    async fn latest(&self) -> Result<Option<Assessment>, AssessmentStoreError> {
        let row = sqlx::query("SELECT data FROM health_assessments ORDER BY ts DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.map(|r| row_to_assessment(r.try_get("data").map_err(store_err)?)).transpose()
    }

    async fn timeline(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Assessment>, AssessmentStoreError> {
        let rows = sqlx::query("SELECT data FROM health_assessments WHERE ts >= $1 AND ts <= $2 ORDER BY ts ASC")
            .bind(since)
            .bind(until)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.into_iter().map(|r| row_to_assessment(r.try_get("data").map_err(store_err)?)).collect()
    }
}
