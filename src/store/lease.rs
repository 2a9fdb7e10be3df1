//! Postgres-backed [`WorkflowLeaseStore`]: the `running_workflows` table
//! stand-in for a Temporal workflow execution, giving each fixed logical
//! id "start or adopt" semantics via an upsert guarded by an expiry
//! comparison.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;

use crate::observation::error::ObservationError;
use crate::observation::traits::WorkflowLeaseStore;

pub struct PgWorkflowLeaseStore {
    pool: PgPool,
}

impl PgWorkflowLeaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn lease_err(e: sqlx::Error) -> ObservationError {
    ObservationError::LeaseError(e.to_string())
}

#[async_trait]
impl WorkflowLeaseStore for PgWorkflowLeaseStore {
    async fn try_acquire(&self, logical_id: &str, lease_ttl: Duration) -> Result<bool, ObservationError> {
        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(lease_ttl).map_err(|e| ObservationError::LeaseError(e.to_string()))?;

        // Claims the lease iff no row exists yet, or the existing lease has
        // already expired -- the same "insert or adopt an expired claim"
        // shape as a Temporal workflow start racing a stale execution.
        let result = sqlx::query(
            "INSERT INTO running_workflows (logical_id, lease_expires_at) VALUES ($1, $2)
             ON CONFLICT (logical_id) DO UPDATE
                SET lease_expires_at = EXCLUDED.lease_expires_at
                WHERE running_workflows.lease_expires_at < $3",
        )
        .bind(logical_id)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(lease_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn renew(&self, logical_id: &str, lease_ttl: Duration) -> Result<(), ObservationError> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(lease_ttl).map_err(|e| ObservationError::LeaseError(e.to_string()))?;

        sqlx::query("UPDATE running_workflows SET lease_expires_at = $1 WHERE logical_id = $2")
            .bind(expires_at)
            .bind(logical_id)
            .execute(&self.pool)
            .await
            .map_err(lease_err)?;
        Ok(())
    }
}
