//! Postgres-backed [`BehaviourProfileStore`]. `designate_baseline` runs
//! inside a single transaction so the "clear old baseline, set new one"
//! swap is atomic -- a concurrent reader never observes zero or two
//! baselines for the same `(cluster_id, namespace)`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::profiles::store::{BehaviourProfileStore, ProfileListFilter, ProfileStoreError};
use crate::types::profile::BehaviourProfile;

pub struct PgBehaviourProfileStore {
    pool: PgPool,
}

impl PgBehaviourProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> ProfileStoreError {
    ProfileStoreError::ObjectStore(e.to_string())
}

fn row_to_profile(data: serde_json::Value) -> Result<BehaviourProfile, ProfileStoreError> {
    serde_json::from_value(data).map_err(|e| ProfileStoreError::Metadata(format!("malformed profile row: {e}")))
}

#[async_trait]
impl BehaviourProfileStore for PgBehaviourProfileStore {
    async fn save(&self, profile: &BehaviourProfile) -> Result<(), ProfileStoreError> {
        let data = serde_json::to_value(profile).map_err(|e| ProfileStoreError::Metadata(e.to_string()))?;

        sqlx::query(
            "INSERT INTO behaviour_profiles
                (id, cluster_id, namespace, task_queue, window_start, window_end, is_baseline, data)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(profile.id)
        .bind(&profile.cluster_id)
        .bind(&profile.namespace)
        .bind(&profile.task_queue)
        .bind(profile.time_window_start)
        .bind(profile.time_window_end)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, id: uuid::Uuid) -> Result<Option<BehaviourProfile>, ProfileStoreError> {
        let row = sqlx::query("SELECT data FROM behaviour_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.map(|r| row_to_profile(r.try_get("data").map_err(store_err)?)).transpose()
    }

    async fn list(&self, filter: &ProfileListFilter) -> Result<Vec<BehaviourProfile>, ProfileStoreError> {
        let rows = sqlx::query(
            "SELECT data FROM behaviour_profiles
             WHERE ($1::TEXT IS NULL OR cluster_id = $1)
               AND ($2::TEXT IS NULL OR namespace = $2)
               AND ($3::TEXT IS NULL OR task_queue = $3)
             ORDER BY window_end DESC",
        )
        .bind(&filter.cluster_id)
        .bind(&filter.namespace)
        .bind(&filter.task_queue)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.into_iter().map(|r| row_to_profile(r.try_get("data").map_err(store_err)?)).collect()
    }

    async fn get_baseline(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<Option<BehaviourProfile>, ProfileStoreError> {
        let row = sqlx::query(
            "SELECT data FROM behaviour_profiles
             WHERE cluster_id = $1 AND namespace IS NOT DISTINCT FROM $2 AND is_baseline",
        )
        .bind(cluster_id)
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(|r| row_to_profile(r.try_get("data").map_err(store_err)?)).transpose()
    }

    async fn designate_baseline(
        &self,
        profile_id: uuid::Uuid,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<(), ProfileStoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            "UPDATE behaviour_profiles SET is_baseline = FALSE
             WHERE cluster_id = $1 AND namespace IS NOT DISTINCT FROM $2 AND is_baseline",
        )
        .bind(cluster_id)
        .bind(namespace)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        let result = sqlx::query(
            "UPDATE behaviour_profiles SET is_baseline = TRUE
             WHERE id = $1 AND cluster_id = $2 AND namespace IS NOT DISTINCT FROM $3",
        )
        .bind(profile_id)
        .bind(cluster_id)
        .bind(namespace)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(ProfileStoreError::NotFound(profile_id));
        }

        tx.commit().await.map_err(store_err)
    }
}
