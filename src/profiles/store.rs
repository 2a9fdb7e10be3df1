//! The seam between the profile engine and wherever profiles actually
//! live: full JSON in an object store keyed by id, a metadata row in the
//! relational store for listing/filtering — see spec §3 and §6. Mirrors
//! [`crate::observation::traits`]'s pattern of keeping persistence behind
//! a trait so engine logic never depends on `sqlx`/object-store types
//! directly.

use async_trait::async_trait;

use crate::types::profile::BehaviourProfile;

#[derive(Debug, thiserror::Error)]
pub enum ProfileStoreError {
    #[error("object store error: {0}")]
    ObjectStore(String),
    #[error("metadata store error: {0}")]
    Metadata(String),
    #[error("profile {0} not found")]
    NotFound(uuid::Uuid),
}

/// Filters for listing profiles on the Read API's `/profiles` endpoint.
#[derive(Debug, Clone, Default)]
pub struct ProfileListFilter {
    pub cluster_id: Option<String>,
    pub namespace: Option<String>,
    pub task_queue: Option<String>,
}

#[async_trait]
pub trait BehaviourProfileStore: Send + Sync {
    async fn save(&self, profile: &BehaviourProfile) -> Result<(), ProfileStoreError>;

    async fn get(&self, id: uuid::Uuid) -> Result<Option<BehaviourProfile>, ProfileStoreError>;

    async fn list(&self, filter: &ProfileListFilter) -> Result<Vec<BehaviourProfile>, ProfileStoreError>;

    /// The profile with `is_baseline = true` for `(cluster_id, namespace)`,
    /// if one has been designated.
    async fn get_baseline(
        &self,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<Option<BehaviourProfile>, ProfileStoreError>;

    /// Atomically clears any existing baseline for `(cluster_id,
    /// namespace)` and sets `profile_id` as the new one — Testable
    /// Property / Scenario G. A concrete implementation backed by a
    /// relational store must do this inside a single transaction.
    async fn designate_baseline(
        &self,
        profile_id: uuid::Uuid,
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<(), ProfileStoreError>;
}
