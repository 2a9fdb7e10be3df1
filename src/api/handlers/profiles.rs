//! `/profiles*` endpoints: capture listing/lookup, baseline comparison,
//! and baseline designation, over `BehaviourProfileStore`.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::state::ApiState;
use crate::profiles::{compare_profiles, ComparisonThresholds, ProfileComparison, ProfileListFilter};
use crate::types::profile::BehaviourProfile;

#[derive(Debug, Deserialize)]
pub struct ListProfilesQuery {
    pub cluster_id: Option<String>,
    pub namespace: Option<String>,
    pub task_queue: Option<String>,
}

/// `GET /profiles?cluster_id=&namespace=&task_queue=`
pub async fn list_profiles(
    State(state): State<ApiState>,
    Query(q): Query<ListProfilesQuery>,
) -> Result<Json<Vec<BehaviourProfile>>, ApiError> {
    let filter = ProfileListFilter { cluster_id: q.cluster_id, namespace: q.namespace, task_queue: q.task_queue };
    let profiles = state.profiles.list(&filter).await?;
    Ok(Json(profiles))
}

/// `GET /profiles/:id`
pub async fn get_profile(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BehaviourProfile>, ApiError> {
    let profile = state
        .profiles
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("profile {id} not found")))?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub baseline_id: Uuid,
    pub candidate_id: Uuid,
    #[serde(default)]
    pub thresholds: Option<ComparisonThresholds>,
}

/// `POST /profiles/compare` — compares two already-captured profiles;
/// does not persist anything.
pub async fn compare(
    State(state): State<ApiState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<ProfileComparison>, ApiError> {
    let baseline = state
        .profiles
        .get(req.baseline_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("profile {} not found", req.baseline_id)))?;
    let candidate = state
        .profiles
        .get(req.candidate_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("profile {} not found", req.candidate_id)))?;

    let thresholds = req.thresholds.unwrap_or_default();
    Ok(Json(compare_profiles(&baseline, &candidate, &thresholds)))
}

#[derive(Debug, Deserialize)]
pub struct DesignateBaselineRequest {
    pub cluster_id: String,
    pub namespace: Option<String>,
}

/// `POST /profiles/:id/baseline` — atomically designates `id` as the
/// baseline for `(cluster_id, namespace)`.
pub async fn designate_baseline(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DesignateBaselineRequest>,
) -> Result<Json<BehaviourProfile>, ApiError> {
    state
        .profiles
        .designate_baseline(id, &req.cluster_id, req.namespace.as_deref())
        .await?;
    let profile = state
        .profiles
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("profile {id} not found")))?;
    Ok(Json(profile))
}
