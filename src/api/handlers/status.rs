//! `/status*` endpoints: the current health projection, a per-service
//! breakdown, open issues, a compact summary, and a timeline window —
//! the read surface over `AssessmentStore`.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::projection::effective_health_state;
use crate::api::state::ApiState;
use crate::config::defaults::DEFAULT_TIMELINE_WINDOW_HOURS;
use crate::types::assessment::{Assessment, Issue};
use crate::types::health::{Bottleneck, HealthState};
use crate::types::signals::{FrontendSignals, HistorySignals, MatchingSignals, PersistenceSignals};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub health_state: HealthState,
    pub stored_health_state: HealthState,
    pub bottleneck: Bottleneck,
    pub consecutive_critical_count: u32,
    pub assessed_at: DateTime<Utc>,
    pub summary: String,
}

/// `GET /status` — applies the idle-override projection.
pub async fn get_status(State(state): State<ApiState>) -> Result<Json<StatusResponse>, ApiError> {
    let assessment = latest_or_error(&state).await?;
    Ok(Json(StatusResponse {
        health_state: effective_health_state(&assessment),
        stored_health_state: assessment.health_state,
        bottleneck: assessment.bottleneck,
        consecutive_critical_count: assessment.consecutive_critical_count,
        assessed_at: assessment.timestamp,
        summary: assessment.summary,
    }))
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub name: &'static str,
    pub healthy: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub health_state: HealthState,
    pub services: Vec<ServiceStatus>,
}

/// `GET /status/services` — a per-service breakdown of the latest
/// snapshot's primary signal groups that map onto orchestration-cluster
/// services (frontend, matching, history, persistence).
pub async fn get_status_services(State(state): State<ApiState>) -> Result<Json<ServicesResponse>, ApiError> {
    let assessment = latest_or_error(&state).await?;
    let p = &assessment.primary_snapshot;

    let services = vec![
        frontend_status(&p.frontend),
        matching_status(&p.matching),
        history_status(&p.history),
        persistence_status(&p.persistence),
    ];

    Ok(Json(ServicesResponse { health_state: effective_health_state(&assessment), services }))
}

fn frontend_status(s: &FrontendSignals) -> ServiceStatus {
    let healthy = s.error_rate_per_sec < 1.0 && s.latency_p99_ms < 1000.0;
    ServiceStatus {
        name: "frontend",
        healthy,
        detail: format!("error_rate={:.3}/s p99={:.0}ms", s.error_rate_per_sec, s.latency_p99_ms),
    }
}

fn matching_status(s: &MatchingSignals) -> ServiceStatus {
    let healthy = s.workflow_backlog_age_sec < 30.0 && s.activity_backlog_age_sec < 30.0;
    ServiceStatus {
        name: "matching",
        healthy,
        detail: format!(
            "workflow_backlog_age={:.0}s activity_backlog_age={:.0}s",
            s.workflow_backlog_age_sec, s.activity_backlog_age_sec
        ),
    }
}

fn history_status(s: &HistorySignals) -> ServiceStatus {
    let healthy = s.backlog_age_sec < 30.0 && s.shard_churn_rate_per_sec < 1.0;
    ServiceStatus {
        name: "history",
        healthy,
        detail: format!("backlog_age={:.0}s shard_churn={:.3}/s", s.backlog_age_sec, s.shard_churn_rate_per_sec),
    }
}

fn persistence_status(s: &PersistenceSignals) -> ServiceStatus {
    let healthy = s.error_rate_per_sec < 1.0 && s.latency_p99_ms < 1000.0;
    ServiceStatus {
        name: "persistence",
        healthy,
        detail: format!("error_rate={:.3}/s p99={:.0}ms", s.error_rate_per_sec, s.latency_p99_ms),
    }
}

/// `GET /status/issues` — the narrated issues on the latest assessment.
pub async fn get_status_issues(State(state): State<ApiState>) -> Result<Json<Vec<Issue>>, ApiError> {
    let assessment = latest_or_error(&state).await?;
    Ok(Json(assessment.issues))
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub health_state: HealthState,
    pub bottleneck: Bottleneck,
    pub open_issue_count: usize,
    pub consecutive_critical_count: u32,
    pub suggested_actions: Vec<String>,
}

/// `GET /status/summary` — compact dashboard-tile view.
pub async fn get_status_summary(State(state): State<ApiState>) -> Result<Json<SummaryResponse>, ApiError> {
    let assessment = latest_or_error(&state).await?;
    Ok(Json(SummaryResponse {
        health_state: effective_health_state(&assessment),
        bottleneck: assessment.bottleneck,
        open_issue_count: assessment.issues.len(),
        consecutive_critical_count: assessment.consecutive_critical_count,
        suggested_actions: assessment.suggested_actions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub hours: Option<i64>,
}

/// `GET /status/timeline?hours=N` — assessments in the trailing window,
/// newest last. Defaults to [`DEFAULT_TIMELINE_WINDOW_HOURS`].
pub async fn get_status_timeline(
    State(state): State<ApiState>,
    Query(q): Query<TimelineQuery>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    let hours = q.hours.unwrap_or(DEFAULT_TIMELINE_WINDOW_HOURS).max(1);
    let until = Utc::now();
    let since = until - Duration::hours(hours);
    let assessments = state.assessments.timeline(since, until).await?;
    Ok(Json(assessments))
}

async fn latest_or_error(state: &ApiState) -> Result<Assessment, ApiError> {
    state
        .assessments
        .latest()
        .await?
        .ok_or_else(|| ApiError::not_found("no assessment has been recorded yet"))
}
