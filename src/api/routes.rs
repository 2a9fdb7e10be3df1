//! Route table for the Read API:
//!
//! - `/status`, `/status/services`, `/status/issues`, `/status/summary`, `/status/timeline`
//! - `/profiles`, `/profiles/:id`, `/profiles/compare`, `/profiles/:id/baseline`
//! - `/config/presets`, `/config/compile`, `/config/explain/:key`

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{config, profiles, status};
use super::state::ApiState;

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(status::get_status))
        .route("/status/services", get(status::get_status_services))
        .route("/status/issues", get(status::get_status_issues))
        .route("/status/summary", get(status::get_status_summary))
        .route("/status/timeline", get(status::get_status_timeline))
        .route("/profiles", get(profiles::list_profiles))
        .route("/profiles/:id", get(profiles::get_profile))
        .route("/profiles/compare", post(profiles::compare))
        .route("/profiles/:id/baseline", post(profiles::designate_baseline))
        .route("/config/presets", get(config::list_presets))
        .route("/config/compile", post(config::compile))
        .route("/config/explain/:key", get(config::explain_key))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::store::{AssessmentStore, AssessmentStoreError};
    use crate::config_compiler::{modifiers::build_default_modifiers, presets::build_default_presets, registry::build_default_registry, ConfigCompiler};
    use crate::profiles::{BehaviourProfileStore, ProfileListFilter, ProfileStoreError};
    use crate::types::assessment::Assessment;
    use crate::types::profile::BehaviourProfile;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Utc};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct EmptyAssessmentStore;

    #[async_trait]
    impl AssessmentStore for EmptyAssessmentStore {
        async fn persist(&self, _assessment: &Assessment) -> Result<(), AssessmentStoreError> {
            Ok(())
        }
        async fn latest(&self) -> Result<Option<Assessment>, AssessmentStoreError> {
            Ok(None)
        }
        async fn timeline(&self, _since: DateTime<Utc>, _until: DateTime<Utc>) -> Result<Vec<Assessment>, AssessmentStoreError> {
            Ok(vec![])
        }
    }

    struct EmptyProfileStore;

    #[async_trait]
    impl BehaviourProfileStore for EmptyProfileStore {
        async fn save(&self, _profile: &BehaviourProfile) -> Result<(), ProfileStoreError> {
            Ok(())
        }
        async fn get(&self, _id: Uuid) -> Result<Option<BehaviourProfile>, ProfileStoreError> {
            Ok(None)
        }
        async fn list(&self, _filter: &ProfileListFilter) -> Result<Vec<BehaviourProfile>, ProfileStoreError> {
            Ok(vec![])
        }
        async fn get_baseline(&self, _cluster_id: &str, _namespace: Option<&str>) -> Result<Option<BehaviourProfile>, ProfileStoreError> {
            Ok(None)
        }
        async fn designate_baseline(&self, _profile_id: Uuid, _cluster_id: &str, _namespace: Option<&str>) -> Result<(), ProfileStoreError> {
            Ok(())
        }
    }

    fn test_state() -> ApiState {
        ApiState {
            assessments: Arc::new(EmptyAssessmentStore),
            profiles: Arc::new(EmptyProfileStore),
            compiler: Arc::new(ConfigCompiler::new(build_default_registry(), build_default_presets(), build_default_modifiers())),
        }
    }

    #[tokio::test]
    async fn status_with_no_assessment_yet_returns_404() {
        let app = api_routes(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn presets_endpoint_lists_builtin_presets() {
        let app = api_routes(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/config/presets").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_profile_returns_404() {
        let app = api_routes(test_state());
        let resp = app
            .oneshot(Request::builder().uri(format!("/profiles/{}", Uuid::new_v4())).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
