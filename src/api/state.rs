//! Shared handler state: trait objects for every store the Read API
//! reads from, plus the Config Compiler. Nothing else is threaded
//! through `axum`'s `State` extractor — handlers reach persistence and
//! compilation only through these, never by constructing their own pool.

use std::sync::Arc;

use crate::assessment::store::AssessmentStore;
use crate::config_compiler::ConfigCompiler;
use crate::profiles::BehaviourProfileStore;

#[derive(Clone)]
pub struct ApiState {
    pub assessments: Arc<dyn AssessmentStore>,
    pub profiles: Arc<dyn BehaviourProfileStore>,
    pub compiler: Arc<ConfigCompiler>,
}
