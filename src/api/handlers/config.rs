//! `/config*` endpoints: the Config Compiler's read surface — list
//! presets, compile a profile, explain a single registry key.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::state::ApiState;
use crate::config_compiler::{CompilationResult, KeyExplanation, ParameterOverrides, PresetSummary};

/// `GET /config/presets`
pub async fn list_presets(State(state): State<ApiState>) -> Json<Vec<PresetSummary>> {
    Json(state.compiler.list_presets())
}

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    pub preset: String,
    pub modifier: Option<String>,
    #[serde(default)]
    pub overrides: ParameterOverrides,
}

#[derive(Debug, Serialize)]
pub struct CompileResponse {
    #[serde(flatten)]
    pub result: CompilationResult,
}

/// `POST /config/compile` — resolves a preset (+ optional modifier and
/// overrides) through the guard rails and emits every compiled artifact.
/// A guard rail error aborts the whole compile, per
/// [`crate::config_compiler::CompilationError::GuardRailsFailed`] — there
/// is no partial result to return.
pub async fn compile(
    State(state): State<ApiState>,
    Json(req): Json<CompileRequest>,
) -> Result<Json<CompileResponse>, ApiError> {
    let result = state.compiler.compile(&req.preset, req.modifier.as_deref(), &req.overrides)?;
    Ok(Json(CompileResponse { result }))
}

/// `GET /config/explain/:key`
pub async fn explain_key(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<Json<KeyExplanation>, ApiError> {
    Ok(Json(state.compiler.explain_key(&key)?))
}
