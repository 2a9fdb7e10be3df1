//! The Read API: a thin `axum` surface over the engine's stores and the
//! Config Compiler. Every handler is a projection over already-computed
//! state — nothing here runs the state machine, the assessment
//! pipeline, or the compiler's guard rails itself.

pub mod error;
pub mod handlers;
pub mod projection;
mod routes;
pub mod state;

pub use error::ApiError;
pub use state::ApiState;

use axum::Router;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

/// Builds the complete Read API router.
pub fn create_app(state: ApiState) -> Router {
    routes::api_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
