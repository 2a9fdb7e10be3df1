//! Per-endpoint handler modules. Each is a thin `axum` handler that
//! extracts the request, delegates to a store or engine module, and
//! wraps the result in JSON — no business logic lives here.

pub mod config;
pub mod profiles;
pub mod status;
