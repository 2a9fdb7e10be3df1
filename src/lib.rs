//! SRE Copilot: a deterministic health-assessment engine for a
//! Temporal-like workflow-orchestration cluster backed by DSQL
//! persistence.
//!
//! ## Architecture
//!
//! - **Health State Machine** (`health`): pure, deterministic
//!   Happy/Stressed/Critical evaluation over primary signals only.
//!   "Rules decide" — no narrator or amplifier input ever reaches it.
//! - **Assessment Pipeline** (`assessment`): triage narration, optional
//!   deep narration, knowledge-base retrieval, and persistence — "AI
//!   explains" a state the rules already decided.
//! - **Observation** (`observation`): the three fixed-logical-id
//!   long-running tasks (Observation Loop, Log Watcher, Scheduled
//!   Assessment) that drive the pipeline off a live signal source.
//! - **Behaviour Profiles** (`profiles`): time-windowed config+telemetry
//!   snapshots, compared and correlated for drift detection.
//! - **Config Compiler** (`config_compiler`): scale presets and workload
//!   modifiers resolved into guard-railed DSQL/SDK tuning profiles.
//! - **Read API** (`api`): the HTTP surface over all of the above.
//! - **Fetch Adapters** (`fetch`): Prometheus, Loki, and knowledge-base
//!   HTTP clients implementing the observation/assessment seams.

pub mod api;
pub mod assessment;
pub mod config;
pub mod config_compiler;
pub mod fetch;
pub mod health;
pub mod llm;
pub mod observation;
pub mod profiles;
pub mod store;
pub mod types;

pub use config::CopilotConfig;
