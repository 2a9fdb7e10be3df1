//! Concrete HTTP-backed implementations of the observation and
//! assessment seams: Prometheus for signals, Loki for curated log
//! patterns, and a generic knowledge-base HTTP client for retrieval.
//! Grounded in `fleet::client::FleetClient`'s `reqwest::Client` builder
//! and error-mapping shape, retargeted from hub-sync to metrics/log
//! scraping.

pub mod knowledge_base;
pub mod loki;
pub mod prometheus;

pub use knowledge_base::HttpKnowledgeBase;
pub use loki::{LokiLogSource, NoOpLogSource};
pub use prometheus::PrometheusSignalSource;
