//! SDK and Platform adapters render a compiled `ConfigProfile` into
//! language- or platform-specific artifacts. The reference implementation
//! discovers these via `importlib.metadata` entry points so third parties
//! can ship their own; Rust has no runtime plugin loader, so adapters here
//! are a fixed, compiled-in registry instead.

pub mod platform;
pub mod sdk;

use super::model::{ConfigProfile, RenderedSnippet};

pub trait ConfigAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn render(&self, profile: &ConfigProfile) -> Vec<RenderedSnippet>;
}
