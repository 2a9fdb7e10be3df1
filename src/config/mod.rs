//! Copilot Configuration Module
//!
//! Provides deployment-level configuration loaded from TOML files, the
//! same way the engine's one other source of tunables -- the Config
//! Compiler's parameter registry -- is loaded, but for ambient wiring
//! (cluster identity, store, observation cadence, narrator) rather than
//! health thresholds.
//!
//! ## Loading Order
//!
//! 1. `COPILOT_CONFIG` environment variable (path to TOML file)
//! 2. `copilot.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(CopilotConfig::load());
//!
//! // Anywhere in the codebase:
//! let interval = config::get().observation.interval_secs;
//! ```

mod copilot_config;
pub mod defaults;
mod validation;

pub use copilot_config::*;

use std::sync::OnceLock;

/// Global copilot configuration, initialized once at startup.
static COPILOT_CONFIG: OnceLock<CopilotConfig> = OnceLock::new();

/// Initialize the global copilot configuration.
///
/// Must be called exactly once before any calls to `get()`.
pub fn init(config: CopilotConfig) {
    if COPILOT_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global copilot configuration.
///
/// Panics if `init()` has not been called. This is by design — a missing
/// config is a fatal startup error, not a recoverable condition.
pub fn get() -> &'static CopilotConfig {
    COPILOT_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
///
/// Useful for tests and optional config paths.
pub fn is_initialized() -> bool {
    COPILOT_CONFIG.get().is_some()
}
