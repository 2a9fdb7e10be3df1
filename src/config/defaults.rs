//! System-wide default constants not otherwise owned by `CopilotConfig`
//! or a compiled profile.
//!
//! Centralises magic numbers scattered elsewhere. Grouped by subsystem
//! for easy discovery.

// ============================================================================
// Observation Loop
// ============================================================================

/// How many consecutive snapshots `ObservationLoop` keeps in its signal
/// window ring buffer when no `CopilotConfig` override is supplied.
pub const DEFAULT_SIGNAL_WINDOW_CAPACITY: usize = 10;

/// Default observation interval (seconds) when no config is loaded yet
/// (used by `#[cfg(test)]` fixtures and the CLI's `--help` text).
pub const DEFAULT_OBSERVATION_INTERVAL_SECS: u64 = 30;

// ============================================================================
// Assessment Pipeline
// ============================================================================

/// Maximum log patterns requested from the log source per deep
/// narration call.
pub const DEFAULT_LOG_PATTERN_LIMIT: usize = 20;

/// Maximum knowledge-base snippets requested per deep narration call.
pub const DEFAULT_KNOWLEDGE_BASE_MAX_RESULTS: usize = 5;

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client timeout for log-source / knowledge-base fetch adapters (seconds).
pub const FETCH_HTTP_TIMEOUT_SECS: u64 = 30;

/// Timeout for a single narrator inference call before it is treated as
/// a failure and the pipeline falls back (seconds).
pub const NARRATOR_INFERENCE_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Read API
// ============================================================================

/// Default page size for `/status/timeline` when the caller does not
/// specify a window.
pub const DEFAULT_TIMELINE_WINDOW_HOURS: i64 = 24;
