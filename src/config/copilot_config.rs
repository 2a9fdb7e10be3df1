//! Copilot Configuration - all service-level settings as operator-tunable
//! TOML values, mirroring the per-well config the engine layer replaced.
//!
//! Every value here is ambient wiring (which cluster to watch, where the
//! store lives, how often to observe) -- not a health threshold. Health
//! thresholds are produced by the Config Compiler from a scale preset and
//! never hand-edited here.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Config Provenance - tracks which keys the user explicitly set
// ============================================================================

/// Tracks which configuration keys were explicitly present in the user's
/// TOML file, so auto-detection or CLI overrides can tell an explicit
/// choice apart from an untouched default.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvenance {
    pub explicit_keys: HashSet<String>,
}

impl ConfigProvenance {
    pub fn is_user_set(&self, dotted_key: &str) -> bool {
        self.explicit_keys.contains(dotted_key)
    }
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one copilot deployment (one Temporal-like
/// cluster, one DSQL-backed store).
///
/// Load with `CopilotConfig::load()`, which searches:
/// 1. `$COPILOT_CONFIG` env var
/// 2. `./copilot.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotConfig {
    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub observation: ObservationConfig,

    #[serde(default)]
    pub narrator: NarratorConfig,

    #[serde(default)]
    pub signal_source: SignalSourceConfig,

    #[serde(default)]
    pub log_source: LogSourceConfig,

    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    #[serde(default)]
    pub config_compiler: ConfigCompilerDefaults,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            observation: ObservationConfig::default(),
            narrator: NarratorConfig::default(),
            signal_source: SignalSourceConfig::default(),
            log_source: LogSourceConfig::default(),
            knowledge_base: KnowledgeBaseConfig::default(),
            config_compiler: ConfigCompilerDefaults::default(),
        }
    }
}

impl CopilotConfig {
    /// Load configuration using the standard search order:
    /// 1. `$COPILOT_CONFIG` environment variable
    /// 2. `./copilot.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        let (config, _provenance) = Self::load_with_provenance();
        config
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let (config, _provenance) = Self::load_from_file_with_provenance(path)?;
        Ok(config)
    }

    /// Load from a specific TOML file path, also returning provenance so
    /// callers can distinguish user-set values from defaults.
    pub fn load_from_file_with_provenance(
        path: &Path,
    ) -> Result<(Self, ConfigProvenance), ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        let typo_warnings = super::validation::validate_unknown_keys(&contents);
        for w in &typo_warnings {
            warn!("{}", w);
        }

        let provenance = ConfigProvenance {
            explicit_keys: super::validation::walk_toml_keys(
                &contents
                    .parse::<toml::Value>()
                    .unwrap_or(toml::Value::Table(Default::default())),
                "",
            )
            .into_iter()
            .collect(),
        };

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok((config, provenance))
    }

    /// Load configuration using standard search order, returning provenance.
    pub fn load_with_provenance() -> (Self, ConfigProvenance) {
        if let Ok(path) = std::env::var("COPILOT_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file_with_provenance(&p) {
                    Ok((config, provenance)) => {
                        info!(path = %p.display(), cluster = %config.cluster.cluster_id, "Loaded copilot config from COPILOT_CONFIG");
                        return (config, provenance);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from COPILOT_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "COPILOT_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("copilot.toml");
        if local.exists() {
            match Self::load_from_file_with_provenance(&local) {
                Ok((config, provenance)) => {
                    info!(cluster = %config.cluster.cluster_id, "Loaded copilot config from ./copilot.toml");
                    return (config, provenance);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./copilot.toml, using defaults");
                }
            }
        }

        info!("No copilot.toml found — using built-in defaults");
        (Self::default(), ConfigProvenance::default())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Copilot config saved");
        Ok(())
    }

    /// Validate for internal consistency. Rejects anything that would
    /// make the observation loop or store wiring nonsensical at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.cluster.cluster_id.trim().is_empty() {
            errors.push("cluster.cluster_id must not be empty".to_string());
        }

        if self.database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be > 0".to_string());
        }

        if self.observation.interval_secs == 0 {
            errors.push("observation.interval_secs must be > 0".to_string());
        }
        if self.observation.lease_ttl_secs == 0 {
            errors.push("observation.lease_ttl_secs must be > 0".to_string());
        }
        if self.observation.lease_ttl_secs < self.observation.interval_secs {
            errors.push(format!(
                "observation.lease_ttl_secs ({}) must be >= observation.interval_secs ({}) or the lease expires mid-tick",
                self.observation.lease_ttl_secs, self.observation.interval_secs
            ));
        }
        if self.observation.signal_window_capacity == 0 {
            errors.push("observation.signal_window_capacity must be > 0".to_string());
        }

        if self.narrator.enabled && self.narrator.deep_narration_timeout_secs == 0 {
            errors.push("narrator.deep_narration_timeout_secs must be > 0 when narrator.enabled".to_string());
        }

        if self.knowledge_base.max_results == 0 {
            errors.push("knowledge_base.max_results must be > 0".to_string());
        }

        let known_presets = ["starter", "standard", "scale", "extreme"];
        if !known_presets.contains(&self.config_compiler.default_preset.as_str()) {
            errors.push(format!(
                "config_compiler.default_preset '{}' is not one of {known_presets:?}",
                self.config_compiler.default_preset
            ));
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Cluster Identity
// ============================================================================

/// Identifies which cluster/namespace/task-queue this deployment watches.
/// Not used for health logic directly -- `cluster_id`/`namespace` are
/// carried into every persisted record and behaviour profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default = "default_cluster_id")]
    pub cluster_id: String,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub task_queue: Option<String>,
}

fn default_cluster_id() -> String {
    "default".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_id: default_cluster_id(),
            namespace: None,
            task_queue: None,
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// Read API HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `COPILOT_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Database Config
// ============================================================================

/// DSQL/Postgres connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Can be overridden by `DATABASE_URL` env var.
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    "postgres://localhost/copilot".to_string()
}
fn default_max_connections() -> u32 {
    20
}
fn default_acquire_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

// ============================================================================
// Observation Loop Config
// ============================================================================

/// Timing parameters for the Observation Loop and the Scheduled
/// Assessment fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationConfig {
    /// How often the loop polls signal sources (seconds).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Workflow lease TTL (seconds). Must be >= `interval_secs`.
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,

    /// Ring buffer capacity for the signal window.
    #[serde(default = "default_signal_window_capacity")]
    pub signal_window_capacity: usize,

    /// Scheduled-assessment fallback interval, independent of state
    /// changes (seconds). 3600 = hourly.
    #[serde(default = "default_scheduled_assessment_interval_secs")]
    pub scheduled_assessment_interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    30
}
fn default_lease_ttl_secs() -> u64 {
    60
}
fn default_signal_window_capacity() -> usize {
    10
}
fn default_scheduled_assessment_interval_secs() -> u64 {
    3600
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            lease_ttl_secs: default_lease_ttl_secs(),
            signal_window_capacity: default_signal_window_capacity(),
            scheduled_assessment_interval_secs: default_scheduled_assessment_interval_secs(),
        }
    }
}

// ============================================================================
// Narrator Config
// ============================================================================

/// Two-stage LLM narrator wiring. Disabling `enabled` degrades every
/// assessment to its triage-failure fallback summary -- classifications
/// are unaffected either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarratorConfig {
    #[serde(default = "default_narrator_enabled")]
    pub enabled: bool,

    /// Local model path for the cheap triage narrator.
    #[serde(default)]
    pub triage_model_path: Option<String>,

    /// Local model path for the deep narrator, invoked only on
    /// `NeedsDeepExplanation`.
    #[serde(default)]
    pub deep_model_path: Option<String>,

    #[serde(default = "default_deep_narration_timeout_secs")]
    pub deep_narration_timeout_secs: u64,
}

fn default_narrator_enabled() -> bool {
    true
}
fn default_deep_narration_timeout_secs() -> u64 {
    120
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_narrator_enabled(),
            triage_model_path: None,
            deep_model_path: None,
            deep_narration_timeout_secs: default_deep_narration_timeout_secs(),
        }
    }
}

// ============================================================================
// Log Source Config
// ============================================================================

/// Where to fetch recent log patterns from for deep narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSourceConfig {
    /// Loki/similar query endpoint. `None` disables log-pattern fetch
    /// (the deep narrator runs with an empty pattern list).
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_log_max_patterns")]
    pub max_patterns: usize,
}

fn default_log_max_patterns() -> usize {
    20
}

impl Default for LogSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_patterns: default_log_max_patterns(),
        }
    }
}

// ============================================================================
// Knowledge Base Config
// ============================================================================

/// Where to retrieve runbook/KB snippets from for deep narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_kb_max_results")]
    pub max_results: usize,
}

fn default_kb_max_results() -> usize {
    5
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_results: default_kb_max_results(),
        }
    }
}

// ============================================================================
// Config Compiler Defaults
// ============================================================================

/// Which scale preset/modifier `copilotd` compiles a profile from at
/// startup, before any operator runs `copilot-config compile` by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCompilerDefaults {
    #[serde(default = "default_preset")]
    pub default_preset: String,

    #[serde(default)]
    pub default_modifier: Option<String>,
}

fn default_preset() -> String {
    "standard".to_string()
}

impl Default for ConfigCompilerDefaults {
    fn default() -> Self {
        Self {
            default_preset: default_preset(),
            default_modifier: None,
        }
    }
}

// ============================================================================
// Signal Source Config
// ============================================================================

/// Where the Observation Loop and Scheduled Assessment fetch primary,
/// worker, and amplifier signals from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSourceConfig {
    #[serde(default = "default_prometheus_endpoint")]
    pub prometheus_endpoint: String,
}

fn default_prometheus_endpoint() -> String {
    "http://localhost:9090".to_string()
}

impl Default for SignalSourceConfig {
    fn default() -> Self {
        Self { prometheus_endpoint: default_prometheus_endpoint() }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = CopilotConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: CopilotConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.cluster.cluster_id, "default");
        assert_eq!(config.observation.interval_secs, 30);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.config_compiler.default_preset, "standard");
    }

    #[test]
    fn partial_toml_override() {
        let toml_str = r#"
[cluster]
cluster_id = "prod-us-east"
namespace = "payments"

[observation]
interval_secs = 15
lease_ttl_secs = 30
"#;
        let config: CopilotConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.cluster.cluster_id, "prod-us-east");
        assert_eq!(config.cluster.namespace.as_deref(), Some("payments"));
        assert_eq!(config.observation.interval_secs, 15);
        // Non-overridden values retain defaults
        assert_eq!(config.database.max_connections, 20);
    }

    #[test]
    fn validation_catches_empty_cluster_id() {
        let mut config = CopilotConfig::default();
        config.cluster.cluster_id = String::new();
        let result = config.validate();
        assert!(result.is_err());
        if let Err(ConfigError::Validation(errors)) = result {
            assert!(errors.iter().any(|e| e.contains("cluster_id")));
        }
    }

    #[test]
    fn validation_catches_lease_shorter_than_interval() {
        let mut config = CopilotConfig::default();
        config.observation.interval_secs = 60;
        config.observation.lease_ttl_secs = 30;
        let result = config.validate();
        assert!(result.is_err(), "lease shorter than the interval should fail");
    }

    #[test]
    fn validation_catches_unknown_preset() {
        let mut config = CopilotConfig::default();
        config.config_compiler.default_preset = "bespoke".to_string();
        let result = config.validate();
        assert!(result.is_err());
    }

    #[test]
    fn roundtrip_toml() {
        let original = CopilotConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: CopilotConfig =
            toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original.cluster.cluster_id, roundtripped.cluster.cluster_id);
        assert_eq!(
            original.observation.interval_secs,
            roundtripped.observation.interval_secs
        );
    }

    #[test]
    fn all_fields_serialize() {
        let config = CopilotConfig::default();
        let toml_str = config.to_toml().expect("serialization should work");
        assert!(toml_str.contains("[cluster]"));
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[observation]"));
        assert!(toml_str.contains("[narrator]"));
        assert!(toml_str.contains("[config_compiler]"));
    }

    // ========================================================================
    // ConfigProvenance tests
    // ========================================================================

    #[test]
    fn provenance_tracks_explicit_keys() {
        let toml_str = r#"
[observation]
interval_secs = 15
"#;
        let value: toml::Value = toml_str.parse().unwrap();
        let keys: std::collections::HashSet<String> =
            super::super::validation::walk_toml_keys(&value, "").into_iter().collect();
        let provenance = ConfigProvenance { explicit_keys: keys };

        assert!(provenance.is_user_set("observation.interval_secs"));
        assert!(provenance.is_user_set("observation"));
        assert!(!provenance.is_user_set("database.url"));
    }

    #[test]
    fn provenance_default_has_zero_keys() {
        let provenance = ConfigProvenance::default();
        assert!(provenance.explicit_keys.is_empty());
    }
}
