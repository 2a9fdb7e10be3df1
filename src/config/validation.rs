//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " — did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `CopilotConfig`.
///
/// Maintained manually to match the struct hierarchy in
/// `copilot_config.rs`. Any new field added there must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [cluster]
        "cluster",
        "cluster.cluster_id",
        "cluster.namespace",
        "cluster.task_queue",
        // [server]
        "server",
        "server.addr",
        // [database]
        "database",
        "database.url",
        "database.max_connections",
        "database.acquire_timeout_secs",
        // [observation]
        "observation",
        "observation.interval_secs",
        "observation.lease_ttl_secs",
        "observation.signal_window_capacity",
        "observation.scheduled_assessment_interval_secs",
        // [narrator]
        "narrator",
        "narrator.enabled",
        "narrator.triage_model_path",
        "narrator.deep_model_path",
        "narrator.deep_narration_timeout_secs",
        // [signal_source]
        "signal_source",
        "signal_source.prometheus_endpoint",
        // [log_source]
        "log_source",
        "log_source.endpoint",
        "log_source.max_patterns",
        // [knowledge_base]
        "knowledge_base",
        "knowledge_base.endpoint",
        "knowledge_base.max_results",
        // [config_compiler]
        "config_compiler",
        "config_compiler.default_preset",
        "config_compiler.default_modifier",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys — it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed `CopilotConfig`.
///
/// Returns (errors, warnings) — errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::CopilotConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Observation interval: sub-second polling makes no sense against a
    // workflow-orchestration cluster's own reporting cadence.
    if config.observation.interval_secs < 1 {
        errors.push("observation.interval_secs must be >= 1".to_string());
    }
    if config.observation.interval_secs > 3600 {
        warnings.push(ValidationWarning {
            field: "observation.interval_secs".to_string(),
            message: format!(
                "observation.interval_secs = {} is unusually long (over an hour)",
                config.observation.interval_secs
            ),
            suggestion: None,
        });
    }

    if config.database.max_connections > 200 {
        warnings.push(ValidationWarning {
            field: "database.max_connections".to_string(),
            message: format!(
                "database.max_connections = {} is unusually high for a single copilot instance",
                config.database.max_connections
            ),
            suggestion: None,
        });
    }

    if config.knowledge_base.max_results > 50 {
        warnings.push(ValidationWarning {
            field: "knowledge_base.max_results".to_string(),
            message: format!(
                "knowledge_base.max_results = {} will bloat the deep-narrator prompt",
                config.knowledge_base.max_results
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("cluter", "cluster"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_flat() {
        let toml: toml::Value = r#"
            a = 1
            b = "hello"
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"a".to_string()));
        assert!(keys.contains(&"b".to_string()));
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [observation]
            interval_secs = 15
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"observation".to_string()));
        assert!(keys.contains(&"observation.interval_secs".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[observation]
intervl_secs = 15
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("intervl_secs"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("observation.interval_secs")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[cluster]
cluster_id = "prod"

[observation]
interval_secs = 30
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let toml_str = r#"
[typo_section]
some_field = 42
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(!warnings.is_empty(), "Expected warnings for unknown section");
        assert!(warnings.iter().any(|w| w.field.contains("typo_section")));
    }

    #[test]
    fn test_suggest_correction_finds_close_match() {
        let known = known_config_keys();
        let suggestion = suggest_correction("observation.intervl_secs", &known);
        assert_eq!(suggestion.as_deref(), Some("observation.interval_secs"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        let suggestion = suggest_correction("completely_unrelated_garbage_key_xyz", &known);
        assert!(suggestion.is_none());
    }

    #[test]
    fn test_known_keys_covers_all_sections() {
        let known = known_config_keys();
        assert!(known.contains("cluster"));
        assert!(known.contains("server"));
        assert!(known.contains("database"));
        assert!(known.contains("observation"));
        assert!(known.contains("narrator"));
        assert!(known.contains("log_source"));
        assert!(known.contains("knowledge_base"));
        assert!(known.contains("config_compiler"));
        assert!(known.contains("observation.interval_secs"));
        assert!(known.contains("database.max_connections"));
    }

    #[test]
    fn test_physical_range_interval_too_short() {
        let mut config = crate::config::CopilotConfig::default();
        config.observation.interval_secs = 0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(!errors.is_empty(), "interval_secs = 0 should be an error");
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let config = crate::config::CopilotConfig::default();
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty(), "Defaults should produce no errors: {:?}", errors);
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {:?}", warnings);
    }

    #[test]
    fn test_physical_range_high_connection_count_warns() {
        let mut config = crate::config::CopilotConfig::default();
        config.database.max_connections = 500;
        let (_, warnings) = validate_physical_ranges(&config);
        assert!(warnings.iter().any(|w| w.field.contains("max_connections")));
    }
}
