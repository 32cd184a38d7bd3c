//! Aggregation and logging configuration.
//!
//! # Responsibility
//! - Describe aggregation policies as plain serde data.
//! - Resolve logging settings from process environment.
//!
//! # Invariants
//! - Missing fields fall back to defaults that match the historical
//!   behavior: first-seen tie-break and last-writer-wins keyed merges.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "EXTPOINT_LOG_LEVEL";
/// Environment variable naming an absolute log directory.
pub const ENV_LOG_DIR: &str = "EXTPOINT_LOG_DIR";

/// How `collect_sorted` treats distinct items sharing one name key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTieBreak {
    /// Keep all of them, in the order providers produced them.
    #[default]
    FirstSeen,
    /// Keep only the first one seen; later same-named items are dropped.
    CollapseByName,
}

/// How keyed aggregation treats two providers claiming one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyConflictPolicy {
    /// Later provider in registry order replaces the earlier claim.
    #[default]
    LastWriterWins,
    /// Abort the aggregation with an error.
    Reject,
}

/// Aggregation policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    pub name_tie_break: NameTieBreak,
    pub key_conflict_policy: KeyConflictPolicy,
}

impl AggregationConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    /// File logging is enabled only when a directory is configured.
    pub log_dir: Option<String>,
}

impl LoggingConfig {
    /// Reads `EXTPOINT_LOG_LEVEL` and `EXTPOINT_LOG_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup(ENV_LOG_LEVEL)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default_log_level().to_string());
        let log_dir = lookup(ENV_LOG_DIR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self { level, log_dir }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid aggregation config: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{
        AggregationConfig, ConfigError, KeyConflictPolicy, LoggingConfig, NameTieBreak,
        ENV_LOG_DIR, ENV_LOG_LEVEL,
    };
    use crate::logging::default_log_level;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AggregationConfig::from_json_str("{}").expect("empty object should parse");
        assert_eq!(config, AggregationConfig::default());
        assert_eq!(config.name_tie_break, NameTieBreak::FirstSeen);
        assert_eq!(config.key_conflict_policy, KeyConflictPolicy::LastWriterWins);
    }

    #[test]
    fn parses_snake_case_policies() {
        let config = AggregationConfig::from_json_str(
            r#"{"name_tie_break":"collapse_by_name","key_conflict_policy":"reject"}"#,
        )
        .expect("valid config should parse");
        assert_eq!(config.name_tie_break, NameTieBreak::CollapseByName);
        assert_eq!(config.key_conflict_policy, KeyConflictPolicy::Reject);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = AggregationConfig::from_json_str(r#"{"retry":3}"#)
            .expect_err("unknown field must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn logging_config_reads_overrides_and_falls_back() {
        let config = LoggingConfig::from_lookup(|key| match key {
            ENV_LOG_LEVEL => Some(" warn ".to_string()),
            ENV_LOG_DIR => Some("/var/log/extpoint".to_string()),
            _ => None,
        });
        assert_eq!(config.level, "warn");
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/extpoint"));

        let fallback = LoggingConfig::from_lookup(|_| Some("   ".to_string()));
        assert_eq!(fallback.level, default_log_level());
        assert!(fallback.log_dir.is_none());
    }
}
