use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::plan_cache::PlanCacheConfig;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Engine configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Domain model YAML loaded at startup
    pub model_path: Option<PathBuf>,

    /// Whether compiled plans are cached
    pub plan_cache_enabled: bool,

    /// Maximum number of cached plans (1-1000000)
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Plan cache size must be between 1 and 1000000"
    ))]
    pub plan_cache_max_entries: usize,

    /// Default log filter when RUST_LOG is unset
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cache = PlanCacheConfig::default();
        Self {
            model_path: None,
            plan_cache_enabled: cache.enabled,
            plan_cache_max_entries: cache.max_entries,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            model_path: env::var("FETCHPLAN_MODEL").ok().map(PathBuf::from),
            plan_cache_enabled: parse_env_var(
                "FETCHPLAN_PLAN_CACHE_ENABLED",
                &defaults.plan_cache_enabled.to_string(),
            )?,
            plan_cache_max_entries: parse_env_var(
                "FETCHPLAN_PLAN_CACHE_MAX_ENTRIES",
                &defaults.plan_cache_max_entries.to_string(),
            )?,
            log_level: env::var("FETCHPLAN_LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Settings for the shared plan cache
    pub fn plan_cache(&self) -> PlanCacheConfig {
        PlanCacheConfig {
            enabled: self.plan_cache_enabled,
            max_entries: self.plan_cache_max_entries,
        }
    }
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "off" | "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
        _ => {
            let mut error = ValidationError::new("log_level");
            error.message = Some("Log level must be one of off, error, warn, info, debug, trace".into());
            Err(error)
        }
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
