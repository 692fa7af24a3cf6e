//! Graph configuration with validation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Graph configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Path of the backing database file; `None` opens an in-memory
    /// database (useful for tests)
    pub database_path: Option<PathBuf>,

    /// Schema name used for labels without an explicit schema qualifier
    #[validate(length(min = 1, message = "Default schema cannot be empty"))]
    pub default_schema: String,

    /// How long a statement waits on a locked database before failing, in
    /// milliseconds
    #[validate(range(
        min = 0,
        max = 600_000,
        message = "Busy timeout must be between 0 and 600000 ms"
    ))]
    pub busy_timeout_ms: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            default_schema: "public".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

impl GraphConfig {
    /// Create configuration from environment variables with validation
    ///
    /// Reads `SQLGRAPH_DB_PATH` (empty or `:memory:` for in-memory),
    /// `SQLGRAPH_DEFAULT_SCHEMA` and `SQLGRAPH_BUSY_TIMEOUT_MS`, honoring a
    /// `.env` file when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let database_path = match env::var("SQLGRAPH_DB_PATH") {
            Ok(path) if path.is_empty() || path == ":memory:" => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => None,
        };
        let config = Self {
            database_path,
            default_schema: env::var("SQLGRAPH_DEFAULT_SCHEMA")
                .unwrap_or_else(|_| "public".to_string()),
            busy_timeout_ms: parse_env_var("SQLGRAPH_BUSY_TIMEOUT_MS", "5000")?,
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

    /// In-memory configuration with the given default schema.
    pub fn in_memory(default_schema: impl Into<String>) -> Self {
        Self {
            database_path: None,
            default_schema: default_schema.into(),
            ..Default::default()
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
