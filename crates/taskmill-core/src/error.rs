//! Error types for Taskmill

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using TaskmillError
pub type Result<T> = std::result::Result<T, TaskmillError>;

/// Main error type for Taskmill operations
#[derive(Debug, Error)]
pub enum TaskmillError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_transparent() {
        let err: TaskmillError = ConfigError::InvalidValue {
            field: "default_task".to_string(),
            message: "unknown task 'x'".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: default_task - unknown task 'x'"
        );
    }
}
