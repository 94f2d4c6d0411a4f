//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_manifest(config)?;
    validate_tasks(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_manifest(config: &Config) -> Result<()> {
    if config.manifest.path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "manifest.path".to_string(),
            message: "path cannot be empty".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_tasks(config: &Config) -> Result<()> {
    if !config.tasks.is_empty() {
        debug!(count = config.tasks.len(), "validating tasks");
    }
    for (name, task) in &config.tasks {
        if task.command.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks.{}.command", name),
                message: "command cannot be empty".to_string(),
            }
            .into());
        }

        for dep in &task.depends_on {
            if !config.tasks.contains_key(dep) {
                return Err(ConfigError::InvalidValue {
                    field: format!("tasks.{}.depends_on", name),
                    message: format!("unknown task '{}'", dep),
                }
                .into());
            }
        }
    }

    Ok(())
}
