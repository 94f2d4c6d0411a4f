//! Error types for task registration and execution

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors raised while building or running the task graph
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// No task registered under this name
    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    /// Two tasks registered under the same name
    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    /// Two tasks declare the same target file
    #[error("Target {} is produced by both '{first}' and '{second}'", target.display())]
    DuplicateTarget {
        target: PathBuf,
        first: String,
        second: String,
    },

    /// A task depends on a name that is not registered
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    /// The dependency closure contains a cycle
    #[error("Cyclic dependency detected among tasks: {0}")]
    CyclicDependency(String),

    /// Filesystem failure other than "not found"
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The task's action returned an error
    #[error("Task '{task}' failed: {source}")]
    Action {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// The task's up-to-date predicate returned an error
    #[error("Up-to-date check for '{task}' failed: {source}")]
    Predicate {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// A dependency failed, so this task could not run
    #[error("Task '{task}' aborted: dependency '{dependency}' failed")]
    Dependency {
        task: String,
        dependency: String,
        #[source]
        source: Arc<TaskError>,
    },

    /// Failure recorded by an earlier run of the same task in this session
    #[error(transparent)]
    Shared(Arc<TaskError>),
}

impl TaskError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Walk through dependency wrappers to the error that started the failure
    pub fn root_cause(&self) -> &TaskError {
        match self {
            Self::Dependency { source, .. } | Self::Shared(source) => source.root_cause(),
            other => other,
        }
    }
}

/// Errors loading or saving the file-change manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// IO error
    #[error("Manifest IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("Manifest serialization error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Manifest written by an incompatible version
    #[error("Unsupported manifest version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_dependency_chain() {
        let action = Arc::new(TaskError::Action {
            task: "compile".to_string(),
            source: anyhow::anyhow!("boom"),
        });
        let dep = TaskError::Dependency {
            task: "link".to_string(),
            dependency: "compile".to_string(),
            source: action,
        };
        let shared = TaskError::Shared(Arc::new(dep));

        assert!(matches!(
            shared.root_cause(),
            TaskError::Action { task, .. } if task == "compile"
        ));
    }

    #[test]
    fn test_duplicate_target_message() {
        let err = TaskError::DuplicateTarget {
            target: PathBuf::from("/w/out.bin"),
            first: "a".to_string(),
            second: "b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Target /w/out.bin is produced by both 'a' and 'b'"
        );
    }
}
