//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Main configuration for Taskmill
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Task to run when none is named on the command line
    pub default_task: Option<String>,

    /// File-change manifest configuration
    pub manifest: ManifestConfig,

    /// Shell-command tasks, keyed by task name
    pub tasks: BTreeMap<String, TaskConfig>,
}

/// Where the file-change manifest lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Manifest path, relative to the config file's directory
    pub path: PathBuf,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(super::defaults::DEFAULT_MANIFEST_PATH),
        }
    }
}

/// A shell-command task declared in configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Human-readable description
    pub description: Option<String>,

    /// Command run through `sh -c`
    pub command: String,

    /// Tasks that must complete first
    pub depends_on: Vec<String>,

    /// Files whose changes make the task stale
    pub files: Vec<PathBuf>,

    /// Files the task produces
    pub targets: Vec<PathBuf>,

    /// Environment variables to pass
    pub env: HashMap<String, String>,
}

impl Config {
    /// Resolve the manifest path against `root`
    pub fn manifest_path(&self, root: &std::path::Path) -> PathBuf {
        root.join(&self.manifest.path)
    }
}
