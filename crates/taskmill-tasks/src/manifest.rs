//! Persistent file-change manifest
//!
//! Records, per task, the last snapshot of each file dependency. Loaded once
//! before any task runs and saved once after the requested task finishes.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ManifestError;
use crate::file::FileSnapshot;

/// Current on-disk format version
pub const MANIFEST_VERSION: u32 = 1;

/// Snapshots recorded for one task, keyed by canonical file path
pub type TaskRecord = BTreeMap<PathBuf, FileSnapshot>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestFile {
    version: u32,
    #[serde(default)]
    tasks: BTreeMap<String, TaskRecord>,
}

/// In-memory manifest bound to a backing file
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    tasks: BTreeMap<String, TaskRecord>,
}

impl Manifest {
    /// An empty manifest that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tasks: BTreeMap::new(),
        }
    }

    /// Load the manifest at `path`. A missing file yields an empty manifest.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no manifest found, starting empty");
                return Ok(Self::new(path));
            }
            Err(source) => return Err(ManifestError::Io { path, source }),
        };

        let file: ManifestFile =
            serde_json::from_str(&contents).map_err(|source| ManifestError::Json {
                path: path.clone(),
                source,
            })?;

        if file.version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                found: file.version,
                expected: MANIFEST_VERSION,
            });
        }

        info!(path = %path.display(), tasks = file.tasks.len(), "manifest loaded");
        Ok(Self {
            path,
            tasks: file.tasks,
        })
    }

    /// Write the whole manifest to its backing file
    pub fn save(&self) -> Result<(), ManifestError> {
        let io_err = |source| ManifestError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = ManifestFile {
            version: MANIFEST_VERSION,
            tasks: self.tasks.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| ManifestError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        info!(path = %self.path.display(), tasks = self.tasks.len(), "manifest saved");
        Ok(())
    }

    /// The record for `task`, inserting an empty one if absent
    pub fn get_or_create(&mut self, task: &str) -> &mut TaskRecord {
        self.tasks.entry(task.to_string()).or_default()
    }

    /// Cached snapshot of `path` for `task`
    pub fn get(&self, task: &str, path: &Path) -> Option<&FileSnapshot> {
        self.tasks.get(task)?.get(path)
    }

    /// Record a snapshot of `path` for `task`
    pub fn set(&mut self, task: &str, path: &Path, snapshot: FileSnapshot) {
        self.get_or_create(task).insert(path.to_path_buf(), snapshot);
    }

    /// Forget everything recorded for `task`
    pub fn remove(&mut self, task: &str) -> Option<TaskRecord> {
        self.tasks.remove(task)
    }

    /// Names of all tasks with a record
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
