//! Taskmill Tasks - Incremental task execution engine
//!
//! This crate provides task declaration, dependency resolution (including
//! dependencies inferred from declared targets), run-once execution per build
//! session, and the file-change manifest that lets unchanged tasks be skipped.

pub mod error;
pub mod file;
pub mod graph;
pub mod manifest;
pub mod registry;
pub mod reporter;
pub mod session;
pub mod shell;
pub mod task;

pub use error::{ManifestError, TaskError};
pub use file::{ContentHasher, FileSnapshot, Sha256Hasher, Sha512Hasher, TrackedFile};
pub use graph::TaskGraph;
pub use manifest::{Manifest, TaskRecord};
pub use registry::TaskRegistry;
pub use reporter::{CollectingReporter, TaskEvent, TaskReporter, TaskReporterRegistry, TracingReporter};
pub use session::{BuildSession, TaskState};
pub use task::{Action, Dependency, Task, UpToDate};
