//! Task types and definitions

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::file::TrackedFile;

/// Side-effecting work performed by a task
pub type Action = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Custom freshness check; `Ok(true)` means the task need not rerun
pub type UpToDate = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

/// One element of a combined dependency list
#[derive(Debug, Clone)]
pub enum Dependency {
    /// Another task, by name
    Task(String),
    /// A file that must be current
    File(TrackedFile),
}

impl From<TrackedFile> for Dependency {
    fn from(file: TrackedFile) -> Self {
        Self::File(file)
    }
}

/// A named unit of work with its dependencies and outputs
#[derive(Clone)]
pub struct Task {
    /// Unique task name
    pub name: String,

    /// Human-readable description
    pub description: Option<String>,

    /// Tasks that must complete first
    pub depends_on: BTreeSet<String>,

    /// Files whose changes make this task stale
    pub file_dependencies: Vec<TrackedFile>,

    /// Files this task produces
    pub targets: Vec<TrackedFile>,

    action: Action,
    up_to_date: Option<UpToDate>,
}

impl Task {
    /// Create a task that does nothing until given an action
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            depends_on: BTreeSet::new(),
            file_dependencies: Vec::new(),
            targets: Vec::new(),
            action: Arc::new(|| async { Ok::<(), anyhow::Error>(()) }.boxed()),
            up_to_date: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the action
    pub fn with_action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.action = Arc::new(move || action().boxed());
        self
    }

    /// Add a task dependency by name
    pub fn with_dependency(mut self, task: impl Into<String>) -> Self {
        self.depends_on.insert(task.into());
        self
    }

    /// Add a file dependency
    pub fn with_file_dependency(mut self, file: impl Into<TrackedFile>) -> Self {
        push_unique(&mut self.file_dependencies, file.into());
        self
    }

    /// Add a mixed list of task and file dependencies
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = Dependency>) -> Self {
        for dep in deps {
            match dep {
                Dependency::Task(name) => {
                    self.depends_on.insert(name);
                }
                Dependency::File(file) => push_unique(&mut self.file_dependencies, file),
            }
        }
        self
    }

    /// Add a target file
    pub fn with_target(mut self, file: impl Into<TrackedFile>) -> Self {
        push_unique(&mut self.targets, file.into());
        self
    }

    /// Set a custom up-to-date predicate
    pub fn with_up_to_date<F, Fut>(mut self, predicate: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.up_to_date = Some(Arc::new(move || predicate().boxed()));
        self
    }

    /// Run the action
    pub(crate) fn run_action(&self) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.action)()
    }

    /// Evaluate the custom predicate, or the default when none is set.
    ///
    /// The default trusts the file and target checks only when the task
    /// declares at least one of them; otherwise the task always reruns.
    pub(crate) async fn check_up_to_date(&self) -> anyhow::Result<bool> {
        match &self.up_to_date {
            Some(predicate) => predicate().await,
            None => Ok(!(self.file_dependencies.is_empty() && self.targets.is_empty())),
        }
    }

    /// Whether a custom predicate was supplied
    pub fn has_custom_up_to_date(&self) -> bool {
        self.up_to_date.is_some()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("depends_on", &self.depends_on)
            .field("file_dependencies", &self.file_dependencies)
            .field("targets", &self.targets)
            .field("custom_up_to_date", &self.up_to_date.is_some())
            .finish_non_exhaustive()
    }
}

fn push_unique(files: &mut Vec<TrackedFile>, file: TrackedFile) {
    if !files.contains(&file) {
        files.push(file);
    }
}
