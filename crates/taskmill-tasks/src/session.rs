//! Per-invocation task runtime
//!
//! A [`BuildSession`] owns everything that lives for one invocation: the
//! registered tasks, the target index, each task's run state and the
//! manifest. Every task runs at most once per session; callers that reach a
//! task already in progress await its completion instead of skipping it.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::error::TaskError;
use crate::file::FileSnapshot;
use crate::graph::TaskGraph;
use crate::manifest::Manifest;
use crate::registry::TaskRegistry;
use crate::reporter::{TaskEvent, TaskReporter};
use crate::task::Task;

/// Outcome shared by every caller waiting on a task
type Outcome = Result<(), Arc<TaskError>>;

/// Where a task is in its lifecycle within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet requested
    Unstarted,
    /// Checking dependencies or running its action
    InProgress,
    /// Finished; `ran` is false when the action was skipped as up to date
    Done { ran: bool },
    /// The task or one of its dependencies failed
    Failed,
}

/// Per-invocation task runtime
pub struct BuildSession {
    registry: TaskRegistry,
    graph: TaskGraph,
    manifest: Mutex<Manifest>,
    runs: HashMap<String, OnceCell<Outcome>>,
    states: Mutex<HashMap<String, TaskState>>,
    forced: Mutex<HashSet<String>>,
    reporter: Arc<dyn TaskReporter>,
}

impl BuildSession {
    /// Set up a session: index targets and seed a manifest record per task
    pub fn new(
        registry: TaskRegistry,
        mut manifest: Manifest,
        reporter: Arc<dyn TaskReporter>,
    ) -> Result<Self, TaskError> {
        let graph = TaskGraph::build(&registry)?;

        let mut runs = HashMap::new();
        let mut states = HashMap::new();
        for task in registry.iter() {
            manifest.get_or_create(&task.name);
            runs.insert(task.name.clone(), OnceCell::new());
            states.insert(task.name.clone(), TaskState::Unstarted);
        }

        debug!(tasks = registry.len(), "build session ready");
        Ok(Self {
            registry,
            graph,
            manifest: Mutex::new(manifest),
            runs,
            states: Mutex::new(states),
            forced: Mutex::new(HashSet::new()),
            reporter,
        })
    }

    /// Registered tasks
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Resolved dependency graph
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Current state of `task`
    pub fn state(&self, task: &str) -> TaskState {
        self.lock_states()
            .get(task)
            .copied()
            .unwrap_or(TaskState::Unstarted)
    }

    /// Make `task` run its action this session whatever its recorded state.
    ///
    /// The task's manifest record is dropped too; it is rebuilt once the
    /// action succeeds.
    pub fn force(&self, task: &str) {
        self.forced
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(task.to_string());

        let mut manifest = self.lock_manifest();
        manifest.remove(task);
        manifest.get_or_create(task);
    }

    fn is_forced(&self, task: &str) -> bool {
        self.forced
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(task)
    }

    /// Finish the session and hand back the manifest for saving
    pub fn into_manifest(self) -> Manifest {
        self.manifest
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `task` and its dependency closure.
    ///
    /// The closure is validated first, so unknown names and cycles are
    /// reported before any action runs.
    #[instrument(skip(self))]
    pub async fn exec(&self, task: &str) -> Result<(), TaskError> {
        let plan = self.graph.plan(task)?;
        debug!(task, closure = plan.len(), "executing");

        let start = Instant::now();
        let result = self.require(task).await.map_err(TaskError::Shared);

        let (ran, up_to_date, failed) = self.tally();
        self.reporter.report(&TaskEvent::SessionCompleted {
            ran,
            up_to_date,
            failed,
            duration: start.elapsed(),
        });

        result
    }

    /// Await `name`, starting it if nobody has yet
    fn require<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Outcome> {
        async move {
            let (Some(task), Some(cell)) = (self.registry.get(name), self.runs.get(name)) else {
                return Err(Arc::new(TaskError::UnknownTask(name.to_string())));
            };

            cell.get_or_init(|| async move { self.run(task).await.map_err(Arc::new) })
                .await
                .clone()
        }
        .boxed()
    }

    async fn run(&self, task: &Task) -> Result<(), TaskError> {
        self.set_state(&task.name, TaskState::InProgress);
        self.reporter.report(&TaskEvent::Started {
            task: task.name.clone(),
        });
        let start = Instant::now();

        match self.run_checked(task).await {
            Ok(ran) => {
                self.set_state(&task.name, TaskState::Done { ran });
                Ok(())
            }
            Err(e) => {
                self.set_state(&task.name, TaskState::Failed);
                self.reporter.report(&TaskEvent::Failed {
                    task: task.name.clone(),
                    duration: start.elapsed(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Returns whether the action ran
    async fn run_checked(&self, task: &Task) -> Result<bool, TaskError> {
        let start = Instant::now();

        try_join_all(self.graph.dependencies(&task.name).map(|dep| async move {
            self.require(dep)
                .await
                .map_err(|source| TaskError::Dependency {
                    task: task.name.clone(),
                    dependency: dep.clone(),
                    source,
                })
        }))
        .await?;

        if self.is_up_to_date(task).await? {
            self.reporter.report(&TaskEvent::UpToDate {
                task: task.name.clone(),
            });
            return Ok(false);
        }

        info!(task = %task.name, "running action");
        task.run_action()
            .await
            .map_err(|source| TaskError::Action {
                task: task.name.clone(),
                source,
            })?;

        self.record_snapshots(task).await?;

        self.reporter.report(&TaskEvent::Completed {
            task: task.name.clone(),
            duration: start.elapsed(),
        });
        Ok(true)
    }

    /// File dependencies, then targets, then the predicate; stops at the
    /// first check that fails.
    async fn is_up_to_date(&self, task: &Task) -> Result<bool, TaskError> {
        if self.is_forced(&task.name) {
            debug!(task = %task.name, "forced");
            return Ok(false);
        }

        let (fresh, staged) = self.check_file_dependencies(task).await?;
        self.reporter.report(&TaskEvent::DependenciesChecked {
            task: task.name.clone(),
            fresh,
        });
        if !fresh {
            return Ok(false);
        }

        let exist = self.check_targets(task).await?;
        self.reporter.report(&TaskEvent::TargetsChecked {
            task: task.name.clone(),
            exist,
        });
        if !exist {
            return Ok(false);
        }

        let up_to_date = task
            .check_up_to_date()
            .await
            .map_err(|source| TaskError::Predicate {
                task: task.name.clone(),
                source,
            })?;
        self.reporter.report(&TaskEvent::PredicateChecked {
            task: task.name.clone(),
            up_to_date,
        });

        if up_to_date {
            let mut manifest = self.lock_manifest();
            for (path, snapshot) in staged {
                manifest.set(&task.name, &path, snapshot);
            }
        }
        Ok(up_to_date)
    }

    /// Compare every file dependency with the manifest.
    ///
    /// Observed snapshots are returned staged, not written: a stale task's
    /// record only changes once its action succeeds, so a failed run is
    /// retried next time.
    async fn check_file_dependencies(
        &self,
        task: &Task,
    ) -> Result<(bool, Vec<(PathBuf, FileSnapshot)>), TaskError> {
        let results = try_join_all(task.file_dependencies.iter().map(|file| async move {
            let cached = self.lock_manifest().get(&task.name, file.path()).cloned();
            let (snapshot, fresh) = file.snapshot_or_cached(cached.as_ref()).await?;
            if !fresh {
                debug!(task = %task.name, file = %file, "file changed");
            }
            Ok::<_, TaskError>((file.path().to_path_buf(), snapshot, fresh))
        }))
        .await?;

        let fresh = results.iter().all(|(_, _, fresh)| *fresh);
        let staged = results
            .into_iter()
            .map(|(path, snapshot, _)| (path, snapshot))
            .collect();
        Ok((fresh, staged))
    }

    async fn check_targets(&self, task: &Task) -> Result<bool, TaskError> {
        for target in &task.targets {
            if !target.exists().await? {
                debug!(task = %task.name, target = %target, "target missing");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Re-read every file dependency after the action and store the result
    async fn record_snapshots(&self, task: &Task) -> Result<(), TaskError> {
        let snapshots = try_join_all(task.file_dependencies.iter().map(|file| async move {
            file.snapshot().await.map(|snapshot| (file.path(), snapshot))
        }))
        .await?;

        let mut manifest = self.lock_manifest();
        for (path, snapshot) in snapshots {
            manifest.set(&task.name, path, snapshot);
        }
        Ok(())
    }

    fn tally(&self) -> (usize, usize, usize) {
        let states = self.lock_states();
        states.values().fold((0, 0, 0), |(ran, fresh, failed), state| match state {
            TaskState::Done { ran: true } => (ran + 1, fresh, failed),
            TaskState::Done { ran: false } => (ran, fresh + 1, failed),
            TaskState::Failed => (ran, fresh, failed + 1),
            _ => (ran, fresh, failed),
        })
    }

    fn set_state(&self, task: &str, state: TaskState) {
        self.lock_states().insert(task.to_string(), state);
    }

    fn lock_states(&self) -> MutexGuard<'_, HashMap<String, TaskState>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_manifest(&self) -> MutexGuard<'_, Manifest> {
        self.manifest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
