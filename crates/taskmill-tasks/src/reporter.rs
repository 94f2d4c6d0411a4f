//! Task execution reporting

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Events emitted during task execution
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// A task began its dependency and freshness checks
    Started { task: String },
    /// File dependencies were compared with the manifest
    DependenciesChecked { task: String, fresh: bool },
    /// Declared targets were checked for existence
    TargetsChecked { task: String, exist: bool },
    /// The up-to-date predicate was evaluated
    PredicateChecked { task: String, up_to_date: bool },
    /// The action was skipped because the task is up to date
    UpToDate { task: String },
    /// The action ran and file snapshots were recorded
    Completed { task: String, duration: Duration },
    /// The task failed
    Failed {
        task: String,
        duration: Duration,
        error: String,
    },
    /// The requested task and its dependency closure finished
    SessionCompleted {
        ran: usize,
        up_to_date: usize,
        failed: usize,
        duration: Duration,
    },
}

/// Trait for reporting task execution progress
pub trait TaskReporter: Send + Sync {
    /// Handle a task event
    fn report(&self, event: &TaskEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Started { task } => {
                tracing::debug!(task = %task, "checking task");
            }
            TaskEvent::DependenciesChecked { task, fresh } => {
                tracing::debug!(task = %task, fresh, "file dependencies checked");
            }
            TaskEvent::TargetsChecked { task, exist } => {
                tracing::debug!(task = %task, exist, "targets checked");
            }
            TaskEvent::PredicateChecked { task, up_to_date } => {
                tracing::debug!(task = %task, up_to_date, "up-to-date predicate checked");
            }
            TaskEvent::UpToDate { task } => {
                tracing::info!("{} is up to date", task);
            }
            TaskEvent::Completed { task, duration } => {
                tracing::info!("{} completed in {:.1}s", task, duration.as_secs_f64());
            }
            TaskEvent::Failed {
                task,
                duration,
                error,
            } => {
                tracing::error!("{} failed after {:.1}s: {}", task, duration.as_secs_f64(), error);
            }
            TaskEvent::SessionCompleted {
                ran,
                up_to_date,
                failed,
                duration,
            } => {
                tracing::info!(
                    "Session complete: {} ran, {} up to date, {} failed ({:.1}s)",
                    ran,
                    up_to_date,
                    failed,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of tasks whose action ran, in completion order
    pub fn completed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TaskEvent::Completed { task, .. } => Some(task),
                _ => None,
            })
            .collect()
    }

    /// Names of tasks skipped as up to date
    pub fn up_to_date(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TaskEvent::UpToDate { task } => Some(task),
                _ => None,
            })
            .collect()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans events out to several reporters
pub struct TaskReporterRegistry {
    reporters: Vec<Arc<dyn TaskReporter>>,
}

impl TaskReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register(&mut self, reporter: Arc<dyn TaskReporter>) {
        self.reporters.push(reporter);
    }

    pub fn all(&self) -> &[Arc<dyn TaskReporter>] {
        &self.reporters
    }
}

impl Default for TaskReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskReporter for TaskReporterRegistry {
    fn report(&self, event: &TaskEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}
