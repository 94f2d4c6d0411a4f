//! Task registration

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::TaskError;
use crate::task::Task;

/// All tasks known to one invocation, in registration order
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Arc<Task>>,
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Names must be unique.
    pub fn register(&mut self, task: Task) -> Result<(), TaskError> {
        if self.index.contains_key(&task.name) {
            return Err(TaskError::DuplicateTask(task.name));
        }
        debug!(task = %task.name, "registered task");
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(Arc::new(task));
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_task(mut self, task: Task) -> Result<Self, TaskError> {
        self.register(task)?;
        Ok(self)
    }

    /// Look up a task by name
    pub fn get(&self, name: &str) -> Option<&Arc<Task>> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// Whether a task with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate tasks in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
