//! Task graph construction and planning
//!
//! Resolves each task's effective dependencies: the tasks it names, plus the
//! producer of every file dependency that some other task declares as a
//! target. Planning walks the closure of one requested task and orders it
//! topologically so cycles are caught before anything runs.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use tracing::{debug, info, instrument};

use crate::error::TaskError;
use crate::registry::TaskRegistry;

/// Target index plus resolved dependency edges
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// Canonical target path -> producing task
    producers: HashMap<PathBuf, String>,
    /// Task -> tasks that must complete first (explicit and inferred)
    dependencies: HashMap<String, BTreeSet<String>>,
}

impl TaskGraph {
    /// Bind every target to its producer and resolve dependency edges.
    ///
    /// A target claimed by two tasks is a configuration error.
    #[instrument(skip_all, fields(tasks = registry.len()))]
    pub fn build(registry: &TaskRegistry) -> Result<Self, TaskError> {
        let mut producers: HashMap<PathBuf, String> = HashMap::new();

        for task in registry.iter() {
            for target in &task.targets {
                if let Some(first) = producers.get(target.path()) {
                    if first != &task.name {
                        return Err(TaskError::DuplicateTarget {
                            target: target.path().to_path_buf(),
                            first: first.clone(),
                            second: task.name.clone(),
                        });
                    }
                }
                producers.insert(target.path().to_path_buf(), task.name.clone());
            }
        }

        let mut dependencies = HashMap::new();
        for task in registry.iter() {
            let mut deps = task.depends_on.clone();

            for file in &task.file_dependencies {
                if let Some(producer) = producers.get(file.path()) {
                    if producer != &task.name && deps.insert(producer.clone()) {
                        debug!(
                            task = %task.name,
                            producer = %producer,
                            file = %file,
                            "inferred dependency from target"
                        );
                    }
                }
            }

            dependencies.insert(task.name.clone(), deps);
        }

        info!(targets = producers.len(), "task graph built");
        Ok(Self {
            producers,
            dependencies,
        })
    }

    /// Effective dependencies of `task`
    pub fn dependencies(&self, task: &str) -> impl Iterator<Item = &String> {
        self.dependencies.get(task).into_iter().flatten()
    }

    /// Task producing the file at `path`, if any
    pub fn producer(&self, path: &std::path::Path) -> Option<&str> {
        self.producers.get(path).map(String::as_str)
    }

    /// Dependency closure of `root`, dependencies before dependents.
    ///
    /// Fails on unknown task names and on cycles.
    #[instrument(skip(self))]
    pub fn plan(&self, root: &str) -> Result<Vec<String>, TaskError> {
        if !self.dependencies.contains_key(root) {
            return Err(TaskError::UnknownTask(root.to_string()));
        }

        // Collect the closure
        let mut closure: HashSet<&str> = HashSet::new();
        let mut stack = vec![root];
        while let Some(name) = stack.pop() {
            if !closure.insert(name) {
                continue;
            }
            for dep in self.dependencies(name) {
                if !self.dependencies.contains_key(dep) {
                    return Err(TaskError::UnknownDependency {
                        task: name.to_string(),
                        dependency: dep.clone(),
                    });
                }
                stack.push(dep.as_str());
            }
        }

        // Kahn's algorithm over the closure
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for &name in &closure {
            in_degree.insert(name, self.dependencies(name).count());
            for dep in self.dependencies(name) {
                dependents.entry(dep.as_str()).or_default().push(name);
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        ready.sort_unstable();
        let mut queue: VecDeque<&str> = ready.into();
        let mut sorted = Vec::with_capacity(closure.len());

        while let Some(name) = queue.pop_front() {
            sorted.push(name.to_string());

            let mut unlocked = Vec::new();
            for &dependent in dependents.get(name).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        unlocked.push(dependent);
                    }
                }
            }
            unlocked.sort_unstable();
            queue.extend(unlocked);
        }

        if sorted.len() != closure.len() {
            let in_sorted: HashSet<&str> = sorted.iter().map(String::as_str).collect();
            let mut cyclic: Vec<&str> = closure
                .into_iter()
                .filter(|name| !in_sorted.contains(name))
                .collect();
            cyclic.sort_unstable();
            return Err(TaskError::CyclicDependency(cyclic.join(", ")));
        }

        Ok(sorted)
    }

    /// Human-readable execution plan for `root`
    pub fn execution_plan(&self, root: &str) -> Result<String, TaskError> {
        let mut plan = String::new();
        for (i, name) in self.plan(root)?.iter().enumerate() {
            let deps: Vec<&str> = self.dependencies(name).map(String::as_str).collect();
            if deps.is_empty() {
                plan.push_str(&format!("{:>3}. {}\n", i + 1, name));
            } else {
                plan.push_str(&format!(
                    "{:>3}. {} (after: {})\n",
                    i + 1,
                    name,
                    deps.join(", ")
                ));
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn registry(tasks: Vec<Task>) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for task in tasks {
            registry.register(task).unwrap();
        }
        registry
    }

    #[test]
    fn test_explicit_dependencies() {
        let graph = TaskGraph::build(&registry(vec![
            Task::new("build"),
            Task::new("test").with_dependency("build"),
        ]))
        .unwrap();

        assert_eq!(graph.plan("test").unwrap(), vec!["build", "test"]);
    }

    #[test]
    fn test_inferred_dependency_from_target() {
        let graph = TaskGraph::build(&registry(vec![
            Task::new("codegen").with_target("/w/gen/api.rs"),
            Task::new("compile").with_file_dependency("/w/gen/../gen/api.rs"),
        ]))
        .unwrap();

        let deps: Vec<_> = graph.dependencies("compile").collect();
        assert_eq!(deps, vec!["codegen"]);
        assert_eq!(graph.producer(std::path::Path::new("/w/gen/api.rs")), Some("codegen"));
    }

    #[test]
    fn test_own_target_is_not_a_dependency() {
        let graph = TaskGraph::build(&registry(vec![Task::new("fmt")
            .with_file_dependency("/w/src.rs")
            .with_target("/w/src.rs")]))
        .unwrap();

        assert_eq!(graph.dependencies("fmt").count(), 0);
        assert_eq!(graph.plan("fmt").unwrap(), vec!["fmt"]);
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let result = TaskGraph::build(&registry(vec![
            Task::new("a").with_target("/w/out.bin"),
            Task::new("b").with_target("/w/out.bin"),
        ]));

        assert!(matches!(
            result,
            Err(TaskError::DuplicateTarget { first, second, .. }) if first == "a" && second == "b"
        ));
    }

    #[test]
    fn test_plan_diamond_is_deterministic() {
        let graph = TaskGraph::build(&registry(vec![
            Task::new("a"),
            Task::new("c").with_dependency("a"),
            Task::new("b").with_dependency("a"),
            Task::new("d").with_dependency("b").with_dependency("c"),
            Task::new("unrelated"),
        ]))
        .unwrap();

        assert_eq!(graph.plan("d").unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_plan_unknown_task() {
        let graph = TaskGraph::build(&registry(vec![Task::new("a")])).unwrap();
        assert!(matches!(graph.plan("zzz"), Err(TaskError::UnknownTask(_))));
    }

    #[test]
    fn test_plan_unknown_dependency() {
        let graph =
            TaskGraph::build(&registry(vec![Task::new("a").with_dependency("ghost")])).unwrap();

        assert!(matches!(
            graph.plan("a"),
            Err(TaskError::UnknownDependency { task, dependency }) if task == "a" && dependency == "ghost"
        ));
    }

    #[test]
    fn test_plan_cycle() {
        let graph = TaskGraph::build(&registry(vec![
            Task::new("a").with_dependency("b"),
            Task::new("b").with_dependency("a"),
            Task::new("c").with_dependency("a"),
        ]))
        .unwrap();

        match graph.plan("c") {
            Err(TaskError::CyclicDependency(names)) => assert_eq!(names, "a, b, c"),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_execution_plan_output() {
        let graph = TaskGraph::build(&registry(vec![
            Task::new("build"),
            Task::new("test").with_dependency("build"),
        ]))
        .unwrap();

        let plan = graph.execution_plan("test").unwrap();
        assert!(plan.contains("1. build"));
        assert!(plan.contains("2. test (after: build)"));
    }
}
