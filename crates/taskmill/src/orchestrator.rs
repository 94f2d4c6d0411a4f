//! Invocation entry point
//!
//! An [`Orchestrator`] holds the tasks of one program (declared in code,
//! loaded from configuration, or both) and turns command-line tokens into a
//! listing or a task run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{debug, info};

use taskmill_core::config::load_config_or_default;
use taskmill_core::{Config, ConfigError, TaskConfig};
use taskmill_tasks::shell::command_action;
use taskmill_tasks::{Task, TaskRegistry};

use crate::cli::commands::{ListCommand, RunCommand};
use crate::cli::{output, Cli, Intent};
use crate::exit_codes;

/// Registered tasks plus the configuration they run under
#[derive(Debug)]
pub struct Orchestrator {
    registry: TaskRegistry,
    config: Config,
    root: PathBuf,
}

impl Orchestrator {
    /// Wrap code-declared tasks, rooted at the current directory
    pub fn new(registry: TaskRegistry) -> Self {
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            registry,
            config: Config::default(),
            root,
        }
    }

    /// Find configuration from `dir` upward and merge its tasks into `registry`.
    ///
    /// Paths in the configuration resolve against the config file's directory.
    pub fn discover(registry: TaskRegistry, dir: &Path) -> anyhow::Result<Self> {
        let (config, config_path) = load_config_or_default(dir)?;
        let root = config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.to_path_buf());

        debug!(root = %root.display(), tasks = config.tasks.len(), "configuration loaded");
        Ok(Self::new(registry).with_root(root).with_config(config)?)
    }

    /// Directory that configured paths and commands resolve against
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Register the shell-command tasks of `config` and adopt its settings.
    ///
    /// `default_task` may name a configured or a code-declared task.
    pub fn with_config(mut self, config: Config) -> anyhow::Result<Self> {
        for (name, task) in &config.tasks {
            self.registry.register(shell_task(name, task, &self.root))?;
        }

        if let Some(default) = &config.default_task {
            if !self.registry.contains(default) {
                return Err(ConfigError::InvalidValue {
                    field: "default_task".to_string(),
                    message: format!("unknown task '{}'", default),
                }
                .into());
            }
        }

        self.config = config;
        Ok(self)
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Manifest location: the `--manifest` override, else the configured path
    pub fn manifest_path(&self, cli: &Cli) -> PathBuf {
        cli.manifest
            .clone()
            .unwrap_or_else(|| self.config.manifest_path(&self.root))
    }

    /// Parse `args` (program name first) and execute them.
    ///
    /// Returns the process exit code; argument errors are printed by clap.
    /// `-C` is refused: tasks handed to [`Orchestrator::new`] already resolved
    /// their paths against the current directory.
    pub fn run<I, T>(self, args: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                return e.exit_code();
            }
        };

        if let Some(dir) = &cli.directory {
            output::error(&format!(
                "Cannot switch to {} after tasks were declared; change directory before building them",
                dir.display()
            ));
            return exit_codes::ERROR;
        }

        self.execute(&cli)
    }

    /// Execute a parsed command line on a fresh runtime
    pub fn execute(self, cli: &Cli) -> i32 {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                output::error(&format!("Failed to start runtime: {}", e));
                return exit_codes::ERROR;
            }
        };
        runtime.block_on(self.execute_async(cli))
    }

    pub async fn execute_async(self, cli: &Cli) -> i32 {
        match cli.intent(self.config.default_task.as_deref()) {
            Intent::List => match ListCommand::new(&self.registry).execute(cli.format) {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    output::error(&e.to_string());
                    exit_codes::ERROR
                }
            },
            Intent::Missing => {
                output::error("No task given and no default_task configured");
                output::warning("Run `taskmill list` to see available tasks");
                exit_codes::UNKNOWN_TASK
            }
            Intent::Run(task) => {
                let manifest_path = self.manifest_path(cli);
                info!(task = %task, manifest = %manifest_path.display(), "running");
                RunCommand::new(task, manifest_path)
                    .execute(self.registry, cli)
                    .await
            }
        }
    }
}

/// Build a task that runs `config.command` in `root`
fn shell_task(name: &str, config: &TaskConfig, root: &Path) -> Task {
    let mut task = Task::new(name).with_action(command_action(
        config.command.clone(),
        root,
        config.env.clone(),
    ));

    if let Some(description) = &config.description {
        task = task.with_description(description.clone());
    }
    for dependency in &config.depends_on {
        task = task.with_dependency(dependency.clone());
    }
    for file in &config.files {
        task = task.with_file_dependency(root.join(file));
    }
    for target in &config.targets {
        task = task.with_target(root.join(target));
    }
    task
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
default_task = "build"

[tasks.generate]
description = "writes the input"
command = "printf hello > input.txt"
targets = ["input.txt"]

[tasks.build]
description = "builds the project"
command = "cat input.txt >> output.txt"
files = ["input.txt"]
targets = ["output.txt"]
"#;

    fn quiet(args: &[&str]) -> Cli {
        let mut argv = vec!["taskmill", "--quiet"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("taskmill.toml"), CONFIG).unwrap();
        temp
    }

    #[test]
    fn test_discover_registers_config_tasks() {
        let temp = project();
        let nested = temp.path().join("src");
        std::fs::create_dir(&nested).unwrap();

        let orchestrator = Orchestrator::discover(TaskRegistry::new(), &nested).unwrap();

        let names: Vec<_> = orchestrator
            .registry()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["build", "generate"]);
        assert_eq!(
            orchestrator.manifest_path(&quiet(&[])),
            temp.path().join(".taskmill/manifest.json")
        );
    }

    #[test]
    fn test_config_task_name_clash() {
        let temp = project();
        let registry = TaskRegistry::new().with_task(Task::new("build")).unwrap();

        assert!(Orchestrator::discover(registry, temp.path()).is_err());
    }

    #[tokio::test]
    async fn test_default_task_runs_inferred_producer() {
        let temp = project();

        let code = Orchestrator::discover(TaskRegistry::new(), temp.path())
            .unwrap()
            .execute_async(&quiet(&[]))
            .await;

        assert_eq!(code, exit_codes::SUCCESS);
        let output = std::fs::read_to_string(temp.path().join("output.txt")).unwrap();
        assert_eq!(output, "hello");
        assert!(temp.path().join(".taskmill/manifest.json").exists());

        // Second invocation skips both tasks
        let code = Orchestrator::discover(TaskRegistry::new(), temp.path())
            .unwrap()
            .execute_async(&quiet(&["build"]))
            .await;

        assert_eq!(code, exit_codes::SUCCESS);
        let output = std::fs::read_to_string(temp.path().join("output.txt")).unwrap();
        assert_eq!(output, "hello");
    }

    #[tokio::test]
    async fn test_unknown_task_exit_code() {
        let temp = project();

        let code = Orchestrator::discover(TaskRegistry::new(), temp.path())
            .unwrap()
            .execute_async(&quiet(&["deploy"]))
            .await;

        assert_eq!(code, exit_codes::UNKNOWN_TASK);
        assert!(temp.path().join(".taskmill/manifest.json").exists());
        assert!(!temp.path().join("output.txt").exists());
    }

    #[tokio::test]
    async fn test_list_touches_nothing() {
        let temp = project();

        let code = Orchestrator::discover(TaskRegistry::new(), temp.path())
            .unwrap()
            .execute_async(&quiet(&["list"]))
            .await;

        assert_eq!(code, exit_codes::SUCCESS);
        assert!(!temp.path().join(".taskmill").exists());
        assert!(!temp.path().join("input.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_task_without_default() {
        let orchestrator = Orchestrator::new(TaskRegistry::new());
        assert_eq!(
            orchestrator.execute_async(&quiet(&[])).await,
            exit_codes::UNKNOWN_TASK
        );
    }

    #[test]
    fn test_default_task_may_be_code_declared() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("taskmill.toml"),
            "default_task = \"compile\"\n\n[tasks.lint]\ncommand = \"true\"\n",
        )
        .unwrap();

        let registry = TaskRegistry::new().with_task(Task::new("compile")).unwrap();
        assert!(Orchestrator::discover(registry, temp.path()).is_ok());

        let err = Orchestrator::discover(TaskRegistry::new(), temp.path()).unwrap_err();
        assert!(err.to_string().contains("default_task"));
    }

    #[test]
    fn test_run_refuses_directory_switch() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out.txt");
        let registry = TaskRegistry::new()
            .with_task(Task::new("build").with_target(out.clone()).with_action({
                let out = out.clone();
                move || {
                    let out = out.clone();
                    async move {
                        tokio::fs::write(&out, "built").await?;
                        Ok(())
                    }
                }
            }))
            .unwrap();
        let before = std::env::current_dir().unwrap();

        let code = Orchestrator::new(registry)
            .with_root(temp.path())
            .run(["taskmill", "-q", "-C", "sub", "build"]);

        assert_eq!(code, exit_codes::ERROR);
        assert!(!out.exists());
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_run_rejects_bad_arguments() {
        let orchestrator = Orchestrator::new(TaskRegistry::new());
        assert_ne!(orchestrator.run(["taskmill", "--no-such-flag"]), exit_codes::SUCCESS);
    }
}
