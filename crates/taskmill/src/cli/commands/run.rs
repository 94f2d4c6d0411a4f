//! Run command: execute one task and its dependency closure

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use tracing::{debug, info};

use taskmill_tasks::{
    BuildSession, Manifest, TaskError, TaskEvent, TaskRegistry, TaskReporter,
    TaskReporterRegistry,
};

use crate::cli::{output, Cli};
use crate::exit_codes;

/// Runs a task against a persisted manifest
#[derive(Debug, Clone)]
pub struct RunCommand {
    /// Task to run
    pub task: String,
    /// Manifest backing this invocation
    pub manifest_path: PathBuf,
}

impl RunCommand {
    pub fn new(task: impl Into<String>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            task: task.into(),
            manifest_path: manifest_path.into(),
        }
    }

    /// Run the task and return the process exit code.
    ///
    /// The manifest is saved whether or not the task succeeds.
    pub async fn execute(&self, registry: TaskRegistry, cli: &Cli) -> i32 {
        let manifest = match Manifest::load(&self.manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                output::error(&format!("Failed to load manifest: {}", e));
                return exit_codes::CONFIG_ERROR;
            }
        };

        let session = match BuildSession::new(registry, manifest, reporter_for(cli)) {
            Ok(session) => session,
            Err(e) => {
                output::error(&e.to_string());
                return exit_codes::CONFIG_ERROR;
            }
        };

        if cli.dry_run {
            return match session.graph().execution_plan(&self.task) {
                Ok(plan) => {
                    println!("{}", output::header("Execution plan (dry run):"));
                    print!("{}", plan);
                    exit_codes::SUCCESS
                }
                Err(e) => report_failure(&e),
            };
        }

        if cli.force && session.registry().contains(&self.task) {
            info!(task = %self.task, "forcing rerun");
            session.force(&self.task);
        }

        let code = match session.exec(&self.task).await {
            Ok(()) => exit_codes::SUCCESS,
            Err(e) => report_failure(&e),
        };

        let manifest = session.into_manifest();
        match manifest.save() {
            Ok(()) => {
                debug!(path = %manifest.path().display(), "manifest saved");
                code
            }
            Err(e) => {
                output::error(&format!("Failed to save manifest: {}", e));
                if code == exit_codes::SUCCESS {
                    exit_codes::ERROR
                } else {
                    code
                }
            }
        }
    }
}

fn reporter_for(cli: &Cli) -> Arc<dyn TaskReporter> {
    let mut reporters = TaskReporterRegistry::new();
    if !cli.quiet {
        reporters.register(Arc::new(ConsoleReporter::new(cli.verbose)));
    }
    Arc::new(reporters)
}

/// Print a failure and map it to an exit code
fn report_failure(err: &TaskError) -> i32 {
    output::error(&err.to_string());
    exit_code(err)
}

fn exit_code(err: &TaskError) -> i32 {
    match err.root_cause() {
        TaskError::UnknownTask(_) => exit_codes::UNKNOWN_TASK,
        TaskError::UnknownDependency { .. }
        | TaskError::CyclicDependency(_)
        | TaskError::DuplicateTarget { .. }
        | TaskError::DuplicateTask(_) => exit_codes::CONFIG_ERROR,
        _ => exit_codes::ERROR,
    }
}

/// Console reporter with styled progress lines
#[derive(Debug)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TaskReporter for ConsoleReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Started { task } => {
                if self.verbose {
                    println!("  {} {}", style("▸").dim(), style(task).bold());
                }
            }
            TaskEvent::DependenciesChecked { task, fresh } => {
                if self.verbose {
                    println!(
                        "    {} files {}",
                        style(format!("[{}]", task)).dim(),
                        if *fresh { "unchanged" } else { "changed" }
                    );
                }
            }
            TaskEvent::TargetsChecked { task, exist } => {
                if self.verbose {
                    println!(
                        "    {} targets {}",
                        style(format!("[{}]", task)).dim(),
                        if *exist { "present" } else { "missing" }
                    );
                }
            }
            TaskEvent::PredicateChecked { task, up_to_date } => {
                if self.verbose {
                    println!(
                        "    {} predicate says {}",
                        style(format!("[{}]", task)).dim(),
                        if *up_to_date { "up to date" } else { "stale" }
                    );
                }
            }
            TaskEvent::UpToDate { task } => {
                println!(
                    "  {} {} {}",
                    style("○").cyan(),
                    style(task).cyan(),
                    style("(up to date)").dim()
                );
            }
            TaskEvent::Completed { task, duration } => {
                println!(
                    "  {} {} {}",
                    style("✓").green(),
                    style(task).green(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim()
                );
            }
            TaskEvent::Failed {
                task,
                duration,
                error,
            } => {
                println!(
                    "  {} {} {} {}",
                    style("✗").red(),
                    style(task).red(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim(),
                    style(error).red().dim()
                );
            }
            TaskEvent::SessionCompleted {
                ran,
                up_to_date,
                failed,
                duration,
            } => {
                println!();
                println!(
                    "  {} {} ran, {} up to date, {} failed ({:.1}s)",
                    if *failed == 0 {
                        style("✓").green().bold()
                    } else {
                        style("✗").red().bold()
                    },
                    ran,
                    up_to_date,
                    failed,
                    duration.as_secs_f64()
                );
            }
        }
    }
}
