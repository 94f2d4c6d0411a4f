//! CLI definition

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

/// Reserved task token that lists tasks instead of running one
pub const LIST_COMMAND: &str = "list";

/// Taskmill - incremental task runner
#[derive(Debug, Parser)]
#[command(name = "taskmill")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Task to run, or `list` to show all tasks
    pub task: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Manifest file (overrides configuration)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Run the task's action even if it is up to date
    #[arg(long)]
    pub force: bool,

    /// Show execution order without running anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// What an invocation asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Enumerate registered tasks
    List,
    /// Resolve and run one task
    Run(String),
    /// No task named and no default configured
    Missing,
}

impl Cli {
    /// Interpret the positional token, falling back to `default_task`
    pub fn intent(&self, default_task: Option<&str>) -> Intent {
        match self.task.as_deref().or(default_task) {
            Some(LIST_COMMAND) => Intent::List,
            Some(task) => Intent::Run(task.to_string()),
            None => Intent::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_is_reserved() {
        let cli = Cli::parse_from(["taskmill", "list"]);
        assert_eq!(cli.intent(Some("build")), Intent::List);
    }

    #[test]
    fn test_task_name() {
        let cli = Cli::parse_from(["taskmill", "--force", "compile"]);
        assert_eq!(cli.intent(None), Intent::Run("compile".to_string()));
        assert!(cli.force);
    }

    #[test]
    fn test_default_task_fallback() {
        let cli = Cli::parse_from(["taskmill"]);
        assert_eq!(cli.intent(Some("build")), Intent::Run("build".to_string()));
        assert_eq!(cli.intent(None), Intent::Missing);
    }

    #[test]
    fn test_format_flag() {
        let cli = Cli::parse_from(["taskmill", "list", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_extra_positional_rejected() {
        assert!(Cli::try_parse_from(["taskmill", "a", "b"]).is_err());
    }
}
