//! Taskmill - incremental task runner

use clap::Parser;

use taskmill::cli::{output, Cli};
use taskmill::{exit_codes, logging, Orchestrator, TaskRegistry};

fn main() {
    let cli = Cli::parse();
    let _guard = logging::init_tracing(cli.verbose);

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            output::error(&format!("Cannot enter {}: {}", dir.display(), e));
            std::process::exit(exit_codes::ERROR);
        }
    }

    let code = match std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| Orchestrator::discover(TaskRegistry::new(), &cwd))
    {
        Ok(orchestrator) => orchestrator.execute(&cli),
        Err(e) => {
            output::error(&format!("{:#}", e));
            exit_codes::CONFIG_ERROR
        }
    };

    std::process::exit(code);
}
