//! Taskmill - incremental task runner
//!
//! Declare tasks in code or in `taskmill.toml`, then hand command-line
//! arguments to an [`Orchestrator`]:
//!
//! ```no_run
//! use taskmill::{Orchestrator, Task, TaskRegistry};
//!
//! let registry = TaskRegistry::new()
//!     .with_task(
//!         Task::new("compile")
//!             .with_description("compiles src.txt")
//!             .with_file_dependency("src.txt")
//!             .with_target("out.bin")
//!             .with_action(|| async {
//!                 tokio::fs::copy("src.txt", "out.bin").await?;
//!                 Ok(())
//!             }),
//!     )
//!     .unwrap();
//!
//! std::process::exit(Orchestrator::new(registry).run(std::env::args()));
//! ```

pub mod cli;
pub mod exit_codes;
pub mod logging;
mod orchestrator;

pub use orchestrator::Orchestrator;
pub use taskmill_tasks::{Dependency, Task, TaskRegistry, TrackedFile};
