//! CLI commands

mod list;
mod run;

pub use list::ListCommand;
pub use run::{ConsoleReporter, RunCommand};
