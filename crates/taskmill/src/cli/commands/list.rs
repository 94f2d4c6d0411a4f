//! List command: show registered tasks

use console::style;
use serde::Serialize;

use taskmill_tasks::TaskRegistry;

use crate::cli::OutputFormat;

/// Lists every registered task with its description
#[derive(Debug)]
pub struct ListCommand<'a> {
    registry: &'a TaskRegistry,
}

#[derive(Debug, Serialize)]
struct TaskListing<'a> {
    name: &'a str,
    description: &'a str,
}

impl<'a> ListCommand<'a> {
    pub fn new(registry: &'a TaskRegistry) -> Self {
        Self { registry }
    }

    fn listings(&self) -> Vec<TaskListing<'a>> {
        self.registry
            .iter()
            .map(|task| TaskListing {
                name: &task.name,
                description: task.description.as_deref().unwrap_or_default(),
            })
            .collect()
    }

    /// Render the listing. Touches no files and runs no actions.
    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        let listings = self.listings();

        if format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(&listings)?);
        }

        let width = listings.iter().map(|l| l.name.len()).max().unwrap_or(0);
        let mut out = String::new();
        for listing in &listings {
            out.push_str(&format!(
                "  {}  {}\n",
                style(format!("{:<width$}", listing.name, width = width)).bold(),
                style(listing.description).dim()
            ));
        }
        Ok(out)
    }

    pub fn execute(&self, format: OutputFormat) -> anyhow::Result<()> {
        print!("{}", self.render(format)?);
        Ok(())
    }
}
