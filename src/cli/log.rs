//! blacklock log subcommands

use crate::app::App;
use crate::cli::LogCommands;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub fn run(app: &App, cmd: LogCommands, output: OutputOptions) -> Result<()> {
    match cmd {
        LogCommands::List { limit } => {
            let entries = app.repo.logs(limit)?;
            let mut human = HumanOutput::new("blacklock log list");
            human.push_summary("entries", entries.len().to_string());
            for entry in &entries {
                human.push_detail(format!(
                    "{}  {:<9} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.kind.to_string(),
                    entry.message
                ));
            }
            emit_success(output, "log list", &entries, Some(&human))
        }
    }
}
