//! blacklock backup and data subcommands

use crate::app::App;
use crate::backup::RestoreSummary;
use crate::cli::{BackupCommands, DataCommands};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanOutput {
    keep_days: u32,
    deleted: Vec<String>,
}

pub fn run_backup(app: &App, cmd: BackupCommands, output: OutputOptions) -> Result<()> {
    match cmd {
        BackupCommands::Create => {
            let filename = app.backups.create_backup()?;
            let mut human = HumanOutput::new("blacklock backup create: backup written");
            human.push_summary("filename", filename.clone());
            human.push_summary("directory", app.backups.backups_dir().display().to_string());
            emit_success(
                output,
                "backup create",
                &serde_json::json!({ "filename": filename }),
                Some(&human),
            )
        }
        BackupCommands::List => {
            let backups = app.backups.list_backups()?;
            let mut human = HumanOutput::new("blacklock backup list");
            human.push_summary("backups", backups.len().to_string());
            for backup in &backups {
                human.push_detail(format!(
                    "{}  {} UTC  {} bytes",
                    backup.filename, backup.date, backup.size
                ));
            }
            if backups.is_empty() {
                human.push_next_step("blacklock backup create");
            } else {
                human.push_next_step("blacklock backup restore <filename>");
            }
            emit_success(output, "backup list", &backups, Some(&human))
        }
        BackupCommands::Restore { filename } => {
            let summary = app.backups.restore_backup(&filename)?;
            let human = restore_human(
                &format!("blacklock backup restore: restored {filename}"),
                &summary,
            );
            emit_success(output, "backup restore", &summary, Some(&human))
        }
        BackupCommands::Rm { filename } => {
            app.backups.delete_backup(&filename)?;
            let mut human = HumanOutput::new("blacklock backup rm: backup deleted");
            human.push_summary("filename", filename.clone());
            emit_success(
                output,
                "backup rm",
                &serde_json::json!({ "filename": filename }),
                Some(&human),
            )
        }
        BackupCommands::Clean { keep_days } => {
            let keep_days = keep_days.unwrap_or(app.config.backup.keep_days);
            let deleted = app.backups.clean_old_backups(keep_days)?;
            let mut human = HumanOutput::new("blacklock backup clean");
            human.push_summary("keep days", keep_days.to_string());
            human.push_summary("deleted", deleted.len().to_string());
            for name in &deleted {
                human.push_detail(name.clone());
            }
            let out = CleanOutput { keep_days, deleted };
            emit_success(output, "backup clean", &out, Some(&human))
        }
        BackupCommands::Export { filename, dest } => {
            let path = app.backups.export_backup(&filename, &dest)?;
            let mut human = HumanOutput::new("blacklock backup export: backup copied");
            human.push_summary("path", path.display().to_string());
            emit_success(
                output,
                "backup export",
                &serde_json::json!({ "path": path }),
                Some(&human),
            )
        }
        BackupCommands::Import { path } => {
            let summary = app.backups.import_backup(&path)?;
            let human = restore_human(
                &format!("blacklock backup import: imported {}", path.display()),
                &summary,
            );
            emit_success(output, "backup import", &summary, Some(&human))
        }
    }
}

pub fn run_data(app: &App, cmd: DataCommands, output: OutputOptions) -> Result<()> {
    let transfer = app.transfer();
    match cmd {
        DataCommands::Export { path: None } => {
            // The export document is the output; no envelope around it.
            println!("{}", transfer.export_data()?);
            Ok(())
        }
        DataCommands::Export { path: Some(path) } => {
            transfer.export_to_file(&path)?;
            let mut human = HumanOutput::new("blacklock data export: state exported");
            human.push_summary("path", path.display().to_string());
            emit_success(
                output,
                "data export",
                &serde_json::json!({ "path": path }),
                Some(&human),
            )
        }
        DataCommands::Import { path } => {
            let summary = transfer.import_from_file(&path)?;
            let human = restore_human(
                &format!("blacklock data import: imported {}", path.display()),
                &summary,
            );
            emit_success(output, "data import", &summary, Some(&human))
        }
    }
}

fn restore_human(header: &str, summary: &RestoreSummary) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("account", if summary.has_account { "yes" } else { "no" });
    human.push_summary("tasks", summary.tasks.to_string());
    human.push_summary("categories", summary.categories.to_string());
    human.push_summary("folders", summary.folders.to_string());
    if let Some(snapshot) = &summary.snapshot {
        human.push_detail(format!("previous state saved as {snapshot}"));
        human.push_next_step(format!("blacklock backup restore {snapshot}"));
    }
    human
}
