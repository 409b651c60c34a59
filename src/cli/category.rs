//! blacklock category and folder subcommands

use crate::app::App;
use crate::cli::{CategoryCommands, FolderCommands};
use crate::error::Result;
use crate::models::{NewCategory, NewFolder};
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub fn run_category(app: &App, cmd: CategoryCommands, output: OutputOptions) -> Result<()> {
    match cmd {
        CategoryCommands::List => {
            let categories = app.repo.categories()?;
            let mut human = HumanOutput::new("blacklock category list");
            human.push_summary("categories", categories.len().to_string());
            for category in &categories {
                let marker = if category.is_default { " (default)" } else { "" };
                human.push_detail(format!(
                    "{}  {} [{} {}]{marker}",
                    category.id, category.name, category.icon, category.color
                ));
            }
            emit_success(output, "category list", &categories, Some(&human))
        }
        CategoryCommands::Add { name, icon, color } => {
            let category = app.repo.add_category(NewCategory { name, icon, color })?;
            let mut human = HumanOutput::new("blacklock category add: category created");
            human.push_summary("id", category.id.clone());
            human.push_summary("name", category.name.clone());
            emit_success(output, "category add", &category, Some(&human))
        }
        CategoryCommands::Rm { id } => {
            let affected = app.repo.tasks_in_category(&id)?.len();
            app.repo.delete_category(&id)?;
            let mut human = HumanOutput::new("blacklock category rm: category deleted");
            human.push_summary("id", id.clone());
            human.push_summary("tasks uncategorized", affected.to_string());
            emit_success(
                output,
                "category rm",
                &serde_json::json!({ "id": id, "tasksUncategorized": affected }),
                Some(&human),
            )
        }
    }
}

pub fn run_folder(app: &App, cmd: FolderCommands, output: OutputOptions) -> Result<()> {
    match cmd {
        FolderCommands::List => {
            let folders = app.repo.folders()?;
            let mut human = HumanOutput::new("blacklock folder list");
            human.push_summary("folders", folders.len().to_string());
            for folder in &folders {
                let indent = if folder.parent_folder_id.is_some() { "  " } else { "" };
                human.push_detail(format!("{indent}{}  {}", folder.id, folder.name));
            }
            emit_success(output, "folder list", &folders, Some(&human))
        }
        FolderCommands::Add {
            name,
            icon,
            color,
            parent,
        } => {
            let folder = app.repo.add_folder(NewFolder {
                name,
                icon,
                color,
                parent_folder_id: parent,
                order: None,
            })?;
            let mut human = HumanOutput::new("blacklock folder add: folder created");
            human.push_summary("id", folder.id.clone());
            human.push_summary("name", folder.name.clone());
            human.push_summary("order", folder.order.to_string());
            emit_success(output, "folder add", &folder, Some(&human))
        }
        FolderCommands::Rm { id } => {
            let affected = app.repo.tasks_in_folder(Some(&id))?.len();
            app.repo.delete_folder(&id)?;
            let mut human = HumanOutput::new("blacklock folder rm: folder deleted");
            human.push_summary("id", id.clone());
            human.push_summary("tasks unfiled", affected.to_string());
            emit_success(
                output,
                "folder rm",
                &serde_json::json!({ "id": id, "tasksUnfiled": affected }),
                Some(&human),
            )
        }
    }
}
