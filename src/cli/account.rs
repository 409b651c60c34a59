//! blacklock account subcommands

use crate::app::App;
use crate::cli::AccountCommands;
use crate::error::{Error, Result};
use crate::models::{Account, AccountPatch, NewAccount};
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub fn run(app: &App, cmd: AccountCommands, output: OutputOptions) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            nickname,
            name,
            avatar,
            character,
        } => {
            let account = app.repo.create_account(NewAccount {
                nickname,
                name,
                avatar,
                character_type: character,
            })?;
            app.prefs.set_first_launch(false)?;

            let mut human = account_human("blacklock account create: account created", &account);
            human.push_next_step("blacklock task add <name>");
            emit_success(output, "account create", &account, Some(&human))
        }
        AccountCommands::Show => {
            let account = app.repo.account()?.ok_or(Error::AccountNotFound)?;
            let human = account_human("blacklock account", &account);
            emit_success(output, "account show", &account, Some(&human))
        }
        AccountCommands::Rename { nickname } => {
            let account = app.repo.update_account(AccountPatch {
                nickname: Some(nickname),
                ..AccountPatch::default()
            })?;
            let human = account_human("blacklock account rename: nickname updated", &account);
            emit_success(output, "account rename", &account, Some(&human))
        }
    }
}

fn account_human(header: &str, account: &Account) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("nickname", account.nickname.clone());
    if let Some(name) = &account.name {
        human.push_summary("name", name.clone());
    }
    human.push_summary("level", account.level.to_string());
    human.push_summary("experience", account.experience.to_string());
    human.push_summary("rank", account.rank().to_string());
    human
}
