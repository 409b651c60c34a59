//! blacklock settings subcommands

use crate::app::App;
use crate::cli::SettingsCommands;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::settings::AppSettings;

pub fn run(app: &App, cmd: SettingsCommands, output: OutputOptions) -> Result<()> {
    match cmd {
        SettingsCommands::Show => {
            let settings = app.prefs.settings()?;
            let human = settings_human("blacklock settings", &settings);
            emit_success(output, "settings show", &settings, Some(&human))
        }
        SettingsCommands::SetPomodoro {
            work,
            short_break,
            long_break,
            sessions,
            auto_start_breaks,
            auto_start_work,
        } => {
            let settings = app.prefs.update_settings(|settings| {
                let mut pomodoro = settings.pomodoro_settings.clone();
                if let Some(minutes) = work {
                    pomodoro.work_duration = minutes;
                }
                if let Some(minutes) = short_break {
                    pomodoro.short_break_duration = minutes;
                }
                if let Some(minutes) = long_break {
                    pomodoro.long_break_duration = minutes;
                }
                if let Some(count) = sessions {
                    pomodoro.sessions_before_long_break = count;
                }
                if let Some(flag) = auto_start_breaks {
                    pomodoro.auto_start_breaks = flag;
                }
                if let Some(flag) = auto_start_work {
                    pomodoro.auto_start_work = flag;
                }
                pomodoro.validate()?;
                settings.pomodoro_settings = pomodoro;
                Ok(())
            })?;
            let human = settings_human("blacklock settings set-pomodoro: settings saved", &settings);
            emit_success(output, "settings set-pomodoro", &settings, Some(&human))
        }
        SettingsCommands::SetPin { pin, clear } => {
            let pin = if clear { None } else { pin };
            let settings = app.prefs.update_settings(|settings| settings.set_pin(pin))?;
            let header = if settings.task_completion_pin.is_some() {
                "blacklock settings set-pin: PIN set"
            } else {
                "blacklock settings set-pin: PIN cleared"
            };
            let human = HumanOutput::new(header);
            emit_success(
                output,
                "settings set-pin",
                &serde_json::json!({ "pinSet": settings.task_completion_pin.is_some() }),
                Some(&human),
            )
        }
    }
}

fn settings_human(header: &str, settings: &AppSettings) -> HumanOutput {
    let pomodoro = &settings.pomodoro_settings;
    let mut human = HumanOutput::new(header);
    human.push_summary("language", format!("{:?}", settings.language).to_lowercase());
    human.push_summary(
        "theme",
        format!("{:?}/{:?}", settings.theme.mode, settings.theme.color).to_lowercase(),
    );
    human.push_summary(
        "notifications",
        if settings.notifications.enabled { "on" } else { "off" },
    );
    human.push_summary(
        "pomodoro",
        format!(
            "{}m work, {}m short break, {}m long break every {} sessions",
            pomodoro.work_duration,
            pomodoro.short_break_duration,
            pomodoro.long_break_duration,
            pomodoro.sessions_before_long_break
        ),
    );
    human.push_summary(
        "completion PIN",
        if settings.task_completion_pin.is_some() { "set" } else { "not set" },
    );
    human
}
