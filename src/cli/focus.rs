//! blacklock focus run
//!
//! Runs the Pomodoro timer in the foreground on a current-thread runtime.
//! Phases chain automatically; Ctrl-C stops early and still reports.

use crate::app::App;
use crate::cli::FocusCommands;
use crate::error::Result;
use crate::focus::{format_clock, FocusDriver, FocusSnapshot, FocusTimer, Phase};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct FocusOutput {
    target_sessions: u32,
    interrupted: bool,
    timer: FocusSnapshot,
}

pub fn run(app: &App, cmd: FocusCommands, output: OutputOptions) -> Result<()> {
    let FocusCommands::Run {
        sessions,
        work,
        short_break,
    } = cmd;

    let mut settings = app.prefs.settings()?.pomodoro_settings;
    if let Some(minutes) = work {
        settings.work_duration = minutes;
    }
    if let Some(minutes) = short_break {
        settings.short_break_duration = minutes;
    }
    settings.validate()?;
    let target = sessions.max(1);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (timer, interrupted) = runtime.block_on(drive(FocusTimer::new(settings), target, output))?;

    let out = FocusOutput {
        target_sessions: target,
        interrupted,
        timer,
    };
    let header = if interrupted {
        "blacklock focus run: stopped"
    } else {
        "blacklock focus run: sessions complete"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary(
        "sessions",
        format!("{}/{}", out.timer.sessions_completed, target),
    );
    human.push_summary("minutes focused", out.timer.total_minutes_focused.to_string());
    emit_success(output, "focus run", &out, Some(&human))
}

async fn drive(timer: FocusTimer, target: u32, output: OutputOptions) -> Result<(FocusSnapshot, bool)> {
    let chatty = !output.json && !output.quiet;
    let (mut driver, mut events) = FocusDriver::new(timer);
    driver.start()?;
    if chatty {
        announce(&driver.snapshot());
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                tracing::debug!(?event, "focus phase complete");
                if event.finished == Phase::Work && event.sessions_completed >= target {
                    driver.stop();
                    return Ok((driver.snapshot(), false));
                }
                if !event.auto_started {
                    driver.start()?;
                }
                if chatty {
                    announce(&driver.snapshot());
                }
            }
            _ = &mut ctrl_c => {
                driver.stop();
                return Ok((driver.snapshot(), true));
            }
        }
    }

    driver.stop();
    Ok((driver.snapshot(), true))
}

fn announce(snapshot: &FocusSnapshot) {
    println!(
        "{} {} (session {})",
        snapshot.phase.label(),
        format_clock(snapshot.remaining_secs),
        snapshot.sessions_completed + 1
    );
}
