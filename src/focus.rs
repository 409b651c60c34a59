//! Pomodoro focus timer
//!
//! [`FocusTimer`] is a plain state machine advanced by one-second
//! [`FocusTimer::tick`] calls. It cycles work -> short break -> work ...,
//! with a long break after every `sessionsBeforeLongBreak` work sessions.
//!
//! [`FocusDriver`] runs a timer on tokio with at most one ticking task and
//! reports finished phases on an unbounded channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::settings::PomodoroSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::ShortBreak => "short break",
            Phase::LongBreak => "long break",
        }
    }
}

/// Emitted when a phase runs down to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseComplete {
    pub finished: Phase,
    pub next: Phase,
    pub sessions_completed: u32,
    /// The next phase started running on its own
    pub auto_started: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSnapshot {
    pub phase: Phase,
    pub remaining_secs: u32,
    pub phase_total_secs: u32,
    pub running: bool,
    pub sessions_completed: u32,
    pub total_minutes_focused: u32,
    pub progress: f64,
    /// Work sessions done in the current long-break cycle
    pub cycle_position: u32,
}

#[derive(Debug, Clone)]
pub struct FocusTimer {
    settings: PomodoroSettings,
    phase: Phase,
    remaining: u32,
    running: bool,
    sessions_completed: u32,
    total_minutes_focused: u32,
}

impl FocusTimer {
    /// A stopped timer at the start of a work phase
    pub fn new(settings: PomodoroSettings) -> Self {
        let mut timer = Self {
            settings,
            phase: Phase::Work,
            remaining: 0,
            running: false,
            sessions_completed: 0,
            total_minutes_focused: 0,
        };
        timer.remaining = timer.phase_total(Phase::Work);
        timer
    }

    /// Length of `phase` in seconds (at least one minute)
    pub fn phase_total(&self, phase: Phase) -> u32 {
        let minutes = match phase {
            Phase::Work => self.settings.work_duration,
            Phase::ShortBreak => self.settings.short_break_duration,
            Phase::LongBreak => self.settings.long_break_duration,
        };
        minutes.max(1).saturating_mul(60)
    }

    fn sessions_before_long_break(&self) -> u32 {
        self.settings.sessions_before_long_break.max(1)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    pub fn total_minutes_focused(&self) -> u32 {
        self.total_minutes_focused
    }

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    /// Advance one second. Returns the transition when a phase finishes.
    pub fn tick(&mut self) -> Option<PhaseComplete> {
        if !self.running || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        Some(self.complete_phase())
    }

    fn complete_phase(&mut self) -> PhaseComplete {
        let finished = self.phase;
        let (next, auto_start) = match finished {
            Phase::Work => {
                self.sessions_completed += 1;
                self.total_minutes_focused = self
                    .total_minutes_focused
                    .saturating_add(self.settings.work_duration);
                let next = if self.sessions_completed % self.sessions_before_long_break() == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                };
                (next, self.settings.auto_start_breaks)
            }
            Phase::ShortBreak | Phase::LongBreak => (Phase::Work, self.settings.auto_start_work),
        };

        self.phase = next;
        self.remaining = self.phase_total(next);
        self.running = auto_start;
        tracing::debug!(?finished, ?next, sessions = self.sessions_completed, "phase complete");

        PhaseComplete {
            finished,
            next,
            sessions_completed: self.sessions_completed,
            auto_started: auto_start,
        }
    }

    pub fn start(&mut self) {
        if self.remaining > 0 {
            self.running = true;
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Start when paused, pause when running. Returns the new running state.
    pub fn toggle(&mut self) -> bool {
        if self.running {
            self.pause();
        } else {
            self.start();
        }
        self.running
    }

    /// Re-arm the current phase and stop.
    pub fn reset(&mut self) {
        self.remaining = self.phase_total(self.phase);
        self.running = false;
    }

    /// Swap in new durations; the timer restarts at a stopped work phase.
    ///
    /// Session and focus totals are kept.
    pub fn apply_settings(&mut self, settings: PomodoroSettings) {
        self.settings = settings;
        self.phase = Phase::Work;
        self.remaining = self.phase_total(Phase::Work);
        self.running = false;
    }

    /// Jump to the next phase without finishing this one.
    ///
    /// A skipped work phase does not count as a session.
    pub fn skip(&mut self) -> Phase {
        let next = match self.phase {
            Phase::Work => Phase::ShortBreak,
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        };
        self.phase = next;
        self.remaining = self.phase_total(next);
        self.running = false;
        next
    }

    /// Fraction of the current phase elapsed, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        let total = self.phase_total(self.phase);
        1.0 - f64::from(self.remaining) / f64::from(total)
    }

    pub fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            phase: self.phase,
            remaining_secs: self.remaining,
            phase_total_secs: self.phase_total(self.phase),
            running: self.running,
            sessions_completed: self.sessions_completed,
            total_minutes_focused: self.total_minutes_focused,
            progress: self.progress(),
            cycle_position: self.sessions_completed % self.sessions_before_long_break(),
        }
    }
}

/// Format seconds as `MM:SS`.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

// =============================================================================
// Async driver
// =============================================================================

/// Drives a [`FocusTimer`] with a one-second tokio interval.
///
/// Holds at most one ticking task. Dropping the driver stops it.
#[derive(Debug)]
pub struct FocusDriver {
    timer: Arc<Mutex<FocusTimer>>,
    ticker: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<PhaseComplete>,
}

impl FocusDriver {
    pub fn new(timer: FocusTimer) -> (Self, mpsc::UnboundedReceiver<PhaseComplete>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let driver = Self {
            timer: Arc::new(Mutex::new(timer)),
            ticker: None,
            events,
        };
        (driver, receiver)
    }

    /// Start the timer and its ticker. Needs a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        let was_running = {
            let mut timer = self.timer.lock();
            let was_running = timer.is_running();
            timer.start();
            was_running
        };
        // A ticker left over from a stopped phase is on its way out.
        if !was_running {
            self.stop_ticker();
        }
        self.ensure_ticker()
    }

    pub fn pause(&mut self) {
        self.timer.lock().pause();
        self.stop_ticker();
    }

    pub fn toggle(&mut self) -> Result<bool> {
        if self.timer.lock().is_running() {
            self.pause();
            Ok(false)
        } else {
            self.start()?;
            Ok(self.timer.lock().is_running())
        }
    }

    pub fn reset(&mut self) {
        self.stop_ticker();
        self.timer.lock().reset();
    }

    pub fn skip(&mut self) -> Phase {
        self.stop_ticker();
        self.timer.lock().skip()
    }

    pub fn apply_settings(&mut self, settings: PomodoroSettings) {
        self.stop_ticker();
        self.timer.lock().apply_settings(settings);
    }

    /// Stop ticking without changing timer state beyond pausing it.
    pub fn stop(&mut self) {
        self.pause();
    }

    pub fn snapshot(&self) -> FocusSnapshot {
        self.timer.lock().snapshot()
    }

    /// Whether a ticking task is alive
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn ensure_ticker(&mut self) -> Result<()> {
        if !self.timer.lock().is_running() || self.is_ticking() {
            return Ok(());
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::OperationFailed("focus timer needs a tokio runtime".to_string()))?;
        let timer = Arc::clone(&self.timer);
        let events = self.events.clone();
        self.ticker = Some(handle.spawn(run_ticker(timer, events)));
        Ok(())
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for FocusDriver {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

async fn run_ticker(timer: Arc<Mutex<FocusTimer>>, events: mpsc::UnboundedSender<PhaseComplete>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        let (event, running) = {
            let mut timer = timer.lock();
            let event = timer.tick();
            (event, timer.is_running())
        };
        if let Some(event) = event {
            // A dropped receiver just means nobody is listening.
            let _ = events.send(event);
        }
        if !running {
            break;
        }
    }
}
