use chrono::Local;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::scheduler::scheduler::Scheduler;

pub const WORK_SECONDS: u32 = 1500; // 25 minutes of focused work
pub const SHORT_BREAK_SECONDS: u32 = 300; // 5 minutes between work sessions
pub const LONG_BREAK_SECONDS: u32 = 1200; // 20 minutes after every 4th work session
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

pub const WORK_COLOR: &str = "#9bdeac";
pub const SHORT_BREAK_COLOR: &str = "#e2979c";
pub const LONG_BREAK_COLOR: &str = "#e7305b";
pub const CHECKMARK: &str = "✔";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    /// Phase for a given rep count: every second rep is a break, every
    /// eighth rep the long one, everything else is work.
    pub fn for_reps(reps: u32) -> Phase {
        if reps % 8 == 0 {
            Phase::LongBreak
        } else if reps % 2 == 0 {
            Phase::ShortBreak
        } else {
            Phase::Work
        }
    }

    pub fn duration_seconds(&self) -> u32 {
        match self {
            Phase::Work => WORK_SECONDS,
            Phase::ShortBreak => SHORT_BREAK_SECONDS,
            Phase::LongBreak => LONG_BREAK_SECONDS,
        }
    }

    /// Label text shown by clients. Both break kinds render as "Break";
    /// the color tells them apart.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::ShortBreak | Phase::LongBreak => "Break",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Phase::Work => WORK_COLOR,
            Phase::ShortBreak => SHORT_BREAK_COLOR,
            Phase::LongBreak => LONG_BREAK_COLOR,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            Phase::Work => "WORK",
            Phase::ShortBreak => "SHORT BREAK",
            Phase::LongBreak => "LONG BREAK",
        }
    }

    pub(crate) fn emoji(&self) -> &str {
        match self {
            Phase::Work => "💼",
            Phase::ShortBreak => "☕",
            Phase::LongBreak => "🌴",
        }
    }
}

/// Format remaining seconds as MM:SS, both fields zero-padded.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// One checkmark per completed work session (every two reps).
pub fn checkmarks(reps: u32) -> String {
    CHECKMARK.repeat((reps / 2) as usize)
}

/// The three surfaces clients render: the countdown text, the phase label
/// with its color, and the row of checkmarks for completed work sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Display {
    pub countdown: String,
    pub label: String,
    pub color: String,
    pub checkmarks: String,
}

impl Display {
    /// Snapshot shown before the first start and after a reset.
    pub fn idle() -> Self {
        Display {
            countdown: "00:00".to_string(),
            label: "Timer".to_string(),
            color: WORK_COLOR.to_string(),
            checkmarks: String::new(),
        }
    }
}

/// Everything the controller reacts to: the two events clients can send,
/// plus the scheduler's tick callbacks.
///
/// Ticks carry the generation that scheduled them so a countdown cancelled
/// after its sleep already completed cannot leak into the next phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Reset,
    Tick { generation: u64, remaining: u32 },
}

pub type CommandSender = mpsc::UnboundedSender<Command>;
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

pub fn create_command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// Owns the whole timer state: the rep counter and the pending countdown.
/// Mutated only through `handle`, on the single consumer task.
pub struct PomodoroController<S: Scheduler> {
    reps: u32,
    generation: u64,
    pending: Option<S::Handle>,
    scheduler: S,
    commands: CommandSender,
    display_tx: watch::Sender<Display>,
    log_file: Option<String>,
    verbose: bool,
}

impl<S: Scheduler> PomodoroController<S> {
    pub fn new(
        scheduler: S,
        commands: CommandSender,
        display_tx: watch::Sender<Display>,
        log_file: Option<String>,
        verbose: bool,
    ) -> Self {
        if let Some(ref path) = log_file {
            let _ = Self::log_to_file(
                path,
                &format!(
                    "=== Session started at {} ===",
                    Local::now().format("%Y-%m-%d %H:%M:%S")
                ),
            );
        }
        Self {
            reps: 0,
            generation: 0,
            pending: None,
            scheduler,
            commands,
            display_tx,
            log_file,
            verbose,
        }
    }

    fn log_to_file(path: &str, message: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", message)?;
        Ok(())
    }

    fn log(&self, message: &str) {
        if let Some(ref path) = self.log_file {
            let _ = Self::log_to_file(path, message);
        }
    }

    pub fn reps(&self) -> u32 {
        self.reps
    }

    /// Dispatch one command. Stale ticks from a superseded countdown are
    /// dropped here.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Reset => self.reset(),
            Command::Tick {
                generation,
                remaining,
            } => {
                if generation == self.generation {
                    self.tick(remaining);
                }
            }
        }
    }

    /// Cancel any running countdown and put the display back in its idle
    /// state. Safe to call at any time, including before the first start.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.reps = 0;

        let _ = self.display_tx.send(Display::idle());

        let msg = format!("[{}] Timer reset", Local::now().format("%H:%M:%S"));
        println!("\n🔄 {}", msg);
        self.log(&msg);
    }

    /// Advance to the next rep and begin its countdown. Starting while a
    /// countdown is running restarts cleanly instead of double-scheduling.
    pub fn start(&mut self) {
        self.cancel_pending();
        self.reps += 1;

        let phase = Phase::for_reps(self.reps);
        let seconds = phase.duration_seconds();

        self.display_tx.send_modify(|display| {
            display.label = phase.label().to_string();
            display.color = phase.color().to_string();
        });

        let msg = format!(
            "[{}] {} phase started ({}, rep {})",
            Local::now().format("%H:%M:%S"),
            phase.as_str(),
            format_clock(seconds),
            self.reps
        );
        println!("\n{} {}", phase.emoji(), msg);
        self.log(&msg);

        self.tick(seconds);
    }

    /// One countdown step. Publishes the remaining time, then either
    /// schedules the next step or rolls straight into the next phase.
    fn tick(&mut self, remaining: u32) {
        self.display_tx.send_modify(|display| {
            display.countdown = format_clock(remaining);
        });

        if self.verbose {
            println!("[DEBUG] tick {}", format_clock(remaining));
        }

        if remaining > 0 {
            let generation = self.generation;
            let commands = self.commands.clone();
            let handle = self.scheduler.schedule(
                TICK_INTERVAL,
                Box::new(move || {
                    let _ = commands.send(Command::Tick {
                        generation,
                        remaining: remaining - 1,
                    });
                }),
            );
            // The previous callback has already fired, so overwriting the
            // handle is enough.
            self.pending = Some(handle);
        } else {
            let finished = Phase::for_reps(self.reps);
            let message = match finished {
                Phase::Work => format!(
                    "Work session complete! Time for a {}-minute break.",
                    Phase::for_reps(self.reps + 1).duration_seconds() / 60
                ),
                Phase::ShortBreak | Phase::LongBreak => format!(
                    "Break is over! Starting {}-minute work session.",
                    WORK_SECONDS / 60
                ),
            };
            println!("\n🔔 {}", message);
            self.log(&message);

            self.start();

            let marks = checkmarks(self.reps);
            self.display_tx
                .send_modify(|display| display.checkmarks = marks);
        }
    }

    /// Cancelling is always safe: an absent handle is skipped and a handle
    /// whose callback already ran is a no-op for the scheduler. Bumping the
    /// generation invalidates any tick still in flight.
    fn cancel_pending(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.generation
    }
}

/// Drive the controller from the command queue. Every start/reset/tick runs
/// on this one task, so operations never overlap.
pub async fn run_controller<S: Scheduler>(
    mut controller: PomodoroController<S>,
    mut commands: CommandReceiver,
) {
    while let Some(command) = commands.recv().await {
        controller.handle(command);
    }
}
