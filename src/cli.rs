//! Command line interface.

use crate::console;
use crate::models::{Settings, SettingsError};
use crate::persistence::{DatabaseError, StoreExt};
use crate::stats::{self, Stats};
use crate::todos::{self, TodoError};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "focusflow")]
#[command(about = "Pomodoro timer with task tags, todos and a daily sprout garden")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tray application (default if no subcommand)
    Run,
    /// Run the timer with a terminal view
    Console,
    /// Print the stored timer state
    Status,
    /// Show or change timer settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Manage the todo list
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },
    /// Show completed sessions, newest first
    History {
        /// Number of entries to show
        #[arg(long, default_value_t = stats::RECENT_LIMIT)]
        limit: usize,
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Show statistics
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    /// Restore the default settings
    Reset,
    /// Change individual settings (durations in minutes)
    Set(SettingsArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct SettingsArgs {
    #[arg(long)]
    pub work: Option<u32>,
    #[arg(long)]
    pub short_break: Option<u32>,
    #[arg(long)]
    pub long_break: Option<u32>,
    #[arg(long)]
    pub auto_start_breaks: Option<bool>,
    #[arg(long)]
    pub auto_start_work: Option<bool>,
    #[arg(long)]
    pub strict_mode: Option<bool>,
    #[arg(long)]
    pub sound: Option<bool>,
}

#[derive(Subcommand, Debug)]
pub enum TodoAction {
    List,
    Add {
        /// Todo text
        text: Vec<String>,
    },
    /// Toggle completion of the todo at a position (1-based)
    Toggle { position: usize },
    /// Remove the todo at a position (1-based)
    Remove { position: usize },
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// Delete all history and sprouts and restart the session count
    Clear,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Todo(#[from] TodoError),
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Handle the status command
pub fn handle_status<S: StoreExt + ?Sized>(store: &S, out: &mut impl Write) -> Result<(), CliError> {
    match store.load_timer_state()? {
        Some(state) => writeln!(out, "{}", console::format_line(&state))?,
        None => writeln!(out, "No timer state saved yet")?,
    }
    Ok(())
}

/// Handle the settings commands
pub fn handle_settings<S: StoreExt + ?Sized>(
    store: &S,
    action: SettingsAction,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let settings = match action {
        SettingsAction::Show => store.load_settings()?,
        SettingsAction::Reset => {
            let settings = Settings::default();
            store.save_settings(&settings)?;
            writeln!(out, "Settings reset to defaults")?;
            settings
        }
        SettingsAction::Set(args) => {
            let settings = apply_settings(store.load_settings()?, &args);
            settings.validate()?;
            store.save_settings(&settings)?;
            writeln!(out, "Settings saved")?;
            settings
        }
    };
    write_settings(&settings, out)?;
    Ok(())
}

fn apply_settings(mut settings: Settings, args: &SettingsArgs) -> Settings {
    if let Some(mins) = args.work {
        settings.work_duration = mins;
    }
    if let Some(mins) = args.short_break {
        settings.short_break_duration = mins;
    }
    if let Some(mins) = args.long_break {
        settings.long_break_duration = mins;
    }
    if let Some(on) = args.auto_start_breaks {
        settings.auto_start_breaks = on;
    }
    if let Some(on) = args.auto_start_work {
        settings.auto_start_work = on;
    }
    if let Some(on) = args.strict_mode {
        settings.strict_mode = on;
    }
    if let Some(on) = args.sound {
        settings.notification_sound = on;
    }
    settings
}

fn write_settings(settings: &Settings, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "work duration:        {} min", settings.work_duration)?;
    writeln!(out, "short break duration: {} min", settings.short_break_duration)?;
    writeln!(out, "long break duration:  {} min", settings.long_break_duration)?;
    writeln!(out, "auto-start breaks:    {}", settings.auto_start_breaks)?;
    writeln!(out, "auto-start work:      {}", settings.auto_start_work)?;
    writeln!(out, "strict mode:          {}", settings.strict_mode)?;
    writeln!(out, "sound:                {}", settings.notification_sound)
}

/// Handle the todo commands
pub fn handle_todo<S: StoreExt + ?Sized>(
    store: &S,
    action: TodoAction,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match action {
        TodoAction::List => {
            let items = todos::list(store)?;
            if items.is_empty() {
                writeln!(out, "No todos")?;
            }
            for (index, item) in items.iter().enumerate() {
                writeln!(out, "{}", todos::format_item(index, item))?;
            }
        }
        TodoAction::Add { text } => {
            let item = todos::add(store, &text.join(" "))?;
            writeln!(out, "Added: {}", item.text)?;
        }
        TodoAction::Toggle { position } => {
            let index = to_index(store, position)?;
            let item = todos::toggle(store, index)?;
            writeln!(out, "{}", todos::format_item(index, &item))?;
        }
        TodoAction::Remove { position } => {
            let index = to_index(store, position)?;
            let item = todos::remove(store, index)?;
            writeln!(out, "Removed: {}", item.text)?;
        }
    }
    Ok(())
}

/// Converts a 1-based position from the command line to a list index.
fn to_index<S: StoreExt + ?Sized>(store: &S, position: usize) -> Result<usize, CliError> {
    position.checked_sub(1).ok_or_else(|| {
        let len = store.load_todos().map(|t| t.len()).unwrap_or(0);
        CliError::Todo(TodoError::IndexOutOfRange { position, len })
    })
}

/// Handle the history commands
pub fn handle_history<S: StoreExt + ?Sized>(
    store: &S,
    limit: usize,
    action: Option<HistoryAction>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if let Some(HistoryAction::Clear) = action {
        store.clear_history()?;
        writeln!(out, "History cleared")?;
        return Ok(());
    }

    let history = store.load_history()?;
    if history.is_empty() {
        writeln!(out, "No sessions yet. Start your first Pomodoro!")?;
        return Ok(());
    }

    let now = Local::now();
    for entry in history.iter().rev().take(limit) {
        writeln!(
            out,
            "{:>10}  {}",
            stats::format_age(entry, now),
            stats::format_entry(entry)
        )?;
    }
    Ok(())
}

/// Handle the stats command
pub fn handle_stats<S: StoreExt + ?Sized>(store: &S, out: &mut impl Write) -> Result<(), CliError> {
    let summary = Stats::compute(
        &store.load_history()?,
        &store.load_sprouts()?,
        &store.load_settings()?,
        Local::now().date_naive(),
    );
    write!(out, "{}", summary)?;

    if !summary.recent.is_empty() {
        writeln!(out)?;
        writeln!(out, "Recent:")?;
        for entry in &summary.recent {
            writeln!(out, "  {}", stats::format_entry(entry))?;
        }
    }
    Ok(())
}
