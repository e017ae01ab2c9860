//! Data models for the FocusFlow application.
//!
//! Serialized field names follow the layout of the persisted documents
//! (`isRunning`, `sessionType`, `workDuration`, ...), so a store written by
//! one version of the app stays readable by the next.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of completed work sessions that make up one long-break cycle.
pub const SESSIONS_PER_CYCLE: u32 = 4;

/// Kind of timed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, Self::Work)
    }

    /// Human readable name shown by views.
    pub fn label(self) -> &'static str {
        match self {
            Self::Work => "Work Session",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }

    /// Returns the session that follows this one.
    ///
    /// `work_sessions_completed` is the cumulative counter *after* the
    /// finished session was counted. Every 4th completed work session earns a
    /// long break; breaks always lead back to work.
    pub fn next(self, work_sessions_completed: u32) -> SessionType {
        match self {
            Self::Work => {
                if work_sessions_completed > 0 && work_sessions_completed % SESSIONS_PER_CYCLE == 0 {
                    Self::LongBreak
                } else {
                    Self::ShortBreak
                }
            }
            Self::ShortBreak | Self::LongBreak => Self::Work,
        }
    }
}

/// Label attached to the current task. Three labels have reserved colors,
/// anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tag {
    #[default]
    Work,
    Study,
    Other,
    Custom(String),
}

impl Tag {
    /// Display color (hex) used for history entries and tag charts.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Work => "#DC2626",
            Self::Study => "#2563EB",
            Self::Other => "#059669",
            Self::Custom(_) => "#4B5563",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Work => "Work",
            Self::Study => "Study",
            Self::Other => "Other",
            Self::Custom(label) => label,
        }
    }

    /// The three labels offered by the tag pickers.
    pub fn reserved() -> [Tag; 3] {
        [Tag::Work, Tag::Study, Tag::Other]
    }
}

impl From<String> for Tag {
    fn from(label: String) -> Self {
        match label.trim() {
            "" | "Work" => Self::Work,
            "Study" => Self::Study,
            "Other" => Self::Other,
            _ => Self::Custom(label),
        }
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        match tag {
            Tag::Custom(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for Tag {
    type Err = Infallible;

    /// Reserved labels match case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = match s.trim().to_ascii_lowercase().as_str() {
            "" | "work" => Tag::Work,
            "study" => Tag::Study,
            "other" => Tag::Other,
            _ => Tag::Custom(s.trim().to_string()),
        };
        Ok(tag)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run status of the timer, derived from the two persisted flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
}

/// Canonical timer state. Owned and mutated only by the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerState {
    pub is_running: bool,
    pub is_paused: bool,
    pub session_type: SessionType,
    /// Seconds left in the current session.
    pub time_remaining: u32,
    /// Full length of the current session in seconds.
    pub total_time: u32,
    pub work_sessions_completed: u32,
    pub current_task: String,
    pub current_tag: Tag,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl TimerState {
    /// Creates an idle work session sized from the given settings.
    pub fn new(settings: &Settings) -> Self {
        let total = settings.duration_secs(SessionType::Work);
        Self {
            is_running: false,
            is_paused: false,
            session_type: SessionType::Work,
            time_remaining: total,
            total_time: total,
            work_sessions_completed: 0,
            current_task: String::new(),
            current_tag: Tag::Work,
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.is_running {
            RunStatus::Running
        } else if self.is_paused {
            RunStatus::Paused
        } else {
            RunStatus::Idle
        }
    }

    /// Loads a fresh countdown for `session_type` and returns to idle.
    pub fn load_session(&mut self, session_type: SessionType, settings: &Settings) {
        let total = settings.duration_secs(session_type);
        self.session_type = session_type;
        self.time_remaining = total;
        self.total_time = total;
        self.is_running = false;
        self.is_paused = false;
    }

    /// Downgrades a timer that was running when the process stopped.
    /// Returns true if the state changed.
    pub fn recover_after_restart(&mut self) -> bool {
        if self.is_running {
            self.is_running = false;
            self.is_paused = true;
            true
        } else {
            false
        }
    }

    /// Returns the elapsed fraction (0.0 to 1.0) of the current session.
    pub fn progress_percent(&self) -> f32 {
        if self.total_time == 0 {
            return 1.0;
        }
        1.0 - (self.time_remaining as f32 / self.total_time as f32)
    }

    /// Position of the next work session inside the current cycle (1-based).
    pub fn session_number(&self) -> u32 {
        self.work_sessions_completed % SESSIONS_PER_CYCLE + 1
    }

    pub fn status_text(&self) -> &'static str {
        match self.status() {
            RunStatus::Running if self.session_type == SessionType::Work => "Stay focused!",
            RunStatus::Running => "Take a break",
            RunStatus::Paused => "Paused",
            RunStatus::Idle => "Ready to focus",
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be at least 1 minute")]
    DurationTooShort { field: &'static str },
}

/// User-configurable settings. Edited externally, read-only to the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Duration of a work session in minutes.
    pub work_duration: u32,
    /// Duration of a short break in minutes.
    pub short_break_duration: u32,
    /// Duration of a long break in minutes.
    pub long_break_duration: u32,
    pub auto_start_breaks: bool,
    pub auto_start_work: bool,
    /// Default for the views' strict-mode toggle.
    pub strict_mode: bool,
    /// Whether to play a chime on completion.
    pub notification_sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            auto_start_breaks: false,
            auto_start_work: false,
            strict_mode: false,
            notification_sound: true,
        }
    }
}

impl Settings {
    /// Length of a session of the given type in seconds.
    pub fn duration_secs(&self, session_type: SessionType) -> u32 {
        let mins = match session_type {
            SessionType::Work => self.work_duration,
            SessionType::ShortBreak => self.short_break_duration,
            SessionType::LongBreak => self.long_break_duration,
        };
        mins.saturating_mul(60)
    }

    /// Whether a session of type `next` should start without user action.
    pub fn should_auto_start(&self, next: SessionType) -> bool {
        if next.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_work
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("work duration", self.work_duration),
            ("short break duration", self.short_break_duration),
            ("long break duration", self.long_break_duration),
        ] {
            if value == 0 {
                return Err(SettingsError::DurationTooShort { field });
            }
        }
        Ok(())
    }
}

/// One completed (non-skipped) session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub tag: Tag,
    pub task: String,
    /// Completion time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub date: NaiveDate,
}

impl HistoryEntry {
    /// Records the session described by `state` as finished at `at`.
    pub fn record(state: &TimerState, at: DateTime<Local>) -> Self {
        Self {
            session_type: state.session_type,
            tag: state.current_tag.clone(),
            task: state.current_task.clone(),
            timestamp: at.timestamp_millis(),
            date: at.date_naive(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodoItem {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl TodoItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }
}

/// Completed work sessions per calendar date.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Sprouts(BTreeMap<NaiveDate, u32>);

impl Sprouts {
    /// Adds one sprout for `date` and returns the new count.
    pub fn add(&mut self, date: NaiveDate) -> u32 {
        let count = self.0.entry(date).or_insert(0);
        *count += 1;
        *count
    }

    pub fn on(&self, date: NaiveDate) -> u32 {
        self.0.get(&date).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}
