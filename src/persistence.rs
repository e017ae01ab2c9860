//! SQLite-backed key-value store for settings, timer state and the
//! auxiliary lists.
//!
//! Every key holds one JSON document that is read and written whole.

use crate::models::{HistoryEntry, Settings, Sprouts, TimerState, TodoItem};
use chrono::NaiveDate;
use directories::ProjectDirs;
use fs2::FileExt;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory")]
    DirectoryCreation,
    #[error("{} is already in use by another FocusFlow timer", .0.display())]
    Locked(PathBuf),
    #[error("Failed to open lock file: {0}")]
    LockFile(#[from] std::io::Error),
}

/// The documents kept in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Settings,
    TimerState,
    History,
    Todos,
    Sprouts,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::TimerState => "timerState",
            Self::History => "history",
            Self::Todos => "todos",
            Self::Sprouts => "sprouts",
        }
    }
}

/// Whole-value persistent storage.
pub trait KeyValueStore {
    fn get_raw(&self, key: StoreKey) -> Result<Option<String>, DatabaseError>;
    fn set_raw(&self, key: StoreKey, value: &str) -> Result<(), DatabaseError>;
}

/// Typed access to the documents of a [`KeyValueStore`].
pub trait StoreExt: KeyValueStore {
    fn get<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>, DatabaseError> {
        match self.get_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(value)?;
        self.set_raw(key, &json)
    }

    /// Loads settings, returning defaults if none were saved.
    fn load_settings(&self) -> Result<Settings, DatabaseError> {
        Ok(self.get(StoreKey::Settings)?.unwrap_or_default())
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), DatabaseError> {
        self.set(StoreKey::Settings, settings)
    }

    fn load_timer_state(&self) -> Result<Option<TimerState>, DatabaseError> {
        self.get(StoreKey::TimerState)
    }

    fn save_timer_state(&self, state: &TimerState) -> Result<(), DatabaseError> {
        self.set(StoreKey::TimerState, state)
    }

    fn load_history(&self) -> Result<Vec<HistoryEntry>, DatabaseError> {
        Ok(self.get(StoreKey::History)?.unwrap_or_default())
    }

    fn append_history(&self, entry: HistoryEntry) -> Result<(), DatabaseError> {
        let mut history = self.load_history()?;
        history.push(entry);
        self.set(StoreKey::History, &history)
    }

    fn load_sprouts(&self) -> Result<Sprouts, DatabaseError> {
        Ok(self.get(StoreKey::Sprouts)?.unwrap_or_default())
    }

    /// Adds one sprout to `date` and returns that day's new count.
    fn add_sprout(&self, date: NaiveDate) -> Result<u32, DatabaseError> {
        let mut sprouts = self.load_sprouts()?;
        let count = sprouts.add(date);
        self.set(StoreKey::Sprouts, &sprouts)?;
        Ok(count)
    }

    fn load_todos(&self) -> Result<Vec<TodoItem>, DatabaseError> {
        Ok(self.get(StoreKey::Todos)?.unwrap_or_default())
    }

    fn save_todos(&self, todos: &[TodoItem]) -> Result<(), DatabaseError> {
        self.set(StoreKey::Todos, todos)
    }

    /// Empties history and sprouts and zeroes the stored work-session counter.
    fn clear_history(&self) -> Result<(), DatabaseError> {
        self.set(StoreKey::History, &Vec::<HistoryEntry>::new())?;
        self.set(StoreKey::Sprouts, &Sprouts::default())?;
        if let Some(mut state) = self.load_timer_state()? {
            state.work_sessions_completed = 0;
            self.save_timer_state(&state)?;
        }
        Ok(())
    }

    /// First-install initialization. Writes default settings and empty lists
    /// for every missing key and a fresh timer state, which is returned.
    fn seed_defaults(&self) -> Result<TimerState, DatabaseError> {
        let settings = match self.get::<Settings>(StoreKey::Settings) {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                let settings = Settings::default();
                self.save_settings(&settings)?;
                settings
            }
            // Left in place for the user to repair; the timer runs on defaults
            Err(DatabaseError::Json(_)) => Settings::default(),
            Err(e) => return Err(e),
        };
        let state = TimerState::new(&settings);
        self.save_timer_state(&state)?;

        if self.get_raw(StoreKey::History)?.is_none() {
            self.set(StoreKey::History, &Vec::<HistoryEntry>::new())?;
        }
        if self.get_raw(StoreKey::Todos)?.is_none() {
            self.save_todos(&[])?;
        }
        if self.get_raw(StoreKey::Sprouts)?.is_none() {
            self.set(StoreKey::Sprouts, &Sprouts::default())?;
        }
        Ok(state)
    }
}

impl<S: KeyValueStore + ?Sized> StoreExt for S {}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the database at `path`, creating parent directories and
    /// tables if needed.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_| DatabaseError::DirectoryCreation)?;
        }

        let conn = Connection::open(path)?;
        // The tray view and the controller each hold a connection
        conn.busy_timeout(Duration::from_millis(5000))?;
        Self::initialize_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing).
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_tables(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_tables(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }
}

/// Exclusive claim on a database by the one process hosting its session
/// controller. Released when dropped.
#[derive(Debug)]
pub struct ControllerLock {
    _file: File,
}

impl ControllerLock {
    /// Locks `<db_path>.lock`, failing with [`DatabaseError::Locked`] when
    /// another controller already holds it.
    pub fn acquire(db_path: &Path) -> Result<Self, DatabaseError> {
        let path = lock_path(db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_| DatabaseError::DirectoryCreation)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| DatabaseError::Locked(db_path.to_path_buf()))?;

        Ok(Self { _file: file })
    }
}

fn lock_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Default location of the database file in the platform data directory.
pub fn default_db_path() -> PathBuf {
    ProjectDirs::from("com", "focusflow", "FocusFlow")
        .map(|dirs| dirs.data_dir().join("focusflow.db"))
        .unwrap_or_else(|| PathBuf::from("focusflow.db"))
}

impl KeyValueStore for Database {
    fn get_raw(&self, key: StoreKey) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, key: StoreKey, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            params![key.as_str(), value],
        )?;
        Ok(())
    }
}
