//! Session controller: the single owner and writer of the timer state.
//!
//! ## State transitions
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --start--> Running
//!   ^                |                  |
//!   +-----reset------+------reset-------+
//!
//! Running --tick to 0 / skip--> Idle (next session type, or Running when auto-started)
//! ```
//!
//! The controller lives on one thread and processes commands and ticks one
//! at a time (see [`run_event_loop`]). Every mutation is flushed to the store
//! before the transition completes; store and sink failures are logged and
//! never undo a transition already applied in memory.

use crate::audio::SoundPlayer;
use crate::badge::{Badge, BadgeSink};
use crate::command::{Command, ControllerHandle, HandleError, Message, Response, StateUpdate};
use crate::models::{HistoryEntry, SessionType, Settings, Tag, TimerState};
use crate::notifications::{self, Notifier};
use crate::persistence::{DatabaseError, KeyValueStore, StoreExt};
use crate::timer::TickSource;
use chrono::{DateTime, Local};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Side-effecting collaborators invoked by the controller.
pub struct Sinks {
    pub notifier: Box<dyn Notifier>,
    pub sound: Box<dyn SoundPlayer>,
    pub badge: Box<dyn BadgeSink>,
}

pub struct SessionController {
    state: TimerState,
    store: Box<dyn KeyValueStore>,
    ticker: Box<dyn TickSource>,
    sinks: Sinks,
    subscribers: Vec<Sender<StateUpdate>>,
    clock: fn() -> DateTime<Local>,
}

impl SessionController {
    /// Restores the persisted timer state, seeding defaults on first run.
    ///
    /// A timer that was running when the previous process stopped comes
    /// back paused with its remaining time untouched.
    pub fn load(
        store: Box<dyn KeyValueStore>,
        ticker: Box<dyn TickSource>,
        sinks: Sinks,
    ) -> Result<Self, ControllerError> {
        let state = match store.load_timer_state() {
            Ok(Some(mut state)) => {
                if state.recover_after_restart() {
                    info!(
                        remaining = state.time_remaining,
                        "timer was running at shutdown, restored as paused"
                    );
                    if let Err(e) = store.save_timer_state(&state) {
                        warn!("Failed to persist recovered timer state: {}", e);
                    }
                }
                state
            }
            Ok(None) => {
                info!("no saved timer state, seeding defaults");
                seed(&*store)
            }
            Err(DatabaseError::Json(e)) => {
                warn!("Saved timer state is unreadable ({}), starting fresh", e);
                seed(&*store)
            }
            Err(e) => return Err(e.into()),
        };

        let mut controller = Self {
            state,
            store,
            ticker,
            sinks,
            subscribers: Vec::new(),
            clock: Local::now,
        };
        controller.update_badge();
        Ok(controller)
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Dispatches one command and builds its response.
    pub fn handle(&mut self, command: Command) -> Response {
        match command {
            Command::GetState => return Response::State(self.state.clone()),
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Reset { strict_mode } => self.reset(strict_mode),
            Command::Skip => self.skip(),
            Command::SetTask { task, tag } => {
                self.set_task(task, tag);
                return Response::Success { state: None };
            }
            Command::PlaySound => {
                self.play_sound();
                return Response::Success { state: None };
            }
            Command::ClearHistory => self.clear_history(),
        }
        Response::Success {
            state: Some(self.state.clone()),
        }
    }

    /// Starts or resumes the countdown. No-op while already running.
    pub fn start(&mut self) {
        if self.state.is_running {
            return;
        }
        self.state.is_running = true;
        self.state.is_paused = false;
        self.ticker.arm();
        info!(
            session = ?self.state.session_type,
            remaining = self.state.time_remaining,
            "timer started"
        );
        self.commit();
    }

    pub fn pause(&mut self) {
        self.state.is_running = false;
        self.state.is_paused = true;
        self.ticker.disarm();
        info!(remaining = self.state.time_remaining, "timer paused");
        self.commit();
    }

    /// Returns to idle with a full countdown for the current session type.
    pub fn reset(&mut self, strict_mode: bool) {
        let was_running = self.state.is_running;
        self.ticker.disarm();

        if strict_mode && was_running && self.state.session_type == SessionType::Work {
            info!("strict mode: abandoned work session not counted");
        }

        let settings = self.settings();
        let session_type = self.state.session_type;
        self.state.load_session(session_type, &settings);
        info!(session = ?session_type, "timer reset");
        self.commit();
    }

    /// Moves on to the next session without recording the current one.
    pub fn skip(&mut self) {
        self.complete_session(true);
    }

    pub fn set_task(&mut self, task: String, tag: Tag) {
        self.state.current_task = task;
        self.state.current_tag = tag;
        self.persist();
        self.broadcast();
    }

    pub fn play_sound(&self) {
        if let Err(e) = self.sinks.sound.play() {
            warn!("Failed to play chime: {}", e);
        }
    }

    /// Empties history and sprouts and restarts the work-session count.
    pub fn clear_history(&mut self) {
        if let Err(e) = self.store.clear_history() {
            warn!("Failed to clear history: {}", e);
        }
        self.state.work_sessions_completed = 0;
        info!("history cleared");
        self.commit();
    }

    /// Handles a tick from the tick source, dropping ticks of an earlier arming.
    pub fn on_tick(&mut self, generation: u64) {
        if self.ticker.is_current(generation) {
            self.tick();
        } else {
            debug!(generation, "stale tick dropped");
        }
    }

    /// Advances the countdown by exactly one second.
    pub fn tick(&mut self) {
        if !self.state.is_running {
            return;
        }
        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);

        if self.state.time_remaining == 0 {
            self.complete_session(false);
        } else {
            self.commit();
        }
    }

    /// Registers a view listening for state broadcasts.
    pub fn subscribe(&mut self, tx: Sender<StateUpdate>) {
        self.subscribers.push(tx);
        debug!(listeners = self.subscribers.len(), "view subscribed");
    }

    /// Stops ticking and flushes the current state.
    pub fn shutdown(&mut self) {
        self.ticker.disarm();
        self.persist();
    }

    fn complete_session(&mut self, skipped: bool) {
        self.ticker.disarm();

        let settings = self.settings();
        let finished = self.state.session_type;

        if !skipped {
            self.record_completion(finished, &settings);
        }

        let next = finished.next(self.state.work_sessions_completed);
        self.state.load_session(next, &settings);
        info!(
            finished = ?finished,
            next = ?next,
            skipped,
            completed = self.state.work_sessions_completed,
            "session finished"
        );

        if settings.should_auto_start(next) {
            self.start();
        } else {
            self.commit();
        }
    }

    fn record_completion(&mut self, finished: SessionType, settings: &Settings) {
        let now = (self.clock)();

        if let Err(e) = self
            .store
            .append_history(HistoryEntry::record(&self.state, now))
        {
            warn!("Failed to record history: {}", e);
        }

        if finished == SessionType::Work {
            self.state.work_sessions_completed += 1;
            match self.store.add_sprout(now.date_naive()) {
                Ok(count) => debug!(today = count, "sprout added"),
                Err(e) => warn!("Failed to add sprout: {}", e),
            }
        }

        let (title, message) = notifications::completion_message(finished);
        if let Err(e) = self.sinks.notifier.notify(title, message) {
            warn!("{}", e);
        }

        if settings.notification_sound {
            self.play_sound();
        }
    }

    /// Settings are re-read on every use so external edits apply at the
    /// next transition.
    fn settings(&self) -> Settings {
        self.store.load_settings().unwrap_or_else(|e| {
            warn!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        })
    }

    fn commit(&mut self) {
        self.persist();
        self.update_badge();
        self.broadcast();
    }

    fn persist(&self) {
        if let Err(e) = self.store.save_timer_state(&self.state) {
            warn!("Failed to persist timer state: {}", e);
        }
    }

    fn update_badge(&mut self) {
        let badge = Badge::for_state(&self.state);
        if let Err(e) = self.sinks.badge.show(&badge) {
            warn!("Failed to update badge: {}", e);
        }
    }

    /// Views that stopped listening are dropped silently.
    fn broadcast(&mut self) {
        let update = StateUpdate {
            state: self.state.clone(),
        };
        self.subscribers
            .retain(|tx| tx.send(update.clone()).is_ok());
    }
}

/// First-run state. A store that cannot be seeded still yields a default
/// timer, sized from whatever settings are readable.
fn seed(store: &dyn KeyValueStore) -> TimerState {
    store.seed_defaults().unwrap_or_else(|e| {
        warn!("Failed to seed the store, using defaults: {}", e);
        TimerState::new(&store.load_settings().unwrap_or_default())
    })
}

/// Processes messages until `Shutdown` arrives. The controller's own ticker
/// keeps a sender alive, so dropping every handle does not end the loop.
pub fn run_event_loop(mut controller: SessionController, rx: Receiver<Message>) {
    for message in rx {
        match message {
            Message::Command { command, reply } => {
                debug!(?command, "command received");
                let response = controller.handle(command);
                if let Some(reply) = reply {
                    let _ = reply.send(response);
                }
            }
            Message::Tick { generation } => controller.on_tick(generation),
            Message::Subscribe(tx) => controller.subscribe(tx),
            Message::Shutdown => break,
        }
    }
    controller.shutdown();
    info!(
        remaining = controller.state().time_remaining,
        "session controller stopped"
    );
}

/// Spawns the controller thread.
///
/// `build` runs on the new thread, so the controller and its sinks never
/// have to be `Send`. It receives a sender for the tick source.
pub fn spawn<F>(build: F) -> Result<(ControllerHandle, JoinHandle<()>), HandleError>
where
    F: FnOnce(Sender<Message>) -> Result<SessionController, ControllerError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let (ready_tx, ready_rx) = mpsc::channel();
    let tick_tx = tx.clone();

    let join = thread::Builder::new()
        .name("session-controller".to_string())
        .spawn(move || match build(tick_tx) {
            Ok(controller) => {
                let _ = ready_tx.send(Ok(()));
                run_event_loop(controller, rx);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e.to_string()));
            }
        })
        .map_err(|e| HandleError::Startup(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok((ControllerHandle::new(tx), join)),
        Ok(Err(e)) => Err(HandleError::Startup(e)),
        Err(_) => Err(HandleError::Startup(
            "controller thread exited during startup".to_string(),
        )),
    }
}
