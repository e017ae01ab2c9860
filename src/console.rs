//! Terminal view: one line per state change, textual commands on stdin.

use crate::command::{Command, ControllerHandle, HandleError};
use crate::menu::{format_progress, format_session, format_task};
use crate::models::TimerState;
use crate::persistence::StoreExt;
use crate::timer::format_time;
use crate::view::{Render, ViewClient};
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

pub const HELP: &str = "\
commands:
  start | pause | skip
  reset [strict|nostrict]
  task <tag> <text...>
  sound | state | clear-history
  help | quit";

/// Renders states as single lines on a writer.
pub struct ConsoleView<W: Write> {
    out: W,
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write to console: {}", e);
        }
    }
}

impl<W: Write> Render for ConsoleView<W> {
    fn render(&mut self, state: &TimerState) {
        self.write_line(&format_line(state));
    }

    fn report_error(&mut self, error: &str) {
        self.write_line(&format!("error: {}", error));
    }
}

/// One-line summary, e.g.
/// `[Work Session] 24:59  Session 1/4 · Stay focused!  Write report [Study]  ░░░  0%`.
pub fn format_line(state: &TimerState) -> String {
    format!(
        "[{}] {}  {}  {}  {}",
        state.session_type.label(),
        format_time(state.time_remaining),
        format_session(state),
        format_task(state),
        format_progress(state)
    )
}

/// Strict mode used by a bare `reset`: the stored setting, as in the tray.
fn strict_default<S: StoreExt + ?Sized>(store: &S) -> bool {
    match store.load_settings() {
        Ok(settings) => settings.strict_mode,
        Err(e) => {
            warn!("Failed to load settings: {}", e);
            false
        }
    }
}

/// Runs the console until `quit` or end of input, returning the writer.
///
/// `store` is only read, for the strict-mode default of `reset`.
pub fn run<S, I, W>(
    handle: ControllerHandle,
    store: &S,
    input: I,
    out: W,
    poll_interval: Duration,
) -> Result<W, HandleError>
where
    S: StoreExt + ?Sized,
    I: BufRead + Send + 'static,
    W: Write,
{
    let (line_tx, line_rx) = mpsc::channel();
    thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut view = ViewClient::activate(handle, ConsoleView::new(out), poll_interval)?;
    view.renderer_mut().write_line(HELP);

    loop {
        let timeout = view.next_poll().saturating_duration_since(Instant::now());
        match line_rx.recv_timeout(timeout) {
            Ok(line) => match line.trim() {
                "" => {}
                "quit" | "exit" => break,
                "help" => view.renderer_mut().write_line(HELP),
                "reset" => {
                    view.send(Command::Reset {
                        strict_mode: strict_default(store),
                    })?;
                }
                // Always print the answer, even when it matches the screen
                "state" => {
                    view.send_line("state")?;
                    if let Some(state) = view.state() {
                        let line = format_line(state);
                        view.renderer_mut().write_line(&line);
                    }
                }
                line => {
                    let response = view.send_line(line)?;
                    // Commands without a new state (task, sound) get a receipt
                    if response.is_success() && response.state().is_none() {
                        view.renderer_mut().write_line("ok");
                    }
                }
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        view.pump()?;
    }

    Ok(view.into_renderer().into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Muted;
    use crate::badge::LoggedBadge;
    use crate::controller::{self, SessionController, Sinks};
    use crate::models::{SessionType, Tag};
    use crate::notifications::{NotificationError, Notifier};
    use crate::models::Settings;
    use crate::persistence::Database;
    use crate::timer::ThreadTicker;
    use std::io::Cursor;

    struct Silent;

    impl Notifier for Silent {
        fn notify(&self, _title: &str, _message: &str) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    fn spawn_controller() -> (ControllerHandle, thread::JoinHandle<()>) {
        controller::spawn(|tick_tx| {
            SessionController::load(
                Box::new(Database::new_in_memory()?),
                Box::new(ThreadTicker::new(tick_tx)),
                Sinks {
                    notifier: Box::new(Silent),
                    sound: Box::new(Muted),
                    badge: Box::new(LoggedBadge),
                },
            )
        })
        .unwrap()
    }

    #[test]
    fn test_format_line() {
        let state = TimerState {
            is_running: true,
            time_remaining: 1499,
            current_task: "Write report".to_string(),
            current_tag: Tag::Study,
            ..TimerState::default()
        };
        let line = format_line(&state);
        assert!(line.starts_with("[Work Session] 24:59  Session 1/4 · Stay focused!"));
        assert!(line.contains("Write report [Study]"));

        let paused = TimerState {
            is_paused: true,
            session_type: SessionType::LongBreak,
            time_remaining: 900,
            total_time: 900,
            ..TimerState::default()
        };
        assert!(format_line(&paused).starts_with("[Long Break] 15:00"));
    }

    #[test]
    fn test_console_session() {
        let (handle, join) = spawn_controller();
        let input = Cursor::new("start\npause\ntask study Read chapter 3\nbogus\nreset strict\nquit\n");

        let store = Database::new_in_memory().unwrap();
        let out = run(
            handle.clone(),
            &store,
            input,
            Vec::new(),
            Duration::from_secs(3600),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Ready to focus"));
        assert!(text.contains("Stay focused!"));
        assert!(text.contains("Paused"));
        assert!(text.contains("error: Unknown action: bogus"));

        let state = handle.get_state().unwrap();
        assert_eq!(state.current_task, "Read chapter 3");
        assert_eq!(state.current_tag, Tag::Study);
        assert!(!state.is_running);
        assert!(!state.is_paused);

        handle.shutdown();
        join.join().unwrap();
    }

    #[test]
    fn test_end_of_input_stops_console() {
        let (handle, join) = spawn_controller();
        let store = Database::new_in_memory().unwrap();
        let out = run(
            handle.clone(),
            &store,
            Cursor::new("help\n"),
            Vec::new(),
            Duration::from_secs(3600),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("commands:").count(), 2);

        handle.shutdown();
        join.join().unwrap();
    }

    #[test]
    fn test_bare_reset_follows_stored_strict_mode() {
        let store = Database::new_in_memory().unwrap();
        assert!(!strict_default(&store));

        store
            .save_settings(&Settings {
                strict_mode: true,
                ..Settings::default()
            })
            .unwrap();
        assert!(strict_default(&store));

        let (handle, join) = spawn_controller();
        let input = Cursor::new("start\nreset\nquit\n");
        run(handle.clone(), &store, input, Vec::new(), Duration::from_secs(3600)).unwrap();

        let state = handle.get_state().unwrap();
        assert!(!state.is_running);
        assert_eq!(state.time_remaining, state.total_time);

        handle.shutdown();
        join.join().unwrap();
    }
}
