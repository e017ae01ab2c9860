//! View client shared by the tray menu and the console.
//!
//! A view keeps a stale copy of the timer state and converges on the
//! controller's through two sources: broadcasts for immediacy and a polling
//! fallback. Both feed [`ViewClient::apply`], which redraws only when the
//! state actually differs from what is on screen.

use crate::command::{Command, ControllerHandle, HandleError, Response, StateUpdate};
use crate::models::TimerState;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Draws a timer state onto some surface.
pub trait Render {
    fn render(&mut self, state: &TimerState);

    /// Shows the error of a rejected command.
    fn report_error(&mut self, _error: &str) {}
}

pub struct ViewClient<R: Render> {
    handle: ControllerHandle,
    renderer: R,
    updates: Option<Receiver<StateUpdate>>,
    poll_interval: Duration,
    last_poll: Instant,
    shown: Option<TimerState>,
}

impl<R: Render> ViewClient<R> {
    /// Subscribes to broadcasts, then fetches and renders the current state.
    ///
    /// Subscribing first means no broadcast can fall between the fetch and
    /// the subscription.
    pub fn activate(
        handle: ControllerHandle,
        renderer: R,
        poll_interval: Duration,
    ) -> Result<Self, HandleError> {
        let updates = handle.subscribe()?;
        let state = handle.get_state()?;

        let mut client = Self {
            handle,
            renderer,
            updates: Some(updates),
            poll_interval,
            last_poll: Instant::now(),
            shown: None,
        };
        client.apply(&state);
        Ok(client)
    }

    pub fn state(&self) -> Option<&TimerState> {
        self.shown.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// When the next poll is due.
    pub fn next_poll(&self) -> Instant {
        self.last_poll + self.poll_interval
    }

    /// Drains pending broadcasts and polls if the interval has elapsed.
    pub fn pump(&mut self) -> Result<(), HandleError> {
        self.drain_updates();

        if self.last_poll.elapsed() >= self.poll_interval {
            self.poll()?;
        }
        Ok(())
    }

    /// Fetches the state now, resubscribing if the broadcast channel closed.
    pub fn poll(&mut self) -> Result<(), HandleError> {
        self.last_poll = Instant::now();
        let state = self.handle.get_state()?;
        self.apply(&state);

        if self.updates.is_none() {
            self.updates = Some(self.handle.subscribe()?);
            debug!("view resubscribed to state broadcasts");
        }
        Ok(())
    }

    /// Sends a command, rendering the returned state or reporting the failure.
    pub fn send(&mut self, command: Command) -> Result<Response, HandleError> {
        let response = self.handle.request(command)?;
        self.show_response(&response);
        Ok(response)
    }

    /// Like [`send`](Self::send), for the textual command form.
    pub fn send_line(&mut self, line: &str) -> Result<Response, HandleError> {
        let response = self.handle.request_line(line)?;
        self.show_response(&response);
        Ok(response)
    }

    /// Renders `state` unless it is already on screen.
    pub fn apply(&mut self, state: &TimerState) {
        if self.shown.as_ref() == Some(state) {
            return;
        }
        self.renderer.render(state);
        self.shown = Some(state.clone());
    }

    fn show_response(&mut self, response: &Response) {
        match response {
            Response::Failure { error } => self.renderer.report_error(error),
            other => {
                if let Some(state) = other.state() {
                    let state = state.clone();
                    self.apply(&state);
                }
            }
        }
    }

    fn drain_updates(&mut self) {
        let Some(updates) = self.updates.as_ref() else {
            return;
        };

        let mut latest = None;
        let closed = loop {
            match updates.try_recv() {
                Ok(update) => latest = Some(update.state),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };
        if closed {
            debug!("state broadcast channel closed, falling back to polling");
            self.updates = None;
        }

        if let Some(state) = latest {
            self.apply(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Message;
    use crate::models::RunStatus;
    use std::sync::mpsc::{self, Sender};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(Default)]
    struct Recording {
        frames: Vec<TimerState>,
        errors: Vec<String>,
    }

    impl Render for Recording {
        fn render(&mut self, state: &TimerState) {
            self.frames.push(state.clone());
        }

        fn report_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }
    }

    /// Minimal controller stand-in. Broadcasts only when `broadcast` is set,
    /// so tests can exercise the polling fallback.
    struct FakeController {
        state: Arc<Mutex<TimerState>>,
        subscribers: Arc<Mutex<Vec<Sender<StateUpdate>>>>,
    }

    impl FakeController {
        fn spawn(broadcast: bool) -> (ControllerHandle, Self) {
            let (tx, rx) = mpsc::channel::<Message>();
            let fake = Self {
                state: Arc::new(Mutex::new(TimerState::default())),
                subscribers: Arc::new(Mutex::new(Vec::new())),
            };
            let state = Arc::clone(&fake.state);
            let subscribers = Arc::clone(&fake.subscribers);

            thread::spawn(move || {
                for message in rx {
                    match message {
                        Message::Command { command, reply } => {
                            let response = {
                                let mut state = state.lock().unwrap();
                                match command {
                                    Command::GetState => Response::State(state.clone()),
                                    Command::Start => {
                                        state.is_running = true;
                                        state.is_paused = false;
                                        Response::Success {
                                            state: Some(state.clone()),
                                        }
                                    }
                                    _ => Response::Failure {
                                        error: "unsupported".to_string(),
                                    },
                                }
                            };
                            if broadcast {
                                let update = StateUpdate {
                                    state: state.lock().unwrap().clone(),
                                };
                                for tx in subscribers.lock().unwrap().iter() {
                                    let _ = tx.send(update.clone());
                                }
                            }
                            if let Some(reply) = reply {
                                let _ = reply.send(response);
                            }
                        }
                        Message::Subscribe(tx) => subscribers.lock().unwrap().push(tx),
                        Message::Tick { .. } => {}
                        Message::Shutdown => break,
                    }
                }
            });

            (ControllerHandle::new(tx), fake)
        }

        fn set_remaining(&self, secs: u32) {
            self.state.lock().unwrap().time_remaining = secs;
        }

        fn broadcast(&self) {
            let update = StateUpdate {
                state: self.state.lock().unwrap().clone(),
            };
            for tx in self.subscribers.lock().unwrap().iter() {
                let _ = tx.send(update.clone());
            }
        }
    }

    #[test]
    fn test_activate_renders_current_state() {
        let (handle, _fake) = FakeController::spawn(true);
        let client =
            ViewClient::activate(handle, Recording::default(), DEFAULT_POLL_INTERVAL).unwrap();

        assert_eq!(client.renderer().frames, vec![TimerState::default()]);
        assert_eq!(client.state(), Some(&TimerState::default()));
    }

    #[test]
    fn test_broadcast_updates_are_rendered() {
        let (handle, fake) = FakeController::spawn(true);
        let mut client =
            ViewClient::activate(handle, Recording::default(), Duration::from_secs(3600)).unwrap();

        fake.set_remaining(1400);
        fake.broadcast();
        fake.set_remaining(1399);
        fake.broadcast();
        client.pump().unwrap();

        // Only the newest pending broadcast is drawn
        let frames = &client.renderer().frames;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].time_remaining, 1399);
    }

    #[test]
    fn test_polling_catches_missed_broadcasts() {
        let (handle, fake) = FakeController::spawn(false);
        let mut client =
            ViewClient::activate(handle, Recording::default(), Duration::from_millis(1)).unwrap();

        fake.set_remaining(1200);
        thread::sleep(Duration::from_millis(5));
        client.pump().unwrap();

        assert_eq!(client.state().unwrap().time_remaining, 1200);
        assert_eq!(client.renderer().frames.len(), 2);
    }

    #[test]
    fn test_render_is_idempotent() {
        let (handle, _fake) = FakeController::spawn(true);
        let mut client =
            ViewClient::activate(handle, Recording::default(), Duration::from_millis(1)).unwrap();

        for _ in 0..3 {
            thread::sleep(Duration::from_millis(2));
            client.pump().unwrap();
        }
        client.apply(&TimerState::default());

        assert_eq!(client.renderer().frames.len(), 1);
    }

    #[test]
    fn test_send_applies_response_state() {
        let (handle, _fake) = FakeController::spawn(false);
        let mut client =
            ViewClient::activate(handle, Recording::default(), Duration::from_secs(3600)).unwrap();

        let response = client.send(Command::Start).unwrap();

        assert!(response.is_success());
        assert_eq!(client.state().unwrap().status(), RunStatus::Running);
    }

    #[test]
    fn test_failures_are_reported_to_the_renderer() {
        let (handle, _fake) = FakeController::spawn(false);
        let mut client =
            ViewClient::activate(handle, Recording::default(), Duration::from_secs(3600)).unwrap();

        client.send(Command::Skip).unwrap();
        client.send_line("dance").unwrap();

        assert_eq!(
            client.renderer().errors,
            vec!["unsupported".to_string(), "Unknown action: dance".to_string()]
        );
        assert_eq!(client.renderer().frames.len(), 1);
    }

    #[test]
    fn test_two_views_converge() {
        let (handle, fake) = FakeController::spawn(true);
        let mut tray =
            ViewClient::activate(handle.clone(), Recording::default(), Duration::from_secs(3600))
                .unwrap();
        let mut console =
            ViewClient::activate(handle, Recording::default(), Duration::from_secs(3600)).unwrap();

        tray.send(Command::Start).unwrap();
        fake.set_remaining(1499);
        fake.broadcast();
        tray.pump().unwrap();
        console.pump().unwrap();

        assert_eq!(tray.state(), console.state());
        assert!(console.state().unwrap().is_running);
    }

    #[test]
    fn test_closed_broadcast_channel_falls_back_to_polling() {
        let (handle, fake) = FakeController::spawn(false);
        let mut client =
            ViewClient::activate(handle, Recording::default(), Duration::from_millis(1)).unwrap();

        fake.subscribers.lock().unwrap().clear();
        fake.set_remaining(1000);
        thread::sleep(Duration::from_millis(5));
        client.pump().unwrap();
        assert_eq!(client.state().unwrap().time_remaining, 1000);

        // The next round trip orders after the resubscription
        client.poll().unwrap();
        assert_eq!(fake.subscribers.lock().unwrap().len(), 1);
    }
}
