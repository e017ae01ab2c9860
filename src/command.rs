//! Messages exchanged between views, the tick source and the session
//! controller thread.

use crate::models::{Tag, TimerState};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Unknown action: {0}")]
    Unknown(String),
    #[error("Missing {what} for {action}")]
    MissingArgument {
        action: &'static str,
        what: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum HandleError {
    #[error("Session controller is not running")]
    Disconnected,
    #[error("Failed to start session controller: {0}")]
    Startup(String),
}

/// Requests accepted by the session controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetState,
    Start,
    Pause,
    /// Back to the beginning of the current session. With `strict_mode`, a
    /// running work session is abandoned without being counted.
    Reset { strict_mode: bool },
    /// Finish the current session without recording it.
    Skip,
    SetTask { task: String, tag: Tag },
    PlaySound,
    ClearHistory,
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parses the textual form used by the console view, e.g. `reset strict`
    /// or `task study Read chapter 3`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (action, rest) = match line.split_once(char::is_whitespace) {
            Some((action, rest)) => (action, rest.trim()),
            None => (line, ""),
        };

        match action.to_ascii_lowercase().as_str() {
            "state" | "getstate" => Ok(Command::GetState),
            "start" => Ok(Command::Start),
            "pause" => Ok(Command::Pause),
            "reset" => Ok(Command::Reset {
                strict_mode: rest.eq_ignore_ascii_case("strict"),
            }),
            "skip" => Ok(Command::Skip),
            "sound" | "playsound" => Ok(Command::PlaySound),
            "clear-history" => Ok(Command::ClearHistory),
            "task" | "settask" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        action: "task",
                        what: "tag",
                    });
                }
                let (tag, task) = match rest.split_once(char::is_whitespace) {
                    Some((tag, task)) => (tag, task.trim()),
                    None => (rest, ""),
                };
                Ok(Command::SetTask {
                    task: task.to_string(),
                    tag: tag.parse().unwrap_or_default(),
                })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Reply to a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Full snapshot, answering `GetState`.
    State(TimerState),
    Success { state: Option<TimerState> },
    Failure { error: String },
}

impl Response {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }

    pub fn state(&self) -> Option<&TimerState> {
        match self {
            Self::State(state) => Some(state),
            Self::Success { state } => state.as_ref(),
            Self::Failure { .. } => None,
        }
    }
}

/// Broadcast to every listening view after each persisted mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub state: TimerState,
}

/// Everything the controller thread reacts to, processed one at a time.
#[derive(Debug)]
pub enum Message {
    Command {
        command: Command,
        reply: Option<Sender<Response>>,
    },
    Tick {
        generation: u64,
    },
    Subscribe(Sender<StateUpdate>),
    Shutdown,
}

/// Cloneable handle views use to talk to the controller thread.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: Sender<Message>,
}

impl ControllerHandle {
    pub fn new(tx: Sender<Message>) -> Self {
        Self { tx }
    }

    /// Sends a command and waits for its response.
    pub fn request(&self, command: Command) -> Result<Response, HandleError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Message::Command {
                command,
                reply: Some(reply_tx),
            })
            .map_err(|_| HandleError::Disconnected)?;
        reply_rx.recv().map_err(|_| HandleError::Disconnected)
    }

    /// Parses a textual command and sends it. Unparseable input yields a
    /// failure response rather than an error.
    pub fn request_line(&self, line: &str) -> Result<Response, HandleError> {
        match line.parse::<Command>() {
            Ok(command) => self.request(command),
            Err(e) => Ok(Response::Failure {
                error: e.to_string(),
            }),
        }
    }

    pub fn get_state(&self) -> Result<TimerState, HandleError> {
        match self.request(Command::GetState)? {
            Response::State(state) => Ok(state),
            other => other.state().cloned().ok_or(HandleError::Disconnected),
        }
    }

    /// Registers a new listener for state broadcasts.
    pub fn subscribe(&self) -> Result<Receiver<StateUpdate>, HandleError> {
        let (tx, rx) = mpsc::channel();
        self.tx
            .send(Message::Subscribe(tx))
            .map_err(|_| HandleError::Disconnected)?;
        Ok(rx)
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}
