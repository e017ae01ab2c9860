//! Tick source that wakes the controller once per second while a session runs.

use crate::command::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Scheduled wakeups driving the countdown.
///
/// Every arming gets a new generation number; ticks carry the generation
/// they were produced for, so the controller can drop ticks that were
/// already queued when the source was disarmed.
pub trait TickSource {
    fn arm(&mut self);
    fn disarm(&mut self);
    /// Returns true if a tick of `generation` belongs to the current arming.
    fn is_current(&self, generation: u64) -> bool;
}

/// Tick source backed by a sleeper thread per arming.
pub struct ThreadTicker {
    tx: Sender<Message>,
    period: Duration,
    generation: Arc<AtomicU64>,
    armed: bool,
}

impl ThreadTicker {
    pub fn new(tx: Sender<Message>) -> Self {
        Self::with_period(tx, TICK_PERIOD)
    }

    pub fn with_period(tx: Sender<Message>, period: Duration) -> Self {
        Self {
            tx,
            period,
            generation: Arc::new(AtomicU64::new(0)),
            armed: false,
        }
    }
}

impl TickSource for ThreadTicker {
    fn arm(&mut self) {
        if self.armed {
            return;
        }
        self.armed = true;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let tx = self.tx.clone();
        let period = self.period;

        thread::spawn(move || loop {
            thread::sleep(period);
            if current.load(Ordering::SeqCst) != generation {
                break;
            }
            if tx.send(Message::Tick { generation }).is_err() {
                break;
            }
        });
        debug!(generation, "tick source armed");
    }

    fn disarm(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!("tick source disarmed");
    }

    fn is_current(&self, generation: u64) -> bool {
        self.armed && self.generation.load(Ordering::SeqCst) == generation
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Formats time in MM:SS format.
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
