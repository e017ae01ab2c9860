//! Badge shown on the tray icon: remaining minutes plus a session color.

use crate::models::{SessionType, TimerState};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BadgeError {
    #[error("Badge display is not listening")]
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BadgeColor {
    pub const WORK: BadgeColor = BadgeColor::rgb(0xEF, 0x44, 0x44);
    pub const BREAK: BadgeColor = BadgeColor::rgb(0x10, 0xB9, 0x81);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub color: BadgeColor,
}

impl Badge {
    /// Remaining minutes rounded up, or empty text when nothing is left.
    pub fn for_state(state: &TimerState) -> Self {
        let minutes = state.time_remaining.div_ceil(60);
        let text = if minutes > 0 {
            minutes.to_string()
        } else {
            String::new()
        };
        let color = match state.session_type {
            SessionType::Work => BadgeColor::WORK,
            SessionType::ShortBreak | SessionType::LongBreak => BadgeColor::BREAK,
        };
        Self { text, color }
    }
}

/// Display surface for the badge.
pub trait BadgeSink {
    fn show(&mut self, badge: &Badge) -> Result<(), BadgeError>;
}

/// Forwards badges to the thread that owns the tray icon.
pub struct ChannelBadge {
    tx: Sender<Badge>,
}

impl ChannelBadge {
    pub fn new(tx: Sender<Badge>) -> Self {
        Self { tx }
    }
}

impl BadgeSink for ChannelBadge {
    fn show(&mut self, badge: &Badge) -> Result<(), BadgeError> {
        self.tx
            .send(badge.clone())
            .map_err(|_| BadgeError::Disconnected)
    }
}

/// Badge sink for surfaces without an icon; records badges in the log.
pub struct LoggedBadge;

impl BadgeSink for LoggedBadge {
    fn show(&mut self, badge: &Badge) -> Result<(), BadgeError> {
        debug!(text = %badge.text, color = %badge.color.hex(), "badge");
        Ok(())
    }
}
