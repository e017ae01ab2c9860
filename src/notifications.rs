//! Desktop notifications for completed sessions.

use crate::models::SessionType;
use notify_rust::Notification;
use std::thread;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Failed to show notification: {0}")]
    Show(String),
}

/// Notification display sink.
pub trait Notifier {
    fn notify(&self, title: &str, message: &str) -> Result<(), NotificationError>;
}

/// Title and message announcing the end of a session of `finished` type.
pub fn completion_message(finished: SessionType) -> (&'static str, &'static str) {
    match finished {
        SessionType::Work => ("Work Session Complete!", "Great job! Time for a break."),
        SessionType::ShortBreak | SessionType::LongBreak => {
            ("Break Complete!", "Break is over. Ready to focus?")
        }
    }
}

/// Shows system notifications through the platform notification server.
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn show(title: &str, message: &str) -> Result<(), NotificationError> {
        Notification::new()
            .summary(title)
            .body(message)
            .show()
            .map(|_| ())
            .map_err(|e| NotificationError::Show(e.to_string()))
    }
}

impl Notifier for DesktopNotifier {
    /// Runs in a background thread to avoid blocking the controller.
    fn notify(&self, title: &str, message: &str) -> Result<(), NotificationError> {
        let title = title.to_string();
        let message = message.to_string();
        thread::spawn(move || {
            if let Err(e) = Self::show(&title, &message) {
                warn!("{}", e);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_completion_message() {
        let (title, message) = completion_message(SessionType::Work);
        assert_eq!(title, "Work Session Complete!");
        assert_eq!(message, "Great job! Time for a break.");
    }

    #[test]
    fn test_break_completion_message() {
        assert_eq!(
            completion_message(SessionType::ShortBreak),
            completion_message(SessionType::LongBreak)
        );
        assert_eq!(completion_message(SessionType::LongBreak).0, "Break Complete!");
    }

    #[test]
    #[ignore = "Requires system notification interaction"]
    fn test_desktop_notification() {
        DesktopNotifier
            .notify("Work Session Complete!", "Great job! Time for a break.")
            .unwrap();
    }
}
