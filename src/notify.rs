use crate::errors::Error;
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// A transient message for the user, the terminal equivalent of a toast
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            Level::Success => write!(f, "✔ {}", self.message),
            Level::Error => write!(f, "✘ {}", self.message),
        }
    }
}

/// Queue of notifications waiting to be shown
#[derive(Debug, Default)]
pub struct Notifier {
    pending: VecDeque<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(%message, "Notify success");
        self.pending.push_back(Notification {
            level: Level::Success,
            message,
        });
    }

    /// Report a failure with the server's message when there is one, `fallback` otherwise
    pub fn error(&mut self, err: &Error, fallback: &str) {
        let message = err.user_message(fallback);
        warn!(error = %err, %message, "Notify error");
        self.pending.push_back(Notification {
            level: Level::Error,
            message,
        });
    }

    /// Take every pending notification, oldest first
    pub fn drain(&mut self) -> Vec<Notification> {
        self.pending.drain(..).collect()
    }

    pub fn last(&self) -> Option<&Notification> {
        self.pending.back()
    }
}
