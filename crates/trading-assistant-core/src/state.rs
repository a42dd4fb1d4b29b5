//! UI-agnostic conversation data types
//!
//! These are shared between the conversation controller and whatever front
//! end renders it, and don't depend on any specific UI framework.

use chrono::Local;

/// Who sent a message in the conversation log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    /// Display-formatted local time (`HH:MM`), fixed at creation
    pub timestamp: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }

    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: timestamp_now(),
        }
    }
}

/// Current local time formatted for display next to a message
pub fn timestamp_now() -> String {
    Local::now().format("%H:%M").to_string()
}
