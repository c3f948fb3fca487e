//! Events that trigger state transitions.
//!
//! Events are things that happened: a respondent typed something, asked to
//! start over, or the gateway answered an insert. They are inputs to the
//! pure transition function.

use chrono::{DateTime, Utc};

/// All events that can trigger state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The respondent sent a chat message.
    UserInput {
        text: String,
        /// Used as the record's response time when this input confirms.
        received_at: DateTime<Utc>,
    },

    /// The respondent asked for a fresh conversation.
    RestartRequested,

    /// The feedback insert committed.
    FeedbackSaved,

    /// The feedback insert failed (connection or statement error).
    FeedbackSaveFailed { error: String },
}

impl Event {
    /// Short description for logs. Never includes what the respondent typed.
    pub fn log_summary(&self) -> String {
        match self {
            Event::UserInput { text, .. } => {
                format!("UserInput {{ chars: {} }}", text.chars().count())
            }
            Event::RestartRequested => "RestartRequested".to_string(),
            Event::FeedbackSaved => "FeedbackSaved".to_string(),
            Event::FeedbackSaveFailed { error } => {
                format!("FeedbackSaveFailed {{ error: {} }}", error)
            }
        }
    }
}

/// Build a `UserInput` event stamped with the current time.
pub fn user_input_event(text: impl Into<String>) -> Event {
    Event::UserInput {
        text: text.into(),
        received_at: Utc::now(),
    }
}
