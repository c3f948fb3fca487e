//! Effects (side effects as data).
//!
//! Effects describe what should happen as a result of a state transition.
//! The interpreter renders replies and talks to the feedback store; the
//! transition logic itself never touches either.

use serde::{Deserialize, Serialize};

use super::state::{FeedbackDraft, FeedbackRecord};

/// All effects that can be produced by state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Send an assistant message to the respondent.
    Reply { content: ReplyContent },

    /// Persist a confirmed record. Answered by `FeedbackSaved` or
    /// `FeedbackSaveFailed`.
    InsertFeedback { record: FeedbackRecord },

    /// Log a message (for debugging/tracing).
    Log { level: LogLevel, message: String },
}

impl Effect {
    pub fn reply(content: ReplyContent) -> Self {
        Effect::Reply { content }
    }
}

/// What an assistant message says, independent of language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyContent {
    /// Invitation shown when a conversation (re)starts.
    Greeting,
    AskName,
    /// Greets the respondent by name and asks for an email.
    AskEmail { name: String },
    InvalidEmail,
    AskRating,
    RatingOutOfRange,
    RatingNotANumber,
    AskComment,
    /// Lists the collected answers and asks for yes/no.
    ConfirmSummary { draft: FeedbackDraft },
    Saved,
    SaveFailed,
    /// Answers discarded after a "no" at confirmation.
    Cancelled,
    /// Fixed reply once the survey is over.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
