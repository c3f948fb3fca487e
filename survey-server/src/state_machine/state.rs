//! State types for the survey dialogue.
//!
//! Each variant carries exactly the answers collected before it, so a stage
//! can never be reached without the fields that precede it in the sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validate::{Email, Rating};

/// Answers collected up to the confirmation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDraft {
    pub name: String,
    pub email: Email,
    pub rating: Rating,
    /// Empty when the respondent declined to comment.
    pub comment: String,
}

impl FeedbackDraft {
    /// Freeze the draft into a record stamped with its creation time.
    pub fn into_record(self, response_time: DateTime<Utc>) -> FeedbackRecord {
        FeedbackRecord {
            name: self.name,
            email: self.email,
            rating: self.rating,
            comment: self.comment,
            response_time,
        }
    }
}

/// A confirmed survey response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub name: String,
    pub email: Email,
    pub rating: Rating,
    pub comment: String,
    pub response_time: DateTime<Utc>,
}

impl FeedbackRecord {
    /// The comment, or `None` when the respondent left none.
    pub fn comment(&self) -> Option<&str> {
        if self.comment.is_empty() {
            None
        } else {
            Some(&self.comment)
        }
    }
}

/// How a confirmed survey ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOutcome {
    Saved,
    /// The record was never committed.
    Failed { error: String },
}

/// The dialogue state for one respondent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SurveyState {
    /// Greeting shown, waiting for the respondent to say anything.
    #[default]
    Start,

    AwaitingName,

    AwaitingEmail { name: String },

    AwaitingRating { name: String, email: Email },

    AwaitingComment {
        name: String,
        email: Email,
        rating: Rating,
    },

    /// Summary shown, waiting for yes/no.
    Confirming { draft: FeedbackDraft },

    /// Confirmed; the insert has been requested but not yet answered.
    /// Never outlives a single turn.
    Saving { record: FeedbackRecord },

    /// Terminal. Further input only gets the closing message.
    Done {
        record: FeedbackRecord,
        outcome: SaveOutcome,
    },
}

impl SurveyState {
    /// The data-free stage of this state.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Start => Stage::Start,
            Self::AwaitingName => Stage::AwaitingName,
            Self::AwaitingEmail { .. } => Stage::AwaitingEmail,
            Self::AwaitingRating { .. } => Stage::AwaitingRating,
            Self::AwaitingComment { .. } => Stage::AwaitingComment,
            Self::Confirming { .. } | Self::Saving { .. } => Stage::Confirming,
            Self::Done { .. } => Stage::Done,
        }
    }

    /// Answers collected so far.
    pub fn feedback(&self) -> PartialFeedback {
        match self {
            Self::Start | Self::AwaitingName => PartialFeedback::default(),
            Self::AwaitingEmail { name } => PartialFeedback {
                name: Some(name.clone()),
                ..Default::default()
            },
            Self::AwaitingRating { name, email } => PartialFeedback {
                name: Some(name.clone()),
                email: Some(email.clone()),
                ..Default::default()
            },
            Self::AwaitingComment {
                name,
                email,
                rating,
            } => PartialFeedback {
                name: Some(name.clone()),
                email: Some(email.clone()),
                rating: Some(*rating),
                comment: None,
            },
            Self::Confirming { draft } => PartialFeedback {
                name: Some(draft.name.clone()),
                email: Some(draft.email.clone()),
                rating: Some(draft.rating),
                comment: Some(draft.comment.clone()),
            },
            Self::Saving { record } | Self::Done { record, .. } => PartialFeedback {
                name: Some(record.name.clone()),
                email: Some(record.email.clone()),
                rating: Some(record.rating),
                comment: Some(record.comment.clone()),
            },
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Named point in the fixed conversation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    AwaitingName,
    AwaitingEmail,
    AwaitingRating,
    AwaitingComment,
    Confirming,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingEmail => "awaiting_email",
            Self::AwaitingRating => "awaiting_rating",
            Self::AwaitingComment => "awaiting_comment",
            Self::Confirming => "confirming",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partial view of the respondent's answers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialFeedback {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub rating: Option<Rating>,
    pub comment: Option<String>,
}
