//! Confirmation and save transitions.

use chrono::{DateTime, Utc};

use super::{ignore_unexpected, TransitionResult};
use crate::state_machine::effect::{Effect, LogLevel, ReplyContent};
use crate::state_machine::state::{FeedbackDraft, FeedbackRecord, SaveOutcome, SurveyState};
use crate::validate::is_affirmative;

/// "sim"/"s"/"yes"/"y" commits the draft; anything else discards it.
///
/// The reply for a commit is deferred until the insert reports back, so
/// the turn still ends with exactly one message.
pub fn on_answer(draft: FeedbackDraft, text: &str, received_at: DateTime<Utc>) -> TransitionResult {
    if is_affirmative(text) {
        let record = draft.into_record(received_at);
        TransitionResult::new(
            SurveyState::Saving {
                record: record.clone(),
            },
            vec![Effect::InsertFeedback { record }],
        )
    } else {
        TransitionResult::new(
            SurveyState::Start,
            vec![
                Effect::Log {
                    level: LogLevel::Info,
                    message: "Respondent declined the summary, answers discarded".to_string(),
                },
                Effect::reply(ReplyContent::Cancelled),
            ],
        )
    }
}

pub fn on_input_while_saving(record: FeedbackRecord) -> TransitionResult {
    ignore_unexpected(SurveyState::Saving { record }, "UserInput")
}

pub fn on_saved(state: SurveyState) -> TransitionResult {
    match state {
        SurveyState::Saving { record } => TransitionResult::new(
            SurveyState::Done {
                record,
                outcome: SaveOutcome::Saved,
            },
            vec![
                Effect::Log {
                    level: LogLevel::Info,
                    message: "Feedback saved".to_string(),
                },
                Effect::reply(ReplyContent::Saved),
            ],
        ),
        other => ignore_unexpected(other, "FeedbackSaved"),
    }
}

/// The failure is reported and the survey still ends. No retry.
pub fn on_save_failed(state: SurveyState, error: String) -> TransitionResult {
    match state {
        SurveyState::Saving { record } => TransitionResult::new(
            SurveyState::Done {
                record,
                outcome: SaveOutcome::Failed {
                    error: error.clone(),
                },
            },
            vec![
                Effect::Log {
                    level: LogLevel::Error,
                    message: format!("Feedback could not be saved: {}", error),
                },
                Effect::reply(ReplyContent::SaveFailed),
            ],
        ),
        other => ignore_unexpected(other, "FeedbackSaveFailed"),
    }
}
