//! Transitions while answers are being collected.
//!
//! Each answer is validated before the state advances; a rejected answer
//! keeps the state exactly as it was and re-prompts.

use super::TransitionResult;
use crate::state_machine::effect::{Effect, ReplyContent};
use crate::state_machine::state::{FeedbackDraft, SurveyState};
use crate::validate::{is_decline, parse_rating, Email, Rating, RatingError};

/// Any input after the greeting starts the questions.
pub fn on_start() -> TransitionResult {
    TransitionResult::new(
        SurveyState::AwaitingName,
        vec![Effect::reply(ReplyContent::AskName)],
    )
}

/// The name is stored verbatim.
pub fn on_name(text: String) -> TransitionResult {
    TransitionResult::new(
        SurveyState::AwaitingEmail { name: text.clone() },
        vec![Effect::reply(ReplyContent::AskEmail { name: text })],
    )
}

pub fn on_email(name: String, text: &str) -> TransitionResult {
    match Email::parse(text) {
        Some(email) => TransitionResult::new(
            SurveyState::AwaitingRating { name, email },
            vec![Effect::reply(ReplyContent::AskRating)],
        ),
        None => TransitionResult::new(
            SurveyState::AwaitingEmail { name },
            vec![Effect::reply(ReplyContent::InvalidEmail)],
        ),
    }
}

pub fn on_rating(name: String, email: Email, text: &str) -> TransitionResult {
    let reprompt = match parse_rating(text) {
        Ok(rating) => {
            return TransitionResult::new(
                SurveyState::AwaitingComment {
                    name,
                    email,
                    rating,
                },
                vec![Effect::reply(ReplyContent::AskComment)],
            )
        }
        Err(RatingError::OutOfRange) => ReplyContent::RatingOutOfRange,
        Err(RatingError::NotANumber) => ReplyContent::RatingNotANumber,
    };

    TransitionResult::new(
        SurveyState::AwaitingRating { name, email },
        vec![Effect::reply(reprompt)],
    )
}

/// "no"/"não"/"n" in any case means no comment; anything else is kept trimmed.
pub fn on_comment(name: String, email: Email, rating: Rating, text: &str) -> TransitionResult {
    let comment = if is_decline(text) {
        String::new()
    } else {
        text.trim().to_string()
    };

    let draft = FeedbackDraft {
        name,
        email,
        rating,
        comment,
    };

    TransitionResult::new(
        SurveyState::Confirming {
            draft: draft.clone(),
        },
        vec![Effect::reply(ReplyContent::ConfirmSummary { draft })],
    )
}
