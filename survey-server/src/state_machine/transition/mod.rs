//! Pure state transition function.
//!
//! The transition function is the core of the state machine. It takes the
//! current state and an event, and returns the new state and a list of effects.
//! This function has NO side effects - it is pure and deterministic.

mod collecting;
mod confirming;
mod terminal;

use super::effect::{Effect, LogLevel, ReplyContent};
use super::event::Event;
use super::state::SurveyState;

/// Result of a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The new state after the transition.
    pub state: SurveyState,
    /// Effects to execute.
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SurveyState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    /// The reply effects, in order.
    pub fn replies(&self) -> impl Iterator<Item = &ReplyContent> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Reply { content } => Some(content),
            _ => None,
        })
    }
}

/// Pure state transition function.
///
/// Given the current state and an event, returns the new state and effects to execute.
/// Every (state, event) pair is matched explicitly.
pub fn transition(state: SurveyState, event: Event) -> TransitionResult {
    match event {
        Event::RestartRequested => restart(&state),

        Event::UserInput { text, received_at } => match state {
            SurveyState::Start => collecting::on_start(),
            SurveyState::AwaitingName => collecting::on_name(text),
            SurveyState::AwaitingEmail { name } => collecting::on_email(name, &text),
            SurveyState::AwaitingRating { name, email } => {
                collecting::on_rating(name, email, &text)
            }
            SurveyState::AwaitingComment {
                name,
                email,
                rating,
            } => collecting::on_comment(name, email, rating, &text),
            SurveyState::Confirming { draft } => confirming::on_answer(draft, &text, received_at),
            SurveyState::Saving { record } => confirming::on_input_while_saving(record),
            SurveyState::Done { record, outcome } => terminal::on_input(record, outcome),
        },

        Event::FeedbackSaved => confirming::on_saved(state),

        Event::FeedbackSaveFailed { error } => confirming::on_save_failed(state, error),
    }
}

/// Back to the greeting with every answer dropped.
fn restart(state: &SurveyState) -> TransitionResult {
    TransitionResult::new(
        SurveyState::Start,
        vec![
            Effect::Log {
                level: LogLevel::Info,
                message: format!("Survey restarted from stage {}", state.stage()),
            },
            Effect::reply(ReplyContent::Greeting),
        ],
    )
}

/// Keep the state and note the stray event.
fn ignore_unexpected(state: SurveyState, event_name: &str) -> TransitionResult {
    let message = format!("Ignoring {} in stage {}", event_name, state.stage());
    TransitionResult::new(
        state,
        vec![Effect::Log {
            level: LogLevel::Warn,
            message,
        }],
    )
}
