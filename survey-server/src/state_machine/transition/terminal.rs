//! Done state transitions.

use super::TransitionResult;
use crate::state_machine::effect::{Effect, ReplyContent};
use crate::state_machine::state::{FeedbackRecord, SaveOutcome, SurveyState};

/// The survey is over: every input gets the closing message and nothing
/// is inserted again.
pub fn on_input(record: FeedbackRecord, outcome: SaveOutcome) -> TransitionResult {
    TransitionResult::new(
        SurveyState::Done { record, outcome },
        vec![Effect::reply(ReplyContent::Closed)],
    )
}
