//! Effect interpreter.
//!
//! The interpreter is the boundary between the pure state machine and the
//! outside world. It renders replies, runs inserts against the feedback
//! repository and turns their outcome back into events.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::effect::{Effect, LogLevel};
use super::event::Event;
use super::repository::FeedbackRepository;
use super::state::FeedbackRecord;
use super::store::SessionId;
use crate::reply::{render, Locale};

/// Context needed by the interpreter to execute effects.
pub struct InterpreterContext {
    pub repository: Arc<dyn FeedbackRepository>,
    pub locale: Locale,
    pub session_id: SessionId,
}

/// Result of executing an effect.
#[derive(Debug, PartialEq, Eq)]
pub enum EffectResult {
    /// Rendered assistant message.
    Replied(String),
    /// Events to feed back into the machine.
    Events(Vec<Event>),
    None,
}

/// Everything a batch of effects produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecutedEffects {
    pub replies: Vec<String>,
    pub events: Vec<Event>,
}

/// Execute a list of effects in order.
pub async fn execute_effects(ctx: &InterpreterContext, effects: Vec<Effect>) -> ExecutedEffects {
    let mut executed = ExecutedEffects::default();

    for effect in effects {
        match execute_effect(ctx, effect).await {
            EffectResult::Replied(text) => executed.replies.push(text),
            EffectResult::Events(events) => executed.events.extend(events),
            EffectResult::None => {}
        }
    }

    executed
}

/// Execute a single effect.
async fn execute_effect(ctx: &InterpreterContext, effect: Effect) -> EffectResult {
    match effect {
        Effect::Reply { content } => EffectResult::Replied(render(&content, ctx.locale)),

        Effect::InsertFeedback { record } => execute_insert_feedback(ctx, &record).await,

        Effect::Log { level, message } => {
            match level {
                LogLevel::Debug => debug!(session = %ctx.session_id, "{}", message),
                LogLevel::Info => info!(session = %ctx.session_id, "{}", message),
                LogLevel::Warn => warn!(session = %ctx.session_id, "{}", message),
                LogLevel::Error => error!(session = %ctx.session_id, "{}", message),
            }
            EffectResult::None
        }
    }
}

/// Insert a confirmed record. Failure becomes an event, never an error.
async fn execute_insert_feedback(ctx: &InterpreterContext, record: &FeedbackRecord) -> EffectResult {
    info!(
        session = %ctx.session_id,
        backend = ctx.repository.backend_name(),
        "Saving feedback (rating {}, {})",
        record.rating,
        if record.comment().is_some() { "with comment" } else { "no comment" }
    );

    match ctx.repository.insert(record).await {
        Ok(()) => EffectResult::Events(vec![Event::FeedbackSaved]),
        Err(e) => {
            error!(session = %ctx.session_id, "Failed to save feedback: {}", e);
            EffectResult::Events(vec![Event::FeedbackSaveFailed {
                error: e.to_string(),
            }])
        }
    }
}
