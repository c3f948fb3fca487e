//! Explicit state machine for the satisfaction survey dialogue.
//!
//! This module implements a pure functional state machine for walking one
//! respondent through the survey. The design separates:
//! - **State**: What the conversation has collected (`SurveyState`)
//! - **Events**: What happened (`Event`)
//! - **Effects**: What to do (`Effect`)
//! - **Transition**: Pure function `(State, Event) -> (State, Vec<Effect>)`
//!
//! The interpreter executes effects against the feedback repository and
//! returns result events. The store keeps one machine per session.

pub mod effect;
pub mod event;
pub mod interpreter;
pub mod repository;
pub mod state;
pub mod store;
pub mod transition;

pub use effect::*;
pub use event::*;
pub use interpreter::{execute_effects, InterpreterContext};
pub use repository::{
    FeedbackRepository, InMemoryRepository, PostgresConfig, PostgresRepository, RepositoryError,
    SqliteRepository,
};
pub use state::*;
pub use store::{ChatMessage, Role, Session, SessionError, SessionId, SessionStore, TurnOutcome};
pub use transition::*;
