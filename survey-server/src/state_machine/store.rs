//! Session store for per-respondent state machines.
//!
//! Each session owns its message history and dialogue state. A session sits
//! behind its own mutex, so turns on one session run one at a time while
//! different sessions proceed independently.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::effect::ReplyContent;
use super::event::{user_input_event, Event};
use super::interpreter::{execute_effects, InterpreterContext};
use super::repository::FeedbackRepository;
use super::state::{Stage, SurveyState};
use super::transition::{transition, TransitionResult};
use crate::reply::{render, Locale};

/// Unique identifier for a respondent's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One respondent's conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub state: SurveyState,
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    /// Start of the latest turn, or creation time.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn new(id: SessionId, greeting: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: SurveyState::Start,
            history: vec![ChatMessage::assistant(greeting)],
            created_at: now,
            last_activity: now,
        }
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }
}

/// What one turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Rendered `Reply` effects, in order. Exactly one per turn: `Log` and
    /// `InsertFeedback` render nothing, and a confirmed summary defers its
    /// reply to the save result.
    pub replies: Vec<String>,
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotFound(SessionId),
    /// The task running the turn panicked. The session keeps its prior state.
    TurnFailed { id: SessionId, message: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "session {} not found", id),
            Self::TurnFailed { id, message } => {
                write!(f, "turn on session {} failed: {}", id, message)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Store for per-session state machines.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
    repository: Arc<dyn FeedbackRepository>,
    locale: Locale,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn FeedbackRepository>, locale: Locale) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            repository,
            locale,
        }
    }

    /// Start a new session; its history holds only the greeting.
    pub async fn create(&self) -> Session {
        let id = SessionId::new();
        let session = Session::new(id, render(&ReplyContent::Greeting, self.locale));
        let snapshot = session.clone();

        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::new(Mutex::new(session)));
        info!(session = %id, "Session created ({} active)", sessions.len());

        snapshot
    }

    /// Snapshot of a session. Waits for a turn in progress to finish.
    pub async fn get(&self, id: &SessionId) -> Option<Session> {
        let handle = self.sessions.read().await.get(id).cloned()?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Tear a session down, returning its final snapshot.
    pub async fn remove(&self, id: &SessionId) -> Option<Session> {
        let handle = self.sessions.write().await.remove(id)?;
        info!(session = %id, "Session removed");
        let session = handle.lock().await;
        Some(session.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove sessions whose last activity is before `cutoff`. Sessions in
    /// the middle of a turn are kept. Returns how many were removed.
    pub async fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.last_activity >= cutoff,
            Err(_) => true,
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(
                "Evicted {} idle session(s), {} still active",
                evicted,
                sessions.len()
            );
        }
        evicted
    }

    /// Handle one respondent message.
    pub async fn process_input(
        &self,
        id: &SessionId,
        text: impl Into<String>,
    ) -> Result<TurnOutcome, SessionError> {
        self.run_turn(id, user_input_event(text)).await
    }

    /// Start the conversation over: history reset to the greeting, answers dropped.
    pub async fn restart(&self, id: &SessionId) -> Result<TurnOutcome, SessionError> {
        self.run_turn(id, Event::RestartRequested).await
    }

    async fn handle(&self, id: &SessionId) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(SessionError::NotFound(*id))
    }

    /// Run a turn on its own task. Dropping the caller (a disconnected HTTP
    /// client) does not stop the turn, so the state is always written back
    /// and an insert that already ran is recorded as done.
    async fn run_turn(&self, id: &SessionId, event: Event) -> Result<TurnOutcome, SessionError> {
        let handle = self.handle(id).await?;
        let ctx = InterpreterContext {
            repository: self.repository.clone(),
            locale: self.locale,
            session_id: *id,
        };

        let turn = tokio::spawn(async move {
            let mut session = handle.lock_owned().await;
            process_event(&mut session, &ctx, event).await
        });

        turn.await.map_err(|e| SessionError::TurnFailed {
            id: *id,
            message: e.to_string(),
        })
    }
}

/// Run an event and every result event it causes, then record the replies.
///
/// The caller holds the session lock for the whole turn.
async fn process_event(session: &mut Session, ctx: &InterpreterContext, event: Event) -> TurnOutcome {
    match &event {
        Event::UserInput { text, .. } => session.history.push(ChatMessage::user(text.clone())),
        Event::RestartRequested => session.history.clear(),
        Event::FeedbackSaved | Event::FeedbackSaveFailed { .. } => {}
    }
    session.last_activity = Utc::now();

    // Working copy; the session keeps its previous state until the turn ends.
    let mut current_state = session.state.clone();
    let mut replies = Vec::new();
    let mut events_to_process = vec![event];

    while let Some(event) = events_to_process.pop() {
        debug!(
            session = %session.id,
            "Processing event {} in stage {}",
            event.log_summary(),
            current_state.stage()
        );

        let TransitionResult { state, effects } = transition(current_state, event);
        current_state = state;

        if !effects.is_empty() {
            let executed = execute_effects(ctx, effects).await;
            replies.extend(executed.replies);

            // Reverse so result events are processed in order.
            for result_event in executed.events.into_iter().rev() {
                events_to_process.push(result_event);
            }
        }
    }

    info!(session = %session.id, "Turn finished in stage {}", current_state.stage());

    session.state = current_state;
    session
        .history
        .extend(replies.iter().cloned().map(ChatMessage::assistant));

    TurnOutcome {
        replies,
        stage: session.state.stage(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::repository::{InMemoryRepository, RepositoryError};
    use crate::state_machine::state::{FeedbackRecord, PartialFeedback, SaveOutcome};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Backend whose inserts take a while to commit.
    struct SlowRepository {
        inner: InMemoryRepository,
        delay: Duration,
    }

    #[async_trait]
    impl FeedbackRepository for SlowRepository {
        async fn insert(&self, record: &FeedbackRecord) -> Result<(), RepositoryError> {
            tokio::time::sleep(self.delay).await;
            self.inner.insert(record).await
        }

        fn backend_name(&self) -> &'static str {
            "slow"
        }
    }

    fn store_with(repo: Arc<InMemoryRepository>) -> SessionStore {
        SessionStore::new(repo, Locale::English)
    }

    async fn answer_all(store: &SessionStore, id: &SessionId, inputs: &[&str]) -> TurnOutcome {
        let mut last = None;
        for input in inputs {
            last = Some(store.process_input(id, *input).await.unwrap());
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn test_new_session_starts_with_greeting() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let session = store.create().await;

        assert_eq!(session.stage(), Stage::Start);
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].role, Role::Assistant);
        assert_eq!(
            session.history[0].content,
            render(&ReplyContent::Greeting, Locale::English)
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_end_to_end_survey_persists_one_record() {
        let repo = Arc::new(InMemoryRepository::new());
        let store = store_with(repo.clone());
        let id = store.create().await.id;

        let outcome = answer_all(
            &store,
            &id,
            &["hi", "Ana", "ana@x.com", "9", "great service", "sim"],
        )
        .await;

        assert_eq!(outcome.stage, Stage::Done);
        assert_eq!(
            outcome.replies,
            vec![render(&ReplyContent::Saved, Locale::English)]
        );

        let records = repo.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ana");
        assert_eq!(records[0].email.as_str(), "ana@x.com");
        assert_eq!(records[0].rating.value(), 9);
        assert_eq!(records[0].comment, "great service");

        let session = store.get(&id).await.unwrap();
        // Greeting plus six user messages and six replies.
        assert_eq!(session.history.len(), 13);
        assert!(matches!(
            session.state,
            SurveyState::Done {
                outcome: SaveOutcome::Saved,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_completed_session_never_inserts_again() {
        let repo = Arc::new(InMemoryRepository::new());
        let store = store_with(repo.clone());
        let id = store.create().await.id;

        answer_all(&store, &id, &["hi", "Ana", "ana@x.com", "9", "no", "yes"]).await;
        let outcome = answer_all(&store, &id, &["yes", "sim", "y"]).await;

        assert_eq!(outcome.stage, Stage::Done);
        assert_eq!(
            outcome.replies,
            vec![render(&ReplyContent::Closed, Locale::English)]
        );
        assert_eq!(repo.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_reports_and_finishes() {
        let repo = Arc::new(InMemoryRepository::unavailable());
        let store = store_with(repo.clone());
        let id = store.create().await.id;

        let outcome = answer_all(&store, &id, &["hi", "Ana", "ana@x.com", "9", "n", "s"]).await;

        assert_eq!(outcome.stage, Stage::Done);
        assert_eq!(
            outcome.replies,
            vec![render(&ReplyContent::SaveFailed, Locale::English)]
        );
        assert!(repo.records().await.is_empty());

        // Coming back online does not resubmit.
        repo.set_unavailable(false);
        answer_all(&store, &id, &["sim"]).await;
        assert!(repo.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_answers_keep_stage() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let id = store.create().await.id;

        let outcome = answer_all(&store, &id, &["hi", "Ana", "not-an-email"]).await;
        assert_eq!(outcome.stage, Stage::AwaitingEmail);

        let outcome = answer_all(&store, &id, &["ana@x.com", "15"]).await;
        assert_eq!(outcome.stage, Stage::AwaitingRating);
        assert_eq!(
            outcome.replies,
            vec![render(&ReplyContent::RatingOutOfRange, Locale::English)]
        );
    }

    #[tokio::test]
    async fn test_rejecting_summary_clears_answers() {
        let repo = Arc::new(InMemoryRepository::new());
        let store = store_with(repo.clone());
        let id = store.create().await.id;

        let outcome = answer_all(&store, &id, &["hi", "Ana", "ana@x.com", "9", "ok", "não"]).await;

        assert_eq!(outcome.stage, Stage::Start);
        let session = store.get(&id).await.unwrap();
        assert_eq!(session.state.feedback(), PartialFeedback::default());
        assert!(repo.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_restart_resets_history_and_state() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let id = store.create().await.id;
        answer_all(&store, &id, &["hi", "Ana"]).await;

        let outcome = store.restart(&id).await.unwrap();

        assert_eq!(outcome.stage, Stage::Start);
        let session = store.get(&id).await.unwrap();
        assert_eq!(session.state, SurveyState::Start);
        assert_eq!(
            session.history,
            vec![ChatMessage::assistant(render(
                &ReplyContent::Greeting,
                Locale::English
            ))]
        );
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let first = store.create().await.id;
        let second = store.create().await.id;

        answer_all(&store, &first, &["hi", "Ana", "ana@x.com"]).await;

        assert_eq!(store.get(&first).await.unwrap().stage(), Stage::AwaitingRating);
        assert_eq!(store.get(&second).await.unwrap().stage(), Stage::Start);
    }

    #[tokio::test]
    async fn test_unknown_session_is_an_error() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let missing = SessionId::new();

        assert_eq!(
            store.process_input(&missing, "hi").await,
            Err(SessionError::NotFound(missing))
        );
        assert_eq!(
            store.restart(&missing).await,
            Err(SessionError::NotFound(missing))
        );
        assert!(store.get(&missing).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_tears_session_down() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let id = store.create().await.id;

        assert!(store.remove(&id).await.is_some());
        assert!(store.is_empty().await);
        assert!(store.remove(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_each_turn_produces_one_reply() {
        let repo = Arc::new(InMemoryRepository::new());
        let store = store_with(repo.clone());
        let id = store.create().await.id;

        let inputs = [
            "hi", "Ana", "nope", "ana@x.com", "abc", "15", "9", "n", "yes", "again",
        ];
        for input in inputs {
            let outcome = store.process_input(&id, input).await.unwrap();
            assert_eq!(outcome.replies.len(), 1, "input {:?}", input);
        }

        let outcome = store.restart(&id).await.unwrap();
        assert_eq!(outcome.replies.len(), 1);
        assert_eq!(repo.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_interrupt_turn() {
        let repo = Arc::new(SlowRepository {
            inner: InMemoryRepository::new(),
            delay: Duration::from_millis(200),
        });
        let store = Arc::new(SessionStore::new(repo.clone(), Locale::English));
        let id = store.create().await.id;
        answer_all(&store, &id, &["hi", "Ana", "ana@x.com", "9", "great service"]).await;

        let caller = {
            let store = store.clone();
            tokio::spawn(async move { store.process_input(&id, "sim").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        caller.abort();

        // Waits for the turn, which keeps running without its caller.
        let session = store.get(&id).await.unwrap();
        assert_eq!(session.stage(), Stage::Done);
        assert_eq!(session.history.len(), 13);
        assert_eq!(repo.inner.records().await.len(), 1);

        answer_all(&store, &id, &["sim"]).await;
        assert_eq!(repo.inner.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_idle_removes_only_stale_sessions() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let active = store.create().await.id;
        let idle = store.create().await.id;

        tokio::time::sleep(Duration::from_millis(5)).await;
        let cutoff = Utc::now();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.process_input(&active, "hi").await.unwrap();

        assert_eq!(store.evict_idle(cutoff).await, 1);
        assert!(store.get(&idle).await.is_none());
        assert_eq!(store.get(&active).await.unwrap().stage(), Stage::AwaitingName);
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_session_mid_turn() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let id = store.create().await.id;

        let handle = store.handle(&id).await.unwrap();
        let locked = handle.lock().await;
        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(store.evict_idle(future).await, 0);
        drop(locked);

        assert_eq!(store.evict_idle(future).await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_turn_refreshes_last_activity() {
        let store = store_with(Arc::new(InMemoryRepository::new()));
        let created = store.create().await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.process_input(&created.id, "hi").await.unwrap();

        let session = store.get(&created.id).await.unwrap();
        assert_eq!(session.created_at, created.created_at);
        assert!(session.last_activity > created.last_activity);
    }

    #[test]
    fn test_session_id_parses_uuid() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
