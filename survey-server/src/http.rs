//! HTTP rendering surface for survey sessions.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::state_machine::{
    ChatMessage, PartialFeedback, Session, SessionError, SessionId, Stage, TurnOutcome,
};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub stage: Stage,
    pub messages: Vec<ChatMessage>,
    pub feedback: PartialFeedback,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            stage: session.stage(),
            feedback: session.state.feedback(),
            messages: session.history,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub replies: Vec<String>,
    pub stage: Stage,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            replies: outcome.replies,
            stage: outcome.stage,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(String),
    EmptyMessage,
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => Self::SessionNotFound(id.to_string()),
            err @ SessionError::TurnFailed { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::SessionNotFound(id) => (StatusCode::NOT_FOUND, format!("session {} not found", id)),
            Self::EmptyMessage => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "message text must not be empty".to_string(),
            ),
            Self::Internal(message) => {
                error!("{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Ids that do not parse cannot name a session.
fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::SessionNotFound(raw.to_string()))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "satisfaction-survey",
        "version": crate::get_version(),
    }))
}

async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionResponse>) {
    let session = state.store.create().await;
    (StatusCode::CREATED, Json(session.into()))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = parse_session_id(&id)?;
    let session = state
        .store
        .get(&id)
        .await
        .ok_or(SessionError::NotFound(id))?;
    Ok(Json(session.into()))
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let id = parse_session_id(&id)?;
    if request.text.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }
    let outcome = state.store.process_input(&id, request.text).await?;
    Ok(Json(outcome.into()))
}

async fn restart_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TurnResponse>, ApiError> {
    let id = parse_session_id(&id)?;
    let outcome = state.store.restart(&id).await?;
    Ok(Json(outcome.into()))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_session_id(&id)?;
    state
        .store
        .remove(&id)
        .await
        .ok_or(SessionError::NotFound(id))?;
    info!(session = %id, "Session deleted over HTTP");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/messages", post(post_message))
        .route("/sessions/{id}/restart", post(restart_session))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::Locale;
    use crate::state_machine::{InMemoryRepository, Role};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let state = Arc::new(AppState::new(repo.clone(), Locale::English));
        (router(state), repo)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn new_session(app: &Router) -> SessionResponse {
        let response = send(app, "POST", "/sessions", None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    async fn say(app: &Router, id: SessionId, text: &str) -> TurnResponse {
        let response = send(
            app,
            "POST",
            &format!("/sessions/{}/messages", id),
            Some(json!({ "text": text })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = send(&app, "GET", "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_create_session_returns_greeting() {
        let (app, _) = app();
        let session = new_session(&app).await;
        assert_eq!(session.stage, Stage::Start);
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_session_json_uses_camel_case_and_snake_case_stage() {
        let (app, _) = app();
        let response = send(&app, "POST", "/sessions", None).await;
        let body: serde_json::Value = json_body(response).await;
        assert!(body["sessionId"].is_string());
        assert_eq!(body["stage"], "start");
        assert_eq!(body["messages"][0]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_full_survey_over_http() {
        let (app, repo) = app();
        let id = new_session(&app).await.session_id;

        for text in ["hi", "Ana", "ana@x.com", "9", "great service"] {
            say(&app, id, text).await;
        }
        let turn = say(&app, id, "sim").await;
        assert_eq!(turn.stage, Stage::Done);
        assert_eq!(turn.replies.len(), 1);

        assert_eq!(repo.records().await.len(), 1);

        let response = send(&app, "GET", &format!("/sessions/{}", id), None).await;
        let session: SessionResponse = json_body(response).await;
        assert_eq!(session.stage, Stage::Done);
        assert_eq!(session.feedback.name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_invalid_email_stays_in_stage() {
        let (app, _) = app();
        let id = new_session(&app).await.session_id;
        say(&app, id, "hi").await;
        say(&app, id, "Ana").await;

        let turn = say(&app, id, "ana-at-x").await;
        assert_eq!(turn.stage, Stage::AwaitingEmail);
    }

    #[tokio::test]
    async fn test_restart_over_http() {
        let (app, _) = app();
        let id = new_session(&app).await.session_id;
        say(&app, id, "hi").await;

        let response = send(&app, "POST", &format!("/sessions/{}/restart", id), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let turn: TurnResponse = json_body(response).await;
        assert_eq!(turn.stage, Stage::Start);
    }

    #[tokio::test]
    async fn test_empty_text_is_unprocessable() {
        let (app, _) = app();
        let id = new_session(&app).await.session_id;

        let response = send(
            &app,
            "POST",
            &format!("/sessions/{}/messages", id),
            Some(json!({ "text": "   " })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (app, _) = app();
        let missing = SessionId::new();

        let response = send(&app, "GET", &format!("/sessions/{}", missing), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            &app,
            "POST",
            &format!("/sessions/{}/messages", missing),
            Some(json!({ "text": "hi" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, "GET", "/sessions/not-a-uuid", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_failed_turn_is_internal_error() {
        let err = ApiError::from(SessionError::TurnFailed {
            id: SessionId::new(),
            message: "task panicked".to_string(),
        });
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (app, _) = app();
        let id = new_session(&app).await.session_id;

        let response = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
