use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::web::{
    protocol::{
        CreateSessionRequest, LanguageRequest, SessionCreated, SessionDetails, SessionId, SessionInfo,
        TurnRequest, TurnResponse,
    },
    session_manager::{Session, SessionManager},
};

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // API routes
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/:id",
            get(get_session_details).delete(close_session),
        )
        .route("/api/sessions/:id/turn", post(submit_turn))
        .route("/api/sessions/:id/clear", post(clear_history))
        .route("/api/sessions/:id/language", put(set_language))
        .route("/health", get(health))
        // Single page UI
        .route("/", get(serve_index))
        .with_state(state)
}

async fn find_session(state: &AppState, id: &SessionId) -> Result<Arc<Session>, AppError> {
    state
        .session_manager
        .get_session(id)
        .await
        .ok_or_else(|| AppError::NotFound("Session not found".into()))
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/sessions - List all active sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions: Vec<SessionInfo> = state.session_manager.list_sessions().await;
    Json(serde_json::json!({ "sessions": sessions }))
}

/// POST /api/sessions - Create a new session; the body is optional
async fn create_session(
    State(state): State<AppState>,
    payload: Option<Json<CreateSessionRequest>>,
) -> (StatusCode, Json<SessionCreated>) {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let session = state.session_manager.create_session(request.language).await;
    let language = session.conversation.lock().await.language();

    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id,
            created_at: session.created_at.to_rfc3339(),
            language,
        }),
    )
}

/// GET /api/sessions/:id - Session info and history
async fn get_session_details(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionDetails>, AppError> {
    let session = find_session(&state, &id).await?;
    Ok(Json(session.get_details().await))
}

/// DELETE /api/sessions/:id - Close a session
async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.session_manager.remove_session(&id).await {
        return Err(AppError::NotFound("Session not found".into()));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Session closed successfully",
    })))
}

/// POST /api/sessions/:id/turn - Run one chat turn.
///
/// A failed translation or model run is still a 200: the error text is part of the history.
async fn submit_turn(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, AppError> {
    let Json(request) = payload?;
    if request.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".into()));
    }

    let session = find_session(&state, &id).await?;
    let result = state
        .session_manager
        .run_turn(&session, &request.prompt, request.language)
        .await;

    Ok(Json(result.into()))
}

/// POST /api/sessions/:id/clear - Reset history
async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<TurnResponse>, AppError> {
    let session = find_session(&state, &id).await?;
    let result = state.session_manager.clear_session(&session).await;
    Ok(Json(result.into()))
}

/// PUT /api/sessions/:id/language - Change the language selection
async fn set_language(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    payload: Result<Json<LanguageRequest>, JsonRejection>,
) -> Result<Json<SessionInfo>, AppError> {
    let Json(request) = payload?;
    let session = find_session(&state, &id).await?;
    state.session_manager.set_language(&session, request.language).await;
    Ok(Json(session.get_info().await))
}

/// GET / - Serve index page
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../../web/index.html"))
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Json(JsonRejection),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Json(rejection)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Json(rejection) => (rejection.status(), rejection.body_text()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
