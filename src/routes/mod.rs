//! API routes
//!
//! Setup: `/characters` collects the two characters. Play: `/session` starts,
//! inspects, steers and ends the live session.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::conversation::{
    Character, CharacterError, CharacterPair, CharacterRoster, CharacterSlot, ConversationLog,
};
use crate::core::LiveSession;
use crate::session::{JudgeScores, ScoreCategory, Session, SessionError};
use crate::store::StoreError;
use crate::AppState;

/// Where a client should send the judge when no session can start
const SETUP_ROUTE: &str = "/characters";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Value,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: json!({}),
        }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    fn no_session() -> Self {
        Self::new(StatusCode::NOT_FOUND, "No active session")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "details": self.details,
            "status_code": self.status.as_u16(),
        }));
        (self.status, body).into_response()
    }
}

impl From<CharacterError> for ApiError {
    fn from(err: CharacterError) -> Self {
        match err {
            CharacterError::MissingCharacterPair(ref missing) => {
                let details = json!({ "missing": missing, "redirect": SETUP_ROUTE });
                ApiError::new(StatusCode::CONFLICT, err.to_string()).with_details(details)
            }
            CharacterError::RosterFull => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            CharacterError::DuplicateName(ref name) => {
                let details = json!({ "name": name });
                ApiError::new(StatusCode::BAD_REQUEST, "Character already exists")
                    .with_details(details)
            }
            CharacterError::MissingName | CharacterError::NameTooLong(_) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ScoreOutOfRange { .. } => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            SessionError::UnknownCategory(_) => {
                ApiError::new(StatusCode::NOT_FOUND, err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Character store failure");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Character store unavailable")
            .with_details(json!({ "error": err.to_string() }))
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RosterView {
    characters: CharacterRoster,
    complete: bool,
    missing: Vec<CharacterSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl RosterView {
    fn new(characters: CharacterRoster, updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            complete: characters.is_complete(),
            missing: characters.missing_slots(),
            characters,
            updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddedCharacter {
    slot: CharacterSlot,
    #[serde(flatten)]
    roster: RosterView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStarted {
    session_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    session_id: Uuid,
    characters: CharacterPair,
    conversation: ConversationLog,
    judge_feedback: String,
    judge_scores: JudgeScores,
    generating: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackUpdate {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoreUpdate {
    pub value: i64,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_characters(State(state): State<AppState>) -> Result<Json<RosterView>, ApiError> {
    let view = match state.store.load_roster().await? {
        Some(stored) => RosterView::new(stored.roster, Some(stored.updated_at)),
        None => RosterView::new(CharacterRoster::new(), None),
    };
    Ok(Json(view))
}

async fn add_character(
    State(state): State<AppState>,
    Json(character): Json<Character>,
) -> Result<(StatusCode, Json<AddedCharacter>), ApiError> {
    let (slot, roster) = state
        .store
        .update_roster(|roster| -> Result<_, ApiError> {
            let slot = roster.add(character)?;
            Ok((slot, roster.clone()))
        })
        .await?;
    tracing::info!(%slot, "Character created");

    Ok((
        StatusCode::CREATED,
        Json(AddedCharacter {
            slot,
            roster: RosterView::new(roster, Some(Utc::now())),
        }),
    ))
}

async fn clear_characters(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.clear_roster().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionStarted>), ApiError> {
    let roster = state.store.load_roster().await?.map(|stored| stored.roster);

    let live = LiveSession::start(
        roster,
        state.generator.clone(),
        state.config.session_settings(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Cannot start session");
        ApiError::from(e)
    })?;
    let session_id = live.id();

    // Replacing the previous session tears it down
    *state.live.lock().await = Some(live);

    Ok((StatusCode::CREATED, Json(SessionStarted { session_id })))
}

async fn get_session(State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    let guard = state.live.lock().await;
    let live = guard.as_ref().ok_or_else(ApiError::no_session)?;
    let snapshot = live.session().snapshot().await;

    Ok(Json(SessionView {
        session_id: live.id(),
        characters: snapshot.characters().clone(),
        conversation: snapshot.log().clone(),
        judge_feedback: snapshot.feedback().to_string(),
        judge_scores: *snapshot.scores(),
        generating: live.is_generating(),
    }))
}

async fn active_session(state: &AppState) -> Result<Arc<Session>, ApiError> {
    state
        .live
        .lock()
        .await
        .as_ref()
        .map(|live| live.session().clone())
        .ok_or_else(ApiError::no_session)
}

async fn set_feedback(
    State(state): State<AppState>,
    Json(update): Json<FeedbackUpdate>,
) -> Result<StatusCode, ApiError> {
    active_session(&state).await?.set_feedback(update.text).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_score(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(update): Json<ScoreUpdate>,
) -> Result<StatusCode, ApiError> {
    let category: ScoreCategory = category.parse()?;
    active_session(&state)
        .await?
        .set_score(category, update.value)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn end_session(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    match state.live.lock().await.take() {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::no_session()),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/characters",
            get(get_characters)
                .post(add_character)
                .delete(clear_characters),
        )
        .route(
            "/session",
            get(get_session).post(start_session).delete(end_session),
        )
        .route("/session/feedback", put(set_feedback))
        .route("/session/scores/:category", put(set_score))
}
