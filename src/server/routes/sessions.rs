use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embedding::ScoredChunk;
use crate::mood::{Mood, MoodEntry, MoodSummary};
use crate::rag::QaChain;
use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::session::ChatSession;

pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<ChatSession>) {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.create_session().clone();
    (StatusCode::CREATED, Json(session))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSession>, ApiError> {
    let sessions = state.sessions.lock().await;
    Ok(Json(sessions.get(&id)?.clone()))
}

pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSession>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    Ok(Json(sessions.end_session(&id)?))
}

#[derive(Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub answer: String,
    pub source_documents: Vec<ScoredChunk>,
}

/// Record the question, answer it from the index, record the answer.
///
/// The question stays in the history even when answering fails.
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let question = request.content.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }

    state.sessions.lock().await.get_mut(&id)?.push_user(&question);

    let generator = state.generator()?;
    let retriever = state.retriever().await?;
    let chain = QaChain::new(retriever, generator, &state.config.retrieval)?;
    let answer = chain.invoke(&question).await?;

    state
        .sessions
        .lock()
        .await
        .get_mut(&id)?
        .push_assistant(&answer.result);

    Ok(Json(MessageResponse {
        answer: answer.result,
        source_documents: answer.source_documents,
    }))
}

#[derive(Deserialize)]
pub struct MoodRequest {
    pub mood: String,
    #[serde(default)]
    pub note: String,
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

pub async fn log_mood(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MoodRequest>,
) -> Result<(StatusCode, Json<MoodEntry>), ApiError> {
    let mood: Mood = request.mood.parse().map_err(ApiError::Unprocessable)?;
    let date = request
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id)?;
    let entry = session.moods.log(mood, request.note, date).clone();

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn mood_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MoodSummary>, ApiError> {
    let sessions = state.sessions.lock().await;
    Ok(Json(sessions.get(&id)?.moods.summary()))
}
