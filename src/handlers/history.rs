use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{ApiJson, AppError, Result};
use crate::models::{CreateHistoryEntry, HistoryItem};
use crate::repositories::HistoryRepository;

#[derive(Clone)]
pub struct HistoryState {
    pub history_repo: HistoryRepository,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    history: Vec<HistoryItem>,
}

pub async fn create(
    State(state): State<HistoryState>,
    ApiJson(entry): ApiJson<CreateHistoryEntry>,
) -> Result<Response> {
    let (Some(workout_id), Some(user_id)) = (entry.workout_id, entry.user_id) else {
        return Err(AppError::missing(&[
            ("workoutId", entry.workout_id.is_some()),
            ("userId", entry.user_id.is_some()),
        ]));
    };

    let entry = state.history_repo.create(workout_id, user_id).await?;
    tracing::info!("User {} completed workout {}", user_id, workout_id);

    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

pub async fn user_history(
    State(state): State<HistoryState>,
    Path(user_id): Path<i64>,
) -> Result<Json<HistoryResponse>> {
    let history = state.history_repo.list_for_user(user_id).await?;
    Ok(Json(HistoryResponse { history }))
}
