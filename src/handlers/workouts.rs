use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ApiJson, AppError, Result};
use crate::handlers::deserialize_optional_i64;
use crate::models::{SaveWorkoutRequest, WorkoutSummary, WorkoutWithExercises};
use crate::repositories::WorkoutRepository;

#[derive(Clone)]
pub struct WorkoutsState {
    pub workout_repo: WorkoutRepository,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    user_id: Option<i64>,
}

#[derive(Serialize)]
pub struct WorkoutsResponse {
    workouts: Vec<WorkoutSummary>,
}

#[derive(Serialize)]
pub struct WorkoutResponse {
    workout: WorkoutWithExercises,
}

pub async fn list(
    State(state): State<WorkoutsState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<WorkoutsResponse>> {
    let workouts = state.workout_repo.list_summaries(query.user_id).await?;
    Ok(Json(WorkoutsResponse { workouts }))
}

pub async fn show(
    State(state): State<WorkoutsState>,
    Path(id): Path<i64>,
) -> Result<Json<WorkoutResponse>> {
    let workout = state
        .workout_repo
        .find_with_exercises(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Workout not found".to_string()))?;

    Ok(Json(WorkoutResponse { workout }))
}

pub async fn create(
    State(state): State<WorkoutsState>,
    ApiJson(request): ApiJson<SaveWorkoutRequest>,
) -> Result<Response> {
    let (Some(workout), Some(user_id)) = (&request.workout, request.user_id) else {
        return Err(AppError::missing(&[
            ("workout", request.workout.is_some()),
            ("userId", request.user_id.is_some()),
        ]));
    };

    let saved = state.workout_repo.save_generated(workout, user_id).await?;
    Ok((StatusCode::CREATED, Json(WorkoutResponse { workout: saved })).into_response())
}

pub async fn delete(
    State(state): State<WorkoutsState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    if !state.workout_repo.delete(id).await? {
        return Err(AppError::NotFound("Workout not found.".to_string()));
    }

    tracing::info!("Deleted workout {}", id);
    Ok(Json(json!({ "message": "Workout deleted successfully." })).into_response())
}
