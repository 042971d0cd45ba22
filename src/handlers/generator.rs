use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::{ApiJson, AppError, Result};
use crate::generator::{GenerateWorkoutRequest, WorkoutGenerator};
use crate::handlers::non_blank;
use crate::models::GeneratedWorkout;

#[derive(Clone)]
pub struct GeneratorState {
    pub generator: WorkoutGenerator,
}

#[derive(Serialize)]
pub struct GeneratedResponse {
    workout: GeneratedWorkout,
}

pub async fn generate(
    State(state): State<GeneratorState>,
    ApiJson(mut request): ApiJson<GenerateWorkoutRequest>,
) -> Result<Json<GeneratedResponse>> {
    request.goal = non_blank(request.goal);
    request.level = non_blank(request.level);
    request.duration = non_blank(request.duration);

    if let Some(err) = AppError::missing_fields(&[
        ("goal", request.goal.is_some()),
        ("level", request.level.is_some()),
        ("duration", request.duration.is_some()),
    ]) {
        return Err(err);
    }

    let workout = state.generator.generate(&request).await?;
    Ok(Json(GeneratedResponse { workout }))
}
