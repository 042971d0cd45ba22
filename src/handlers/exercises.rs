use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::Result;
use crate::handlers::{deserialize_optional_i64, empty_as_none};
use crate::repositories::exercise_repo::{ExercisePage, ExerciseQuery};
use crate::repositories::ExerciseRepository;

#[derive(Clone)]
pub struct ExercisesState {
    pub exercise_repo: ExerciseRepository,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    level: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    equipment: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    muscle: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    limit: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    offset: Option<i64>,
}

impl From<ListQuery> for ExerciseQuery {
    fn from(query: ListQuery) -> Self {
        // Out-of-range numbers are clamped rather than rejected.
        let to_u32 = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
        ExerciseQuery {
            search: query.search,
            level: query.level,
            equipment: query.equipment,
            muscle: query.muscle,
            limit: query.limit.map(to_u32),
            offset: query.offset.map(to_u32),
        }
    }
}

pub async fn list(
    State(state): State<ExercisesState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ExercisePage>> {
    let page = state.exercise_repo.query(query.into()).await?;
    Ok(Json(page))
}
