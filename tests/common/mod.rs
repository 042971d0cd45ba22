#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fitos::db::{create_memory_pool, DbPool};
use fitos::generator::{GenerationError, TextGenerator, WorkoutGenerator};
use fitos::migrations::run_migrations_for_tests;
use fitos::models::{ExerciseType, User};
use fitos::repositories::exercise_repo::NewExercise;
use fitos::repositories::{
    ExerciseRepository, HistoryRepository, UserRepository, WorkoutRepository,
};

pub const CANNED_WORKOUT: &str = r#"```json
{
    "name": "Quick Burn",
    "description": "A short full-body circuit.",
    "exercises": [
        {"name": "Push Up", "reps": "10-12 reps", "target_muscle": "Chest",
         "equipment": "Bodyweight", "level": "Beginner", "type": "reps",
         "instructions": "Lower and press."},
        {"name": "Plank", "reps": "45 seconds", "target_muscle": "Abs",
         "equipment": "Bodyweight", "level": "Beginner", "type": "time",
         "instructions": "Hold a straight line."}
    ]
}
```"#;

pub fn setup_test_db() -> DbPool {
    let pool = create_memory_pool().expect("Failed to create test database");
    run_migrations_for_tests(&pool).expect("Failed to run migrations");
    pool
}

/// Text generator that answers every prompt with the same reply.
pub struct CannedGenerator {
    reply: Result<String, String>,
}

impl CannedGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
        })
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.reply.clone().map_err(GenerationError::Upstream)
    }
}

pub fn create_test_app(pool: DbPool) -> Router {
    create_test_app_with_generator(pool, CannedGenerator::replying(CANNED_WORKOUT))
}

pub fn create_test_app_with_generator(pool: DbPool, backend: Arc<dyn TextGenerator>) -> Router {
    use fitos::handlers::{auth, exercises, generator, history, workouts};

    let auth_state = auth::AuthState {
        user_repo: UserRepository::new(pool.clone()),
    };
    let exercises_state = exercises::ExercisesState {
        exercise_repo: ExerciseRepository::new(pool.clone()),
    };
    let workouts_state = workouts::WorkoutsState {
        workout_repo: WorkoutRepository::new(pool.clone()),
    };
    let generator_state = generator::GeneratorState {
        generator: WorkoutGenerator::new(backend),
    };
    let history_state = history::HistoryState {
        history_repo: HistoryRepository::new(pool),
    };

    fitos::routes::create_router(
        auth_state,
        exercises_state,
        workouts_state,
        generator_state,
        history_state,
    )
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// Test data creation helpers
pub async fn create_test_user(pool: &DbPool, name: &str, email: &str, password: &str) -> User {
    let user_repo = UserRepository::new(pool.clone());
    user_repo.create(name, email, password).await.unwrap()
}

pub async fn create_test_exercise(
    pool: &DbPool,
    name: &str,
    muscle: &str,
    level: &str,
    equipment: &str,
) -> fitos::models::Exercise {
    let exercise_repo = ExerciseRepository::new(pool.clone());
    exercise_repo
        .create(NewExercise {
            name: name.to_string(),
            muscles: [muscle].into_iter().collect(),
            level: Some(level.to_string()),
            equipment: Some(equipment.to_string()),
            reps: Some("10 reps".to_string()),
            exercise_type: ExerciseType::Reps,
            ..NewExercise::default()
        })
        .await
        .unwrap()
}

/// Saves the canned generated workout for `user_id` and returns the stored copy.
pub async fn create_test_workout(
    pool: &DbPool,
    user_id: i64,
) -> fitos::models::WorkoutWithExercises {
    let workout = fitos::generator::parse_workout(CANNED_WORKOUT).unwrap();
    WorkoutRepository::new(pool.clone())
        .save_generated(&workout, user_id)
        .await
        .unwrap()
}
