use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::handlers::{auth, exercises, generator, health, history, workouts};

pub fn create_router(
    auth_state: auth::AuthState,
    exercises_state: exercises::ExercisesState,
    workouts_state: workouts::WorkoutsState,
    generator_state: generator::GeneratorState,
    history_state: history::HistoryState,
) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Users & auth
        .route("/api/users", get(auth::users_list))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .with_state(auth_state)
        // Exercise catalog
        .route("/api/exercises", get(exercises::list))
        .with_state(exercises_state)
        // Workouts
        .route("/api/workouts", get(workouts::list).post(workouts::create))
        .route(
            "/api/workouts/{id}",
            get(workouts::show).delete(workouts::delete),
        )
        .with_state(workouts_state)
        // Generation
        .route("/api/generate-workout", post(generator::generate))
        .with_state(generator_state)
        // History
        .route("/api/history", post(history::create))
        .route("/api/users/{id}/history", get(history::user_history))
        .with_state(history_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
}
