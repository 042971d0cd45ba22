use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitos::config::Config;
use fitos::generator::{gemini::GeminiClient, WorkoutGenerator};
use fitos::handlers::{auth, exercises, generator, history, workouts};
use fitos::repositories::{
    ExerciseRepository, HistoryRepository, UserRepository, WorkoutRepository,
};
use fitos::{db, migrations, routes, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitos=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Connecting to database: {}", config.database_url);

    let pool = db::create_pool(&config.database_url)?;
    migrations::run_migrations(&pool)?;

    // Create repositories
    let user_repo = UserRepository::new(pool.clone());
    let exercise_repo = ExerciseRepository::new(pool.clone());
    let workout_repo = WorkoutRepository::new(pool.clone());
    let history_repo = HistoryRepository::new(pool.clone());

    if let Some(path) = &config.exercises_import_path {
        tracing::info!("Importing exercises from {}", path.display());
        seed::import_exercises_from_path(&exercise_repo, path).await?;
    }

    if config.seed_defaults {
        seed::seed_defaults(&user_repo, &exercise_repo, &workout_repo).await?;
    }

    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; workout generation will fail");
    }
    let backend = GeminiClient::new(config.gemini.clone())?;

    // Create handler states
    let auth_state = auth::AuthState {
        user_repo: user_repo.clone(),
    };
    let exercises_state = exercises::ExercisesState {
        exercise_repo: exercise_repo.clone(),
    };
    let workouts_state = workouts::WorkoutsState {
        workout_repo: workout_repo.clone(),
    };
    let generator_state = generator::GeneratorState {
        generator: WorkoutGenerator::new(Arc::new(backend)),
    };
    let history_state = history::HistoryState { history_repo };

    let app = routes::create_router(
        auth_state,
        exercises_state,
        workouts_state,
        generator_state,
        history_state,
    );

    // Start server
    let addr = config.server_addr();
    tracing::info!("Starting server at http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
