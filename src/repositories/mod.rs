pub mod exercise_repo;
pub mod history_repo;
pub mod user_repo;
pub mod workout_repo;

pub use exercise_repo::ExerciseRepository;
pub use history_repo::HistoryRepository;
pub use user_repo::UserRepository;
pub use workout_repo::{CatalogWorkout, WorkoutRepository};
