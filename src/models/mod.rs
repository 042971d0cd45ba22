pub mod exercise;
pub mod from_row;
pub mod generated;
pub mod history;
pub mod user;
pub mod workout;

pub use exercise::{Exercise, ExerciseType, MuscleTags};
pub use from_row::FromSqliteRow;
pub use generated::{GeneratedExercise, GeneratedWorkout, SaveWorkoutRequest};
pub use history::{CreateHistoryEntry, HistoryEntry, HistoryItem};
pub use user::{CreateUser, LoginCredentials, User, UserRole, UserSummary};
pub use workout::{Workout, WorkoutSummary, WorkoutWithExercises};
