use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::db::DbPool;
use crate::error::{constraint_kind, AppError, ConstraintKind, Result};
use crate::models::exercise::{BODYWEIGHT, DEFAULT_INSTRUCTIONS, DEFAULT_LEVEL};
use crate::models::{
    Exercise, ExerciseType, FromSqliteRow, GeneratedExercise, GeneratedWorkout, MuscleTags,
    Workout, WorkoutSummary, WorkoutWithExercises,
};
use crate::repositories::exercise_repo::{find_id_by_name, insert_exercise, NewExercise};

/// A catalog workout whose exercises are linked by name.
#[derive(Debug, Clone)]
pub struct CatalogWorkout {
    pub name: String,
    pub description: String,
    pub duration: String,
    pub exercise_names: Vec<String>,
}

impl From<&GeneratedExercise> for NewExercise {
    fn from(candidate: &GeneratedExercise) -> Self {
        let duration_seconds = match candidate.exercise_type {
            ExerciseType::Time => candidate.resolved_duration(),
            ExerciseType::Reps => None,
        };
        let mut muscles = MuscleTags::new();
        if let Some(muscle) = candidate.target_muscle.as_deref() {
            muscles.insert(muscle);
        }

        NewExercise {
            name: candidate.name.trim().to_string(),
            instructions: Some(
                non_blank(candidate.instructions.as_deref())
                    .unwrap_or(DEFAULT_INSTRUCTIONS)
                    .to_string(),
            ),
            muscles,
            level: Some(
                non_blank(candidate.level.as_deref())
                    .unwrap_or(DEFAULT_LEVEL)
                    .to_string(),
            ),
            equipment: Some(
                non_blank(candidate.equipment.as_deref())
                    .unwrap_or(BODYWEIGHT)
                    .to_string(),
            ),
            video_urls: Vec::new(),
            image_url: None,
            reps: candidate.reps.clone(),
            exercise_type: candidate.exercise_type,
            duration_seconds,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Default)]
struct ReconcileStats {
    reused: usize,
    created: usize,
}

/// Saves a candidate workout and its exercises in one transaction.
///
/// Each candidate exercise resolves to an existing catalog row by case-insensitive exact
/// name, or becomes a new row. Near-duplicates such as "Push Up" and "Push-up" are NOT
/// merged. SQLite's `NOCASE` folds ASCII letters only, so "Übung" and "übung" are
/// distinct names. Returning early drops the transaction, which rolls everything back.
fn reconcile(conn: &mut Connection, workout: &GeneratedWorkout, user_id: i64) -> Result<i64> {
    let tx = conn.transaction()?;
    let now = Utc::now();

    tx.execute(
        "INSERT INTO workouts (name, description, duration, is_public, created_by, created_at)
         VALUES (?, ?, ?, 0, ?, ?)",
        rusqlite::params![
            workout.name.trim(),
            workout.description,
            workout.duration,
            user_id,
            now
        ],
    )
    .map_err(|e| match constraint_kind(&e) {
        Some(ConstraintKind::ForeignKey) => AppError::NotFound("User not found".to_string()),
        _ => AppError::SaveFailed(e.to_string()),
    })?;
    let workout_id = tx.last_insert_rowid();

    let mut stats = ReconcileStats::default();
    for candidate in &workout.exercises {
        let exercise_id = match find_id_by_name(&tx, &candidate.name)
            .map_err(|e| AppError::SaveFailed(e.to_string()))?
        {
            Some(id) => {
                tracing::debug!("Reusing exercise {} for '{}'", id, candidate.name.trim());
                stats.reused += 1;
                id
            }
            None => {
                let id = insert_exercise(&tx, &NewExercise::from(candidate))
                    .map_err(|e| AppError::SaveFailed(e.to_string()))?;
                tracing::debug!("Created exercise {} for '{}'", id, candidate.name.trim());
                stats.created += 1;
                id
            }
        };

        // A candidate naming the same exercise twice links it once.
        tx.execute(
            "INSERT OR IGNORE INTO workout_exercises (workout_id, exercise_id) VALUES (?, ?)",
            rusqlite::params![workout_id, exercise_id],
        )
        .map_err(|e| AppError::SaveFailed(e.to_string()))?;
    }

    tx.commit()
        .map_err(|e| AppError::SaveFailed(e.to_string()))?;

    tracing::info!(
        "Saved workout {} for user {} ({} exercises reused, {} created)",
        workout_id,
        user_id,
        stats.reused,
        stats.created
    );
    Ok(workout_id)
}

fn load_with_exercises(conn: &Connection, id: i64) -> rusqlite::Result<Option<WorkoutWithExercises>> {
    let workout = conn
        .query_row("SELECT * FROM workouts WHERE id = ?", [id], Workout::from_row)
        .optional()?;
    let Some(workout) = workout else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT e.* FROM exercises e
         JOIN workout_exercises we ON e.id = we.exercise_id
         WHERE we.workout_id = ?
         ORDER BY we.rowid",
    )?;
    let exercises = stmt
        .query_map([id], Exercise::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(WorkoutWithExercises { workout, exercises }))
}

#[derive(Clone)]
pub struct WorkoutRepository {
    pool: DbPool,
}

impl WorkoutRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM workouts", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Lists every workout, or only those visible to `viewer` (public or created by them).
    pub async fn list_summaries(&self, viewer: Option<i64>) -> Result<Vec<WorkoutSummary>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let workouts = match viewer {
                Some(user_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, name, description, duration FROM workouts
                         WHERE is_public = 1 OR created_by = ?
                         ORDER BY id",
                    )?;
                    let rows = stmt
                        .query_map([user_id], WorkoutSummary::from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn
                        .prepare("SELECT id, name, description, duration FROM workouts ORDER BY id")?;
                    let rows = stmt
                        .query_map([], WorkoutSummary::from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };
            Ok(workouts)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Workout>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let result = conn
                .query_row("SELECT * FROM workouts WHERE id = ?", [id], Workout::from_row)
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// The workout with its exercises in the order they were linked.
    pub async fn find_with_exercises(&self, id: i64) -> Result<Option<WorkoutWithExercises>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            Ok(load_with_exercises(&conn, id)?)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Persists a generated workout as a private workout owned by `user_id`.
    pub async fn save_generated(
        &self,
        workout: &GeneratedWorkout,
        user_id: i64,
    ) -> Result<WorkoutWithExercises> {
        workout.validate().map_err(AppError::Validation)?;

        let pool = self.pool.clone();
        let workout = workout.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let id = reconcile(&mut conn, &workout, user_id)?;
            load_with_exercises(&conn, id)?
                .ok_or_else(|| AppError::Internal(format!("saved workout {id} vanished")))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Inserts a public catalog workout, linking exercises by name.
    ///
    /// Returns the new id and the names that matched no catalog exercise.
    pub async fn create_catalog_workout(&self, seed: CatalogWorkout) -> Result<(i64, Vec<String>)> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO workouts (name, description, duration, is_public, created_at)
                 VALUES (?, ?, ?, 1, ?)",
                rusqlite::params![seed.name, seed.description, seed.duration, Utc::now()],
            )?;
            let workout_id = tx.last_insert_rowid();

            let mut missing = Vec::new();
            for name in &seed.exercise_names {
                match find_id_by_name(&tx, name)? {
                    Some(exercise_id) => {
                        tx.execute(
                            "INSERT OR IGNORE INTO workout_exercises (workout_id, exercise_id) VALUES (?, ?)",
                            rusqlite::params![workout_id, exercise_id],
                        )?;
                    }
                    None => missing.push(name.clone()),
                }
            }

            tx.commit()?;
            Ok((workout_id, missing))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Deletes a workout and its links. Workouts with completion history are kept.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn
                .execute("DELETE FROM workouts WHERE id = ?", [id])
                .map_err(|e| match constraint_kind(&e) {
                    Some(ConstraintKind::ForeignKey) => AppError::Conflict(
                        "Workout has completion history and cannot be deleted.".to_string(),
                    ),
                    _ => AppError::Database(e),
                })?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
