use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::models::ExerciseType;
use crate::repositories::exercise_repo::{ImportSummary, NewExercise};
use crate::repositories::{
    CatalogWorkout, ExerciseRepository, UserRepository, WorkoutRepository,
};

struct DefaultExercise {
    name: &'static str,
    muscle: &'static str,
    level: &'static str,
    equipment: &'static str,
    reps: &'static str,
    duration_seconds: Option<i64>,
}

const DEFAULT_EXERCISES: &[DefaultExercise] = &[
    DefaultExercise { name: "Chin Ups", muscle: "Lats", level: "Intermediate", equipment: "Pull Up Bar", reps: "8-10 reps, 3 sets", duration_seconds: None },
    DefaultExercise { name: "Barbell Bench Press", muscle: "Chest", level: "Intermediate", equipment: "Barbell", reps: "8-10 reps, 4 sets", duration_seconds: None },
    DefaultExercise { name: "Dumbbell Lateral Raise", muscle: "Shoulders", level: "Beginner", equipment: "Dumbbell", reps: "12-15 reps, 3 sets", duration_seconds: None },
    DefaultExercise { name: "Cable Push Down", muscle: "Triceps", level: "Beginner", equipment: "Cable", reps: "12-15 reps, 3 sets", duration_seconds: None },
    DefaultExercise { name: "Barbell High Bar Squat", muscle: "Quads", level: "Intermediate", equipment: "Barbell", reps: "6-8 reps, 4 sets", duration_seconds: None },
    DefaultExercise { name: "Bodyweight Squat", muscle: "Quads", level: "Beginner", equipment: "Bodyweight", reps: "20 reps, 3 sets", duration_seconds: None },
    DefaultExercise { name: "Hand Plank", muscle: "Abs", level: "Beginner", equipment: "Bodyweight", reps: "45s, 3 sets", duration_seconds: Some(45) },
    DefaultExercise { name: "Kettlebell Russian Twist", muscle: "Obliques", level: "Intermediate", equipment: "Kettlebell", reps: "20 reps (10 per side), 3 sets", duration_seconds: None },
    DefaultExercise { name: "Push-ups", muscle: "Chest", level: "Beginner", equipment: "Bodyweight", reps: "10-15 reps", duration_seconds: None },
    DefaultExercise { name: "Air Squats", muscle: "Quads", level: "Beginner", equipment: "Bodyweight", reps: "20 reps", duration_seconds: None },
    DefaultExercise { name: "Plank Shoulder Taps", muscle: "Abs", level: "Intermediate", equipment: "Bodyweight", reps: "20 taps (10 per side)", duration_seconds: None },
    DefaultExercise { name: "Superman Hold", muscle: "Lower Back", level: "Beginner", equipment: "Bodyweight", reps: "30s", duration_seconds: Some(30) },
    DefaultExercise { name: "Reverse Lunges", muscle: "Glutes", level: "Beginner", equipment: "Bodyweight", reps: "12 reps per leg", duration_seconds: None },
    DefaultExercise { name: "Leg Raises", muscle: "Abs", level: "Beginner", equipment: "Bodyweight", reps: "15 reps", duration_seconds: None },
    DefaultExercise { name: "Mountain Climbers", muscle: "Abs", level: "Intermediate", equipment: "Bodyweight", reps: "45s", duration_seconds: Some(45) },
];

struct DefaultWorkout {
    name: &'static str,
    description: &'static str,
    duration: &'static str,
    exercises: &'static [&'static str],
}

const DEFAULT_WORKOUTS: &[DefaultWorkout] = &[
    DefaultWorkout {
        name: "Upper Body Strength",
        description: "Focuses on building mass and strength in the back, chest, and shoulders using classic compound and isolation movements.",
        duration: "60 mins",
        exercises: &["Chin Ups", "Barbell Bench Press", "Dumbbell Lateral Raise", "Cable Push Down"],
    },
    DefaultWorkout {
        name: "Lower Body & Core",
        description: "A comprehensive workout to build foundational leg strength and core stability.",
        duration: "50 mins",
        exercises: &["Barbell High Bar Squat", "Bodyweight Squat", "Hand Plank", "Kettlebell Russian Twist"],
    },
    DefaultWorkout {
        name: "Ganithenics 35-Min Full-Body Workout",
        description: "Mixed reps and time, bodyweight only. Three rounds of seven exercises with 30s rest between exercises and 60s between rounds.",
        duration: "35 mins",
        exercises: &[
            "Push-ups",
            "Air Squats",
            "Plank Shoulder Taps",
            "Superman Hold",
            "Reverse Lunges",
            "Leg Raises",
            "Mountain Climbers",
        ],
    },
];

const DEFAULT_USERS: &[&str] = &["Ertil", "Barbara"];

impl From<&DefaultExercise> for NewExercise {
    fn from(exercise: &DefaultExercise) -> Self {
        NewExercise {
            name: exercise.name.to_string(),
            muscles: [exercise.muscle].into_iter().collect(),
            level: Some(exercise.level.to_string()),
            equipment: Some(exercise.equipment.to_string()),
            reps: Some(exercise.reps.to_string()),
            exercise_type: if exercise.duration_seconds.is_some() {
                ExerciseType::Time
            } else {
                ExerciseType::Reps
            },
            duration_seconds: exercise.duration_seconds,
            ..NewExercise::default()
        }
    }
}

/// Loads the default catalog into an empty store. A store that already has workouts is left alone.
pub async fn seed_defaults(
    user_repo: &UserRepository,
    exercise_repo: &ExerciseRepository,
    workout_repo: &WorkoutRepository,
) -> anyhow::Result<()> {
    if workout_repo.count().await? > 0 {
        tracing::debug!("Workouts present, skipping default seed");
        return Ok(());
    }

    tracing::info!("Seeding default catalog...");

    let batch = DEFAULT_EXERCISES.iter().map(NewExercise::from).collect();
    let summary = exercise_repo.import(batch).await?;
    tracing::info!(
        "Default exercises: {} added, {} already present",
        summary.imported,
        summary.skipped
    );

    for workout in DEFAULT_WORKOUTS {
        let (id, missing) = workout_repo
            .create_catalog_workout(CatalogWorkout {
                name: workout.name.to_string(),
                description: workout.description.to_string(),
                duration: workout.duration.to_string(),
                exercise_names: workout.exercises.iter().map(|n| n.to_string()).collect(),
            })
            .await?;
        for name in missing {
            tracing::warn!(
                "Exercise \"{}\" for workout \"{}\" was not found and was not linked",
                name,
                workout.name
            );
        }
        tracing::debug!("Seeded workout {} ({})", id, workout.name);
    }

    if user_repo.count().await? == 0 {
        for name in DEFAULT_USERS {
            user_repo.create_profile(name).await?;
        }
        tracing::info!("Seeded {} default users", DEFAULT_USERS.len());
    }

    Ok(())
}

/// One entry of an exercise export file.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    #[serde(rename = "Exercise Name")]
    name: Option<String>,
    #[serde(rename = "Muscle Group")]
    muscle_group: Option<String>,
    #[serde(rename = "Level")]
    level: Option<String>,
    #[serde(rename = "Equipment")]
    equipment: Option<String>,
    #[serde(rename = "Video URL")]
    video_url: Option<String>,
    #[serde(rename = "GIF")]
    gif: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Imports a JSON array of exercise records in one transaction.
///
/// Records without a name and names already in the catalog are counted as skipped.
pub async fn import_exercises<R: Read>(
    exercise_repo: &ExerciseRepository,
    reader: R,
) -> anyhow::Result<ImportSummary> {
    let records: Vec<ImportRecord> =
        serde_json::from_reader(reader).context("exercise import is not a JSON array of records")?;

    let mut nameless = 0;
    let mut batch = Vec::with_capacity(records.len());
    for record in records {
        let Some(name) = present(record.name) else {
            tracing::warn!(
                "Skipping exercise with no name (muscle group {:?})",
                record.muscle_group
            );
            nameless += 1;
            continue;
        };

        batch.push(NewExercise {
            name,
            muscles: record.muscle_group.as_deref().into_iter().collect(),
            level: present(record.level),
            equipment: present(record.equipment),
            video_urls: present(record.video_url).into_iter().collect(),
            image_url: present(record.gif),
            ..NewExercise::default()
        });
    }

    let mut summary = exercise_repo.import(batch).await?;
    summary.skipped += nameless;
    tracing::info!(
        "Imported {} exercises ({} skipped)",
        summary.imported,
        summary.skipped
    );
    Ok(summary)
}

pub async fn import_exercises_from_path(
    exercise_repo: &ExerciseRepository,
    path: &Path,
) -> anyhow::Result<ImportSummary> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    import_exercises(exercise_repo, BufReader::new(file)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, DbPool};
    use crate::migrations::run_migrations_for_tests;
    use crate::models::exercise::NO_EQUIPMENT;
    use crate::repositories::exercise_repo::ExerciseQuery;

    fn setup_test_db() -> DbPool {
        let pool = create_memory_pool().expect("Failed to create test database");
        run_migrations_for_tests(&pool).expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_seed_defaults_links_all_names_and_runs_once() {
        let pool = setup_test_db();
        let users = UserRepository::new(pool.clone());
        let exercises = ExerciseRepository::new(pool.clone());
        let workouts = WorkoutRepository::new(pool.clone());

        seed_defaults(&users, &exercises, &workouts).await.unwrap();
        seed_defaults(&users, &exercises, &workouts).await.unwrap();

        let summaries = workouts.list_summaries(None).await.unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(users.count().await.unwrap(), 2);

        let full_body = workouts
            .find_with_exercises(summaries[2].id)
            .await
            .unwrap()
            .unwrap();
        let names: Vec<_> = full_body.exercises.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, DEFAULT_WORKOUTS[2].exercises.to_vec());

        let superman = &full_body.exercises[3];
        assert_eq!(superman.exercise_type, ExerciseType::Time);
        assert_eq!(superman.duration_seconds, Some(30));
    }

    #[tokio::test]
    async fn test_import_skips_nameless_and_existing() {
        let pool = setup_test_db();
        let exercises = ExerciseRepository::new(pool.clone());

        let json = r#"[
            {"Exercise Name": "Push Up", "Muscle Group": "Chest", "Level": "Beginner",
             "Equipment": "Bodyweight", "Video URL": "https://example.com/push.mp4", "GIF": ""},
            {"Exercise Name": "", "Muscle Group": "Legs"},
            {"Muscle Group": "Back"},
            {"Exercise Name": "push up", "Level": "Advanced"},
            {"Exercise Name": "Lat Pulldown", "Muscle Group": "Lats", "Equipment": "Cable"}
        ]"#;

        let summary = import_exercises(&exercises, json.as_bytes()).await.unwrap();
        assert_eq!(summary, ImportSummary { imported: 2, skipped: 3 });

        let push_up = exercises.find_by_name("Push Up").await.unwrap().unwrap();
        assert_eq!(push_up.level.as_deref(), Some("Beginner"));
        assert_eq!(push_up.equipment.as_deref(), Some(NO_EQUIPMENT));
        assert_eq!(push_up.video_urls, vec!["https://example.com/push.mp4".to_string()]);
        assert!(push_up.image_url.is_none());

        let page = exercises
            .query(ExerciseQuery {
                muscle: Some("lats".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_import_rejects_non_array() {
        let pool = setup_test_db();
        let exercises = ExerciseRepository::new(pool);

        assert!(import_exercises(&exercises, "{}".as_bytes()).await.is_err());
    }
}
