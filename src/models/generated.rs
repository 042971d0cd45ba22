use serde::{Deserialize, Serialize};

use super::exercise::{parse_duration_seconds, ExerciseType};

/// An unsaved workout proposal. Exercises are plain values without store ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedWorkout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub exercises: Vec<GeneratedExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedExercise {
    pub name: String,
    pub reps: Option<String>,
    pub target_muscle: Option<String>,
    pub equipment: Option<String>,
    pub level: Option<String>,
    #[serde(rename = "type", default)]
    pub exercise_type: ExerciseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    pub instructions: Option<String>,
}

impl GeneratedExercise {
    /// Explicit positive duration, else one read from the rep/time descriptor.
    pub fn resolved_duration(&self) -> Option<i64> {
        self.duration_seconds
            .filter(|d| *d > 0)
            .or_else(|| self.reps.as_deref().and_then(parse_duration_seconds))
    }
}

impl GeneratedWorkout {
    /// Checks the structural rules a workout must meet before it can be saved.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("workout name is required".to_string());
        }
        if self.exercises.is_empty() {
            return Err("workout must contain at least one exercise".to_string());
        }
        for (position, exercise) in self.exercises.iter().enumerate() {
            if exercise.name.trim().is_empty() {
                return Err(format!("exercise #{} has no name", position + 1));
            }
            if exercise.exercise_type == ExerciseType::Time && exercise.resolved_duration().is_none()
            {
                return Err(format!(
                    "time-based exercise '{}' needs a positive duration",
                    exercise.name.trim()
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveWorkoutRequest {
    pub workout: Option<GeneratedWorkout>,
    pub user_id: Option<i64>,
}
