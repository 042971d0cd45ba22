//! Workout generation backed by an external text-generation model.
//!
//! The model is asked for a single JSON object; its reply is fence-stripped, parsed into a
//! loose shape, and then normalized into a [`GeneratedWorkout`] the reconciler can save.

pub mod gemini;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::exercise::parse_duration_seconds;
use crate::models::{ExerciseType, GeneratedExercise, GeneratedWorkout};

pub use gemini::GeminiClient;

pub const GENERIC_UPSTREAM_FAILURE: &str = "The AI model could not generate a workout.";

#[derive(Debug, Error)]
pub enum GenerationError {
    /// The model endpoint was unreachable or rejected the request.
    #[error("{0}")]
    Upstream(String),

    #[error("The AI model returned invalid JSON: {0}")]
    Parse(String),

    #[error("The AI model returned an unusable workout: {0}")]
    Schema(String),
}

/// A single-prompt text completion endpoint.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateWorkoutRequest {
    pub level: Option<String>,
    #[serde(default)]
    pub equipment: BTreeMap<String, bool>,
    #[serde(default)]
    pub muscles: BTreeMap<String, bool>,
    pub duration: Option<String>,
    pub goal: Option<String>,
}

impl GenerateWorkoutRequest {
    /// Names of the tags switched on, joined for the prompt.
    fn selected(tags: &BTreeMap<String, bool>) -> Vec<&str> {
        tags.iter()
            .filter(|(_, on)| **on)
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    pub fn available_equipment(&self) -> String {
        let selected = Self::selected(&self.equipment);
        if selected.is_empty() {
            "none".to_string()
        } else {
            selected.join(", ")
        }
    }

    pub fn target_muscles(&self) -> String {
        Self::selected(&self.muscles).join(", ")
    }
}

pub fn build_prompt(request: &GenerateWorkoutRequest) -> String {
    let field = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();

    format!(
        r#"Generate a workout routine based on these criteria:
- Goal: {goal}
- Fitness Level: {level}
- Duration: {duration}
- Available Equipment: {equipment}
- Target Muscles: {muscles}

IMPORTANT: Respond with ONLY a valid JSON object in the following format. Do not include any other text, greetings, or explanations.

{{
  "name": "Your Custom Workout",
  "description": "A brief, one-sentence description of the workout generated.",
  "exercises": [
    {{
      "name": "Exercise Name",
      "reps": "Reps or Time (e.g., '10-12 reps' or '45 seconds')",
      "target_muscle": "A single primary muscle group",
      "equipment": "Equipment Name",
      "level": "Difficulty Level",
      "type": "reps or time",
      "instructions": "A step-by-step guide on how to perform the exercise, formatted as a single string with newlines."
    }}
  ]
}}"#,
        goal = field(&request.goal),
        level = field(&request.level),
        duration = field(&request.duration),
        equipment = request.available_equipment(),
        muscles = request.target_muscles(),
    )
}

pub fn strip_code_fences(s: &str) -> &str {
    let mut trimmed = s.trim();
    if let Some(stripped) = trimmed.strip_prefix("```json") {
        trimmed = stripped;
    } else if let Some(stripped) = trimmed.strip_prefix("```") {
        trimmed = stripped;
    }
    if let Some(stripped) = trimmed.strip_suffix("```") {
        trimmed = stripped;
    }
    trimmed.trim()
}

/// The model's reply before normalization. Every field is optional so that a missing
/// field surfaces as a schema error naming it rather than an opaque parse error.
#[derive(Debug, Deserialize)]
struct RawWorkout {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    exercises: Vec<RawExercise>,
}

#[derive(Debug, Deserialize)]
struct RawExercise {
    name: Option<String>,
    reps: Option<serde_json::Value>,
    target_muscle: Option<String>,
    equipment: Option<String>,
    level: Option<String>,
    #[serde(rename = "type")]
    exercise_type: Option<String>,
    duration_seconds: Option<i64>,
    instructions: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn descriptor(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => clean(Some(s)),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

impl RawExercise {
    fn normalize(self, position: usize) -> Result<GeneratedExercise, GenerationError> {
        let name = clean(self.name).ok_or_else(|| {
            GenerationError::Schema(format!("exercise #{} has no name", position + 1))
        })?;
        let reps = descriptor(self.reps);
        let parsed_duration = self
            .duration_seconds
            .filter(|d| *d > 0)
            .or_else(|| reps.as_deref().and_then(parse_duration_seconds));

        let requested = self.exercise_type.as_deref().and_then(ExerciseType::parse);
        let exercise_type = match (requested, parsed_duration) {
            (Some(ExerciseType::Time), Some(_)) => ExerciseType::Time,
            (Some(ExerciseType::Time), None) => {
                tracing::warn!(
                    "Timed exercise '{}' has no usable duration ({:?}); treating it as reps",
                    name,
                    reps
                );
                ExerciseType::Reps
            }
            (Some(ExerciseType::Reps), _) => ExerciseType::Reps,
            (None, Some(_)) => ExerciseType::Time,
            (None, None) => ExerciseType::Reps,
        };
        let duration_seconds = match exercise_type {
            ExerciseType::Time => parsed_duration,
            ExerciseType::Reps => None,
        };

        Ok(GeneratedExercise {
            name,
            reps,
            target_muscle: clean(self.target_muscle),
            equipment: clean(self.equipment),
            level: clean(self.level),
            exercise_type,
            duration_seconds,
            instructions: clean(self.instructions),
        })
    }
}

/// Parses a model reply, with or without code fences, into a normalized workout.
///
/// The result carries no id or duration; [`WorkoutGenerator::generate`] attaches those.
pub fn parse_workout(reply: &str) -> Result<GeneratedWorkout, GenerationError> {
    let json = strip_code_fences(reply);
    let raw: RawWorkout =
        serde_json::from_str(json).map_err(|e| GenerationError::Parse(e.to_string()))?;

    let name = clean(raw.name)
        .ok_or_else(|| GenerationError::Schema("workout has no name".to_string()))?;
    if raw.exercises.is_empty() {
        return Err(GenerationError::Schema(
            "workout has no exercises".to_string(),
        ));
    }
    let exercises = raw
        .exercises
        .into_iter()
        .enumerate()
        .map(|(position, exercise)| exercise.normalize(position))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GeneratedWorkout {
        id: None,
        name,
        description: clean(raw.description),
        duration: None,
        exercises,
    })
}

#[derive(Clone)]
pub struct WorkoutGenerator {
    backend: Arc<dyn TextGenerator>,
}

impl WorkoutGenerator {
    pub fn new(backend: Arc<dyn TextGenerator>) -> Self {
        Self { backend }
    }

    pub async fn generate(
        &self,
        request: &GenerateWorkoutRequest,
    ) -> Result<GeneratedWorkout, GenerationError> {
        let prompt = build_prompt(request);
        tracing::info!("Requesting workout from text generator");
        let reply = self.backend.complete(&prompt).await?;

        let mut workout = parse_workout(&reply)?;
        workout.id = Some(format!("gen-{}", uuid::Uuid::new_v4()));
        workout.duration = request.duration.as_deref().map(str::trim).map(String::from);

        tracing::info!(
            "Generated workout '{}' with {} exercises",
            workout.name,
            workout.exercises.len()
        );
        Ok(workout)
    }
}
