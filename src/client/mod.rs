//! Typed HTTP client for the JSON API, plus the application state a front end drives.

pub mod state;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::generator::GenerateWorkoutRequest;
use crate::models::{
    GeneratedWorkout, HistoryEntry, HistoryItem, User, UserSummary, WorkoutSummary,
    WorkoutWithExercises,
};
use crate::repositories::exercise_repo::{ExercisePage, ExerciseQuery};
use crate::runner::{HistoryRecorder, PlanError};

pub use state::{AppState, SelectedWorkout, View};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error status and its `{ error }` message.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("not logged in")]
    NotLoggedIn,

    #[error("no workout selected")]
    NoWorkoutSelected,

    #[error("save this workout before starting it")]
    NotSaved,

    #[error("workout cannot be run: {0}")]
    Plan(#[from] PlanError),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct WorkoutsEnvelope {
    workouts: Vec<WorkoutSummary>,
}

#[derive(Deserialize)]
struct WorkoutEnvelope {
    workout: WorkoutWithExercises,
}

#[derive(Deserialize)]
struct GeneratedEnvelope {
    workout: GeneratedWorkout,
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    history: Vec<HistoryItem>,
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn users(&self) -> Result<Vec<UserSummary>, ClientError> {
        decode(self.client.get(self.url("/api/users")).send().await?).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ClientError> {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn exercises(&self, query: &ExerciseQuery) -> Result<ExercisePage, ClientError> {
        let response = self
            .client
            .get(self.url("/api/exercises"))
            .query(query)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn workouts(&self, user_id: Option<i64>) -> Result<Vec<WorkoutSummary>, ClientError> {
        let mut request = self.client.get(self.url("/api/workouts"));
        if let Some(user_id) = user_id {
            request = request.query(&[("userId", user_id)]);
        }
        let envelope: WorkoutsEnvelope = decode(request.send().await?).await?;
        Ok(envelope.workouts)
    }

    pub async fn workout(&self, id: i64) -> Result<WorkoutWithExercises, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/workouts/{id}")))
            .send()
            .await?;
        let envelope: WorkoutEnvelope = decode(response).await?;
        Ok(envelope.workout)
    }

    pub async fn save_workout(
        &self,
        workout: &GeneratedWorkout,
        user_id: i64,
    ) -> Result<WorkoutWithExercises, ClientError> {
        let response = self
            .client
            .post(self.url("/api/workouts"))
            .json(&json!({ "workout": workout, "userId": user_id }))
            .send()
            .await?;
        let envelope: WorkoutEnvelope = decode(response).await?;
        Ok(envelope.workout)
    }

    pub async fn delete_workout(&self, id: i64) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/workouts/{id}")))
            .send()
            .await?;
        let _: serde_json::Value = decode(response).await?;
        Ok(())
    }

    pub async fn generate_workout(
        &self,
        request: &GenerateWorkoutRequest,
    ) -> Result<GeneratedWorkout, ClientError> {
        let response = self
            .client
            .post(self.url("/api/generate-workout"))
            .json(request)
            .send()
            .await?;
        let envelope: GeneratedEnvelope = decode(response).await?;
        Ok(envelope.workout)
    }

    pub async fn record_history(&self, workout_id: i64, user_id: i64) -> Result<HistoryEntry, ClientError> {
        let response = self
            .client
            .post(self.url("/api/history"))
            .json(&json!({ "workoutId": workout_id, "userId": user_id }))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn user_history(&self, user_id: i64) -> Result<Vec<HistoryItem>, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/users/{user_id}/history")))
            .send()
            .await?;
        let envelope: HistoryEnvelope = decode(response).await?;
        Ok(envelope.history)
    }
}

#[async_trait]
impl HistoryRecorder for ApiClient {
    async fn record_completion(&self, workout_id: i64, user_id: i64) -> anyhow::Result<HistoryEntry> {
        Ok(self.record_history(workout_id, user_id).await?)
    }
}
