use std::sync::Arc;

use crate::generator::GenerateWorkoutRequest;
use crate::models::{GeneratedWorkout, HistoryItem, User, WorkoutSummary, WorkoutWithExercises};
use crate::runner::{HistoryStatus, SessionPlan, SessionRunner, SessionStatus, SessionTiming};

use super::{ApiClient, ClientError};

const HISTORY_SAVE_FAILED: &str = "Failed to save workout history.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    List,
    Detail,
    Generator,
    Session,
    Complete,
    History,
}

/// The workout on the detail screen: either stored, or a generated proposal not yet saved.
#[derive(Debug, Clone)]
pub enum SelectedWorkout {
    Stored(WorkoutWithExercises),
    Generated(GeneratedWorkout),
}

/// Everything a front end renders from, changed only through the action methods.
pub struct AppState {
    api: ApiClient,
    timing: SessionTiming,
    current_user: Option<User>,
    view: View,
    workouts: Vec<WorkoutSummary>,
    selected: Option<SelectedWorkout>,
    history: Vec<HistoryItem>,
    session: Option<SessionRunner>,
    error: Option<String>,
}

impl AppState {
    pub fn new(api: ApiClient) -> Self {
        Self::with_timing(api, SessionTiming::default())
    }

    pub fn with_timing(api: ApiClient, timing: SessionTiming) -> Self {
        Self {
            api,
            timing,
            current_user: None,
            view: View::Login,
            workouts: Vec::new(),
            selected: None,
            history: Vec::new(),
            session: None,
            error: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn workouts(&self) -> &[WorkoutSummary] {
        &self.workouts
    }

    pub fn selected(&self) -> Option<&SelectedWorkout> {
        self.selected.as_ref()
    }

    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session_status(&self) -> Option<SessionStatus> {
        self.session.as_ref().map(SessionRunner::status)
    }

    fn user_id(&self) -> Result<i64, ClientError> {
        self.current_user
            .as_ref()
            .map(|u| u.id)
            .ok_or(ClientError::NotLoggedIn)
    }

    fn fail<T>(&mut self, err: ClientError) -> Result<T, ClientError> {
        self.error = Some(err.to_string());
        Err(err)
    }

    /// Drops any live session, which cancels its pending countdown.
    fn leave_session(&mut self) {
        self.session = None;
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        match self.api.login(email, password).await {
            Ok(user) => {
                self.current_user = Some(user);
                self.error = None;
                self.view = View::List;
                self.load_workouts().await
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn logout(&mut self) {
        self.leave_session();
        self.current_user = None;
        self.selected = None;
        self.workouts.clear();
        self.history.clear();
        self.view = View::Login;
    }

    pub async fn load_workouts(&mut self) -> Result<(), ClientError> {
        let user_id = self.current_user.as_ref().map(|u| u.id);
        match self.api.workouts(user_id).await {
            Ok(workouts) => {
                self.workouts = workouts;
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    pub async fn view_workout_detail(&mut self, id: i64) -> Result<(), ClientError> {
        match self.api.workout(id).await {
            Ok(workout) => {
                self.selected = Some(SelectedWorkout::Stored(workout));
                self.view = View::Detail;
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn open_generator(&mut self) {
        self.error = None;
        self.view = View::Generator;
    }

    /// Requests a proposal and shows it; on failure the generator form stays up with the error.
    pub async fn generate_workout(
        &mut self,
        request: &GenerateWorkoutRequest,
    ) -> Result<(), ClientError> {
        self.error = None;
        match self.api.generate_workout(request).await {
            Ok(workout) => {
                self.selected = Some(SelectedWorkout::Generated(workout));
                self.view = View::Detail;
                Ok(())
            }
            Err(err) => {
                self.view = View::Generator;
                self.fail(err)
            }
        }
    }

    /// Persists the selected generated workout; the saved copy replaces it.
    pub async fn save_selected_workout(&mut self) -> Result<(), ClientError> {
        let user_id = self.user_id()?;
        let Some(SelectedWorkout::Generated(workout)) = &self.selected else {
            return Err(ClientError::NoWorkoutSelected);
        };

        match self.api.save_workout(workout, user_id).await {
            Ok(saved) => {
                self.selected = Some(SelectedWorkout::Stored(saved));
                self.load_workouts().await
            }
            Err(err) => self.fail(err),
        }
    }

    /// Starts a session for the selected stored workout on the current tokio runtime.
    pub async fn start_workout(&mut self) -> Result<(), ClientError> {
        let user_id = self.user_id()?;
        let workout = match &self.selected {
            Some(SelectedWorkout::Stored(workout)) => workout,
            Some(SelectedWorkout::Generated(_)) => return Err(ClientError::NotSaved),
            None => return Err(ClientError::NoWorkoutSelected),
        };

        let plan = SessionPlan::from_workout(workout, user_id)?;
        self.leave_session();
        self.session = Some(SessionRunner::start(
            plan,
            Arc::new(self.api.clone()),
            self.timing,
        ));
        self.error = None;
        self.view = View::Session;
        Ok(())
    }

    pub fn next_exercise(&self) {
        if let Some(session) = &self.session {
            session.advance();
        }
    }

    pub fn end_workout(&self) {
        if let Some(session) = &self.session {
            session.end();
        }
    }

    /// Moves to the completion screen once the running session has settled.
    pub fn refresh_session(&mut self) {
        let Some(status) = self.session_status() else {
            return;
        };
        if status.is_settled() {
            self.complete_session(&status);
        }
    }

    /// Waits for the running session to complete, then shows the completion screen.
    pub async fn wait_for_session(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let status = session.wait_for_completion().await;
        self.complete_session(&status);
    }

    fn complete_session(&mut self, status: &SessionStatus) {
        if let HistoryStatus::Failed(reason) = &status.history {
            tracing::warn!("Workout history not saved: {}", reason);
            self.error = Some(HISTORY_SAVE_FAILED.to_string());
        }
        self.view = View::Complete;
    }

    pub fn back_to_list(&mut self) {
        self.leave_session();
        self.selected = None;
        self.error = None;
        self.view = View::List;
    }

    pub async fn fetch_history(&mut self) -> Result<(), ClientError> {
        let user_id = self.user_id()?;
        match self.api.user_history(user_id).await {
            Ok(history) => {
                self.history = history;
                self.view = View::History;
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }
}
