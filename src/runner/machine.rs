use serde::Serialize;
use thiserror::Error;

use crate::models::{ExerciseType, WorkoutWithExercises};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Waits for the user to advance.
    Reps,
    /// Counts down and advances on its own.
    Timed { seconds: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStep {
    pub exercise_id: i64,
    pub name: String,
    pub reps: Option<String>,
    pub kind: StepKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("workout has no exercises")]
    Empty,

    #[error("timed exercise '{0}' has no positive duration")]
    MissingDuration(String),
}

/// The ordered steps of one run-through, and who the completion is recorded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub workout_id: i64,
    pub user_id: i64,
    steps: Vec<SessionStep>,
}

impl SessionPlan {
    pub fn new(workout_id: i64, user_id: i64, steps: Vec<SessionStep>) -> Result<Self, PlanError> {
        if steps.is_empty() {
            return Err(PlanError::Empty);
        }
        if let Some(step) = steps
            .iter()
            .find(|s| matches!(s.kind, StepKind::Timed { seconds: 0 }))
        {
            return Err(PlanError::MissingDuration(step.name.clone()));
        }
        Ok(Self {
            workout_id,
            user_id,
            steps,
        })
    }

    pub fn from_workout(workout: &WorkoutWithExercises, user_id: i64) -> Result<Self, PlanError> {
        let steps = workout
            .exercises
            .iter()
            .map(|exercise| {
                let kind = match exercise.exercise_type {
                    ExerciseType::Reps => StepKind::Reps,
                    ExerciseType::Time => {
                        let seconds = exercise
                            .duration_seconds
                            .and_then(|d| u32::try_from(d).ok())
                            .filter(|d| *d > 0)
                            .ok_or_else(|| PlanError::MissingDuration(exercise.name.clone()))?;
                        StepKind::Timed { seconds }
                    }
                };
                Ok(SessionStep {
                    exercise_id: exercise.id,
                    name: exercise.name.clone(),
                    reps: exercise.reps.clone(),
                    kind,
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        Self::new(workout.workout.id, user_id, steps)
    }

    pub fn steps(&self) -> &[SessionStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    ShowingExercise(usize),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// Every exercise was cleared.
    Finished,
    /// The user ended the session early.
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Advance,
    End,
    /// One second of the countdown for step `index` has passed.
    Tick { index: usize },
    /// The countdown for step `index` reached zero and its grace delay passed.
    CountdownElapsed { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    StartCountdown { index: usize, seconds: u32 },
    CancelCountdown,
    RecordHistory { workout_id: i64, user_id: i64 },
}

/// The session state machine. Holds no timers and performs no I/O: every transition
/// returns the effects the caller must carry out.
#[derive(Debug, Clone)]
pub struct Session {
    plan: SessionPlan,
    state: SessionState,
    remaining: Option<u32>,
    outcome: Option<CompletionOutcome>,
    history_requested: bool,
}

impl Session {
    pub fn new(plan: SessionPlan) -> Self {
        Self {
            plan,
            state: SessionState::NotStarted,
            remaining: None,
            outcome: None,
            history_requested: false,
        }
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Seconds left on the current timed step.
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn outcome(&self) -> Option<CompletionOutcome> {
        self.outcome
    }

    pub fn current_step(&self) -> Option<&SessionStep> {
        match self.state {
            SessionState::ShowingExercise(index) => self.plan.steps.get(index),
            _ => None,
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        match (self.state, event) {
            (SessionState::NotStarted, SessionEvent::Start) => self.enter(0),
            (SessionState::ShowingExercise(index), SessionEvent::Advance) => self.leave(index),
            (SessionState::ShowingExercise(index), SessionEvent::CountdownElapsed { index: at })
                if at == index =>
            {
                self.leave(index)
            }
            (SessionState::ShowingExercise(index), SessionEvent::Tick { index: at }) if at == index => {
                self.remaining = self.remaining.map(|r| r.saturating_sub(1));
                Vec::new()
            }
            (SessionState::ShowingExercise(index), SessionEvent::End) => {
                let mut effects = self.cancel_countdown(index);
                effects.extend(self.complete(CompletionOutcome::Ended));
                effects
            }
            // Stale timer events, or anything after completion.
            _ => Vec::new(),
        }
    }

    fn enter(&mut self, index: usize) -> Vec<SessionEffect> {
        self.state = SessionState::ShowingExercise(index);
        match self.plan.steps[index].kind {
            StepKind::Timed { seconds } => {
                self.remaining = Some(seconds);
                vec![SessionEffect::StartCountdown { index, seconds }]
            }
            StepKind::Reps => {
                self.remaining = None;
                Vec::new()
            }
        }
    }

    fn leave(&mut self, index: usize) -> Vec<SessionEffect> {
        let mut effects = self.cancel_countdown(index);
        if index + 1 < self.plan.len() {
            effects.extend(self.enter(index + 1));
        } else {
            effects.extend(self.complete(CompletionOutcome::Finished));
        }
        effects
    }

    fn cancel_countdown(&self, index: usize) -> Vec<SessionEffect> {
        match self.plan.steps[index].kind {
            StepKind::Timed { .. } => vec![SessionEffect::CancelCountdown],
            StepKind::Reps => Vec::new(),
        }
    }

    fn complete(&mut self, outcome: CompletionOutcome) -> Vec<SessionEffect> {
        self.state = SessionState::Completed;
        self.remaining = None;
        self.outcome = Some(outcome);

        if self.history_requested {
            return Vec::new();
        }
        self.history_requested = true;
        vec![SessionEffect::RecordHistory {
            workout_id: self.plan.workout_id,
            user_id: self.plan.user_id,
        }]
    }
}
