//! Runs a workout session: steps through exercises, drives countdowns for timed ones and
//! records the completion exactly once.

pub mod countdown;
pub mod machine;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::HistoryEntry;

pub use countdown::Countdown;
pub use machine::{
    CompletionOutcome, PlanError, Session, SessionEffect, SessionEvent, SessionPlan, SessionState,
    SessionStep, StepKind,
};

/// Where a finished session is written.
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    async fn record_completion(&self, workout_id: i64, user_id: i64) -> anyhow::Result<HistoryEntry>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Length of one countdown second.
    pub tick: Duration,
    /// Pause after a countdown hits zero before the session moves on.
    pub grace: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            grace: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum HistoryStatus {
    Idle,
    Pending,
    Recorded(HistoryEntry),
    /// The write failed. The session still counts as completed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub remaining: Option<u32>,
    pub outcome: Option<CompletionOutcome>,
    pub history: HistoryStatus,
}

impl SessionStatus {
    /// Completed and no longer waiting on the history write.
    pub fn is_settled(&self) -> bool {
        self.state == SessionState::Completed
            && matches!(
                self.history,
                HistoryStatus::Recorded(_) | HistoryStatus::Failed(_)
            )
    }
}

struct Driver {
    session: Session,
    recorder: Arc<dyn HistoryRecorder>,
    timing: SessionTiming,
    events: mpsc::UnboundedSender<SessionEvent>,
    countdown: Option<Countdown>,
    history: HistoryStatus,
    status: watch::Sender<SessionStatus>,
}

impl Driver {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<SessionEvent>) {
        self.dispatch(SessionEvent::Start).await;

        while self.session.state() != SessionState::Completed {
            let Some(event) = inbox.recv().await else {
                break;
            };
            self.dispatch(event).await;
        }

        tracing::debug!(
            "Session for workout {} finished ({:?})",
            self.session.plan().workout_id,
            self.session.outcome()
        );
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        for effect in self.session.handle(event) {
            match effect {
                SessionEffect::StartCountdown { index, seconds } => {
                    self.countdown = Some(Countdown::spawn(
                        index,
                        seconds,
                        self.timing,
                        self.events.clone(),
                    ));
                }
                SessionEffect::CancelCountdown => {
                    self.countdown = None;
                }
                SessionEffect::RecordHistory {
                    workout_id,
                    user_id,
                } => {
                    self.history = HistoryStatus::Pending;
                    self.publish();
                    self.history = match self.recorder.record_completion(workout_id, user_id).await
                    {
                        Ok(entry) => {
                            tracing::info!(
                                "Recorded completion of workout {} for user {}",
                                workout_id,
                                user_id
                            );
                            HistoryStatus::Recorded(entry)
                        }
                        Err(e) => {
                            tracing::warn!("Failed to record workout history: {:#}", e);
                            HistoryStatus::Failed(e.to_string())
                        }
                    };
                }
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(SessionStatus {
            state: self.session.state(),
            remaining: self.session.remaining(),
            outcome: self.session.outcome(),
            history: self.history.clone(),
        });
    }
}

/// A live session. Dropping it stops the session and any pending countdown.
pub struct SessionRunner {
    plan: SessionPlan,
    events: mpsc::UnboundedSender<SessionEvent>,
    status: watch::Receiver<SessionStatus>,
    driver: JoinHandle<()>,
}

impl SessionRunner {
    /// Starts the session on the current tokio runtime, showing the first exercise.
    pub fn start(
        plan: SessionPlan,
        recorder: Arc<dyn HistoryRecorder>,
        timing: SessionTiming,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SessionStatus {
            state: SessionState::NotStarted,
            remaining: None,
            outcome: None,
            history: HistoryStatus::Idle,
        });

        let driver = Driver {
            session: Session::new(plan.clone()),
            recorder,
            timing,
            events: events_tx.clone(),
            countdown: None,
            history: HistoryStatus::Idle,
            status: status_tx,
        };
        let driver = tokio::spawn(driver.run(events_rx));

        Self {
            plan,
            events: events_tx,
            status: status_rx,
            driver,
        }
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    /// Clears the current exercise. Ignored once the session has completed.
    pub fn advance(&self) {
        let _ = self.events.send(SessionEvent::Advance);
    }

    /// Ends the session early; it is recorded like a full completion.
    pub fn end(&self) {
        let _ = self.events.send(SessionEvent::End);
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Waits until the session has completed and its history write has settled.
    pub async fn wait_for_completion(&self) -> SessionStatus {
        let mut status = self.status.clone();
        let settled = match status.wait_for(SessionStatus::is_settled).await {
            Ok(settled) => settled.clone(),
            Err(_) => self.status(),
        };
        settled
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use tokio::time::{sleep, Instant};

    #[derive(Default)]
    struct RecordingHistory {
        calls: Mutex<Vec<(i64, i64)>>,
        fail: bool,
    }

    impl RecordingHistory {
        fn calls(&self) -> Vec<(i64, i64)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HistoryRecorder for RecordingHistory {
        async fn record_completion(
            &self,
            workout_id: i64,
            user_id: i64,
        ) -> anyhow::Result<HistoryEntry> {
            self.calls.lock().unwrap().push((workout_id, user_id));
            if self.fail {
                anyhow::bail!("history service unavailable");
            }
            Ok(HistoryEntry {
                id: 1,
                workout_id,
                user_id,
                completed_at: Utc::now(),
            })
        }
    }

    fn step(name: &str, kind: StepKind) -> SessionStep {
        SessionStep {
            exercise_id: 0,
            name: name.to_string(),
            reps: None,
            kind,
        }
    }

    fn reps_timed_reps() -> SessionPlan {
        SessionPlan::new(
            10,
            2,
            vec![
                step("Push Up", StepKind::Reps),
                step("Plank", StepKind::Timed { seconds: 3 }),
                step("Squat", StepKind::Reps),
            ],
        )
        .unwrap()
    }

    async fn wait_for_state(runner: &SessionRunner, state: SessionState) -> SessionStatus {
        let mut rx = runner.subscribe();
        let status = rx.wait_for(|s| s.state == state).await.unwrap().clone();
        status
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_step_advances_on_its_own_and_records_once() {
        let recorder = Arc::new(RecordingHistory::default());
        let runner = SessionRunner::start(reps_timed_reps(), recorder.clone(), SessionTiming::default());

        wait_for_state(&runner, SessionState::ShowingExercise(0)).await;
        runner.advance();
        let status = wait_for_state(&runner, SessionState::ShowingExercise(1)).await;
        assert_eq!(status.remaining, Some(3));

        let entered = Instant::now();
        wait_for_state(&runner, SessionState::ShowingExercise(2)).await;
        let elapsed = entered.elapsed();
        assert!(elapsed >= Duration::from_secs(4), "advanced after {elapsed:?}");
        assert!(recorder.calls().is_empty());

        runner.advance();
        let status = runner.wait_for_completion().await;
        assert_eq!(status.outcome, Some(CompletionOutcome::Finished));
        assert!(matches!(status.history, HistoryStatus::Recorded(_)));

        runner.advance();
        runner.end();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(recorder.calls(), vec![(10, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_down_each_second() {
        let recorder = Arc::new(RecordingHistory::default());
        let plan = SessionPlan::new(
            10,
            2,
            vec![
                step("Plank", StepKind::Timed { seconds: 3 }),
                step("Squat", StepKind::Reps),
            ],
        )
        .unwrap();
        let runner = SessionRunner::start(plan, recorder, SessionTiming::default());

        let status = wait_for_state(&runner, SessionState::ShowingExercise(0)).await;
        assert_eq!(status.remaining, Some(3));

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(runner.status().remaining, Some(2));

        sleep(Duration::from_secs(2)).await;
        assert_eq!(runner.status().remaining, Some(0));
        assert_eq!(runner.status().state, SessionState::ShowingExercise(0));

        wait_for_state(&runner, SessionState::ShowingExercise(1)).await;
        assert_eq!(runner.status().remaining, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_midway_records_once() {
        let recorder = Arc::new(RecordingHistory::default());
        let runner = SessionRunner::start(reps_timed_reps(), recorder.clone(), SessionTiming::default());

        wait_for_state(&runner, SessionState::ShowingExercise(0)).await;
        runner.advance();
        wait_for_state(&runner, SessionState::ShowingExercise(1)).await;

        runner.end();
        let status = runner.wait_for_completion().await;
        assert_eq!(status.outcome, Some(CompletionOutcome::Ended));

        // The cancelled countdown must not move the session again.
        sleep(Duration::from_secs(10)).await;
        assert_eq!(runner.status().state, SessionState::Completed);
        assert_eq!(recorder.calls(), vec![(10, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_history_write_still_completes() {
        let recorder = Arc::new(RecordingHistory {
            fail: true,
            ..Default::default()
        });
        let plan = SessionPlan::new(10, 2, vec![step("Push Up", StepKind::Reps)]).unwrap();
        let runner = SessionRunner::start(plan, recorder, SessionTiming::default());

        runner.advance();
        let status = runner.wait_for_completion().await;
        assert_eq!(status.state, SessionState::Completed);
        assert_eq!(
            status.history,
            HistoryStatus::Failed("history service unavailable".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_runner_cancels_countdown() {
        let recorder = Arc::new(RecordingHistory::default());
        let plan = SessionPlan::new(10, 2, vec![step("Plank", StepKind::Timed { seconds: 2 })]).unwrap();
        let runner = SessionRunner::start(plan, recorder.clone(), SessionTiming::default());

        wait_for_state(&runner, SessionState::ShowingExercise(0)).await;
        drop(runner);

        sleep(Duration::from_secs(10)).await;
        assert!(recorder.calls().is_empty());
    }
}
