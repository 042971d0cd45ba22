use async_trait::async_trait;
use chrono::Utc;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{FromSqliteRow, HistoryEntry, HistoryItem};
use crate::runner::HistoryRecorder;

#[derive(Clone)]
pub struct HistoryRepository {
    pool: DbPool,
}

impl HistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Appends a completion stamped with the server's clock.
    pub async fn create(&self, workout_id: i64, user_id: i64) -> Result<HistoryEntry> {
        let pool = self.pool.clone();
        let completed_at = Utc::now();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO history (workout_id, user_id, completed_at) VALUES (?, ?, ?)",
                rusqlite::params![workout_id, user_id, completed_at],
            )
            .map_err(|e| {
                AppError::from_constraint(e, "Workout or user not found", "Duplicate history entry")
            })?;

            Ok(HistoryEntry {
                id: conn.last_insert_rowid(),
                workout_id,
                user_id,
                completed_at,
            })
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// A user's completions, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<HistoryItem>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT h.id, h.workout_id, h.completed_at, w.name, w.description, w.duration
                 FROM history h
                 JOIN workouts w ON h.workout_id = w.id
                 WHERE h.user_id = ?
                 ORDER BY h.completed_at DESC, h.id DESC",
            )?;
            let items = stmt
                .query_map([user_id], HistoryItem::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn count_for_user(&self, user_id: i64) -> Result<i64> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM history WHERE user_id = ?",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl HistoryRecorder for HistoryRepository {
    async fn record_completion(&self, workout_id: i64, user_id: i64) -> anyhow::Result<HistoryEntry> {
        Ok(self.create(workout_id, user_id).await?)
    }
}
