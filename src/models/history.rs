use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

/// One completed (or ended) session. Rows are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub workout_id: i64,
    pub user_id: i64,
    pub completed_at: DateTime<Utc>,
}

impl FromSqliteRow for HistoryEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            workout_id: row.get("workout_id")?,
            user_id: row.get("user_id")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// A history entry joined with the workout it records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: i64,
    pub workout_id: i64,
    pub completed_at: DateTime<Utc>,
    pub name: String,
    pub description: Option<String>,
    pub duration: Option<String>,
}

impl FromSqliteRow for HistoryItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            workout_id: row.get("workout_id")?,
            completed_at: row.get("completed_at")?,
            name: row.get("name")?,
            description: row.get("description")?,
            duration: row.get("duration")?,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHistoryEntry {
    pub workout_id: Option<i64>,
    pub user_id: Option<i64>,
}
