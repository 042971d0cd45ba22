use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::{Exercise, FromSqliteRow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub is_public: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for Workout {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            duration: row.get("duration")?,
            is_public: row.get("is_public")?,
            created_by: row.get("created_by")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// List entry without exercises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub duration: Option<String>,
}

impl FromSqliteRow for WorkoutSummary {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            duration: row.get("duration")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutWithExercises {
    #[serde(flatten)]
    pub workout: Workout,
    pub exercises: Vec<Exercise>,
}
