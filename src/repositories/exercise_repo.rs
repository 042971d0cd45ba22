use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::exercise::{normalize_equipment, normalize_muscle_tag};
use crate::models::{Exercise, ExerciseType, FromSqliteRow, MuscleTags};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

/// Filters for the catalog listing. All supplied filters must match (AND).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExerciseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ExerciseQuery {
    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExercisePage {
    pub exercises: Vec<Exercise>,
    /// Matches under the same filters, ignoring pagination.
    pub total: i64,
}

/// Column values for a catalog insert.
#[derive(Debug, Clone, Default)]
pub struct NewExercise {
    pub name: String,
    pub instructions: Option<String>,
    pub muscles: MuscleTags,
    pub level: Option<String>,
    pub equipment: Option<String>,
    pub video_urls: Vec<String>,
    pub image_url: Option<String>,
    pub reps: Option<String>,
    pub exercise_type: ExerciseType,
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

struct FilterSql {
    clause: String,
    params: Vec<Value>,
}

fn build_filter(query: &ExerciseQuery) -> FilterSql {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    // LIKE folds ASCII case only.
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("name LIKE ? ESCAPE '\\'");
        params.push(Value::Text(format!("%{}%", escape_like(search))));
    }
    if let Some(level) = query.level.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("level = ? COLLATE NOCASE");
        params.push(Value::Text(level.to_string()));
    }
    if let Some(equipment) = query.equipment.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push("equipment = ? COLLATE NOCASE");
        params.push(Value::Text(normalize_equipment(equipment)));
    }
    if let Some(tag) = query.muscle.as_deref().and_then(normalize_muscle_tag) {
        // Scalar rows compare by normalized equality, set-valued rows by membership.
        conditions.push(
            "(lower(replace(trim(muscle_group), ' ', '_')) = ? \
             OR EXISTS (SELECT 1 FROM json_each(exercises.target_muscles) WHERE json_each.value = ?))",
        );
        params.push(Value::Text(tag.clone()));
        params.push(Value::Text(tag));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    FilterSql { clause, params }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn find_id_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM exercises WHERE name = ? COLLATE NOCASE ORDER BY id LIMIT 1",
        [name.trim()],
        |row| row.get(0),
    )
    .optional()
}

pub(crate) fn insert_exercise(conn: &Connection, new: &NewExercise) -> rusqlite::Result<i64> {
    let video_urls = serde_json::to_string(&new.video_urls).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO exercises (name, instructions, muscle_group, target_muscles, level, equipment,
                                video_urls, image_url, reps, exercise_type, duration_seconds)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            new.name.trim(),
            new.instructions,
            new.muscles.primary(),
            new.muscles.to_json(),
            new.level,
            new.equipment.as_deref().map(normalize_equipment),
            video_urls,
            new.image_url,
            new.reps,
            new.exercise_type.as_str(),
            new.duration_seconds,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[derive(Clone)]
pub struct ExerciseRepository {
    pool: DbPool,
}

impl ExerciseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Filtered, name-ordered page of the catalog plus the unpaginated match count.
    pub async fn query(&self, query: ExerciseQuery) -> Result<ExercisePage> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            let filter = build_filter(&query);

            let total: i64 = tx.query_row(
                &format!("SELECT COUNT(*) FROM exercises{}", filter.clause),
                rusqlite::params_from_iter(filter.params.iter()),
                |row| row.get(0),
            )?;

            let mut page_params = filter.params.clone();
            page_params.push(Value::Integer(i64::from(query.limit())));
            page_params.push(Value::Integer(i64::from(query.offset())));

            let exercises = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT * FROM exercises{} ORDER BY name COLLATE NOCASE, id LIMIT ? OFFSET ?",
                    filter.clause
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(page_params.iter()), Exercise::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };
            tx.commit()?;

            Ok(ExercisePage { exercises, total })
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Exercise>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM exercises WHERE id = ?")?;
            let result = stmt.query_row([id], Exercise::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Case-insensitive exact name lookup.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        let pool = self.pool.clone();
        let name = name.trim().to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt =
                conn.prepare("SELECT * FROM exercises WHERE name = ? COLLATE NOCASE ORDER BY id LIMIT 1")?;
            let result = stmt.query_row([&name], Exercise::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn count_by_name(&self, name: &str) -> Result<i64> {
        let pool = self.pool.clone();
        let name = name.trim().to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM exercises WHERE name = ? COLLATE NOCASE",
                [&name],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn create(&self, new: NewExercise) -> Result<Exercise> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let id = insert_exercise(&conn, &new).map_err(|e| {
                AppError::from_constraint(e, "Exercise not found", "An exercise with this name already exists.")
            })?;
            let exercise = conn.query_row("SELECT * FROM exercises WHERE id = ?", [id], Exercise::from_row)?;
            Ok(exercise)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Inserts a batch in one transaction; names already in the catalog are skipped.
    pub async fn import(&self, batch: Vec<NewExercise>) -> Result<ImportSummary> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            let mut summary = ImportSummary::default();

            for new in &batch {
                if find_id_by_name(&tx, &new.name)?.is_some() {
                    tracing::debug!("Skipping existing exercise: {}", new.name);
                    summary.skipped += 1;
                    continue;
                }
                insert_exercise(&tx, new)?;
                summary.imported += 1;
            }

            tx.commit()?;
            Ok(summary)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
