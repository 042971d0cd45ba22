//! Embedded database migrations
//!
//! This module contains all SQL migrations embedded into the binary,
//! eliminating the need for external migration files at runtime.

use crate::db::DbPool;

/// All migrations in order, each as (filename, sql_content)
pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_users.sql",
        include_str!("../migrations/001_create_users.sql"),
    ),
    (
        "002_create_exercises.sql",
        include_str!("../migrations/002_create_exercises.sql"),
    ),
    (
        "003_create_workouts.sql",
        include_str!("../migrations/003_create_workouts.sql"),
    ),
    (
        "004_create_history.sql",
        include_str!("../migrations/004_create_history.sql"),
    ),
];

/// Run all pending migrations on the database pool.
///
/// This function tracks which migrations have been applied in a `_migrations` table
/// and only runs migrations that haven't been applied yet.
pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    tracing::info!("Running migrations...");

    let conn = pool.get()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    for (filename, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?",
            [filename],
            |row| row.get(0),
        )?;

        if already_applied {
            tracing::debug!("Skipping already applied migration: {}", filename);
            continue;
        }

        tracing::info!("Running migration: {}", filename);

        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO _migrations (name) VALUES (?)", [filename])?;
    }

    tracing::info!("Migrations completed");
    Ok(())
}

/// Run all migrations for tests (without tracking).
///
/// Suitable for in-memory test databases that are created fresh each time.
pub fn run_migrations_for_tests(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    for (_filename, sql) in MIGRATIONS {
        conn.execute_batch(sql)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[test]
    fn test_run_migrations_is_idempotent() {
        let pool = create_memory_pool().unwrap();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_time_exercise_requires_positive_duration() {
        let pool = create_memory_pool().unwrap();
        run_migrations_for_tests(&pool).unwrap();
        let conn = pool.get().unwrap();

        let result = conn.execute(
            "INSERT INTO exercises (name, exercise_type) VALUES ('Plank', 'time')",
            [],
        );
        assert!(result.is_err());

        conn.execute(
            "INSERT INTO exercises (name, exercise_type, duration_seconds) VALUES ('Plank', 'time', 45)",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_exercise_names_unique_ignoring_case() {
        let pool = create_memory_pool().unwrap();
        run_migrations_for_tests(&pool).unwrap();
        let conn = pool.get().unwrap();

        conn.execute("INSERT INTO exercises (name) VALUES ('Push Up')", [])
            .unwrap();
        let result = conn.execute("INSERT INTO exercises (name) VALUES ('push up')", []);
        assert!(result.is_err());
    }
}
