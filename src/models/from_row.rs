use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;

pub trait FromSqliteRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Reads a TEXT column holding JSON, treating NULL as the type's default.
pub fn json_column<T>(row: &Row, column: &str) -> rusqlite::Result<T>
where
    T: DeserializeOwned + Default,
{
    let raw: Option<String> = row.get(column)?;
    match raw {
        Some(text) if !text.trim().is_empty() => serde_json::from_str(&text).map_err(|e| {
            let index = row.as_ref().column_index(column).unwrap_or_default();
            rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
        }),
        _ => Ok(T::default()),
    }
}
