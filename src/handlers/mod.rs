pub mod auth;
pub mod exercises;
pub mod generator;
pub mod health;
pub mod history;
pub mod workouts;

use serde::{Deserialize, Deserializer};

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Deserialize an optional query-string value.
/// Handles empty strings (`?level=`) by returning None instead of an empty filter.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(non_blank(opt))
}

/// Deserialize an optional integer from a query string, tolerating empty values.
pub(crate) fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match non_blank(opt) {
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
