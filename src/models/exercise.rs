use std::collections::BTreeSet;

use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::from_row::{json_column, FromSqliteRow};

/// What the store records for exercises that need no equipment.
pub const NO_EQUIPMENT: &str = "None";
pub const BODYWEIGHT: &str = "Bodyweight";
pub const DEFAULT_LEVEL: &str = "Intermediate";
pub const DEFAULT_INSTRUCTIONS: &str = "No instructions provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    #[default]
    Reps,
    Time,
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Reps => "reps",
            ExerciseType::Time => "time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reps" | "rep" => Some(ExerciseType::Reps),
            "time" | "timed" | "duration" => Some(ExerciseType::Time),
            _ => None,
        }
    }
}

/// Muscle targets as a set of normalized tags.
///
/// The store keeps muscles either in the legacy scalar `muscle_group` column or in the
/// JSON `target_muscles` column; both are folded into this one representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MuscleTags(BTreeSet<String>);

impl MuscleTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(scalar: Option<&str>, set: &[String]) -> Self {
        let mut tags = Self::new();
        if let Some(scalar) = scalar {
            tags.insert(scalar);
        }
        for tag in set {
            tags.insert(tag);
        }
        tags
    }

    pub fn insert(&mut self, raw: &str) {
        if let Some(tag) = normalize_muscle_tag(raw) {
            self.0.insert(tag);
        }
    }

    pub fn contains(&self, raw: &str) -> bool {
        normalize_muscle_tag(raw).is_some_and(|tag| self.0.contains(&tag))
    }

    pub fn primary(&self) -> Option<&str> {
        self.0.iter().next().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl<'a> FromIterator<&'a str> for MuscleTags {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tags = Self::new();
        for raw in iter {
            tags.insert(raw);
        }
        tags
    }
}

/// `" Lower Back "` -> `lower_back`.
pub fn normalize_muscle_tag(raw: &str) -> Option<String> {
    let tag = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

/// Maps the client-facing `Bodyweight` onto the store's no-equipment sentinel.
pub fn normalize_equipment(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case(BODYWEIGHT) {
        NO_EQUIPMENT.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub instructions: Option<String>,
    pub target_muscles: MuscleTags,
    pub level: Option<String>,
    pub equipment: Option<String>,
    pub video_urls: Vec<String>,
    pub image_url: Option<String>,
    pub front_image_url: Option<String>,
    pub back_image_url: Option<String>,
    pub reps: Option<String>,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub duration_seconds: Option<i64>,
}

impl FromSqliteRow for Exercise {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let muscle_group: Option<String> = row.get("muscle_group")?;
        let target_muscles: Vec<String> = json_column(row, "target_muscles")?;
        let type_str: String = row.get("exercise_type")?;
        let exercise_type = ExerciseType::parse(&type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                Type::Text,
                format!("unknown exercise type: {type_str}").into(),
            )
        })?;

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            instructions: row.get("instructions")?,
            target_muscles: MuscleTags::from_store(muscle_group.as_deref(), &target_muscles),
            level: row.get("level")?,
            equipment: row.get("equipment")?,
            video_urls: json_column(row, "video_urls")?,
            image_url: row.get("image_url")?,
            front_image_url: row.get("front_image_url")?,
            back_image_url: row.get("back_image_url")?,
            reps: row.get("reps")?,
            exercise_type,
            duration_seconds: row.get("duration_seconds")?,
        })
    }
}

/// Pulls a duration in seconds out of a free-text descriptor such as
/// `"45s, 3 sets"`, `"1 minute"` or `"30-45 seconds"` (ranges use the lower bound).
pub fn parse_duration_seconds(descriptor: &str) -> Option<i64> {
    let tokens = tokenize(descriptor);
    let mut i = 0;
    while i < tokens.len() {
        if let Token::Number(value) = tokens[i] {
            let mut unit_at = i + 1;
            // "30-45 seconds" / "30 to 45 seconds": the unit follows the upper bound.
            if matches!(tokens.get(unit_at), Some(Token::Dash))
                || matches!(tokens.get(unit_at), Some(Token::Word(w)) if w == "to")
            {
                if matches!(tokens.get(unit_at + 1), Some(Token::Number(_))) {
                    unit_at += 2;
                }
            }
            if let Some(Token::Word(unit)) = tokens.get(unit_at) {
                let seconds = match unit.as_str() {
                    "s" | "sec" | "secs" | "second" | "seconds" => Some(value),
                    "m" | "min" | "mins" | "minute" | "minutes" => value.checked_mul(60),
                    _ => None,
                };
                if let Some(seconds) = seconds.filter(|s| *s > 0) {
                    return Some(seconds);
                }
            }
        }
        i += 1;
    }
    None
}

#[derive(Debug, PartialEq)]
enum Token {
    Number(i64),
    Word(String),
    Dash,
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut value: i64 = 0;
            while let Some(&d) = chars.peek() {
                let Some(digit) = d.to_digit(10) else { break };
                value = value.saturating_mul(10).saturating_add(i64::from(digit));
                chars.next();
            }
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() {
            let mut word = String::new();
            while let Some(&a) = chars.peek() {
                if !a.is_alphabetic() {
                    break;
                }
                word.extend(a.to_lowercase());
                chars.next();
            }
            tokens.push(Token::Word(word));
        } else {
            if c == '-' || c == '–' {
                tokens.push(Token::Dash);
            }
            chars.next();
        }
    }
    tokens
}
