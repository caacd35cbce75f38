use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// A habit owned by one user.
///
/// Field names on the wire follow the backend's `habits` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    #[serde(rename = "user_id")]
    #[sqlx(rename = "user_id")]
    pub owner_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A habit marked done on one calendar day.
///
/// `day` is the canonical `YYYY-MM-DD` day in the reference zone; at most one
/// completion exists per (`habit_id`, `day`).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Completion {
    pub id: String,
    pub habit_id: String,
    #[serde(rename = "user_id")]
    #[sqlx(rename = "user_id")]
    pub owner_id: String,
    #[serde(rename = "date")]
    #[sqlx(rename = "date")]
    pub day: NaiveDate,
    #[serde(rename = "completed_at")]
    #[sqlx(rename = "completed_at")]
    pub recorded_at: DateTime<Utc>,
}

// ==================== Habit Names ====================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("habit name must not be empty")]
pub struct InvalidHabitName;

/// A trimmed, non-empty habit name. Stores only accept this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HabitName(String);

impl HabitName {
    pub fn parse(raw: &str) -> Result<Self, InvalidHabitName> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidHabitName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
