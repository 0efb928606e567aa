// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Question item type. Choice items score binary via `is_correct`;
/// short-answer items carry partial credit attached by the external grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ItemType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

/// Represents the 'questions' table in the database.
///
/// Rows are created by the external question generator and are read-only to
/// this core.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub session_id: i64,
    pub item_type: ItemType,

    /// The text content of the question.
    pub stem: String,

    /// List of options for choice items; None for short answers.
    /// Stored as a JSON array in the database.
    pub choices: Option<Json<Vec<String>>>,

    /// Opaque JSON document describing the expected answer shape.
    pub answer_schema: Json<serde_json::Value>,

    pub difficulty: f64,
    pub category: String,
    pub round: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for inserting a generated question.
#[derive(Debug, Deserialize, Validate)]
pub struct NewQuestion {
    pub session_id: i64,
    pub item_type: ItemType,
    #[validate(length(min = 1, max = 2000))]
    pub stem: String,
    pub choices: Option<Vec<String>>,
    pub answer_schema: serde_json::Value,
    #[validate(range(min = 1.0, max = 10.0))]
    pub difficulty: f64,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(range(min = 1))]
    pub round: i64,
}
