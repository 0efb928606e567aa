// src/models/answer.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'attempt_answers' table in the database.
///
/// At most one row exists per (session_id, question_id); repeated autosaves
/// upsert the existing row in place. `is_correct = false` together with
/// `score = 0` is the ungraded default until the external grader attaches a
/// verdict.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,

    /// Opaque structured payload; this core never interprets its content.
    pub user_answer: Json<serde_json::Value>,

    pub is_correct: bool,

    /// Partial credit in [0, 100], meaningful for short-answer items.
    pub score: f64,

    pub response_time_ms: Option<i64>,
    pub saved_at: chrono::DateTime<chrono::Utc>,
}
