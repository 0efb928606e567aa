// src/models/session.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Lifecycle state of a test session.
///
/// `Completed` is terminal: no autosave, pause, or resume is accepted once a
/// session reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }
}

/// Represents the 'test_sessions' table in the database.
///
/// `started_at` is set at most once, by the first successful autosave; it is
/// the origin of the time-limit clock, not session creation time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestSession {
    pub id: i64,
    pub user_id: i64,
    pub survey_id: i64,
    pub round: i64,
    pub status: SessionStatus,
    pub time_limit_ms: i64,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub paused_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TestSession {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// DTO for creating a new session (written by the question generator).
#[derive(Debug, Deserialize, Validate)]
pub struct NewTestSession {
    pub user_id: i64,
    pub survey_id: i64,
    #[validate(range(min = 1))]
    pub round: i64,
    #[validate(range(min = 1))]
    pub time_limit_ms: i64,
}
