// src/models/result.rs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'test_results' table in the database.
///
/// One row per (session_id, round), created by the scoring engine and
/// consumed read-only by the adaptive difficulty engine. `wrong_categories`
/// maps category to wrong-answer count in encounter order; categories with
/// zero misses are simply absent.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestResult {
    pub id: i64,
    pub session_id: i64,
    pub round: i64,

    /// Percentage of achievable points, 0..=100.
    pub score: f64,

    pub total_points: f64,
    pub correct_count: i64,
    pub total_count: i64,
    pub wrong_categories: Json<IndexMap<String, i64>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}
