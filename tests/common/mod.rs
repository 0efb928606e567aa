// tests/common/mod.rs

#![allow(dead_code)]

use chrono::{Duration, Utc};
use quiz_core::models::question::{ItemType, NewQuestion, Question};
use quiz_core::models::session::{NewTestSession, TestSession};
use quiz_core::store;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Creates an isolated in-memory database with the schema applied.
/// Single connection so the in-memory database survives for the whole test.
pub async fn setup_pool() -> SqlitePool {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate test database");

    pool
}

pub async fn seed_session(pool: &SqlitePool, time_limit_ms: i64) -> TestSession {
    store::create_session(
        pool,
        &NewTestSession {
            user_id: 1,
            survey_id: 1,
            round: 1,
            time_limit_ms,
        },
    )
    .await
    .expect("Failed to seed session")
}

pub async fn seed_question(
    pool: &SqlitePool,
    session_id: i64,
    item_type: ItemType,
    category: &str,
    difficulty: f64,
    round: i64,
) -> Question {
    let choices = match item_type {
        ItemType::ShortAnswer => None,
        _ => Some(vec!["A".to_string(), "B".to_string(), "C".to_string()]),
    };

    store::create_question(
        pool,
        &NewQuestion {
            session_id,
            item_type,
            stem: format!("What about {}?", category),
            choices,
            answer_schema: serde_json::json!({ "type": "string" }),
            difficulty,
            category: category.to_string(),
            round,
        },
    )
    .await
    .expect("Failed to seed question")
}

/// Rewrites `started_at` as if the first autosave happened `minutes` ago,
/// so clock checks can be exercised without sleeping.
pub async fn backdate_started_at(pool: &SqlitePool, session_id: i64, minutes: i64) {
    sqlx::query("UPDATE test_sessions SET started_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::minutes(minutes))
        .bind(session_id)
        .execute(pool)
        .await
        .expect("Failed to backdate session");
}

pub async fn count_answers(pool: &SqlitePool, session_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM attempt_answers WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count answers")
}

pub async fn count_results(pool: &SqlitePool, session_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM test_results WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count results")
}
