// src/store.rs
//
// SessionStore: pool construction plus the persistence surface used by the
// external collaborators (question generator, grader, transport layer) and
// shared by the engines. All entity state lives here; no process-wide caches.

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::types::Json;
use std::time::Duration;
use validator::Validate;

use crate::error::CoreError;
use crate::models::{
    answer::AttemptAnswer,
    question::{NewQuestion, Question},
    result::TestResult,
    session::{NewTestSession, TestSession},
};

/// Connects to the backing store and applies migrations.
pub async fn connect(database_url: &str) -> Result<SqlitePool, CoreError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database connected and migrated");
    Ok(pool)
}

/// Creates a new session row. Called by the question generator when it
/// materializes a round; this core only mutates sessions it did not create.
pub async fn create_session(
    pool: &SqlitePool,
    new: &NewTestSession,
) -> Result<TestSession, CoreError> {
    new.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO test_sessions (user_id, survey_id, round, time_limit_ms)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(new.user_id)
    .bind(new.survey_id)
    .bind(new.round)
    .bind(new.time_limit_ms)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert session: {:?}", e);
        CoreError::Database(e.to_string())
    })?;

    fetch_session(pool, result.last_insert_rowid()).await
}

/// Fetches a session by id, or `NotFound`.
pub async fn fetch_session(pool: &SqlitePool, session_id: i64) -> Result<TestSession, CoreError> {
    sqlx::query_as::<_, TestSession>("SELECT * FROM test_sessions WHERE id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("session {} not found", session_id)))
}

/// Ownership-checked session fetch for the transport layer. A session owned
/// by someone else is reported as `NotFound`, so non-owners cannot tell
/// "absent" from "foreign".
pub async fn fetch_session_for_user(
    pool: &SqlitePool,
    session_id: i64,
    user_id: i64,
) -> Result<TestSession, CoreError> {
    let session = fetch_session(pool, session_id).await?;
    if !session.is_owned_by(user_id) {
        return Err(CoreError::NotFound(format!(
            "session {} not found",
            session_id
        )));
    }
    Ok(session)
}

/// Inserts a generated question. Questions are immutable once created and
/// read-only to the engines.
pub async fn create_question(
    pool: &SqlitePool,
    new: &NewQuestion,
) -> Result<Question, CoreError> {
    new.validate()?;

    // Generator bug guard: a question must reference an existing session.
    fetch_session(pool, new.session_id).await?;

    let choices = new.choices.as_ref().map(|c| Json(c.clone()));

    let result = sqlx::query(
        r#"
        INSERT INTO questions
            (session_id, item_type, stem, choices, answer_schema, difficulty, category, round)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.session_id)
    .bind(new.item_type)
    .bind(&new.stem)
    .bind(choices)
    .bind(Json(new.answer_schema.clone()))
    .bind(new.difficulty)
    .bind(&new.category)
    .bind(new.round)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert question: {:?}", e);
        CoreError::Database(e.to_string())
    })?;

    fetch_question(pool, result.last_insert_rowid()).await
}

/// Fetches a question by id, or `NotFound`.
pub async fn fetch_question(pool: &SqlitePool, question_id: i64) -> Result<Question, CoreError> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
        .bind(question_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("question {} not found", question_id)))
}

/// Fetches a session's questions ordered by creation (id ascending).
pub async fn fetch_session_questions(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<Vec<Question>, CoreError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE session_id = ? ORDER BY id",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;
    Ok(questions)
}

/// Fetches the saved answer for one question of a session, if any.
pub async fn fetch_answer(
    pool: &SqlitePool,
    session_id: i64,
    question_id: i64,
) -> Result<Option<AttemptAnswer>, CoreError> {
    let answer = sqlx::query_as::<_, AttemptAnswer>(
        "SELECT * FROM attempt_answers WHERE session_id = ? AND question_id = ?",
    )
    .bind(session_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await?;
    Ok(answer)
}

/// Attaches the external grader's verdict to a saved answer.
///
/// The core never grades payloads itself; this is the single write path by
/// which a verdict (`is_correct` plus partial credit for short answers)
/// reaches the store.
pub async fn attach_grade(
    pool: &SqlitePool,
    session_id: i64,
    question_id: i64,
    is_correct: bool,
    score: f64,
) -> Result<AttemptAnswer, CoreError> {
    if !(0.0..=100.0).contains(&score) {
        return Err(CoreError::Validation(format!(
            "score {} outside [0, 100]",
            score
        )));
    }

    let updated = sqlx::query(
        r#"
        UPDATE attempt_answers SET is_correct = ?, score = ?
        WHERE session_id = ? AND question_id = ?
        "#,
    )
    .bind(is_correct)
    .bind(score)
    .bind(session_id)
    .bind(question_id)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(CoreError::NotFound(format!(
            "no answer for question {} in session {}",
            question_id, session_id
        )));
    }

    fetch_answer(pool, session_id, question_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("question {} not found", question_id)))
}

/// Fetches the persisted result for (session, round), or `NotFound`.
pub async fn fetch_round_result(
    pool: &SqlitePool,
    session_id: i64,
    round: i64,
) -> Result<TestResult, CoreError> {
    sqlx::query_as::<_, TestResult>(
        "SELECT * FROM test_results WHERE session_id = ? AND round = ?",
    )
    .bind(session_id)
    .bind(round)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        CoreError::NotFound(format!(
            "no result for session {} round {}",
            session_id, round
        ))
    })
}
