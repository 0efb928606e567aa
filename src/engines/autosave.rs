// src/engines/autosave.rs
//
// Answer capture under a time limit: idempotent autosave, clock evaluation,
// and the pause/resume/complete transitions. Stateless: every fact is read
// from the store on each call, so the embedding tier can scale without
// server-held session caches.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::error::CoreError;
use crate::models::{
    answer::AttemptAnswer,
    question::Question,
    session::{SessionStatus, TestSession},
};
use crate::store;

/// Snapshot of the session clock, derived on demand from stored timestamps.
/// No running timer exists anywhere in the system.
#[derive(Debug, Clone, Serialize)]
pub struct TimeStatus {
    pub exceeded: bool,
    pub elapsed_ms: i64,
    pub remaining_ms: i64,
    pub status: SessionStatus,
}

/// Full session snapshot for stateless resume of a client.
#[derive(Debug, Serialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub round: i64,
    pub answered_count: i64,
    pub total_questions: i64,
    /// Index of the first question with no recorded answer, in creation
    /// order; equals `total_questions` when every question is answered.
    pub next_question_index: i64,
    pub answers: Vec<AnswerSummary>,
    pub time_status: TimeStatus,
}

#[derive(Debug, Serialize)]
pub struct AnswerSummary {
    pub question_id: i64,
    pub user_answer: Json<serde_json::Value>,
    pub is_correct: bool,
    pub score: f64,
    pub response_time_ms: Option<i64>,
    pub saved_at: chrono::DateTime<chrono::Utc>,
}

/// Saves (or re-saves) a user's answer to one question.
///
/// * The first successful save of a session sets `started_at`; the logical
///   clock starts here, not at session creation.
/// * The write is an upsert keyed by (session_id, question_id): a retried
///   network call overwrites the existing row, it never duplicates it.
/// * Re-saving resets any previously attached grade, since the verdict
///   belonged to the old payload.
pub async fn save_answer(
    pool: &SqlitePool,
    session_id: i64,
    question_id: i64,
    user_answer: serde_json::Value,
    response_time_ms: Option<i64>,
) -> Result<AttemptAnswer, CoreError> {
    let mut tx = pool.begin().await?;

    let session = sqlx::query_as::<_, TestSession>("SELECT * FROM test_sessions WHERE id = ?")
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("session {} not found", session_id)))?;

    if session.status == SessionStatus::Completed {
        return Err(CoreError::Conflict(format!(
            "session {} is completed; autosave rejected",
            session_id
        )));
    }

    let question = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE id = ? AND session_id = ?",
    )
    .bind(question_id)
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        CoreError::NotFound(format!(
            "question {} not found in session {}",
            question_id, session_id
        ))
    })?;

    let now = Utc::now();

    if session.started_at.is_none() {
        sqlx::query("UPDATE test_sessions SET started_at = ? WHERE id = ? AND started_at IS NULL")
            .bind(now)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        tracing::info!(session_id, "Session clock started by first autosave");
    }

    sqlx::query(
        r#"
        INSERT INTO attempt_answers
            (session_id, question_id, user_answer, is_correct, score, response_time_ms, saved_at)
        VALUES (?, ?, ?, 0, 0, ?, ?)
        ON CONFLICT(session_id, question_id) DO UPDATE SET
            user_answer = excluded.user_answer,
            is_correct = excluded.is_correct,
            score = excluded.score,
            response_time_ms = excluded.response_time_ms,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(session_id)
    .bind(question.id)
    .bind(Json(user_answer))
    .bind(response_time_ms)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert answer: {:?}", e);
        CoreError::Database(e.to_string())
    })?;

    let answer = sqlx::query_as::<_, AttemptAnswer>(
        "SELECT * FROM attempt_answers WHERE session_id = ? AND question_id = ?",
    )
    .bind(session_id)
    .bind(question.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(answer)
}

/// Evaluates the session clock against its time limit.
///
/// Pure function of stored state and the current instant. Before the first
/// autosave (`started_at` unset) nothing has elapsed. Paused time is NOT
/// credited back: the clock keeps running logically through a pause.
pub async fn check_time_limit(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<TimeStatus, CoreError> {
    let session = store::fetch_session(pool, session_id).await?;
    Ok(time_status_of(&session))
}

pub(crate) fn time_status_of(session: &TestSession) -> TimeStatus {
    let elapsed_ms = match session.started_at {
        Some(started_at) => (Utc::now() - started_at).num_milliseconds().max(0),
        None => 0,
    };

    TimeStatus {
        exceeded: elapsed_ms > session.time_limit_ms,
        elapsed_ms,
        remaining_ms: (session.time_limit_ms - elapsed_ms).max(0),
        status: session.status,
    }
}

/// Pauses a session (manual trigger or orchestrated time-limit auto-pause).
///
/// The save→check→pause sequence is deliberately three separate calls; an
/// answer persisted a moment before the pause is always honored.
pub async fn pause_session(
    pool: &SqlitePool,
    session_id: i64,
    reason: &str,
) -> Result<TestSession, CoreError> {
    let session = store::fetch_session(pool, session_id).await?;

    if session.status == SessionStatus::Completed {
        return Err(CoreError::Conflict(format!(
            "session {} is completed and cannot be paused",
            session_id
        )));
    }

    sqlx::query("UPDATE test_sessions SET status = ?, paused_at = ? WHERE id = ?")
        .bind(SessionStatus::Paused)
        .bind(Utc::now())
        .bind(session_id)
        .execute(pool)
        .await?;

    tracing::info!(session_id, reason, "Session paused");

    store::fetch_session(pool, session_id).await
}

/// Resumes a paused session. The paused interval stays on the clock.
pub async fn resume_session(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<TestSession, CoreError> {
    let session = store::fetch_session(pool, session_id).await?;

    if session.status != SessionStatus::Paused {
        return Err(CoreError::Conflict(format!(
            "session {} is {}, not paused",
            session_id,
            session.status.as_str()
        )));
    }

    sqlx::query("UPDATE test_sessions SET status = ?, paused_at = NULL WHERE id = ?")
        .bind(SessionStatus::InProgress)
        .bind(session_id)
        .execute(pool)
        .await?;

    tracing::info!(session_id, "Session resumed");

    store::fetch_session(pool, session_id).await
}

/// Moves a session into its terminal state. After this no autosave, pause,
/// or resume is accepted.
pub async fn complete_session(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<TestSession, CoreError> {
    let session = store::fetch_session(pool, session_id).await?;

    if session.status == SessionStatus::Completed {
        return Err(CoreError::Conflict(format!(
            "session {} is already completed",
            session_id
        )));
    }

    sqlx::query("UPDATE test_sessions SET status = ?, paused_at = NULL WHERE id = ?")
        .bind(SessionStatus::Completed)
        .bind(session_id)
        .execute(pool)
        .await?;

    tracing::info!(session_id, "Session completed");

    store::fetch_session(pool, session_id).await
}

/// Rebuilds the full client-facing snapshot of a session from persisted
/// state: progress counters, previously saved answers, and the clock.
pub async fn get_session_state(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<SessionState, CoreError> {
    let session = store::fetch_session(pool, session_id).await?;
    let questions = store::fetch_session_questions(pool, session_id).await?;

    let answers = sqlx::query_as::<_, AttemptAnswer>(
        "SELECT * FROM attempt_answers WHERE session_id = ? ORDER BY question_id",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    let next_question_index = questions
        .iter()
        .position(|q| !answers.iter().any(|a| a.question_id == q.id))
        .unwrap_or(questions.len()) as i64;

    let summaries = answers
        .into_iter()
        .map(|a| AnswerSummary {
            question_id: a.question_id,
            user_answer: a.user_answer,
            is_correct: a.is_correct,
            score: a.score,
            response_time_ms: a.response_time_ms,
            saved_at: a.saved_at,
        })
        .collect::<Vec<_>>();

    Ok(SessionState {
        status: session.status,
        round: session.round,
        answered_count: summaries.len() as i64,
        total_questions: questions.len() as i64,
        next_question_index,
        answers: summaries,
        time_status: time_status_of(&session),
    })
}
