// src/engines/scoring.rs
//
// Round scoring: turns a round's AttemptAnswer rows into a percentage score
// plus a per-category failure breakdown, and persists one TestResult per
// (session, round).

use indexmap::IndexMap;
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::error::CoreError;
use crate::models::{question::ItemType, result::TestResult};
use crate::store;

/// Maximum points one question can contribute.
const POINTS_PER_QUESTION: f64 = 100.0;

/// Computed score of one round, before persistence.
#[derive(Debug, Clone, Serialize)]
pub struct RoundScore {
    /// Percentage of achievable points, 0..=100.
    pub score: f64,
    pub total_points: f64,
    pub correct_count: i64,
    pub total_count: i64,
    /// Category -> wrong answer count, in encounter order. Categories with
    /// zero misses are absent.
    pub wrong_categories: IndexMap<String, i64>,
}

#[derive(sqlx::FromRow)]
struct ScoredRow {
    is_correct: bool,
    score: f64,
    item_type: ItemType,
    category: String,
}

/// Computes the score of one round from its saved answers.
///
/// Choice items (multiple_choice, true_false) contribute a binary 0/100 via
/// `is_correct`; short-answer items contribute the partial credit attached
/// by the external grader. The round score is the percentage of achievable
/// points rather than a plain average of booleans, so partial-credit items
/// weigh in proportionally.
///
/// A round with zero answers is an explicit `EmptyRound` error: persisting a
/// meaningless 0% result would corrupt downstream adaptation.
pub async fn calculate_round_score(
    pool: &SqlitePool,
    session_id: i64,
    round: i64,
) -> Result<RoundScore, CoreError> {
    store::fetch_session(pool, session_id).await?;

    let rows = sqlx::query_as::<_, ScoredRow>(
        r#"
        SELECT a.is_correct, a.score, q.item_type, q.category
        FROM attempt_answers a
        JOIN questions q ON q.id = a.question_id
        WHERE a.session_id = ? AND q.round = ?
        ORDER BY a.question_id
        "#,
    )
    .bind(session_id)
    .bind(round)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Err(CoreError::EmptyRound(format!(
            "no answers to score for session {} round {}",
            session_id, round
        )));
    }

    let mut total_points = 0.0;
    let mut correct_count = 0i64;
    let mut wrong_categories: IndexMap<String, i64> = IndexMap::new();

    for row in &rows {
        let points = match row.item_type {
            ItemType::ShortAnswer => row.score.clamp(0.0, POINTS_PER_QUESTION),
            ItemType::MultipleChoice | ItemType::TrueFalse => {
                if row.is_correct {
                    POINTS_PER_QUESTION
                } else {
                    0.0
                }
            }
        };
        total_points += points;

        if row.is_correct {
            correct_count += 1;
        } else {
            *wrong_categories.entry(row.category.clone()).or_insert(0) += 1;
        }
    }

    let total_count = rows.len() as i64;
    let achievable = total_count as f64 * POINTS_PER_QUESTION;
    let score = total_points / achievable * 100.0;

    Ok(RoundScore {
        score,
        total_points,
        correct_count,
        total_count,
        wrong_categories,
    })
}

/// Computes and persists the result of one round.
///
/// The persist step is an upsert against the (session_id, round) unique key,
/// so a retried call refreshes the single existing row instead of
/// duplicating it.
pub async fn save_round_result(
    pool: &SqlitePool,
    session_id: i64,
    round: i64,
) -> Result<TestResult, CoreError> {
    let computed = calculate_round_score(pool, session_id, round).await?;

    sqlx::query(
        r#"
        INSERT INTO test_results
            (session_id, round, score, total_points, correct_count, total_count, wrong_categories)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id, round) DO UPDATE SET
            score = excluded.score,
            total_points = excluded.total_points,
            correct_count = excluded.correct_count,
            total_count = excluded.total_count,
            wrong_categories = excluded.wrong_categories
        "#,
    )
    .bind(session_id)
    .bind(round)
    .bind(computed.score)
    .bind(computed.total_points)
    .bind(computed.correct_count)
    .bind(computed.total_count)
    .bind(Json(computed.wrong_categories.clone()))
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert round result: {:?}", e);
        CoreError::Database(e.to_string())
    })?;

    tracing::info!(
        session_id,
        round,
        score = computed.score,
        "Round result persisted"
    );

    store::fetch_round_result(pool, session_id, round).await
}
