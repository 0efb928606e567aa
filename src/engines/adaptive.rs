// src/engines/adaptive.rs
//
// Adaptive difficulty: maps a completed round's result to the parameters the
// external question generator consumes for the next round: a coarse tier,
// a clamped difficulty value, and a slot allocation biased toward the
// categories the user got wrong.

use indexmap::IndexMap;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::CoreError;
use crate::store;

/// Number of questions a follow-up round targets when the generator gives
/// no explicit size.
pub const DEFAULT_ROUND_SIZE: usize = 5;

/// Floor of the adjustable difficulty scale.
const MIN_DIFFICULTY: f64 = 1.0;
/// Ceiling of the adjustable difficulty scale.
const MAX_DIFFICULTY: f64 = 10.0;

/// Coarse performance bucket of a round, derived from its percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Low,
    Medium,
    High,
}

impl DifficultyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTier::Low => "low",
            DifficultyTier::Medium => "medium",
            DifficultyTier::High => "high",
        }
    }
}

/// Aggregate parameter bundle consumed by the external question generator
/// to shape the next round's content request.
#[derive(Debug, Serialize)]
pub struct AdaptiveParams {
    pub difficulty_tier: DifficultyTier,
    pub adjusted_difficulty: f64,
    pub weak_categories: IndexMap<String, i64>,
    pub priority_ratio: IndexMap<String, usize>,
    pub score: f64,
    pub correct_count: i64,
    pub total_count: i64,
}

/// Buckets a percentage score: [0, 40) low, [40, 70) medium, [70, 100] high.
/// Exactly 40.0 and 70.0 belong to the higher tier.
pub fn get_difficulty_tier(score: f64) -> Result<DifficultyTier, CoreError> {
    if !(0.0..=100.0).contains(&score) {
        return Err(CoreError::Validation(format!(
            "score {} outside [0, 100]",
            score
        )));
    }

    Ok(if score < 40.0 {
        DifficultyTier::Low
    } else if score < 70.0 {
        DifficultyTier::Medium
    } else {
        DifficultyTier::High
    })
}

/// Computes the next round's difficulty from the previous round's average
/// difficulty and its score, clamped to [1, 10].
///
/// Struggling users (low tier) drop one step to rebuild confidence; adequate
/// performers get a gentle +0.5 nudge, never a penalty; strong performers
/// ramp up by two.
pub fn calculate_round2_difficulty(
    prev_avg_difficulty: f64,
    score: f64,
) -> Result<f64, CoreError> {
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&prev_avg_difficulty) {
        return Err(CoreError::Validation(format!(
            "average difficulty {} outside [1, 10]",
            prev_avg_difficulty
        )));
    }

    let adjusted = match get_difficulty_tier(score)? {
        DifficultyTier::Low => prev_avg_difficulty - 1.0,
        DifficultyTier::Medium => prev_avg_difficulty + 0.5,
        DifficultyTier::High => prev_avg_difficulty + 2.0,
    };

    Ok(adjusted.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY))
}

/// Returns round-1 categories with more than `min_threshold` wrong answers,
/// in encounter order.
///
/// Fails `NotFound` until round 1 has been scored; adaptation cannot
/// precede scoring.
pub async fn get_weak_categories(
    pool: &SqlitePool,
    session_id: i64,
    min_threshold: i64,
) -> Result<IndexMap<String, i64>, CoreError> {
    let result = store::fetch_round_result(pool, session_id, 1).await?;

    Ok(result
        .wrong_categories
        .0
        .into_iter()
        .filter(|(_, count)| *count > min_threshold)
        .collect())
}

/// Allocates next-round question slots to weak categories.
///
/// At least half of the round (rounded up, minimum 3, capped at the round
/// size) is reserved for weak categories; the reserved slots are spread as
/// evenly as possible in encounter order, with earlier categories absorbing
/// the remainder of an uneven division. An empty input yields an empty
/// allocation, signalling the caller to fall back to balanced selection.
pub fn get_category_priority_ratio(
    wrong_categories: &IndexMap<String, i64>,
    total_questions: usize,
) -> IndexMap<String, usize> {
    let mut allocation = IndexMap::new();
    if wrong_categories.is_empty() || total_questions == 0 {
        return allocation;
    }

    let reserved = total_questions.div_ceil(2);
    let slots = reserved.max(3).min(total_questions);

    let categories = wrong_categories.len();
    let base = slots / categories;
    let remainder = slots % categories;

    for (i, category) in wrong_categories.keys().enumerate() {
        let count = base + usize::from(i < remainder);
        if count > 0 {
            allocation.insert(category.clone(), count);
        }
    }

    allocation
}

/// Assembles the full parameter bundle for the next round's generation from
/// the round-1 result. The caller must have persisted that result first;
/// until then this fails `NotFound`.
pub async fn get_adaptive_generation_params(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<AdaptiveParams, CoreError> {
    let result = store::fetch_round_result(pool, session_id, 1).await?;

    let questions = store::fetch_session_questions(pool, session_id).await?;
    let round1: Vec<_> = questions.iter().filter(|q| q.round == 1).collect();
    if round1.is_empty() {
        return Err(CoreError::NotFound(format!(
            "no round 1 questions for session {}",
            session_id
        )));
    }
    let prev_avg_difficulty =
        round1.iter().map(|q| q.difficulty).sum::<f64>() / round1.len() as f64;

    let difficulty_tier = get_difficulty_tier(result.score)?;
    let adjusted_difficulty = calculate_round2_difficulty(prev_avg_difficulty, result.score)?;
    let weak_categories = get_weak_categories(pool, session_id, 0).await?;
    let priority_ratio = get_category_priority_ratio(&weak_categories, DEFAULT_ROUND_SIZE);

    tracing::debug!(
        session_id,
        tier = difficulty_tier.as_str(),
        adjusted_difficulty,
        "Adaptive parameters computed"
    );

    Ok(AdaptiveParams {
        difficulty_tier,
        adjusted_difficulty,
        weak_categories,
        priority_ratio,
        score: result.score,
        correct_count: result.correct_count,
        total_count: result.total_count,
    })
}
