// tests/autosave_tests.rs

mod common;

use quiz_core::engines::autosave;
use quiz_core::error::CoreError;
use quiz_core::models::question::ItemType;
use quiz_core::models::session::SessionStatus;
use quiz_core::store;

const TWENTY_MINUTES_MS: i64 = 1_200_000;

#[tokio::test]
async fn save_answer_is_idempotent_per_question() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let question =
        common::seed_question(&pool, session.id, ItemType::MultipleChoice, "RAG", 5.0, 1).await;

    let first = autosave::save_answer(
        &pool,
        session.id,
        question.id,
        serde_json::json!({ "selected": "A" }),
        Some(1_500),
    )
    .await
    .unwrap();

    let second = autosave::save_answer(
        &pool,
        session.id,
        question.id,
        serde_json::json!({ "selected": "B" }),
        Some(3_000),
    )
    .await
    .unwrap();

    // One row, reflecting the latest call.
    assert_eq!(common::count_answers(&pool, session.id).await, 1);
    assert_eq!(second.id, first.id);
    assert_eq!(second.user_answer.0["selected"], "B");
    assert_eq!(second.response_time_ms, Some(3_000));
}

#[tokio::test]
async fn first_save_starts_the_clock_exactly_once() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let q1 = common::seed_question(&pool, session.id, ItemType::TrueFalse, "RAG", 5.0, 1).await;
    let q2 = common::seed_question(&pool, session.id, ItemType::TrueFalse, "LLM", 5.0, 1).await;

    assert!(session.started_at.is_none());

    autosave::save_answer(&pool, session.id, q1.id, serde_json::json!(true), None)
        .await
        .unwrap();
    let after_first = store::fetch_session(&pool, session.id).await.unwrap();
    let started_at = after_first.started_at.expect("first save sets started_at");

    autosave::save_answer(&pool, session.id, q2.id, serde_json::json!(false), None)
        .await
        .unwrap();
    let after_second = store::fetch_session(&pool, session.id).await.unwrap();

    assert_eq!(after_second.started_at, Some(started_at));
}

#[tokio::test]
async fn save_answer_rejects_unknown_session_and_foreign_question() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let other = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let foreign =
        common::seed_question(&pool, other.id, ItemType::MultipleChoice, "RAG", 5.0, 1).await;

    let missing_session =
        autosave::save_answer(&pool, 9_999, foreign.id, serde_json::json!({}), None).await;
    assert!(matches!(missing_session, Err(CoreError::NotFound(_))));

    // The question exists but belongs to another session.
    let foreign_question =
        autosave::save_answer(&pool, session.id, foreign.id, serde_json::json!({}), None).await;
    assert!(matches!(foreign_question, Err(CoreError::NotFound(_))));
    assert_eq!(common::count_answers(&pool, session.id).await, 0);
}

#[tokio::test]
async fn completed_session_rejects_autosave() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let question =
        common::seed_question(&pool, session.id, ItemType::MultipleChoice, "RAG", 5.0, 1).await;

    autosave::complete_session(&pool, session.id).await.unwrap();

    let result =
        autosave::save_answer(&pool, session.id, question.id, serde_json::json!({}), None).await;
    assert!(matches!(result, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn resave_resets_attached_grade() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let question =
        common::seed_question(&pool, session.id, ItemType::ShortAnswer, "RAG", 5.0, 1).await;

    autosave::save_answer(
        &pool,
        session.id,
        question.id,
        serde_json::json!({ "text": "v1" }),
        None,
    )
    .await
    .unwrap();

    let graded = store::attach_grade(&pool, session.id, question.id, true, 80.0)
        .await
        .unwrap();
    assert!(graded.is_correct);
    assert_eq!(graded.score, 80.0);

    // A changed payload invalidates the old verdict.
    let resaved = autosave::save_answer(
        &pool,
        session.id,
        question.id,
        serde_json::json!({ "text": "v2" }),
        None,
    )
    .await
    .unwrap();
    assert!(!resaved.is_correct);
    assert_eq!(resaved.score, 0.0);
}

#[tokio::test]
async fn attach_grade_validates_range_and_existence() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let question =
        common::seed_question(&pool, session.id, ItemType::ShortAnswer, "RAG", 5.0, 1).await;

    let out_of_range = store::attach_grade(&pool, session.id, question.id, true, 120.0).await;
    assert!(matches!(out_of_range, Err(CoreError::Validation(_))));

    // No answer row saved yet.
    let missing = store::attach_grade(&pool, session.id, question.id, true, 50.0).await;
    assert!(matches!(missing, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn time_limit_is_derived_from_started_at() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let question =
        common::seed_question(&pool, session.id, ItemType::MultipleChoice, "RAG", 5.0, 1).await;

    // Before the first autosave nothing has elapsed.
    let before = autosave::check_time_limit(&pool, session.id).await.unwrap();
    assert!(!before.exceeded);
    assert_eq!(before.elapsed_ms, 0);
    assert_eq!(before.remaining_ms, TWENTY_MINUTES_MS);

    autosave::save_answer(&pool, session.id, question.id, serde_json::json!({}), None)
        .await
        .unwrap();

    common::backdate_started_at(&pool, session.id, 10).await;
    let halfway = autosave::check_time_limit(&pool, session.id).await.unwrap();
    assert!(!halfway.exceeded);
    assert!(halfway.remaining_ms > 0);

    common::backdate_started_at(&pool, session.id, 21).await;
    let over = autosave::check_time_limit(&pool, session.id).await.unwrap();
    assert!(over.exceeded);
    assert_eq!(over.remaining_ms, 0);
    assert!(over.elapsed_ms > TWENTY_MINUTES_MS);
}

#[tokio::test]
async fn timeout_flow_save_check_pause_resume() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let question =
        common::seed_question(&pool, session.id, ItemType::MultipleChoice, "RAG", 5.0, 1).await;

    autosave::save_answer(&pool, session.id, question.id, serde_json::json!({}), None)
        .await
        .unwrap();
    common::backdate_started_at(&pool, session.id, 21).await;

    let status = autosave::check_time_limit(&pool, session.id).await.unwrap();
    assert!(status.exceeded);

    let paused = autosave::pause_session(&pool, session.id, "time_limit")
        .await
        .unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    assert!(paused.paused_at.is_some());

    // The answer saved before the pause is still there.
    assert_eq!(common::count_answers(&pool, session.id).await, 1);

    let resumed = autosave::resume_session(&pool, session.id).await.unwrap();
    assert_eq!(resumed.status, SessionStatus::InProgress);
    assert!(resumed.paused_at.is_none());
}

#[tokio::test]
async fn pause_resume_state_machine_conflicts() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;

    // Resume requires a paused session.
    let not_paused = autosave::resume_session(&pool, session.id).await;
    assert!(matches!(not_paused, Err(CoreError::Conflict(_))));

    autosave::complete_session(&pool, session.id).await.unwrap();

    let pause_completed = autosave::pause_session(&pool, session.id, "manual").await;
    assert!(matches!(pause_completed, Err(CoreError::Conflict(_))));

    let complete_again = autosave::complete_session(&pool, session.id).await;
    assert!(matches!(complete_again, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn paused_interval_stays_on_the_clock() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let question =
        common::seed_question(&pool, session.id, ItemType::MultipleChoice, "RAG", 5.0, 1).await;

    autosave::save_answer(&pool, session.id, question.id, serde_json::json!({}), None)
        .await
        .unwrap();
    autosave::pause_session(&pool, session.id, "break")
        .await
        .unwrap();

    // A long pause alone can exhaust the limit.
    common::backdate_started_at(&pool, session.id, 25).await;
    autosave::resume_session(&pool, session.id).await.unwrap();

    let status = autosave::check_time_limit(&pool, session.id).await.unwrap();
    assert!(status.exceeded);
}

#[tokio::test]
async fn session_state_reports_progress_and_next_index() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;
    let q1 = common::seed_question(&pool, session.id, ItemType::MultipleChoice, "RAG", 5.0, 1).await;
    let q2 = common::seed_question(&pool, session.id, ItemType::TrueFalse, "LLM", 5.0, 1).await;
    let q3 = common::seed_question(&pool, session.id, ItemType::ShortAnswer, "Math", 5.0, 1).await;

    let fresh = autosave::get_session_state(&pool, session.id).await.unwrap();
    assert_eq!(fresh.answered_count, 0);
    assert_eq!(fresh.total_questions, 3);
    assert_eq!(fresh.next_question_index, 0);

    // Answer the first and third; the gap at index 1 is next.
    autosave::save_answer(&pool, session.id, q1.id, serde_json::json!({}), None)
        .await
        .unwrap();
    autosave::save_answer(&pool, session.id, q3.id, serde_json::json!({}), None)
        .await
        .unwrap();

    let partial = autosave::get_session_state(&pool, session.id).await.unwrap();
    assert_eq!(partial.answered_count, 2);
    assert_eq!(partial.next_question_index, 1);
    assert_eq!(partial.answers.len(), 2);

    autosave::save_answer(&pool, session.id, q2.id, serde_json::json!({}), None)
        .await
        .unwrap();

    let done = autosave::get_session_state(&pool, session.id).await.unwrap();
    assert_eq!(done.answered_count, 3);
    assert_eq!(done.next_question_index, 3);
    assert_eq!(done.status, SessionStatus::InProgress);
}

#[tokio::test]
async fn ownership_check_hides_foreign_sessions() {
    let pool = common::setup_pool().await;
    let session = common::seed_session(&pool, TWENTY_MINUTES_MS).await;

    let owner = store::fetch_session_for_user(&pool, session.id, 1).await;
    assert!(owner.is_ok());

    let stranger = store::fetch_session_for_user(&pool, session.id, 2).await;
    assert!(matches!(stranger, Err(CoreError::NotFound(_))));
}
