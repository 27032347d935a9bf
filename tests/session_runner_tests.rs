// tests/session_runner_tests.rs

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use jee_practice::exam::{
    ExamSession, Navigation, ResultSink, ResultSnapshot, SessionError, SubmitReason,
    runner::{self, TICK_PERIOD},
    submission::SinkError,
};
use jee_practice::models::question::{Question, QuestionOption, QuestionType};
use sqlx::types::Json;

/// Keeps every persisted snapshot in memory.
#[derive(Default)]
struct MemorySink {
    stored: Mutex<Vec<ResultSnapshot>>,
}

impl MemorySink {
    fn count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist(&self, snapshot: &ResultSnapshot) -> Result<i64, SinkError> {
        let mut stored = self.stored.lock().unwrap();
        stored.push(snapshot.clone());
        Ok(stored.len() as i64)
    }
}

/// Always fails, counting the attempts.
#[derive(Default)]
struct FailingSink {
    calls: AtomicUsize,
}

#[async_trait]
impl ResultSink for FailingSink {
    async fn persist(&self, _snapshot: &ResultSnapshot) -> Result<i64, SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Unavailable("connection refused".to_string()))
    }
}

fn mcq(id: i64, subject: &str, correct: &str) -> Question {
    Question {
        id,
        paper_id: 1,
        position: id as i32,
        question_type: QuestionType::Mcq,
        subject: subject.to_string(),
        text: Some(format!("Question {}", id)),
        image_url: None,
        options: Json(
            (1..=4)
                .map(|o| QuestionOption {
                    id: o,
                    text: format!("Option {}", o),
                })
                .collect(),
        ),
        correct_option: correct.to_string(),
    }
}

fn paper(duration_secs: u32) -> ExamSession {
    let questions = vec![
        mcq(1, "Physics", "1"),
        mcq(2, "Chemistry", "2"),
        mcq(3, "Mathematics", "3"),
    ];
    ExamSession::new(1, 99, questions, duration_secs).unwrap()
}

#[tokio::test(start_paused = true)]
async fn clock_auto_submits_once_at_zero() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(10_800), sink.clone(), TICK_PERIOD);

    handle.set_answer(1, "1".to_string()).await.unwrap();
    handle.set_answer(2, "3".to_string()).await.unwrap();

    let outcome = handle.finished().await.expect("session should auto-submit");

    assert_eq!(outcome.result.reason, SubmitReason::TimeExpired);
    assert_eq!(outcome.message, "Time's up! Your paper was auto-submitted.");
    assert_eq!(outcome.result.time_spent_seconds, 10_800);
    assert_eq!(outcome.report().total_score, 3);
    assert_eq!(outcome.report().max_possible_score, 12);
    assert_eq!(outcome.report().unattempted_questions, 1);
    assert_eq!(outcome.attempt_id, Some(1));
    assert!(outcome.warning.is_none());
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_without_time_is_submitted_at_once() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(0), sink.clone(), TICK_PERIOD);

    let outcome = handle.finished().await.expect("session should auto-submit");

    assert_eq!(outcome.result.reason, SubmitReason::TimeExpired);
    assert_eq!(outcome.result.time_spent_seconds, 0);
    assert_eq!(outcome.report().unattempted_questions, 3);
    assert_eq!(outcome.report().total_score, 0);
    assert_eq!(sink.count(), 1);
    assert_eq!(handle.view().await.unwrap_err(), SessionError::Closed);
}

#[tokio::test(start_paused = true)]
async fn countdown_follows_the_clock() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(60), sink, TICK_PERIOD);

    tokio::time::sleep(Duration::from_millis(5_500)).await;

    let view = handle.view().await.unwrap();
    assert_eq!(view.remaining_seconds, 55);
    assert!(view.is_active);
}

#[tokio::test(start_paused = true)]
async fn user_submit_scores_and_persists() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(10_800), sink.clone(), TICK_PERIOD);

    handle.set_answer(1, " 1 ".to_string()).await.unwrap();
    handle.set_answer(2, "2".to_string()).await.unwrap();
    handle.set_answer(3, "1".to_string()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(90_500)).await;

    let outcome = handle.submit().await.unwrap();

    assert_eq!(outcome.result.reason, SubmitReason::UserInitiated);
    assert_eq!(outcome.message, "Paper submitted successfully.");
    assert_eq!(outcome.result.time_spent_seconds, 90);
    assert_eq!(outcome.report().total_score, 7);
    assert_eq!(outcome.report().correct_questions, 2);
    assert_eq!(outcome.report().incorrect_questions, 1);
    assert_eq!(outcome.result.answers.get(&1).map(String::as_str), Some("1"));
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn racing_submits_persist_exactly_once() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(10_800), sink.clone(), TICK_PERIOD);
    let other = handle.clone();

    let (first, second) = tokio::join!(handle.submit(), other.submit());

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first, second);
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn submit_after_expiry_returns_the_auto_submitted_outcome() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(5), sink.clone(), TICK_PERIOD);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(handle.is_finished());

    let outcome = handle.submit().await.unwrap();
    assert_eq!(outcome.result.reason, SubmitReason::TimeExpired);
    assert_eq!(outcome.result.time_spent_seconds, 5);
    assert_eq!(sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_persist_still_returns_the_score() {
    let sink = Arc::new(FailingSink::default());
    let handle = runner::spawn(paper(10_800), sink.clone(), TICK_PERIOD);

    handle.set_answer(3, "3".to_string()).await.unwrap();
    let outcome = handle.submit().await.unwrap();

    assert_eq!(outcome.attempt_id, None);
    assert!(!outcome.is_persisted());
    assert_eq!(
        outcome.warning.as_deref(),
        Some("Your result could not be saved to the server.")
    );
    assert_eq!(outcome.report().total_score, 4);

    // Asking again does not retry the write
    let again = handle.submit().await.unwrap();
    assert_eq!(again, outcome);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn commands_after_submit_are_rejected() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(10_800), sink, TICK_PERIOD);

    handle.submit().await.unwrap();

    assert_eq!(handle.view().await.unwrap_err(), SessionError::Closed);
    assert_eq!(
        handle.set_answer(1, "1".to_string()).await.unwrap_err(),
        SessionError::Closed
    );
    assert_eq!(handle.toggle_mark(1).await.unwrap_err(), SessionError::Closed);
    assert_eq!(
        handle.navigate(Navigation::Next).await.unwrap_err(),
        SessionError::Closed
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_commands_leave_the_session_running() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(10_800), sink, TICK_PERIOD);

    assert_eq!(
        handle.set_answer(404, "1".to_string()).await.unwrap_err(),
        SessionError::UnknownQuestion(404)
    );
    assert!(matches!(
        handle.set_answer(1, "9".to_string()).await,
        Err(SessionError::InvalidAnswer { question_id: 1, .. })
    ));

    let view = handle.navigate(Navigation::GoTo { question_id: 3 }).await.unwrap();
    assert_eq!(view.current_index, 2);
    assert!(view.is_active);
}

#[tokio::test(start_paused = true)]
async fn abandoned_session_is_never_persisted() {
    let sink = Arc::new(MemorySink::default());
    let handle = runner::spawn(paper(5), sink.clone(), TICK_PERIOD);
    let watcher = handle.clone();

    handle.set_answer(1, "1".to_string()).await.unwrap();
    drop(handle);
    drop(watcher);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(sink.count(), 0);
}
