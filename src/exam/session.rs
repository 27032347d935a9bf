// src/exam/session.rs

//! State of one timed attempt at a paper.
//!
//! An [`ExamSession`] is single-use: it is created from a loaded question
//! catalog, mutated by navigation, answer entry and the countdown, and frozen
//! by [`ExamSession::finish`]. After that every mutating call returns
//! [`SessionError::Closed`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exam::scoring::{self, AnswerMap};
use crate::exam::status::{LegendBucket, LegendCounts, QuestionStatus};
use crate::exam::submission::{ResultSnapshot, SubmitReason};
use crate::exam::timer::{Countdown, Tick, TimerState};
use crate::models::question::{PublicQuestion, Question, QuestionType};

/// Errors emitted by session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions found for this paper")]
    NoQuestions,
    #[error("question {0} is not part of this paper")]
    UnknownQuestion(i64),
    #[error("invalid answer for question {question_id}: {reason}")]
    InvalidAnswer { question_id: i64, reason: String },
    #[error("session is no longer active")]
    Closed,
}

/// One cell of the question palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub index: usize,
    pub question_id: i64,
    pub subject: String,
    pub bucket: LegendBucket,
}

/// Everything the exam screen renders, minus the answer keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub paper_id: i64,
    pub current_index: usize,
    pub total_questions: usize,
    pub current_question: PublicQuestion,
    pub current_answer: Option<String>,
    pub current_status: QuestionStatus,
    pub remaining_seconds: u32,
    pub timer: TimerState,
    pub is_active: bool,
    pub palette: Vec<PaletteEntry>,
    pub legend: LegendCounts,
}

#[derive(Debug)]
pub struct ExamSession {
    paper_id: i64,
    user_id: i64,
    questions: Vec<Question>,
    index_of: HashMap<i64, usize>,
    current_index: usize,
    answers: AnswerMap,
    status: HashMap<i64, QuestionStatus>,
    visited: HashSet<i64>,
    countdown: Countdown,
    /// Submission guard; flips to false exactly once.
    active: bool,
}

impl ExamSession {
    /// Starts a session on a freshly loaded catalog. The first question is
    /// current and visited.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` when the catalog is empty.
    pub fn new(
        paper_id: i64,
        user_id: i64,
        questions: Vec<Question>,
        duration_secs: u32,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        let index_of = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id, i))
            .collect();
        let status = questions
            .iter()
            .map(|q| (q.id, QuestionStatus::default()))
            .collect();

        let mut session = Self {
            paper_id,
            user_id,
            questions,
            index_of,
            current_index: 0,
            answers: AnswerMap::new(),
            status,
            visited: HashSet::new(),
            countdown: Countdown::new(duration_secs),
            active: true,
        };
        let first = session.questions[0].id;
        session.mark_visited(first);
        Ok(session)
    }

    pub fn paper_id(&self) -> i64 {
        self.paper_id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn status_of(&self, question_id: i64) -> Option<QuestionStatus> {
        self.status.get(&question_id).copied()
    }

    pub fn is_visited(&self, question_id: i64) -> bool {
        self.visited.contains(&question_id)
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn timer_state(&self) -> TimerState {
        self.countdown.state()
    }

    /// Accepting input: not yet submitted and the clock is still running.
    pub fn is_active(&self) -> bool {
        self.active && self.countdown.is_running()
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    fn question(&self, question_id: i64) -> Result<&Question, SessionError> {
        self.index_of
            .get(&question_id)
            .map(|&i| &self.questions[i])
            .ok_or(SessionError::UnknownQuestion(question_id))
    }

    /// Records an answer. A blank value is treated as clearing the answer.
    ///
    /// # Errors
    ///
    /// `Closed` after submission, `UnknownQuestion` for ids outside the paper,
    /// `InvalidAnswer` for an MCQ value that names no option or a NUMERIC
    /// value that is not a number.
    pub fn set_answer(&mut self, question_id: i64, value: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        let question = self.question(question_id)?;
        let value = value.trim();
        if value.is_empty() {
            return self.clear_answer(question_id);
        }
        check_answer(question, value)?;

        self.answers.insert(question_id, value.to_string());
        let status = self.status.entry(question_id).or_default();
        *status = status.answered();
        Ok(())
    }

    /// Removes an answer, keeping the review flag.
    pub fn clear_answer(&mut self, question_id: i64) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.question(question_id)?;

        self.answers.remove(&question_id);
        let status = self.status.entry(question_id).or_default();
        *status = status.cleared();
        Ok(())
    }

    pub fn toggle_mark(&mut self, question_id: i64) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.question(question_id)?;

        let status = self.status.entry(question_id).or_default();
        *status = status.toggled();
        Ok(())
    }

    /// Idempotent. Ids outside the paper are ignored.
    pub fn mark_visited(&mut self, question_id: i64) {
        if self.index_of.contains_key(&question_id) {
            self.visited.insert(question_id);
        }
    }

    fn move_to(&mut self, index: usize) {
        self.current_index = index;
        let id = self.questions[index].id;
        self.mark_visited(id);
    }

    /// Moves forward; no-op on the last question.
    pub fn go_next(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.current_index + 1 < self.questions.len() {
            self.move_to(self.current_index + 1);
        }
        Ok(())
    }

    /// Moves back; no-op on the first question.
    pub fn go_previous(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.current_index > 0 {
            self.move_to(self.current_index - 1);
        }
        Ok(())
    }

    /// Jumps to a question by id. Unknown ids are silently ignored.
    pub fn go_to(&mut self, question_id: i64) -> Result<(), SessionError> {
        self.ensure_open()?;
        if let Some(&index) = self.index_of.get(&question_id) {
            self.move_to(index);
        }
        Ok(())
    }

    /// Advances the countdown by one second. No effect once submitted.
    pub fn tick(&mut self) -> Tick {
        if !self.active {
            return Tick::Idle;
        }
        self.countdown.tick()
    }

    /// Freezes the session and produces the result snapshot.
    ///
    /// Returns `None` if the session was already finished, so the scoring and
    /// hand-off can only ever happen once.
    pub fn finish(
        &mut self,
        reason: SubmitReason,
        completed_at: DateTime<Utc>,
    ) -> Option<ResultSnapshot> {
        if !self.active {
            return None;
        }
        self.active = false;
        self.countdown.stop();

        let report = scoring::score(&self.questions, &self.answers);
        Some(ResultSnapshot {
            paper_id: self.paper_id,
            user_id: self.user_id,
            answers: self.answers.clone(),
            status: self.status.clone(),
            answer_key: self
                .questions
                .iter()
                .map(|q| (q.id, q.correct_option.clone()))
                .collect(),
            report,
            subject_scores: scoring::subject_breakdown(&self.questions, &self.answers),
            time_spent_seconds: self.countdown.elapsed(),
            reason,
            completed_at,
        })
    }

    pub fn bucket_of(&self, question_id: i64) -> LegendBucket {
        LegendBucket::classify(
            self.is_visited(question_id),
            self.status_of(question_id).unwrap_or_default(),
        )
    }

    pub fn palette(&self) -> Vec<PaletteEntry> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, q)| PaletteEntry {
                index,
                question_id: q.id,
                subject: q.subject.clone(),
                bucket: self.bucket_of(q.id),
            })
            .collect()
    }

    pub fn legend(&self) -> LegendCounts {
        self.questions.iter().map(|q| self.bucket_of(q.id)).collect()
    }

    pub fn view(&self) -> SessionView {
        let current = self.current_question();
        SessionView {
            paper_id: self.paper_id,
            current_index: self.current_index,
            total_questions: self.questions.len(),
            current_question: PublicQuestion::from(current),
            current_answer: self.answers.get(&current.id).cloned(),
            current_status: self.status_of(current.id).unwrap_or_default(),
            remaining_seconds: self.remaining_seconds(),
            timer: self.timer_state(),
            is_active: self.is_active(),
            palette: self.palette(),
            legend: self.legend(),
        }
    }
}

fn check_answer(question: &Question, value: &str) -> Result<(), SessionError> {
    let invalid = |reason: String| SessionError::InvalidAnswer {
        question_id: question.id,
        reason,
    };
    match question.question_type {
        QuestionType::Mcq => {
            let id: i64 = value
                .parse()
                .map_err(|_| invalid(format!("'{}' is not an option id", value)))?;
            if !question.options.iter().any(|o| o.id == id) {
                return Err(invalid(format!("option {} does not exist", id)));
            }
        }
        QuestionType::Numeric => {
            if value.parse::<f64>().map(|v| !v.is_finite()).unwrap_or(true) {
                return Err(invalid(format!("'{}' is not a number", value)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionOption;
    use sqlx::types::Json;

    fn question(id: i64, question_type: QuestionType, correct: &str) -> Question {
        let options = match question_type {
            QuestionType::Mcq => (1..=4)
                .map(|o| QuestionOption { id: o, text: format!("Option {}", o) })
                .collect(),
            QuestionType::Numeric => Vec::new(),
        };
        Question {
            id,
            paper_id: 7,
            position: id as i32,
            question_type,
            subject: "Physics".to_string(),
            text: Some(format!("Q{}", id)),
            image_url: None,
            options: Json(options),
            correct_option: correct.to_string(),
        }
    }

    fn session(n: i64) -> ExamSession {
        let questions = (1..=n).map(|i| question(i * 10, QuestionType::Mcq, "1")).collect();
        ExamSession::new(7, 42, questions, 10_800).unwrap()
    }

    #[test]
    fn test_empty_catalog_cannot_start() {
        let err = ExamSession::new(7, 42, Vec::new(), 10_800).unwrap_err();
        assert_eq!(err, SessionError::NoQuestions);
    }

    #[test]
    fn test_first_question_is_visited_on_start() {
        let s = session(3);
        assert_eq!(s.current_index(), 0);
        assert!(s.is_visited(10));
        assert!(!s.is_visited(20));
        assert_eq!(s.legend().not_visited, 2);
        assert_eq!(s.legend().not_answered, 1);
    }

    #[test]
    fn test_set_answer_transitions_status() {
        let mut s = session(2);
        s.set_answer(10, "2").unwrap();
        assert_eq!(s.status_of(10), Some(QuestionStatus::Attempted));

        s.toggle_mark(20).unwrap();
        s.set_answer(20, "3").unwrap();
        assert_eq!(s.status_of(20), Some(QuestionStatus::MarkedAttempted));
    }

    #[test]
    fn test_re_answering_keeps_status() {
        let mut s = session(1);
        s.set_answer(10, "2").unwrap();
        let after_first = s.status_of(10);
        s.set_answer(10, "2").unwrap();
        assert_eq!(s.status_of(10), after_first);
        s.set_answer(10, "4").unwrap();
        assert_eq!(s.status_of(10), after_first);
        assert_eq!(s.answers().get(&10).map(String::as_str), Some("4"));
    }

    #[test]
    fn test_toggle_twice_restores_status_and_keeps_answer() {
        let mut s = session(1);
        s.toggle_mark(10).unwrap();
        assert_eq!(s.status_of(10), Some(QuestionStatus::MarkedUnattempted));
        s.toggle_mark(10).unwrap();
        assert_eq!(s.status_of(10), Some(QuestionStatus::Unattempted));

        s.set_answer(10, "1").unwrap();
        s.toggle_mark(10).unwrap();
        s.toggle_mark(10).unwrap();
        assert_eq!(s.status_of(10), Some(QuestionStatus::Attempted));
        assert!(s.answers().contains_key(&10));
    }

    #[test]
    fn test_clear_answer_reverts_status() {
        let mut s = session(1);
        s.toggle_mark(10).unwrap();
        s.set_answer(10, "3").unwrap();
        s.clear_answer(10).unwrap();
        assert_eq!(s.status_of(10), Some(QuestionStatus::MarkedUnattempted));
        assert!(!s.answers().contains_key(&10));

        s.set_answer(10, "3").unwrap();
        s.set_answer(10, "  ").unwrap();
        assert_eq!(s.status_of(10), Some(QuestionStatus::MarkedUnattempted));
    }

    #[test]
    fn test_answer_validation() {
        let questions = vec![
            question(1, QuestionType::Mcq, "1"),
            question(2, QuestionType::Numeric, "5"),
        ];
        let mut s = ExamSession::new(7, 42, questions, 60).unwrap();

        assert!(matches!(s.set_answer(1, "9"), Err(SessionError::InvalidAnswer { .. })));
        assert!(matches!(s.set_answer(1, "A"), Err(SessionError::InvalidAnswer { .. })));
        assert!(matches!(s.set_answer(2, "abc"), Err(SessionError::InvalidAnswer { .. })));
        assert_eq!(s.set_answer(3, "1"), Err(SessionError::UnknownQuestion(3)));
        assert_eq!(s.toggle_mark(3), Err(SessionError::UnknownQuestion(3)));

        s.set_answer(2, " -2.5 ").unwrap();
        assert_eq!(s.answers().get(&2).map(String::as_str), Some("-2.5"));
        assert_eq!(s.status_of(1), Some(QuestionStatus::Unattempted));
    }

    #[test]
    fn test_boundary_navigation_is_a_noop() {
        let mut s = session(3);
        s.go_previous().unwrap();
        assert_eq!(s.current_index(), 0);

        s.go_next().unwrap();
        s.go_next().unwrap();
        assert_eq!(s.current_index(), 2);
        s.go_next().unwrap();
        assert_eq!(s.current_index(), 2);
        assert_eq!(s.legend().not_visited, 0);
    }

    #[test]
    fn test_go_to() {
        let mut s = session(5);
        s.go_to(40).unwrap();
        assert_eq!(s.current_index(), 3);
        assert!(s.is_visited(40));

        s.go_to(999).unwrap();
        assert_eq!(s.current_index(), 3);
    }

    #[test]
    fn test_legend_partitions_questions() {
        let mut s = session(6);
        s.set_answer(10, "1").unwrap();
        s.go_next().unwrap();
        s.toggle_mark(20).unwrap();
        s.go_next().unwrap();
        s.set_answer(30, "2").unwrap();
        s.toggle_mark(30).unwrap();
        s.go_next().unwrap();
        // Answered without visiting: still counted as not visited.
        s.set_answer(60, "1").unwrap();

        let legend = s.legend();
        assert_eq!(legend.total(), 6);
        assert_eq!(legend.answered, 1);
        assert_eq!(legend.marked, 1);
        assert_eq!(legend.answered_and_marked, 1);
        assert_eq!(legend.not_answered, 1);
        assert_eq!(legend.not_visited, 2);
        assert_eq!(s.bucket_of(60), LegendBucket::NotVisited);
    }

    #[test]
    fn test_finish_happens_once_and_freezes() {
        let mut s = session(3);
        s.set_answer(10, "1").unwrap();
        s.set_answer(20, "2").unwrap();
        s.tick();
        s.tick();

        let snapshot = s.finish(SubmitReason::UserInitiated, Utc::now()).unwrap();
        assert_eq!(snapshot.report.correct_questions, 1);
        assert_eq!(snapshot.report.incorrect_questions, 1);
        assert_eq!(snapshot.report.total_score, 3);
        assert_eq!(snapshot.time_spent_seconds, 2);
        assert_eq!(snapshot.user_id, 42);
        assert_eq!(snapshot.answer_key.len(), 3);
        assert_eq!(snapshot.answer_key.get(&10).map(String::as_str), Some("1"));

        assert!(s.finish(SubmitReason::TimeExpired, Utc::now()).is_none());
        assert_eq!(s.set_answer(30, "1"), Err(SessionError::Closed));
        assert_eq!(s.go_next(), Err(SessionError::Closed));
        assert_eq!(s.tick(), Tick::Idle);
        assert_eq!(s.timer_state(), TimerState::Stopped);
    }

    #[test]
    fn test_expiry_closes_input_but_allows_one_finish() {
        let questions = vec![question(1, QuestionType::Mcq, "1")];
        let mut s = ExamSession::new(7, 42, questions, 2).unwrap();
        assert_eq!(s.tick(), Tick::Running(1));
        assert_eq!(s.tick(), Tick::Expired);
        assert!(!s.is_active());
        assert_eq!(s.toggle_mark(1), Err(SessionError::Closed));

        let snapshot = s.finish(SubmitReason::TimeExpired, Utc::now()).unwrap();
        assert_eq!(snapshot.time_spent_seconds, 2);
        assert_eq!(s.timer_state(), TimerState::Expired);
        assert!(s.finish(SubmitReason::UserInitiated, Utc::now()).is_none());
    }

    #[test]
    fn test_view_hides_answer_key() {
        let mut s = session(2);
        s.set_answer(10, "3").unwrap();
        let view = s.view();
        assert_eq!(view.current_answer.as_deref(), Some("3"));
        assert_eq!(view.current_status, QuestionStatus::Attempted);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["current_question"].get("correct_option").is_none());
        assert_eq!(json["palette"].as_array().unwrap().len(), 2);
    }
}
