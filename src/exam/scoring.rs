// src/exam/scoring.rs

//! Marking scheme and the single answer comparison used everywhere.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::question::{Question, QuestionType};

pub const CORRECT_MARKS: i64 = 4;
pub const INCORRECT_MARKS: i64 = -1;
pub const UNATTEMPTED_MARKS: i64 = 0;

const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Question id -> the candidate's current answer.
pub type AnswerMap = HashMap<i64, String>;

/// How a single question was graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Unattempted,
}

impl Outcome {
    pub fn marks(self) -> i64 {
        match self {
            Outcome::Correct => CORRECT_MARKS,
            Outcome::Incorrect => INCORRECT_MARKS,
            Outcome::Unattempted => UNATTEMPTED_MARKS,
        }
    }
}

/// Final tally of a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total_score: i64,
    pub max_possible_score: i64,
    pub correct_questions: u32,
    pub incorrect_questions: u32,
    pub unattempted_questions: u32,
}

/// Per-subject slice of a [`ScoreReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: String,
    pub score: i64,
    pub max_score: i64,
    pub correct: u32,
    pub incorrect: u32,
    pub unattempted: u32,
}

/// Returns true when `answer` is the right answer to `question`.
///
/// Both sides are trimmed. NUMERIC questions compare as numbers, so "5",
/// "5.0" and " 5 " all match a key of "5". MCQ option ids compare as text,
/// falling back to integers so "01" matches option 1.
pub fn answers_match(question: &Question, answer: &str) -> bool {
    let given = answer.trim();
    let expected = question.correct_option.trim();
    if given.is_empty() {
        return false;
    }

    match question.question_type {
        QuestionType::Numeric => match (given.parse::<f64>(), expected.parse::<f64>()) {
            (Ok(a), Ok(b)) if a.is_finite() && b.is_finite() => (a - b).abs() <= NUMERIC_TOLERANCE,
            (Err(_), Err(_)) => given == expected,
            _ => false,
        },
        QuestionType::Mcq => {
            if given == expected {
                return true;
            }
            match (given.parse::<i64>(), expected.parse::<i64>()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
        }
    }
}

/// Grades one question against the answer map.
pub fn grade(question: &Question, answers: &AnswerMap) -> Outcome {
    match answers.get(&question.id) {
        Some(ans) if !ans.trim().is_empty() => {
            if answers_match(question, ans) {
                Outcome::Correct
            } else {
                Outcome::Incorrect
            }
        }
        _ => Outcome::Unattempted,
    }
}

/// Scores a whole paper. Pure; the result does not depend on question order.
pub fn score(questions: &[Question], answers: &AnswerMap) -> ScoreReport {
    let mut report = ScoreReport {
        total_score: 0,
        max_possible_score: questions.len() as i64 * CORRECT_MARKS,
        correct_questions: 0,
        incorrect_questions: 0,
        unattempted_questions: 0,
    };

    for question in questions {
        let outcome = grade(question, answers);
        report.total_score += outcome.marks();
        match outcome {
            Outcome::Correct => report.correct_questions += 1,
            Outcome::Incorrect => report.incorrect_questions += 1,
            Outcome::Unattempted => report.unattempted_questions += 1,
        }
    }

    report
}

/// Scores the paper per subject, sorted by subject name.
pub fn subject_breakdown(questions: &[Question], answers: &AnswerMap) -> Vec<SubjectScore> {
    let mut by_subject: BTreeMap<&str, SubjectScore> = BTreeMap::new();

    for question in questions {
        let entry = by_subject
            .entry(question.subject.as_str())
            .or_insert_with(|| SubjectScore {
                subject: question.subject.clone(),
                score: 0,
                max_score: 0,
                correct: 0,
                incorrect: 0,
                unattempted: 0,
            });
        let outcome = grade(question, answers);
        entry.score += outcome.marks();
        entry.max_score += CORRECT_MARKS;
        match outcome {
            Outcome::Correct => entry.correct += 1,
            Outcome::Incorrect => entry.incorrect += 1,
            Outcome::Unattempted => entry.unattempted += 1,
        }
    }

    by_subject.into_values().collect()
}
