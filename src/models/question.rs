// src/models/question.rs

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use thiserror::Error;
use url::Url;
use validator::Validate;

/// Kind of answer a question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionType {
    /// Pick one option id.
    Mcq,
    /// Type a number.
    Numeric,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::Numeric => "NUMERIC",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown question type '{0}'")]
pub struct UnknownQuestionType(pub String);

impl TryFrom<String> for QuestionType {
    type Error = UnknownQuestionType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "MCQ" => Ok(QuestionType::Mcq),
            "NUMERIC" => Ok(QuestionType::Numeric),
            _ => Err(UnknownQuestionType(value)),
        }
    }
}

/// A selectable option of an MCQ question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub text: String,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub paper_id: i64,

    /// Ordering key within the paper.
    pub position: i32,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// Reporting label only (e.g. "Physics").
    pub subject: String,

    pub text: Option<String>,
    pub image_url: Option<String>,

    /// Empty for NUMERIC questions.
    pub options: Json<Vec<QuestionOption>>,

    /// Option id for MCQ, numeric value for NUMERIC, both string-encoded.
    pub correct_option: String,
}

/// DTO for sending a question to a candidate (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub subject: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub options: Vec<QuestionOption>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            subject: q.subject.clone(),
            text: q.text.clone(),
            image_url: q.image_url.clone(),
            options: q.options.0.clone(),
        }
    }
}

/// Column list matching [`Question`]'s `FromRow` layout.
pub const QUESTION_COLUMNS: &str =
    "id, paper_id, position, type, subject, text, image_url, options, correct_option";

/// DTO for creating or replacing a question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    #[validate(length(max = 10000))]
    pub text: Option<String>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[serde(default)]
    #[validate(custom(function = validate_options))]
    pub options: Vec<QuestionOption>,
    #[validate(length(min = 1, max = 50))]
    pub correct_option: String,
    pub position: Option<i32>,
}

impl CreateQuestionRequest {
    /// Checks that the answer key agrees with the question type.
    ///
    /// MCQ questions need options and a `correct_option` naming one of them;
    /// NUMERIC questions carry no options and a numeric `correct_option`.
    pub fn check_answer_key(&self) -> Result<(), String> {
        let key = self.correct_option.trim();
        match self.question_type {
            QuestionType::Mcq => {
                if self.options.is_empty() {
                    return Err("MCQ questions need at least one option".to_string());
                }
                let id: i64 = key
                    .parse()
                    .map_err(|_| format!("correct_option '{}' is not an option id", key))?;
                if !self.options.iter().any(|o| o.id == id) {
                    return Err(format!("correct_option {} does not match any option", id));
                }
            }
            QuestionType::Numeric => {
                if !self.options.is_empty() {
                    return Err("NUMERIC questions cannot have options".to_string());
                }
                if key.parse::<f64>().map(|v| !v.is_finite()).unwrap_or(true) {
                    return Err(format!("correct_option '{}' is not a number", key));
                }
            }
        }
        if let Some(url) = &self.image_url {
            if Url::parse(url).is_err() {
                return Err(format!("image_url '{}' is not a valid URL", url));
            }
        }
        if self.text.as_deref().is_none_or(|t| t.trim().is_empty()) && self.image_url.is_none() {
            return Err("question needs text or an image".to_string());
        }
        Ok(())
    }
}

fn validate_options(options: &[QuestionOption]) -> Result<(), validator::ValidationError> {
    let mut seen = HashSet::new();
    for opt in options {
        if opt.text.len() > 2000 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
        if !seen.insert(opt.id) {
            return Err(validator::ValidationError::new("duplicate_option_id"));
        }
    }
    Ok(())
}
