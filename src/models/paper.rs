// src/models/paper.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Represents the 'papers' table in the database.
/// A paper is one JEE Mains shift: an ordered catalog of questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Paper {
    pub id: i64,
    pub title: String,
    pub year: i32,

    /// e.g. "24 Jan, Shift 1".
    pub shift: String,

    /// Countdown length for sessions on this paper.
    pub duration_seconds: i32,

    /// Premium papers are gated behind a subscription.
    pub is_premium: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Row for the paper listing, including question count.
#[derive(Debug, Serialize, FromRow)]
pub struct PaperSummary {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub shift: String,
    pub duration_seconds: i32,
    pub is_premium: bool,
    pub question_count: i64,
}

/// Paper with its questions, answer keys stripped.
#[derive(Debug, Serialize)]
pub struct PaperDetail {
    #[serde(flatten)]
    pub paper: Paper,
    /// True when questions are withheld behind the paywall.
    pub locked: bool,
    pub questions: Vec<PublicQuestion>,
}

/// Query parameters for listing papers.
#[derive(Debug, Deserialize)]
pub struct PaperListParams {
    pub year: Option<i32>,
    pub q: Option<String>,
}

/// DTO for creating a paper.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaperRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 2002, max = 2100))]
    pub year: i32,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub shift: String,
    #[validate(range(min = 60, max = 86400))]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub is_premium: bool,
}

/// DTO for updating a paper. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaperRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(range(min = 2002, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(max = 100))]
    pub shift: Option<String>,
    #[validate(range(min = 60, max = 86400))]
    pub duration_seconds: Option<i32>,
    pub is_premium: Option<bool>,
}
