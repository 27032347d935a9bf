// src/exam/status.rs

//! Per-question answer/review status and the palette legend derived from it.

use serde::{Deserialize, Serialize};

/// Two independent facts (answered? flagged for review?) folded into one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionStatus {
    #[default]
    Unattempted,
    Attempted,
    MarkedUnattempted,
    MarkedAttempted,
}

impl QuestionStatus {
    pub fn is_answered(self) -> bool {
        matches!(self, QuestionStatus::Attempted | QuestionStatus::MarkedAttempted)
    }

    pub fn is_marked(self) -> bool {
        matches!(
            self,
            QuestionStatus::MarkedUnattempted | QuestionStatus::MarkedAttempted
        )
    }

    /// Status after an answer is supplied. Re-answering is a no-op.
    pub fn answered(self) -> Self {
        match self {
            QuestionStatus::Unattempted => QuestionStatus::Attempted,
            QuestionStatus::MarkedUnattempted => QuestionStatus::MarkedAttempted,
            other => other,
        }
    }

    /// Status after the answer is removed.
    pub fn cleared(self) -> Self {
        match self {
            QuestionStatus::Attempted => QuestionStatus::Unattempted,
            QuestionStatus::MarkedAttempted => QuestionStatus::MarkedUnattempted,
            other => other,
        }
    }

    /// Flips the review flag, keeping the answered fact.
    pub fn toggled(self) -> Self {
        match self {
            QuestionStatus::MarkedUnattempted => QuestionStatus::Unattempted,
            QuestionStatus::MarkedAttempted => QuestionStatus::Attempted,
            QuestionStatus::Attempted => QuestionStatus::MarkedAttempted,
            QuestionStatus::Unattempted => QuestionStatus::MarkedUnattempted,
        }
    }
}

/// Colour bucket a question falls into on the question palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendBucket {
    NotVisited,
    NotAnswered,
    Answered,
    Marked,
    AnsweredAndMarked,
}

impl LegendBucket {
    /// Not-visited wins over whatever the status says.
    pub fn classify(visited: bool, status: QuestionStatus) -> Self {
        if !visited {
            return LegendBucket::NotVisited;
        }
        match status {
            QuestionStatus::Unattempted => LegendBucket::NotAnswered,
            QuestionStatus::Attempted => LegendBucket::Answered,
            QuestionStatus::MarkedUnattempted => LegendBucket::Marked,
            QuestionStatus::MarkedAttempted => LegendBucket::AnsweredAndMarked,
        }
    }
}

/// Counts per legend bucket. Always sums to the number of questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendCounts {
    pub not_visited: u32,
    pub not_answered: u32,
    pub answered: u32,
    pub marked: u32,
    pub answered_and_marked: u32,
}

impl LegendCounts {
    pub fn add(&mut self, bucket: LegendBucket) {
        match bucket {
            LegendBucket::NotVisited => self.not_visited += 1,
            LegendBucket::NotAnswered => self.not_answered += 1,
            LegendBucket::Answered => self.answered += 1,
            LegendBucket::Marked => self.marked += 1,
            LegendBucket::AnsweredAndMarked => self.answered_and_marked += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.not_visited + self.not_answered + self.answered + self.marked + self.answered_and_marked
    }
}

impl FromIterator<LegendBucket> for LegendCounts {
    fn from_iter<I: IntoIterator<Item = LegendBucket>>(iter: I) -> Self {
        let mut counts = LegendCounts::default();
        for bucket in iter {
            counts.add(bucket);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [QuestionStatus; 4] = [
        QuestionStatus::Unattempted,
        QuestionStatus::Attempted,
        QuestionStatus::MarkedUnattempted,
        QuestionStatus::MarkedAttempted,
    ];

    #[test]
    fn test_toggle_table() {
        use QuestionStatus::*;
        assert_eq!(Unattempted.toggled(), MarkedUnattempted);
        assert_eq!(MarkedUnattempted.toggled(), Unattempted);
        assert_eq!(Attempted.toggled(), MarkedAttempted);
        assert_eq!(MarkedAttempted.toggled(), Attempted);
    }

    #[test]
    fn test_double_toggle_is_identity() {
        for s in ALL {
            assert_eq!(s.toggled().toggled(), s);
        }
    }

    #[test]
    fn test_toggle_keeps_answered_fact() {
        for s in ALL {
            assert_eq!(s.toggled().is_answered(), s.is_answered());
            assert_ne!(s.toggled().is_marked(), s.is_marked());
        }
    }

    #[test]
    fn test_answer_and_clear_mirror_each_other() {
        use QuestionStatus::*;
        assert_eq!(Unattempted.answered(), Attempted);
        assert_eq!(MarkedUnattempted.answered(), MarkedAttempted);
        assert_eq!(Attempted.answered(), Attempted);
        assert_eq!(MarkedAttempted.answered(), MarkedAttempted);

        for s in ALL {
            assert_eq!(s.answered().cleared().is_marked(), s.is_marked());
            assert!(!s.answered().cleared().is_answered());
            assert_eq!(s.answered().answered(), s.answered());
        }
    }

    #[test]
    fn test_not_visited_takes_precedence() {
        for s in ALL {
            assert_eq!(LegendBucket::classify(false, s), LegendBucket::NotVisited);
        }
        assert_eq!(
            LegendBucket::classify(true, QuestionStatus::MarkedAttempted),
            LegendBucket::AnsweredAndMarked
        );
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&QuestionStatus::MarkedAttempted).unwrap();
        assert_eq!(json, "\"marked-attempted\"");
    }

    #[test]
    fn test_counts_collect() {
        let counts: LegendCounts = [
            LegendBucket::NotVisited,
            LegendBucket::Answered,
            LegendBucket::Answered,
            LegendBucket::Marked,
        ]
        .into_iter()
        .collect();
        assert_eq!(counts.answered, 2);
        assert_eq!(counts.total(), 4);
    }
}
