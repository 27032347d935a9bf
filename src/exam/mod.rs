// src/exam/mod.rs

//! Timed exam sessions: scoring, per-question status, countdown, navigation
//! and the one-shot submission pipeline.

pub mod registry;
pub mod runner;
pub mod scoring;
pub mod session;
pub mod sink;
pub mod status;
pub mod submission;
pub mod timer;

pub use registry::SessionRegistry;
pub use runner::{Navigation, SessionHandle};
pub use scoring::{AnswerMap, ScoreReport};
pub use session::{ExamSession, SessionError, SessionView};
pub use submission::{ResultSink, ResultSnapshot, SubmissionOutcome, SubmitReason};
