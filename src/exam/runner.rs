// src/exam/runner.rs

//! Runs each live session on its own task.
//!
//! The task owns the [`ExamSession`] and is the only code that touches it.
//! User commands and the one-second countdown tick arrive through a single
//! `select!` loop, so they are applied strictly one after another. The task
//! ends after submission (publishing the outcome on a watch channel) or when
//! every handle has been dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::exam::session::{ExamSession, SessionError, SessionView};
use crate::exam::submission::{self, ResultSink, SubmissionOutcome, SubmitReason};
use crate::exam::timer::{Tick, TimerState};

/// Countdown cadence.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 32;

type ViewReply = oneshot::Sender<Result<SessionView, SessionError>>;

/// Navigation request from the exam screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Navigation {
    Next,
    Previous,
    GoTo { question_id: i64 },
}

enum Command {
    View(ViewReply),
    Answer {
        question_id: i64,
        value: String,
        reply: ViewReply,
    },
    ClearAnswer {
        question_id: i64,
        reply: ViewReply,
    },
    ToggleMark {
        question_id: i64,
        reply: ViewReply,
    },
    Navigate {
        to: Navigation,
        reply: ViewReply,
    },
    Submit(oneshot::Sender<Option<SubmissionOutcome>>),
}

/// View of a live session together with its id.
#[derive(Debug, Clone, Serialize)]
pub struct LiveSession {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub view: SessionView,
}

/// Cheap, cloneable handle to a running session task.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    user_id: i64,
    paper_id: i64,
    commands: mpsc::Sender<Command>,
    outcome: watch::Receiver<Option<SubmissionOutcome>>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn paper_id(&self) -> i64 {
        self.paper_id
    }

    /// The final outcome, once the session has been submitted.
    pub fn outcome(&self) -> Option<SubmissionOutcome> {
        self.outcome.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Waits until the session is submitted (by the user or the clock).
    /// Returns `None` if the session was abandoned instead.
    pub async fn finished(&self) -> Option<SubmissionOutcome> {
        let mut rx = self.outcome.clone();
        let _ = rx.wait_for(Option::is_some).await;
        let outcome = rx.borrow().clone();
        outcome
    }

    async fn request(
        &self,
        build: impl FnOnce(ViewReply) -> Command,
    ) -> Result<SessionView, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn view(&self) -> Result<SessionView, SessionError> {
        self.request(Command::View).await
    }

    pub async fn set_answer(
        &self,
        question_id: i64,
        value: String,
    ) -> Result<SessionView, SessionError> {
        self.request(|reply| Command::Answer {
            question_id,
            value,
            reply,
        })
        .await
    }

    pub async fn clear_answer(&self, question_id: i64) -> Result<SessionView, SessionError> {
        self.request(|reply| Command::ClearAnswer { question_id, reply })
            .await
    }

    pub async fn toggle_mark(&self, question_id: i64) -> Result<SessionView, SessionError> {
        self.request(|reply| Command::ToggleMark { question_id, reply })
            .await
    }

    pub async fn navigate(&self, to: Navigation) -> Result<SessionView, SessionError> {
        self.request(|reply| Command::Navigate { to, reply }).await
    }

    /// User-initiated submit. Calling it again, or after the clock ran out,
    /// returns the outcome already produced instead of scoring twice.
    pub async fn submit(&self) -> Result<SubmissionOutcome, SessionError> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Submit(tx)).await.is_ok() {
            if let Ok(Some(outcome)) = rx.await {
                return Ok(outcome);
            }
        }
        self.outcome().ok_or(SessionError::Closed)
    }
}

/// Spawns the task driving `session` and returns a handle to it.
pub fn spawn(
    session: ExamSession,
    sink: Arc<dyn ResultSink>,
    tick_period: Duration,
) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (outcome_tx, outcome_rx) = watch::channel(None);

    let handle = SessionHandle {
        id: Uuid::new_v4(),
        user_id: session.user_id(),
        paper_id: session.paper_id(),
        commands: cmd_tx,
        outcome: outcome_rx,
    };

    let id = handle.id;
    tokio::spawn(async move {
        run(id, session, cmd_rx, sink, outcome_tx, tick_period).await;
    });

    handle
}

async fn run(
    id: Uuid,
    mut session: ExamSession,
    mut commands: mpsc::Receiver<Command>,
    sink: Arc<dyn ResultSink>,
    outcome_tx: watch::Sender<Option<SubmissionOutcome>>,
    tick_period: Duration,
) {
    tracing::info!(
        session = %id,
        paper_id = session.paper_id(),
        questions = session.questions().len(),
        "Exam session started"
    );

    // A countdown that starts at zero never ticks to `Expired`
    if session.timer_state() == TimerState::Expired {
        tracing::info!(session = %id, "No time on the clock, auto-submitting");
        finish(&mut session, SubmitReason::TimeExpired, sink.as_ref(), &outcome_tx).await;
        return;
    }

    let mut ticker = time::interval_at(Instant::now() + tick_period, tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if session.tick() == Tick::Expired {
                    tracing::info!(session = %id, "Time expired, auto-submitting");
                    finish(&mut session, SubmitReason::TimeExpired, sink.as_ref(), &outcome_tx).await;
                    break;
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::info!(session = %id, "Exam session abandoned");
                    break;
                };
                if let Command::Submit(reply) = command {
                    let outcome =
                        finish(&mut session, SubmitReason::UserInitiated, sink.as_ref(), &outcome_tx).await;
                    let _ = reply.send(outcome);
                    break;
                }
                apply(&mut session, command);
            }
        }
    }
}

fn apply(session: &mut ExamSession, command: Command) {
    let (result, reply) = match command {
        Command::View(reply) => (Ok(()), reply),
        Command::Answer {
            question_id,
            value,
            reply,
        } => (session.set_answer(question_id, &value), reply),
        Command::ClearAnswer { question_id, reply } => (session.clear_answer(question_id), reply),
        Command::ToggleMark { question_id, reply } => (session.toggle_mark(question_id), reply),
        Command::Navigate { to, reply } => {
            let result = match to {
                Navigation::Next => session.go_next(),
                Navigation::Previous => session.go_previous(),
                Navigation::GoTo { question_id } => session.go_to(question_id),
            };
            (result, reply)
        }
        Command::Submit(_) => return,
    };
    let _ = reply.send(result.map(|()| session.view()));
}

async fn finish(
    session: &mut ExamSession,
    reason: SubmitReason,
    sink: &dyn ResultSink,
    outcome_tx: &watch::Sender<Option<SubmissionOutcome>>,
) -> Option<SubmissionOutcome> {
    let outcome = submission::submit(session, reason, sink).await?;
    outcome_tx.send_replace(Some(outcome.clone()));
    Some(outcome)
}
