// src/exam/registry.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::exam::runner::SessionHandle;

/// Table of live (and recently finished) sessions, keyed by session id.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    /// How long a finished session's outcome stays retrievable.
    retention: Duration,
}

impl SessionRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    pub async fn insert(&self, handle: SessionHandle) {
        self.prune().await;
        self.sessions.write().await.insert(handle.id(), handle);
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Looks up a session owned by `user_id`; other users' sessions are invisible.
    pub async fn get_owned(&self, id: Uuid, user_id: i64) -> Option<SessionHandle> {
        self.get(id).await.filter(|h| h.user_id() == user_id)
    }

    /// Drops the registry's handle. An unfinished session is abandoned once
    /// no other handle is alive.
    pub async fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&id)
    }

    /// Forgets finished sessions older than the retention window.
    pub async fn prune(&self) {
        let retention = chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.outcome() {
            Some(outcome) => now - outcome.result.completed_at < retention,
            None => true,
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} finished sessions", pruned);
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(900))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::runner::{self, TICK_PERIOD};
    use crate::exam::session::ExamSession;
    use crate::exam::submission::{ResultSink, ResultSnapshot, SinkError};
    use crate::models::question::{Question, QuestionType};
    use async_trait::async_trait;
    use sqlx::types::Json;

    struct NullSink;

    #[async_trait]
    impl ResultSink for NullSink {
        async fn persist(&self, _snapshot: &ResultSnapshot) -> Result<i64, SinkError> {
            Ok(1)
        }
    }

    fn spawn(user_id: i64) -> SessionHandle {
        let question = Question {
            id: 1,
            paper_id: 3,
            position: 1,
            question_type: QuestionType::Numeric,
            subject: "Mathematics".to_string(),
            text: Some("1 + 1".to_string()),
            image_url: None,
            options: Json(Vec::new()),
            correct_option: "2".to_string(),
        };
        let session = ExamSession::new(3, user_id, vec![question], 10_800).unwrap();
        runner::spawn(session, Arc::new(NullSink), TICK_PERIOD)
    }

    #[tokio::test]
    async fn sessions_are_only_visible_to_their_owner() {
        let registry = SessionRegistry::default();
        let handle = spawn(5);
        registry.insert(handle.clone()).await;

        assert!(registry.get_owned(handle.id(), 5).await.is_some());
        assert!(registry.get_owned(handle.id(), 6).await.is_none());
        assert!(registry.get_owned(Uuid::new_v4(), 5).await.is_none());
    }

    #[tokio::test]
    async fn prune_drops_expired_outcomes_and_keeps_live_sessions() {
        let registry = SessionRegistry::new(Duration::ZERO);
        let live = spawn(5);
        let done = spawn(5);
        registry.insert(live.clone()).await;
        registry.insert(done.clone()).await;

        done.submit().await.unwrap();
        registry.prune().await;

        assert!(registry.get(done.id()).await.is_none());
        assert!(registry.get(live.id()).await.is_some());
    }

    #[tokio::test]
    async fn prune_keeps_outcomes_inside_the_retention_window() {
        let registry = SessionRegistry::default();
        let done = spawn(5);
        registry.insert(done.clone()).await;

        done.submit().await.unwrap();
        registry.prune().await;

        let kept = registry.get(done.id()).await.unwrap();
        assert!(kept.outcome().is_some());
    }
}
