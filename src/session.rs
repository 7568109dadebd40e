//! In-memory conversation sessions.
//!
//! Each session is grounded in one summary and keeps an append-only history of
//! question/answer exchanges. Sessions live for the lifetime of the store.

use crate::providers::{Message, ModelHandle, ProviderError};
use crate::summary::StructuredSummary;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_MEMORY_WINDOW: usize = 3;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Model(#[from] ProviderError),
}

/// One question and the model's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// Conversation state grounded in a summarized page
#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub url: String,
    pub result: StructuredSummary,
    /// Synthetic context turn stating the URL and summary
    pub seed: Message,
    pub history: Vec<Exchange>,
    pub created_at: DateTime<Utc>,
    /// Creation order within the store
    seq: u64,
    model: ModelHandle,
}

impl Session {
    /// Messages sent to the model for a new question
    fn context(&self, system_prompt: &str, window: usize, question: &str) -> Vec<Message> {
        let recent = &self.history[self.history.len().saturating_sub(window)..];
        let mut messages = Vec::with_capacity(3 + recent.len() * 2);
        messages.push(Message::system(system_prompt));
        messages.push(self.seed.clone());
        for exchange in recent {
            messages.push(Message::user(&exchange.question));
            messages.push(Message::assistant(&exchange.answer));
        }
        messages.push(Message::user(question));
        messages
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("topic", &self.result.topic)
            .field("history", &self.history.len())
            .field("provider", &self.model.provider())
            .field("model", &self.model.model())
            .finish()
    }
}

/// Seed turn that grounds follow-up questions in the summary
pub fn seed_message(url: &str, summary: &str) -> Message {
    Message::system(format!(
        "I summarized the webpage at {url}. Here's the summary: {summary}"
    ))
}

/// Process-wide session map
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    system_prompt: String,
    window: usize,
    max_sessions: Option<usize>,
    next_seq: AtomicU64,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            sessions: DashMap::new(),
            system_prompt: system_prompt.into(),
            window: DEFAULT_MEMORY_WINDOW,
            max_sessions: None,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Number of past exchanges sent with each question
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Evict the oldest session once this many are live
    pub fn with_max_sessions(mut self, max_sessions: Option<usize>) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// Register a new session and return its identifier
    pub fn create(&self, result: StructuredSummary, url: &str, model: ModelHandle) -> String {
        if let Some(max) = self.max_sessions {
            while self.sessions.len() >= max.max(1) {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = Session {
            id: id.clone(),
            url: url.to_string(),
            seed: seed_message(url, &result.summary),
            result,
            history: Vec::new(),
            created_at: Utc::now(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            model,
        };
        self.sessions.insert(id.clone(), session);
        tracing::info!(session_id = %id, url, "created session");
        id
    }

    /// Ask a follow-up question and record the exchange.
    ///
    /// No lock is held while the model runs; concurrent questions on one session are
    /// both recorded, in completion order.
    pub async fn append(&self, id: &str, question: &str) -> Result<String, SessionError> {
        let (model, messages) = {
            let session = self
                .sessions
                .get(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            (
                session.model.clone(),
                session.context(&self.system_prompt, self.window, question),
            )
        };

        let answer = model.invoke(&messages).await?;

        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.history.push(Exchange {
            question: question.to_string(),
            answer: answer.clone(),
        });
        tracing::info!(session_id = %id, exchanges = session.history.len(), "appended exchange");
        Ok(answer)
    }

    /// Snapshot of a session
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|s| s.clone())
    }

    /// Exchanges recorded so far
    pub fn history(&self, id: &str) -> Result<Vec<Exchange>, SessionError> {
        self.sessions
            .get(id)
            .map(|s| s.history.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.seq)
            .map(|entry| entry.key().clone());
        match oldest {
            Some(id) => {
                self.sessions.remove(&id);
                tracing::info!(session_id = %id, "evicted oldest session");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatModel, ProviderKind, Role};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Answers with a counter and records what it was sent
    #[derive(Default)]
    struct EchoModel {
        calls: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn invoke(&self, messages: &[Message]) -> Result<String, ProviderError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(messages.to_vec());
            Ok(format!("answer {}", calls.len()))
        }

        fn provider(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn invoke(&self, _messages: &[Message]) -> Result<String, ProviderError> {
            Err(ProviderError::InvalidResponse("boom".to_string()))
        }

        fn provider(&self) -> ProviderKind {
            ProviderKind::Anthropic
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    fn result() -> StructuredSummary {
        StructuredSummary::new("Test Topic", "A summary of the page.")
    }

    #[tokio::test]
    async fn session_round_trip() {
        let store = SessionStore::new("You answer questions.");
        let model = Arc::new(EchoModel::default());
        let id = store.create(result(), "https://example.com/a", model.clone());

        let session = store.get(&id).unwrap();
        assert_eq!(session.seed.role, Role::System);
        assert!(session.seed.content.contains("https://example.com/a"));
        assert!(session.seed.content.contains("A summary of the page."));
        assert!(session.history.is_empty());

        let answer = store.append(&id, "What is it about?").await.unwrap();
        assert_eq!(answer, "answer 1");
        let history = store.history(&id).unwrap();
        assert_eq!(
            history,
            vec![Exchange {
                question: "What is it about?".to_string(),
                answer: "answer 1".to_string(),
            }]
        );

        let sent = &model.calls.lock().unwrap()[0];
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].content, "You answer questions.");
        assert_eq!(sent[1], session.seed);
        assert_eq!(sent[2], Message::user("What is it about?"));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = SessionStore::new("prompt");
        assert!(matches!(
            store.append("missing", "hello?").await,
            Err(SessionError::NotFound(id)) if id == "missing"
        ));
        assert!(matches!(store.history("missing"), Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn context_is_bounded_by_window() {
        let store = SessionStore::new("prompt").with_window(2);
        let model = Arc::new(EchoModel::default());
        let id = store.create(result(), "https://example.com", model.clone());

        for i in 1..=4 {
            store.append(&id, &format!("question {i}")).await.unwrap();
        }
        assert_eq!(store.history(&id).unwrap().len(), 4);

        let calls = model.calls.lock().unwrap();
        let last = calls.last().unwrap();
        // system prompt, seed, two remembered exchanges, new question
        assert_eq!(last.len(), 2 + 2 * 2 + 1);
        assert_eq!(last[2], Message::user("question 2"));
        assert_eq!(last[6], Message::user("question 4"));
    }

    #[tokio::test]
    async fn model_failure_leaves_history_untouched() {
        let store = SessionStore::new("prompt");
        let id = store.create(result(), "https://example.com", Arc::new(FailingModel));
        assert!(matches!(
            store.append(&id, "anything").await,
            Err(SessionError::Model(_))
        ));
        assert!(store.history(&id).unwrap().is_empty());
    }

    #[test]
    fn identifiers_are_unique() {
        let store = SessionStore::new("prompt");
        let model: ModelHandle = Arc::new(EchoModel::default());
        let a = store.create(result(), "https://example.com", model.clone());
        let b = store.create(result(), "https://example.com", model);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn capacity_bound_evicts_oldest() {
        let store = SessionStore::new("prompt").with_max_sessions(Some(2));
        let model: ModelHandle = Arc::new(EchoModel::default());
        let first = store.create(result(), "https://example.com/1", model.clone());
        let second = store.create(result(), "https://example.com/2", model.clone());
        let third = store.create(result(), "https://example.com/3", model.clone());

        assert_eq!(store.len(), 2);
        assert!(!store.contains(&first));
        assert!(store.contains(&second));
        assert!(store.contains(&third));

        let fourth = store.create(result(), "https://example.com/4", model);
        assert_eq!(store.len(), 2);
        assert!(!store.contains(&second));
        assert!(store.contains(&fourth));
    }
}
