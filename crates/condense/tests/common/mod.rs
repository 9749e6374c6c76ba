#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use condense_compress::{ContextStore, Error, Result, SqliteStore, TextGenerator};
use condense_core::{
    ContextSummary, ConversationContext, Message, Role, StoreSnapshot, TimeRange,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const USER: &str = "u1";
pub const THREAD: &str = "t1";

pub fn message(id: &str, role: Role, content: &str, hours_ago: i64) -> Message {
    message_at(id, role, content, Utc::now() - Duration::hours(hours_ago))
}

pub fn message_at(id: &str, role: Role, content: &str, timestamp: DateTime<Utc>) -> Message {
    Message {
        id: id.to_string(),
        user_id: USER.to_string(),
        thread_id: THREAD.to_string(),
        session_id: None,
        role,
        content: content.to_string(),
        timestamp,
        relevance_score: None,
        compressed: None,
    }
}

pub fn fact(id: &str, relevance_score: f64) -> ConversationContext {
    ConversationContext {
        id: id.to_string(),
        user_id: USER.to_string(),
        session_id: None,
        context_type: "preference".to_string(),
        payload: serde_json::json!({ "fact": id }),
        relevance_score,
        priority: 0,
        created_at: Utc::now() - Duration::hours(1),
        expires_at: None,
    }
}

pub fn snapshot() -> StoreSnapshot {
    let mut metrics = BTreeMap::new();
    metrics.insert("total_revenue".to_string(), serde_json::json!(1250.5));
    metrics.insert("order_count".to_string(), serde_json::json!(42));
    metrics.insert("conversion_funnel".to_string(), serde_json::json!([1, 2, 3]));
    StoreSnapshot {
        user_id: USER.to_string(),
        store_name: "Acme Outfitters".to_string(),
        domain: Some("acme.example".to_string()),
        metrics,
    }
}

/// In-memory store pre-loaded with messages at the given ages in hours
pub fn store_with_ages(ages: &[i64]) -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().unwrap();
    for (i, hours) in ages.iter().enumerate() {
        let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
        let content = format!("message {i} about the spring catalog");
        store
            .insert_message(&message(&format!("m{i:02}"), role, &content, *hours))
            .unwrap();
    }
    Arc::new(store)
}

/// Returns a fixed reply and counts calls
pub struct ScriptedGenerator {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_relevance(relevance: f64) -> Self {
        Self::new(
            serde_json::json!({
                "summary": "Discussed spring catalog pricing",
                "key_topics": ["pricing", "catalog"],
                "decisions": ["Launch on Monday"],
                "relevance_score": relevance,
            })
            .to_string(),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Every read and write fails
pub struct BrokenStore;

fn broken() -> Error {
    Error::InvalidData("store offline".to_string())
}

#[async_trait]
impl ContextStore for BrokenStore {
    async fn recent_messages(
        &self,
        _user_id: &str,
        _thread_id: &str,
        _session_id: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<Message>> {
        Err(broken())
    }

    async fn messages_between(
        &self,
        _user_id: &str,
        _thread_id: &str,
        _session_id: Option<&str>,
        _range: TimeRange,
    ) -> Result<Vec<Message>> {
        Err(broken())
    }

    async fn summaries(
        &self,
        _user_id: &str,
        _thread_id: &str,
        _min_score: f64,
        _limit: usize,
    ) -> Result<Vec<ContextSummary>> {
        Err(broken())
    }

    async fn summary_ranges(
        &self,
        _user_id: &str,
        _thread_id: &str,
        _window: TimeRange,
    ) -> Result<Vec<TimeRange>> {
        Err(broken())
    }

    async fn relevant_contexts(
        &self,
        _user_id: &str,
        _session_id: Option<&str>,
        _min_score: f64,
        _now: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<ConversationContext>> {
        Err(broken())
    }

    async fn store_snapshot(&self, _user_id: &str) -> Result<Option<StoreSnapshot>> {
        Err(broken())
    }

    async fn insert_summary(&self, _summary: &ContextSummary) -> Result<()> {
        Err(broken())
    }

    async fn summaries_since(&self, _since: DateTime<Utc>) -> Result<Vec<ContextSummary>> {
        Err(broken())
    }
}

/// Delegates reads to a real store but rejects summary writes
pub struct ReadOnlyStore {
    pub inner: Arc<SqliteStore>,
}

#[async_trait]
impl ContextStore for ReadOnlyStore {
    async fn recent_messages(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        self.inner
            .recent_messages(user_id, thread_id, session_id, limit)
            .await
    }

    async fn messages_between(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        range: TimeRange,
    ) -> Result<Vec<Message>> {
        self.inner
            .messages_between(user_id, thread_id, session_id, range)
            .await
    }

    async fn summaries(
        &self,
        user_id: &str,
        thread_id: &str,
        min_score: f64,
        limit: usize,
    ) -> Result<Vec<ContextSummary>> {
        self.inner
            .summaries(user_id, thread_id, min_score, limit)
            .await
    }

    async fn summary_ranges(
        &self,
        user_id: &str,
        thread_id: &str,
        window: TimeRange,
    ) -> Result<Vec<TimeRange>> {
        self.inner.summary_ranges(user_id, thread_id, window).await
    }

    async fn relevant_contexts(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        min_score: f64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ConversationContext>> {
        self.inner
            .relevant_contexts(user_id, session_id, min_score, now, limit)
            .await
    }

    async fn store_snapshot(&self, user_id: &str) -> Result<Option<StoreSnapshot>> {
        self.inner.store_snapshot(user_id).await
    }

    async fn insert_summary(&self, _summary: &ContextSummary) -> Result<()> {
        Err(Error::InvalidData("read-only".to_string()))
    }

    async fn summaries_since(&self, since: DateTime<Utc>) -> Result<Vec<ContextSummary>> {
        self.inner.summaries_since(since).await
    }
}

/// Each of the four per-request reads takes `delay`; everything else is instant
pub struct SlowStore {
    pub delay: std::time::Duration,
}

#[async_trait]
impl ContextStore for SlowStore {
    async fn recent_messages(
        &self,
        _user_id: &str,
        _thread_id: &str,
        _session_id: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<Message>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn messages_between(
        &self,
        _user_id: &str,
        _thread_id: &str,
        _session_id: Option<&str>,
        _range: TimeRange,
    ) -> Result<Vec<Message>> {
        Ok(Vec::new())
    }

    async fn summaries(
        &self,
        _user_id: &str,
        _thread_id: &str,
        _min_score: f64,
        _limit: usize,
    ) -> Result<Vec<ContextSummary>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn summary_ranges(
        &self,
        _user_id: &str,
        _thread_id: &str,
        _window: TimeRange,
    ) -> Result<Vec<TimeRange>> {
        Ok(Vec::new())
    }

    async fn relevant_contexts(
        &self,
        _user_id: &str,
        _session_id: Option<&str>,
        _min_score: f64,
        _now: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<ConversationContext>> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn store_snapshot(&self, _user_id: &str) -> Result<Option<StoreSnapshot>> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn insert_summary(&self, _summary: &ContextSummary) -> Result<()> {
        Ok(())
    }

    async fn summaries_since(&self, _since: DateTime<Utc>) -> Result<Vec<ContextSummary>> {
        Ok(Vec::new())
    }
}
