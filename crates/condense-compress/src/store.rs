//! Persistent store collaborator

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use condense_core::{ContextSummary, ConversationContext, Message, StoreSnapshot, TimeRange};

use crate::error::Result;

/// Key/range queries the engine needs from the persistent store.
///
/// Unknown or empty ids are not errors: they simply match nothing.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Newest non-archived messages of a thread, newest first
    async fn recent_messages(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>>;

    /// Non-archived messages with `start <= timestamp < end`, oldest first
    async fn messages_between(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        range: TimeRange,
    ) -> Result<Vec<Message>>;

    /// Summaries scoring at least `min_score`, newest created first
    async fn summaries(
        &self,
        user_id: &str,
        thread_id: &str,
        min_score: f64,
        limit: usize,
    ) -> Result<Vec<ContextSummary>>;

    /// Ranges of every summary overlapping `window`, regardless of score
    async fn summary_ranges(
        &self,
        user_id: &str,
        thread_id: &str,
        window: TimeRange,
    ) -> Result<Vec<TimeRange>>;

    /// Unexpired standing facts scoring at least `min_score`, highest first.
    ///
    /// With a session, facts bound to that session and session-less facts
    /// both match.
    async fn relevant_contexts(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        min_score: f64,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ConversationContext>>;

    /// Identity plus allow-listed metrics, if the user has a store
    async fn store_snapshot(&self, user_id: &str) -> Result<Option<StoreSnapshot>>;

    /// Safe to retry: inserting an id that already exists is a no-op
    async fn insert_summary(&self, summary: &ContextSummary) -> Result<()>;

    /// Summaries created at or after `since`, any user
    async fn summaries_since(&self, since: DateTime<Utc>) -> Result<Vec<ContextSummary>>;
}
