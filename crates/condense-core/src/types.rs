//! Core types for context compression

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CompressionLevel;

/// Metrics a store snapshot may carry; anything else is dropped on read
pub const CRITICAL_METRICS: &[&str] = &[
    "total_revenue",
    "order_count",
    "product_count",
    "customer_count",
    "currency",
];

/// Speaker of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A single chat turn. Written by the chat pipeline, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user_id: String,
    pub thread_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Filled in by the scorer on the way out, never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed: Option<bool>,
}

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Smallest range covering every message in `messages`
    pub fn covering(messages: &[Message]) -> Option<Self> {
        let start = messages.iter().map(|m| m.timestamp).min()?;
        let last = messages.iter().map(|m| m.timestamp).max()?;
        Some(Self::new(start, last + chrono::Duration::milliseconds(1)))
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Compressed account of one contiguous message group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub id: String,
    pub user_id: String,
    pub thread_id: String,
    pub range: TimeRange,
    pub summary: String,
    pub key_topics: Vec<String>,
    pub important_decisions: Vec<String>,
    pub relevance_score: f64,
    pub message_count: usize,
    /// Estimated tokens of the summary text
    pub compressed_tokens: usize,
    /// Estimated tokens of the messages it replaces
    #[serde(default)]
    pub source_tokens: usize,
    pub created_at: DateTime<Utc>,
}

impl ContextSummary {
    /// `compressed_tokens / source_tokens`, lower is better
    pub fn compression_ratio(&self) -> f64 {
        self.compressed_tokens as f64 / self.source_tokens.max(1) as f64
    }
}

/// Standing fact about a user or session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub context_type: String,
    pub payload: serde_json::Value,
    pub relevance_score: f64,
    #[serde(default)]
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ConversationContext {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Identity plus allow-listed metrics of the user's business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub user_id: String,
    pub store_name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, serde_json::Value>,
}

impl StoreSnapshot {
    /// Drop every metric not in [`CRITICAL_METRICS`]
    pub fn retain_critical(mut self) -> Self {
        self.metrics
            .retain(|name, _| CRITICAL_METRICS.contains(&name.as_str()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetadata {
    pub level: CompressionLevel,
    pub total_messages: usize,
    pub compressed_messages: usize,
    pub compression_ratio: f64,
    pub processing_time_ms: u64,
    pub cache_hit: bool,
    pub relevance_threshold: f64,
}

/// Everything handed to the downstream generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedContext {
    /// Newest first, each scored
    pub recent_messages: Vec<Message>,
    /// Newest created first
    pub summaries: Vec<ContextSummary>,
    /// Highest score first
    pub relevant_context: Vec<ConversationContext>,
    pub store_context: Option<StoreSnapshot>,
    pub metadata: CompressionMetadata,
    pub total_tokens_estimate: usize,
}

impl CompressedContext {
    /// Nothing to hand downstream
    pub fn is_empty(&self) -> bool {
        self.recent_messages.is_empty()
            && self.summaries.is_empty()
            && self.relevant_context.is_empty()
            && self.store_context.is_none()
    }
}
