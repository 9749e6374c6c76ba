use chrono::Utc;
use condense_core::{ContextSummary, Message, TimeRange};
use condense_telemetry::estimate_tokens;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::generator::TextGenerator;

pub const FALLBACK_TOPIC: &str = "general_conversation";
pub const FALLBACK_RELEVANCE: f64 = 0.3;

/// Relevance assumed when the reply omits its own estimate
const DEFAULT_REPLY_RELEVANCE: f64 = 0.5;

const DEFAULT_MAX_INPUT_CHARS: usize = 12_000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Structured content extracted from a generation reply
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSummary {
    pub summary: String,
    pub key_topics: Vec<String>,
    pub decisions: Vec<String>,
    pub relevance_score: f64,
}

/// Outcome of reading a generation reply
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryReply {
    Parsed(ParsedSummary),
    Unparseable(String),
}

#[derive(Deserialize)]
struct RawReply {
    #[serde(default)]
    summary: String,
    #[serde(default, alias = "topics")]
    key_topics: Vec<String>,
    #[serde(default, alias = "important_decisions")]
    decisions: Vec<String>,
    #[serde(default)]
    relevance_score: Option<f64>,
}

pub fn build_summary_prompt(messages: &[Message], max_chars: usize) -> String {
    let transcript = transcript(messages);
    let truncated = match transcript.char_indices().nth(max_chars) {
        Some((cut, _)) => &transcript[..cut],
        None => transcript.as_str(),
    };
    format!(
        "Summarize this conversation between a merchant and their assistant. Return only JSON with: \
         {{\"summary\": \"<2-3 sentence overview>\", \
         \"key_topics\": [\"topic\", ...], \
         \"decisions\": [\"decision or action taken\", ...], \
         \"relevance_score\": <0.0-1.0, how useful this is for future turns>}}\n\n{truncated}"
    )
}

fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read the outermost JSON object in `reply`, tolerating code fences and prose around it
pub fn parse_summary_reply(reply: &str) -> SummaryReply {
    let (Some(open), Some(close)) = (reply.find('{'), reply.rfind('}')) else {
        return SummaryReply::Unparseable("no JSON object in reply".to_string());
    };
    if close < open {
        return SummaryReply::Unparseable("no JSON object in reply".to_string());
    }

    let raw: RawReply = match serde_json::from_str(&reply[open..=close]) {
        Ok(raw) => raw,
        Err(e) => return SummaryReply::Unparseable(e.to_string()),
    };

    let summary = raw.summary.trim().to_string();
    if summary.is_empty() {
        return SummaryReply::Unparseable("reply has no summary text".to_string());
    }

    SummaryReply::Parsed(ParsedSummary {
        summary,
        key_topics: clean_list(raw.key_topics),
        decisions: clean_list(raw.decisions),
        relevance_score: raw
            .relevance_score
            .filter(|s| s.is_finite())
            .unwrap_or(DEFAULT_REPLY_RELEVANCE)
            .clamp(0.0, 1.0),
    })
}

/// Trimmed, non-empty, first occurrence wins
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Deterministic content used when generation is unavailable
pub fn fallback_summary(message_count: usize, range: TimeRange) -> ParsedSummary {
    ParsedSummary {
        summary: format!(
            "Conversation of {} messages between {} and {}",
            message_count,
            range.start.format("%Y-%m-%d %H:%M UTC"),
            range.end.format("%Y-%m-%d %H:%M UTC"),
        ),
        key_topics: vec![FALLBACK_TOPIC.to_string()],
        decisions: Vec::new(),
        relevance_score: FALLBACK_RELEVANCE,
    }
}

/// Turns a message group into a [`ContextSummary`], never failing on generator errors
#[derive(Clone)]
pub struct ContextSummarizer {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    max_input_chars: usize,
}

impl ContextSummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            timeout: DEFAULT_TIMEOUT,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Only an empty batch is an error
    pub async fn summarize(&self, messages: &[Message], range: TimeRange) -> Result<ContextSummary> {
        let first = messages.first().ok_or(Error::EmptyBatch)?;

        let parsed = match self.generate(messages).await {
            Ok(SummaryReply::Parsed(parsed)) => parsed,
            Ok(SummaryReply::Unparseable(reason)) => {
                tracing::warn!(thread = %first.thread_id, %reason, "unparseable summary reply, using fallback");
                fallback_summary(messages.len(), range)
            }
            Err(e) => {
                tracing::warn!(thread = %first.thread_id, error = %e, "summary generation failed, using fallback");
                fallback_summary(messages.len(), range)
            }
        };

        let source_tokens = messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        Ok(ContextSummary {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: first.user_id.clone(),
            thread_id: first.thread_id.clone(),
            range,
            compressed_tokens: estimate_tokens(&parsed.summary),
            summary: parsed.summary,
            key_topics: parsed.key_topics,
            important_decisions: parsed.decisions,
            relevance_score: parsed.relevance_score,
            message_count: messages.len(),
            source_tokens,
            created_at: Utc::now(),
        })
    }

    async fn generate(&self, messages: &[Message]) -> Result<SummaryReply> {
        let prompt = build_summary_prompt(messages, self.max_input_chars);
        let reply = tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;
        Ok(parse_summary_reply(&reply))
    }
}
