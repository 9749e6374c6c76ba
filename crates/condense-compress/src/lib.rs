//! Context compression engine: caching, LLM-based summarization and context assembly

mod cache;
mod config;
mod engine;
mod error;
mod generator;
mod storage;
mod store;
mod summarizer;

pub use cache::{CacheKey, ContextCache, MemoryCache, DEFAULT_TTL};
pub use config::EngineConfig;
pub use engine::{CompressionStats, SmartContextCompressor};
pub use error::{Error, Result};
pub use generator::{AnthropicGenerator, TextGenerator, UnavailableGenerator};
pub use storage::SqliteStore;
pub use store::ContextStore;
pub use summarizer::{
    build_summary_prompt, fallback_summary, parse_summary_reply, ContextSummarizer,
    ParsedSummary, SummaryReply, FALLBACK_RELEVANCE, FALLBACK_TOPIC,
};
