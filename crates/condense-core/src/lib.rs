//! Data model, relevance scoring and windowing for conversational context compression

mod budget;
mod config;
mod scorer;
mod types;
mod window;

pub use budget::{context_chars, estimate_context_tokens};
pub use config::{CompressionLevel, CompressionOptions, MAX_TIME_RANGE_HOURS};
pub use scorer::{RelevanceScorer, ScoreBreakdown, UserPreferences};
pub use types::{
    CompressedContext, CompressionMetadata, ContextSummary, ConversationContext, Message, Role,
    StoreSnapshot, TimeRange, CRITICAL_METRICS,
};
pub use window::{partition_by_gap, uncovered_messages, GapPolicy};
