//! Smart context compressor: the engine's public entry point

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use condense_core::{
    estimate_context_tokens, uncovered_messages, CompressedContext, CompressionMetadata,
    CompressionOptions, ContextSummary, ConversationContext, GapPolicy, Message,
    RelevanceScorer, StoreSnapshot, TimeRange,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheKey, ContextCache, MemoryCache};
use crate::config::EngineConfig;
use crate::generator::TextGenerator;
use crate::store::ContextStore;
use crate::summarizer::ContextSummarizer;

/// Window the statistics look back over
const STATS_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub cache_size: usize,
    /// Summaries created in the last 24 hours
    pub total_summaries: usize,
    /// Mean `compressed_tokens / source_tokens` over those summaries
    pub avg_compression_ratio: f64,
}

/// Summaries produced by one gap-filling pass
#[derive(Debug, Default)]
struct GapFill {
    created: Vec<ContextSummary>,
    summarized_messages: usize,
}

/// Assembles token-budgeted conversation context.
///
/// Stateless between calls apart from the cache. Every data-layer failure
/// degrades to an empty component; the call itself cannot fail.
pub struct SmartContextCompressor {
    store: Arc<dyn ContextStore>,
    summarizer: ContextSummarizer,
    cache: Arc<dyn ContextCache>,
    scorer: RelevanceScorer,
    policy: GapPolicy,
    cache_ttl: Option<Duration>,
}

impl SmartContextCompressor {
    pub fn new(store: Arc<dyn ContextStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            store,
            summarizer: ContextSummarizer::new(generator),
            cache: Arc::new(MemoryCache::<CompressedContext>::new()),
            scorer: RelevanceScorer::new(),
            policy: GapPolicy::new(),
            cache_ttl: None,
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        store: Arc<dyn ContextStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let cache = MemoryCache::<CompressedContext>::with_ttl(config.cache_ttl())
            .with_max_entries(config.cache_max_entries);
        let summarizer = ContextSummarizer::new(generator)
            .with_timeout(config.summarizer_timeout())
            .with_max_input_chars(config.summarizer_max_input_chars);

        Self {
            store,
            summarizer,
            cache: Arc::new(cache),
            scorer: RelevanceScorer::new(),
            policy: GapPolicy::new(),
            cache_ttl: Some(config.cache_ttl()),
        }
    }

    /// Swap the cache, e.g. for one shared between processes
    pub fn with_cache(mut self, cache: Arc<dyn ContextCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_gap_policy(mut self, policy: GapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn get_compressed_context(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        options: &CompressionOptions,
    ) -> CompressedContext {
        let key = CacheKey::for_request(user_id, thread_id, session_id, options);
        if !options.force_refresh {
            if let Some(mut cached) = self.cache.get(&key).await {
                tracing::debug!(user_id, thread_id, "context cache hit");
                cached.metadata.cache_hit = true;
                return cached;
            }
        }

        let started = Instant::now();
        let now = Utc::now();
        let threshold = options.effective_threshold();

        // Phase 1: independent reads
        let (recent_messages, mut summaries, relevant_context, store_context) = tokio::join!(
            self.load_recent(user_id, thread_id, session_id, options, now),
            self.load_summaries(user_id, thread_id, threshold, options.max_summaries),
            self.load_contexts(user_id, session_id, threshold, options.max_context_items, now),
            self.load_snapshot(user_id, options.include_store_context),
        );

        // Phase 2: summarize aged, uncovered message groups
        let gap_fill = self
            .fill_gaps(
                user_id,
                thread_id,
                session_id,
                options.effective_time_range_hours(),
                now,
            )
            .await;

        // Phase 3: merge new summaries that clear the bar
        summaries.extend(
            gap_fill
                .created
                .iter()
                .filter(|s| s.relevance_score >= threshold)
                .cloned(),
        );
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        dedup_by_id(&mut summaries);
        summaries.truncate(options.max_summaries);

        // Phase 4: metadata and token budget
        let total_messages = recent_messages.len() + gap_fill.summarized_messages;
        let metadata = CompressionMetadata {
            level: options.level,
            total_messages,
            compressed_messages: gap_fill.summarized_messages,
            compression_ratio: gap_fill.summarized_messages as f64 / total_messages.max(1) as f64,
            processing_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            cache_hit: false,
            relevance_threshold: threshold,
        };
        let total_tokens_estimate =
            estimate_context_tokens(&recent_messages, &summaries, &relevant_context);

        let context = CompressedContext {
            recent_messages,
            summaries,
            relevant_context,
            store_context,
            metadata,
            total_tokens_estimate,
        };

        tracing::debug!(
            user_id,
            thread_id,
            tokens = context.total_tokens_estimate,
            summaries = context.summaries.len(),
            new_summaries = gap_fill.created.len(),
            "assembled compressed context"
        );

        self.cache.set(key, context.clone(), self.cache_ttl).await;
        context
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn get_compression_stats(&self) -> CompressionStats {
        let since = Utc::now() - ChronoDuration::hours(STATS_WINDOW_HOURS);
        let recent = self.store.summaries_since(since).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load summaries for stats");
            Vec::new()
        });

        let avg_compression_ratio = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(ContextSummary::compression_ratio).sum::<f64>() / recent.len() as f64
        };

        CompressionStats {
            cache_size: self.cache.size().await,
            total_summaries: recent.len(),
            avg_compression_ratio,
        }
    }

    async fn load_recent(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        options: &CompressionOptions,
        now: DateTime<Utc>,
    ) -> Vec<Message> {
        let limit = options.max_recent_messages;
        let mut messages = match self
            .store
            .recent_messages(user_id, thread_id, session_id, limit)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(user_id, thread_id, error = %e, "failed to load recent messages");
                return Vec::new();
            }
        };

        let intent = options.current_intent.as_deref();
        for message in &mut messages {
            message.relevance_score = Some(self.scorer.score_at(message, intent, None, now));
        }
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages.truncate(limit);
        messages
    }

    async fn load_summaries(
        &self,
        user_id: &str,
        thread_id: &str,
        threshold: f64,
        limit: usize,
    ) -> Vec<ContextSummary> {
        let mut summaries = match self
            .store
            .summaries(user_id, thread_id, threshold, limit)
            .await
        {
            Ok(summaries) => summaries,
            Err(e) => {
                tracing::warn!(user_id, thread_id, error = %e, "failed to load summaries");
                return Vec::new();
            }
        };

        summaries.retain(|s| s.relevance_score >= threshold);
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries.truncate(limit);
        summaries
    }

    async fn load_contexts(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        threshold: f64,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<ConversationContext> {
        let mut contexts = match self
            .store
            .relevant_contexts(user_id, session_id, threshold, now, limit)
            .await
        {
            Ok(contexts) => contexts,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "failed to load standing context");
                return Vec::new();
            }
        };

        contexts.retain(|c| c.relevance_score >= threshold && !c.is_expired(now));
        contexts.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        contexts.truncate(limit);
        contexts
    }

    async fn load_snapshot(&self, user_id: &str, enabled: bool) -> Option<StoreSnapshot> {
        if !enabled {
            return None;
        }
        match self.store.store_snapshot(user_id).await {
            Ok(snapshot) => snapshot.map(StoreSnapshot::retain_critical),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "failed to load store snapshot");
                None
            }
        }
    }

    async fn fill_gaps(
        &self,
        user_id: &str,
        thread_id: &str,
        session_id: Option<&str>,
        time_range_hours: i64,
        now: DateTime<Utc>,
    ) -> GapFill {
        let window = self.policy.lookback(now, time_range_hours);
        if window.start >= window.end {
            return GapFill::default();
        }

        let candidates = match self
            .store
            .messages_between(user_id, thread_id, session_id, window)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(user_id, thread_id, error = %e, "failed to load messages for gap-filling");
                return GapFill::default();
            }
        };
        if candidates.len() < self.policy.min_group_size {
            return GapFill::default();
        }

        // Without knowing what is covered, summarizing could duplicate work
        let covered = match self.store.summary_ranges(user_id, thread_id, window).await {
            Ok(covered) => covered,
            Err(e) => {
                tracing::warn!(user_id, thread_id, error = %e, "failed to load summary ranges, skipping gap-filling");
                return GapFill::default();
            }
        };

        let uncovered = uncovered_messages(&candidates, &covered);
        let mut fill = GapFill::default();

        for group in self.policy.select_groups(&uncovered) {
            let Some(range) = TimeRange::covering(&group) else {
                continue;
            };
            let summary = match self.summarizer.summarize(&group, range).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(thread_id, error = %e, "skipping message group");
                    continue;
                }
            };

            if let Err(e) = self.store.insert_summary(&summary).await {
                tracing::warn!(
                    thread_id,
                    summary_id = %summary.id,
                    error = %e,
                    "failed to persist summary, returning it unsaved"
                );
            }

            tracing::info!(
                thread_id,
                messages = summary.message_count,
                relevance = summary.relevance_score,
                "created context summary"
            );
            fill.summarized_messages += group.len();
            fill.created.push(summary);
        }
        fill
    }
}

/// Keeps the first occurrence of each id
fn dedup_by_id(summaries: &mut Vec<ContextSummary>) {
    let mut seen = std::collections::HashSet::new();
    summaries.retain(|s| seen.insert(s.id.clone()));
}
