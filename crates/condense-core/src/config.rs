//! Compression levels and per-call options

use serde::{Deserialize, Serialize};

/// Named preset for how much context to keep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionLevel {
    #[serde(rename = "MINIMAL")]
    Minimal,
    #[default]
    #[serde(rename = "BALANCED")]
    Balanced,
    #[serde(rename = "COMPREHENSIVE")]
    Comprehensive,
}

impl CompressionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionLevel::Minimal => "MINIMAL",
            CompressionLevel::Balanced => "BALANCED",
            CompressionLevel::Comprehensive => "COMPREHENSIVE",
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(CompressionLevel::Minimal),
            "balanced" => Ok(CompressionLevel::Balanced),
            "comprehensive" => Ok(CompressionLevel::Comprehensive),
            other => Err(format!("unknown compression level: {other}")),
        }
    }
}

/// Longest gap-filling lookback honored, about a century
pub const MAX_TIME_RANGE_HOURS: i64 = 24 * 365 * 100;

/// Options for one compression call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// Informational tag propagated into metadata
    pub level: CompressionLevel,

    /// Newest messages returned verbatim
    pub max_recent_messages: usize,

    /// Summaries returned
    pub max_summaries: usize,

    /// Standing facts returned
    pub max_context_items: usize,

    /// Minimum score for summaries and standing facts
    pub relevance_threshold: f64,

    /// How far back gap-filling looks for unsummarized messages
    pub time_range_hours: i64,

    /// Load the business snapshot
    pub include_store_context: bool,

    /// Skip the cache read (the result is still cached)
    pub force_refresh: bool,

    /// What the user is trying to do right now, e.g. `update_product_prices`
    pub current_intent: Option<String>,
}

impl CompressionOptions {
    pub fn new() -> Self {
        Self::for_level(CompressionLevel::Balanced)
    }

    pub fn for_level(level: CompressionLevel) -> Self {
        let (recent, summaries, items, threshold, hours, store) = match level {
            CompressionLevel::Minimal => (5, 2, 3, 0.7, 24, false),
            CompressionLevel::Balanced => (10, 5, 8, 0.5, 72, true),
            CompressionLevel::Comprehensive => (20, 10, 15, 0.3, 168, true),
        };

        Self {
            level,
            max_recent_messages: recent,
            max_summaries: summaries,
            max_context_items: items,
            relevance_threshold: threshold,
            time_range_hours: hours,
            include_store_context: store,
            force_refresh: false,
            current_intent: None,
        }
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.current_intent = Some(intent.into());
        self
    }

    /// Lookback clamped into [0, MAX_TIME_RANGE_HOURS]
    pub fn effective_time_range_hours(&self) -> i64 {
        self.time_range_hours.clamp(0, MAX_TIME_RANGE_HOURS)
    }

    /// Threshold clamped into [0, 1]; NaN counts as 0
    pub fn effective_threshold(&self) -> f64 {
        if self.relevance_threshold.is_nan() {
            0.0
        } else {
            self.relevance_threshold.clamp(0.0, 1.0)
        }
    }
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self::new()
    }
}
