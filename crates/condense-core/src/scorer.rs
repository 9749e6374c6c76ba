//! Four-signal message relevance scorer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Message, Role};

const RECENCY_WEIGHT: f64 = 0.30;
const TOPIC_WEIGHT: f64 = 0.25;
const ROLE_WEIGHT: f64 = 0.25;
const DECISION_WEIGHT: f64 = 0.20;

/// Age at which recency reaches zero
const RECENCY_HORIZON_HOURS: f64 = 168.0;

const USER_ROLE_PRIOR: f64 = 0.8;
const ASSISTANT_ROLE_PRIOR: f64 = 0.6;

const DECISION_STEP: f64 = 0.1;

/// Words that mark a turn as recording an outcome
const DECISION_VOCABULARY: &[&str] = &[
    "decided",
    "confirmed",
    "created",
    "updated",
    "agreed",
    "approved",
    "chose",
    "selected",
    "completed",
    "scheduled",
    "cancelled",
    "ordered",
    "purchased",
    "launched",
];

/// Extra hints about what the user cares about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Added to the intent keywords when an intent is present
    #[serde(default)]
    pub focus_keywords: Vec<String>,
}

/// Per-signal values, each already in [0, 1] and unweighted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub recency: f64,
    pub topic: f64,
    pub role: f64,
    pub decision: f64,
}

impl ScoreBreakdown {
    pub fn weighted(&self) -> f64 {
        let total = self.recency * RECENCY_WEIGHT
            + self.topic * TOPIC_WEIGHT
            + self.role * ROLE_WEIGHT
            + self.decision * DECISION_WEIGHT;
        total.clamp(0.0, 1.0)
    }
}

/// Stateless scorer; cheap to copy and safe to share across tasks
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceScorer;

impl RelevanceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score against the wall clock
    pub fn score(
        &self,
        message: &Message,
        intent: Option<&str>,
        preferences: Option<&UserPreferences>,
    ) -> f64 {
        self.score_at(message, intent, preferences, Utc::now())
    }

    pub fn score_at(
        &self,
        message: &Message,
        intent: Option<&str>,
        preferences: Option<&UserPreferences>,
        now: DateTime<Utc>,
    ) -> f64 {
        self.breakdown_at(message, intent, preferences, now)
            .weighted()
    }

    pub fn breakdown_at(
        &self,
        message: &Message,
        intent: Option<&str>,
        preferences: Option<&UserPreferences>,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let content = message.content.to_lowercase();
        ScoreBreakdown {
            recency: recency(message.timestamp, now),
            topic: topic_match(&content, intent, preferences),
            role: match message.role {
                Role::User => USER_ROLE_PRIOR,
                Role::Assistant => ASSISTANT_ROLE_PRIOR,
            },
            decision: decision_language(&content),
        }
    }
}

fn recency(at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = (now - at).num_milliseconds() as f64 / 3_600_000.0;
    (1.0 - age_hours / RECENCY_HORIZON_HOURS).clamp(0.0, 1.0)
}

fn topic_match(
    content: &str,
    intent: Option<&str>,
    preferences: Option<&UserPreferences>,
) -> f64 {
    let Some(intent) = intent else {
        return 0.0;
    };

    let mut keywords: Vec<String> = split_keywords(intent);
    if let Some(prefs) = preferences {
        for keyword in &prefs.focus_keywords {
            keywords.extend(split_keywords(keyword));
        }
    }
    keywords.sort();
    keywords.dedup();

    if keywords.is_empty() {
        return 0.0;
    }

    let hits = keywords
        .iter()
        .filter(|k| content.contains(k.as_str()))
        .count();
    (hits as f64 / keywords.len() as f64).clamp(0.0, 1.0)
}

fn split_keywords(text: &str) -> Vec<String> {
    text.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whole-word matches; `content` must already be lowercase
fn decision_language(content: &str) -> f64 {
    let matches = content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| DECISION_VOCABULARY.contains(word))
        .count();
    (matches as f64 * DECISION_STEP).min(1.0)
}
