//! Telemetry record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One compression call as seen from the outside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionRecord {
    pub user_id: String,
    pub thread_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub total_messages: usize,
    pub compressed_messages: usize,
    pub compression_ratio: f64,
    pub tokens_estimate: usize,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub cache_hit: bool,
    #[serde(default)]
    pub summaries_returned: usize,
    #[serde(default)]
    pub contexts_returned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CompressionRecord {
        CompressionRecord {
            user_id: "u1".to_string(),
            thread_id: "t1".to_string(),
            session_id: Some("s1".to_string()),
            timestamp: Utc::now(),
            level: "balanced".to_string(),
            total_messages: 14,
            compressed_messages: 4,
            compression_ratio: 4.0 / 14.0,
            tokens_estimate: 812,
            processing_time_ms: 37,
            cache_hit: false,
            summaries_returned: 1,
            contexts_returned: 3,
        }
    }

    #[test]
    fn test_record_json_shape() {
        let record = sample_record();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["level"], "balanced");
        assert_eq!(value["tokens_estimate"], 812);
    }

    #[test]
    fn test_record_backwards_compatible() {
        let old_json = r#"{"user_id":"u","thread_id":"t","timestamp":"2025-01-01T00:00:00Z","level":"minimal","total_messages":5,"compressed_messages":0,"compression_ratio":0.0,"tokens_estimate":10,"processing_time_ms":2}"#;
        let parsed: CompressionRecord = serde_json::from_str(old_json).unwrap();
        assert_eq!(parsed.session_id, None);
        assert!(!parsed.cache_hit);
        assert_eq!(parsed.summaries_returned, 0);
        assert_eq!(parsed.contexts_returned, 0);
    }
}
