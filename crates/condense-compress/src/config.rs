use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Engine settings, loaded from `config.json` in the data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Overrides the default database location
    pub database_path: Option<PathBuf>,

    /// Lifetime of an assembled context in the cache
    pub cache_ttl_secs: u64,

    /// Entries kept before the cache starts evicting
    pub cache_max_entries: usize,

    /// Bound on one summary generation call
    pub summarizer_timeout_secs: u64,

    /// Transcript characters sent per summary
    pub summarizer_max_input_chars: usize,

    pub model: String,
    pub max_tokens: u32,
    pub api_base_url: String,

    /// Falls back to `ANTHROPIC_API_KEY`
    pub api_key: Option<String>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            database_path: None,
            cache_ttl_secs: 300,
            cache_max_entries: 1_000,
            summarizer_timeout_secs: 10,
            summarizer_max_input_chars: 12_000,
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 1024,
            api_base_url: "https://api.anthropic.com".to_string(),
            api_key: None,
        }
    }

    /// Missing file means defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        condense_telemetry::atomic_write(path, json.as_bytes())?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn summarizer_timeout(&self) -> Duration {
        Duration::from_secs(self.summarizer_timeout_secs)
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
