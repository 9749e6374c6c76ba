pub mod context;
pub mod history;
pub mod ingest;
pub mod init;
pub mod stats;
pub mod version;

use condense_compress::{
    AnthropicGenerator, EngineConfig, SmartContextCompressor, SqliteStore, TextGenerator,
    UnavailableGenerator,
};
use condense_telemetry::Paths;
use std::sync::Arc;

/// Config from the data directory, with defaults when absent
pub fn load_config(paths: &Paths) -> anyhow::Result<EngineConfig> {
    EngineConfig::load(&paths.config_path())
}

pub fn open_store(paths: &Paths, config: &EngineConfig) -> anyhow::Result<SqliteStore> {
    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| paths.database_path());
    Ok(SqliteStore::open(&db_path)?)
}

pub fn build_compressor(config: &EngineConfig, store: Arc<SqliteStore>) -> SmartContextCompressor {
    let generator: Arc<dyn TextGenerator> = match AnthropicGenerator::from_config(config) {
        Some(generator) => Arc::new(generator),
        None => {
            tracing::warn!("no API key configured, summaries will use the fallback template");
            Arc::new(UnavailableGenerator)
        }
    };
    SmartContextCompressor::from_config(config, store, generator)
}

/// Single-threaded runtime for one command
pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
