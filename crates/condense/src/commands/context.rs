use chrono::Utc;
use condense_core::{CompressedContext, CompressionOptions};
use condense_telemetry::{append_jsonl, CompressionRecord, Paths};
use std::sync::Arc;

use crate::cli::ContextArgs;

pub fn run(args: &ContextArgs) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = super::load_config(&paths)?;
    let store = Arc::new(super::open_store(&paths, &config)?);
    let compressor = super::build_compressor(&config, store);

    let options = options_from_args(args);
    let context = super::runtime()?.block_on(compressor.get_compressed_context(
        &args.user,
        &args.thread,
        args.session.as_deref(),
        &options,
    ));

    println!("{}", serde_json::to_string_pretty(&context)?);

    let record = record_for(args, &context);
    if let Err(e) = append_jsonl(&paths.records_file(), &record) {
        tracing::warn!(error = %e, "failed to record compression call");
    }
    Ok(())
}

pub fn options_from_args(args: &ContextArgs) -> CompressionOptions {
    let mut options = CompressionOptions::for_level(args.level);
    options.current_intent = args.intent.clone();
    if args.no_store {
        options.include_store_context = false;
    }
    if let Some(max_recent) = args.max_recent {
        options.max_recent_messages = max_recent;
    }
    if let Some(hours) = args.time_range_hours {
        options.time_range_hours = hours;
    }
    options
}

pub fn record_for(args: &ContextArgs, context: &CompressedContext) -> CompressionRecord {
    let metadata = &context.metadata;
    CompressionRecord {
        user_id: args.user.clone(),
        thread_id: args.thread.clone(),
        session_id: args.session.clone(),
        timestamp: Utc::now(),
        level: metadata.level.to_string(),
        total_messages: metadata.total_messages,
        compressed_messages: metadata.compressed_messages,
        compression_ratio: metadata.compression_ratio,
        tokens_estimate: context.total_tokens_estimate,
        processing_time_ms: metadata.processing_time_ms,
        cache_hit: metadata.cache_hit,
        summaries_returned: context.summaries.len(),
        contexts_returned: context.relevant_context.len(),
    }
}
