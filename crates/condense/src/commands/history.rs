use condense_telemetry::{read_jsonl, read_jsonl_tail, CompressionRecord, Paths};

fn compute_stats(records: &[CompressionRecord]) -> String {
    if records.is_empty() {
        return "No compression calls to analyze.".to_string();
    }
    let total = records.len();
    let hits = records.iter().filter(|r| r.cache_hit).count();
    let avg_ratio = records.iter().map(|r| r.compression_ratio).sum::<f64>() / total as f64;
    let avg_tokens = records.iter().map(|r| r.tokens_estimate).sum::<usize>() as f64 / total as f64;
    let avg_ms = records.iter().map(|r| r.processing_time_ms).sum::<u64>() as f64 / total as f64;

    format!(
        "Total calls: {}\n\
         Cache hit rate: {:.1}%\n\
         Avg compression ratio: {:.1}%\n\
         Avg context size: {:.0} tokens\n\
         Avg processing time: {:.1} ms",
        total,
        hits as f64 / total as f64 * 100.0,
        avg_ratio * 100.0,
        avg_tokens,
        avg_ms,
    )
}

pub fn run(stats: bool, limit: usize) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let records: Vec<CompressionRecord> = if stats {
        read_jsonl(&paths.records_file())?
    } else {
        read_jsonl_tail(&paths.records_file(), limit)?
    };

    if records.is_empty() {
        println!("No compression history");
        return Ok(());
    }

    if stats {
        println!("{}", compute_stats(&records));
        return Ok(());
    }

    let shown: Vec<_> = records.iter().rev().collect();
    println!("Recent Compressions (last {})", shown.len());
    println!("===========================");
    for record in &shown {
        println!(
            "  {} | {}/{} {} | msgs:{} compressed:{} tokens:{} {}ms{}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.user_id,
            record.thread_id,
            record.level,
            record.total_messages,
            record.compressed_messages,
            record.tokens_estimate,
            record.processing_time_ms,
            if record.cache_hit { " (cached)" } else { "" },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(cache_hit: bool, ratio: f64, tokens: usize) -> CompressionRecord {
        CompressionRecord {
            user_id: "u1".to_string(),
            thread_id: "t1".to_string(),
            session_id: None,
            timestamp: Utc::now(),
            level: "BALANCED".to_string(),
            total_messages: 10,
            compressed_messages: 4,
            compression_ratio: ratio,
            tokens_estimate: tokens,
            processing_time_ms: 20,
            cache_hit,
            summaries_returned: 1,
            contexts_returned: 0,
        }
    }

    #[test]
    fn test_compute_stats() {
        let records = vec![record(false, 0.4, 1000), record(true, 0.2, 500)];
        let stats = compute_stats(&records);
        assert!(stats.contains("Total calls: 2"));
        assert!(stats.contains("Cache hit rate: 50.0%"));
        assert!(stats.contains("Avg compression ratio: 30.0%"));
        assert!(stats.contains("Avg context size: 750 tokens"));
    }

    #[test]
    fn test_compute_stats_empty() {
        assert_eq!(compute_stats(&[]), "No compression calls to analyze.");
    }
}
