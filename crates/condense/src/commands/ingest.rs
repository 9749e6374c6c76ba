use condense_compress::SqliteStore;
use condense_core::{ConversationContext, Message, StoreSnapshot};
use condense_telemetry::Paths;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One line of an ingest file
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum IngestRecord {
    Message(Message),
    Context(ConversationContext),
    Snapshot(StoreSnapshot),
}

#[derive(Debug, Default, PartialEq)]
pub struct IngestCounts {
    pub messages: usize,
    pub contexts: usize,
    pub snapshots: usize,
    pub skipped: usize,
}

pub fn run(file: &str) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = super::load_config(&paths)?;
    let store = super::open_store(&paths, &config)?;

    let counts = ingest_file(&store, Path::new(file))?;
    println!(
        "Ingested {} messages, {} standing facts, {} store snapshots ({} lines skipped)",
        counts.messages, counts.contexts, counts.snapshots, counts.skipped
    );
    Ok(())
}

pub fn ingest_file(store: &SqliteStore, path: &Path) -> anyhow::Result<IngestCounts> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("cannot open {}: {e}", path.display()))?;
    let mut counts = IngestCounts::default();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: IngestRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line = line_no + 1, error = %e, "skipping malformed record");
                counts.skipped += 1;
                continue;
            }
        };

        match record {
            IngestRecord::Message(message) => {
                store.insert_message(&message)?;
                counts.messages += 1;
            }
            IngestRecord::Context(context) => {
                store.insert_context(&context)?;
                counts.contexts += 1;
            }
            IngestRecord::Snapshot(snapshot) => {
                store.upsert_snapshot(&snapshot)?;
                counts.snapshots += 1;
            }
        }
    }
    Ok(counts)
}
