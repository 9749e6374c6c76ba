//! Telemetry, path resolution and token accounting for the compression engine

mod io;
mod paths;
mod tokens;
mod types;

pub use io::{append_jsonl, atomic_write, read_jsonl, read_jsonl_tail};
pub use paths::Paths;
pub use tokens::{estimate_tokens, tokens_for_chars};
pub use types::CompressionRecord;
