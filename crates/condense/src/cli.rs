use clap::{Args, Parser, Subcommand};
use condense_core::CompressionLevel;

#[derive(Parser)]
#[command(name = "condense")]
#[command(version)]
#[command(about = "Conversational context compression for chat agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, database and default config
    Init,

    /// Import messages, standing facts and store snapshots from JSONL
    Ingest {
        /// Path to a JSONL file of records tagged with "kind"
        #[arg(short, long)]
        file: String,
    },

    /// Assemble compressed context for a thread and print it as JSON
    Context(ContextArgs),

    /// Show cache and summary statistics
    Stats,

    /// View recorded compression calls
    History {
        /// Show statistics summary
        #[arg(long)]
        stats: bool,

        /// Number of calls to list
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    #[arg(short, long)]
    pub user: String,

    #[arg(short, long)]
    pub thread: String,

    #[arg(short, long)]
    pub session: Option<String>,

    /// minimal, balanced or comprehensive
    #[arg(short, long, default_value = "balanced")]
    pub level: CompressionLevel,

    /// Current intent, e.g. update_product_prices
    #[arg(long)]
    pub intent: Option<String>,

    /// Skip the store snapshot
    #[arg(long)]
    pub no_store: bool,

    /// Override the preset's recent message cap
    #[arg(long)]
    pub max_recent: Option<usize>,

    /// Override the preset's gap-filling lookback
    #[arg(long)]
    pub time_range_hours: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::try_parse_from(["condense", "version"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Version));
    }

    #[test]
    fn test_cli_parse_ingest() {
        let cli = Cli::try_parse_from(["condense", "ingest", "--file", "history.jsonl"]).unwrap();
        if let Commands::Ingest { file } = cli.command {
            assert_eq!(file, "history.jsonl");
        } else {
            panic!("Expected Ingest command");
        }
    }

    #[test]
    fn test_cli_parse_context() {
        let cli = Cli::try_parse_from([
            "condense",
            "context",
            "--user",
            "u1",
            "--thread",
            "t1",
            "--level",
            "minimal",
            "--intent",
            "update_prices",
        ])
        .unwrap();

        let Commands::Context(args) = cli.command else {
            panic!("Expected Context command");
        };
        assert_eq!(args.user, "u1");
        assert_eq!(args.level, CompressionLevel::Minimal);
        assert_eq!(args.intent.as_deref(), Some("update_prices"));
        assert!(!args.no_store);
        assert_eq!(args.session, None);
    }

    #[test]
    fn test_cli_context_defaults_to_balanced() {
        let cli = Cli::try_parse_from(["condense", "context", "-u", "u1", "-t", "t1"]).unwrap();
        let Commands::Context(args) = cli.command else {
            panic!("Expected Context command");
        };
        assert_eq!(args.level, CompressionLevel::Balanced);
    }

    #[test]
    fn test_cli_context_has_no_cache_flag() {
        // The cache lives for one process, so each CLI call is already cold
        let result = Cli::try_parse_from([
            "condense",
            "context",
            "--user",
            "u1",
            "--thread",
            "t1",
            "--force-refresh",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_level() {
        let cli = Cli::try_parse_from([
            "condense", "context", "-u", "u1", "-t", "t1", "--level", "extreme",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_history() {
        let cli = Cli::try_parse_from(["condense", "history", "--stats"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                stats: true,
                limit: 20
            }
        ));
    }
}
