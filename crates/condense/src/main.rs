mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Ingest { file } => commands::ingest::run(&file),
        Commands::Context(args) => commands::context::run(&args),
        Commands::Stats => commands::stats::run(),
        Commands::History { stats, limit } => commands::history::run(stats, limit),
        Commands::Version => commands::version::run(),
    }
}
