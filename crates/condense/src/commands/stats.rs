use condense_telemetry::Paths;
use std::sync::Arc;

pub fn run() -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = super::load_config(&paths)?;
    let store = Arc::new(super::open_store(&paths, &config)?);
    let compressor = super::build_compressor(&config, store);

    let stats = super::runtime()?.block_on(compressor.get_compression_stats());
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
