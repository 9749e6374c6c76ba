use condense_compress::EngineConfig;
use condense_telemetry::Paths;

pub fn run() -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let report = init_at(&paths)?;

    println!("✓ Data directory: {}", paths.data_dir.display());
    println!("✓ Database: {}", report.database.display());
    if report.wrote_config {
        println!("✓ Wrote default config to {}", paths.config_path().display());
    } else {
        println!("  Kept existing config at {}", paths.config_path().display());
    }
    Ok(())
}

pub struct InitReport {
    pub database: std::path::PathBuf,
    pub wrote_config: bool,
}

/// Idempotent: an existing config is never overwritten
pub fn init_at(paths: &Paths) -> anyhow::Result<InitReport> {
    std::fs::create_dir_all(&paths.data_dir)?;

    let config_path = paths.config_path();
    let wrote_config = !config_path.exists();
    if wrote_config {
        EngineConfig::default().save(&config_path)?;
    }

    let config = EngineConfig::load(&config_path)?;
    let database = config
        .database_path
        .clone()
        .unwrap_or_else(|| paths.database_path());
    super::open_store(paths, &config)?;

    Ok(InitReport {
        database,
        wrote_config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = Paths::at(dir.path().join("data"));

        let report = init_at(&paths).unwrap();
        assert!(report.wrote_config);
        assert!(paths.config_path().exists());
        assert!(report.database.exists());
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = Paths::at(dir.path());
        std::fs::write(paths.config_path(), r#"{"cache_ttl_secs": 42}"#).unwrap();

        let report = init_at(&paths).unwrap();
        assert!(!report.wrote_config);
        let config = EngineConfig::load(&paths.config_path()).unwrap();
        assert_eq!(config.cache_ttl_secs, 42);
    }
}
