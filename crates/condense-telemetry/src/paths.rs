//! Path resolution for the engine's data directory

use std::path::PathBuf;

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "CONDENSE_HOME";

/// Resolves standard paths for the database, config and telemetry files
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// `$CONDENSE_HOME` when set, otherwise `~/.condense`
    pub fn new() -> std::io::Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(dir)));
        }

        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;
        Ok(Self::at(home.join(".condense")))
    }

    /// Rooted at an explicit directory
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("condense.db")
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn telemetry_dir(&self) -> PathBuf {
        self.data_dir.join("telemetry")
    }

    /// Per-call compression log
    pub fn records_file(&self) -> PathBuf {
        self.telemetry_dir().join("compressions.jsonl")
    }
}
