//! Engine configuration from environment.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing terrain bundle subdirectories.
    pub data_root: PathBuf,
    /// Directory the exporter writes artifacts into (created lazily).
    pub export_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_root: env::var("OVERLAND_DATA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            export_root: env::var("OVERLAND_EXPORT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("exports")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
