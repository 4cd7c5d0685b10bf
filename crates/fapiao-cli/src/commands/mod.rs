pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use fapiao_core::FapiaoConfig;
use tracing::debug;

/// Location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fapiao")
        .join("config.json")
}

/// Config file in effect: `--config` when given, else the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration for a run, with environment credentials applied.
///
/// An explicit `--config` file must exist; the default one is optional.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FapiaoConfig> {
    let config = match config_path {
        Some(path) => FapiaoConfig::from_file(Path::new(path))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Loading config from {}", path.display());
                FapiaoConfig::from_file(&path)?
            } else {
                FapiaoConfig::default()
            }
        }
    };
    Ok(config.with_env_overrides())
}
