//! YAML configuration loading
//!
//! Loading is fail-fast: a missing file, a parse failure or a value that
//! does not validate is an error, never a silent default.

use std::path::Path;

use super::error::{ConfigError, ConfigResult};
use super::schema::SiggenConfig;

/// Parse and validate configuration text
pub fn parse_config(contents: &str) -> ConfigResult<SiggenConfig> {
    let config: SiggenConfig =
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> ConfigResult<SiggenConfig> {
    log::info!("load_config: Loading from {:?}", path);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let config = parse_config(&contents)?;

    log::info!(
        "load_config: {} voices, {} mixer devices",
        config.voices.len(),
        config.mixers.len()
    );
    Ok(config)
}
