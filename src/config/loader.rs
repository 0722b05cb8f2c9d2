// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ExecConfig, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to get
/// an `ExecConfig`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path, apply defaults and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ExecConfig> {
    let raw_config = load_from_path(&path)?;
    let config = ExecConfig::try_from(raw_config)?;
    Ok(config)
}
