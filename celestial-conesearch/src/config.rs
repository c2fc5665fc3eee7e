//! Query service configuration.
//!
//! The service looks for `cgi-config.json` in its working directory:
//!
//! ```json
//! { "dataPath": "/srv/catalogs/hipparcos" }
//! ```
//!
//! Without that file, the working directory itself is served if it holds a
//! `metadata.json`.

use crate::error::{Error, Result};
use crate::layout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "cgi-config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(rename = "dataPath")]
    pub data_path: PathBuf,
}

impl ServiceConfig {
    /// Parse a config file. A relative `dataPath` is taken relative to the
    /// directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ServiceConfigMissing(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| {
            Error::ServiceConfigInvalid {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if config.data_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.data_path = dir.join(&config.data_path);
            }
        }
        Ok(config)
    }

    /// Find the dataset served from working directory `dir`.
    pub fn locate(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            return Self::load(&path);
        }
        if layout::metadata_path(dir).is_file() {
            tracing::debug!(dir = %dir.display(), "no config file, serving working directory");
            return Ok(Self {
                data_path: dir.to_path_buf(),
            });
        }
        Err(Error::ServiceConfigMissing(path))
    }
}
