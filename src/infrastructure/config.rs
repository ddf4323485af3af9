use super::errors::StorageResult;
use crate::domain::DEFAULT_MAX_DEPTH;
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// User settings read from `config.toml`. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Limit on cell resolution depth and function nesting.
    pub max_depth: usize,
    pub rows: usize,
    pub cols: usize,
    pub column_width: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            rows: 100,
            cols: 26,
            column_width: 10,
        }
    }
}

impl Config {
    /// Reads the given file, or the per-user config file when `path` is
    /// `None`. A missing per-user file yields the defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> StorageResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> StorageResult<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> StorageResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

fn default_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "sheetcalc")?;
    Some(proj.config_dir().join("config.toml"))
}
