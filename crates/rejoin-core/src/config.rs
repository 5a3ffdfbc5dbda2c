use crate::error::{RejoinError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Preferred output mode (`pretty`, `text`, `json`).
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Element names treated as paragraph-like blocks.
    #[serde(default = "default_block_tags")]
    pub block_tags: Vec<String>,
    /// File extensions (without dot) treated as markup files.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Skip blocks that contain other blocks so nested text is indexed once.
    #[serde(default = "default_true")]
    pub leaf_blocks_only: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_tags: default_block_tags(),
            extensions: default_extensions(),
            leaf_blocks_only: default_true(),
        }
    }
}

/// When working files are rewritten after a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    /// Rewrite the touched file(s) before accept/back returns.
    #[default]
    Immediate,
    /// Mark touched files dirty and write them when the book is saved.
    Deferred,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub persist: PersistMode,
    /// Working directory for the extracted book. Wiped on every load.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl SessionConfig {
    /// Configured working directory, or the per-user cache default.
    #[must_use]
    pub fn resolved_workdir(&self) -> PathBuf {
        self.workdir.clone().unwrap_or_else(default_workdir)
    }
}

/// Default user config location: `<config_dir>/rejoin/config.toml`.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rejoin/config.toml"))
}

/// Load config from an explicit path. A missing file yields defaults.
///
/// # Errors
///
/// Returns [`RejoinError::Config`] if the file exists but does not parse,
/// or [`RejoinError::Io`] if it cannot be read.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str::<Config>(&content).map_err(|err| RejoinError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Load config from `explicit` if given, otherwise from the user config path.
///
/// Only the user config may be absent; a named file must exist.
///
/// # Errors
///
/// Returns [`RejoinError::Config`] if `explicit` does not exist, otherwise
/// the same as [`load_config_from`].
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) if !path.exists() => Err(RejoinError::Config {
            path: path.to_path_buf(),
            message: "file not found".to_string(),
        }),
        Some(path) => load_config_from(path),
        None => user_config_path().map_or_else(|| Ok(Config::default()), |p| load_config_from(&p)),
    }
}

fn default_workdir() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || PathBuf::from("_epub_working"),
        |dir| dir.join("rejoin/work"),
    )
}

fn default_block_tags() -> Vec<String> {
    vec!["p".to_string(), "div".to_string()]
}

fn default_extensions() -> Vec<String> {
    vec!["xhtml".to_string(), "html".to_string()]
}

const fn default_true() -> bool {
    true
}
