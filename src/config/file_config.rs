//! Optional `ngramscope.toml` defaults
//!
//! ```toml
//! # ngramscope.toml
//!
//! [defaults]
//! workers = 16
//! size = "8GiB"
//! hashes = 4
//! seed = 1234
//! text_field = "meta.body"
//! threshold = 2
//! ```
//!
//! Lookup order: `--config <path>`, then `./ngramscope.toml`, then
//! `<user config dir>/ngramscope/ngramscope.toml`. Flags given on the
//! command line always win over file values.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ConfigError;

pub const CONFIG_FILE_NAME: &str = "ngramscope.toml";

/// Parsed config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub defaults: FileDefaults,
}

/// Fallback values for command-line options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDefaults {
    /// Default number of workers
    #[serde(default)]
    pub workers: Option<usize>,

    /// Default sketch budget, same syntax as `--size`
    #[serde(default)]
    pub size: Option<String>,

    #[serde(default)]
    pub hashes: Option<usize>,

    #[serde(default)]
    pub seed: Option<u64>,

    /// Dotted path of the record text field
    #[serde(default)]
    pub text_field: Option<String>,

    #[serde(default)]
    pub threshold: Option<u64>,
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ngramscope").join(CONFIG_FILE_NAME))
}

fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load defaults from the first config file found.
///
/// An explicit `--config` path must exist and parse. Implicit locations are
/// best effort: a missing file means built-in defaults, a broken one is an error
/// so that typos do not silently change results.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    if let Some(path) = explicit {
        let config = read_config(path)?;
        debug!("Loaded config from {}", path.display());
        return Ok(config);
    }

    let candidates = [Some(PathBuf::from(CONFIG_FILE_NAME)), user_config_path()];
    for path in candidates.into_iter().flatten() {
        if path.is_file() {
            let config = read_config(&path)?;
            debug!("Loaded config from {}", path.display());
            return Ok(config);
        }
    }

    debug!("No config file found, using built-in defaults");
    Ok(FileConfig::default())
}
