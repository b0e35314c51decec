//! Run configuration
//!
//! This module handles:
//! - The immutable per-invocation settings ([`RunConfig`]) and their validation
//! - Optional `ngramscope.toml` defaults ([`FileConfig`])
//! - Size strings such as `4GiB` or a bare `2` (GiB)

mod file_config;
mod run_config;

pub use file_config::{load_file_config, FileConfig, FileDefaults, CONFIG_FILE_NAME};
pub use run_config::{CellWidth, RunConfig};

use std::path::PathBuf;
use thiserror::Error;

/// Default memory budget for the counting sketch
pub const DEFAULT_SIZE: &str = "4GiB";
/// Default number of sketch rows
pub const DEFAULT_HASHES: usize = 5;
/// Default run seed; results only depend on it, never on wall-clock entropy
pub const DEFAULT_SEED: u64 = 0x6e67_7261_6d73;

/// Invalid invocation, reported before any shard is read
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("at least one input path is required")]
    NoInputs,

    #[error("input path does not exist: {}", .0.display())]
    MissingPath(PathBuf),

    #[error("no shard files found under {}", .0.display())]
    NoShards(PathBuf),

    #[error("{name} must be greater than 0")]
    Zero { name: &'static str },

    #[error("invalid size '{value}': {reason}")]
    InvalidSize { value: String, reason: String },

    #[error("--p-keep must be in the interval (0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("-j/--workers must be between 1 and {max}, got {got}")]
    InvalidWorkers { got: usize, max: usize },

    #[error("at least one {0} is required")]
    MissingTerms(&'static str),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("output file {} already exists (use -f/--force to overwrite)", .0.display())]
    OutputExists(PathBuf),

    #[error("-o/--out must be a file name, not a directory: {}", .0.display())]
    OutputIsDirectory(PathBuf),

    #[error("failed to read config file {}: {reason}", .path.display())]
    ConfigFile { path: PathBuf, reason: String },
}

/// Parse a size with units (`4GiB`, `500MB`, `1024B`); a bare number is GiB.
pub fn parse_size(src: &str) -> Result<u64, ConfigError> {
    let src = src.trim();
    let has_unit = src.chars().any(|c| c.is_alphabetic());
    let result = if has_unit {
        parse_size::parse_size(src)
    } else {
        parse_size::parse_size(format!("{src}GiB"))
    };
    result.map_err(|e| ConfigError::InvalidSize {
        value: src.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("4GiB").unwrap(), 4 << 30);
        assert_eq!(parse_size("500MB").unwrap(), 500_000_000);
        assert_eq!(parse_size("1024B").unwrap(), 1024);
        assert_eq!(parse_size("64 KiB").unwrap(), 64 << 10);
    }

    #[test]
    fn test_bare_number_is_gib() {
        assert_eq!(parse_size("2").unwrap(), 2 << 30);
        assert_eq!(parse_size("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(matches!(
            parse_size("lots"),
            Err(ConfigError::InvalidSize { .. })
        ));
        assert!(parse_size("-3").is_err());
    }
}
