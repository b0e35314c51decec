//! Immutable settings for one invocation

use std::path::PathBuf;

use super::{ConfigError, DEFAULT_HASHES, DEFAULT_SEED};
use crate::scheduler::{PassConfig, MAX_WORKERS};
use crate::shard::TextField;

/// Width of each sketch counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellWidth {
    #[default]
    U32,
    U64,
}

/// Settings shared by every command, plus the sketch and ranking knobs.
///
/// Commands that do not use the sketch simply ignore those fields.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Expanded shard list; the position is the shard index
    pub shards: Vec<PathBuf>,
    pub workers: usize,
    pub line_limit: Option<u64>,
    pub text_field: TextField,
    pub strict: bool,
    pub quiet: bool,

    /// N-gram width
    pub n: usize,
    pub k: usize,
    /// Sketch memory budget in bytes
    pub size: u64,
    pub hashes: usize,
    pub seed: u64,
    pub cell: CellWidth,
    /// Minimum estimate for top-k, maximum count for bottom-k
    pub threshold: Option<u64>,
    pub exact_counts: bool,
    pub p_keep: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            shards: Vec::new(),
            workers: crate::scheduler::default_workers(),
            line_limit: None,
            text_field: TextField::default(),
            strict: false,
            quiet: false,
            n: 3,
            k: 20,
            size: 4 << 30,
            hashes: DEFAULT_HASHES,
            seed: DEFAULT_SEED,
            cell: CellWidth::U32,
            threshold: None,
            exact_counts: false,
            p_keep: None,
        }
    }
}

impl RunConfig {
    /// Check everything the sketch-based commands rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shards.is_empty() {
            return Err(ConfigError::NoInputs);
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkers {
                got: self.workers,
                max: MAX_WORKERS,
            });
        }
        if self.n == 0 {
            return Err(ConfigError::Zero { name: "-n/--ngram" });
        }
        if self.k == 0 {
            return Err(ConfigError::Zero { name: "-k" });
        }
        if self.size == 0 {
            return Err(ConfigError::Zero { name: "--size" });
        }
        if self.hashes == 0 {
            return Err(ConfigError::Zero { name: "--hashes" });
        }
        if self.line_limit == Some(0) {
            return Err(ConfigError::Zero { name: "-l/--limit" });
        }
        if let Some(p) = self.p_keep {
            if !(p > 0.0 && p <= 1.0) {
                return Err(ConfigError::InvalidProbability(p));
            }
        }
        Ok(())
    }

    /// Pass settings for the scheduler
    pub fn pass(&self, label: &str) -> PassConfig {
        PassConfig {
            label: label.to_string(),
            workers: self.workers,
            line_limit: self.line_limit,
            text_field: self.text_field.clone(),
            strict: self.strict,
            quiet: self.quiet,
        }
    }
}
