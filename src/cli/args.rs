//! Option groups shared between subcommands

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::{parse_size, CellWidth, FileDefaults, RunConfig, DEFAULT_HASHES, DEFAULT_SEED, DEFAULT_SIZE};
use crate::output::{OutputFormat, OutputTarget};
use crate::scheduler::{default_workers, MAX_WORKERS};
use crate::shard::{expand_paths, TextField};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > MAX_WORKERS {
        Err(format!("workers cannot exceed {}", MAX_WORKERS))
    } else {
        Ok(n)
    }
}

/// Inputs, limits and output options accepted by every command
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Shard files or directories of shards (.json[l][.gz], .zst, .zstd)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Maximum number of lines to read per file
    #[arg(long, short = 'l')]
    pub limit: Option<u64>,

    /// Maximum number of files to process
    #[arg(long)]
    pub file_limit: Option<usize>,

    /// Dotted path of the record field holding the text (default: text)
    #[arg(long)]
    pub text_field: Option<String>,

    /// Number of parallel workers (1-64, default: available cores)
    #[arg(long, short = 'j', value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Write JSON lines to this file (or auto-named file inside this directory)
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Overwrite the output file if it already exists
    #[arg(long, short = 'f')]
    pub force: bool,

    /// Output format for stdout: json, text
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Hide progress bars
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Fail the run when a shard cannot be read instead of skipping it
    #[arg(long)]
    pub strict: bool,
}

/// Counting sketch options
#[derive(Args, Debug, Clone)]
pub struct SketchArgs {
    /// N-gram width
    #[arg(long = "ngram", short = 'n', default_value = "3")]
    pub n: usize,

    /// Memory budget for the counting sketch, e.g. 8GiB or 500MB (bare numbers are GiB)
    #[arg(long)]
    pub size: Option<String>,

    /// Number of hash rows in the sketch
    #[arg(long)]
    pub hashes: Option<usize>,

    /// Seed for the sketch hash functions and sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use 64-bit counters (half as many cells, no saturation in practice)
    #[arg(long = "u64")]
    pub wide: bool,
}

impl InputArgs {
    /// Resolve inputs into a run configuration, falling back to file defaults.
    pub fn run_config(&self, defaults: &FileDefaults) -> Result<RunConfig> {
        let shards = expand_paths(&self.paths, self.file_limit)?;
        let text_field = self
            .text_field
            .as_deref()
            .or(defaults.text_field.as_deref())
            .map(TextField::new)
            .unwrap_or_default();
        Ok(RunConfig {
            shards,
            workers: self.workers.or(defaults.workers).unwrap_or_else(default_workers),
            line_limit: self.limit,
            text_field,
            strict: self.strict,
            quiet: self.quiet,
            threshold: defaults.threshold,
            ..RunConfig::default()
        })
    }

    pub fn target(&self, auto_name: Option<String>) -> Result<OutputTarget> {
        OutputTarget::resolve(self.format, self.out.as_deref(), self.force, auto_name)
            .context("invalid output target")
    }
}

impl SketchArgs {
    /// Apply sketch options on top of `config`.
    pub fn apply(&self, config: &mut RunConfig, defaults: &FileDefaults) -> Result<()> {
        let size = self
            .size
            .as_deref()
            .or(defaults.size.as_deref())
            .unwrap_or(DEFAULT_SIZE);
        config.n = self.n;
        config.size = parse_size(size).context("invalid --size")?;
        config.hashes = self.hashes.or(defaults.hashes).unwrap_or(DEFAULT_HASHES);
        config.seed = self.seed.or(defaults.seed).unwrap_or(DEFAULT_SEED);
        config.cell = if self.wide {
            CellWidth::U64
        } else {
            CellWidth::U32
        };
        Ok(())
    }
}
