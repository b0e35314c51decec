//! Result output
//!
//! Supports two formats:
//! - `json` - one JSON object per line (default, machine-readable)
//! - `text` - styled terminal output
//!
//! Results go to stdout unless `-o/--out` names a file. Files always receive
//! JSON lines regardless of `--format`. When `-o` names a directory, commands
//! that support it generate a descriptive file name inside it.

mod text;

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::config::ConfigError;
use crate::count::TermCount;
use crate::ranking::RankedNgram;
use crate::search::PatternCount;
use crate::stats::CorpusStats;
use crate::unique::UniqueEstimate;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => Ok(OutputFormat::Json),
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            _ => Err(format!("Unknown format '{}'. Valid formats: json, text", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Something a command can print
pub enum Report<'a> {
    Stats(&'a CorpusStats),
    Terms(&'a [TermCount]),
    Patterns(&'a [PatternCount]),
    Ranked(&'a [RankedNgram]),
    Unique(&'a UniqueEstimate),
}

impl Report<'_> {
    fn json_lines(&self) -> Result<Vec<String>, serde_json::Error> {
        fn lines<T: Serialize>(items: &[T]) -> Result<Vec<String>, serde_json::Error> {
            items.iter().map(serde_json::to_string).collect()
        }
        match self {
            Report::Stats(s) => Ok(vec![serde_json::to_string(s)?]),
            Report::Terms(t) => lines(*t),
            Report::Patterns(p) => lines(*p),
            Report::Ranked(r) => lines(*r),
            Report::Unique(u) => Ok(vec![serde_json::to_string(u)?]),
        }
    }

    fn text(&self) -> String {
        match self {
            Report::Stats(s) => text::stats(s),
            Report::Terms(t) => text::terms(t),
            Report::Patterns(p) => text::patterns(p),
            Report::Ranked(r) => text::ranked(r),
            Report::Unique(u) => text::unique(u),
        }
    }
}

/// Where results go for one invocation
#[derive(Debug, Clone)]
pub struct OutputTarget {
    pub format: OutputFormat,
    /// Resolved output file, `None` for stdout
    pub file: Option<PathBuf>,
}

impl OutputTarget {
    /// Resolve `-o/--out`.
    ///
    /// A directory (or an extension-less path) becomes `<dir>/<auto_name>` when
    /// the command supplies one, otherwise it is an error. Existing files are
    /// only replaced with `force`.
    pub fn resolve(
        format: OutputFormat,
        out: Option<&Path>,
        force: bool,
        auto_name: Option<String>,
    ) -> Result<Self, ConfigError> {
        let Some(out) = out else {
            return Ok(Self { format, file: None });
        };

        let looks_like_dir = out.is_dir() || out.extension().is_none();
        let file = match (looks_like_dir, auto_name) {
            (true, Some(name)) => out.join(name),
            (true, None) if out.is_dir() => {
                return Err(ConfigError::OutputIsDirectory(out.to_path_buf()))
            }
            _ => out.to_path_buf(),
        };

        if file.exists() && !force {
            return Err(ConfigError::OutputExists(file));
        }
        Ok(Self {
            format,
            file: Some(file),
        })
    }

    /// Write a report to the resolved target.
    pub fn emit(&self, report: &Report<'_>) -> Result<(), OutputError> {
        match &self.file {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let mut writer = BufWriter::new(File::create(path)?);
                for line in report.json_lines()? {
                    writeln!(writer, "{line}")?;
                }
                writer.flush()?;
                tracing::info!("Output written to {}", path.display());
            }
            None => {
                let stdout = io::stdout();
                let mut writer = BufWriter::new(stdout.lock());
                match self.format {
                    OutputFormat::Json => {
                        for line in report.json_lines()? {
                            writeln!(writer, "{line}")?;
                        }
                    }
                    OutputFormat::Text => write!(writer, "{}", report.text())?,
                }
                writer.flush()?;
            }
        }
        Ok(())
    }
}

/// Descriptive file name for ranked results, e.g. `topk-n3-k20-h5-seed7.jsonl`
pub fn ranked_file_name(
    command: &str,
    n: usize,
    k: usize,
    hashes: usize,
    limit: Option<u64>,
    seed: u64,
) -> String {
    let mut parts = vec![format!("{command}-n{n}-k{k}-h{hashes}")];
    if let Some(limit) = limit {
        parts.push(format!("limit{limit}"));
    }
    parts.push(format!("seed{seed}"));
    format!("{}.jsonl", parts.join("-"))
}
