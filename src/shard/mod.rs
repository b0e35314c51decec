//! Streaming shard reader
//!
//! A shard is a newline-delimited JSON file, optionally gzip or zstd
//! compressed. Records are decoded one line at a time and the configured text
//! field is extracted; malformed records are counted and skipped.

pub mod discover;

use flate2::read::MultiGzDecoder;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use discover::expand_paths;

/// Errors that abort reading a single shard
#[derive(Error, Debug)]
pub enum ShardError {
    #[error("failed to open shard {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read shard {path} at line {line}: {source}")]
    Read {
        path: PathBuf,
        line: u64,
        #[source]
        source: io::Error,
    },
}

/// Compression codec, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    Plain,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") | Some("zstd") => Compression::Zstd,
            _ => Compression::Plain,
        }
    }
}

/// Dotted path to the JSON string holding a record's text, e.g. `meta.body`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    segments: Vec<String>,
}

impl TextField {
    pub fn new(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    /// Resolve the field in a decoded record. `None` unless it is a string.
    pub fn extract<'v>(&self, record: &'v Value) -> Option<&'v str> {
        let mut current = record;
        for segment in &self.segments {
            current = current.get(segment.as_str())?;
        }
        current.as_str()
    }
}

impl Default for TextField {
    fn default() -> Self {
        Self::new("text")
    }
}

impl std::fmt::Display for TextField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Per-shard counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShardCounters {
    /// Non-blank lines read
    pub lines: u64,
    /// Uncompressed bytes consumed, newlines included
    pub bytes: u64,
    /// Records that produced a text value
    pub documents: u64,
    /// Records skipped as malformed
    pub decode_errors: u64,
}

impl ShardCounters {
    pub fn absorb(&mut self, other: &ShardCounters) {
        self.lines += other.lines;
        self.bytes += other.bytes;
        self.documents += other.documents;
        self.decode_errors += other.decode_errors;
    }
}

/// One decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// 1-based line number inside the shard
    pub line: u64,
    pub text: String,
}

/// Lazy iterator over the documents of one shard.
pub struct ShardReader {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    field: TextField,
    line_limit: Option<u64>,
    line_no: u64,
    buf: Vec<u8>,
    counters: ShardCounters,
    done: bool,
}

impl ShardReader {
    pub fn open(path: &Path, field: &TextField) -> Result<Self, ShardError> {
        let open_err = |source| ShardError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_err)?;
        let reader: Box<dyn BufRead + Send> = match Compression::from_path(path) {
            Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
            Compression::Zstd => Box::new(BufReader::new(
                zstd::stream::read::Decoder::new(file).map_err(open_err)?,
            )),
            Compression::Plain => Box::new(BufReader::new(file)),
        };
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            field: field.clone(),
            line_limit: None,
            line_no: 0,
            buf: Vec::with_capacity(4096),
            counters: ShardCounters::default(),
            done: false,
        })
    }

    /// Stop after `limit` lines (blank lines included in the position count).
    pub fn with_line_limit(mut self, limit: Option<u64>) -> Self {
        self.line_limit = limit;
        self
    }

    pub fn counters(&self) -> ShardCounters {
        self.counters
    }

    /// Decode the buffered line. Invalid UTF-8 or JSON is a record error.
    fn decode(&mut self) -> Option<String> {
        let text = serde_json::from_slice::<Value>(&self.buf)
            .ok()
            .and_then(|record| self.field.extract(&record).map(str::to_string));
        if text.is_none() {
            self.counters.decode_errors += 1;
            debug!(
                "Skipping malformed record {}:{} (not UTF-8 JSON with a string at '{}')",
                self.path.display(),
                self.line_no,
                self.field
            );
        }
        text
    }
}

impl Iterator for ShardReader {
    type Item = Result<Document, ShardError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if self.line_limit.is_some_and(|limit| self.line_no >= limit) {
                self.done = true;
                break;
            }
            self.buf.clear();
            let read = match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(read) => read,
                Err(source) => {
                    self.done = true;
                    return Some(Err(ShardError::Read {
                        path: self.path.clone(),
                        line: self.line_no + 1,
                        source,
                    }));
                }
            };
            if read == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            self.counters.lines += 1;
            self.counters.bytes += read as u64;
            if let Some(text) = self.decode() {
                self.counters.documents += 1;
                return Some(Ok(Document {
                    line: self.line_no,
                    text,
                }));
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use flate2::write::GzEncoder;
    use flate2::Compression as GzLevel;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    /// Write `lines` as a gzip shard and return its path.
    pub fn write_gz_shard(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        let mut enc = GzEncoder::new(file, GzLevel::default());
        for line in lines {
            writeln!(enc, "{line}").unwrap();
        }
        enc.finish().unwrap();
        path
    }

    /// Gzip shard with one `{"text": ...}` record per entry
    pub fn write_text_shard(dir: &Path, name: &str, texts: &[&str]) -> PathBuf {
        let lines: Vec<String> = texts
            .iter()
            .map(|t| serde_json::json!({ "text": t }).to_string())
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        write_gz_shard(dir, name, &refs)
    }
}
