//! Corpus statistics
//!
//! A single pass that bypasses the sketch: token totals are summed into
//! shared atomics, extreme documents are tracked per worker and reduced at
//! the end. Ties on the token count resolve to the earliest document.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RunConfig;
use crate::error::Result;
use crate::scheduler::{run_pass, ShardWorker};
use crate::shard::Document;
use crate::tokens::count_tokens;

/// Where to find a document: shard path and 1-based line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPointer {
    pub path: String,
    pub line: u64,
    pub tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    pub shards: usize,
    pub skipped_shards: usize,
    pub documents: u64,
    pub tokens: u64,
    /// Uncompressed bytes read
    pub bytes: u64,
    pub lines: u64,
    pub decode_errors: u64,
    pub mean_tokens: f64,
    pub max_tokens: Option<DocumentPointer>,
    pub min_tokens: Option<DocumentPointer>,
}

/// (tokens, shard, line)
type Extreme = (u64, u32, u64);

struct StatsWorker<'t> {
    tokens: &'t AtomicU64,
    max: Option<Extreme>,
    min: Option<Extreme>,
}

impl ShardWorker for StatsWorker<'_> {
    type Output = (Option<Extreme>, Option<Extreme>);

    fn document(&mut self, shard: u32, doc: &Document) {
        let n = count_tokens(&doc.text) as u64;
        self.tokens.fetch_add(n, Ordering::Relaxed);
        let here = (n, shard, doc.line);
        // Documents arrive in (shard, line) order per worker, so strict
        // comparisons keep the earliest on ties.
        if self.max.map_or(true, |(best, _, _)| n > best) {
            self.max = Some(here);
        }
        if self.min.map_or(true, |(best, _, _)| n < best) {
            self.min = Some(here);
        }
    }

    fn finish(self) -> Self::Output {
        (self.max, self.min)
    }
}

pub fn corpus_stats(config: &RunConfig) -> Result<CorpusStats> {
    let tokens = AtomicU64::new(0);
    let outcome = run_pass(&config.shards, &config.pass("Collecting stats"), |_| StatsWorker {
        tokens: &tokens,
        max: None,
        min: None,
    })?;

    let (maxes, mins): (Vec<_>, Vec<_>) = outcome.outputs.into_iter().unzip();
    // Larger count wins; on ties the earlier (shard, line) wins.
    let max = maxes
        .into_iter()
        .flatten()
        .min_by_key(|&(n, shard, line)| (std::cmp::Reverse(n), shard, line));
    let min = mins.into_iter().flatten().min();

    let pointer = |(n, shard, line): Extreme| DocumentPointer {
        path: config.shards[shard as usize].display().to_string(),
        line,
        tokens: n,
    };

    let counters = outcome.stats.counters;
    let tokens = tokens.load(Ordering::Relaxed);
    Ok(CorpusStats {
        shards: outcome.stats.shards,
        skipped_shards: outcome.stats.skipped_shards,
        documents: counters.documents,
        tokens,
        bytes: counters.bytes,
        lines: counters.lines,
        decode_errors: counters.decode_errors,
        mean_tokens: if counters.documents == 0 {
            0.0
        } else {
            tokens as f64 / counters.documents as f64
        },
        max_tokens: max.map(pointer),
        min_tokens: min.map(pointer),
    })
}
