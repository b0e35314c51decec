//! Top-k and bottom-k n-gram ranking
//!
//! Both directions run three passes over the corpus:
//!
//! 1. **Counting**: every worker adds its n-grams to one shared
//!    [`CountingSketch`].
//! 2. **Collecting**: with the sketch frozen, each worker streams its shards
//!    again and feeds (key, final estimate, sighting) into a private
//!    [`CandidateTracker`]. The trackers are merged once into a candidate
//!    pool, the best keys by estimate.
//! 3. **Verifying**: workers count exact occurrences of the pooled keys
//!    only. Results are ranked on the verified counts where requested.
//!
//! Estimates seen in pass 2 are final and the shard partition is static, so
//! the result does not depend on thread timing or the worker count.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{CellWidth, RunConfig};
use crate::error::Result;
use crate::scheduler::{run_pass, PassStats, ShardWorker};
use crate::shard::{Document, ShardCounters};
use crate::sketch::{CounterCell, CountingSketch};
use crate::tokens::{key_tokens, tokenize, NgramWindow};
use crate::tracker::{compare_figures, merge_candidates, CandidateTracker, RankOrder, Sighting};

/// Pool size multiplier when ranking on exact counts, so keys whose
/// estimates were inflated by collisions still get verified
const EXACT_POOL_FACTOR: usize = 4;

/// One ranked n-gram
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedNgram {
    pub ngram: String,
    pub tokens: Vec<String>,
    /// Reported count: the estimate for top-k (or the exact count with
    /// `--exact-counts`), the exact count for bottom-k
    pub count: u64,
    pub rank: usize,
    pub n: usize,
    pub estimate: u64,
    pub exact: u64,
}

/// Ranked results plus what the counting pass saw
#[derive(Debug)]
pub struct RankReport {
    pub results: Vec<RankedNgram>,
    pub stats: PassStats,
    /// Some estimate hit the counter maximum
    pub saturated: bool,
}

/// Figure used to order the final results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RankBy {
    Estimate,
    Exact,
}

/// Pass 1 worker: adds every n-gram to the shared sketch
pub(crate) struct SketchFiller<'s, C: CounterCell> {
    sketch: &'s CountingSketch<C>,
    n: usize,
    saturated: bool,
}

impl<'s, C: CounterCell> SketchFiller<'s, C> {
    pub(crate) fn new(sketch: &'s CountingSketch<C>, n: usize) -> Self {
        Self {
            sketch,
            n,
            saturated: false,
        }
    }
}

impl<C: CounterCell> ShardWorker for SketchFiller<'_, C> {
    type Output = bool;

    fn document(&mut self, _shard: u32, doc: &Document) {
        let mut window = NgramWindow::new(self.n);
        for token in tokenize(&doc.text) {
            if let Some(key) = window.push(token) {
                let estimate = self.sketch.increment(key);
                self.saturated |= self.sketch.is_saturated(estimate);
            }
        }
    }

    fn finish(self) -> bool {
        self.saturated
    }
}

/// Fill `sketch` from every shard. Returns the pass totals and whether any
/// counter saturated.
pub(crate) fn fill_sketch<C: CounterCell>(
    config: &RunConfig,
    sketch: &CountingSketch<C>,
) -> Result<(PassStats, bool)> {
    let outcome = run_pass(&config.shards, &config.pass("Counting n-grams"), |_| {
        SketchFiller::new(sketch, config.n)
    })?;
    let saturated = outcome.outputs.iter().any(|s| *s);
    Ok((outcome.stats, saturated))
}

/// Allocate the sketch described by `config`
pub(crate) fn allocate_sketch<C: CounterCell>(config: &RunConfig) -> Result<CountingSketch<C>> {
    let sketch = CountingSketch::<C>::with_budget(config.size, config.hashes, config.seed)?;
    info!(
        "Counting sketch: {} ({} bytes of {} budget)",
        sketch.dimensions(),
        sketch.size_in_bytes(),
        config.size
    );
    Ok(sketch)
}

/// Pass 2 worker: feeds final estimates into a local tracker
struct Collector<'s, C: CounterCell> {
    sketch: &'s CountingSketch<C>,
    tracker: CandidateTracker,
    n: usize,
    p_keep: Option<f64>,
    seed: u64,
    rng: Option<(u32, ChaCha8Rng)>,
}

impl<C: CounterCell> Collector<'_, C> {
    /// Draw from the RNG of `shard`, seeding it on first use
    fn keep(&mut self, shard: u32, p: f64) -> bool {
        if self.rng.as_ref().map(|(s, _)| *s) != Some(shard) {
            let seed = self.seed ^ ((u64::from(shard) << 32) | 0x5eed);
            self.rng = Some((shard, ChaCha8Rng::seed_from_u64(seed)));
        }
        match &mut self.rng {
            Some((_, rng)) => rng.random::<f64>() < p,
            None => true,
        }
    }
}

impl<C: CounterCell> ShardWorker for Collector<'_, C> {
    type Output = CandidateTracker;

    fn document(&mut self, shard: u32, doc: &Document) {
        let mut window = NgramWindow::new(self.n);
        for (offset, token) in tokenize(&doc.text).enumerate() {
            let Some(key) = window.push(token) else {
                continue;
            };
            let estimate = self.sketch.estimate(key);
            if !self.tracker.admissible(estimate) {
                continue;
            }
            // Draw for every admissible occurrence so the sample depends on
            // the shard alone, not on what this worker already tracks.
            if let Some(p) = self.p_keep {
                if !self.keep(shard, p) {
                    continue;
                }
            }
            let at = Sighting::new(shard, doc.line, (offset + 1 - self.n) as u32);
            self.tracker.observe(key, estimate, at);
        }
    }

    fn finish_shard(&mut self, _shard: u32, _path: &Path, _counters: &ShardCounters) {
        self.rng = None;
    }

    fn finish(self) -> CandidateTracker {
        self.tracker
    }
}

/// Pass 3 worker: exact occurrence counts for the pooled keys only
struct Verifier<'p> {
    pool: &'p FxHashMap<Arc<str>, usize>,
    counts: Vec<u64>,
    n: usize,
}

impl ShardWorker for Verifier<'_> {
    type Output = Vec<u64>;

    fn document(&mut self, _shard: u32, doc: &Document) {
        let mut window = NgramWindow::new(self.n);
        for token in tokenize(&doc.text) {
            if let Some(&slot) = window.push(token).and_then(|key| self.pool.get(key)) {
                self.counts[slot] += 1;
            }
        }
    }

    fn finish(self) -> Vec<u64> {
        self.counts
    }
}

fn rank<C: CounterCell>(config: &RunConfig, order: RankOrder) -> Result<RankReport> {
    config.validate()?;
    let sketch = allocate_sketch::<C>(config)?;
    let (stats, saturated) = fill_sketch(config, &sketch)?;

    let threshold = match order {
        RankOrder::Top => config.threshold.unwrap_or(1),
        RankOrder::Bottom => config.threshold.unwrap_or(u64::MAX),
    };
    let p_keep = match order {
        RankOrder::Top => None,
        RankOrder::Bottom => config.p_keep,
    };
    let by = match order {
        RankOrder::Top if config.exact_counts => RankBy::Exact,
        RankOrder::Top => RankBy::Estimate,
        RankOrder::Bottom => RankBy::Exact,
    };
    let capacity = match by {
        RankBy::Estimate => config.k,
        RankBy::Exact => config.k.saturating_mul(EXACT_POOL_FACTOR),
    };

    let outcome = run_pass(&config.shards, &config.pass("Collecting n-grams"), |_| {
        Collector {
            sketch: &sketch,
            tracker: CandidateTracker::new(order, capacity, threshold),
            n: config.n,
            p_keep,
            seed: config.seed,
            rng: None,
        }
    })?;
    debug!(
        "Worker trackers hold {} candidates",
        outcome.outputs.iter().map(CandidateTracker::len).sum::<usize>()
    );
    let parts = outcome.outputs.into_iter().map(CandidateTracker::into_candidates);
    let pool = merge_candidates(parts, order, capacity);
    debug!("Verifying {} candidate n-grams", pool.len());

    let slots: FxHashMap<Arc<str>, usize> = pool
        .iter()
        .enumerate()
        .map(|(i, cand)| (Arc::clone(&cand.key), i))
        .collect();
    let exact = if slots.is_empty() {
        Vec::new()
    } else {
        let verified = run_pass(&config.shards, &config.pass("Verifying counts"), |_| {
            Verifier {
                pool: &slots,
                counts: vec![0; slots.len()],
                n: config.n,
            }
        })?;
        verified
            .outputs
            .into_iter()
            .fold(vec![0u64; slots.len()], |mut total, part| {
                for (sum, count) in total.iter_mut().zip(part) {
                    *sum += count;
                }
                total
            })
    };

    let mut verified: Vec<_> = pool.into_iter().zip(exact).collect();
    if by == RankBy::Exact {
        verified.sort_by(|(a, a_exact), (b, b_exact)| {
            compare_figures(order, *a_exact, *b_exact)
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });
    }
    verified.truncate(config.k);

    let saturated = saturated || verified.iter().any(|(c, _)| sketch.is_saturated(c.estimate));
    if saturated {
        warn!(
            "Some counters reached the maximum of {}; affected counts are clamped (try --u64)",
            sketch.max_count()
        );
    }

    let results = verified
        .into_iter()
        .enumerate()
        .map(|(i, (cand, exact))| RankedNgram {
            ngram: cand.key.to_string(),
            tokens: key_tokens(&cand.key).into_iter().map(str::to_string).collect(),
            count: match by {
                RankBy::Estimate => cand.estimate,
                RankBy::Exact => exact,
            },
            rank: i + 1,
            n: config.n,
            estimate: cand.estimate,
            exact,
        })
        .collect();

    Ok(RankReport {
        results,
        stats,
        saturated,
    })
}

/// The `k` most frequent n-grams, most frequent first
pub fn top_k(config: &RunConfig) -> Result<RankReport> {
    match config.cell {
        CellWidth::U32 => rank::<AtomicU32>(config, RankOrder::Top),
        CellWidth::U64 => rank::<AtomicU64>(config, RankOrder::Top),
    }
}

/// The `k` least frequent n-grams, least frequent first
pub fn bottom_k(config: &RunConfig) -> Result<RankReport> {
    match config.cell {
        CellWidth::U32 => rank::<AtomicU32>(config, RankOrder::Bottom),
        CellWidth::U64 => rank::<AtomicU64>(config, RankOrder::Bottom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::error::Error;
    use crate::shard::test_support::write_text_shard;
    use std::path::PathBuf;

    const CAT: &str = "the cat sat on the mat the cat ran";

    fn corpus(dir: &Path, shards: usize, texts: &[&str]) -> Vec<PathBuf> {
        (0..shards)
            .map(|i| write_text_shard(dir, &format!("{i:03}.jsonl.gz"), texts))
            .collect()
    }

    fn config(shards: Vec<PathBuf>, n: usize, k: usize) -> RunConfig {
        RunConfig {
            shards,
            workers: 2,
            n,
            k,
            size: 1 << 20,
            quiet: true,
            ..Default::default()
        }
    }

    fn summary(report: &RankReport) -> Vec<(&str, u64)> {
        report
            .results
            .iter()
            .map(|r| (r.ngram.as_str(), r.count))
            .collect()
    }

    #[test]
    fn test_top_unigrams() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(corpus(dir.path(), 3, &[CAT]), 1, 2);
        let report = top_k(&cfg).unwrap();
        assert_eq!(summary(&report), vec![("the", 6), ("cat", 4)]);
        assert_eq!(report.results[0].rank, 1);
        assert_eq!(report.results[1].exact, 4);
        assert_eq!(report.results[0].estimate, 6);
        assert_eq!(report.stats.counters.documents, 3);
        assert!(!report.saturated);
    }

    #[test]
    fn test_top_bigrams_tie_broken_by_first_sighting() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(corpus(dir.path(), 1, &["a b a b c d c d"]), 2, 2);
        let report = top_k(&cfg).unwrap();
        // "a b" and "c d" both occur twice; "a b" is seen first
        assert_eq!(summary(&report), vec![("a b", 2), ("c d", 2)]);
        assert_eq!(report.results[0].tokens, vec!["a", "b"]);
    }

    #[test]
    fn test_bottom_k_ascending_exact() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(corpus(dir.path(), 2, &[CAT, "rare"]), 1, 3);
        let report = bottom_k(&cfg).unwrap();
        assert_eq!(
            summary(&report),
            vec![("sat", 2), ("on", 2), ("mat", 2)]
        );
        let counts: Vec<u64> = report.results.iter().map(|r| r.count).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_bottom_threshold_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(corpus(dir.path(), 1, &["x x x y y z"]), 1, 10);
        cfg.threshold = Some(2);
        let report = bottom_k(&cfg).unwrap();
        assert_eq!(summary(&report), vec![("z", 1), ("y", 2)]);
    }

    #[test]
    fn test_top_threshold_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(corpus(dir.path(), 1, &["x x x y y z"]), 1, 10);
        cfg.threshold = Some(2);
        let report = top_k(&cfg).unwrap();
        assert_eq!(summary(&report), vec![("x", 3), ("y", 2)]);
    }

    #[test]
    fn test_results_identical_across_worker_counts() {
        let dir = tempfile::tempdir().unwrap();
        let texts = [
            "one fish two fish red fish blue fish",
            "the fish said one two three",
            "red blue red blue green",
        ];
        let shards = corpus(dir.path(), 5, &texts);
        let run = |workers: usize, rank: fn(&RunConfig) -> Result<RankReport>| {
            let cfg = RunConfig {
                workers,
                ..config(shards.clone(), 2, 5)
            };
            rank(&cfg).unwrap().results
        };
        for rank in [top_k as fn(&RunConfig) -> Result<RankReport>, bottom_k] {
            let baseline = run(1, rank);
            assert_eq!(baseline.len(), 5);
            for workers in [2, 3, 5] {
                assert_eq!(run(workers, rank), baseline, "workers = {workers}");
            }
        }
    }

    #[test]
    fn test_bottom_k_exact_with_split_sightings() {
        // "x" appears in both shards; a worker that only sees shard 0 must
        // not report it as occurring once.
        let dir = tempfile::tempdir().unwrap();
        let shards = vec![
            write_text_shard(dir.path(), "000.jsonl.gz", &["x"]),
            write_text_shard(dir.path(), "001.jsonl.gz", &["y x y z"]),
        ];
        for workers in [1, 2] {
            let cfg = RunConfig {
                workers,
                ..config(shards.clone(), 1, 1)
            };
            let report = bottom_k(&cfg).unwrap();
            assert_eq!(summary(&report), vec![("z", 1)], "workers = {workers}");

            let cfg = RunConfig { k: 3, ..cfg };
            let report = bottom_k(&cfg).unwrap();
            assert_eq!(
                summary(&report),
                vec![("z", 1), ("x", 2), ("y", 2)],
                "workers = {workers}"
            );
        }
    }

    #[test]
    fn test_reported_exact_counts_are_verified() {
        let dir = tempfile::tempdir().unwrap();
        let shards = corpus(dir.path(), 4, &[CAT]);
        for workers in [1, 3] {
            let cfg = RunConfig {
                workers,
                exact_counts: true,
                ..config(shards.clone(), 1, 3)
            };
            let report = top_k(&cfg).unwrap();
            assert_eq!(
                summary(&report),
                vec![("the", 12), ("cat", 8), ("sat", 4)],
                "workers = {workers}"
            );
            assert!(report.results.iter().all(|r| r.exact == r.count));
        }
    }

    #[test]
    fn test_u64_cells() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            cell: CellWidth::U64,
            ..config(corpus(dir.path(), 3, &[CAT]), 1, 1)
        };
        assert_eq!(summary(&top_k(&cfg).unwrap()), vec![("the", 6)]);
    }

    #[test]
    fn test_tiny_budget_still_upper_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            size: 16,
            ..config(corpus(dir.path(), 2, &[CAT]), 1, 3)
        };
        let report = top_k(&cfg).unwrap();
        assert!(!report.results.is_empty());
        for r in &report.results {
            assert!(r.estimate >= r.exact);
        }
    }

    #[test]
    fn test_p_keep_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let words: Vec<String> = (0..200).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");
        let cfg = RunConfig {
            p_keep: Some(0.5),
            ..config(corpus(dir.path(), 2, &[text.as_str()]), 1, 20)
        };
        let first = bottom_k(&cfg).unwrap().results;
        let second = bottom_k(&cfg).unwrap().results;
        assert_eq!(first, second);
        assert_eq!(first.len(), 20);

        let single = bottom_k(&RunConfig { workers: 1, ..cfg }).unwrap().results;
        assert_eq!(single, first);
    }

    #[test]
    fn test_invalid_config_rejected_before_reading() {
        let cfg = config(vec![PathBuf::from("/no/such.json.gz")], 0, 1);
        assert!(matches!(
            top_k(&cfg),
            Err(Error::Config(ConfigError::Zero { .. }))
        ));
        let cfg = RunConfig {
            size: 2,
            ..config(vec![PathBuf::from("/no/such.json.gz")], 1, 1)
        };
        assert!(matches!(top_k(&cfg), Err(Error::Sketch(_))));
    }
}
