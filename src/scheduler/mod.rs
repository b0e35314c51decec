//! Static-partition worker pool
//!
//! A pass streams every shard exactly once through a set of [`ShardWorker`]s.
//!
//! # Architecture
//!
//! ```text
//!   shards: [s0, s1, s2, s3, s4, s5, s6]        W = 3 workers
//!
//!   ┌──────────┐   ┌──────────┐   ┌──────────┐
//!   │ Worker 0 │   │ Worker 1 │   │ Worker 2 │   scoped threads
//!   │ s0 s3 s6 │   │ s1 s4    │   │ s2 s5    │   shard i -> worker i % W
//!   └────┬─────┘   └────┬─────┘   └────┬─────┘
//!        │  progress events (crossbeam channel)
//!        └──────────────┼──────────────┘
//!                       ▼
//!              ┌─────────────────┐
//!              │   Coordinator   │  progress bar, then joins workers
//!              └─────────────────┘   and returns outputs in worker order
//! ```
//!
//! The partition is fixed up front, so a worker always sees its shards in
//! index order and no two workers share a shard.

pub mod progress;

use crossbeam_channel::{unbounded, Sender};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::shard::{Document, ShardCounters, ShardError, ShardReader, TextField};
use progress::ProgressEvent;

/// Hard cap on worker threads
pub const MAX_WORKERS: usize = 64;

/// Available parallelism capped at [`MAX_WORKERS`]
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_WORKERS)
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error(transparent)]
    Shard(#[from] ShardError),
}

/// Per-pass settings shared by every worker
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// Label shown on the progress bar and in logs
    pub label: String,
    pub workers: usize,
    pub line_limit: Option<u64>,
    pub text_field: TextField,
    /// Fail the pass on a shard I/O error instead of skipping the shard
    pub strict: bool,
    pub quiet: bool,
}

/// Per-document processing for one pass
pub trait ShardWorker: Send {
    type Output: Send;

    /// Called for every decoded document of a shard owned by this worker.
    fn document(&mut self, shard: u32, doc: &Document);

    /// Called after the last document of a shard (also after a skipped one).
    fn finish_shard(&mut self, _shard: u32, _path: &Path, _counters: &ShardCounters) {}

    fn finish(self) -> Self::Output;
}

/// Totals for a whole pass
#[derive(Debug, Clone, Default)]
pub struct PassStats {
    pub shards: usize,
    pub skipped_shards: usize,
    pub counters: ShardCounters,
    pub elapsed: Duration,
}

/// Worker outputs (in worker order) plus pass totals
#[derive(Debug)]
pub struct PassOutcome<T> {
    pub outputs: Vec<T>,
    pub stats: PassStats,
}

#[derive(Debug, Default)]
struct WorkerStats {
    counters: ShardCounters,
    skipped: usize,
}

/// Number of workers actually started for `shards` inputs
pub fn effective_workers(requested: usize, shards: usize) -> usize {
    requested.clamp(1, MAX_WORKERS).min(shards.max(1))
}

/// Shard indices owned by `worker` out of `workers`
pub fn partition(worker: usize, workers: usize, shards: usize) -> impl Iterator<Item = usize> {
    (worker..shards).step_by(workers.max(1))
}

fn run_worker<W: ShardWorker>(
    mut worker: W,
    index: usize,
    workers: usize,
    shards: &[PathBuf],
    config: &PassConfig,
    events: &Sender<ProgressEvent>,
) -> Result<(W::Output, WorkerStats), ShardError> {
    let mut stats = WorkerStats::default();

    for shard in partition(index, workers, shards.len()) {
        let path = &shards[shard];
        let shard_id = shard as u32;
        let mut counters = ShardCounters::default();

        let failure = match ShardReader::open(path, &config.text_field) {
            Ok(reader) => {
                let mut reader = reader.with_line_limit(config.line_limit);
                let mut failure = None;
                for doc in reader.by_ref() {
                    match doc {
                        Ok(doc) => worker.document(shard_id, &doc),
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                counters = reader.counters();
                failure
            }
            Err(e) => Some(e),
        };

        worker.finish_shard(shard_id, path, &counters);
        stats.counters.absorb(&counters);

        match failure {
            Some(e) if config.strict => return Err(e),
            Some(e) => {
                warn!("Skipping rest of shard: {}", e);
                stats.skipped += 1;
                let _ = events.send(ProgressEvent::ShardSkipped);
            }
            None => {
                let _ = events.send(ProgressEvent::ShardDone { counters });
            }
        }
    }

    Ok((worker.finish(), stats))
}

/// Run one pass over `shards`.
///
/// `make_worker` is called once per worker index. Outputs come back in worker
/// order so merging them is deterministic.
pub fn run_pass<W, F>(
    shards: &[PathBuf],
    config: &PassConfig,
    make_worker: F,
) -> Result<PassOutcome<W::Output>, SchedulerError>
where
    W: ShardWorker,
    F: Fn(usize) -> W,
{
    let start = Instant::now();
    let workers = effective_workers(config.workers, shards.len());
    let bar = progress::shard_bar(&config.label, shards.len(), config.quiet);
    let (tx, rx) = unbounded::<ProgressEvent>();

    info!(
        "{}: {} shards on {} workers",
        config.label,
        shards.len(),
        workers
    );

    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|index| {
                let worker = make_worker(index);
                let events = tx.clone();
                scope.spawn(move || run_worker(worker, index, workers, shards, config, &events))
            })
            .collect();

        // Workers hold the remaining senders; the loop ends when they all exit.
        drop(tx);
        for event in rx.iter() {
            if let ProgressEvent::ShardDone { counters } = event {
                bar.set_message(format!("{} ({} docs)", config.label, counters.documents));
            }
            bar.inc(1);
        }

        handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| {
                handle
                    .join()
                    .map_err(|_| SchedulerError::WorkerPanicked { worker })
            })
            .collect::<Vec<_>>()
    });
    bar.finish_and_clear();

    let mut stats = PassStats {
        shards: shards.len(),
        ..Default::default()
    };
    let mut outputs = Vec::with_capacity(workers);
    for result in results {
        let (output, worker_stats) = result??;
        stats.counters.absorb(&worker_stats.counters);
        stats.skipped_shards += worker_stats.skipped;
        outputs.push(output);
    }
    stats.elapsed = start.elapsed();

    info!(
        "{} done: {}",
        config.label,
        progress::throughput(&stats.counters, stats.elapsed)
    );
    if stats.skipped_shards > 0 {
        warn!(
            "{} of {} shards were skipped or cut short by read errors",
            stats.skipped_shards, stats.shards
        );
    }
    if stats.counters.decode_errors > 0 {
        info!("{} malformed records skipped", stats.counters.decode_errors);
    }

    Ok(PassOutcome { outputs, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::test_support::write_text_shard;

    fn config(workers: usize) -> PassConfig {
        PassConfig {
            label: "Testing".into(),
            workers,
            line_limit: None,
            text_field: TextField::default(),
            strict: false,
            quiet: true,
        }
    }

    /// Records which shards and lines it saw
    struct Recorder {
        seen: Vec<(u32, u64)>,
        finished: Vec<u32>,
    }

    impl ShardWorker for Recorder {
        type Output = (Vec<(u32, u64)>, Vec<u32>);

        fn document(&mut self, shard: u32, doc: &Document) {
            self.seen.push((shard, doc.line));
        }

        fn finish_shard(&mut self, shard: u32, _path: &Path, _counters: &ShardCounters) {
            self.finished.push(shard);
        }

        fn finish(self) -> Self::Output {
            (self.seen, self.finished)
        }
    }

    fn recorder(_: usize) -> Recorder {
        Recorder {
            seen: Vec::new(),
            finished: Vec::new(),
        }
    }

    #[test]
    fn test_partition_is_round_robin() {
        assert_eq!(partition(0, 3, 7).collect::<Vec<_>>(), vec![0, 3, 6]);
        assert_eq!(partition(2, 3, 7).collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(partition(1, 1, 3).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_effective_workers() {
        assert_eq!(effective_workers(8, 3), 3);
        assert_eq!(effective_workers(0, 3), 1);
        assert_eq!(effective_workers(200, 1000), MAX_WORKERS);
        assert!(default_workers() >= 1 && default_workers() <= MAX_WORKERS);
    }

    #[test]
    fn test_every_shard_processed_once_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let shards: Vec<_> = (0..5)
            .map(|i| write_text_shard(dir.path(), &format!("{i}.json.gz"), &["a", "b"]))
            .collect();

        let outcome = run_pass(&shards, &config(2), recorder).unwrap();
        assert_eq!(outcome.outputs.len(), 2);
        assert_eq!(outcome.outputs[0].1, vec![0, 2, 4]);
        assert_eq!(outcome.outputs[1].1, vec![1, 3]);
        assert_eq!(
            outcome.outputs[0].0,
            vec![(0, 1), (0, 2), (2, 1), (2, 2), (4, 1), (4, 2)]
        );
        assert_eq!(outcome.stats.counters.documents, 10);
        assert_eq!(outcome.stats.skipped_shards, 0);
    }

    #[test]
    fn test_missing_shard_skipped_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_text_shard(dir.path(), "good.json.gz", &["x"]);
        let gone = dir.path().join("gone.json.gz");
        let outcome = run_pass(&[good, gone], &config(2), recorder).unwrap();
        assert_eq!(outcome.stats.skipped_shards, 1);
        assert_eq!(outcome.stats.counters.documents, 1);
    }

    #[test]
    fn test_strict_fails_on_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_text_shard(dir.path(), "good.json.gz", &["x"]);
        let gone = dir.path().join("gone.json.gz");
        let mut strict = config(1);
        strict.strict = true;
        assert!(matches!(
            run_pass(&[good, gone], &strict, recorder),
            Err(SchedulerError::Shard(ShardError::Open { .. }))
        ));
    }

    #[test]
    fn test_line_limit_applies_per_shard() {
        let dir = tempfile::tempdir().unwrap();
        let shards: Vec<_> = (0..2)
            .map(|i| write_text_shard(dir.path(), &format!("{i}.json.gz"), &["a", "b", "c"]))
            .collect();
        let mut limited = config(1);
        limited.line_limit = Some(1);
        let outcome = run_pass(&shards, &limited, recorder).unwrap();
        assert_eq!(outcome.outputs[0].0, vec![(0, 1), (1, 1)]);
    }
}
