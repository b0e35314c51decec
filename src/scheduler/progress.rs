//! Progress reporting for a pass
//!
//! Workers send [`ProgressEvent`]s over a channel; the coordinating thread
//! owns the bar so workers never touch terminal state.

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::shard::ShardCounters;

/// Sent by a worker whenever it finishes (or gives up on) a shard
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent {
    ShardDone { counters: ShardCounters },
    ShardSkipped,
}

/// Create bar progress style
pub(crate) fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("valid template")
        .progress_chars("█▓▒░  ")
}

pub(crate) fn shard_bar(label: &str, shards: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(shards as u64);
    bar.set_style(create_bar_style());
    bar.set_message(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// One-line throughput summary for the log
pub(crate) fn throughput(counters: &ShardCounters, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64().max(1e-9);
    format!(
        "{} lines, {} in {:.2}s ({:.0} lines/s, {}/s)",
        counters.lines,
        HumanBytes(counters.bytes),
        elapsed.as_secs_f64(),
        counters.lines as f64 / secs,
        HumanBytes((counters.bytes as f64 / secs) as u64),
    )
}
