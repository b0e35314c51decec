//! Distinct n-gram estimate
//!
//! Fills a counting sketch once and reads the occupancy of its rows back as a
//! linear-counting estimate. Accuracy degrades as rows fill up; a row with no
//! empty cells caps the estimate.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64};
use tracing::warn;

use crate::config::{CellWidth, RunConfig};
use crate::error::Result;
use crate::ranking::{allocate_sketch, fill_sketch};
use crate::sketch::CounterCell;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueEstimate {
    pub n: usize,
    pub unique: u64,
    pub documents: u64,
    /// Cells per sketch row; estimates approaching `width * ln(width)` are unreliable
    pub width: usize,
}

fn estimate<C: CounterCell>(config: &RunConfig) -> Result<UniqueEstimate> {
    config.validate()?;
    let sketch = allocate_sketch::<C>(config)?;
    let (stats, _) = fill_sketch(config, &sketch)?;
    let width = sketch.dimensions().width;
    let unique = sketch.estimate_distinct().round() as u64;
    if unique as f64 > 0.7 * width as f64 * (width as f64).ln() {
        warn!("Sketch rows are nearly full; the distinct estimate is a lower bound (try a larger --size)");
    }
    Ok(UniqueEstimate {
        n: config.n,
        unique,
        documents: stats.counters.documents,
        width,
    })
}

pub fn unique_ngrams(config: &RunConfig) -> Result<UniqueEstimate> {
    match config.cell {
        CellWidth::U32 => estimate::<AtomicU32>(config),
        CellWidth::U64 => estimate::<AtomicU64>(config),
    }
}
