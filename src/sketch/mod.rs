//! Fixed-budget counting sketch
//!
//! A count-min style structure: `rows` independent hash rows of `width`
//! saturating atomic cells. Every update touches one cell per row and a query
//! returns the minimum of those cells, so estimates can only overestimate.
//!
//! # Memory Model
//!
//! ```text
//! budget bytes ──► cells = budget / cell_bytes
//!                  rows  = min(hashes, cells)
//!                  width = cells / rows
//!
//! row 0: [c][c][c] ... [c]   seed_0 = chacha(run_seed)[0]
//! row 1: [c][c][c] ... [c]   seed_1 = chacha(run_seed)[1]
//!  ...
//! ```
//!
//! The backing array is allocated once and never grows. All mutation is a
//! lock-free saturating add, so one sketch can be shared by every worker.

mod cell;

pub use cell::CounterCell;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::atomic::AtomicU32;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Errors raised while building or combining sketches
#[derive(Error, Debug)]
pub enum SketchError {
    #[error("memory budget of {budget} bytes cannot hold a single {cell_bytes}-byte counter")]
    BudgetTooSmall { budget: u64, cell_bytes: usize },

    #[error("hash count must be greater than 0")]
    NoHashes,

    #[error("could not allocate {bytes} bytes for the counting sketch")]
    Allocation { bytes: u64 },

    #[error("cannot merge sketches with different shapes ({left} vs {right})")]
    Incompatible { left: String, right: String },
}

/// Shape of a sketch, derived from the memory budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SketchDimensions {
    pub rows: usize,
    pub width: usize,
    pub cell_bytes: usize,
}

impl SketchDimensions {
    /// Fit as many cells as possible into `budget` bytes.
    ///
    /// With an undersized budget the row count shrinks before the width
    /// reaches zero, so any budget holding one cell still yields a usable
    /// (if noisy) sketch.
    pub fn for_budget(budget: u64, hashes: usize, cell_bytes: usize) -> Result<Self, SketchError> {
        if hashes == 0 {
            return Err(SketchError::NoHashes);
        }
        let cells = budget / cell_bytes as u64;
        if cells == 0 {
            return Err(SketchError::BudgetTooSmall { budget, cell_bytes });
        }
        let cells = usize::try_from(cells).map_err(|_| SketchError::Allocation { bytes: budget })?;
        let rows = hashes.min(cells);
        Ok(Self {
            rows,
            width: cells / rows,
            cell_bytes,
        })
    }

    pub fn cells(&self) -> usize {
        self.rows * self.width
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.cells() as u64 * self.cell_bytes as u64
    }
}

impl std::fmt::Display for SketchDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows x {} cells x {}B",
            self.rows, self.width, self.cell_bytes
        )
    }
}

/// Shared approximate frequency counter.
pub struct CountingSketch<C: CounterCell = AtomicU32> {
    dims: SketchDimensions,
    seeds: Vec<u64>,
    cells: Vec<C>,
}

impl<C: CounterCell> CountingSketch<C> {
    /// Allocate a zeroed sketch that fits inside `budget` bytes.
    pub fn with_budget(budget: u64, hashes: usize, seed: u64) -> Result<Self, SketchError> {
        let dims = SketchDimensions::for_budget(budget, hashes, C::BYTES)?;
        Self::with_dimensions(dims, seed)
    }

    fn with_dimensions(dims: SketchDimensions, seed: u64) -> Result<Self, SketchError> {
        let len = dims.cells();
        let mut cells: Vec<C> = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| SketchError::Allocation {
                bytes: dims.size_in_bytes(),
            })?;
        cells.par_extend((0..len).into_par_iter().map(|_| C::zero()));

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let seeds = (0..dims.rows).map(|_| rng.random::<u64>()).collect();

        tracing::debug!("Allocated counting sketch: {}", dims);

        Ok(Self { dims, seeds, cells })
    }

    pub fn dimensions(&self) -> SketchDimensions {
        self.dims
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.dims.size_in_bytes()
    }

    /// Largest count a cell can hold before it saturates
    pub fn max_count(&self) -> u64 {
        C::MAX
    }

    #[inline]
    fn position(&self, row: usize, key: &[u8]) -> usize {
        let h = xxh3_64_with_seed(key, self.seeds[row]);
        row * self.dims.width + (h % self.dims.width as u64) as usize
    }

    /// Count one occurrence of `key`; returns the estimate after the update.
    pub fn increment(&self, key: &str) -> u64 {
        self.add(key, 1)
    }

    /// Count `delta` occurrences of `key`; returns the estimate after the update.
    pub fn add(&self, key: &str, delta: u64) -> u64 {
        let bytes = key.as_bytes();
        (0..self.dims.rows)
            .map(|row| self.cells[self.position(row, bytes)].saturating_add(delta))
            .min()
            .unwrap_or(0)
    }

    /// Current estimate for `key`. Never below the true count.
    pub fn estimate(&self, key: &str) -> u64 {
        let bytes = key.as_bytes();
        (0..self.dims.rows)
            .map(|row| self.cells[self.position(row, bytes)].get())
            .min()
            .unwrap_or(0)
    }

    /// Whether an estimate hit the cell maximum and may be clamped
    pub fn is_saturated(&self, estimate: u64) -> bool {
        estimate >= C::MAX
    }

    /// Fold `other` into this sketch, cell by cell.
    ///
    /// Both sketches must share dimensions and hash seeds. Saturating addition
    /// is commutative and associative, so merge order never matters.
    pub fn merge(&self, other: &Self) -> Result<(), SketchError> {
        if self.dims != other.dims || self.seeds != other.seeds {
            return Err(SketchError::Incompatible {
                left: self.dims.to_string(),
                right: other.dims.to_string(),
            });
        }
        self.cells
            .par_iter()
            .zip(other.cells.par_iter())
            .for_each(|(mine, theirs)| {
                let v = theirs.get();
                if v > 0 {
                    mine.saturating_add(v);
                }
            });
        Ok(())
    }

    /// Estimate the number of distinct keys counted so far.
    ///
    /// Linear counting per row (`-w * ln(zero / w)`), averaged over rows. A
    /// row without empty cells is full and the estimate is clamped to `w * ln(w)`.
    pub fn estimate_distinct(&self) -> f64 {
        let width = self.dims.width as f64;
        let total: f64 = self
            .cells
            .par_chunks(self.dims.width)
            .map(|row| {
                let zeros = row.iter().filter(|c| c.get() == 0).count();
                if zeros == 0 {
                    width * width.ln()
                } else {
                    -width * (zeros as f64 / width).ln()
                }
            })
            .sum();
        total / self.dims.rows as f64
    }
}
