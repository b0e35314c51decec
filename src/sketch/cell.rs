//! Saturating atomic counter cells

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A fixed-width counter that clamps at its maximum instead of wrapping.
///
/// Values cross the trait boundary as `u64` so the sketch logic is written
/// once for every cell width.
pub trait CounterCell: Send + Sync {
    /// Width of one cell in bytes
    const BYTES: usize;
    /// Largest representable count
    const MAX: u64;

    fn zero() -> Self;

    fn get(&self) -> u64;

    /// Add `delta`, clamping at [`Self::MAX`]. Returns the value after the add.
    fn saturating_add(&self, delta: u64) -> u64;
}

macro_rules! impl_counter_cell {
    ($atomic:ty, $int:ty) => {
        impl CounterCell for $atomic {
            const BYTES: usize = std::mem::size_of::<$int>();
            const MAX: u64 = <$int>::MAX as u64;

            fn zero() -> Self {
                <$atomic>::new(0)
            }

            fn get(&self) -> u64 {
                self.load(Ordering::Relaxed) as u64
            }

            fn saturating_add(&self, delta: u64) -> u64 {
                let delta = delta.min(Self::MAX) as $int;
                match self.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                    if v == <$int>::MAX {
                        None
                    } else {
                        Some(v.saturating_add(delta))
                    }
                }) {
                    Ok(prev) => prev.saturating_add(delta) as u64,
                    Err(_) => Self::MAX,
                }
            }
        }
    };
}

impl_counter_cell!(AtomicU32, u32);
impl_counter_cell!(AtomicU64, u64);
