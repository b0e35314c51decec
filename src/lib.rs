//! ngramscope - bounded-memory n-gram statistics
//!
//! Streams line-delimited JSON shards through a static worker pool and
//! answers frequency questions over corpora far larger than memory. The
//! approximate commands share one fixed-size counting sketch whose
//! estimates never undercount.

pub mod cli;
pub mod config;
pub mod count;
pub mod error;
pub mod output;
pub mod ranking;
pub mod scheduler;
pub mod search;
pub mod shard;
pub mod sketch;
pub mod stats;
pub mod tokens;
pub mod tracker;
pub mod unique;

pub use error::{Error, Result};
