//! Crate-level error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::scheduler::SchedulerError;
use crate::sketch::SketchError;

/// Any failure that ends a run
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sketch(#[from] SketchError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

pub type Result<T> = std::result::Result<T, Error>;
