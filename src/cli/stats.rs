//! `stats` command

use anyhow::{Context, Result};

use super::InputArgs;
use crate::config::FileDefaults;
use crate::output::Report;
use crate::stats::corpus_stats;

pub(super) fn run(input: &InputArgs, defaults: &FileDefaults) -> Result<()> {
    let config = input.run_config(defaults)?;
    let target = input.target(None)?;
    let stats = corpus_stats(&config).context("stats run failed")?;
    target.emit(&Report::Stats(&stats))?;
    Ok(())
}
