//! `unique` command

use anyhow::{Context, Result};

use super::{InputArgs, SketchArgs};
use crate::config::FileDefaults;
use crate::output::Report;
use crate::unique::unique_ngrams;

pub(super) fn run(input: &InputArgs, sketch: &SketchArgs, defaults: &FileDefaults) -> Result<()> {
    let mut config = input.run_config(defaults)?;
    sketch.apply(&mut config, defaults)?;
    config.validate()?;

    let name = format!(
        "unique-n{}-h{}-seed{}.jsonl",
        config.n, config.hashes, config.seed
    );
    let target = input.target(Some(name))?;
    let estimate = unique_ngrams(&config).context("unique run failed")?;
    target.emit(&Report::Unique(&estimate))?;
    Ok(())
}
