//! `topk` and `botk` commands

use anyhow::{Context, Result};

use super::{InputArgs, SketchArgs};
use crate::config::FileDefaults;
use crate::output::{ranked_file_name, Report};
use crate::ranking::{bottom_k, top_k};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Direction {
    Top,
    Bottom,
}

/// Ranking options that are not shared with other commands
#[derive(Debug, Clone, Copy)]
pub(super) struct RankOptions {
    pub k: usize,
    pub threshold: Option<u64>,
    pub exact_counts: bool,
    pub p_keep: Option<f64>,
}

pub(super) fn run(
    direction: Direction,
    input: &InputArgs,
    sketch: &SketchArgs,
    defaults: &FileDefaults,
    opts: RankOptions,
) -> Result<()> {
    let mut config = input.run_config(defaults)?;
    sketch.apply(&mut config, defaults)?;
    config.k = opts.k;
    config.threshold = opts.threshold.or(config.threshold);
    config.exact_counts = opts.exact_counts;
    config.p_keep = opts.p_keep;
    config.validate()?;

    let command = match direction {
        Direction::Top => "topk",
        Direction::Bottom => "botk",
    };
    let target = input.target(Some(ranked_file_name(
        command,
        config.n,
        config.k,
        config.hashes,
        config.line_limit,
        config.seed,
    )))?;

    let report = match direction {
        Direction::Top => top_k(&config),
        Direction::Bottom => bottom_k(&config),
    }
    .with_context(|| format!("{command} run failed"))?;

    if report.results.len() < config.k {
        tracing::info!(
            "Only {} of {} requested n-grams qualified",
            report.results.len(),
            config.k
        );
    }
    target.emit(&Report::Ranked(&report.results))?;
    Ok(())
}
