//! `count` and `search` commands

use anyhow::{Context, Result};

use super::InputArgs;
use crate::config::FileDefaults;
use crate::count::{count_terms, MatchMode};
use crate::output::Report;
use crate::search::search_patterns;

pub(super) fn run_count(
    input: &InputArgs,
    defaults: &FileDefaults,
    terms: &[String],
    substring: bool,
) -> Result<()> {
    let config = input.run_config(defaults)?;
    let target = input.target(None)?;
    let mode = if substring {
        MatchMode::Substring
    } else {
        MatchMode::Tokens
    };
    let counts = count_terms(&config, terms, mode).context("count run failed")?;
    target.emit(&Report::Terms(&counts))?;
    Ok(())
}

pub(super) fn run_search(input: &InputArgs, defaults: &FileDefaults, patterns: &[String]) -> Result<()> {
    let config = input.run_config(defaults)?;
    let target = input.target(None)?;
    let counts = search_patterns(&config, patterns).context("search run failed")?;
    target.emit(&Report::Patterns(&counts))?;
    Ok(())
}
