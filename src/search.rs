//! Regex occurrence counts

use regex::Regex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{ConfigError, RunConfig};
use crate::error::Result;
use crate::scheduler::{run_pass, ShardWorker};
use crate::shard::Document;

/// Matches of one pattern over the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternCount {
    pub pattern: String,
    /// Non-overlapping matches
    pub count: u64,
    /// Documents with at least one match
    pub documents: u64,
}

struct SearchWorker<'a> {
    patterns: &'a [Regex],
    matches: &'a [AtomicU64],
    documents: &'a [AtomicU64],
}

impl ShardWorker for SearchWorker<'_> {
    type Output = ();

    fn document(&mut self, _shard: u32, doc: &Document) {
        for (i, regex) in self.patterns.iter().enumerate() {
            let found = regex.find_iter(&doc.text).count() as u64;
            if found > 0 {
                self.matches[i].fetch_add(found, Ordering::Relaxed);
                self.documents[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn finish(self) {}
}

pub fn search_patterns(config: &RunConfig, patterns: &[String]) -> Result<Vec<PatternCount>> {
    if patterns.is_empty() {
        return Err(ConfigError::MissingTerms("-p/--pattern regex").into());
    }
    let compiled = patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let zeros = || -> Vec<AtomicU64> { patterns.iter().map(|_| AtomicU64::new(0)).collect() };
    let (matches, documents) = (zeros(), zeros());

    run_pass(&config.shards, &config.pass("Searching"), |_| SearchWorker {
        patterns: &compiled,
        matches: &matches,
        documents: &documents,
    })?;

    Ok(patterns
        .iter()
        .zip(matches.into_iter().zip(documents))
        .map(|(pattern, (count, docs))| PatternCount {
            pattern: pattern.clone(),
            count: count.into_inner(),
            documents: docs.into_inner(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::test_support::write_text_shard;

    #[test]
    fn test_regex_counts() {
        let dir = tempfile::tempdir().unwrap();
        let shard = write_text_shard(
            dir.path(),
            "a.json.gz",
            &["call 555-1234 or 555-9876", "no numbers here", "cat"],
        );
        let cfg = RunConfig {
            shards: vec![shard],
            workers: 1,
            quiet: true,
            ..Default::default()
        };
        let out = search_patterns(
            &cfg,
            &[r"\d{3}-\d{4}".to_string(), "(?i)CAT".to_string()],
        )
        .unwrap();
        assert_eq!(out[0].count, 2);
        assert_eq!(out[0].documents, 1);
        assert_eq!(out[1].count, 1);
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let cfg = RunConfig::default();
        let err = search_patterns(&cfg, &["(unclosed".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Config(ConfigError::InvalidPattern { .. })
        ));
    }
}
