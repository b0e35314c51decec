//! Exact occurrence counts for a handful of search terms
//!
//! Terms are tokenized with the same rules as documents and matched as
//! contiguous token sequences, so `cat` does not match inside `category`.
//! `--substring` switches to raw byte-substring matching instead.

use memchr::memmem;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{ConfigError, RunConfig};
use crate::error::Result;
use crate::scheduler::{run_pass, ShardWorker};
use crate::shard::Document;
use crate::tokens::tokenize;

/// How a term is matched against document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Contiguous token sequence
    #[default]
    Tokens,
    /// Raw substring (non-overlapping)
    Substring,
}

/// Occurrences of one search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub tokens: Vec<String>,
    pub count: u64,
}

enum Matcher {
    Tokens(Vec<String>),
    Substring(memmem::Finder<'static>),
}

impl Matcher {
    fn build(term: &str, mode: MatchMode) -> std::result::Result<Self, ConfigError> {
        match mode {
            MatchMode::Tokens => {
                let tokens: Vec<String> = tokenize(term).map(str::to_string).collect();
                if tokens.is_empty() {
                    return Err(ConfigError::InvalidPattern {
                        pattern: term.to_string(),
                        reason: "contains no tokens".into(),
                    });
                }
                Ok(Matcher::Tokens(tokens))
            }
            MatchMode::Substring => {
                if term.is_empty() {
                    return Err(ConfigError::InvalidPattern {
                        pattern: term.to_string(),
                        reason: "empty substring".into(),
                    });
                }
                Ok(Matcher::Substring(
                    memmem::Finder::new(term.as_bytes()).into_owned(),
                ))
            }
        }
    }
}

/// Count occurrences of `needle` as a contiguous run inside `haystack`.
pub fn count_sequence<S: AsRef<str>>(haystack: &[&str], needle: &[S]) -> u64 {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    haystack
        .windows(needle.len())
        .filter(|w| w.iter().zip(needle).all(|(a, b)| *a == b.as_ref()))
        .count() as u64
}

struct CountWorker<'a> {
    matchers: &'a [Matcher],
    counts: &'a [AtomicU64],
}

impl ShardWorker for CountWorker<'_> {
    type Output = ();

    fn document(&mut self, _shard: u32, doc: &Document) {
        let mut doc_tokens: Vec<&str> = Vec::new();
        let mut tokenized = false;

        for (matcher, count) in self.matchers.iter().zip(self.counts) {
            let found = match matcher {
                Matcher::Tokens(needle) => {
                    if !tokenized {
                        doc_tokens.extend(tokenize(&doc.text));
                        tokenized = true;
                    }
                    count_sequence(&doc_tokens, needle)
                }
                Matcher::Substring(finder) => {
                    finder.find_iter(doc.text.as_bytes()).count() as u64
                }
            };
            if found > 0 {
                count.fetch_add(found, Ordering::Relaxed);
            }
        }
    }

    fn finish(self) {}
}

/// Count every term over the whole corpus, in the order the terms were given.
pub fn count_terms(config: &RunConfig, terms: &[String], mode: MatchMode) -> Result<Vec<TermCount>> {
    if terms.is_empty() {
        return Err(ConfigError::MissingTerms("-s/--search term").into());
    }
    let matchers = terms
        .iter()
        .map(|t| Matcher::build(t, mode))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let counts: Vec<AtomicU64> = terms.iter().map(|_| AtomicU64::new(0)).collect();

    run_pass(&config.shards, &config.pass("Counting terms"), |_| CountWorker {
        matchers: &matchers,
        counts: &counts,
    })?;

    Ok(terms
        .iter()
        .zip(matchers)
        .zip(counts)
        .map(|((term, matcher), count)| TermCount {
            term: term.clone(),
            tokens: match matcher {
                Matcher::Tokens(tokens) => tokens,
                Matcher::Substring(_) => vec![term.clone()],
            },
            count: count.into_inner(),
        })
        .collect())
}
