//! Bounded best-k candidate tracking
//!
//! Each worker owns one [`CandidateTracker`]. It keeps at most `capacity`
//! n-grams ordered by sketch estimate, breaking ties by first sighting.
//! Trackers are merged once, sequentially, after the pass with
//! [`merge_candidates`]. Exact counts for the merged pool come from a
//! separate verification pass.
//!
//! A key inside the global best `capacity` is always retained by the worker
//! that holds its earliest sighting: every key that beats it there also beats
//! it globally. The merged pool is therefore the same for any partition.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Position of an n-gram occurrence: shard index, 1-based line, token offset.
///
/// The derived ordering is the deterministic "first-seen" order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sighting {
    pub shard: u32,
    pub line: u64,
    pub offset: u32,
}

impl Sighting {
    pub fn new(shard: u32, line: u64, offset: u32) -> Self {
        Self { shard, line, offset }
    }
}

/// Which end of the distribution to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Largest estimates first
    Top,
    /// Smallest estimates first
    Bottom,
}

/// A tracked n-gram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: Arc<str>,
    /// Sketch estimate (upper bound on the true count)
    pub estimate: u64,
    pub first_seen: Sighting,
}

/// Ordering key inside the tracker; the smallest key is the best candidate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    score: u64,
    first_seen: Sighting,
    key: Arc<str>,
}

fn score(order: RankOrder, estimate: u64) -> u64 {
    match order {
        RankOrder::Top => u64::MAX - estimate,
        RankOrder::Bottom => estimate,
    }
}

/// Order two figures for `order`, best first
pub fn compare_figures(order: RankOrder, a: u64, b: u64) -> std::cmp::Ordering {
    match order {
        RankOrder::Top => b.cmp(&a),
        RankOrder::Bottom => a.cmp(&b),
    }
}

pub struct CandidateTracker {
    order: RankOrder,
    capacity: usize,
    threshold: u64,
    ranked: BTreeSet<RankKey>,
    /// Tracked key -> (estimate, first sighting)
    entries: FxHashMap<Arc<str>, (u64, Sighting)>,
}

impl CandidateTracker {
    /// `threshold` is a minimum estimate for [`RankOrder::Top`] and a maximum
    /// estimate for [`RankOrder::Bottom`].
    pub fn new(order: RankOrder, capacity: usize, threshold: u64) -> Self {
        Self {
            order,
            capacity,
            threshold,
            ranked: BTreeSet::new(),
            entries: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether an estimate passes the threshold pre-filter
    pub fn admissible(&self, estimate: u64) -> bool {
        match self.order {
            RankOrder::Top => estimate >= self.threshold,
            RankOrder::Bottom => estimate <= self.threshold,
        }
    }

    /// Offer one occurrence of `key` with its sketch estimate.
    ///
    /// Estimates come from a frozen sketch, so a key already tracked keeps
    /// its entry unchanged.
    pub fn observe(&mut self, key: &str, estimate: u64, at: Sighting) {
        if self.contains(key) || !self.admissible(estimate) {
            return;
        }

        let incoming = (score(self.order, estimate), at);
        if self.ranked.len() >= self.capacity {
            match self.ranked.last() {
                Some(worst) if incoming < (worst.score, worst.first_seen) => {}
                _ => return,
            }
            if let Some(worst) = self.ranked.pop_last() {
                self.entries.remove(&worst.key);
            }
        }

        let key: Arc<str> = Arc::from(key);
        self.ranked.insert(RankKey {
            score: incoming.0,
            first_seen: at,
            key: Arc::clone(&key),
        });
        self.entries.insert(key, (estimate, at));
    }

    /// Drain the tracker, best candidate first.
    pub fn into_candidates(self) -> Vec<Candidate> {
        let entries = self.entries;
        self.ranked
            .into_iter()
            .filter_map(|rank| {
                let (estimate, first_seen) = *entries.get(&rank.key)?;
                Some(Candidate {
                    key: rank.key,
                    estimate,
                    first_seen,
                })
            })
            .collect()
    }
}

/// Combine per-worker candidates and keep the best `k` by estimate.
///
/// The earliest sighting wins and the largest estimate is kept. Ties on the
/// estimate fall back to first-seen order.
pub fn merge_candidates<I>(parts: I, order: RankOrder, k: usize) -> Vec<Candidate>
where
    I: IntoIterator<Item = Vec<Candidate>>,
{
    let mut merged: FxHashMap<Arc<str>, Candidate> = FxHashMap::default();
    for part in parts {
        for cand in part {
            match merged.get_mut(&cand.key) {
                Some(existing) => {
                    existing.estimate = existing.estimate.max(cand.estimate);
                    existing.first_seen = existing.first_seen.min(cand.first_seen);
                }
                None => {
                    merged.insert(Arc::clone(&cand.key), cand);
                }
            }
        }
    }

    let mut out: Vec<Candidate> = merged.into_values().collect();
    out.sort_by(|a, b| {
        compare_figures(order, a.estimate, b.estimate)
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });
    out.truncate(k);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u64) -> Sighting {
        Sighting::new(0, line, 0)
    }

    fn keys(cands: &[Candidate]) -> Vec<&str> {
        cands.iter().map(|c| &*c.key).collect()
    }

    #[test]
    fn test_top_keeps_largest() {
        let mut t = CandidateTracker::new(RankOrder::Top, 2, 1);
        t.observe("a", 1, at(1));
        t.observe("b", 5, at(2));
        t.observe("c", 3, at(3));
        t.observe("d", 2, at(4));
        assert_eq!(t.len(), 2);
        assert_eq!(keys(&t.into_candidates()), vec!["b", "c"]);
    }

    #[test]
    fn test_tie_broken_by_first_sighting() {
        let mut t = CandidateTracker::new(RankOrder::Top, 1, 1);
        t.observe("late", 4, Sighting::new(1, 1, 0));
        t.observe("early", 4, Sighting::new(0, 9, 3));
        t.observe("later", 4, Sighting::new(2, 1, 0));
        let out = t.into_candidates();
        assert_eq!(keys(&out), vec!["early"]);
    }

    #[test]
    fn test_repeat_sightings_keep_first() {
        let mut t = CandidateTracker::new(RankOrder::Top, 2, 1);
        for line in 0..3 {
            t.observe("x", 3, at(line));
        }
        t.observe("y", 1, at(10));
        let out = t.into_candidates();
        assert_eq!(keys(&out), vec!["x", "y"]);
        assert_eq!(out[0].first_seen, at(0));
        assert_eq!(out[0].estimate, 3);
    }

    #[test]
    fn test_top_threshold_rejects_small_estimates() {
        let mut t = CandidateTracker::new(RankOrder::Top, 10, 3);
        t.observe("rare", 2, at(1));
        t.observe("common", 3, at(2));
        assert!(!t.contains("rare"));
        assert!(t.contains("common"));
    }

    #[test]
    fn test_bottom_keeps_smallest() {
        let mut t = CandidateTracker::new(RankOrder::Bottom, 2, u64::MAX);
        t.observe("big", 9, at(1));
        t.observe("one", 1, at(2));
        t.observe("mid", 4, at(3));
        t.observe("two", 2, at(4));
        assert_eq!(keys(&t.into_candidates()), vec!["one", "two"]);
    }

    #[test]
    fn test_bottom_threshold_rejects_large_estimates() {
        let mut t = CandidateTracker::new(RankOrder::Bottom, 4, 2);
        t.observe("too-common", 3, at(0));
        assert!(t.is_empty());
        t.observe("rare", 2, at(1));
        assert!(t.contains("rare"));
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut t = CandidateTracker::new(RankOrder::Top, 3, 1);
        for i in 0..100u64 {
            t.observe(&format!("k{i}"), i % 7 + 1, at(i));
            assert!(t.len() <= 3);
        }
    }

    fn cand(key: &str, estimate: u64, shard: u32) -> Candidate {
        Candidate {
            key: Arc::from(key),
            estimate,
            first_seen: Sighting::new(shard, 1, 0),
        }
    }

    #[test]
    fn test_merge_keeps_earliest_and_ranks() {
        let a = vec![cand("the", 6, 0), cand("cat", 4, 0)];
        let b = vec![cand("the", 6, 1), cand("sat", 4, 1)];
        let out = merge_candidates([a, b], RankOrder::Top, 2);
        assert_eq!(keys(&out), vec!["the", "cat"]);
        assert_eq!(out[0].first_seen.shard, 0);

        let c = vec![cand("x", 5, 0)];
        let d = vec![cand("y", 1, 1)];
        let bottom = merge_candidates([c, d], RankOrder::Bottom, 1);
        assert_eq!(keys(&bottom), vec!["y"]);
    }

    #[test]
    fn test_merged_pool_is_partition_independent() {
        // Shards 0..4, key/estimate per shard; the same stream split two ways.
        let stream = [("a", 2u64), ("b", 1), ("a", 2), ("c", 1), ("d", 3)];
        let pool = |workers: usize| {
            let parts: Vec<Vec<Candidate>> = (0..workers)
                .map(|w| {
                    let mut t = CandidateTracker::new(RankOrder::Bottom, 2, u64::MAX);
                    for (shard, (key, est)) in stream.iter().enumerate() {
                        if shard % workers == w {
                            t.observe(key, *est, Sighting::new(shard as u32, 1, 0));
                        }
                    }
                    t.into_candidates()
                })
                .collect();
            merge_candidates(parts, RankOrder::Bottom, 2)
        };
        let one = pool(1);
        assert_eq!(keys(&one), vec!["b", "c"]);
        assert_eq!(pool(2), one);
        assert_eq!(pool(3), one);
    }
}
