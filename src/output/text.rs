//! Styled terminal rendering

use console::style;
use std::fmt::Write;

use crate::count::TermCount;
use crate::ranking::RankedNgram;
use crate::search::PatternCount;
use crate::stats::{CorpusStats, DocumentPointer};
use crate::unique::UniqueEstimate;

fn pointer(out: &mut String, label: &str, p: &Option<DocumentPointer>) {
    let _ = writeln!(out, "{}:", style(label).cyan());
    match p {
        Some(p) => {
            let _ = writeln!(out, "  - {}: {}", style("path").cyan(), p.path);
            let _ = writeln!(out, "    {}: {}", style("line").cyan(), p.line);
            let _ = writeln!(out, "    {}: {}", style("tokens").cyan(), p.tokens);
        }
        None => {
            let _ = writeln!(out, "  {}", style("none").dim());
        }
    }
}

pub(super) fn stats(s: &CorpusStats) -> String {
    let mut out = String::new();
    let rows: [(&str, String); 8] = [
        ("shards", s.shards.to_string()),
        ("skipped shards", s.skipped_shards.to_string()),
        ("documents", s.documents.to_string()),
        ("tokens", s.tokens.to_string()),
        ("bytes", s.bytes.to_string()),
        ("lines", s.lines.to_string()),
        ("decode errors", s.decode_errors.to_string()),
        ("mean tokens", format!("{:.2}", s.mean_tokens)),
    ];
    for (name, value) in rows {
        let _ = writeln!(out, "{}: {}", style(name).cyan(), value);
    }
    pointer(&mut out, "max token document", &s.max_tokens);
    pointer(&mut out, "min token document", &s.min_tokens);
    out
}

pub(super) fn terms(terms: &[TermCount]) -> String {
    let mut out = String::new();
    for (i, t) in terms.iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}/{}] {:?} (count = {})",
            i + 1,
            terms.len(),
            style(&t.term).cyan(),
            t.count
        );
    }
    out
}

pub(super) fn patterns(patterns: &[PatternCount]) -> String {
    let mut out = String::new();
    for (i, p) in patterns.iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}/{}] {} (count = {}, documents = {})",
            i + 1,
            patterns.len(),
            style(&p.pattern).cyan(),
            p.count,
            p.documents
        );
    }
    out
}

pub(super) fn ranked(results: &[RankedNgram]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "{}", style("no n-grams matched").dim());
    }
    for r in results {
        // Estimates are upper bounds; exact figures are marked as such.
        let relation = if r.count > r.exact { "≤" } else { "=" };
        let _ = writeln!(
            out,
            "[{}/{}] {:?} (count {} {})",
            r.rank,
            results.len(),
            style(&r.ngram).cyan(),
            relation,
            r.count
        );
    }
    out
}

pub(super) fn unique(u: &UniqueEstimate) -> String {
    format!(
        "Estimated number of unique {}-grams: {}\n",
        u.n,
        style(u.unique).bold()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_marks_estimates() {
        console::set_colors_enabled(false);
        let results = vec![
            RankedNgram {
                ngram: "the".into(),
                tokens: vec!["the".into()],
                count: 7,
                rank: 1,
                n: 1,
                estimate: 7,
                exact: 6,
            },
            RankedNgram {
                ngram: "cat".into(),
                tokens: vec!["cat".into()],
                count: 4,
                rank: 2,
                n: 1,
                estimate: 4,
                exact: 4,
            },
        ];
        let text = ranked(&results);
        assert!(text.contains("[1/2] \"the\" (count ≤ 7)"), "{text}");
        assert!(text.contains("[2/2] \"cat\" (count = 4)"), "{text}");
    }

    #[test]
    fn test_stats_lists_fields() {
        console::set_colors_enabled(false);
        let s = CorpusStats {
            shards: 1,
            skipped_shards: 0,
            documents: 0,
            tokens: 0,
            bytes: 3,
            lines: 1,
            decode_errors: 1,
            mean_tokens: 0.0,
            max_tokens: None,
            min_tokens: None,
        };
        let text = stats(&s);
        assert!(text.contains("documents: 0"));
        assert!(text.contains("decode errors: 1"));
        assert!(text.contains("max token document:"));
    }
}
