//! Unicode word tokenization and n-gram windows
//!
//! Tokens are unicode word-boundary segments (UAX #29) that contain at least
//! one non-whitespace character, so punctuation survives as its own token.
//! N-gram keys are the window's tokens joined by a single space.

use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

/// Separator used to build canonical n-gram keys
pub const KEY_SEPARATOR: char = ' ';

fn not_whitespace(segment: &str) -> bool {
    segment.chars().any(|c| !c.is_whitespace())
}

/// Split text into tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split_word_bounds().filter(|w| not_whitespace(w))
}

/// Number of tokens in a text without collecting them
pub fn count_tokens(text: &str) -> usize {
    tokenize(text).count()
}

/// Sliding window over a token stream that builds n-gram keys in place.
///
/// The key buffer is reused between pushes so the hot loop only allocates
/// when a caller decides to keep a key.
pub struct NgramWindow<'a> {
    n: usize,
    tokens: VecDeque<&'a str>,
    key: String,
}

impl<'a> NgramWindow<'a> {
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "n-gram width must be at least 1");
        Self {
            n,
            tokens: VecDeque::with_capacity(n),
            key: String::with_capacity(n * 8),
        }
    }

    /// Push the next token; returns the completed key once the window is full.
    pub fn push(&mut self, token: &'a str) -> Option<&str> {
        if self.tokens.len() == self.n {
            self.tokens.pop_front();
        }
        self.tokens.push_back(token);

        if self.tokens.len() < self.n {
            return None;
        }

        self.key.clear();
        for (i, tok) in self.tokens.iter().enumerate() {
            if i > 0 {
                self.key.push(KEY_SEPARATOR);
            }
            self.key.push_str(tok);
        }
        Some(&self.key)
    }

    /// Tokens of the current (full) window
    pub fn tokens(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.tokens.iter().copied()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.key.clear();
    }
}

/// Lazily yield every n-gram key of `text`, in document order.
pub fn ngrams<'a>(text: &'a str, n: usize) -> Ngrams<'a, impl Iterator<Item = &'a str>> {
    Ngrams {
        tokens: tokenize(text),
        window: NgramWindow::new(n),
    }
}

/// Iterator returned by [`ngrams`]
pub struct Ngrams<'a, I: Iterator<Item = &'a str>> {
    tokens: I,
    window: NgramWindow<'a>,
}

impl<'a, I: Iterator<Item = &'a str>> Iterator for Ngrams<'a, I> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for token in self.tokens.by_ref() {
            if let Some(key) = self.window.push(token) {
                return Some(key.to_string());
            }
        }
        None
    }
}

/// Split a canonical key back into its tokens.
pub fn key_tokens(key: &str) -> Vec<&str> {
    key.split(KEY_SEPARATOR).collect()
}
