//! Broken-sentence detection over the ordered paragraph sequence.
//!
//! A pair of adjacent paragraphs is flagged when the first one does not end
//! a sentence and the second one starts with a lowercase letter. Both
//! conditions must hold.
//!
//! Detection runs once, over the paragraph texts as loaded. Running it again
//! after merges would shift adjacency and invalidate suggestion positions
//! that were already handed out.

use serde::Serialize;

/// Two adjacent paragraphs suspected to be halves of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Index of the first half in the paragraph sequence; the second half is
    /// at `position + 1`.
    pub position: usize,
    /// Trimmed text of the first half at detection time.
    pub text_a: String,
    /// Trimmed text of the second half at detection time.
    pub text_b: String,
}

impl Suggestion {
    /// Default merge proposal: both halves joined by one space.
    #[must_use]
    pub fn proposed_merge(&self) -> String {
        format!("{} {}", self.text_a, self.text_b)
    }
}

const TERMINALS: [char; 3] = ['.', '!', '?'];
const CLOSING_QUOTES: [char; 4] = ['"', '\'', '\u{201d}', '\u{2019}'];

/// Whether `text` (already trimmed) ends the way a finished sentence does:
/// terminal punctuation optionally followed by one closing quote, or a
/// closing parenthesis.
#[must_use]
pub fn ends_sentence(text: &str) -> bool {
    let mut tail = text.chars().rev();
    match tail.next() {
        Some(')') => true,
        Some(c) if TERMINALS.contains(&c) => true,
        Some(c) if CLOSING_QUOTES.contains(&c) => tail.next().is_some_and(|p| TERMINALS.contains(&p)),
        _ => false,
    }
}

/// Whether `text` (already trimmed) opens with a lowercase letter.
#[must_use]
pub fn continues_sentence(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_lowercase)
}

/// Scan adjacent paragraph pairs and return merge suggestions in order.
pub fn detect<S: AsRef<str>>(paragraphs: &[S]) -> Vec<Suggestion> {
    let suggestions: Vec<Suggestion> = paragraphs
        .windows(2)
        .enumerate()
        .filter_map(|(position, pair)| {
            let prev = pair[0].as_ref().trim();
            let curr = pair[1].as_ref().trim();
            if prev.is_empty() || curr.is_empty() {
                return None;
            }
            (!ends_sentence(prev) && continues_sentence(curr)).then(|| Suggestion {
                position,
                text_a: prev.to_string(),
                text_b: curr.to_string(),
            })
        })
        .collect();

    tracing::debug!(
        paragraphs = paragraphs.len(),
        suggestions = suggestions.len(),
        "break detection finished"
    );
    suggestions
}
