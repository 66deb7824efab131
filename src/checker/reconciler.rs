//! Turns word spans into flagged errors and autocorrect mutations.
//!
//! A pass reads one immutable span list and returns its whole result at
//! once; nothing is published until the caller has applied the mutations.

use crate::checker::dictionary::Dictionary;
use crate::checker::overrides::Overrides;
use crate::{ErrorKind, FlaggedError, WordSpan};
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;

/// Why a pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Debounced pass after typing. The word under the caret is skipped.
    Passive,
    /// The user asked for a check (e.g. right-click). Every word is checked.
    Explicit,
}

pub struct ReconcileInput<'a> {
    pub spans: &'a [WordSpan],
    /// `None` while the dictionary is loading or unavailable: fail open.
    pub dictionary: Option<&'a dyn Dictionary>,
    pub overrides: &'a Overrides,
    /// Words approved outside this document (the user's word list file).
    pub shared_words: &'a HashSet<String>,
    /// Character ranges matched by ignore patterns.
    pub suppressed: &'a [Range<usize>],
    pub caret: Option<usize>,
    pub trigger: Trigger,
    pub document_len: usize,
    pub max_suggestions: usize,
    pub min_word_length: usize,
    pub autocorrect: bool,
}

/// Replace `from..to` (currently `original`) with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub from: usize,
    pub to: usize,
    pub original: String,
    pub replacement: String,
}

impl Mutation {
    pub fn delta(&self) -> isize {
        self.replacement.chars().count() as isize - (self.to - self.from) as isize
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub errors: Vec<FlaggedError>,
    /// Sorted by descending `from`; apply in order.
    pub mutations: Vec<Mutation>,
    /// Spans dropped for falling outside the document.
    pub dropped: usize,
}

pub fn reconcile(input: &ReconcileInput<'_>) -> Reconciliation {
    let mut result = Reconciliation::default();

    for span in input.spans {
        if input.overrides.is_ignored(span) {
            continue;
        }

        if span.from >= span.to || span.to > input.document_len {
            tracing::debug!(
                word = %span.word,
                from = span.from,
                to = span.to,
                len = input.document_len,
                "dropping span outside document"
            );
            result.dropped += 1;
            continue;
        }

        if overlaps_any(span, input.suppressed) {
            continue;
        }

        let active = input.caret == Some(span.to);

        if input.autocorrect && !active && is_complete(span, input.document_len) {
            if let Some(correction) = input.overrides.autocorrection(&span.word) {
                result.mutations.push(Mutation {
                    from: span.from,
                    to: span.to,
                    original: span.word.clone(),
                    replacement: correction.to_string(),
                });
                continue;
            }
        }

        if active && input.trigger == Trigger::Passive {
            continue;
        }

        let Some(dictionary) = input.dictionary else {
            continue;
        };

        if span.word.chars().count() < input.min_word_length
            || input.overrides.has_word(&span.word)
            || input.shared_words.contains(&span.word)
            || dictionary.is_correct(&span.word)
        {
            continue;
        }

        let mut suggestions = dictionary.suggest(&span.word);
        suggestions.truncate(input.max_suggestions);

        result.errors.push(FlaggedError {
            word: span.word.clone(),
            from: span.from,
            to: span.to,
            suggestions,
            kind: ErrorKind::Spelling,
        });
    }

    result.mutations.sort_by(|a, b| b.from.cmp(&a.from));
    result
}

/// A token is complete once a boundary character follows it. Spans are
/// maximal, so anything after `to` is a boundary.
fn is_complete(span: &WordSpan, document_len: usize) -> bool {
    span.to < document_len
}

fn overlaps_any(span: &WordSpan, ranges: &[Range<usize>]) -> bool {
    ranges
        .iter()
        .any(|r| r.start < span.to && span.from < r.end)
}

/// Move errors that sit after applied mutations by the mutations' length
/// change, keeping them aligned with the edited document.
pub fn shift_errors(errors: &mut [FlaggedError], applied: &[Mutation]) {
    for error in errors.iter_mut() {
        let delta: isize = applied
            .iter()
            .filter(|m| m.to <= error.from)
            .map(Mutation::delta)
            .sum();
        error.from = error.from.saturating_add_signed(delta);
        error.to = error.to.saturating_add_signed(delta);
    }
}

/// Character ranges of `text` matched by any of the patterns.
pub fn suppressed_ranges(text: &str, patterns: &[Regex]) -> Vec<Range<usize>> {
    if patterns.is_empty() {
        return Vec::new();
    }

    let mut byte_ranges: Vec<Range<usize>> = patterns
        .iter()
        .flat_map(|p| p.find_iter(text).map(|m| m.range()))
        .collect();
    if byte_ranges.is_empty() {
        return Vec::new();
    }
    byte_ranges.sort_by_key(|r| r.start);

    let mut ranges = Vec::with_capacity(byte_ranges.len());
    let mut chars = 0;
    let mut bytes = 0;
    for range in byte_ranges {
        chars += text[bytes..range.start].chars().count();
        bytes = range.start;
        let len = text[range].chars().count();
        ranges.push(chars..chars + len);
    }
    ranges
}
