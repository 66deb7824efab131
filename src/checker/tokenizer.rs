//! Splits the document's text runs into word spans with absolute offsets.

use crate::document::TextRun;
use crate::WordSpan;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// What counts as a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordBoundary {
    /// Maximal runs of `[a-zA-Z]`. Digits, apostrophes and hyphens separate.
    #[default]
    Ascii,
    /// Unicode word segmentation, keeping purely alphabetic segments.
    Unicode,
}

/// Tokenize the runs in document order. Pure: the same runs always yield
/// the same spans.
pub fn tokenize(runs: &[TextRun], boundary: WordBoundary) -> Vec<WordSpan> {
    match boundary {
        WordBoundary::Ascii => tokenize_ascii(runs),
        WordBoundary::Unicode => tokenize_unicode(runs),
    }
}

fn tokenize_ascii(runs: &[TextRun]) -> Vec<WordSpan> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut word_start = 0;
    let mut last_end: Option<usize> = None;

    for run in runs {
        // A gap between runs is a boundary even if both sides are letters.
        if last_end != Some(run.start) {
            flush(&mut spans, &mut current, word_start);
        }

        let mut pos = run.start;
        for ch in run.text.chars() {
            if ch.is_ascii_alphabetic() {
                if current.is_empty() {
                    word_start = pos;
                }
                current.push(ch);
            } else {
                flush(&mut spans, &mut current, word_start);
            }
            pos += 1;
        }
        last_end = Some(pos);
    }

    flush(&mut spans, &mut current, word_start);
    spans
}

fn flush(spans: &mut Vec<WordSpan>, current: &mut String, start: usize) {
    if current.is_empty() {
        return;
    }
    let len = current.chars().count();
    spans.push(WordSpan::new(std::mem::take(current), start, start + len));
}

fn tokenize_unicode(runs: &[TextRun]) -> Vec<WordSpan> {
    let mut spans = Vec::new();

    for (segment, start) in contiguous_segments(runs) {
        let mut chars_seen = 0;
        let mut bytes_seen = 0;
        for (byte, word) in segment.unicode_word_indices() {
            chars_seen += segment[bytes_seen..byte].chars().count();
            bytes_seen = byte;
            let len = word.chars().count();
            if word.chars().all(char::is_alphabetic) {
                let from = start + chars_seen;
                spans.push(WordSpan::new(word, from, from + len));
            }
        }
    }

    spans
}

/// Join runs that touch into one string so words crossing a formatting
/// change are segmented as one.
fn contiguous_segments(runs: &[TextRun]) -> Vec<(String, usize)> {
    let mut segments: Vec<(String, usize, usize)> = Vec::new();
    for run in runs {
        match segments.last_mut() {
            Some((text, _, end)) if *end == run.start => {
                text.push_str(&run.text);
                *end = run.end();
            }
            _ => segments.push((run.text.clone(), run.start, run.end())),
        }
    }
    segments
        .into_iter()
        .map(|(text, start, _)| (text, start))
        .collect()
}

/// The span being typed: its end sits exactly at the caret.
pub fn active_span(spans: &[WordSpan], caret: Option<usize>) -> Option<&WordSpan> {
    let caret = caret?;
    spans.iter().find(|s| s.to == caret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        tokenize(&[TextRun::new(text, 0)], WordBoundary::Ascii)
            .into_iter()
            .map(|s| s.word)
            .collect()
    }

    #[test]
    fn test_separators() {
        assert_eq!(words("Hello, world! 42 times"), vec!["Hello", "world", "times"]);
    }

    #[test]
    fn test_apostrophe_and_hyphen_split() {
        assert_eq!(words("don't"), vec!["don", "t"]);
        assert_eq!(words("co-op"), vec!["co", "op"]);
    }

    #[test]
    fn test_offsets_are_absolute_across_runs() {
        let runs = vec![TextRun::new("helo world", 0), TextRun::new("wrold", 11)];
        let spans = tokenize(&runs, WordBoundary::Ascii);
        assert_eq!(spans[0], WordSpan::new("helo", 0, 4));
        assert_eq!(spans[1], WordSpan::new("world", 5, 10));
        assert_eq!(spans[2], WordSpan::new("wrold", 11, 16));
    }

    #[test]
    fn test_word_continues_across_contiguous_runs() {
        let runs = vec![TextRun::new("mis", 3), TextRun::new("take here", 6)];
        let spans = tokenize(&runs, WordBoundary::Ascii);
        assert_eq!(spans[0], WordSpan::new("mistake", 3, 10));
        assert_eq!(spans[1], WordSpan::new("here", 11, 15));
    }

    #[test]
    fn test_gap_between_runs_breaks_word() {
        let runs = vec![TextRun::new("foo", 0), TextRun::new("bar", 4)];
        let spans = tokenize(&runs, WordBoundary::Ascii);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1], WordSpan::new("bar", 4, 7));
    }

    #[test]
    fn test_non_ascii_letters_separate_in_ascii_mode() {
        assert_eq!(words("naïve"), vec!["na", "ve"]);
    }

    #[test]
    fn test_unicode_mode() {
        let runs = vec![TextRun::new("naïve café don't 42", 10)];
        let spans = tokenize(&runs, WordBoundary::Unicode);
        assert_eq!(spans[0], WordSpan::new("naïve", 10, 15));
        assert_eq!(spans[1], WordSpan::new("café", 16, 20));
        // "don't" is one segment but not purely alphabetic.
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_restartable() {
        let runs = vec![TextRun::new("same input", 0)];
        assert_eq!(
            tokenize(&runs, WordBoundary::Ascii),
            tokenize(&runs, WordBoundary::Ascii)
        );
    }

    #[test]
    fn test_active_span() {
        let spans = tokenize(&[TextRun::new("hello wor", 0)], WordBoundary::Ascii);
        assert_eq!(active_span(&spans, Some(9)).map(|s| s.word.as_str()), Some("wor"));
        assert!(active_span(&spans, Some(6)).is_none());
        assert!(active_span(&spans, None).is_none());
    }
}
