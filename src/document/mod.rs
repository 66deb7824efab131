//! The engine's view of the editor: a tree of text runs addressed by absolute
//! character offsets, plus the mutation and change-notification primitives.
//!
//! [`Document`] is an in-memory host used by the command line front end and
//! by tests. Real editors implement [`DocumentHost`] over their own model.

pub mod markdown;
pub mod plaintext;

use crate::checker::decorations::ActionKind;
use crate::error::{Error, Result};
use std::ops::Range;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Markdown,
    PlainText,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "md" | "mdx" | "markdown" => FileType::Markdown,
            _ => FileType::PlainText,
        }
    }
}

/// One text-bearing node of the document and its absolute start offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub start: usize,
}

impl TextRun {
    pub fn new(text: impl Into<String>, start: usize) -> Self {
        Self {
            text: text.into(),
            start,
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.text.chars().count()
    }
}

/// Who caused a document mutation.
///
/// Change events tagged [`MutationOrigin::Autocorrect`] were produced by a
/// reconciliation pass and must not schedule another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOrigin {
    User,
    Autocorrect,
    Action(ActionKind),
}

impl MutationOrigin {
    pub fn is_self_mutation(&self) -> bool {
        matches!(self, MutationOrigin::Autocorrect)
    }
}

/// Emitted by the host after every mutation. `from..to` is the replaced
/// range before the edit, `inserted` the length of the new text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub origin: MutationOrigin,
    pub from: usize,
    pub to: usize,
    pub inserted: usize,
}

/// Primitives the engine needs from the editor framework.
pub trait DocumentHost {
    fn plain_text(&self) -> String;

    /// Walk the text-bearing nodes in document order.
    fn text_runs(&self) -> Vec<TextRun>;

    /// Length of the linear text in characters.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cursor(&self) -> usize;

    fn set_cursor(&mut self, position: usize);

    fn replace_range(
        &mut self,
        from: usize,
        to: usize,
        text: &str,
        origin: MutationOrigin,
    ) -> Result<()>;

    /// Text currently at `from..to`, or `None` when out of bounds.
    fn text_in(&self, from: usize, to: usize) -> Option<String> {
        if from > to || to > self.len() {
            return None;
        }
        Some(self.plain_text().chars().skip(from).take(to - from).collect())
    }
}

/// How a [`Document`] finds its runs after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RunLayout {
    #[default]
    Lines,
    Markdown,
    /// Caller-provided runs, re-mapped through each edit.
    Fixed,
}

/// In-memory document host.
///
/// The linear text is the whole source; `runs` marks the character ranges
/// that hold checkable prose. Gaps between runs (line breaks, markup) are
/// word boundaries.
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
    runs: Vec<Range<usize>>,
    layout: RunLayout,
    cursor: usize,
    changes: Vec<ChangeEvent>,
}

impl Document {
    /// A plain-text document with one run per line and the cursor at the end.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_layout(text.into(), RunLayout::Lines)
    }

    /// A Markdown document whose runs are the prose outside code.
    pub fn markdown(text: impl Into<String>) -> Self {
        Self::with_layout(text.into(), RunLayout::Markdown)
    }

    /// A document with explicit runs, as an editor's text nodes would be.
    pub fn with_runs(text: impl Into<String>, mut runs: Vec<Range<usize>>) -> Self {
        let mut doc = Self::with_layout(text.into(), RunLayout::Fixed);
        runs.retain(|r| r.start < r.end);
        runs.sort_by_key(|r| r.start);
        doc.runs = runs;
        doc
    }

    fn with_layout(text: String, layout: RunLayout) -> Self {
        let cursor = text.chars().count();
        let mut doc = Self {
            text,
            runs: Vec::new(),
            layout,
            cursor,
            changes: Vec::new(),
        };
        doc.rebuild_runs();
        doc
    }

    /// Build a document from file content, picking the loader by extension.
    pub fn from_file_content(path: &Path, content: &str) -> Self {
        match FileType::from_path(path) {
            FileType::Markdown => Self::markdown(content),
            FileType::PlainText => Self::new(content),
        }
    }

    fn rebuild_runs(&mut self) {
        match self.layout {
            RunLayout::Lines => self.runs = plaintext::line_runs(&self.text),
            RunLayout::Markdown => self.runs = markdown::prose_runs(&self.text),
            RunLayout::Fixed => {}
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Change events emitted since the last call.
    pub fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.changes)
    }

    /// Insert text at the cursor the way a keystroke would.
    pub fn type_text(&mut self, text: &str) -> Result<()> {
        let at = self.cursor;
        self.replace_range(at, at, text, MutationOrigin::User)
    }

    /// 1-based line and column of a character offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        for ch in self.text.chars().take(offset) {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }

    /// The line containing `offset`, for error context.
    pub fn line_at(&self, offset: usize) -> &str {
        let byte = self.byte_offset(offset);
        let start = self.text[..byte].rfind('\n').map_or(0, |i| i + 1);
        let end = self.text[byte..]
            .find('\n')
            .map_or(self.text.len(), |i| byte + i);
        self.text[start..end].trim_end_matches('\r')
    }

    fn byte_offset(&self, char_offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_offset)
            .map_or(self.text.len(), |(i, _)| i)
    }

    /// Re-map the prose runs after `from..to` was replaced by `inserted`
    /// characters. Runs touching the edit absorb it; later runs shift.
    fn remap_runs(&mut self, from: usize, to: usize, inserted: usize) {
        let mut out = Vec::with_capacity(self.runs.len());
        let mut touched: Option<Range<usize>> = None;

        for run in self.runs.drain(..) {
            if run.end < from {
                out.push(run);
            } else if run.start > to {
                out.push(run.start - (to - from) + inserted..run.end - (to - from) + inserted);
            } else {
                touched = Some(match touched {
                    None => run.start.min(from)..run.end.max(to),
                    Some(t) => t.start.min(run.start)..t.end.max(run.end),
                });
            }
        }

        if let Some(t) = touched {
            let end = t.end - (to - from) + inserted;
            out.push(t.start..end);
        }

        out.retain(|r| r.start < r.end);
        out.sort_by_key(|r| r.start);
        self.runs = out;
    }
}

impl DocumentHost for Document {
    fn plain_text(&self) -> String {
        self.text.clone()
    }

    fn text_runs(&self) -> Vec<TextRun> {
        let mut runs = Vec::with_capacity(self.runs.len());
        let mut chars = self.text.chars();
        let mut pos = 0;
        for run in &self.runs {
            let skipped = run.start - pos;
            let text: String = chars
                .by_ref()
                .skip(skipped)
                .take(run.end - run.start)
                .collect();
            pos = run.end;
            runs.push(TextRun::new(text, run.start));
        }
        runs
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, position: usize) {
        self.cursor = position.min(self.len());
    }

    fn replace_range(
        &mut self,
        from: usize,
        to: usize,
        text: &str,
        origin: MutationOrigin,
    ) -> Result<()> {
        let len = self.len();
        if from > to || to > len {
            return Err(Error::InvalidSpanBounds { from, to, len });
        }

        let start = self.byte_offset(from);
        let end = self.byte_offset(to);
        self.text.replace_range(start..end, text);

        let inserted = text.chars().count();
        if self.layout == RunLayout::Fixed {
            self.remap_runs(from, to, inserted);
        } else {
            self.rebuild_runs();
        }

        if self.cursor >= to {
            self.cursor = self.cursor - (to - from) + inserted;
        } else if self.cursor > from {
            self.cursor = from + inserted;
        }

        self.changes.push(ChangeEvent {
            origin,
            from,
            to,
            inserted,
        });
        Ok(())
    }

    fn text_in(&self, from: usize, to: usize) -> Option<String> {
        if from > to || to > self.len() {
            return None;
        }
        let start = self.byte_offset(from);
        let end = self.byte_offset(to);
        Some(self.text[start..end].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(
            FileType::from_path(&PathBuf::from("notes.md")),
            FileType::Markdown
        );
        assert_eq!(
            FileType::from_path(&PathBuf::from("chapter.MARKDOWN")),
            FileType::Markdown
        );
        assert_eq!(
            FileType::from_path(&PathBuf::from("draft.txt")),
            FileType::PlainText
        );
    }

    #[test]
    fn test_runs_carry_absolute_offsets() {
        let doc = Document::new("first line\nsecond");
        let runs = doc.text_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], TextRun::new("first line", 0));
        assert_eq!(runs[1], TextRun::new("second", 11));
    }

    #[test]
    fn test_replace_shifts_later_runs_and_cursor() {
        let mut doc = Document::new("helo\nworld");
        doc.set_cursor(10);
        doc.replace_range(0, 4, "hello", MutationOrigin::User)
            .unwrap();

        assert_eq!(doc.text(), "hello\nworld");
        assert_eq!(doc.cursor(), 11);
        let runs = doc.text_runs();
        assert_eq!(runs[1], TextRun::new("world", 6));
    }

    #[test]
    fn test_cursor_inside_replaced_range_moves_to_end_of_insert() {
        let mut doc = Document::new("abcdef");
        doc.set_cursor(3);
        doc.replace_range(2, 5, "X", MutationOrigin::User).unwrap();
        assert_eq!(doc.cursor(), 3);
        assert_eq!(doc.text(), "abXf");
    }

    #[test]
    fn test_typing_extends_run() {
        let mut doc = Document::new("hel");
        doc.type_text("lo").unwrap();
        assert_eq!(doc.text_runs(), vec![TextRun::new("hello", 0)]);
        assert_eq!(doc.cursor(), 5);
    }

    #[test]
    fn test_typing_into_empty_document() {
        let mut doc = Document::new("");
        assert!(doc.text_runs().is_empty());
        doc.type_text("hi").unwrap();
        assert_eq!(doc.text_runs(), vec![TextRun::new("hi", 0)]);
    }

    #[test]
    fn test_joining_lines_merges_runs() {
        let mut doc = Document::new("foo\nbar");
        doc.replace_range(3, 4, " ", MutationOrigin::User).unwrap();
        assert_eq!(doc.text_runs(), vec![TextRun::new("foo bar", 0)]);
    }

    #[test]
    fn test_fixed_runs_follow_edits() {
        // "bold" and "plain" nodes with a separator between them.
        let mut doc = Document::with_runs("mis|take here", vec![0..3, 4..13]);
        doc.replace_range(0, 3, "miss", MutationOrigin::User).unwrap();
        assert_eq!(
            doc.text_runs(),
            vec![TextRun::new("miss", 0), TextRun::new("take here", 5)]
        );

        doc.set_cursor(4);
        doc.type_text("!").unwrap();
        assert_eq!(doc.text_runs()[0], TextRun::new("miss!", 0));
        assert_eq!(doc.text_runs()[1], TextRun::new("take here", 6));
    }

    #[test]
    fn test_markdown_runs_rebuilt_after_edit() {
        let mut doc = Document::markdown("Some `code` text");
        doc.replace_range(12, 16, "prose", MutationOrigin::User)
            .unwrap();
        let runs: Vec<String> = doc.text_runs().into_iter().map(|r| r.text).collect();
        assert_eq!(runs, vec!["Some ", " prose"]);
    }

    #[test]
    fn test_out_of_bounds_replace_is_rejected() {
        let mut doc = Document::new("short");
        let err = doc
            .replace_range(3, 10, "x", MutationOrigin::Autocorrect)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSpanBounds { len: 5, .. }));
        assert_eq!(doc.text(), "short");
        assert!(doc.drain_changes().is_empty());
    }

    #[test]
    fn test_change_events_carry_origin() {
        let mut doc = Document::new("teh");
        doc.replace_range(0, 3, "the", MutationOrigin::Autocorrect)
            .unwrap();
        let changes = doc.drain_changes();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].origin.is_self_mutation());
        assert_eq!(changes[0].inserted, 3);
    }

    #[test]
    fn test_line_col_and_context() {
        let doc = Document::new("one\ntwo three");
        assert_eq!(doc.line_col(8), (2, 5));
        assert_eq!(doc.line_at(8), "two three");
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let mut doc = Document::new("café teh");
        assert_eq!(doc.text_in(5, 8).as_deref(), Some("teh"));
        doc.replace_range(5, 8, "the", MutationOrigin::User).unwrap();
        assert_eq!(doc.text(), "café the");
    }
}
