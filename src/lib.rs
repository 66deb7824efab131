pub mod checker;
pub mod cli;
pub mod config;
pub mod dict;
pub mod document;
pub mod error;

pub use checker::Engine;
pub use config::Config;
pub use error::Error;

use serde::{Deserialize, Serialize};

/// A word found by the tokenizer, with half-open character offsets into the
/// document's linear text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordSpan {
    pub word: String,
    pub from: usize,
    pub to: usize,
}

impl WordSpan {
    pub fn new(word: impl Into<String>, from: usize, to: usize) -> Self {
        Self {
            word: word.into(),
            from,
            to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Spelling,
}

/// A word span judged misspelled and not suppressed by any override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedError {
    pub word: String,
    pub from: usize,
    pub to: usize,
    pub suggestions: Vec<String>,
    pub kind: ErrorKind,
}

impl FlaggedError {
    pub fn span(&self) -> WordSpan {
        WordSpan::new(self.word.clone(), self.from, self.to)
    }
}

/// Outcome of checking one file from the command line.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    pub error_count: usize,
    pub fixed_count: usize,
    pub errors: Vec<SpellError>,
}

/// A flagged error located for display.
#[derive(Debug, Clone)]
pub struct SpellError {
    pub word: String,
    pub line: usize,
    pub column: usize,
    pub context: String,
    pub suggestions: Vec<String>,
}

impl SpellError {
    pub fn locate(error: &FlaggedError, doc: &document::Document) -> Self {
        let (line, column) = doc.line_col(error.from);
        Self {
            word: error.word.clone(),
            line,
            column,
            context: doc.line_at(error.from).trim().to_string(),
            suggestions: error.suggestions.clone(),
        }
    }
}
