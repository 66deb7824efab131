use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The affix/dictionary pair could not be fetched or parsed.
    #[error("dictionary unavailable: {0}")]
    DictionaryUnavailable(String),

    /// An offset fell outside the current document, usually because the
    /// document changed between tokenization and use.
    #[error("span {from}..{to} is outside the document (length {len})")]
    InvalidSpanBounds { from: usize, to: usize, len: usize },

    #[error("failed to persist overrides for {document_id}: {reason}")]
    PersistenceFailure { document_id: String, reason: String },

    #[error("no live marker with id {0}")]
    UnknownMarker(u64),

    #[error("suggestion {index} out of range ({available} available)")]
    SuggestionOutOfRange { index: usize, available: usize },
}
