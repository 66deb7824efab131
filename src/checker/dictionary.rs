//! Dictionary providers: Hunspell affix/dictionary pairs and flat word
//! lists compiled to an FST.

use crate::error::{Error, Result};
use fst::{Automaton, IntoStreamer, Set, SetBuilder, Streamer};
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only spelling oracle. Implementations do not change after load, so
/// `is_correct` is deterministic.
pub trait Dictionary: Send + Sync {
    fn is_correct(&self, word: &str) -> bool;

    /// Candidates ranked best-first. Callers truncate.
    fn suggest(&self, word: &str) -> Vec<String>;
}

impl<D: Dictionary + ?Sized> Dictionary for Arc<D> {
    fn is_correct(&self, word: &str) -> bool {
        (**self).is_correct(word)
    }

    fn suggest(&self, word: &str) -> Vec<String> {
        (**self).suggest(word)
    }
}

/// Where affix or dictionary text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionarySource {
    File(PathBuf),
    Url(String),
    Inline(String),
}

impl DictionarySource {
    async fn fetch(&self) -> Result<String> {
        match self {
            DictionarySource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| unavailable(format!("{}: {}", path.display(), e))),
            DictionarySource::Url(url) => {
                let response = reqwest::get(url)
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| unavailable(format!("{}: {}", url, e)))?;
                response
                    .text()
                    .await
                    .map_err(|e| unavailable(format!("{}: {}", url, e)))
            }
            DictionarySource::Inline(text) => Ok(text.clone()),
        }
    }
}

impl fmt::Display for DictionarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictionarySource::File(path) => write!(f, "{}", path.display()),
            DictionarySource::Url(url) => write!(f, "{}", url),
            DictionarySource::Inline(_) => write!(f, "<inline>"),
        }
    }
}

fn unavailable(reason: impl Into<String>) -> Error {
    Error::DictionaryUnavailable(reason.into())
}

/// Fetch an affix/dictionary pair and compile it. Parsing runs on the
/// blocking pool so the caller's task stays responsive.
pub async fn load(affix: DictionarySource, dictionary: DictionarySource) -> Result<HunspellDictionary> {
    let (aff, dic) = tokio::try_join!(affix.fetch(), dictionary.fetch())?;
    tokio::task::spawn_blocking(move || HunspellDictionary::new(&aff, &dic))
        .await
        .map_err(|e| unavailable(format!("dictionary parser task failed: {}", e)))?
}

/// Hunspell-compatible dictionary.
pub struct HunspellDictionary {
    inner: spellbook::Dictionary,
}

impl HunspellDictionary {
    pub fn new(aff: &str, dic: &str) -> Result<Self> {
        let inner = spellbook::Dictionary::new(aff, dic)
            .map_err(|e| unavailable(format!("failed to parse dictionary: {}", e)))?;
        Ok(Self { inner })
    }
}

impl Dictionary for HunspellDictionary {
    fn is_correct(&self, word: &str) -> bool {
        self.inner.check(word)
    }

    fn suggest(&self, word: &str) -> Vec<String> {
        let mut suggestions = Vec::with_capacity(5);
        self.inner.suggest(word, &mut suggestions);
        suggestions
    }
}

/// Word list backed by an FST set. Words are stored lowercase.
pub struct WordListDictionary<D = Vec<u8>> {
    set: Set<D>,
}

impl WordListDictionary<Vec<u8>> {
    /// Build an in-memory word list.
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        sorted.sort();
        sorted.dedup();

        let set = Set::from_iter(sorted)
            .map_err(|e| unavailable(format!("failed to build word list: {}", e)))?;
        Ok(Self { set })
    }
}

impl WordListDictionary<Mmap> {
    /// Memory-map a word list previously written by [`WordListDictionary::build`].
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
        // SAFETY: the file is only ever replaced whole by `build`, never
        // truncated in place while mapped.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
        let set = Set::new(mmap)
            .map_err(|e| unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Self { set })
    }
}

impl WordListDictionary {
    /// Compile a word list to disk.
    pub fn build(words: &[String], output_path: &Path) -> Result<()> {
        let mut sorted: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        sorted.sort();
        sorted.dedup();

        let write_err = |e: &dyn fmt::Display| {
            unavailable(format!("{}: {}", output_path.display(), e))
        };

        let file = File::create(output_path).map_err(|e| write_err(&e))?;
        let mut builder = SetBuilder::new(BufWriter::new(file)).map_err(|e| write_err(&e))?;
        for word in sorted {
            builder.insert(word.as_bytes()).map_err(|e| write_err(&e))?;
        }
        let mut writer = builder.into_inner().map_err(|e| write_err(&e))?;
        writer.flush().map_err(|e| write_err(&e))?;
        Ok(())
    }
}

impl<D: AsRef<[u8]>> WordListDictionary<D> {
    pub fn contains(&self, word: &str) -> bool {
        self.set.contains(word.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Get all words with a given prefix
    pub fn words_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut results = Vec::new();
        let mut stream = self
            .set
            .search(fst::automaton::Str::new(prefix).starts_with())
            .into_stream();

        while let Some(key) = stream.next() {
            if let Ok(word) = String::from_utf8(key.to_vec()) {
                results.push(word);
            }
        }

        results
    }

    /// Words whose length is within `slack` characters of `len`, in order.
    pub fn words_near_length(&self, len: usize, slack: usize, limit: usize) -> Vec<String> {
        let mut results = Vec::new();
        let mut stream = self.set.stream();

        while let Some(key) = stream.next() {
            if let Ok(word) = std::str::from_utf8(key) {
                if word.chars().count().abs_diff(len) <= slack {
                    results.push(word.to_string());
                    if results.len() >= limit {
                        break;
                    }
                }
            }
        }

        results
    }
}

impl<D: AsRef<[u8]> + Send + Sync> Dictionary for WordListDictionary<D> {
    fn is_correct(&self, word: &str) -> bool {
        self.contains(word) || self.contains(&word.to_lowercase())
    }

    fn suggest(&self, word: &str) -> Vec<String> {
        super::suggestions::generate(&word.to_lowercase(), self, usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::fixtures::{TEST_AFF, TEST_DIC};
    use tempfile::tempdir;

    #[test]
    fn test_build_and_open_word_list() {
        let dir = tempdir().unwrap();
        let dict_path = dir.path().join("test.dict");

        let words = vec!["hello".to_string(), "World".to_string(), "test".to_string()];
        WordListDictionary::build(&words, &dict_path).unwrap();

        let dict = WordListDictionary::open(&dict_path).unwrap();
        assert!(dict.is_correct("hello"));
        assert!(dict.is_correct("World"));
        assert!(dict.is_correct("world"));
        assert!(!dict.is_correct("notfound"));
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn test_word_list_is_deterministic() {
        let dict = WordListDictionary::from_words(["hello", "world"]).unwrap();
        for _ in 0..3 {
            assert!(dict.is_correct("hello"));
            assert!(!dict.is_correct("helo"));
        }
    }

    #[test]
    fn test_word_list_suggestions() {
        let dict = WordListDictionary::from_words(["hello", "help", "world"]).unwrap();
        let suggestions = dict.suggest("helo");
        assert_eq!(suggestions.first().map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_hunspell_check_and_suggest() {
        let dict = HunspellDictionary::new(TEST_AFF, TEST_DIC).unwrap();
        assert!(dict.is_correct("hello"));
        assert!(dict.is_correct("friend"));
        assert!(!dict.is_correct("helo"));
        assert!(dict.suggest("helo").contains(&"hello".to_string()));
    }

    #[tokio::test]
    async fn test_load_inline_sources() {
        let dict = load(
            DictionarySource::Inline(TEST_AFF.to_string()),
            DictionarySource::Inline(TEST_DIC.to_string()),
        )
        .await
        .unwrap();
        assert!(dict.is_correct("world"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_unavailable() {
        let dir = tempdir().unwrap();
        let result = load(
            DictionarySource::File(dir.path().join("missing.aff")),
            DictionarySource::File(dir.path().join("missing.dic")),
        )
        .await;
        assert!(matches!(result, Err(Error::DictionaryUnavailable(_))));
    }
}
