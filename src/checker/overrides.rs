//! Per-document override state and the persistence seam.

use crate::error::{Error, Result};
use crate::WordSpan;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// One specific dismissed instance of a word. Equality covers all three
/// fields, so ignoring one occurrence never hides another.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IgnoredOccurrence {
    pub word: String,
    pub from: usize,
    pub to: usize,
}

impl IgnoredOccurrence {
    pub fn new(word: impl Into<String>, from: usize, to: usize) -> Self {
        Self {
            word: word.into(),
            from,
            to,
        }
    }

    pub fn matches(&self, span: &WordSpan) -> bool {
        self.word == span.word && self.from == span.from && self.to == span.to
    }
}

/// The user's corrections for one document.
///
/// Owned by the engine and handed by reference to the reconciler (read) and
/// to the interaction layer (write).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    personal_dictionary: BTreeSet<String>,
    #[serde(default)]
    autocorrect_map: BTreeMap<String, String>,
    #[serde(default)]
    ignored_occurrences: BTreeSet<IgnoredOccurrence>,
}

impl Overrides {
    /// Add a word to the personal dictionary. Returns `false` if it was
    /// already there.
    pub fn add_word(&mut self, word: &str) -> bool {
        if self.personal_dictionary.contains(word) {
            return false;
        }
        self.personal_dictionary.insert(word.to_string())
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.personal_dictionary.contains(word)
    }

    pub fn personal_dictionary(&self) -> impl Iterator<Item = &str> {
        self.personal_dictionary.iter().map(String::as_str)
    }

    pub fn ignore(&mut self, occurrence: IgnoredOccurrence) -> bool {
        self.ignored_occurrences.insert(occurrence)
    }

    pub fn unignore(&mut self, occurrence: &IgnoredOccurrence) -> bool {
        self.ignored_occurrences.remove(occurrence)
    }

    pub fn is_ignored(&self, span: &WordSpan) -> bool {
        self.ignored_occurrences
            .contains(&IgnoredOccurrence::new(span.word.clone(), span.from, span.to))
    }

    pub fn ignored_occurrences(&self) -> impl Iterator<Item = &IgnoredOccurrence> {
        self.ignored_occurrences.iter()
    }

    /// Record `word -> correction`, replacing any earlier rule for `word`.
    ///
    /// Identity rules are refused. The map is kept free of chains: a rule
    /// keyed by `correction` is dropped and rules that produced `word` now
    /// produce `correction`, so no text is ever corrected twice.
    pub fn set_autocorrect(&mut self, word: &str, correction: &str) -> bool {
        if word == correction || word.is_empty() {
            return false;
        }
        if let Some(dropped) = self.autocorrect_map.remove(correction) {
            tracing::debug!(
                rule = %correction,
                target = %dropped,
                new_rule = %word,
                "dropping autocorrect rule keyed by the new correction"
            );
        }
        self.autocorrect_map.retain(|key, value| {
            if value == word {
                *value = correction.to_string();
            }
            key != value
        });
        self.autocorrect_map
            .insert(word.to_string(), correction.to_string());
        true
    }

    pub fn autocorrection(&self, word: &str) -> Option<&str> {
        self.autocorrect_map.get(word).map(String::as_str)
    }

    pub fn autocorrect_map(&self) -> &BTreeMap<String, String> {
        &self.autocorrect_map
    }

    pub fn is_empty(&self) -> bool {
        self.personal_dictionary.is_empty()
            && self.autocorrect_map.is_empty()
            && self.ignored_occurrences.is_empty()
    }
}

/// External document-settings store.
pub trait OverrideStore {
    fn load(&self, document_id: &str) -> Result<Option<Overrides>>;

    fn save(&self, document_id: &str, overrides: &Overrides) -> Result<()>;

    fn remove(&self, document_id: &str) -> Result<bool>;
}

/// One JSON file per document, named by the SHA-256 of its id.
#[derive(Debug, Clone)]
pub struct FileOverrideStore {
    dir: PathBuf,
}

impl FileOverrideStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, document_id: &str) -> PathBuf {
        let digest = Sha256::digest(document_id.as_bytes());
        self.dir.join(format!("{:x}.json", digest))
    }

    fn failure(document_id: &str, reason: impl ToString) -> Error {
        Error::PersistenceFailure {
            document_id: document_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl OverrideStore for FileOverrideStore {
    fn load(&self, document_id: &str) -> Result<Option<Overrides>> {
        let path = self.path_for(document_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&path).map_err(|e| Self::failure(document_id, e))?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| Self::failure(document_id, e))
    }

    fn save(&self, document_id: &str, overrides: &Overrides) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::failure(document_id, e))?;
        let json =
            serde_json::to_string_pretty(overrides).map_err(|e| Self::failure(document_id, e))?;
        // Write beside the target, then rename, so a crash never leaves half a file.
        let path = self.path_for(document_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| Self::failure(document_id, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::failure(document_id, e))
    }

    fn remove(&self, document_id: &str) -> Result<bool> {
        let path = self.path_for(document_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| Self::failure(document_id, e))?;
        Ok(true)
    }
}

/// Keeps overrides in memory; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryOverrideStore {
    entries: RefCell<HashMap<String, Overrides>>,
}

impl MemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, document_id: &str) -> Option<Overrides> {
        self.entries.borrow().get(document_id).cloned()
    }
}

impl OverrideStore for MemoryOverrideStore {
    fn load(&self, document_id: &str) -> Result<Option<Overrides>> {
        Ok(self.get(document_id))
    }

    fn save(&self, document_id: &str, overrides: &Overrides) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(document_id.to_string(), overrides.clone());
        Ok(())
    }

    fn remove(&self, document_id: &str) -> Result<bool> {
        Ok(self.entries.borrow_mut().remove(document_id).is_some())
    }
}

impl<S: OverrideStore + ?Sized> OverrideStore for std::rc::Rc<S> {
    fn load(&self, document_id: &str) -> Result<Option<Overrides>> {
        (**self).load(document_id)
    }

    fn save(&self, document_id: &str, overrides: &Overrides) -> Result<()> {
        (**self).save(document_id, overrides)
    }

    fn remove(&self, document_id: &str) -> Result<bool> {
        (**self).remove(document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_personal_dictionary_rejects_duplicates() {
        let mut overrides = Overrides::default();
        assert!(overrides.add_word("helo"));
        assert!(!overrides.add_word("helo"));
        assert_eq!(overrides.personal_dictionary().collect::<Vec<_>>(), vec!["helo"]);
    }

    #[test]
    fn test_personal_dictionary_is_case_sensitive() {
        let mut overrides = Overrides::default();
        overrides.add_word("Rustacean");
        assert!(overrides.has_word("Rustacean"));
        assert!(!overrides.has_word("rustacean"));
    }

    #[test]
    fn test_ignore_is_occurrence_specific() {
        let mut overrides = Overrides::default();
        overrides.ignore(IgnoredOccurrence::new("teh", 10, 13));
        assert!(overrides.is_ignored(&WordSpan::new("teh", 10, 13)));
        assert!(!overrides.is_ignored(&WordSpan::new("teh", 50, 53)));
    }

    #[test]
    fn test_unignore() {
        let mut overrides = Overrides::default();
        let occurrence = IgnoredOccurrence::new("teh", 1, 4);
        overrides.ignore(occurrence.clone());
        assert!(overrides.unignore(&occurrence));
        assert!(!overrides.is_ignored(&WordSpan::new("teh", 1, 4)));
    }

    #[test]
    fn test_autocorrect_last_write_wins() {
        let mut overrides = Overrides::default();
        overrides.set_autocorrect("teh", "ten");
        overrides.set_autocorrect("teh", "the");
        assert_eq!(overrides.autocorrection("teh"), Some("the"));
        assert_eq!(overrides.autocorrect_map().len(), 1);
    }

    #[test]
    fn test_autocorrect_drops_rule_keyed_by_correction() {
        let mut overrides = Overrides::default();
        overrides.set_autocorrect("hte", "the");
        overrides.set_autocorrect("teh", "hte");
        assert_eq!(overrides.autocorrection("hte"), None);
        assert_eq!(overrides.autocorrection("teh"), Some("hte"));
    }

    #[test]
    fn test_autocorrect_refuses_identity_and_chains() {
        let mut overrides = Overrides::default();
        assert!(!overrides.set_autocorrect("the", "the"));
        overrides.set_autocorrect("hte", "teh");
        overrides.set_autocorrect("teh", "the");
        overrides.set_autocorrect("the", "teh");
        assert_eq!(overrides.autocorrection("the"), Some("teh"));
        assert_eq!(overrides.autocorrection("teh"), None);
        assert_eq!(overrides.autocorrection("hte"), Some("teh"));
    }

    #[test]
    fn test_file_store_roundtrip_and_remove() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::new(dir.path().join("overrides"));
        assert!(store.load("doc-1").unwrap().is_none());

        let mut overrides = Overrides::default();
        overrides.add_word("Quill");
        overrides.set_autocorrect("teh", "the");
        overrides.ignore(IgnoredOccurrence::new("zorp", 3, 7));
        store.save("doc-1", &overrides).unwrap();

        assert_eq!(store.load("doc-1").unwrap(), Some(overrides));
        assert!(store.load("doc-2").unwrap().is_none());
        assert!(store.remove("doc-1").unwrap());
        assert!(!store.remove("doc-1").unwrap());
    }

    #[test]
    fn test_file_store_reports_corrupt_file() {
        let dir = tempdir().unwrap();
        let store = FileOverrideStore::new(dir.path());
        fs::write(store.path_for("doc"), "not json").unwrap();
        assert!(matches!(
            store.load("doc"),
            Err(Error::PersistenceFailure { .. })
        ));
    }

    #[test]
    fn test_missing_fields_default() {
        let overrides: Overrides = serde_json::from_str(r#"{"personal_dictionary":["a"]}"#).unwrap();
        assert!(overrides.has_word("a"));
        assert!(overrides.autocorrect_map().is_empty());
    }
}
