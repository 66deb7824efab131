pub mod decorations;
pub mod dictionary;
pub mod overrides;
pub mod reconciler;
pub mod scheduler;
pub mod suggestions;
pub mod tokenizer;

use crate::document::{ChangeEvent, DocumentHost, MutationOrigin};
use crate::error::{Error, Result};
use crate::{Config, FlaggedError, WordSpan};
use decorations::{Action, ActionKind, Decoration, MarkerId, MarkerSet, Resolution};
use dictionary::{Dictionary, DictionarySource};
use overrides::{IgnoredOccurrence, OverrideStore, Overrides};
use reconciler::{reconcile, shift_errors, suppressed_ranges, Mutation, ReconcileInput, Trigger};
use regex::Regex;
use scheduler::{PendingPass, Scheduler};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokenizer::{tokenize, WordBoundary};

type Listener = Box<dyn FnMut(&[FlaggedError])>;

/// Where the engine's dictionary stands. Anything but `Ready` is fail-open.
#[derive(Clone)]
pub enum DictionaryState {
    Missing,
    Loading { generation: u64 },
    Ready(Arc<dyn Dictionary>),
    Unavailable { reason: String },
}

impl DictionaryState {
    pub fn is_ready(&self) -> bool {
        matches!(self, DictionaryState::Ready(_))
    }
}

impl std::fmt::Debug for DictionaryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DictionaryState::Missing => write!(f, "Missing"),
            DictionaryState::Loading { generation } => write!(f, "Loading({})", generation),
            DictionaryState::Ready(_) => write!(f, "Ready"),
            DictionaryState::Unavailable { reason } => write!(f, "Unavailable({})", reason),
        }
    }
}

/// A dictionary load the host should run on its async runtime and hand
/// back through [`Engine::finish_dictionary_load`].
#[derive(Debug, Clone)]
pub struct LoadRequest {
    generation: u64,
    affix: DictionarySource,
    dictionary: DictionarySource,
}

impl LoadRequest {
    pub async fn run(self) -> LoadOutcome {
        let result = dictionary::load(self.affix, self.dictionary)
            .await
            .map(|d| Arc::new(d) as Arc<dyn Dictionary>);
        LoadOutcome {
            generation: self.generation,
            result,
        }
    }
}

pub struct LoadOutcome {
    generation: u64,
    result: Result<Arc<dyn Dictionary>>,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub trigger: Trigger,
    pub flagged: usize,
    pub corrected: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    max_suggestions: usize,
    min_word_length: usize,
    boundary: WordBoundary,
    autocorrect: bool,
}

/// Spell-check engine for one document.
///
/// Single-threaded: every method runs on the editor's event loop. The engine
/// reads the document through [`DocumentHost`], writes to it only when
/// replacing text, and owns the override state it hands to the reconciler.
pub struct Engine {
    document_id: String,
    settings: Settings,
    ignore_patterns: Vec<Regex>,
    dictionary: DictionaryState,
    sources: Option<(DictionarySource, DictionarySource)>,
    generation: u64,
    overrides: Overrides,
    shared_words: HashSet<String>,
    store: Box<dyn OverrideStore>,
    dirty: bool,
    scheduler: Scheduler,
    markers: MarkerSet,
    listeners: Vec<Listener>,
}

impl Engine {
    pub fn new(
        document_id: impl Into<String>,
        config: &Config,
        store: impl OverrideStore + 'static,
    ) -> Self {
        let document_id = document_id.into();

        // Compile ignore patterns
        let mut ignore_patterns = Vec::new();
        for pattern in &config.ignore_patterns {
            match Regex::new(pattern) {
                Ok(re) => ignore_patterns.push(re),
                Err(e) => tracing::warn!(%pattern, error = %e, "invalid ignore pattern"),
            }
        }

        let overrides = match store.load(&document_id) {
            Ok(Some(overrides)) => overrides,
            Ok(None) => Overrides::default(),
            Err(e) => {
                tracing::warn!(document = %document_id, error = %e, "could not load overrides");
                Overrides::default()
            }
        };

        let mut engine = Self {
            document_id,
            settings: Settings {
                max_suggestions: config.max_suggestions,
                min_word_length: config.min_word_length,
                boundary: config.word_boundary,
                autocorrect: config.autocorrect,
            },
            ignore_patterns,
            dictionary: DictionaryState::Missing,
            sources: None,
            generation: 0,
            overrides,
            shared_words: HashSet::new(),
            store: Box::new(store),
            dirty: false,
            scheduler: Scheduler::new(Duration::from_millis(config.debounce_ms)),
            markers: MarkerSet::new(),
            listeners: Vec::new(),
        };

        if let Some(path) = &config.personal_dictionary {
            match fs::read_to_string(path) {
                Ok(content) => engine.extend_shared_words(parse_word_list(&content)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not read personal dictionary"),
            }
        }

        engine
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    // ---- dictionary ----

    /// Remember where the dictionary comes from so loads can be (re)started.
    pub fn with_dictionary_sources(
        mut self,
        affix: DictionarySource,
        dictionary: DictionarySource,
    ) -> Self {
        self.sources = Some((affix, dictionary));
        self
    }

    pub fn dictionary_state(&self) -> &DictionaryState {
        &self.dictionary
    }

    /// Install an already-loaded dictionary. Any load still in flight is
    /// superseded.
    pub fn set_dictionary(&mut self, dictionary: Arc<dyn Dictionary>, now: Instant) {
        self.generation += 1;
        self.dictionary = DictionaryState::Ready(dictionary);
        self.scheduler.arm(now);
    }

    /// Begin loading from the configured sources. Returns `None` when there
    /// are no sources or a load is already running.
    pub fn start_dictionary_load(&mut self) -> Option<LoadRequest> {
        let (affix, dictionary) = self.sources.clone()?;
        if matches!(self.dictionary, DictionaryState::Loading { .. }) {
            return None;
        }
        self.generation += 1;
        self.dictionary = DictionaryState::Loading {
            generation: self.generation,
        };
        tracing::debug!(%affix, %dictionary, generation = self.generation, "loading dictionary");
        Some(LoadRequest {
            generation: self.generation,
            affix,
            dictionary,
        })
    }

    /// Apply a finished load. Outcomes of superseded loads are discarded.
    /// Returns whether the outcome was applied.
    pub fn finish_dictionary_load(&mut self, outcome: LoadOutcome, now: Instant) -> bool {
        match self.dictionary {
            DictionaryState::Loading { generation } if generation == outcome.generation => {}
            _ => {
                tracing::debug!(generation = outcome.generation, "discarding stale dictionary load");
                return false;
            }
        }

        match outcome.result {
            Ok(dictionary) => {
                tracing::debug!(document = %self.document_id, "dictionary ready");
                self.dictionary = DictionaryState::Ready(dictionary);
                // Words typed while loading have not been checked yet.
                self.scheduler.arm(now);
            }
            Err(e) => {
                tracing::warn!(error = %e, "dictionary unavailable, spell checking disabled until next explicit check");
                self.dictionary = DictionaryState::Unavailable {
                    reason: e.to_string(),
                };
            }
        }
        true
    }

    /// Words approved for every document (the user's word list file).
    pub fn extend_shared_words<I: IntoIterator<Item = String>>(&mut self, words: I) {
        self.shared_words.extend(words);
    }

    // ---- events & passes ----

    pub fn on_flagged_errors_changed(&mut self, listener: impl FnMut(&[FlaggedError]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Feed a change notification from the host. Returns whether a pass was
    /// scheduled.
    pub fn on_change(&mut self, event: &ChangeEvent, now: Instant) -> bool {
        match event.origin {
            MutationOrigin::Autocorrect => {
                tracing::trace!(from = event.from, to = event.to, "ignoring self-mutation");
                return false;
            }
            // Markers were already adjusted by the action itself.
            MutationOrigin::Action(_) => {}
            MutationOrigin::User => {
                let removed = self.markers.remove_overlapping(event.from, event.to);
                let delta = event.inserted as isize - (event.to - event.from) as isize;
                self.markers.shift_after(event.to, delta);
                if removed > 0 {
                    self.notify();
                }
            }
        }
        self.scheduler.arm(now);
        true
    }

    pub fn pending_pass(&self) -> Option<PendingPass> {
        self.scheduler.pending()
    }

    /// Run the debounced pass if it is due.
    pub fn poll<H: DocumentHost + ?Sized>(&mut self, doc: &mut H, now: Instant) -> Option<PassReport> {
        self.scheduler.take_due(now)?;
        Some(self.run_pass(doc, Trigger::Passive))
    }

    /// Explicit, user-invoked check. Includes the word under the caret and,
    /// if the dictionary failed earlier, asks the host to retry the load.
    pub fn check_now<H: DocumentHost + ?Sized>(
        &mut self,
        doc: &mut H,
    ) -> (PassReport, Option<LoadRequest>) {
        let retry = match self.dictionary {
            DictionaryState::Unavailable { .. } => self.start_dictionary_load(),
            _ => None,
        };
        self.scheduler.cancel();
        (self.run_pass(doc, Trigger::Explicit), retry)
    }

    fn run_pass<H: DocumentHost + ?Sized>(&mut self, doc: &mut H, trigger: Trigger) -> PassReport {
        let runs = doc.text_runs();
        let spans = tokenize(&runs, self.settings.boundary);
        let suppressed = if self.ignore_patterns.is_empty() {
            Vec::new()
        } else {
            suppressed_ranges(&doc.plain_text(), &self.ignore_patterns)
        };

        let dictionary = match &self.dictionary {
            DictionaryState::Ready(d) => Some(d.as_ref()),
            _ => None,
        };

        let result = reconcile(&ReconcileInput {
            spans: &spans,
            dictionary,
            overrides: &self.overrides,
            shared_words: &self.shared_words,
            suppressed: &suppressed,
            caret: Some(doc.cursor()),
            trigger,
            document_len: doc.len(),
            max_suggestions: self.settings.max_suggestions,
            min_word_length: self.settings.min_word_length,
            autocorrect: self.settings.autocorrect,
        });

        let mut dropped = result.dropped;
        let applied = apply_mutations(doc, &result.mutations, &mut dropped);

        let mut errors = result.errors;
        shift_errors(&mut errors, &applied);

        let report = PassReport {
            trigger,
            flagged: errors.len(),
            corrected: applied.len(),
            dropped,
        };
        tracing::debug!(
            document = %self.document_id,
            ?trigger,
            spans = spans.len(),
            flagged = report.flagged,
            corrected = report.corrected,
            dropped = report.dropped,
            "reconciliation pass"
        );

        self.markers.replace_all(errors);
        self.notify();
        report
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let errors = self.markers.errors();
        for listener in &mut self.listeners {
            listener(&errors);
        }
    }

    // ---- rendering ----

    pub fn flagged_errors(&self) -> Vec<FlaggedError> {
        self.markers.errors()
    }

    pub fn decorations(&self) -> Vec<Decoration> {
        self.markers.decorations()
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    // ---- user actions ----

    /// Apply an action to a live marker.
    pub fn resolve<H: DocumentHost + ?Sized>(
        &mut self,
        doc: &mut H,
        id: MarkerId,
        action: Action,
        now: Instant,
    ) -> Result<Resolution> {
        let error = self.markers.get(id).cloned().ok_or(Error::UnknownMarker(id))?;

        match action {
            Action::Replace(index) => {
                let suggestion = pick(&error, index)?;
                self.replace_span(doc, &error.span(), &suggestion, ActionKind::Replace, now)?;
            }
            Action::Ignore => self.ignore(&error.word, error.from, error.to),
            Action::AddToDictionary => {
                self.add_to_personal_dictionary(&error.word, now);
            }
            Action::AlwaysCorrect => {
                let suggestion = pick(&error, 0)?;
                self.always_correct(doc, &error.span(), &suggestion, now)?;
            }
        }

        Ok(Resolution {
            id,
            word: error.word,
            state: action.resolved_state(),
        })
    }

    /// Replace `from..to` with `suggestion` and put the cursor after it.
    pub fn replace<H: DocumentHost + ?Sized>(
        &mut self,
        doc: &mut H,
        from: usize,
        to: usize,
        suggestion: &str,
        now: Instant,
    ) -> Result<()> {
        self.replace_range(doc, from, to, suggestion, ActionKind::Replace, now)
    }

    /// Dismiss this one occurrence.
    pub fn ignore(&mut self, word: &str, from: usize, to: usize) {
        self.overrides
            .ignore(IgnoredOccurrence::new(word, from, to));
        self.persist();
        if self.markers.remove_at(from, to, word).is_some() {
            self.notify();
        }
    }

    /// Accept `word` everywhere. Adding a word twice is a silent no-op.
    pub fn add_to_personal_dictionary(&mut self, word: &str, now: Instant) -> bool {
        let added = self.overrides.add_word(word);
        if added {
            self.persist();
        }
        if self.markers.remove_word(word) > 0 {
            self.notify();
        }
        self.scheduler.arm(now);
        added
    }

    /// Record `word -> correction` without touching the document.
    pub fn add_autocorrect_rule(&mut self, word: &str, correction: &str) -> bool {
        let added = self.overrides.set_autocorrect(word, correction);
        if added {
            self.persist();
        }
        added
    }

    /// Record `span.word -> suggestion` and fix this occurrence right away.
    pub fn always_correct<H: DocumentHost + ?Sized>(
        &mut self,
        doc: &mut H,
        span: &WordSpan,
        suggestion: &str,
        now: Instant,
    ) -> Result<()> {
        self.add_autocorrect_rule(&span.word, suggestion);
        self.replace_span(doc, span, suggestion, ActionKind::AlwaysCorrect, now)
    }

    fn replace_span<H: DocumentHost + ?Sized>(
        &mut self,
        doc: &mut H,
        span: &WordSpan,
        text: &str,
        kind: ActionKind,
        now: Instant,
    ) -> Result<()> {
        if doc.text_in(span.from, span.to).as_deref() != Some(span.word.as_str()) {
            return Err(Error::InvalidSpanBounds {
                from: span.from,
                to: span.to,
                len: doc.len(),
            });
        }
        self.replace_range(doc, span.from, span.to, text, kind, now)
    }

    fn replace_range<H: DocumentHost + ?Sized>(
        &mut self,
        doc: &mut H,
        from: usize,
        to: usize,
        text: &str,
        kind: ActionKind,
        now: Instant,
    ) -> Result<()> {
        doc.replace_range(from, to, text, MutationOrigin::Action(kind))?;
        let inserted = text.chars().count();
        doc.set_cursor(from + inserted);

        self.markers.remove_overlapping(from, to);
        self.markers
            .shift_after(to, inserted as isize - (to - from) as isize);
        self.notify();
        self.scheduler.arm(now);
        Ok(())
    }

    // ---- persistence ----

    fn persist(&mut self) {
        self.dirty = true;
        if let Err(e) = self.flush_overrides() {
            // Keep the in-memory state; the next save trigger retries.
            tracing::warn!(error = %e, "saving overrides failed, will retry");
        }
    }

    /// Save overrides if anything changed since the last successful save.
    pub fn flush_overrides(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.store.save(&self.document_id, &self.overrides)?;
        self.dirty = false;
        Ok(())
    }

    pub fn has_unsaved_overrides(&self) -> bool {
        self.dirty
    }
}

fn pick(error: &FlaggedError, index: usize) -> Result<String> {
    error
        .suggestions
        .get(index)
        .cloned()
        .ok_or(Error::SuggestionOutOfRange {
            index,
            available: error.suggestions.len(),
        })
}

/// Apply autocorrect mutations highest offset first, each tagged as a
/// self-mutation. A mutation whose text no longer matches is dropped.
fn apply_mutations<H: DocumentHost + ?Sized>(
    doc: &mut H,
    mutations: &[Mutation],
    dropped: &mut usize,
) -> Vec<Mutation> {
    let mut applied = Vec::with_capacity(mutations.len());

    for mutation in mutations {
        if doc.text_in(mutation.from, mutation.to).as_deref() != Some(mutation.original.as_str()) {
            tracing::debug!(word = %mutation.original, from = mutation.from, "stale autocorrect span");
            *dropped += 1;
            continue;
        }
        match doc.replace_range(
            mutation.from,
            mutation.to,
            &mutation.replacement,
            MutationOrigin::Autocorrect,
        ) {
            Ok(()) => applied.push(mutation.clone()),
            Err(e) => {
                tracing::debug!(error = %e, "dropping autocorrect mutation");
                *dropped += 1;
            }
        }
    }

    applied
}

/// Parse a word list: one word per line, `#` starts a comment line.
pub fn parse_word_list(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|word| !word.is_empty() && !word.starts_with('#'))
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const TEST_AFF: &str = "SET UTF-8\nTRY esianrtolcdugmphbyfvkwzESIANRTOLCDUGMPHBYFVKWZ\n";
    pub const TEST_DIC: &str = "7\nhello\nworld\nfriend\nhelp\nthe\ncat\nsat\n";
}

#[cfg(test)]
mod tests {
    use super::overrides::MemoryOverrideStore;
    use super::*;
    use crate::document::Document;
    use dictionary::WordListDictionary;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> Engine {
        let mut engine = Engine::new("doc", &Config::default(), MemoryOverrideStore::new());
        let dict = WordListDictionary::from_words(["hello", "world", "friend", "the"]).unwrap();
        engine.set_dictionary(Arc::new(dict), Instant::now());
        engine
    }

    #[test]
    fn test_parse_word_list() {
        let words: Vec<String> = parse_word_list("# mine\nRustacean\n\n  tokio \n").collect();
        assert_eq!(words, vec!["Rustacean", "tokio"]);
    }

    #[test]
    fn test_listener_sees_each_pass() {
        let mut engine = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.on_flagged_errors_changed(move |errors| sink.borrow_mut().push(errors.len()));

        let mut doc = Document::new("helo world ");
        engine.check_now(&mut doc);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_user_edit_shifts_markers_until_next_pass() {
        let mut engine = engine();
        let mut doc = Document::new("wrld helo ");
        engine.check_now(&mut doc);
        assert_eq!(engine.flagged_errors().len(), 2);

        doc.set_cursor(0);
        doc.type_text("oh ").unwrap();
        let now = Instant::now();
        for change in doc.drain_changes() {
            assert!(engine.on_change(&change, now));
        }
        let froms: Vec<usize> = engine.flagged_errors().iter().map(|e| e.from).collect();
        // "wrld" was touched by the insertion and is gone; "helo" moved by 3.
        assert_eq!(froms, vec![8]);
    }

    #[test]
    fn test_unknown_marker() {
        let mut engine = engine();
        let mut doc = Document::new("fine ");
        let err = engine
            .resolve(&mut doc, 42, Action::Ignore, Instant::now())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMarker(42)));
    }

    #[test]
    fn test_dictionary_state_debug() {
        let engine = Engine::new("doc", &Config::default(), MemoryOverrideStore::new());
        assert_eq!(format!("{:?}", engine.dictionary_state()), "Missing");
    }
}
