//! Inline markers for flagged errors and the actions a user can take on them.

use crate::FlaggedError;
use serde::Serialize;

/// CSS class the rendering layer attaches to every marker.
pub const DECORATION_CLASS: &str = "spell-error";

pub type MarkerId = u64;

/// Tag for document mutations made on behalf of a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionKind {
    Replace,
    Ignore,
    AddToDictionary,
    AlwaysCorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Replace with the suggestion at this index.
    Replace(usize),
    Ignore,
    AddToDictionary,
    /// Add `word -> suggestion(0)` to the autocorrect map and replace now.
    AlwaysCorrect,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Replace(_) => ActionKind::Replace,
            Action::Ignore => ActionKind::Ignore,
            Action::AddToDictionary => ActionKind::AddToDictionary,
            Action::AlwaysCorrect => ActionKind::AlwaysCorrect,
        }
    }

    /// The state a marker moves to when this action resolves it.
    pub fn resolved_state(&self) -> MarkerState {
        match self {
            Action::Replace(_) => MarkerState::Replaced,
            Action::Ignore => MarkerState::Ignored,
            Action::AddToDictionary => MarkerState::DictionaryAdded,
            Action::AlwaysCorrect => MarkerState::AutocorrectAdded,
        }
    }
}

/// `Flagged -> {Replaced | Ignored | DictionaryAdded | AutocorrectAdded}`,
/// after which the marker is gone for good. A later pass that finds the same
/// text wrong creates a new marker with a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerState {
    Flagged,
    Replaced,
    Ignored,
    DictionaryAdded,
    AutocorrectAdded,
}

/// What happened to a marker after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: MarkerId,
    pub word: String,
    pub state: MarkerState,
}

/// A non-editable inline marker spanning `from..to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    pub id: MarkerId,
    pub from: usize,
    pub to: usize,
    pub class: &'static str,
    pub word: String,
    pub suggestions: Vec<String>,
}

impl Decoration {
    pub fn is_editable(&self) -> bool {
        false
    }

    /// Attributes for the rendered node; interaction handlers read the word
    /// and suggestions back from them.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("class", self.class.to_string()),
            ("contenteditable", "false".to_string()),
            ("data-marker-id", self.id.to_string()),
            ("data-word", self.word.clone()),
            ("data-suggestions", self.suggestions.join(",")),
        ]
    }
}

/// The live markers of one engine instance.
#[derive(Debug, Default)]
pub struct MarkerSet {
    markers: Vec<(MarkerId, FlaggedError)>,
    next_id: MarkerId,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in the result of a pass. Every marker gets a fresh id.
    pub fn replace_all(&mut self, errors: Vec<FlaggedError>) {
        self.markers = errors
            .into_iter()
            .map(|error| {
                self.next_id += 1;
                (self.next_id, error)
            })
            .collect();
    }

    pub fn get(&self, id: MarkerId) -> Option<&FlaggedError> {
        self.markers
            .iter()
            .find(|(marker, _)| *marker == id)
            .map(|(_, error)| error)
    }

    /// Remove one marker, returning its error.
    pub fn take(&mut self, id: MarkerId) -> Option<FlaggedError> {
        let index = self.markers.iter().position(|(marker, _)| *marker == id)?;
        Some(self.markers.remove(index).1)
    }

    /// Remove every marker for `word`. Returns how many went away.
    pub fn remove_word(&mut self, word: &str) -> usize {
        let before = self.markers.len();
        self.markers.retain(|(_, error)| error.word != word);
        before - self.markers.len()
    }

    pub fn remove_at(&mut self, from: usize, to: usize, word: &str) -> Option<MarkerId> {
        let index = self
            .markers
            .iter()
            .position(|(_, e)| e.from == from && e.to == to && e.word == word)?;
        Some(self.markers.remove(index).0)
    }

    /// Remove markers touching `from..to`; their text no longer matches.
    pub fn remove_overlapping(&mut self, from: usize, to: usize) -> usize {
        let before = self.markers.len();
        self.markers.retain(|(_, e)| !(e.from <= to && from <= e.to));
        before - self.markers.len()
    }

    /// Shift markers starting at or after `at` by `delta` characters.
    pub fn shift_after(&mut self, at: usize, delta: isize) {
        for (_, error) in &mut self.markers {
            if error.from >= at {
                error.from = error.from.saturating_add_signed(delta);
                error.to = error.to.saturating_add_signed(delta);
            }
        }
    }

    pub fn errors(&self) -> Vec<FlaggedError> {
        self.markers.iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn decorations(&self) -> Vec<Decoration> {
        self.markers
            .iter()
            .map(|(id, error)| Decoration {
                id: *id,
                from: error.from,
                to: error.to,
                class: DECORATION_CLASS,
                word: error.word.clone(),
                suggestions: error.suggestions.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn error(word: &str, from: usize) -> FlaggedError {
        FlaggedError {
            word: word.to_string(),
            from,
            to: from + word.len(),
            suggestions: vec!["hello".to_string()],
            kind: ErrorKind::Spelling,
        }
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut markers = MarkerSet::new();
        markers.replace_all(vec![error("helo", 0)]);
        let first = markers.decorations()[0].id;
        markers.replace_all(vec![error("helo", 0)]);
        let second = markers.decorations()[0].id;
        assert_ne!(first, second);
        assert!(markers.get(first).is_none());
    }

    #[test]
    fn test_take_resolves_once() {
        let mut markers = MarkerSet::new();
        markers.replace_all(vec![error("helo", 0), error("helo", 11)]);
        let id = markers.decorations()[0].id;
        assert!(markers.take(id).is_some());
        assert!(markers.take(id).is_none());
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_remove_word_and_shift() {
        let mut markers = MarkerSet::new();
        markers.replace_all(vec![error("helo", 0), error("wrld", 5), error("helo", 11)]);
        assert_eq!(markers.remove_word("helo"), 2);
        markers.shift_after(5, 1);
        assert_eq!(markers.errors()[0].from, 6);
    }

    #[test]
    fn test_remove_overlapping() {
        let mut markers = MarkerSet::new();
        markers.replace_all(vec![error("helo", 0), error("wrld", 5)]);
        // Typing inside or at the end of a word changes it.
        assert_eq!(markers.remove_overlapping(2, 2), 1);
        assert_eq!(markers.remove_overlapping(10, 10), 0);
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_decoration_is_inline_and_read_only() {
        let mut markers = MarkerSet::new();
        markers.replace_all(vec![error("helo", 0)]);
        let decoration = &markers.decorations()[0];
        assert!(!decoration.is_editable());
        assert_eq!(decoration.class, DECORATION_CLASS);
        assert!(decoration
            .attributes()
            .contains(&("data-word", "helo".to_string())));
    }

    #[test]
    fn test_action_states() {
        assert_eq!(Action::Replace(0).resolved_state(), MarkerState::Replaced);
        assert_eq!(Action::Ignore.resolved_state(), MarkerState::Ignored);
        assert_eq!(Action::AlwaysCorrect.kind(), ActionKind::AlwaysCorrect);
    }
}
