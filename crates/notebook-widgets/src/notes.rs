#![forbid(unsafe_code)]

//! In-memory notes, notebooks, and the search/sort query over them.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::NotebookError;
use crate::virtualized::ListData;

/// Name of the notebook every store starts with and never loses.
pub const MAIN_NOTEBOOK: &str = "Main";

/// A saved note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Stable identity; unique within a notebook.
    pub id: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Note {
    pub fn new(id: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            timestamp,
        }
    }
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Notebooks by name, in name order.
///
/// Equality compares contents only.
#[derive(Debug, Clone)]
pub struct NoteStore {
    notebooks: BTreeMap<String, Vec<Note>>,
    revision: u64,
}

impl PartialEq for NoteStore {
    fn eq(&self, other: &Self) -> bool {
        self.notebooks == other.notebooks
    }
}

impl Eq for NoteStore {}

impl Default for NoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteStore {
    /// A store holding only the empty main notebook.
    #[must_use]
    pub fn new() -> Self {
        let mut notebooks = BTreeMap::new();
        notebooks.insert(MAIN_NOTEBOOK.to_owned(), Vec::new());
        Self {
            notebooks,
            revision: next_revision(),
        }
    }

    /// Process-wide unique stamp of the current contents.
    ///
    /// Every mutation takes a fresh value, so two observations with the same
    /// revision saw the same notes. Clones share it until either side changes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Notes of `notebook` in stored order, or `None` if it does not exist.
    #[must_use]
    pub fn notes(&self, notebook: &str) -> Option<&[Note]> {
        self.notebooks.get(notebook).map(Vec::as_slice)
    }

    pub fn notebook_names(&self) -> impl Iterator<Item = &str> {
        self.notebooks.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains_notebook(&self, notebook: &str) -> bool {
        self.notebooks.contains_key(notebook)
    }

    /// Create an empty notebook.
    pub fn create_notebook(&mut self, name: impl Into<String>) -> Result<(), NotebookError> {
        let name = name.into();
        if self.notebooks.contains_key(&name) {
            return Err(NotebookError::DuplicateNotebook(name));
        }
        debug!(notebook = %name, "notebook created");
        self.notebooks.insert(name, Vec::new());
        self.revision = next_revision();
        Ok(())
    }

    /// Append `note` to `notebook`, replacing any note with the same id.
    pub fn add_note(&mut self, notebook: &str, note: Note) -> Result<(), NotebookError> {
        let notes = self
            .notebooks
            .get_mut(notebook)
            .ok_or_else(|| NotebookError::UnknownNotebook(notebook.to_owned()))?;
        match notes.iter_mut().find(|existing| existing.id == note.id) {
            Some(existing) => *existing = note,
            None => notes.push(note),
        }
        self.revision = next_revision();
        Ok(())
    }

    /// Remove the note with `id`. Returns whether one was removed.
    pub fn delete_note(&mut self, notebook: &str, id: &str) -> Result<bool, NotebookError> {
        let notes = self
            .notebooks
            .get_mut(notebook)
            .ok_or_else(|| NotebookError::UnknownNotebook(notebook.to_owned()))?;
        let before = notes.len();
        notes.retain(|note| note.id != id);
        let removed = notes.len() != before;
        if removed {
            self.revision = next_revision();
        }
        Ok(removed)
    }
}

/// What to order notes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Newest timestamp first.
    #[default]
    DateAdded,
    /// Stored order.
    MessageDate,
}

impl SortKey {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::DateAdded => "Date Added",
            Self::MessageDate => "Message Date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Descending,
    /// The reverse of the key's natural order.
    Ascending,
}

impl SortDirection {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Descending => "Descending",
            Self::Ascending => "Ascending",
        }
    }
}

/// Search and sort applied to one notebook before display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteQuery {
    /// Case-insensitive substring of the content; empty matches everything.
    pub search: String,
    pub sort_key: SortKey,
    pub direction: SortDirection,
}

impl NoteQuery {
    /// Footer text, e.g. `"Descending / Date Added"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} / {}", self.direction.label(), self.sort_key.label())
    }

    /// Indices into `notes` of the matching notes, in display order.
    #[must_use]
    pub fn order(&self, notes: &[Note]) -> Vec<usize> {
        let needle = self.search.to_lowercase();
        let mut order: Vec<usize> = notes
            .iter()
            .enumerate()
            .filter(|(_, note)| needle.is_empty() || note.content.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect();
        if self.sort_key == SortKey::DateAdded {
            order.sort_by(|&a, &b| notes[b].timestamp.cmp(&notes[a].timestamp));
        }
        if self.direction == SortDirection::Ascending {
            order.reverse();
        }
        order
    }

    /// Filter and order `notes`.
    #[must_use]
    pub fn apply<'a>(&self, notes: &'a [Note]) -> NoteRows<'a> {
        NoteRows {
            notes,
            order: Cow::Owned(self.order(notes)),
            generation: None,
        }
    }
}

/// Query result, borrowed from the store and keyed by note id.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct NoteRows<'a> {
    notes: &'a [Note],
    /// Indices into `notes`, all in range.
    order: Cow<'a, [usize]>,
    generation: Option<u64>,
}

impl fmt::Debug for NoteRows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|note| &note.id))
            .finish()
    }
}

impl<'a> NoteRows<'a> {
    /// Rows over an order previously computed by [`NoteQuery::order`] for
    /// these `notes`.
    pub(crate) fn from_order(notes: &'a [Note], order: &'a [usize]) -> Self {
        Self {
            notes,
            order: Cow::Borrowed(order),
            generation: None,
        }
    }

    /// Tag the rows with a generation that changes whenever the order does.
    #[must_use]
    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a Note> {
        let notes = self.notes;
        self.order.get(index).and_then(|&slot| notes.get(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Note> + '_ {
        let notes = self.notes;
        self.order.iter().map(move |&slot| &notes[slot])
    }
}

impl Index<usize> for NoteRows<'_> {
    type Output = Note;

    fn index(&self, index: usize) -> &Note {
        &self.notes[self.order[index]]
    }
}

impl ListData for NoteRows<'_> {
    type Key = String;

    fn item_count(&self) -> usize {
        self.order.len()
    }

    fn key_of(&self, index: usize) -> String {
        self[index].id.clone()
    }

    fn key_eq(&self, index: usize, key: &String) -> bool {
        self[index].id == *key
    }

    fn generation(&self) -> Option<u64> {
        self.generation
    }
}
