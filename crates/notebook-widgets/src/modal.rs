#![forbid(unsafe_code)]

//! Notebook modal host.
//!
//! [`NotebookModal`] wires a [`NoteStore`] into a [`VirtualizedList`]: it
//! owns the search and sort state and the selected notebook tab, and it keeps
//! the list's viewport height in sync with the content area through a resize
//! observer.
//!
//! # Lifecycle
//!
//! 1. [`NotebookModal::open`] snapshots the settings, sizes the list from the
//!    content area, attaches the list to the scroll container and registers a
//!    resize observer on the content area.
//! 2. The host calls [`NotebookModal::view`] whenever
//!    [`NotebookModal::needs_redraw`] reports true.
//! 3. [`NotebookModal::close`] (or drop) releases the resize observer and
//!    tears the list down.
//!
//! # Example
//!
//! ```
//! use notebook_runtime::HeadlessViewport;
//! use notebook_widgets::modal::{ModalView, NotebookModal, Placeholder};
//! use notebook_widgets::notes::NoteStore;
//! use notebook_widgets::settings::NotebookSettings;
//!
//! let content = HeadlessViewport::new(600.0);
//! let scroller = HeadlessViewport::new(600.0);
//! let store = NoteStore::new();
//!
//! let mut modal = NotebookModal::open(&NotebookSettings::default(), &content, &scroller);
//! let view = modal.view(&store, |note, _style, _measure| note.id.clone());
//! assert!(matches!(view, ModalView::Placeholder(Placeholder::NoNotes)));
//! ```

use std::fmt;

use notebook_runtime::{Subscription, ViewportEvents};
use tracing::debug;

use crate::notes::{MAIN_NOTEBOOK, Note, NoteQuery, NoteRows, NoteStore, SortDirection, SortKey};
use crate::settings::NotebookSettings;
use crate::virtualized::{ListFrame, ListProps, MeasureRef, PositionStyle, VirtualizedList};

/// Height assumed for a note before it has been laid out.
pub const ESTIMATED_NOTE_HEIGHT: f64 = 150.0;

/// Shown instead of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// The notebook exists but nothing matches.
    NoNotes,
    /// The selected notebook does not exist.
    MissingNotebook(String),
}

/// Content of the modal body for one draw.
#[derive(Debug, Clone)]
pub enum ModalView<N> {
    List(ListFrame<String, N>),
    Placeholder(Placeholder),
}

/// One notebook tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub name: String,
    pub selected: bool,
}

/// Display order of one notebook under one query.
#[derive(Debug)]
struct RowOrder {
    /// Store revision and query generation the order was computed from.
    source: (u64, u64),
    generation: u64,
    order: Vec<usize>,
}

/// Headless notebook modal.
pub struct NotebookModal {
    settings: NotebookSettings,
    query: NoteQuery,
    notebook: String,
    list: VirtualizedList<String>,
    resize_observer: Option<Subscription>,
    /// Layout revision the last drawn frame reflects.
    drawn_revision: Option<u64>,
    query_dirty: bool,
    /// Bumped by every search, sort, or tab change.
    query_generation: u64,
    rows: Option<RowOrder>,
    rows_generation: u64,
}

impl fmt::Debug for NotebookModal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotebookModal")
            .field("settings", &self.settings)
            .field("query", &self.query)
            .field("notebook", &self.notebook)
            .field("list", &self.list)
            .field("open", &self.is_open())
            .finish()
    }
}

impl NotebookModal {
    /// Open the modal over `content_area`, scrolling inside `scroll_container`.
    ///
    /// `settings` is copied; later changes apply on the next open.
    #[must_use]
    pub fn open(
        settings: &NotebookSettings,
        content_area: &dyn ViewportEvents,
        scroll_container: &dyn ViewportEvents,
    ) -> Self {
        let settings = *settings;
        let props = ListProps::new(content_area.client_height(), ESTIMATED_NOTE_HEIGHT);
        let mut list = VirtualizedList::new(props, settings.list_config());
        list.attach(scroll_container);

        let handle = list.viewport_handle();
        let resize_observer = content_area.on_resize(Box::new(move |height| {
            handle.set_height(height);
        }));

        debug!(
            overscan = settings.overscan_count,
            height = list.viewport_height(),
            "notebook modal opened"
        );
        Self {
            settings,
            query: NoteQuery::default(),
            notebook: MAIN_NOTEBOOK.to_owned(),
            list,
            resize_observer: Some(resize_observer),
            drawn_revision: None,
            query_dirty: true,
            query_generation: 0,
            rows: None,
            rows_generation: 0,
        }
    }

    /// Settings captured at open.
    #[must_use]
    pub fn settings(&self) -> NotebookSettings {
        self.settings
    }

    #[must_use]
    pub fn query(&self) -> &NoteQuery {
        &self.query
    }

    #[must_use]
    pub fn current_notebook(&self) -> &str {
        &self.notebook
    }

    /// The underlying list engine.
    #[must_use]
    pub fn list(&self) -> &VirtualizedList<String> {
        &self.list
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if search != self.query.search {
            self.query.search = search;
            self.query_changed();
        }
    }

    pub fn set_sort(&mut self, sort_key: SortKey, direction: SortDirection) {
        if (sort_key, direction) != (self.query.sort_key, self.query.direction) {
            self.query.sort_key = sort_key;
            self.query.direction = direction;
            self.query_changed();
        }
    }

    pub fn select_notebook(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.notebook {
            debug!(notebook = %name, "notebook tab selected");
            self.notebook = name;
            self.query_changed();
        }
    }

    fn query_changed(&mut self) {
        self.query_dirty = true;
        self.query_generation += 1;
    }

    /// Tabs for every notebook in `store`, marking the selected one.
    #[must_use]
    pub fn tabs(&self, store: &NoteStore) -> Vec<Tab> {
        store
            .notebook_names()
            .map(|name| Tab {
                name: name.to_owned(),
                selected: name == self.notebook,
            })
            .collect()
    }

    /// Footer text describing the current sort.
    #[must_use]
    pub fn sort_label(&self) -> String {
        self.query.label()
    }

    /// Whether the last drawn view is out of date.
    #[must_use]
    pub fn needs_redraw(&self) -> bool {
        self.is_open()
            && (self.query_dirty || self.drawn_revision != Some(self.list.layout_revision()))
    }

    /// Be told when the list layout changes.
    pub fn subscribe_redraw(&self, callback: impl Fn(u64) + 'static) -> Subscription {
        self.list.subscribe_layout(callback)
    }

    /// Build the modal body.
    ///
    /// `render_note(note, style, measure)` is called for each mounted note.
    /// Measurements reported during the call mark the view for redraw.
    ///
    /// The filtered order is recomputed only when the store or the query
    /// changed since the previous view.
    pub fn view<N>(
        &mut self,
        store: &NoteStore,
        mut render_note: impl FnMut(&Note, PositionStyle, MeasureRef) -> N,
    ) -> ModalView<N> {
        self.query_dirty = false;
        let Some(notes) = store.notes(&self.notebook) else {
            self.drawn_revision = Some(self.list.layout_revision());
            return ModalView::Placeholder(Placeholder::MissingNotebook(self.notebook.clone()));
        };

        let source = (store.revision(), self.query_generation);
        if self.rows.as_ref().is_some_and(|rows| rows.source != source) {
            self.rows = None;
        }
        let cached = self.rows.get_or_insert_with(|| {
            self.rows_generation += 1;
            RowOrder {
                source,
                generation: self.rows_generation,
                order: self.query.order(notes),
            }
        });

        let rows = NoteRows::from_order(notes, &cached.order).with_generation(cached.generation);
        self.list.sync_data(&rows);
        self.drawn_revision = Some(self.list.layout_revision());
        if rows.is_empty() {
            return ModalView::Placeholder(Placeholder::NoNotes);
        }

        let frame = self.list.mount(&rows, |index, style, rows, measure| {
            render_note(&rows[index], style, measure)
        });
        ModalView::List(frame)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.list.is_live()
    }

    /// Release the resize observer and tear down the list. Idempotent.
    pub fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        self.resize_observer = None;
        self.list.teardown();
        debug!(notebook = %self.notebook, "notebook modal closed");
    }
}

impl Drop for NotebookModal {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebook_runtime::HeadlessViewport;
    use pretty_assertions::assert_eq;

    fn store_with(count: usize) -> NoteStore {
        let mut store = NoteStore::new();
        for i in 0..count {
            store
                .add_note(
                    MAIN_NOTEBOOK,
                    Note::new(format!("n{i}"), format!("note {i}"), i as i64),
                )
                .unwrap();
        }
        store
    }

    fn ids<N>(view: &ModalView<N>) -> Vec<String> {
        match view {
            ModalView::List(frame) => frame.items.iter().map(|item| item.key.clone()).collect(),
            ModalView::Placeholder(_) => Vec::new(),
        }
    }

    #[test]
    fn opens_with_content_height_and_settings() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let settings = NotebookSettings { overscan_count: 2 };
        let modal = NotebookModal::open(&settings, &content, &scroller);

        assert_eq!(modal.list().viewport_height(), 450.0);
        assert_eq!(modal.list().overscan(), 2);
        assert_eq!(modal.current_notebook(), "Main");
        assert_eq!(modal.sort_label(), "Descending / Date Added");
        assert_eq!(content.resize_observer_count(), 1);
        assert_eq!(scroller.scroll_listener_count(), 1);
        assert!(modal.needs_redraw());
    }

    #[test]
    fn newest_notes_come_first() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let store = store_with(50);
        let settings = NotebookSettings { overscan_count: 0 };
        let mut modal = NotebookModal::open(&settings, &content, &scroller);

        let view = modal.view(&store, |note, _, _| note.content.clone());
        assert_eq!(ids(&view), vec!["n49", "n48", "n47", "n46"]);
        assert!(!modal.needs_redraw());
    }

    #[test]
    fn search_with_no_match_shows_placeholder() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let store = store_with(5);
        let mut modal = NotebookModal::open(&NotebookSettings::default(), &content, &scroller);

        modal.set_search("zebra");
        assert!(modal.needs_redraw());
        let view = modal.view(&store, |note, _, _| note.id.clone());
        assert!(matches!(view, ModalView::Placeholder(Placeholder::NoNotes)));
    }

    #[test]
    fn missing_notebook_placeholder() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let store = store_with(5);
        let mut modal = NotebookModal::open(&NotebookSettings::default(), &content, &scroller);

        modal.select_notebook("Archive");
        let view = modal.view(&store, |note, _, _| note.id.clone());
        assert!(matches!(
            view,
            ModalView::Placeholder(Placeholder::MissingNotebook(ref name)) if name == "Archive"
        ));
        assert!(modal.tabs(&store).iter().all(|tab| !tab.selected));
    }

    #[test]
    fn tabs_mark_selection() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let mut store = store_with(1);
        store.create_notebook("Work").unwrap();
        let mut modal = NotebookModal::open(&NotebookSettings::default(), &content, &scroller);
        modal.select_notebook("Work");

        assert_eq!(
            modal.tabs(&store),
            vec![
                Tab {
                    name: "Main".into(),
                    selected: false,
                },
                Tab {
                    name: "Work".into(),
                    selected: true,
                },
            ]
        );
    }

    #[test]
    fn resize_and_measurement_request_redraw() {
        let content = HeadlessViewport::new(0.0);
        let scroller = HeadlessViewport::new(0.0);
        let store = store_with(30);
        let mut modal = NotebookModal::open(&NotebookSettings::default(), &content, &scroller);

        let view = modal.view(&store, |_, _, measure| measure);
        assert!(!modal.needs_redraw());

        content.resize(700.0);
        assert_eq!(modal.list().viewport_height(), 700.0);
        assert!(modal.needs_redraw());

        if let ModalView::List(frame) = view {
            modal.view(&store, |_, _, measure| measure);
            assert!(!modal.needs_redraw());
            frame.items[0].node.measure(Some(80.0));
            assert!(modal.needs_redraw());
        } else {
            panic!("expected a list");
        }
    }

    fn rows_generation(modal: &NotebookModal) -> Option<u64> {
        modal.rows.as_ref().map(|rows| rows.generation)
    }

    #[test]
    fn scroll_only_views_reuse_the_row_order() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let store = store_with(2_000);
        let mut modal = NotebookModal::open(&NotebookSettings::default(), &content, &scroller);

        modal.view(&store, |note, _, _| note.id.clone());
        let generation = rows_generation(&modal);
        let recomputations = modal.list().recomputations();

        scroller.scroll_to(60_000.0);
        let view = modal.view(&store, |note, _, _| note.id.clone());
        assert_eq!(ids(&view)[0], "n1604");
        assert_eq!(rows_generation(&modal), generation);
        assert_eq!(modal.list().recomputations(), recomputations);

        modal.set_search("note 1");
        modal.view(&store, |note, _, _| note.id.clone());
        assert_ne!(rows_generation(&modal), generation);
    }

    #[test]
    fn store_changes_refresh_rows() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let mut store = store_with(3);
        let mut modal = NotebookModal::open(&NotebookSettings::default(), &content, &scroller);
        let view = modal.view(&store, |note, _, _| note.id.clone());
        assert_eq!(ids(&view), vec!["n2", "n1", "n0"]);

        store
            .add_note(MAIN_NOTEBOOK, Note::new("fresh", "just now", 100))
            .unwrap();
        store.delete_note(MAIN_NOTEBOOK, "n1").unwrap();
        let view = modal.view(&store, |note, _, _| note.id.clone());
        assert_eq!(ids(&view), vec!["fresh", "n2", "n0"]);
    }

    #[test]
    fn settings_are_snapshotted_at_open() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let mut settings = NotebookSettings { overscan_count: 1 };
        let modal = NotebookModal::open(&settings, &content, &scroller);
        settings.overscan_count = 9;
        assert_eq!(modal.settings().overscan_count, 1);
        assert_eq!(modal.list().overscan(), 1);
    }

    #[test]
    fn close_releases_everything() {
        let content = HeadlessViewport::new(450.0);
        let scroller = HeadlessViewport::new(450.0);
        let mut modal = NotebookModal::open(&NotebookSettings::default(), &content, &scroller);

        modal.close();
        assert!(!modal.is_open());
        assert!(!modal.needs_redraw());
        assert_eq!(content.resize_observer_count(), 0);
        assert_eq!(scroller.scroll_listener_count(), 0);
        modal.close();
    }
}
