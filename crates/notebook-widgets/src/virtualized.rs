#![forbid(unsafe_code)]

//! Variable-height virtualized list.
//!
//! [`VirtualizedList`] mounts only the items that intersect the viewport (plus
//! an overscan margin) out of an arbitrarily long logical list. Item heights
//! start as an estimate and are corrected as mounted items report their real
//! size through a [`MeasureRef`].
//!
//! # Feedback loop
//!
//! ```text
//! scroll / resize ──► visible_range ──► render_item(index, style, data, measure)
//!        ▲                                                   │
//!        └──── layout revision ◄── record_measurement ◄──────┘
//! ```
//!
//! Every change that can move items (a new measurement, a scroll offset, a
//! viewport height, a different data identity) bumps a layout revision held in
//! an [`Observable`]. The rendering layer subscribes to it and re-renders.
//! Measurements equal to the stored value are dropped before they reach the
//! revision, so the loop settles.
//!
//! # Example
//!
//! ```
//! use notebook_widgets::virtualized::{ListConfig, ListProps, VirtualizedList};
//!
//! let keys: Vec<u32> = (0..100).collect();
//! let mut list = VirtualizedList::new(ListProps::new(800.0, 150.0), ListConfig::default());
//!
//! let frame = list.render(&keys, |index, style, _data, measure| (index, style.top, measure));
//! assert_eq!(frame.range, 0..11);
//!
//! // The host lays out item 0 and finds it 300px tall.
//! frame.items[0].node.2.measure(Some(300.0));
//! assert_eq!(list.offset_of(1), 300.0);
//! ```
//!
//! # Failure modes
//!
//! - A [`MeasureRef`] reporting `None` (element detached or never mounted)
//!   leaves the estimate in force.
//! - A [`MeasureRef`] used after [`VirtualizedList::teardown`], after the list
//!   is dropped, or after the data identity changed is ignored.
//! - After teardown, [`VirtualizedList::render`] yields an empty frame.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Range;
use std::rc::{Rc, Weak};

use notebook_runtime::viewport::sanitize_px;
use notebook_runtime::{Observable, Subscription, ViewportEvents};
use tracing::{debug, debug_span, trace};

use crate::height::{HeightIndex, HeightModel};
use crate::retained::{DEFAULT_RETAINED_HEIGHTS, RetainedHeights};
use crate::window::visible_range;

/// Default number of items rendered beyond each visible boundary.
pub const DEFAULT_OVERSCAN: usize = 5;

/// Horizontal extent of a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Width {
    /// Absolute width in pixels.
    Pixels(f64),
    /// Percentage of the parent width.
    Percent(f64),
}

impl Default for Width {
    fn default() -> Self {
        Self::Percent(100.0)
    }
}

/// Positioning scheme of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Laid out in flow; acts as the containing block for absolute children.
    Relative,
    /// Placed at explicit coordinates inside the containing block.
    Absolute,
}

/// Vertical overflow behavior of the scroll container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Scroll when content exceeds the box.
    Auto,
}

/// Placement of one mounted item inside the content area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionStyle {
    pub position: Position,
    pub top: f64,
    pub left: f64,
    pub width: Width,
}

impl PositionStyle {
    fn item_at(top: f64) -> Self {
        Self {
            position: Position::Absolute,
            top,
            left: 0.0,
            width: Width::Percent(100.0),
        }
    }
}

/// Style of the outer scroll container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerStyle {
    pub position: Position,
    pub height: f64,
    pub width: Width,
    pub overflow_y: Overflow,
}

/// Caller-supplied sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListProps {
    /// Viewport height in pixels; 0 until the host has measured it.
    pub height: f64,
    pub width: Width,
    /// Height assumed for items that have not been measured yet.
    pub estimated_item_size: f64,
}

impl ListProps {
    #[must_use]
    pub fn new(height: f64, estimated_item_size: f64) -> Self {
        Self {
            height,
            width: Width::default(),
            estimated_item_size,
        }
    }

    #[must_use]
    pub fn width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }
}

/// Engine configuration, fixed for the lifetime of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListConfig {
    /// Extra items mounted beyond each visible boundary.
    pub overscan: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            overscan: DEFAULT_OVERSCAN,
        }
    }
}

/// The data bag handed to every render call.
///
/// The list reads only the item count and a stable identity per item; the
/// identity must not be the index, so that measurements follow items across
/// re-sorting and filtering.
///
/// Each render checks the key sequence against the previous one. Override
/// [`ListData::key_eq`] to compare without building keys, and
/// [`ListData::generation`] to skip the comparison entirely.
pub trait ListData {
    type Key: Clone + Eq + Hash + fmt::Debug;

    fn item_count(&self) -> usize;

    /// Identity of the item at `index`; only called for `index < item_count()`.
    fn key_of(&self, index: usize) -> Self::Key;

    /// Whether the item at `index` has identity `key`.
    fn key_eq(&self, index: usize, key: &Self::Key) -> bool {
        self.key_of(index) == *key
    }

    /// Version of the key sequence, if the caller tracks one.
    ///
    /// Two values reporting the same `Some` generation must have identical key
    /// sequences.
    fn generation(&self) -> Option<u64> {
        None
    }
}

impl<K: Clone + Eq + Hash + fmt::Debug> ListData for [K] {
    type Key = K;

    fn item_count(&self) -> usize {
        self.len()
    }

    fn key_of(&self, index: usize) -> K {
        self[index].clone()
    }

    fn key_eq(&self, index: usize, key: &K) -> bool {
        self[index] == *key
    }
}

impl<K: Clone + Eq + Hash + fmt::Debug> ListData for Vec<K> {
    type Key = K;

    fn item_count(&self) -> usize {
        self.len()
    }

    fn key_of(&self, index: usize) -> K {
        self[index].clone()
    }

    fn key_eq(&self, index: usize, key: &K) -> bool {
        self[index] == *key
    }
}

/// One mounted item of a [`ListFrame`].
#[derive(Debug, Clone)]
pub struct MountedItem<K, N> {
    /// Identity from [`ListData::key_of`]; hosts reconcile on this.
    pub key: K,
    pub index: usize,
    pub node: N,
}

/// Output of one render pass.
#[derive(Debug, Clone)]
pub struct ListFrame<K, N> {
    pub container: ContainerStyle,
    /// Height of the scrollable content; sizes the host scrollbar.
    pub content_height: f64,
    /// Mounted indices, half-open.
    pub range: Range<usize>,
    pub items: Vec<MountedItem<K, N>>,
}

impl<K, N> ListFrame<K, N> {
    /// Whether nothing is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Type-erased access to a list's shared core.
trait ListSink {
    fn accept_measurement(&self, index: usize, epoch: u64, height: f64) -> bool;
    fn accept_scroll(&self, scroll_top: f64) -> bool;
    fn accept_height(&self, height: f64) -> bool;
}

/// Measurement callback bound to one mounted index.
///
/// Hosts attach it to the root of the node produced by `render_item` and call
/// [`MeasureRef::measure`] when that element mounts or changes size.
#[derive(Clone)]
pub struct MeasureRef {
    index: usize,
    epoch: u64,
    sink: Weak<dyn ListSink>,
}

impl fmt::Debug for MeasureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasureRef")
            .field("index", &self.index)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl MeasureRef {
    /// Index this callback reports for.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Report the observed element height, or `None` when there is no element.
    ///
    /// Returns whether the report changed the layout.
    pub fn measure(&self, element_height: Option<f64>) -> bool {
        let Some(height) = element_height else {
            return false;
        };
        match self.sink.upgrade() {
            Some(sink) => sink.accept_measurement(self.index, self.epoch, height),
            None => {
                debug!(index = self.index, "measurement for dropped list ignored");
                false
            }
        }
    }
}

/// Weak handle for feeding viewport state into a list from host callbacks.
#[derive(Clone)]
pub struct ViewportHandle {
    sink: Weak<dyn ListSink>,
}

impl fmt::Debug for ViewportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportHandle")
            .field("alive", &(self.sink.strong_count() > 0))
            .finish()
    }
}

impl ViewportHandle {
    /// Forward a new viewport height. No-op once the list is gone.
    pub fn set_height(&self, height: f64) -> bool {
        self.sink
            .upgrade()
            .is_some_and(|sink| sink.accept_height(height))
    }

    /// Forward a new scroll offset. No-op once the list is gone.
    pub fn set_scroll_top(&self, scroll_top: f64) -> bool {
        self.sink
            .upgrade()
            .is_some_and(|sink| sink.accept_scroll(scroll_top))
    }
}

struct ListCore<M> {
    heights: RefCell<M>,
    scroll_top: Cell<f64>,
    viewport_height: Cell<f64>,
    /// Bumped whenever the data identity changes; older refs become stale.
    epoch: Cell<u64>,
    live: Cell<bool>,
    layout: Observable<u64>,
}

impl<M> ListCore<M> {
    fn invalidate(&self) {
        self.layout.mutate(|revision| {
            *revision += 1;
            true
        });
    }
}

impl<M: HeightIndex> ListSink for ListCore<M> {
    fn accept_measurement(&self, index: usize, epoch: u64, height: f64) -> bool {
        if !self.live.get() {
            debug!(index, "measurement after teardown ignored");
            return false;
        }
        if epoch != self.epoch.get() {
            debug!(index, epoch, "measurement from previous data ignored");
            return false;
        }
        let changed = self.heights.borrow_mut().record_measurement(index, height);
        if changed {
            trace!(index, height, "measurement recorded");
            self.invalidate();
        }
        changed
    }

    fn accept_scroll(&self, scroll_top: f64) -> bool {
        let scroll_top = sanitize_px(scroll_top);
        if !self.live.get() || scroll_top == self.scroll_top.get() {
            return false;
        }
        self.scroll_top.set(scroll_top);
        self.invalidate();
        true
    }

    fn accept_height(&self, height: f64) -> bool {
        let height = sanitize_px(height);
        if !self.live.get() || height == self.viewport_height.get() {
            return false;
        }
        self.viewport_height.set(height);
        self.invalidate();
        true
    }
}

/// Windowing engine over a [`HeightIndex`] backend.
///
/// `K` is the item identity type of the data rendered through it.
///
/// # Invariants
///
/// - Each mounted item is placed at `top = offset_of(index)`.
/// - The visible range is recomputed on every query.
/// - Listener registrations are released before the height record is
///   discarded, on [`VirtualizedList::teardown`] and on drop.
pub struct VirtualizedList<K, M = HeightModel>
where
    K: Clone + Eq + Hash,
    M: HeightIndex + 'static,
{
    core: Rc<ListCore<M>>,
    width: Width,
    overscan: usize,
    /// Identity of each index as of the last render.
    keys: Vec<K>,
    synced_generation: Option<u64>,
    /// Heights of items that were filtered out.
    retained: RetainedHeights<K>,
    listeners: Vec<Subscription>,
}

impl<K, M> fmt::Debug for VirtualizedList<K, M>
where
    K: Clone + Eq + Hash,
    M: HeightIndex + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualizedList")
            .field("item_count", &self.item_count())
            .field("scroll_top", &self.scroll_top())
            .field("viewport_height", &self.viewport_height())
            .field("overscan", &self.overscan)
            .field("listeners", &self.listeners.len())
            .field("live", &self.is_live())
            .finish()
    }
}

impl<K: Clone + Eq + Hash> VirtualizedList<K> {
    /// Create a list backed by the eager [`HeightModel`].
    #[must_use]
    pub fn new(props: ListProps, config: ListConfig) -> Self {
        Self::with_heights(props, config, HeightModel::default())
    }
}

impl<K, M> VirtualizedList<K, M>
where
    K: Clone + Eq + Hash,
    M: HeightIndex + 'static,
{
    /// Create a list over a caller-chosen height backend.
    ///
    /// The backend's estimate is replaced by `props.estimated_item_size`; its
    /// item count is reconciled with the data on the first render.
    #[must_use]
    pub fn with_heights(props: ListProps, config: ListConfig, mut heights: M) -> Self {
        heights.set_estimate(props.estimated_item_size);
        Self {
            core: Rc::new(ListCore {
                heights: RefCell::new(heights),
                scroll_top: Cell::new(0.0),
                viewport_height: Cell::new(sanitize_px(props.height)),
                epoch: Cell::new(0),
                live: Cell::new(true),
                layout: Observable::new(0),
            }),
            width: props.width,
            overscan: config.overscan,
            keys: Vec::new(),
            synced_generation: None,
            retained: RetainedHeights::new(DEFAULT_RETAINED_HEIGHTS),
            listeners: Vec::new(),
        }
    }

    /// Keep at most `capacity` heights of items that leave the data, so they
    /// are restored if the items return. Zero forgets them immediately.
    #[must_use]
    pub fn retaining(mut self, capacity: usize) -> Self {
        self.retained = RetainedHeights::new(capacity);
        self
    }

    fn sink(&self) -> Weak<dyn ListSink> {
        let weak: Weak<ListCore<M>> = Rc::downgrade(&self.core);
        weak
    }

    /// Listen to scroll events of the host container that hosts this list.
    ///
    /// The current scroll offset is read immediately. The listener is released
    /// on teardown.
    pub fn attach(&mut self, container: &dyn ViewportEvents) {
        if !self.is_live() {
            return;
        }
        self.core.accept_scroll(container.scroll_top());
        let sink = self.sink();
        let subscription = container.on_scroll(Box::new(move |scroll_top| {
            if let Some(sink) = sink.upgrade() {
                sink.accept_scroll(scroll_top);
            }
        }));
        self.listeners.push(subscription);
        debug!(listeners = self.listeners.len(), "list attached to scroll container");
    }

    /// Handle that forwards viewport changes from host callbacks.
    #[must_use]
    pub fn viewport_handle(&self) -> ViewportHandle {
        ViewportHandle { sink: self.sink() }
    }

    /// Set the viewport height. Returns whether it changed.
    pub fn set_height(&self, height: f64) -> bool {
        self.core.accept_height(height)
    }

    /// Set the scroll offset. Returns whether it changed.
    pub fn set_scroll_top(&self, scroll_top: f64) -> bool {
        self.core.accept_scroll(scroll_top)
    }

    /// Change the height assumed for unmeasured items.
    pub fn set_estimated_item_size(&self, estimate: f64) -> bool {
        if !self.is_live() {
            return false;
        }
        let changed = self.core.heights.borrow_mut().set_estimate(estimate);
        if changed {
            self.core.invalidate();
        }
        changed
    }

    #[must_use]
    pub fn scroll_top(&self) -> f64 {
        self.core.scroll_top.get()
    }

    #[must_use]
    pub fn viewport_height(&self) -> f64 {
        self.core.viewport_height.get()
    }

    #[must_use]
    pub fn overscan(&self) -> usize {
        self.overscan
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.core.heights.borrow().item_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    #[must_use]
    pub fn total_height(&self) -> f64 {
        self.core.heights.borrow().total_height()
    }

    #[must_use]
    pub fn offset_of(&self, index: usize) -> f64 {
        self.core.heights.borrow().offset_of(index)
    }

    #[must_use]
    pub fn height_of(&self, index: usize) -> f64 {
        self.core.heights.borrow().height_of(index)
    }

    /// How many times the height backend has rebuilt or patched its offsets.
    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.core.heights.borrow().recomputations()
    }

    /// Indices that a render would mount right now.
    #[must_use]
    pub fn visible_range(&self) -> Range<usize> {
        let heights = self.core.heights.borrow();
        visible_range(
            &*heights,
            self.scroll_top(),
            self.viewport_height(),
            self.overscan,
        )
    }

    /// Current layout revision.
    #[must_use]
    pub fn layout_revision(&self) -> u64 {
        self.core.layout.get()
    }

    /// Be told whenever the layout changes and a re-render is due.
    pub fn subscribe_layout(&self, callback: impl Fn(u64) + 'static) -> Subscription {
        self.core.layout.subscribe(move |revision| callback(*revision))
    }

    /// Live scroll listeners held by this list.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether the list has not been torn down.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.core.live.get()
    }

    /// Bring the height record in line with the identities in `data`.
    ///
    /// When the key sequence differs from the last one, measured heights are
    /// carried over to wherever their key now sits, in a single
    /// recomputation, and outstanding [`MeasureRef`]s become stale. Heights of
    /// keys that disappeared are retained and restored if the key returns.
    /// Returns whether anything changed.
    ///
    /// No keys are cloned unless the sequence changed, and no keys are compared
    /// when `data` reports the generation of the previous sync.
    pub fn sync_data<D>(&mut self, data: &D) -> bool
    where
        D: ListData<Key = K> + ?Sized,
    {
        if !self.is_live() {
            return false;
        }
        let count = data.item_count();
        let generation = data.generation();
        let same_generation = generation.is_some() && generation == self.synced_generation;
        if same_generation && count == self.keys.len() {
            return false;
        }
        self.synced_generation = generation;
        let unchanged = self.keys.len() == count
            && self
                .keys
                .iter()
                .enumerate()
                .all(|(index, key)| data.key_eq(index, key));
        if unchanged {
            return false;
        }

        let keys: Vec<K> = (0..count).map(|index| data.key_of(index)).collect();
        let (carried, kept, revived) = {
            let heights = self.core.heights.borrow();
            // With duplicate keys the last measurement wins, and only the first
            // new occurrence takes it.
            let mut by_key: HashMap<&K, f64> = self
                .keys
                .iter()
                .enumerate()
                .filter_map(|(index, key)| heights.measured(index).map(|h| (key, h)))
                .collect();
            let (mut kept, mut revived) = (0, 0);
            let carried: Vec<Option<f64>> = keys
                .iter()
                .map(|key| {
                    if let Some(height) = by_key.remove(key) {
                        kept += 1;
                        return Some(height);
                    }
                    let height = self.retained.revive(key);
                    revived += usize::from(height.is_some());
                    height
                })
                .collect();
            for (key, height) in by_key {
                self.retained.retire(key.clone(), height);
            }
            (carried, kept, revived)
        };
        self.core.heights.borrow_mut().reset(count, carried);
        self.keys = keys;
        self.core.epoch.set(self.core.epoch.get() + 1);
        self.core.invalidate();
        debug!(
            items = count,
            kept,
            revived,
            retained = self.retained.len(),
            "list data identity changed"
        );
        true
    }

    /// Run one render pass.
    ///
    /// Calls `render_item(index, style, data, measure)` for each index in the
    /// visible range and returns the positioned nodes keyed by identity.
    /// `render_item` may call `measure` synchronously; the resulting layout
    /// change is picked up by the next render.
    pub fn render<D, N>(
        &mut self,
        data: &D,
        render_item: impl FnMut(usize, PositionStyle, &D, MeasureRef) -> N,
    ) -> ListFrame<K, N>
    where
        D: ListData<Key = K> + ?Sized,
    {
        self.sync_data(data);
        self.mount(data, render_item)
    }

    /// Render the visible window of data already passed to
    /// [`VirtualizedList::sync_data`].
    pub(crate) fn mount<D, N>(
        &mut self,
        data: &D,
        mut render_item: impl FnMut(usize, PositionStyle, &D, MeasureRef) -> N,
    ) -> ListFrame<K, N>
    where
        D: ListData<Key = K> + ?Sized,
    {
        let _span = debug_span!(
            "widget_render",
            widget = "VirtualizedList",
            items = self.keys.len(),
            scroll_top = self.scroll_top(),
            height = self.viewport_height()
        )
        .entered();

        let container = ContainerStyle {
            position: Position::Relative,
            height: self.viewport_height(),
            width: self.width,
            overflow_y: Overflow::Auto,
        };
        if !self.is_live() {
            return ListFrame {
                container,
                content_height: 0.0,
                range: 0..0,
                items: Vec::new(),
            };
        }

        let range = self.visible_range();
        let (tops, content_height) = {
            let heights = self.core.heights.borrow();
            let tops: Vec<f64> = range.clone().map(|index| heights.offset_of(index)).collect();
            (tops, heights.total_height())
        };

        let epoch = self.core.epoch.get();
        let mut items = Vec::with_capacity(tops.len());
        for (index, top) in range.clone().zip(tops) {
            let measure = MeasureRef {
                index,
                epoch,
                sink: self.sink(),
            };
            let node = render_item(index, PositionStyle::item_at(top), data, measure);
            items.push(MountedItem {
                key: self.keys[index].clone(),
                index,
                node,
            });
        }
        trace!(start = range.start, end = range.end, "list rendered");

        ListFrame {
            container,
            content_height,
            range,
            items,
        }
    }

    /// Release host listeners, then discard the height record.
    ///
    /// Idempotent. Outstanding [`MeasureRef`]s and [`ViewportHandle`]s become
    /// no-ops.
    pub fn teardown(&mut self) {
        if !self.is_live() {
            return;
        }
        let released = self.listeners.len();
        self.listeners.clear();
        self.core.live.set(false);
        self.core.heights.borrow_mut().reset(0, Vec::new());
        self.keys.clear();
        self.synced_generation = None;
        self.retained.clear();
        debug!(released, "list torn down");
    }
}

impl<K, M> Drop for VirtualizedList<K, M>
where
    K: Clone + Eq + Hash,
    M: HeightIndex + 'static,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
