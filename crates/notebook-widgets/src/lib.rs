#![forbid(unsafe_code)]

//! Widgets: the variable-height virtualized list and the notebook modal host.
//!
//! # Role in the notebook
//! `notebook-widgets` decides which notes are mounted, where each one sits,
//! and how real measurements feed back into that placement. The host view
//! system draws; this crate computes.
//!
//! # Primary responsibilities
//! - **Height tracking**: [`height::HeightModel`] (eager offset table) and
//!   [`fenwick::FenwickHeights`] (logarithmic updates) behind
//!   [`height::HeightIndex`].
//! - **Windowing**: [`window::visible_range`] maps scroll position and
//!   viewport height to mounted indices with overscan.
//! - **Engine**: [`virtualized::VirtualizedList`] renders positioned items,
//!   accepts measurements, follows item identity across reordering, and tears
//!   down its host listeners. [`retained::RetainedHeights`] keeps the heights
//!   of filtered-out items for when they return.
//! - **Notebook**: [`notes`], [`settings`] and [`modal`] are the modal host
//!   around the engine.
//!
//! # How it fits in the system
//! Viewport signals arrive through `notebook_runtime::ViewportEvents`, and
//! layout changes leave through a `notebook_runtime::Observable` revision the
//! host subscribes to.

pub mod error;
pub mod fenwick;
pub mod height;
pub mod modal;
pub mod notes;
pub mod retained;
pub mod settings;
pub mod virtualized;
pub mod window;

pub use error::NotebookError;
pub use fenwick::FenwickHeights;
pub use height::{HeightIndex, HeightModel};
pub use modal::{ModalView, NotebookModal, Placeholder};
pub use notes::{Note, NoteQuery, NoteStore, SortDirection, SortKey};
pub use retained::RetainedHeights;
pub use settings::NotebookSettings;
pub use virtualized::{
    ListConfig, ListData, ListFrame, ListProps, MeasureRef, PositionStyle, VirtualizedList,
    ViewportHandle, Width,
};
pub use window::visible_range;
