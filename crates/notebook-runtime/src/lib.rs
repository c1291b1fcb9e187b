#![forbid(unsafe_code)]

//! Runtime: reactive state and viewport event plumbing for the notebook list.
//!
//! # Role in the notebook
//! `notebook-runtime` is the layer between a host view system and the
//! virtualized list in `notebook-widgets`. It owns no layout math; it only
//! moves values and signals around.
//!
//! # Primary responsibilities
//! - **Observable**: a version-tracked state holder with `set`/`subscribe`,
//!   used for the list's layout revision and for headless viewport signals.
//! - **Subscription**: RAII deregistration for every callback handed to a
//!   host.
//! - **ViewportEvents**: the seam a host implements to deliver scroll offsets
//!   and viewport heights.
//!
//! # Threading
//! Everything here is single-threaded (`Rc`/`RefCell`). Host events are
//! expected to be dispatched one at a time from the host's event loop.

pub mod reactive;
pub mod viewport;

pub use reactive::{Observable, Subscription};
pub use viewport::{HeadlessViewport, ViewportEvents};
