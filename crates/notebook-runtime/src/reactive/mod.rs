#![forbid(unsafe_code)]

//! Reactive state for the notebook list.
//!
//! - [`Observable`]: a shared, version-tracked value with change notification
//!   via subscriber callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Subscribers are stored as `Weak` callbacks and pruned lazily during
//! notification.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. A dropped [`Subscription`] is never called again.

pub mod observable;

pub use observable::{Observable, Subscription};
