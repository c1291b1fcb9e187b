#![forbid(unsafe_code)]

//! Viewport event seam between a host view system and the list.
//!
//! A host exposes a scrollable container as something implementing
//! [`ViewportEvents`]: it can report the current scroll offset and height, and
//! it lets callers register scroll listeners and size observers. Every
//! registration returns a [`Subscription`]; dropping it deregisters the
//! callback, so teardown is symmetric by construction.
//!
//! [`HeadlessViewport`] is the in-memory implementation. Tests and headless
//! embeddings drive it with [`HeadlessViewport::scroll_to`] and
//! [`HeadlessViewport::resize`], which dispatch synchronously in call order.
//!
//! # Sanitizing
//!
//! Scroll offsets and heights are pixel quantities and must be finite and
//! non-negative. Anything else (negative, NaN, infinite) is stored as `0.0`,
//! which also keeps `PartialEq`-based change detection well defined.

use crate::reactive::{Observable, Subscription};

/// Clamp a pixel quantity to a finite, non-negative value.
#[must_use]
pub fn sanitize_px(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// A scrollable surface that delivers scroll and resize signals.
pub trait ViewportEvents {
    /// Current scroll offset from the top, in pixels.
    fn scroll_top(&self) -> f64;

    /// Current visible height, in pixels.
    fn client_height(&self) -> f64;

    /// Register a scroll listener. It receives the new scroll offset.
    fn on_scroll(&self, callback: Box<dyn Fn(f64)>) -> Subscription;

    /// Register a size observer. It receives the new visible height.
    fn on_resize(&self, callback: Box<dyn Fn(f64)>) -> Subscription;
}

/// In-memory scroll container.
///
/// Cloning shares the same surface.
#[derive(Debug, Clone)]
pub struct HeadlessViewport {
    scroll_top: Observable<f64>,
    height: Observable<f64>,
}

impl HeadlessViewport {
    /// Create a surface with the given visible height and scroll offset 0.
    #[must_use]
    pub fn new(height: f64) -> Self {
        Self {
            scroll_top: Observable::new(0.0),
            height: Observable::new(sanitize_px(height)),
        }
    }

    /// Scroll to `offset`, notifying scroll listeners if it changed.
    pub fn scroll_to(&self, offset: f64) -> bool {
        let changed = self.scroll_top.set(sanitize_px(offset));
        if changed {
            tracing::trace!(offset, "headless viewport scrolled");
        }
        changed
    }

    /// Scroll by `delta` pixels.
    pub fn scroll_by(&self, delta: f64) -> bool {
        self.scroll_to(self.scroll_top.get() + delta)
    }

    /// Change the visible height, notifying size observers if it changed.
    pub fn resize(&self, height: f64) -> bool {
        let changed = self.height.set(sanitize_px(height));
        if changed {
            tracing::trace!(height, "headless viewport resized");
        }
        changed
    }

    /// Live scroll listeners.
    #[must_use]
    pub fn scroll_listener_count(&self) -> usize {
        self.scroll_top.live_subscriber_count()
    }

    /// Live size observers.
    #[must_use]
    pub fn resize_observer_count(&self) -> usize {
        self.height.live_subscriber_count()
    }
}

impl ViewportEvents for HeadlessViewport {
    fn scroll_top(&self) -> f64 {
        self.scroll_top.get()
    }

    fn client_height(&self) -> f64 {
        self.height.get()
    }

    fn on_scroll(&self, callback: Box<dyn Fn(f64)>) -> Subscription {
        self.scroll_top.subscribe(move |offset| callback(*offset))
    }

    fn on_resize(&self, callback: Box<dyn Fn(f64)>) -> Subscription {
        self.height.subscribe(move |height| callback(*height))
    }
}
