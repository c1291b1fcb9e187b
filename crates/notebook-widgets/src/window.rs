#![forbid(unsafe_code)]

//! Visible range computation.
//!
//! Maps a scroll position and viewport height to the contiguous run of items
//! that must be mounted, using the offset lookup of a [`HeightIndex`].

use std::ops::Range;

use notebook_runtime::viewport::sanitize_px;

use crate::height::HeightIndex;

/// Indices to mount for the given viewport, as a half-open range.
///
/// The first visible item is the rightmost one whose top is `<= scroll_top`;
/// the last is the rightmost one whose top is `<= scroll_top +
/// viewport_height`. Both ends are then widened by `overscan` and clamped to
/// `0..item_count`. The inclusive end index is `range.end - 1`.
///
/// Returns `0..0` when there are no items. Negative or non-finite scroll and
/// viewport values count as 0, so an unmeasured viewport still mounts the
/// first item plus overscan.
#[must_use]
pub fn visible_range<M: HeightIndex + ?Sized>(
    model: &M,
    scroll_top: f64,
    viewport_height: f64,
    overscan: usize,
) -> Range<usize> {
    let scroll_top = sanitize_px(scroll_top);
    let viewport_height = sanitize_px(viewport_height);

    let Some(first) = model.index_at_offset(scroll_top) else {
        return 0..0;
    };
    let last = model
        .index_at_offset(scroll_top + viewport_height)
        .unwrap_or(first);

    let last_index = model.item_count() - 1;
    let start = first.saturating_sub(overscan);
    let end = last.saturating_add(overscan).min(last_index);
    start..end + 1
}
