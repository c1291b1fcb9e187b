#![forbid(unsafe_code)]

//! Height record and derived offset table.
//!
//! Items have heights that are unknown until they are first mounted. Until
//! then every item is assumed to be `estimate` pixels tall. Once an item
//! reports its real height, that measurement replaces the estimate for its
//! index and every later offset shifts.
//!
//! # Core Types
//!
//! - [`HeightIndex`] - the query/update contract shared by height backends
//! - [`HeightModel`] - eager backend: a flat offset table rebuilt on change
//!
//! The Fenwick-tree backend lives in [`crate::fenwick`].
//!
//! # Invariants
//!
//! 1. `offset_of(0) == 0`
//! 2. `offset_of(i) == offset_of(i - 1) + height_of(i - 1)` for `0 < i < n`
//! 3. `total_height() == offset_of(n - 1) + height_of(n - 1)`, or 0 when empty
//! 4. Offsets are non-decreasing, so `index_at_offset` may binary search
//! 5. A measurement equal to the stored one changes nothing
//!
//! # Failure Modes
//!
//! | Input | Behavior |
//! |-------|----------|
//! | Negative measurement | Clamped to 0 |
//! | NaN / infinite measurement | Ignored |
//! | Measurement for `index >= n` | Ignored |
//! | Negative / non-finite estimate | Treated as 0 |
//! | Fractional height | Rounded to the nearest 1/256 px |
//! | Height above [`MAX_ITEM_HEIGHT`] | Clamped to [`MAX_ITEM_HEIGHT`] |
//!
//! # Subpixel grid
//!
//! Stored heights are multiples of `1 / SUBPIXEL_STEPS` px. Sums of such values
//! are exact in `f64` (and in the integer units of the Fenwick backend), so
//! `offset_of(i + 1) == offset_of(i) + height_of(i)` holds exactly and every
//! backend agrees on every offset, as long as the total stays below 2^45 px.

/// Query and update contract for per-item heights.
///
/// All heights and offsets are device-independent pixels.
pub trait HeightIndex {
    /// Number of items tracked.
    fn item_count(&self) -> usize;

    /// Height assumed for unmeasured items.
    fn estimate(&self) -> f64;

    /// Measured height for `index`, if one has been recorded.
    fn measured(&self, index: usize) -> Option<f64>;

    /// Measured height if known, else the estimate.
    fn height_of(&self, index: usize) -> f64 {
        self.measured(index).unwrap_or_else(|| self.estimate())
    }

    /// Sum of the heights of all items before `index`.
    ///
    /// Indices at or past the end return [`HeightIndex::total_height`].
    fn offset_of(&self, index: usize) -> f64;

    /// Height of the whole content.
    fn total_height(&self) -> f64;

    /// Rightmost index whose offset is `<= position`.
    ///
    /// Returns `None` only when there are no items. Positions before the
    /// start map to index 0.
    fn index_at_offset(&self, position: f64) -> Option<usize>;

    /// Store a measurement for `index`. Returns whether derived state changed.
    fn record_measurement(&mut self, index: usize, height: f64) -> bool;

    /// Change the number of items. Records past the new end are dropped.
    fn set_item_count(&mut self, count: usize) -> bool;

    /// Change the height assumed for unmeasured items.
    fn set_estimate(&mut self, estimate: f64) -> bool;

    /// Replace the whole height record in one step.
    ///
    /// `measurements` is truncated or padded with `None` to `count`.
    fn reset(&mut self, count: usize, measurements: Vec<Option<f64>>);

    /// How many times derived state has been rebuilt or patched.
    fn recomputations(&self) -> u64;
}

/// Subdivisions of a pixel that heights are rounded to.
pub const SUBPIXEL_STEPS: f64 = 256.0;

/// Largest height a single item can take, in pixels.
pub const MAX_ITEM_HEIGHT: f64 = 16_777_216.0;

/// Round a finite pixel quantity onto the subpixel grid, clamped to
/// `0..=MAX_ITEM_HEIGHT`.
fn quantize(px: f64) -> f64 {
    (px.clamp(0.0, MAX_ITEM_HEIGHT) * SUBPIXEL_STEPS).round() / SUBPIXEL_STEPS
}

/// Grid units of an already quantized height.
pub(crate) fn to_units(px: f64) -> u64 {
    (px * SUBPIXEL_STEPS) as u64
}

pub(crate) fn from_units(units: u64) -> f64 {
    units as f64 / SUBPIXEL_STEPS
}

/// Normalize a reported measurement: `None` when it must be ignored.
pub(crate) fn sanitize_measurement(height: f64) -> Option<f64> {
    if !height.is_finite() {
        return None;
    }
    Some(quantize(height))
}

pub(crate) fn sanitize_estimate(estimate: f64) -> f64 {
    if estimate.is_finite() {
        quantize(estimate)
    } else {
        0.0
    }
}

pub(crate) fn fit_record(mut measurements: Vec<Option<f64>>, count: usize) -> Vec<Option<f64>> {
    measurements.resize(count, None);
    for slot in &mut measurements {
        *slot = slot.and_then(sanitize_measurement);
    }
    measurements
}

/// Height record with an eagerly rebuilt offset table.
///
/// Every change rebuilds all offsets in O(n). Lookups are O(1) and
/// `index_at_offset` is a binary search over the table.
#[derive(Debug, Clone)]
pub struct HeightModel {
    estimate: f64,
    /// One slot per item; `None` means "use the estimate".
    measured: Vec<Option<f64>>,
    /// `offsets[i]` is the top of item `i`.
    offsets: Vec<f64>,
    total: f64,
    recomputations: u64,
}

impl Default for HeightModel {
    fn default() -> Self {
        Self::new(0, 0.0)
    }
}

impl HeightModel {
    /// Create a model for `count` unmeasured items of height `estimate`.
    #[must_use]
    pub fn new(count: usize, estimate: f64) -> Self {
        let mut model = Self {
            estimate: sanitize_estimate(estimate),
            measured: vec![None; count],
            offsets: Vec::with_capacity(count),
            total: 0.0,
            recomputations: 0,
        };
        model.recompute();
        model
    }

    /// The full offset table, one entry per item.
    #[must_use]
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    fn recompute(&mut self) {
        self.offsets.clear();
        let mut top = 0.0;
        for slot in &self.measured {
            self.offsets.push(top);
            top += slot.unwrap_or(self.estimate);
        }
        self.total = top;
        self.recomputations += 1;
    }
}

impl HeightIndex for HeightModel {
    fn item_count(&self) -> usize {
        self.measured.len()
    }

    fn estimate(&self) -> f64 {
        self.estimate
    }

    fn measured(&self, index: usize) -> Option<f64> {
        self.measured.get(index).copied().flatten()
    }

    fn offset_of(&self, index: usize) -> f64 {
        self.offsets.get(index).copied().unwrap_or(self.total)
    }

    fn total_height(&self) -> f64 {
        self.total
    }

    fn index_at_offset(&self, position: f64) -> Option<usize> {
        if self.offsets.is_empty() {
            return None;
        }
        // `<=` keeps an item whose top equals `position` as the answer.
        let past = self.offsets.partition_point(|&top| top <= position);
        Some(past.saturating_sub(1))
    }

    fn record_measurement(&mut self, index: usize, height: f64) -> bool {
        let Some(height) = sanitize_measurement(height) else {
            return false;
        };
        let Some(slot) = self.measured.get_mut(index) else {
            return false;
        };
        if *slot == Some(height) {
            return false;
        }
        *slot = Some(height);
        self.recompute();
        true
    }

    fn set_item_count(&mut self, count: usize) -> bool {
        if count == self.measured.len() {
            return false;
        }
        self.measured.resize(count, None);
        self.recompute();
        true
    }

    fn set_estimate(&mut self, estimate: f64) -> bool {
        let estimate = sanitize_estimate(estimate);
        if estimate == self.estimate {
            return false;
        }
        self.estimate = estimate;
        self.recompute();
        true
    }

    fn reset(&mut self, count: usize, measurements: Vec<Option<f64>>) {
        self.measured = fit_record(measurements, count);
        self.recompute();
    }

    fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_model() {
        let model = HeightModel::new(0, 150.0);
        assert_eq!(model.total_height(), 0.0);
        assert!(model.offsets().is_empty());
        assert_eq!(model.index_at_offset(0.0), None);
        assert_eq!(model.offset_of(0), 0.0);
    }

    #[test]
    fn unmeasured_items_use_estimate() {
        let model = HeightModel::new(4, 150.0);
        assert_eq!(model.offsets(), &[0.0, 150.0, 300.0, 450.0]);
        assert_eq!(model.total_height(), 600.0);
        assert_eq!(model.height_of(3), 150.0);
        assert_eq!(model.measured(3), None);
    }

    #[test]
    fn growing_first_item_shifts_every_later_offset() {
        let mut model = HeightModel::new(100, 150.0);
        assert_eq!(model.offset_of(1), 150.0);
        let before: Vec<f64> = model.offsets().to_vec();

        assert!(model.record_measurement(0, 300.0));

        assert_eq!(model.offset_of(0), 0.0);
        assert_eq!(model.offset_of(1), 300.0);
        for i in 1..100 {
            assert_eq!(model.offset_of(i), before[i] + 150.0, "offset {i}");
        }
        assert_eq!(model.total_height(), 100.0 * 150.0 + 150.0);
    }

    #[test]
    fn identical_measurement_recomputes_once() {
        let mut model = HeightModel::new(10, 150.0);
        let baseline = model.recomputations();

        assert!(model.record_measurement(3, 90.0));
        assert!(!model.record_measurement(3, 90.0));

        assert_eq!(model.recomputations(), baseline + 1);
    }

    #[test]
    fn measurement_equal_to_estimate_still_counts_as_known() {
        let mut model = HeightModel::new(3, 150.0);
        assert!(model.record_measurement(1, 150.0));
        assert_eq!(model.measured(1), Some(150.0));
        // Changing the estimate must not move a measured item.
        model.set_estimate(10.0);
        assert_eq!(model.height_of(1), 150.0);
        assert_eq!(model.height_of(0), 10.0);
    }

    #[test]
    fn negative_measurement_clamps_to_zero() {
        let mut model = HeightModel::new(3, 100.0);
        assert!(model.record_measurement(1, -40.0));
        assert_eq!(model.height_of(1), 0.0);
        assert_eq!(model.offsets(), &[0.0, 100.0, 100.0]);
    }

    #[test]
    fn zero_measurement_is_a_collapsed_item() {
        let mut model = HeightModel::new(3, 100.0);
        assert!(model.record_measurement(0, 0.0));
        assert_eq!(model.offsets(), &[0.0, 0.0, 100.0]);
    }

    #[test]
    fn non_finite_and_out_of_range_measurements_are_ignored() {
        let mut model = HeightModel::new(3, 100.0);
        let baseline = model.recomputations();
        assert!(!model.record_measurement(0, f64::NAN));
        assert!(!model.record_measurement(1, f64::INFINITY));
        assert!(!model.record_measurement(7, 40.0));
        assert_eq!(model.recomputations(), baseline);
    }

    #[test]
    fn fractional_heights_snap_to_subpixel_grid() {
        let mut model = HeightModel::new(3, 33.3);
        assert_eq!(model.estimate(), 8525.0 / 256.0);
        assert!(model.record_measurement(0, 0.1));
        assert_eq!(model.measured(0), Some(26.0 / 256.0));
        // Jitter below half a step rounds to the stored value.
        assert!(!model.record_measurement(0, 0.1001));
        assert_eq!(model.offset_of(2), model.offset_of(1) + model.height_of(1));
    }

    #[test]
    fn oversized_measurement_is_clamped() {
        let mut model = HeightModel::new(2, 10.0);
        assert!(model.record_measurement(0, 1e300));
        assert_eq!(model.height_of(0), MAX_ITEM_HEIGHT);
        assert_eq!(model.offset_of(1), MAX_ITEM_HEIGHT);
    }

    #[test]
    fn index_at_offset_tie_break_is_rightmost_le() {
        let model = HeightModel::new(5, 150.0);
        // Scroll exactly at the top of item 1 selects item 1, not item 0.
        assert_eq!(model.index_at_offset(150.0), Some(1));
        assert_eq!(model.index_at_offset(149.9), Some(0));
        assert_eq!(model.index_at_offset(-20.0), Some(0));
        assert_eq!(model.index_at_offset(10_000.0), Some(4));
    }

    #[test]
    fn index_at_offset_skips_past_collapsed_items() {
        let mut model = HeightModel::new(5, 100.0);
        model.record_measurement(1, 0.0);
        model.record_measurement(2, 0.0);
        // Offsets: [0, 100, 100, 100, 200]
        assert_eq!(model.index_at_offset(100.0), Some(3));
    }

    #[test]
    fn shrinking_drops_records_for_removed_items() {
        let mut model = HeightModel::new(4, 50.0);
        model.record_measurement(3, 10.0);
        assert!(model.set_item_count(2));
        assert!(model.set_item_count(4));
        assert_eq!(model.measured(3), None);
        assert!(!model.set_item_count(4));
    }

    #[test]
    fn reset_replaces_record_in_one_recompute() {
        let mut model = HeightModel::new(2, 50.0);
        let baseline = model.recomputations();
        model.reset(3, vec![Some(10.0), None, Some(-5.0), Some(99.0)]);
        assert_eq!(model.recomputations(), baseline + 1);
        assert_eq!(model.offsets(), &[0.0, 10.0, 60.0]);
        assert_eq!(model.total_height(), 60.0);
    }

    proptest! {
        #[test]
        fn offsets_monotone_and_consistent(
            count in 0usize..200,
            estimate in 0.0f64..400.0,
            measurements in proptest::collection::vec((0usize..220, -50.0f64..600.0), 0..64)
        ) {
            let mut model = HeightModel::new(count, estimate);
            for (index, height) in measurements {
                model.record_measurement(index, height);
            }
            let offsets = model.offsets();
            prop_assert_eq!(offsets.len(), count);
            if count == 0 {
                prop_assert_eq!(model.total_height(), 0.0);
            } else {
                prop_assert_eq!(offsets[0], 0.0);
                for i in 1..count {
                    prop_assert!(offsets[i] >= offsets[i - 1]);
                    prop_assert_eq!(offsets[i], offsets[i - 1] + model.height_of(i - 1));
                }
                prop_assert_eq!(
                    model.total_height(),
                    offsets[count - 1] + model.height_of(count - 1)
                );
            }
        }
    }
}
