#![forbid(unsafe_code)]

//! Fenwick-tree height backend with O(log n) measurement updates.
//!
//! [`HeightModel`](crate::height::HeightModel) rebuilds its whole offset
//! table on every measurement, which is O(n) per callback. For very long
//! lists [`FenwickHeights`] keeps the same observable behavior while patching
//! a binary indexed tree instead.
//!
//! # Operations
//!
//! | Operation | Time |
//! |-----------|------|
//! | `record_measurement` | O(log n) |
//! | `offset_of` | O(log n) |
//! | `index_at_offset` | O(log n) |
//! | `total_height` | O(log n) |
//! | `set_item_count` / `set_estimate` / `reset` | O(n) rebuild |
//!
//! # Exactness
//!
//! The tree holds integer subpixel units (see
//! [`SUBPIXEL_STEPS`](crate::height::SUBPIXEL_STEPS)), so point updates and
//! prefix sums are exact regardless of summation order. Offsets converted back
//! to pixels are bit-identical to the eager model's.

use crate::height::{
    HeightIndex, SUBPIXEL_STEPS, fit_record, from_units, sanitize_estimate, sanitize_measurement,
    to_units,
};

/// Binary indexed tree over non-negative integers with prefix-sum search.
#[derive(Debug, Clone, Default)]
pub struct FenwickTree {
    /// 1-based partial sums; `tree[0]` is unused.
    tree: Vec<u64>,
    /// Plain copy of each value, so `get` and `set` need no tree walk.
    values: Vec<u64>,
}

impl FenwickTree {
    /// Build a tree over `values` in O(n).
    #[must_use]
    pub fn from_values(values: &[u64]) -> Self {
        let n = values.len();
        let mut tree = vec![0; n + 1];
        for (i, &value) in values.iter().enumerate() {
            let k = i + 1;
            tree[k] += value;
            let parent = k + lowbit(k);
            if parent <= n {
                let carried = tree[k];
                tree[parent] += carried;
            }
        }
        Self {
            tree,
            values: values.to_vec(),
        }
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the tree holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u64> {
        self.values.get(index).copied()
    }

    /// Overwrite the value at `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, value: u64) {
        let Some(slot) = self.values.get_mut(index) else {
            return;
        };
        let old = *slot;
        *slot = value;
        let mut k = index + 1;
        while k < self.tree.len() {
            // Each node covers `old`, so the decrement cannot underflow.
            if value >= old {
                self.tree[k] += value - old;
            } else {
                self.tree[k] -= old - value;
            }
            k += lowbit(k);
        }
    }

    /// Sum of the first `count` values.
    #[must_use]
    pub fn prefix(&self, count: usize) -> u64 {
        let mut k = count.min(self.len());
        let mut sum = 0;
        while k > 0 {
            sum += self.tree[k];
            k -= lowbit(k);
        }
        sum
    }

    /// Sum of all values.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.prefix(self.len())
    }

    /// Largest `count` in `0..=len` with `prefix(count) <= target`.
    ///
    /// Ties over zero-valued entries resolve to the largest count.
    #[must_use]
    pub fn count_at_most(&self, target: u64) -> usize {
        let n = self.len();
        if n == 0 {
            return 0;
        }
        let mut pos = 0;
        let mut remaining = target;
        let mut step = 1_usize << (usize::BITS - 1 - n.leading_zeros());
        while step > 0 {
            let next = pos + step;
            if next <= n && self.tree[next] <= remaining {
                pos = next;
                remaining -= self.tree[next];
            }
            step >>= 1;
        }
        pos
    }
}

#[inline]
fn lowbit(k: usize) -> usize {
    k & k.wrapping_neg()
}

/// Height record backed by a [`FenwickTree`].
#[derive(Debug, Clone, Default)]
pub struct FenwickHeights {
    estimate: f64,
    measured: Vec<Option<f64>>,
    tree: FenwickTree,
    recomputations: u64,
}

impl FenwickHeights {
    /// Create a tracker for `count` unmeasured items of height `estimate`.
    #[must_use]
    pub fn new(count: usize, estimate: f64) -> Self {
        let mut heights = Self {
            estimate: sanitize_estimate(estimate),
            measured: vec![None; count],
            tree: FenwickTree::default(),
            recomputations: 0,
        };
        heights.rebuild();
        heights
    }

    fn rebuild(&mut self) {
        let values: Vec<u64> = self
            .measured
            .iter()
            .map(|slot| to_units(slot.unwrap_or(self.estimate)))
            .collect();
        self.tree = FenwickTree::from_values(&values);
        self.recomputations += 1;
    }
}

impl HeightIndex for FenwickHeights {
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
        from_units(self.tree.prefix(index))
    }

    fn total_height(&self) -> f64 {
        from_units(self.tree.total())
    }

    fn index_at_offset(&self, position: f64) -> Option<usize> {
        let n = self.item_count();
        if n == 0 {
            return None;
        }
        if position.is_nan() || position < 0.0 {
            return Some(0);
        }
        // Offsets are whole units, so `offset <= position` is
        // `units <= floor(position * steps)`; the cast saturates for huge input.
        let target = (position * SUBPIXEL_STEPS).floor() as u64;
        // offset(i) == prefix(i), so the rightmost i with offset(i) <= position
        // is the largest count with prefix(count) <= position, capped at n - 1.
        Some(self.tree.count_at_most(target).min(n - 1))
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
        self.tree.set(index, to_units(height));
        self.recomputations += 1;
        true
    }

    fn set_item_count(&mut self, count: usize) -> bool {
        if count == self.measured.len() {
            return false;
        }
        self.measured.resize(count, None);
        self.rebuild();
        true
    }

    fn set_estimate(&mut self, estimate: f64) -> bool {
        let estimate = sanitize_estimate(estimate);
        if estimate == self.estimate {
            return false;
        }
        self.estimate = estimate;
        self.rebuild();
        true
    }

    fn reset(&mut self, count: usize, measurements: Vec<Option<f64>>) {
        self.measured = fit_record(measurements, count);
        self.rebuild();
    }

    fn recomputations(&self) -> u64 {
        self.recomputations
    }
}
