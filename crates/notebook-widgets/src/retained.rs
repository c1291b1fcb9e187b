#![forbid(unsafe_code)]

//! Bounded store of heights for items that left the list.
//!
//! When a filter hides items, their measured heights move here instead of
//! being dropped. If the items come back, the list restores their heights
//! rather than falling back to the estimate. The oldest retired entries are
//! evicted first once the store is full.
//!
//! # Example
//!
//! ```
//! use notebook_widgets::retained::RetainedHeights;
//!
//! let mut retained = RetainedHeights::new(2);
//! retained.retire("a", 10.0);
//! retained.retire("b", 20.0);
//! retained.retire("c", 30.0); // evicts "a"
//!
//! assert_eq!(retained.revive(&"a"), None);
//! assert_eq!(retained.revive(&"c"), Some(30.0));
//! assert_eq!(retained.len(), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Default number of retired heights a list keeps.
pub const DEFAULT_RETAINED_HEIGHTS: usize = 4096;

/// FIFO-evicting map from item identity to its last measured height.
#[derive(Debug, Clone)]
pub struct RetainedHeights<K> {
    /// Height and the stamp of the retirement that stored it.
    heights: HashMap<K, (f64, u64)>,
    /// Retirement order. Entries whose stamp no longer matches are stale.
    order: VecDeque<(K, u64)>,
    capacity: usize,
    next_stamp: u64,
}

impl<K: Clone + Eq + Hash> RetainedHeights<K> {
    /// Create a store holding at most `capacity` heights. Zero disables it.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            heights: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            next_stamp: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Remember `height` for `key`, evicting the oldest entry when full.
    pub fn retire(&mut self, key: K, height: f64) {
        if self.capacity == 0 {
            return;
        }
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.heights.insert(key.clone(), (height, stamp));
        self.order.push_back((key, stamp));

        while self.heights.len() > self.capacity {
            let Some((oldest, stamp)) = self.order.pop_front() else {
                break;
            };
            if self.heights.get(&oldest).is_some_and(|&(_, s)| s == stamp) {
                self.heights.remove(&oldest);
            }
        }
        if self.order.len() > self.capacity * 2 {
            let heights = &self.heights;
            self.order
                .retain(|(key, stamp)| heights.get(key).is_some_and(|&(_, s)| s == *stamp));
        }
    }

    /// Take the retained height for `key`, if any.
    pub fn revive(&mut self, key: &K) -> Option<f64> {
        self.heights.remove(key).map(|(height, _)| height)
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.heights.clear();
        self.order.clear();
    }
}
