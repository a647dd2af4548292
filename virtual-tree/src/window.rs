use alloc::sync::Arc;

use crate::{AggregateTree, RangePosition};

/// The scroll-axis interval to realize: the viewport widened by a margin on both ends.
///
/// The margin lays out items just outside the viewport ahead of time, so a scroll does not
/// reveal blank space while their resources are still being acquired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowBounds {
    pub min: u64,
    pub max: u64,
}

impl WindowBounds {
    /// `margin_ratio` is the margin on each side as a fraction of `extent`.
    pub fn new(offset: u64, extent: u64, margin_ratio: f32) -> Self {
        let margin = (extent as f64 * f64::from(margin_ratio.max(0.0))) as u64;
        Self {
            min: offset.saturating_sub(margin),
            max: offset.saturating_add(extent).saturating_add(margin),
        }
    }

    /// Classifies an item by where it lies relative to the bounds.
    ///
    /// Monotonic over items laid out back to back: both `start` and `start + extent` only grow
    /// along the in-order sequence.
    pub fn classify(&self, start: u64, extent: u64) -> RangePosition {
        if start.saturating_add(extent) < self.min {
            RangePosition::Below
        } else if start > self.max {
            RangePosition::Above
        } else {
            RangePosition::In
        }
    }

    /// Exact overlap test for one item.
    pub fn contains(&self, start: u64, extent: u64) -> bool {
        start <= self.max && start.saturating_add(extent) >= self.min
    }
}

/// One entry of the visible window.
pub struct VisibleEntry<'a, K, V> {
    pub key: &'a K,
    pub value: &'a Arc<V>,
    /// Start offset in the scroll axis.
    pub start: u64,
    pub extent: u64,
}

impl<K, V> VisibleEntry<'_, K, V> {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.extent)
    }
}

impl<K: core::fmt::Debug, V: core::fmt::Debug> core::fmt::Debug for VisibleEntry<'_, K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VisibleEntry")
            .field("key", self.key)
            .field("value", &**self.value)
            .field("start", &self.start)
            .field("extent", &self.extent)
            .finish()
    }
}

/// Yields, in order, the entries of an extent-summed tree that overlap `bounds`.
///
/// `extent_of` must agree with the extents the tree's aggregate sums. The range scan prunes
/// by each entry's prefix (its start offset); every candidate is then checked exactly against
/// `bounds`, which is what decides membership.
pub fn visible_entries<'a, K, V, E>(
    tree: &'a AggregateTree<K, V, u64>,
    bounds: WindowBounds,
    extent_of: E,
) -> impl Iterator<Item = VisibleEntry<'a, K, V>> + 'a
where
    K: Clone,
    E: Fn(&K, &V) -> u64 + Clone + 'a,
{
    let classify = extent_of.clone();
    tree.range(move |k, v, prefix| bounds.classify(*prefix, classify(k, v)))
        .map(move |entry| VisibleEntry {
            key: entry.key,
            value: entry.value,
            start: entry.prefix,
            extent: extent_of(entry.key, &**entry.value),
        })
        .filter(move |entry| bounds.contains(entry.start, entry.extent))
}
