use alloc::sync::Arc;
use core::cmp::Ordering;

/// A total order over tree keys.
pub type CompareFn<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// Builds a node aggregate from its left aggregate, its own entry, and its right aggregate.
///
/// The left/right order is significant: the result must equal the aggregate of the in-order
/// sequence `left ++ [entry] ++ right`.
pub type CombineFn<K, V, A> = Arc<dyn Fn(&A, &K, &V, &A) -> A + Send + Sync>;

/// Concatenates two adjacent aggregates (`left` immediately followed by `right`).
pub type JoinFn<A> = Arc<dyn Fn(&A, &A) -> A + Send + Sync>;

/// Strategy functions for [`crate::AggregateTree`].
///
/// Trees built from the same options share them through an `Arc`, so the closures run on
/// arbitrary rebalancing paths and must stay pure.
pub struct TreeOptions<K, V, A> {
    pub compare: CompareFn<K>,
    pub combine: CombineFn<K, V, A>,
    /// Used by range scans to extend the running left context with a left subtree.
    pub join: JoinFn<A>,
    /// The aggregate of an empty subtree.
    pub empty: A,
}

impl<K: Ord, V, A> TreeOptions<K, V, A> {
    /// Creates options ordered by `K: Ord`.
    pub fn new(
        empty: A,
        combine: impl Fn(&A, &K, &V, &A) -> A + Send + Sync + 'static,
        join: impl Fn(&A, &A) -> A + Send + Sync + 'static,
    ) -> Self {
        Self {
            compare: Arc::new(|a: &K, b: &K| a.cmp(b)),
            combine: Arc::new(combine),
            join: Arc::new(join),
            empty,
        }
    }
}

impl<K: Ord, V> TreeOptions<K, V, usize> {
    /// Aggregate = number of entries. Prefixes become in-order ranks.
    pub fn counting() -> Self {
        Self::new(0, |l, _, _, r| l + 1 + r, |l, r| l + r)
    }
}

impl<K: Ord, V> TreeOptions<K, V, u64> {
    /// Aggregate = summed extent. Prefixes become start offsets.
    pub fn summing(extent: impl Fn(&K, &V) -> u64 + Send + Sync + 'static) -> Self {
        Self::new(
            0,
            move |l, k, v, r| l.saturating_add(extent(k, v)).saturating_add(*r),
            |l, r| l.saturating_add(*r),
        )
    }
}

impl<K, V, A> TreeOptions<K, V, A> {
    /// Creates options with a custom key order.
    pub fn new_with_compare(
        compare: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static,
        empty: A,
        combine: impl Fn(&A, &K, &V, &A) -> A + Send + Sync + 'static,
        join: impl Fn(&A, &A) -> A + Send + Sync + 'static,
    ) -> Self {
        Self {
            compare: Arc::new(compare),
            combine: Arc::new(combine),
            join: Arc::new(join),
            empty,
        }
    }

    pub fn with_compare(
        mut self,
        compare: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.compare = Arc::new(compare);
        self
    }

    pub fn with_compare_fn(mut self, compare: CompareFn<K>) -> Self {
        self.compare = compare;
        self
    }
}

impl<K, V, A: Clone> Clone for TreeOptions<K, V, A> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
            combine: Arc::clone(&self.combine),
            join: Arc::clone(&self.join),
            empty: self.empty.clone(),
        }
    }
}

impl<K, V, A: core::fmt::Debug> core::fmt::Debug for TreeOptions<K, V, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TreeOptions")
            .field("empty", &self.empty)
            .finish_non_exhaustive()
    }
}
