use alloc::sync::Arc;
use core::cmp::Ordering;
use core::fmt;
use core::ops::Index;

use crate::node::{Color, Link, Node, build};
use crate::range::{Iter, RangeIter};
use crate::zipper::Zipper;
use crate::{InvariantViolation, OverwriteMode, RangePosition, TreeError, TreeOptions};

/// A persistent red-black tree whose nodes carry a caller-defined aggregate.
///
/// Every "mutation" returns a new tree that shares all untouched subtrees with the receiver;
/// the receiver itself never changes. Cloning is two reference-count bumps, so a tree value
/// doubles as a snapshot that can be handed to other threads.
///
/// Each node caches `combine(left.aggregate, key, value, right.aggregate)`, which lets
/// [`AggregateTree::range`] locate entries by a running aggregate (e.g. "items whose start
/// offset falls in the viewport") in `O(log n + k)`.
///
/// | Operation                       | Complexity   |
/// |---------------------------------|--------------|
/// | `get` / `contains_key`          | O(log n)     |
/// | `with` / `try_with` / `without` | O(log n)     |
/// | `with_empty` / `len` / `total`  | O(1)         |
/// | `range` (monotonic predicate)   | O(log n + k) |
pub struct AggregateTree<K, V, A> {
    root: Link<K, V, A>,
    options: Arc<TreeOptions<K, V, A>>,
}

impl<K, V, A> Clone for AggregateTree<K, V, A> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            options: Arc::clone(&self.options),
        }
    }
}

impl<K, V, A> AggregateTree<K, V, A> {
    pub fn new(options: TreeOptions<K, V, A>) -> Self {
        Self {
            root: None,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &TreeOptions<K, V, A> {
        &self.options
    }

    pub fn len(&self) -> usize {
        crate::node::count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Aggregate of the whole tree (`options.empty` when empty).
    pub fn total(&self) -> &A {
        crate::node::aggregate(&self.root, &self.options)
    }

    /// Returns `true` if both trees share the same root node (or are both empty).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// The empty tree with the same options.
    pub fn with_empty(&self) -> Self {
        Self {
            root: None,
            options: Arc::clone(&self.options),
        }
    }

    pub fn clear(&self) -> Self {
        self.with_empty()
    }

    pub fn iter(&self) -> Iter<'_, K, V, A> {
        Iter::new(&self.root)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some((&node.key, &*node.value))
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some((&node.key, &*node.value))
    }

    fn find(&self, key: &K) -> Option<&Node<K, V, A>> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            cur = match (self.options.compare)(key, &node.key) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(node),
            };
        }
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|n| &*n.value)
    }

    /// Returns the shared value handle, for callers that want to keep it past the tree.
    pub fn get_arc(&self, key: &K) -> Option<Arc<V>> {
        self.find(key).map(|n| Arc::clone(&n.value))
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.find(key).map(|n| (&n.key, &*n.value))
    }

    /// Like indexing, but reports a missing key as [`TreeError::KeyNotFound`].
    pub fn value(&self, key: &K) -> Result<&V, TreeError> {
        self.get(key).ok_or(TreeError::KeyNotFound)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }
}

impl<K: Clone, V, A: Clone> AggregateTree<K, V, A> {
    /// Bulk-builds a tree by upserting every entry in order.
    pub fn from_iter_with(
        options: TreeOptions<K, V, A>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let tree = entries
            .into_iter()
            .fold(Self::new(options), |tree, (k, v)| tree.with(k, v));
        vdebug!(len = tree.len(), "AggregateTree::from_iter_with");
        tree
    }

    /// Returns a tree with `key` mapped to `value`, inserting or replacing as needed.
    pub fn with(&self, key: K, value: V) -> Self {
        self.with_arc(key, Arc::new(value))
    }

    /// Like [`AggregateTree::with`], for a value that is already shared.
    pub fn with_arc(&self, key: K, value: Arc<V>) -> Self {
        // Upsert has no failure case.
        self.try_with_arc(key, value, OverwriteMode::Upsert)
            .unwrap_or_else(|_| self.clone())
    }

    /// Returns a tree with `key` mapped to `value`, subject to `mode`.
    pub fn try_with(&self, key: K, value: V, mode: OverwriteMode) -> Result<Self, TreeError> {
        self.try_with_arc(key, Arc::new(value), mode)
    }

    /// Like [`AggregateTree::try_with`], for a value that is already shared.
    ///
    /// Replacing an entry with the very same value handle (`Arc::ptr_eq`) returns the receiver
    /// itself.
    pub fn try_with_arc(
        &self,
        key: K,
        value: Arc<V>,
        mode: OverwriteMode,
    ) -> Result<Self, TreeError> {
        let options = &*self.options;
        let mut zipper = Zipper::new(options);

        let root = match zipper.descend(&self.root, &key) {
            Some(existing) => {
                if mode == OverwriteMode::Forbid {
                    return Err(TreeError::DuplicateKey);
                }
                if Arc::ptr_eq(&existing.value, &value) {
                    return Ok(self.clone());
                }
                let replaced = build(
                    options,
                    existing.key.clone(),
                    value,
                    existing.color,
                    existing.left.clone(),
                    existing.right.clone(),
                );
                zipper.zip_up(Some(replaced))
            }
            None => {
                if mode == OverwriteMode::Require {
                    return Err(TreeError::KeyNotFound);
                }
                zipper.insert(build(options, key, value, Color::Red, None, None))
            }
        };
        vtrace!(len = crate::node::count(&root), "AggregateTree::try_with");
        Ok(self.with_root(root))
    }

    /// Returns a tree without `key`, or the receiver itself if `key` is absent.
    pub fn without(&self, key: &K) -> Self {
        self.try_without(key).unwrap_or_else(|_| self.clone())
    }

    /// Like [`AggregateTree::without`], but reports an absent key.
    pub fn try_without(&self, key: &K) -> Result<Self, TreeError> {
        let root = Zipper::new(&*self.options)
            .remove(&self.root, key)
            .ok_or(TreeError::KeyNotFound)?;
        vtrace!(len = crate::node::count(&root), "AggregateTree::without");
        Ok(self.with_root(root))
    }

    /// Scans, in key order, the entries for which `predicate(key, value, prefix)` is `In`.
    ///
    /// `prefix` is the aggregate of every entry strictly before the one being classified.
    /// `predicate` must be monotonic over the in-order sequence (all `Below`, then all `In`,
    /// then all `Above`); subtrees that can only hold `Below` or `Above` entries are skipped.
    /// A non-monotonic predicate still terminates, but the result is unspecified.
    pub fn range<F>(&self, predicate: F) -> RangeIter<'_, K, V, A, F>
    where
        F: FnMut(&K, &V, &A) -> RangePosition,
    {
        RangeIter::new(&self.options, &self.root, predicate)
    }

    fn with_root(&self, root: Link<K, V, A>) -> Self {
        Self {
            root,
            options: Arc::clone(&self.options),
        }
    }
}

impl<K, V, A: PartialEq> AggregateTree<K, V, A> {
    /// Verifies search order, coloring, black heights, counts and cached aggregates.
    ///
    /// Intended for tests and diagnostics; a violation means the balancing code is broken.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.root.as_ref().is_some_and(|r| r.is_red()) {
            return Err(InvariantViolation::RedRoot);
        }
        check_subtree(&self.options, &self.root, None, None).map(|_| ())
    }
}

/// Returns the black height of `link` (empty leaves count as one).
fn check_subtree<K, V, A: PartialEq>(
    options: &TreeOptions<K, V, A>,
    link: &Link<K, V, A>,
    lower: Option<&K>,
    upper: Option<&K>,
) -> Result<usize, InvariantViolation> {
    let Some(node) = link.as_deref() else {
        return Ok(1);
    };
    if lower.is_some_and(|lo| (options.compare)(lo, &node.key) != Ordering::Less)
        || upper.is_some_and(|hi| (options.compare)(&node.key, hi) != Ordering::Less)
    {
        return Err(InvariantViolation::OutOfOrder);
    }
    if node.is_red()
        && (crate::node::is_red(&node.left) || crate::node::is_red(&node.right))
    {
        return Err(InvariantViolation::RedChildOfRed);
    }

    let left = check_subtree(options, &node.left, lower, Some(&node.key))?;
    let right = check_subtree(options, &node.right, Some(&node.key), upper)?;
    if left != right {
        return Err(InvariantViolation::BlackHeightMismatch { left, right });
    }

    let actual = crate::node::count(&node.left) + 1 + crate::node::count(&node.right);
    if node.count != actual {
        return Err(InvariantViolation::CountMismatch {
            stored: node.count,
            actual,
        });
    }
    let expected = (options.combine)(
        crate::node::aggregate(&node.left, options),
        &node.key,
        &*node.value,
        crate::node::aggregate(&node.right, options),
    );
    if expected != node.aggregate {
        return Err(InvariantViolation::AggregateMismatch);
    }

    Ok(left + usize::from(!node.is_red()))
}

impl<K, V, A> Index<&K> for AggregateTree<K, V, A> {
    type Output = V;

    /// # Panics
    ///
    /// Panics if `key` is not present. Use [`AggregateTree::get`] or
    /// [`AggregateTree::value`] to handle that case.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found in AggregateTree"),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, A> fmt::Debug for AggregateTree<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
