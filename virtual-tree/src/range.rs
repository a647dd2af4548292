use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::RangePosition;
use crate::node::{Link, Node, aggregate};
use crate::options::TreeOptions;

/// An entry yielded by [`crate::AggregateTree::range`].
pub struct RangeEntry<'a, K, V, A> {
    pub key: &'a K,
    pub value: &'a Arc<V>,
    /// Aggregate of every entry strictly before this one.
    pub prefix: A,
}

impl<K: fmt::Debug, V: fmt::Debug, A: fmt::Debug> fmt::Debug for RangeEntry<'_, K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeEntry")
            .field("key", self.key)
            .field("value", &**self.value)
            .field("prefix", &self.prefix)
            .finish()
    }
}

enum Step<'a, K, V, A> {
    /// Scan a subtree; `A` aggregates everything before it.
    Visit(&'a Node<K, V, A>, A),
    /// Yield a node whose predicate said `In`; `A` is its prefix.
    Emit(&'a Node<K, V, A>, A),
}

impl<K, V, A: Clone> Clone for Step<'_, K, V, A> {
    fn clone(&self) -> Self {
        match self {
            Self::Visit(node, before) => Self::Visit(*node, before.clone()),
            Self::Emit(node, prefix) => Self::Emit(*node, prefix.clone()),
        }
    }
}

/// A lazy, in-order scan over the entries a monotonic predicate classifies as `In`.
///
/// Each node is visited at most once, so the scan terminates even for a predicate that breaks
/// the monotonic contract. In that case which entries come out is unspecified.
///
/// Cloning the iterator (when the predicate is `Clone`) captures the scan position, so a clone
/// restarts from wherever the original was.
pub struct RangeIter<'a, K, V, A, F> {
    options: &'a TreeOptions<K, V, A>,
    predicate: F,
    stack: Vec<Step<'a, K, V, A>>,
}

impl<'a, K, V, A: Clone, F> RangeIter<'a, K, V, A, F> {
    pub(crate) fn new(
        options: &'a TreeOptions<K, V, A>,
        root: &'a Link<K, V, A>,
        predicate: F,
    ) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = root.as_deref() {
            stack.push(Step::Visit(root, options.empty.clone()));
        }
        Self {
            options,
            predicate,
            stack,
        }
    }
}

impl<'a, K, V, A, F> Iterator for RangeIter<'a, K, V, A, F>
where
    A: Clone,
    F: FnMut(&K, &V, &A) -> RangePosition,
{
    type Item = RangeEntry<'a, K, V, A>;

    fn next(&mut self) -> Option<Self::Item> {
        let options = self.options;
        while let Some(step) = self.stack.pop() {
            let (node, before) = match step {
                Step::Emit(node, prefix) => {
                    return Some(RangeEntry {
                        key: &node.key,
                        value: &node.value,
                        prefix,
                    });
                }
                Step::Visit(node, before) => (node, before),
            };

            let prefix = (options.join)(&before, aggregate(&node.left, options));
            let position = (self.predicate)(&node.key, &*node.value, &prefix);
            // Push in reverse: left subtree first out, then the node, then the right subtree.
            if position != RangePosition::Above {
                if let Some(right) = node.right.as_deref() {
                    let after =
                        (options.combine)(&prefix, &node.key, &*node.value, &options.empty);
                    self.stack.push(Step::Visit(right, after));
                }
            }
            if position == RangePosition::In {
                self.stack.push(Step::Emit(node, prefix));
            }
            if position != RangePosition::Below {
                if let Some(left) = node.left.as_deref() {
                    self.stack.push(Step::Visit(left, before));
                }
            }
        }
        None
    }
}

impl<K, V, A: Clone, F: Clone> Clone for RangeIter<'_, K, V, A, F> {
    fn clone(&self) -> Self {
        Self {
            options: self.options,
            predicate: self.predicate.clone(),
            stack: self.stack.clone(),
        }
    }
}

impl<K, V, A, F> fmt::Debug for RangeIter<'_, K, V, A, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeIter")
            .field("pending", &self.stack.len())
            .finish_non_exhaustive()
    }
}

/// In-order iterator over every entry of a tree.
pub struct Iter<'a, K, V, A> {
    stack: Vec<&'a Node<K, V, A>>,
    remaining: usize,
}

impl<'a, K, V, A> Iter<'a, K, V, A> {
    pub(crate) fn new(root: &'a Link<K, V, A>) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: crate::node::count(root),
        };
        iter.push_left_spine(root.as_deref());
        iter
    }

    fn push_left_spine(&mut self, mut node: Option<&'a Node<K, V, A>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, K, V, A> Iterator for Iter<'a, K, V, A> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &*node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, A> ExactSizeIterator for Iter<'_, K, V, A> {}

impl<K, V, A> Clone for Iter<'_, K, V, A> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K, V, A> fmt::Debug for Iter<'_, K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}
