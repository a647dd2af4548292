use alloc::sync::Arc;

use crate::options::TreeOptions;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) fn flip(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// A subtree. `None` is the shared empty leaf: black, aggregate `options.empty`, count 0.
pub(crate) type Link<K, V, A> = Option<Arc<Node<K, V, A>>>;

/// An immutable tree node. Never modified once it is reachable from a published root.
pub(crate) struct Node<K, V, A> {
    pub(crate) key: K,
    pub(crate) value: Arc<V>,
    pub(crate) color: Color,
    pub(crate) left: Link<K, V, A>,
    pub(crate) right: Link<K, V, A>,
    pub(crate) aggregate: A,
    pub(crate) count: usize,
}

impl<K, V, A> Node<K, V, A> {
    pub(crate) fn child(&self, side: Side) -> &Link<K, V, A> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub(crate) fn is_red(&self) -> bool {
        self.color == Color::Red
    }
}

impl<K: Clone, V, A: Clone> Node<K, V, A> {
    /// Copies the node with another color. Color does not feed the aggregate.
    pub(crate) fn with_color(&self, color: Color) -> Self {
        Self {
            key: self.key.clone(),
            value: Arc::clone(&self.value),
            color,
            left: self.left.clone(),
            right: self.right.clone(),
            aggregate: self.aggregate.clone(),
            count: self.count,
        }
    }
}

pub(crate) fn is_red<K, V, A>(link: &Link<K, V, A>) -> bool {
    link.as_ref().is_some_and(|n| n.is_red())
}

pub(crate) fn count<K, V, A>(link: &Link<K, V, A>) -> usize {
    link.as_ref().map_or(0, |n| n.count)
}

pub(crate) fn aggregate<'a, K, V, A>(
    link: &'a Link<K, V, A>,
    options: &'a TreeOptions<K, V, A>,
) -> &'a A {
    link.as_ref().map_or(&options.empty, |n| &n.aggregate)
}

/// Builds a node, deriving its aggregate and count from its children.
pub(crate) fn build<K, V, A>(
    options: &TreeOptions<K, V, A>,
    key: K,
    value: Arc<V>,
    color: Color,
    left: Link<K, V, A>,
    right: Link<K, V, A>,
) -> Arc<Node<K, V, A>> {
    let aggregate = (options.combine)(
        aggregate(&left, options),
        &key,
        &*value,
        aggregate(&right, options),
    );
    let count = count(&left) + 1 + count(&right);
    Arc::new(Node {
        key,
        value,
        color,
        left,
        right,
        aggregate,
        count,
    })
}

/// Like [`build`], with the children given relative to `side`.
pub(crate) fn build_sided<K, V, A>(
    options: &TreeOptions<K, V, A>,
    key: K,
    value: Arc<V>,
    color: Color,
    side: Side,
    on_side: Link<K, V, A>,
    other: Link<K, V, A>,
) -> Arc<Node<K, V, A>> {
    match side {
        Side::Left => build(options, key, value, color, on_side, other),
        Side::Right => build(options, key, value, color, other, on_side),
    }
}

pub(crate) fn recolor<K: Clone, V, A: Clone>(link: &Link<K, V, A>, color: Color) -> Link<K, V, A> {
    match link {
        Some(node) if node.color != color => Some(Arc::new(node.with_color(color))),
        other => other.clone(),
    }
}

/// Rotates `node` toward `dir`: its child on the opposite side becomes the new subtree root.
///
/// The new root gets `top`, the demoted node gets `down`. Returns `node` unchanged if it has
/// no child to rotate up.
pub(crate) fn rotate<K: Clone, V, A: Clone>(
    options: &TreeOptions<K, V, A>,
    node: &Arc<Node<K, V, A>>,
    dir: Side,
    top: Color,
    down: Color,
) -> Arc<Node<K, V, A>> {
    let pivot_side = dir.flip();
    let Some(pivot) = node.child(pivot_side) else {
        return Arc::clone(node);
    };
    let demoted = build_sided(
        options,
        node.key.clone(),
        Arc::clone(&node.value),
        down,
        pivot_side,
        pivot.child(dir).clone(),
        node.child(dir).clone(),
    );
    build_sided(
        options,
        pivot.key.clone(),
        Arc::clone(&pivot.value),
        top,
        dir,
        Some(demoted),
        pivot.child(pivot_side).clone(),
    )
}
