use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::node::{Color, Link, Node, Side, build_sided, is_red, recolor, rotate};
use crate::options::TreeOptions;

/// One step of a downward walk: the parent we left and which side we took.
///
/// The parent's own child on `side` is not kept, since it is what the walk continues into
/// and gets replaced on the way back up.
struct Crumb<K, V, A> {
    side: Side,
    key: K,
    value: Arc<V>,
    color: Color,
    sibling: Link<K, V, A>,
}

impl<K: Clone, V, A> Crumb<K, V, A> {
    fn from_node(node: &Node<K, V, A>, side: Side) -> Self {
        Self {
            side,
            key: node.key.clone(),
            value: Arc::clone(&node.value),
            color: node.color,
            sibling: node.child(side.flip()).clone(),
        }
    }

    /// Recreates the parent with `child` in place of the subtree we descended into.
    fn rebuild(
        self,
        options: &TreeOptions<K, V, A>,
        child: Link<K, V, A>,
    ) -> Arc<Node<K, V, A>> {
        build_sided(
            options,
            self.key,
            self.value,
            self.color,
            self.side,
            child,
            self.sibling,
        )
    }
}

/// A root-to-focus path over an immutable tree.
///
/// Repairs happen at the focus; [`Zipper::zip_up`] then copies every ancestor with the
/// repaired subtree in place. Untouched siblings are shared, never copied.
pub(crate) struct Zipper<'o, K, V, A> {
    options: &'o TreeOptions<K, V, A>,
    path: Vec<Crumb<K, V, A>>,
}

impl<'o, K: Clone, V, A: Clone> Zipper<'o, K, V, A> {
    pub(crate) fn new(options: &'o TreeOptions<K, V, A>) -> Self {
        Self {
            options,
            path: Vec::new(),
        }
    }

    /// Walks from `root` toward `key`, recording the path.
    ///
    /// Returns the node holding an equal key; the path then ends at its parent. Otherwise the
    /// path ends at the parent of the empty leaf where `key` belongs.
    pub(crate) fn descend(
        &mut self,
        root: &Link<K, V, A>,
        key: &K,
    ) -> Option<Arc<Node<K, V, A>>> {
        let mut cur = root.clone();
        while let Some(node) = cur {
            let side = match (self.options.compare)(key, &node.key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return Some(node),
            };
            cur = node.child(side).clone();
            self.path.push(Crumb::from_node(&node, side));
        }
        None
    }

    pub(crate) fn zip_up(mut self, mut focus: Link<K, V, A>) -> Link<K, V, A> {
        while let Some(crumb) = self.path.pop() {
            focus = Some(crumb.rebuild(self.options, focus));
        }
        focus
    }

    /// Attaches a fresh red node at the end of the path and restores the red-black rules.
    pub(crate) fn insert(mut self, mut focus: Arc<Node<K, V, A>>) -> Link<K, V, A> {
        let options = self.options;
        loop {
            // A black parent (or none at all) accepts a red child as is.
            match self.path.last() {
                Some(parent) if parent.color == Color::Red => {}
                _ => break,
            }
            let Some(parent) = self.path.pop() else {
                break;
            };
            let Some(grand) = self.path.pop() else {
                // Only reachable when the root itself is red.
                focus = parent.rebuild(options, Some(focus));
                break;
            };

            if is_red(&grand.sibling) {
                let parent = Crumb {
                    color: Color::Black,
                    ..parent
                }
                .rebuild(options, Some(focus));
                let uncle = recolor(&grand.sibling, Color::Black);
                focus = Crumb {
                    color: Color::Red,
                    sibling: uncle,
                    ..grand
                }
                .rebuild(options, Some(parent));
                continue;
            }

            let outer = grand.side;
            let zig_zag = parent.side != outer;
            let mut sub = parent.rebuild(options, Some(focus));
            if zig_zag {
                sub = rotate(options, &sub, outer, Color::Red, Color::Red);
            }
            let grand = grand.rebuild(options, Some(sub));
            focus = rotate(options, &grand, outer.flip(), Color::Black, Color::Red);
            break;
        }
        blacken(self.zip_up(Some(focus)))
    }

    /// Removes the node at `key` below `root`. `None` if no such node exists.
    pub(crate) fn remove(mut self, root: &Link<K, V, A>, key: &K) -> Option<Link<K, V, A>> {
        let target = self.descend(root, key)?;

        let doomed = match target.right.clone() {
            Some(right) if target.left.is_some() => {
                // Reduce to the one-child case: the in-order successor's entry moves into the
                // target's slot and the successor's own node is removed instead.
                let slot = self.path.len();
                self.path.push(Crumb::from_node(&target, Side::Right));
                let mut node = right;
                while let Some(left) = node.left.clone() {
                    self.path.push(Crumb::from_node(&node, Side::Left));
                    node = left;
                }
                let crumb = &mut self.path[slot];
                crumb.key = node.key.clone();
                crumb.value = Arc::clone(&node.value);
                node
            }
            _ => target,
        };

        let child = doomed.left.clone().or_else(|| doomed.right.clone());
        if doomed.is_red() {
            return Some(self.zip_up(child));
        }
        if is_red(&child) {
            return Some(blacken(self.zip_up(recolor(&child, Color::Black))));
        }
        Some(self.rebalance_removal(child))
    }

    /// Fix-up after removing a black node whose place is taken by a black `focus` subtree,
    /// which is now one black node short.
    fn rebalance_removal(mut self, mut focus: Link<K, V, A>) -> Link<K, V, A> {
        let options = self.options;
        while let Some(parent) = self.path.pop() {
            let side = parent.side;
            let Some(sibling) = parent.sibling.clone() else {
                // Unreachable for a valid tree: the short side's sibling holds at least one
                // black node. Push the deficit upward rather than build a broken node.
                vwarn!("removal fix-up found an empty sibling");
                let was_red = parent.color == Color::Red;
                focus = Some(
                    Crumb {
                        color: Color::Black,
                        ..parent
                    }
                    .rebuild(options, focus),
                );
                if was_red {
                    break;
                }
                continue;
            };

            if sibling.is_red() {
                // Rotate the red sibling above the parent and retry one level lower.
                self.path.push(Crumb {
                    side,
                    key: sibling.key.clone(),
                    value: Arc::clone(&sibling.value),
                    color: Color::Black,
                    sibling: sibling.child(side.flip()).clone(),
                });
                self.path.push(Crumb {
                    color: Color::Red,
                    sibling: sibling.child(side).clone(),
                    ..parent
                });
                continue;
            }

            if !is_red(sibling.child(side)) && !is_red(sibling.child(side.flip())) {
                let was_red = parent.color == Color::Red;
                focus = Some(
                    Crumb {
                        color: Color::Black,
                        sibling: recolor(&parent.sibling, Color::Red),
                        ..parent
                    }
                    .rebuild(options, focus),
                );
                if was_red {
                    break;
                }
                continue;
            }

            let sibling = if is_red(sibling.child(side.flip())) {
                sibling
            } else {
                // Near child red, far child black: turn it into the far-red shape.
                rotate(options, &sibling, side.flip(), Color::Black, Color::Red)
            };
            let lowered = build_sided(
                options,
                parent.key,
                parent.value,
                Color::Black,
                side,
                focus,
                sibling.child(side).clone(),
            );
            focus = Some(build_sided(
                options,
                sibling.key.clone(),
                Arc::clone(&sibling.value),
                parent.color,
                side,
                Some(lowered),
                recolor(sibling.child(side.flip()), Color::Black),
            ));
            break;
        }
        blacken(self.zip_up(focus))
    }
}

fn blacken<K: Clone, V, A: Clone>(root: Link<K, V, A>) -> Link<K, V, A> {
    recolor(&root, Color::Black)
}
