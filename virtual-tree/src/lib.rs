//! A persistent, aggregate-annotated search tree for windowing large ordered collections.
//!
//! For the coalescing throttle and the pooled windowing engine, see the
//! `virtual-tree-adapter` crate.
//!
//! The core type is [`AggregateTree`]: an immutable red-black tree where every node caches an
//! associative aggregate of its subtree (for example the summed height of its items). Each
//! insert/remove returns a new tree that shares untouched subtrees with the old one, so
//! readers holding an older tree keep a consistent snapshot forever.
//!
//! Range scans are driven by a monotonic three-way predicate over the running aggregate rather
//! than by raw keys, which answers "which items overlap offsets `[a, b]`" in `O(log n + k)`
//! without laying out the whole collection. [`window`] packages that query for viewports.
//!
//! ```
//! use virtual_tree::{AggregateTree, RangePosition, TreeOptions};
//!
//! let tree = AggregateTree::new(TreeOptions::<u32, &str, usize>::counting())
//!     .with(5, "e")
//!     .with(3, "c")
//!     .with(8, "h")
//!     .with(1, "a");
//!
//! // Entries whose rank (number of entries before them) is in [1, 3).
//! let hits: Vec<_> = tree
//!     .range(|_, _, rank| match *rank {
//!         r if r < 1 => RangePosition::Below,
//!         r if r < 3 => RangePosition::In,
//!         _ => RangePosition::Above,
//!     })
//!     .map(|e| (*e.key, e.prefix))
//!     .collect();
//! assert_eq!(hits, vec![(3, 1), (5, 2)]);
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod key;
mod node;
mod options;
mod pool;
mod range;
mod tree;
mod types;
pub mod window;
mod zipper;

#[cfg(test)]
mod tests;

pub use key::UniqueKey;
pub use options::{CombineFn, CompareFn, JoinFn, TreeOptions};
pub use pool::{PoolStats, ResourcePool, Reuse};
pub use range::{Iter, RangeEntry, RangeIter};
pub use tree::AggregateTree;
pub use types::{InvariantViolation, OverwriteMode, RangePosition, TreeError};
pub use window::{VisibleEntry, WindowBounds, visible_entries};

#[doc(hidden)]
pub use key::KeyCacheKey;
