//! Scheduling and windowing on top of the `virtual-tree` crate.
//!
//! `virtual-tree` is a pure data structure. This crate adds the moving parts an adapter needs
//! to keep a UI surface in sync with a large, constantly changing collection:
//!
//! - [`Throttle`]: single-flight scheduling. One body runs at a time; a burst of requests
//!   collapses into the one running and the latest, and superseded bodies are canceled.
//! - [`WindowEngine`]: publishes item trees, finds the items overlapping the viewport (plus a
//!   margin) on a captured snapshot, and recycles host resources through per-kind pools.
//!
//! The crate is framework-agnostic: the surface is reached only through [`ResourceHost`], and
//! where the throttle runs its loop is an [`Executor`] choice.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod engine;
mod executor;
mod handle;
mod host;
mod options;
mod state;
mod throttle;


pub use engine::{ItemTree, VisibleItem, WindowEngine};
pub use executor::{Executor, Job, QueueExecutor, ThreadExecutor};
pub use handle::{TaskError, TaskHandle};
pub use host::ResourceHost;
pub use options::{ExtentFn, WindowOptions};
pub use state::{ViewportState, WindowSummary};
pub use throttle::{Throttle, ThrottleOptions, ThrottleStats};

pub use virtual_tree;
