use std::sync::Arc;
use std::time::Duration;

use virtual_tree::CompareFn;

use crate::{Executor, ThreadExecutor, ViewportState};

/// Measures an item along the scroll axis.
pub type ExtentFn<K, P> = Arc<dyn Fn(&K, &P) -> u64 + Send + Sync>;

/// Configuration for [`crate::WindowEngine`].
pub struct WindowOptions<K, P> {
    pub extent_of: ExtentFn<K, P>,
    /// Orders caller keys. Items with equal keys keep their insertion order.
    pub compare: CompareFn<K>,
    /// Margin laid out beyond each end of the viewport, as a fraction of its extent.
    pub margin_ratio: f32,
    /// Minimum pause between two recomputes.
    pub cooldown: Duration,
    pub executor: Arc<dyn Executor>,
    pub initial_viewport: ViewportState,
}

impl<K: Ord + 'static, P> WindowOptions<K, P> {
    /// Creates options that order items by `K: Ord`.
    pub fn new(extent_of: impl Fn(&K, &P) -> u64 + Send + Sync + 'static) -> Self {
        Self::new_with_compare(|a: &K, b: &K| a.cmp(b), extent_of)
    }
}

impl<K, P> WindowOptions<K, P> {
    pub const DEFAULT_MARGIN_RATIO: f32 = 0.5;
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(16);

    pub fn new_with_compare(
        compare: impl Fn(&K, &K) -> std::cmp::Ordering + Send + Sync + 'static,
        extent_of: impl Fn(&K, &P) -> u64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            extent_of: Arc::new(extent_of),
            compare: Arc::new(compare),
            margin_ratio: Self::DEFAULT_MARGIN_RATIO,
            cooldown: Self::DEFAULT_COOLDOWN,
            executor: Arc::new(ThreadExecutor::new()),
            initial_viewport: ViewportState::default(),
        }
    }

    pub fn with_compare(
        mut self,
        compare: impl Fn(&K, &K) -> std::cmp::Ordering + Send + Sync + 'static,
    ) -> Self {
        self.compare = Arc::new(compare);
        self
    }

    pub fn with_margin_ratio(mut self, margin_ratio: f32) -> Self {
        self.margin_ratio = margin_ratio.max(0.0);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn with_initial_viewport(mut self, viewport: ViewportState) -> Self {
        self.initial_viewport = viewport;
        self
    }
}

impl<K, P> Clone for WindowOptions<K, P> {
    fn clone(&self) -> Self {
        Self {
            extent_of: Arc::clone(&self.extent_of),
            compare: Arc::clone(&self.compare),
            margin_ratio: self.margin_ratio,
            cooldown: self.cooldown,
            executor: Arc::clone(&self.executor),
            initial_viewport: self.initial_viewport,
        }
    }
}

impl<K, P> std::fmt::Debug for WindowOptions<K, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowOptions")
            .field("margin_ratio", &self.margin_ratio)
            .field("cooldown", &self.cooldown)
            .field("initial_viewport", &self.initial_viewport)
            .finish_non_exhaustive()
    }
}
