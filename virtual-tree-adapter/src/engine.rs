use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use virtual_tree::{
    AggregateTree, OverwriteMode, PoolStats, ResourcePool, Reuse, TreeError, TreeOptions,
    UniqueKey, WindowBounds, visible_entries,
};

use crate::options::ExtentFn;
use crate::{
    ResourceHost, TaskHandle, Throttle, ThrottleOptions, ViewportState, WindowOptions,
    WindowSummary,
};

/// The published item set: caller keys (made unique) to payloads, summed by extent.
pub type ItemTree<K, P> = AggregateTree<UniqueKey<K>, P, u64>;

/// An item inside the window after a recompute.
#[derive(Debug)]
pub struct VisibleItem<K, P> {
    pub key: UniqueKey<K>,
    pub payload: Arc<P>,
    /// Start offset along the scroll axis.
    pub offset: u64,
    pub extent: u64,
}

impl<K: Clone, P> Clone for VisibleItem<K, P> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            payload: Arc::clone(&self.payload),
            offset: self.offset,
            extent: self.extent,
        }
    }
}

/// A resource currently showing an item.
struct Bound<P, H: ResourceHost<P>> {
    kind: H::Kind,
    payload: Arc<P>,
    resource: H::Resource,
}

struct Window<K, P, H: ResourceHost<P>> {
    host: H,
    bound: HashMap<UniqueKey<K>, Bound<P, H>>,
    visible: Vec<VisibleItem<K, P>>,
    pools: HashMap<H::Kind, ResourcePool<K, H::Resource>>,
}

impl<K, P, H> Window<K, P, H>
where
    K: Hash + Eq + Clone,
    H: ResourceHost<P>,
{
    /// Hides a resource and parks it under the caller key of the item it showed.
    fn park(&mut self, key: &UniqueKey<K>, bound: Bound<P, H>) {
        let Bound {
            kind, mut resource, ..
        } = bound;
        self.host.hide(&mut resource);
        self.pools
            .entry(kind)
            .or_default()
            .release(key.value().clone(), resource);
    }

    /// Finds or creates a resource for an entering item and shows it.
    fn enter(&mut self, item: &VisibleItem<K, P>, kind: H::Kind, summary: &mut WindowSummary) {
        let pooled = self
            .pools
            .get_mut(&kind)
            .and_then(|pool| pool.acquire(item.key.value()));
        let mut resource = match pooled {
            Some((resource, reuse)) => {
                summary.reused += 1;
                if reuse == Reuse::ExactKey {
                    summary.exact += 1;
                }
                resource
            }
            None => {
                summary.created += 1;
                self.host.create_resource(&kind)
            }
        };
        self.host.bind_payload(&mut resource, &item.payload);
        self.host.place(&mut resource, item.offset);
        self.host.show(&mut resource);
        self.bound.insert(
            item.key.clone(),
            Bound {
                kind,
                payload: Arc::clone(&item.payload),
                resource,
            },
        );
        summary.entered += 1;
    }
}

struct EngineShared<K, P, H: ResourceHost<P>> {
    tree: Mutex<ItemTree<K, P>>,
    viewport: Mutex<ViewportState>,
    window: Mutex<Window<K, P, H>>,
    extent_of: ExtentFn<K, P>,
    margin_ratio: f32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, P, H> EngineShared<K, P, H>
where
    K: Hash + Eq + Clone,
    H: ResourceHost<P>,
{
    fn recompute(&self) -> WindowSummary {
        let viewport = *lock(&self.viewport);
        if !viewport.is_observable() {
            vtrace!(?viewport, "recompute skipped; viewport not observable");
            return WindowSummary::default();
        }
        let snapshot = lock(&self.tree).clone();
        let mut window = lock(&self.window);

        let bounds = WindowBounds::new(viewport.offset, viewport.extent, self.margin_ratio);
        let extent_of = &self.extent_of;
        let next: Vec<VisibleItem<K, P>> = visible_entries(
            &snapshot,
            bounds,
            |key: &UniqueKey<K>, payload: &P| extent_of(key.value(), payload),
        )
        .map(|entry| VisibleItem {
            key: entry.key.clone(),
            payload: Arc::clone(entry.value),
            offset: entry.start,
            extent: entry.extent,
        })
        .collect();

        let mut summary = WindowSummary {
            visible: next.len(),
            ..WindowSummary::default()
        };

        // Release first so entering items can pick up what just left.
        let staying: HashSet<&UniqueKey<K>> = next.iter().map(|item| &item.key).collect();
        let leaving: Vec<UniqueKey<K>> = window
            .bound
            .keys()
            .filter(|key| !staying.contains(key))
            .cloned()
            .collect();
        for key in &leaving {
            if let Some(bound) = window.bound.remove(key) {
                window.park(key, bound);
                summary.left += 1;
            }
        }

        for item in &next {
            let kind = window.host.kind_of(&item.payload);
            let same_kind = window
                .bound
                .get(&item.key)
                .map(|current| current.kind == kind);
            match same_kind {
                Some(true) => {
                    let Window { host, bound, .. } = &mut *window;
                    if let Some(current) = bound.get_mut(&item.key) {
                        if !Arc::ptr_eq(&current.payload, &item.payload) {
                            host.bind_payload(&mut current.resource, &item.payload);
                            current.payload = Arc::clone(&item.payload);
                        }
                        host.place(&mut current.resource, item.offset);
                        host.refresh(&mut current.resource, &item.payload);
                    }
                    summary.kept += 1;
                }
                Some(false) => {
                    // The payload changed kind; its resource cannot show it anymore.
                    if let Some(stale) = window.bound.remove(&item.key) {
                        window.park(&item.key, stale);
                    }
                    window.enter(item, kind, &mut summary);
                }
                None => window.enter(item, kind, &mut summary),
            }
        }

        window.visible = next;
        vdebug!(
            visible = summary.visible,
            entered = summary.entered,
            left = summary.left,
            created = summary.created,
            reused = summary.reused,
            "window recomputed"
        );
        summary
    }
}

/// Keeps the resources of a host in sync with the items visible in a viewport.
///
/// Writers publish new item trees; every change schedules a recompute through a [`Throttle`],
/// so a burst of changes costs one recompute. A recompute captures the current tree snapshot,
/// finds the items overlapping the viewport plus a margin, hides and pools resources of items
/// that left, and binds pooled (or new) resources to items that entered.
///
/// Cloning yields another handle to the same engine.
pub struct WindowEngine<K, P, H: ResourceHost<P>> {
    shared: Arc<EngineShared<K, P, H>>,
    throttle: Throttle,
}

impl<K, P, H: ResourceHost<P>> Clone for WindowEngine<K, P, H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            throttle: self.throttle.clone(),
        }
    }
}

impl<K, P, H> WindowEngine<K, P, H>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    P: Send + Sync + 'static,
    H: ResourceHost<P> + Send + 'static,
    H::Kind: Send,
    H::Resource: Send,
{
    pub fn new(options: WindowOptions<K, P>, host: H) -> Self {
        let extent = Arc::clone(&options.extent_of);
        let tree_options = TreeOptions {
            compare: UniqueKey::comparer(Arc::clone(&options.compare)),
            combine: Arc::new(move |l: &u64, key: &UniqueKey<K>, payload: &P, r: &u64| {
                l.saturating_add(extent(key.value(), payload))
                    .saturating_add(*r)
            }),
            join: Arc::new(|l: &u64, r: &u64| l.saturating_add(*r)),
            empty: 0,
        };
        let throttle = Throttle::new(ThrottleOptions {
            cooldown: options.cooldown,
            executor: Arc::clone(&options.executor),
        });

        Self {
            shared: Arc::new(EngineShared {
                tree: Mutex::new(AggregateTree::new(tree_options)),
                viewport: Mutex::new(options.initial_viewport),
                window: Mutex::new(Window {
                    host,
                    bound: HashMap::new(),
                    visible: Vec::new(),
                    pools: HashMap::new(),
                }),
                extent_of: options.extent_of,
                margin_ratio: options.margin_ratio,
            }),
            throttle,
        }
    }

    /// Adds an item and returns the key that identifies it from now on.
    pub fn add(&self, key: K, payload: impl Into<Arc<P>>) -> UniqueKey<K> {
        let key = UniqueKey::new(key);
        {
            let mut tree = lock(&self.shared.tree);
            *tree = tree.with_arc(key.clone(), payload.into());
        }
        self.schedule_recompute();
        key
    }

    /// Removes an item. Returns `false` if it was not present.
    pub fn remove(&self, key: &UniqueKey<K>) -> bool {
        let removed = {
            let mut tree = lock(&self.shared.tree);
            match tree.try_without(key) {
                Ok(next) => {
                    *tree = next;
                    true
                }
                Err(_) => false,
            }
        };
        if removed {
            self.schedule_recompute();
        }
        removed
    }

    /// Gives an existing item a new payload (and possibly a new extent).
    pub fn replace_payload(
        &self,
        key: &UniqueKey<K>,
        payload: impl Into<Arc<P>>,
    ) -> Result<(), TreeError> {
        let changed = {
            let mut tree = lock(&self.shared.tree);
            let next = tree.try_with_arc(key.clone(), payload.into(), OverwriteMode::Require)?;
            let changed = !next.ptr_eq(&tree);
            *tree = next;
            changed
        };
        if changed {
            self.schedule_recompute();
        }
        Ok(())
    }

    pub fn clear(&self) {
        {
            let mut tree = lock(&self.shared.tree);
            *tree = tree.with_empty();
        }
        self.schedule_recompute();
    }

    pub fn set_scroll_offset(&self, offset: u64) -> bool {
        self.update_viewport(|v| v.offset = offset)
    }

    pub fn set_viewport_extent(&self, extent: u64) -> bool {
        self.update_viewport(|v| v.extent = extent)
    }

    pub fn set_viewport(&self, offset: u64, extent: u64) -> bool {
        self.update_viewport(|v| {
            v.offset = offset;
            v.extent = extent;
        })
    }

    pub fn set_visible(&self, visible: bool) -> bool {
        self.update_viewport(|v| v.visible = visible)
    }

    pub fn apply_viewport_state(&self, state: ViewportState) -> bool {
        self.update_viewport(|v| *v = state)
    }

    /// Applies `f` and schedules a recompute if the viewport changed.
    fn update_viewport(&self, f: impl FnOnce(&mut ViewportState)) -> bool {
        let changed = {
            let mut viewport = lock(&self.shared.viewport);
            let before = *viewport;
            f(&mut *viewport);
            *viewport != before
        };
        if changed {
            self.schedule_recompute();
        }
        changed
    }

    /// Queues a recompute, superseding one that has not started yet.
    pub fn schedule_recompute(&self) -> TaskHandle<WindowSummary> {
        let shared = Arc::clone(&self.shared);
        self.throttle.set_next_task(move || shared.recompute())
    }

    /// Recomputes on the calling thread.
    pub fn recompute_now(&self) -> WindowSummary {
        self.shared.recompute()
    }

    pub fn snapshot(&self) -> ItemTree<K, P> {
        lock(&self.shared.tree).clone()
    }

    /// Items in the window as of the last recompute, in order.
    pub fn visible_items(&self) -> Vec<VisibleItem<K, P>> {
        lock(&self.shared.window).visible.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.shared.tree).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.shared.tree).is_empty()
    }

    pub fn total_extent(&self) -> u64 {
        *lock(&self.shared.tree).total()
    }

    pub fn viewport_state(&self) -> ViewportState {
        *lock(&self.shared.viewport)
    }

    /// Idle resources across every kind.
    pub fn pool_stats(&self) -> PoolStats {
        lock(&self.shared.window)
            .pools
            .values()
            .map(ResourcePool::stats)
            .fold(PoolStats::default(), |acc, stats| acc + stats)
    }

    /// Empties every pool and returns the idle resources, e.g. to free them under memory
    /// pressure.
    pub fn drain_pools(&self) -> Vec<H::Resource> {
        lock(&self.shared.window)
            .pools
            .values_mut()
            .flat_map(ResourcePool::drain)
            .collect()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut lock(&self.shared.window).host)
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }
}

impl<K, P, H: ResourceHost<P>> std::fmt::Debug for WindowEngine<K, P, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowEngine")
            .field("len", &lock(&self.shared.tree).len())
            .field("viewport", &*lock(&self.shared.viewport))
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}
