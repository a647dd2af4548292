use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::executor::{Executor, ThreadExecutor};
use crate::handle::{self, Resolver, TaskError, TaskHandle};

/// Configuration for [`Throttle`].
#[derive(Clone)]
pub struct ThrottleOptions {
    /// Pause after each body before the next one may start.
    pub cooldown: Duration,
    pub executor: Arc<dyn Executor>,
}

impl ThrottleOptions {
    pub fn new() -> Self {
        Self {
            cooldown: Duration::ZERO,
            executor: Arc::new(ThreadExecutor::new()),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Arc::new(executor);
        self
    }
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThrottleOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleOptions")
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

/// Counters since the throttle was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrottleStats {
    /// Bodies that ran, including ones that panicked.
    pub executed: u64,
    pub canceled: u64,
    pub panicked: u64,
}

trait Task: Send {
    /// Returns `false` if the body panicked.
    fn run(self: Box<Self>) -> bool;
    fn cancel(self: Box<Self>);
}

struct Body<F, T> {
    body: F,
    resolver: Resolver<T>,
}

impl<F, T> Task for Body<F, T>
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    fn run(self: Box<Self>) -> bool {
        let Self { body, resolver } = *self;
        let result = catch_unwind(AssertUnwindSafe(body)).map_err(|_| TaskError::Panicked);
        let ok = result.is_ok();
        resolver.resolve(result);
        ok
    }

    fn cancel(self: Box<Self>) {
        self.resolver.resolve(Err(TaskError::Canceled));
    }
}

enum Slot {
    Idle,
    /// A body waits for the run loop (which is already active).
    Pending(Box<dyn Task>),
    /// The run loop is executing a body or cooling down.
    Running,
}

struct Shared {
    slot: Mutex<Slot>,
    cooldown: Duration,
    executor: Arc<dyn Executor>,
    executed: AtomicU64,
    canceled: AtomicU64,
    panicked: AtomicU64,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_loop(&self) {
        loop {
            let task = {
                let mut slot = self.slot();
                match std::mem::replace(&mut *slot, Slot::Running) {
                    Slot::Pending(task) => task,
                    Slot::Idle | Slot::Running => {
                        *slot = Slot::Idle;
                        vtrace!("throttle idle");
                        return;
                    }
                }
            };

            self.executed.fetch_add(1, Ordering::Relaxed);
            if !task.run() {
                self.panicked.fetch_add(1, Ordering::Relaxed);
                vwarn!("throttled body panicked");
            }
            if !self.cooldown.is_zero() {
                std::thread::sleep(self.cooldown);
            }
        }
    }
}

/// A single-flight scheduler: at most one body runs at a time and at most one waits.
///
/// Handing a body to a busy throttle makes it the follow-up. A follow-up that has not started
/// yet is canceled when a newer one arrives, so a burst of requests collapses into the one
/// that is running plus the latest. Bodies run on the configured [`Executor`]; the caller
/// never runs them inline.
///
/// Cloning yields another handle to the same throttle. Once every handle is dropped, a body
/// that has not started yet is canceled.
#[derive(Clone)]
pub struct Throttle {
    shared: Arc<Shared>,
}

impl Throttle {
    pub fn new(options: ThrottleOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Idle),
                cooldown: options.cooldown,
                executor: options.executor,
                executed: AtomicU64::new(0),
                canceled: AtomicU64::new(0),
                panicked: AtomicU64::new(0),
            }),
        }
    }

    /// Makes `body` the next thing to run, canceling any body still waiting.
    pub fn set_next_task<T, F>(&self, body: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (handle, resolver) = handle::pair();
        let task: Box<dyn Task> = Box::new(Body { body, resolver });

        let previous = std::mem::replace(&mut *self.shared.slot(), Slot::Pending(task));
        match previous {
            Slot::Idle => {
                vtrace!("throttle starting run loop");
                let shared = Arc::downgrade(&self.shared);
                self.shared.executor.execute(Box::new(move || {
                    if let Some(shared) = shared.upgrade() {
                        shared.run_loop();
                    }
                }));
            }
            Slot::Pending(superseded) => {
                self.shared.canceled.fetch_add(1, Ordering::Relaxed);
                vtrace!("throttle superseded a pending body");
                superseded.cancel();
            }
            Slot::Running => {}
        }
        handle
    }

    /// [`Throttle::set_next_task`] for bodies without a result.
    pub fn set_next_action(&self, action: impl FnOnce() + Send + 'static) -> TaskHandle<()> {
        self.set_next_task(action)
    }

    /// `true` when nothing is running or waiting.
    pub fn is_idle(&self) -> bool {
        matches!(*self.shared.slot(), Slot::Idle)
    }

    pub fn cooldown(&self) -> Duration {
        self.shared.cooldown
    }

    pub fn stats(&self) -> ThrottleStats {
        ThrottleStats {
            executed: self.shared.executed.load(Ordering::Relaxed),
            canceled: self.shared.canceled.load(Ordering::Relaxed),
            panicked: self.shared.panicked.load(Ordering::Relaxed),
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(ThrottleOptions::default())
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("cooldown", &self.shared.cooldown)
            .field("idle", &self.is_idle())
            .field("stats", &self.stats())
            .finish()
    }
}
