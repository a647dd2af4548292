use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where a throttle runs its loop.
///
/// The throttle never runs more than one job on an executor at a time, so implementations do
/// not need to serialize jobs themselves.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs each job on a freshly spawned, named thread.
#[derive(Clone, Debug)]
pub struct ThreadExecutor {
    name: String,
}

impl ThreadExecutor {
    pub const DEFAULT_NAME: &'static str = "virtual-tree-throttle";

    pub fn new() -> Self {
        Self::with_name(Self::DEFAULT_NAME)
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        // The closure only owns the job through this slot, so a failed spawn can hand it back.
        let slot = Arc::new(Mutex::new(Some(job)));
        let remote = Arc::clone(&slot);
        let spawned = thread::Builder::new().name(self.name.clone()).spawn(move || {
            let job = remote.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(job) = job {
                job();
            }
        });
        if let Err(_err) = spawned {
            vwarn!(name = %self.name, error = %_err, "thread spawn failed; running job inline");
            let job = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(job) = job {
                job();
            }
        }
    }
}

/// Queues jobs until the owner drains them with [`QueueExecutor::run_pending`].
///
/// Suits single-threaded UI loops (drain once per frame) and deterministic tests.
#[derive(Clone, Default)]
pub struct QueueExecutor {
    queue: Arc<Mutex<VecDeque<Job>>>,
}

impl QueueExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs queued jobs, including ones queued while draining. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let job = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(job) = job else {
                return ran;
            };
            job();
            ran += 1;
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Executor for QueueExecutor {
    fn execute(&self, job: Job) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(job);
    }
}

impl std::fmt::Debug for QueueExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}
