use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

/// Why a throttled body produced no value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskError {
    /// Superseded by a newer body before it started, or dropped unrun.
    Canceled,
    /// The body panicked.
    Panicked,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => f.write_str("task was canceled before it ran"),
            Self::Panicked => f.write_str("task panicked"),
        }
    }
}

impl std::error::Error for TaskError {}

enum State<T> {
    Waiting(Option<Waker>),
    Ready(Result<T, TaskError>),
    Taken,
}

struct Completion<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Completion<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The eventual outcome of a body handed to [`crate::Throttle`].
///
/// Block on it with [`TaskHandle::wait`], poll it with [`TaskHandle::try_take`], or `.await`
/// it. The outcome can be taken once.
pub struct TaskHandle<T> {
    completion: Arc<Completion<T>>,
}

/// The producing side of a [`TaskHandle`]. Dropping it unresolved cancels the handle.
pub(crate) struct Resolver<T> {
    completion: Arc<Completion<T>>,
}

pub(crate) fn pair<T>() -> (TaskHandle<T>, Resolver<T>) {
    let completion = Arc::new(Completion {
        state: Mutex::new(State::Waiting(None)),
        ready: Condvar::new(),
    });
    (
        TaskHandle {
            completion: Arc::clone(&completion),
        },
        Resolver { completion },
    )
}

impl<T> Resolver<T> {
    pub(crate) fn resolve(self, result: Result<T, TaskError>) {
        self.complete(result);
    }

    fn complete(&self, result: Result<T, TaskError>) {
        let waker = {
            let mut state = self.completion.lock();
            let waker = match &mut *state {
                State::Waiting(waker) => waker.take(),
                State::Ready(_) | State::Taken => return,
            };
            *state = State::Ready(result);
            waker
        };
        self.completion.ready.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        self.complete(Err(TaskError::Canceled));
    }
}

impl<T> TaskHandle<T> {
    /// Blocks until the body finishes or is canceled.
    ///
    /// # Panics
    ///
    /// Panics if the outcome was already taken through [`TaskHandle::try_take`].
    pub fn wait(self) -> Result<T, TaskError> {
        let mut state = self.completion.lock();
        while matches!(*state, State::Waiting(_)) {
            state = self
                .completion
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        take(&mut *state).unwrap_or_else(|| panic!("TaskHandle outcome already taken"))
    }

    /// Like [`TaskHandle::wait`] with a deadline. `None` means still running (or taken).
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>> {
        let state = self.completion.lock();
        let (mut state, _) = self
            .completion
            .ready
            .wait_timeout_while(state, timeout, |s| matches!(s, State::Waiting(_)))
            .unwrap_or_else(PoisonError::into_inner);
        take(&mut *state)
    }

    /// Takes the outcome if it is available.
    pub fn try_take(&self) -> Option<Result<T, TaskError>> {
        take(&mut *self.completion.lock())
    }

    pub fn is_finished(&self) -> bool {
        !matches!(*self.completion.lock(), State::Waiting(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(*self.completion.lock(), State::Ready(Err(TaskError::Canceled)))
    }
}

fn take<T>(state: &mut State<T>) -> Option<Result<T, TaskError>> {
    match std::mem::replace(state, State::Taken) {
        State::Ready(result) => Some(result),
        other => {
            *state = other;
            None
        }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.completion.lock();
        if let State::Waiting(waker) = &mut *state {
            if waker.as_ref().is_none_or(|w| !w.will_wake(cx.waker())) {
                *waker = Some(cx.waker().clone());
            }
            return Poll::Pending;
        }
        match take(&mut *state) {
            Some(result) => Poll::Ready(result),
            None => panic!("TaskHandle polled after completion"),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.completion.lock() {
            State::Waiting(_) => "waiting",
            State::Ready(Ok(_)) => "ready",
            State::Ready(Err(TaskError::Canceled)) => "canceled",
            State::Ready(Err(TaskError::Panicked)) => "panicked",
            State::Taken => "taken",
        };
        f.debug_struct("TaskHandle")
            .field("state", &state)
            .finish()
    }
}
