//! Units of work carried by the bridge queues.

use std::fmt;
use std::sync::Arc;

use crate::sync::CompletionSignal;

/// A closure submitted for execution on another context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A synchronous call in flight.
///
/// Holds the closure and the caller's completion signal. Invoking it runs the
/// closure and then completes the signal. Dropping it without invoking (queue
/// shut down, generation expired, closure panicked) fails the signal, so the
/// waiting caller always wakes.
pub struct PendingCall {
    job: Option<Job>,
    signal: Arc<CompletionSignal>,
}

impl PendingCall {
    /// Wraps `job` with the caller's `signal`.
    #[must_use]
    pub fn new(job: Job, signal: Arc<CompletionSignal>) -> Self {
        Self {
            job: Some(job),
            signal,
        }
    }

    /// Runs the closure on the current thread and completes the signal.
    pub fn invoke(mut self) {
        if let Some(job) = self.job.take() {
            job();
            self.signal.complete();
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        // No-op if invoke already completed it.
        self.signal.fail();
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("invoked", &self.job.is_none())
            .field("outcome", &self.signal.outcome())
            .finish()
    }
}

/// What a queue entry asks the destination to do.
pub(crate) enum Task {
    /// Fire-and-forget closure.
    Async(Job),
    /// Closure whose caller is waiting.
    Sync(PendingCall),
}

impl Task {
    pub(crate) fn run(self) {
        match self {
            Self::Async(job) => job(),
            Self::Sync(call) => call.invoke(),
        }
    }

    pub(crate) const fn is_sync(&self) -> bool {
        matches!(self, Self::Sync(_))
    }
}

/// A task stamped with the queue generation it was submitted under.
pub(crate) struct Envelope {
    pub(crate) generation: u64,
    pub(crate) task: Task,
}
