//! Per-destination job queue with shutdown guard.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::bridge::job::{Envelope, Task};
use crate::bridge::ContextId;

struct QueueState {
    jobs: VecDeque<Envelope>,
    open: bool,
    generation: u64,
}

/// FIFO of tasks waiting to run on one context.
///
/// Submission checks `open` and stamps the generation under the same lock
/// that `close` takes, so nothing can slip into a queue after it closed.
pub(crate) struct JobQueue {
    context: ContextId,
    state: Mutex<QueueState>,
    available: Condvar,
    /// Mirror of `state.generation` for lock-free checks at execution time.
    generation: AtomicU64,
}

impl JobQueue {
    pub(crate) fn new(context: ContextId) -> Self {
        Self {
            context,
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                open: true,
                generation: 0,
            }),
            available: Condvar::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Appends a task. Hands it back if the queue is closed.
    pub(crate) fn push(&self, task: Task) -> Result<(), Task> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(task);
        }
        let generation = state.generation;
        state.jobs.push_back(Envelope { generation, task });
        drop(state);
        self.available.notify_all();
        Ok(())
    }

    /// Removes every queued task, oldest first.
    pub(crate) fn take_all(&self) -> VecDeque<Envelope> {
        std::mem::take(&mut self.state.lock().jobs)
    }

    /// Waits up to `timeout` for work. Returns true if tasks are queued.
    pub(crate) fn wait_for_work(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.jobs.is_empty() && state.open {
            self.available.wait_for(&mut state, timeout);
        }
        !state.jobs.is_empty()
    }

    /// Closes the queue and ends the current generation.
    ///
    /// Returns the tasks that never ran. Dropping them fails any waiting
    /// synchronous callers.
    pub(crate) fn close(&self) -> VecDeque<Envelope> {
        let mut state = self.state.lock();
        state.open = false;
        state.generation += 1;
        self.generation.store(state.generation, Ordering::Release);
        let orphaned = std::mem::take(&mut state.jobs);
        drop(state);
        self.available.notify_all();
        orphaned
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    #[inline]
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) const fn context(&self) -> ContextId {
        self.context
    }
}
