//! One-shot completion signal for synchronous dispatch.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::sync::{SuspendStrategy, WakeSignal};

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const FAILED: u8 = 2;

/// How a synchronous call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The closure ran to completion on the destination context.
    Completed,
    /// The destination discarded the call without running it.
    Failed,
}

/// Signal that settles exactly once, as completed or failed.
///
/// The first `complete` / `fail` wins; later calls are ignored. Settling uses
/// release ordering and waiting uses acquire ordering, so everything the
/// destination wrote before settling is visible to the waiter.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    state: AtomicU8,
    wake: WakeSignal,
}

impl CompletionSignal {
    /// Creates an unsettled signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the call completed. Returns false if it was already settled.
    pub fn complete(&self) -> bool {
        self.settle(COMPLETED)
    }

    /// Marks the call failed. Returns false if it was already settled.
    pub fn fail(&self) -> bool {
        self.settle(FAILED)
    }

    fn settle(&self, to: u8) -> bool {
        let won = self
            .state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.wake.notify();
        }
        won
    }

    /// Returns the outcome if the signal has settled.
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> Option<CallOutcome> {
        match self.state.load(Ordering::Acquire) {
            COMPLETED => Some(CallOutcome::Completed),
            FAILED => Some(CallOutcome::Failed),
            _ => None,
        }
    }

    /// Suspends the caller until the signal settles.
    pub fn wait(&self, strategy: &dyn SuspendStrategy) -> CallOutcome {
        if let Some(outcome) = self.outcome() {
            return outcome;
        }
        strategy.suspend(&self.wake, &|| self.state.load(Ordering::Acquire) != PENDING);
        self.outcome().unwrap_or(CallOutcome::Failed)
    }
}
