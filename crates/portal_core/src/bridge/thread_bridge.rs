//! The host/application dispatch bridge.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::bridge::context::{self, ContextGuard, ContextId};
use crate::bridge::job::{PendingCall, Task};
use crate::bridge::queue::JobQueue;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::{BridgeError, BridgeResult};
use crate::sync::{CallOutcome, CompletionSignal, SuspendStrategy, WakeSignal};

static NEXT_BRIDGE_ID: AtomicU64 = AtomicU64::new(1);

/// Cross-context dispatcher for one host and one application context.
///
/// ## Usage
///
/// ```rust,ignore
/// let bridge = Arc::new(ThreadBridge::new(select_strategy(true, 4)));
///
/// // Host thread
/// let _host = bridge.enter(ContextId::Host);
/// loop {
///     bridge.wait_for_work(ContextId::Host, frame_budget);
///     bridge.run_pending(ContextId::Host);
/// }
///
/// // Application thread
/// let _app = bridge.enter(ContextId::Application);
/// let (w, h) = bridge.dispatch_sync(ContextId::Host, read_canvas_size)?;
/// ```
pub struct ThreadBridge {
    id: u64,
    host: JobQueue,
    application: JobQueue,
    strategy: Arc<dyn SuspendStrategy>,
    diagnostics: Arc<Diagnostics>,
}

impl ThreadBridge {
    /// Creates a bridge using `strategy` for every suspension.
    #[must_use]
    pub fn new(strategy: Arc<dyn SuspendStrategy>) -> Self {
        Self::with_diagnostics(strategy, Arc::new(Diagnostics::new()))
    }

    /// Creates a bridge that records into shared diagnostics.
    #[must_use]
    pub fn with_diagnostics(
        strategy: Arc<dyn SuspendStrategy>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            id: NEXT_BRIDGE_ID.fetch_add(1, Ordering::Relaxed),
            host: JobQueue::new(ContextId::Host),
            application: JobQueue::new(ContextId::Application),
            strategy,
            diagnostics,
        }
    }

    #[inline]
    fn queue(&self, context: ContextId) -> &JobQueue {
        match context {
            ContextId::Host => &self.host,
            ContextId::Application => &self.application,
        }
    }

    /// Registers the calling thread as serving `context`.
    ///
    /// The host loop enters [`ContextId::Host`]; the application thread enters
    /// [`ContextId::Application`]. A cooperative host enters both.
    pub fn enter(&self, context: ContextId) -> ContextGuard {
        ContextGuard::enter(self.id, context)
    }

    /// Returns true if the calling thread serves `context`.
    #[inline]
    #[must_use]
    pub fn is_current(&self, context: ContextId) -> bool {
        context::serves(self.id, context)
    }

    /// Runs `f` on `target` and blocks until it has finished.
    ///
    /// If the caller already serves `target`, `f` runs inline. Otherwise the
    /// call is queued on `target` and the caller suspends with the bridge's
    /// strategy until the destination completes or discards it.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::ContextUnavailable`] if `target` is shut down, or shuts
    ///   down before running `f`.
    /// - [`BridgeError::HostMustNotBlock`] if a host-only thread targets the
    ///   application.
    pub fn dispatch_sync<F, R>(&self, target: ContextId, f: F) -> BridgeResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current(target) {
            return Ok(f());
        }

        if target == ContextId::Application && self.is_current(ContextId::Host) {
            warn!("refusing synchronous dispatch from host to application");
            return Err(BridgeError::HostMustNotBlock);
        }

        let slot: Arc<Mutex<Option<R>>> = Arc::new(Mutex::new(None));
        let signal = Arc::new(CompletionSignal::new());
        let call = {
            let slot = Arc::clone(&slot);
            PendingCall::new(
                Box::new(move || {
                    *slot.lock() = Some(f());
                }),
                Arc::clone(&signal),
            )
        };

        if let Err(rejected) = self.queue(target).push(Task::Sync(call)) {
            drop(rejected);
            self.diagnostics.record(DiagnosticEvent::RejectedDispatch);
            debug!(%target, "sync dispatch to stopped context");
            return Err(BridgeError::ContextUnavailable(target));
        }

        trace!(%target, strategy = self.strategy.name(), "waiting on sync dispatch");
        match signal.wait(self.strategy.as_ref()) {
            CallOutcome::Completed => slot
                .lock()
                .take()
                .ok_or(BridgeError::ContextUnavailable(target)),
            CallOutcome::Failed => {
                self.diagnostics.record(DiagnosticEvent::FailedCall);
                Err(BridgeError::ContextUnavailable(target))
            }
        }
    }

    /// Queues `f` to run on `target` and returns immediately.
    ///
    /// Returns `false` if `target` is shut down; the closure is dropped unrun.
    pub fn dispatch_async<F>(&self, target: ContextId, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.queue(target).push(Task::Async(Box::new(f))) {
            Ok(()) => true,
            Err(_) => {
                self.diagnostics.record(DiagnosticEvent::RejectedDispatch);
                debug!(%target, "async dispatch to stopped context dropped");
                false
            }
        }
    }

    /// Runs every task queued for `context`, oldest first.
    ///
    /// Must be called from a thread serving `context`. Tasks queued while this
    /// runs are left for the next call. Tasks whose generation ended while
    /// the batch was running are discarded. Returns the number executed.
    pub fn run_pending(&self, context: ContextId) -> usize {
        debug_assert!(
            self.is_current(context),
            "run_pending({context}) from a thread not serving that context"
        );

        let queue = self.queue(context);
        let batch = queue.take_all();
        let mut executed = 0;

        for envelope in batch {
            if envelope.generation != queue.generation() {
                // Dropping a stale sync task fails its caller.
                self.diagnostics.record(DiagnosticEvent::StaleJob);
                trace!(
                    context = %queue.context(),
                    generation = envelope.generation,
                    "stale task discarded"
                );
                continue;
            }
            envelope.task.run();
            executed += 1;
        }

        executed
    }

    /// Waits up to `timeout` for tasks on `context`. Returns true if any are queued.
    pub fn wait_for_work(&self, context: ContextId, timeout: Duration) -> bool {
        self.queue(context).wait_for_work(timeout)
    }

    /// Stops accepting work for `context` and fails everything still queued.
    ///
    /// Returns the number of tasks discarded.
    pub fn shutdown(&self, context: ContextId) -> usize {
        let orphaned = self.queue(context).close();
        let discarded = orphaned.len();
        let waiting_callers = orphaned.iter().filter(|env| env.task.is_sync()).count();
        drop(orphaned);
        debug!(%context, discarded, waiting_callers, "context shut down");
        discarded
    }

    /// Returns true while `context` accepts work.
    #[must_use]
    pub fn is_running(&self, context: ContextId) -> bool {
        self.queue(context).is_open()
    }

    /// Number of tasks waiting for `context`.
    #[must_use]
    pub fn pending(&self, context: ContextId) -> usize {
        self.queue(context).len()
    }

    /// Current generation of `context`'s queue.
    #[must_use]
    pub fn generation(&self, context: ContextId) -> u64 {
        self.queue(context).generation()
    }

    /// Suspends the caller with the bridge's strategy until `ready` holds.
    ///
    /// Exposed for other blocking points (vsync waits) so that every
    /// suspension in the process follows the same capability choice.
    pub fn suspend_until(&self, wake: &WakeSignal, ready: &dyn Fn() -> bool) {
        self.strategy.suspend(wake, ready);
    }

    /// The suspension strategy chosen at start-up.
    #[must_use]
    pub fn strategy(&self) -> &dyn SuspendStrategy {
        self.strategy.as_ref()
    }

    /// Shared diagnostic counters.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }
}

impl std::fmt::Debug for ThreadBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadBridge")
            .field("id", &self.id)
            .field("strategy", &self.strategy.name())
            .field("host_pending", &self.host.len())
            .field("application_pending", &self.application.len())
            .finish()
    }
}
