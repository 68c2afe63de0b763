//! # Application Context
//!
//! The [`Application`] trait and the machinery that runs it, either on its
//! own thread or inside the host loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use portal_core::{CommandChannel, ContextId, ContractViolation};
use portal_platform::ThreadingMode;
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeResult};
use crate::pacer::FramePacer;
use crate::runtime::{Runtime, RuntimeReport};
use crate::stats::IterationStats;

/// What the main loop does after an iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Run another iteration.
    Continue,
    /// Stop the main loop.
    Exit,
}

/// Per-iteration access to the runtime.
pub struct Frame<'a> {
    runtime: &'a Runtime,
    pacer: &'a mut FramePacer,
    iteration: u64,
}

impl<'a> Frame<'a> {
    /// The runtime.
    #[must_use]
    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// The command channel.
    #[must_use]
    pub fn channel(&self) -> &'a CommandChannel {
        self.runtime.channel()
    }

    /// The pacer controlling this loop.
    pub fn pacer(&mut self) -> &mut FramePacer {
        self.pacer
    }

    /// Zero-based index of this iteration.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }
}

/// A program main loop driven by the runtime.
pub trait Application: Send + 'static {
    /// Runs one iteration on the application context.
    fn iterate(&mut self, frame: &mut Frame<'_>) -> Flow;
}

/// What a finished main loop leaves behind.
#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    /// Iteration timings.
    pub stats: IterationStats,
    /// Runtime counters at the end of the run.
    pub report: RuntimeReport,
}

/// Runs iterations of one application. Used by both threading modes.
pub(crate) struct Driver<A> {
    runtime: Arc<Runtime>,
    app: A,
    pacer: FramePacer,
    stats: IterationStats,
    iteration: u64,
}

impl<A: Application> Driver<A> {
    /// Must be created on the application context.
    pub(crate) fn new(runtime: Arc<Runtime>, app: A) -> Self {
        let pacer = runtime.frame_pacer();
        Self {
            runtime,
            app,
            pacer,
            stats: IterationStats::new(),
            iteration: 0,
        }
    }

    /// One iteration: apply host events, run queued application jobs, then
    /// call the application unless the iteration is dropped.
    pub(crate) fn step(&mut self) -> Flow {
        let start = Instant::now();
        self.pacer.begin_iteration();
        self.runtime.bridge().run_pending(ContextId::Application);

        if self.pacer.should_drop_iter() {
            self.stats.record_dropped();
            return Flow::Continue;
        }

        let mut frame = Frame {
            runtime: &self.runtime,
            pacer: &mut self.pacer,
            iteration: self.iteration,
        };
        let flow = self.app.iterate(&mut frame);
        self.iteration += 1;
        self.stats.record(start.elapsed());
        flow
    }

    pub(crate) fn pacer_mut(&mut self) -> &mut FramePacer {
        &mut self.pacer
    }

    pub(crate) fn finish(self) -> RunSummary {
        self.stats.log_summary();
        RunSummary {
            stats: self.stats,
            report: self.runtime.report(),
        }
    }
}

/// Handle to an application running on its own thread.
#[derive(Debug)]
pub struct ApplicationThread {
    handle: JoinHandle<RunSummary>,
}

impl ApplicationThread {
    /// Whether the main loop has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the main loop to return.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ApplicationPanicked`] if the thread panicked.
    pub fn join(self) -> RuntimeResult<RunSummary> {
        self.handle.join().map_err(|_| RuntimeError::ApplicationPanicked)
    }
}

/// Starts `app` on a new application thread. Threaded mode only.
///
/// The thread registers as the application context, loops until the
/// application exits or the runtime shuts down, then stops the application
/// context so later dispatches to it fail fast.
///
/// # Errors
///
/// [`RuntimeError::Contract`] in cooperative mode, [`RuntimeError::Spawn`]
/// if the thread cannot be created.
pub fn spawn_application<A: Application>(
    runtime: Arc<Runtime>,
    app: A,
) -> RuntimeResult<ApplicationThread> {
    if runtime.mode() == ThreadingMode::Cooperative {
        let violation = ContractViolation::CapabilityMismatch {
            operation: "spawn_application",
            mode: runtime.mode().as_str(),
        };
        runtime.bridge().diagnostics().report(violation);
        return Err(violation.into());
    }

    let handle = thread::Builder::new()
        .name("portal-application".into())
        .spawn(move || run_application_thread(&runtime, app))
        .map_err(RuntimeError::Spawn)?;
    Ok(ApplicationThread { handle })
}

fn run_application_thread<A: Application>(runtime: &Arc<Runtime>, app: A) -> RunSummary {
    let bridge = Arc::clone(runtime.bridge());
    let _context = bridge.enter(ContextId::Application);
    info!("application thread started");

    let floor = Duration::from_millis(u64::from(runtime.probe().min_sleep_ms()));
    let mut driver = Driver::new(Arc::clone(runtime), app);

    while runtime.is_running() {
        if driver.step() == Flow::Exit {
            break;
        }
        let pacer = driver.pacer_mut();
        if pacer.state().vsync {
            pacer.wait_for_frame();
        } else {
            // Fixed cadence never drops below the timer floor.
            let period = runtime.cadence().fixed_period().max(floor);
            bridge.wait_for_work(ContextId::Application, period);
        }
    }

    let discarded = bridge.shutdown(ContextId::Application);
    debug!(discarded, "application thread exiting");
    driver.finish()
}
