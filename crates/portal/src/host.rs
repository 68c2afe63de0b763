//! # Host Loop
//!
//! The UI-owning event loop. Each turn it:
//! 1. Runs jobs queued for the host context
//! 2. Forwards page changes (visibility, canvas size) to the application
//! 3. Emits a vsync tick when one is due
//! 4. In cooperative mode, runs an application iteration when the published
//!    cadence says one is due
//!
//! Between turns it sleeps on the host job queue until the next deadline, so
//! a dispatch from the application wakes it immediately.

use std::sync::Arc;
use std::time::{Duration, Instant};

use portal_core::ContextId;
use portal_platform::ThreadingMode;
use tracing::{debug, info, trace};

use crate::app::{spawn_application, Application, Driver, Flow, RunSummary};
use crate::error::RuntimeResult;
use crate::events::HostEvent;
use crate::pacer::Schedule;
use crate::runtime::{PageSnapshot, Runtime};

/// Host loop counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostLoopStats {
    /// Loop turns taken.
    pub turns: u64,
    /// Host jobs executed.
    pub jobs_run: u64,
    /// Vsync ticks emitted.
    pub vsync_ticks: u64,
    /// Page events forwarded to the application.
    pub events_sent: u64,
}

/// Cooperative-mode bookkeeping for the last application iteration.
#[derive(Clone, Copy, Debug)]
struct LastIteration {
    at: Option<Instant>,
    tick: u64,
}

/// Event loop for the host context.
#[derive(Debug)]
pub struct HostLoop {
    runtime: Arc<Runtime>,
    vsync_period: Duration,
    next_vsync: Instant,
    reported: PageSnapshot,
    stats: HostLoopStats,
}

impl HostLoop {
    /// Creates a loop ticking at the configured refresh rate.
    #[must_use]
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let refresh_hz = runtime.config().pacing.refresh_hz.max(1);
        let vsync_period = Duration::from_micros(1_000_000 / u64::from(refresh_hz));
        let reported = runtime.initial_page();
        Self {
            runtime,
            vsync_period,
            next_vsync: Instant::now() + vsync_period,
            reported,
            stats: HostLoopStats::default(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> HostLoopStats {
        self.stats
    }

    /// Runs `app` to completion in the runtime's threading mode, then shuts
    /// the runtime down.
    ///
    /// Threaded: `app` gets its own thread and this thread serves the host
    /// until it finishes. Cooperative: this thread serves both contexts.
    ///
    /// # Errors
    ///
    /// Returns an error if the application thread cannot be started or
    /// panics.
    pub fn run<A: Application>(mut self, app: A) -> RuntimeResult<RunSummary> {
        let runtime = Arc::clone(&self.runtime);
        let _shutdown = ShutdownOnDrop(&runtime);

        let summary = match runtime.mode() {
            ThreadingMode::Threaded => {
                spawn_application(Arc::clone(&runtime), app).and_then(|worker| {
                    self.run_until(&|| worker.is_finished());
                    worker.join()
                })
            }
            ThreadingMode::Cooperative => Ok(self.run_cooperative(app)),
        };
        info!(
            turns = self.stats.turns,
            jobs = self.stats.jobs_run,
            vsync_ticks = self.stats.vsync_ticks,
            "host loop finished"
        );
        summary
    }

    /// Serves the host context until `done` returns true or the runtime
    /// shuts down.
    ///
    /// The application must not be waiting on the host when `done` turns
    /// true; [`HostLoop::run`] uses the application thread's exit.
    pub fn run_until(&mut self, done: &dyn Fn() -> bool) {
        let bridge = Arc::clone(self.runtime.bridge());
        let _host = bridge.enter(ContextId::Host);
        debug!(period_us = self.vsync_period.as_micros(), "host loop started");

        while !done() && self.runtime.is_running() {
            self.turn(Instant::now());
            let timeout = self.next_vsync.saturating_duration_since(Instant::now());
            bridge.wait_for_work(ContextId::Host, timeout);
        }
        self.stats.jobs_run += bridge.run_pending(ContextId::Host) as u64;
    }

    /// Serves both contexts on this thread until `app` exits or the runtime
    /// shuts down.
    pub fn run_cooperative<A: Application>(&mut self, app: A) -> RunSummary {
        let bridge = Arc::clone(self.runtime.bridge());
        let _host = bridge.enter(ContextId::Host);
        let _application = bridge.enter(ContextId::Application);
        let floor = Duration::from_millis(u64::from(self.runtime.probe().min_sleep_ms()));
        debug!(floor_ms = floor.as_millis(), "cooperative host loop started");

        let mut driver = Driver::new(Arc::clone(&self.runtime), app);
        let mut last = LastIteration {
            at: None,
            tick: self.runtime.clock().ticks(),
        };

        while self.runtime.is_running() {
            let now = Instant::now();
            self.turn(now);

            let schedule = self.runtime.cadence().schedule();
            if self.application_due(schedule, floor, now, last) {
                last = LastIteration {
                    at: Some(now),
                    tick: self.runtime.clock().ticks(),
                };
                if driver.step() == Flow::Exit {
                    break;
                }
                continue;
            }

            let deadline = self.next_deadline(schedule, floor, last);
            let timeout = deadline.saturating_duration_since(Instant::now());
            bridge.wait_for_work(ContextId::Host, timeout);
        }

        self.stats.jobs_run += bridge.run_pending(ContextId::Host) as u64;
        driver.finish()
    }

    /// One pass over host work.
    fn turn(&mut self, now: Instant) {
        self.stats.turns += 1;
        self.stats.jobs_run += self.runtime.bridge().run_pending(ContextId::Host) as u64;
        self.forward_page_changes();

        if now >= self.next_vsync {
            let tick = self.runtime.clock().tick();
            self.stats.vsync_ticks += 1;
            self.next_vsync += self.vsync_period;
            if self.next_vsync <= now {
                // Skip missed refreshes instead of bursting.
                self.next_vsync = now + self.vsync_period;
            }
            trace!(tick, "vsync");
        }
    }

    /// Sends page changes to the application. A change stays pending until
    /// the event channel accepts it.
    fn forward_page_changes(&mut self) {
        let probe = self.runtime.probe();
        let events = self.runtime.host_events();

        let hidden = probe.is_window_hidden();
        if hidden != self.reported.window_hidden
            && events.send(HostEvent::VisibilityChanged { hidden })
        {
            self.reported.window_hidden = hidden;
            self.stats.events_sent += 1;
        }

        let (width, height) = probe.canvas_size();
        if (width, height) != self.reported.canvas_size
            && events.send(HostEvent::CanvasResized { width, height })
        {
            self.reported.canvas_size = (width, height);
            self.stats.events_sent += 1;
        }
    }

    fn application_due(
        &self,
        schedule: Schedule,
        floor: Duration,
        now: Instant,
        last: LastIteration,
    ) -> bool {
        match schedule {
            Schedule::Vsync(interval) => {
                self.runtime.clock().ticks() >= last.tick + u64::from(interval)
            }
            Schedule::FakeBlock(period) => elapsed_since(last.at, now) >= period,
            Schedule::Fixed(period) => elapsed_since(last.at, now) >= period.max(floor),
        }
    }

    fn next_deadline(&self, schedule: Schedule, floor: Duration, last: LastIteration) -> Instant {
        let application = match (schedule, last.at) {
            (Schedule::Vsync(_), _) | (_, None) => self.next_vsync,
            (Schedule::FakeBlock(period), Some(at)) => at + period,
            (Schedule::Fixed(period), Some(at)) => at + period.max(floor),
        };
        application.min(self.next_vsync)
    }
}

/// Shuts the runtime down when [`HostLoop::run`] returns, on every path.
struct ShutdownOnDrop<'a>(&'a Runtime);

impl Drop for ShutdownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

fn elapsed_since(at: Option<Instant>, now: Instant) -> Duration {
    at.map_or(Duration::MAX, |at| now.saturating_duration_since(at))
}
