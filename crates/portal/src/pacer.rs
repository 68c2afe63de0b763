//! # Frame Pacing
//!
//! Decides when the application's next main-loop iteration runs.
//!
//! ## States
//!
//! ```text
//!              set_main_loop_interval(n > 0)
//!   RUNNING ────────────────────────────────> VSYNC_WAIT   (threaded)
//!      │                                          │
//!      │ enter_fake_block(ms)       wait_for_frame returns on tick
//!      v                                          v
//!   FAKE_BLOCK ── exit_fake_block ──> RUNNING <───┘       (cooperative)
//! ```
//!
//! The application owns a [`FramePacer`] and mutates its [`FrameState`].
//! The host reads the published [`Cadence`] and drives the [`VsyncClock`].

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use portal_core::{ContractViolation, FakeBlockMisuse, ThreadBridge, WakeSignal};
use portal_platform::ThreadingMode;
use tracing::{debug, trace};

use crate::events::{HostEvent, HostEventReceiver};

// =============================================================================
// SHARED STATE
// =============================================================================

/// Vertical-sync tick source, advanced by the host loop.
#[derive(Debug, Default)]
pub struct VsyncClock {
    ticks: AtomicU64,
    stopped: AtomicBool,
    wake: WakeSignal,
}

impl VsyncClock {
    /// Creates a clock at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances one refresh and wakes frame waiters. Returns the new tick.
    pub fn tick(&self) -> u64 {
        let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        self.wake.notify();
        tick
    }

    /// Ticks emitted so far.
    #[inline]
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Stops the clock. Every current and future frame wait returns at once.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.wake.notify();
    }

    /// Whether [`VsyncClock::stop`] was called.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Wake signal frame waiters suspend on.
    #[must_use]
    pub fn wake(&self) -> &WakeSignal {
        &self.wake
    }
}

/// When the host should run the next application iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Every `interval` vsync ticks.
    Vsync(u32),
    /// Fixed period with vsync off.
    Fixed(Duration),
    /// Re-entry period while a fake block is active.
    FakeBlock(Duration),
}

/// Cadence published by the application for the host to follow.
#[derive(Debug)]
pub struct Cadence {
    interval: AtomicU32,
    fixed_period_ms: AtomicU32,
    fake_block_ms: AtomicU32,
}

impl Cadence {
    /// Creates a cadence starting at `interval` (0 = vsync off).
    #[must_use]
    pub fn new(interval: u32, fixed_period_ms: u32) -> Self {
        Self {
            interval: AtomicU32::new(interval),
            fixed_period_ms: AtomicU32::new(fixed_period_ms),
            fake_block_ms: AtomicU32::new(0),
        }
    }

    /// Current main-loop interval in refreshes. 0 means vsync off.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> u32 {
        self.interval.load(Ordering::Acquire)
    }

    /// Whether iterations follow vsync.
    #[inline]
    #[must_use]
    pub fn vsync(&self) -> bool {
        self.interval() != 0
    }

    /// Fixed-cadence period used while vsync is off.
    #[inline]
    #[must_use]
    pub fn fixed_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.fixed_period_ms.load(Ordering::Acquire)))
    }

    /// Active fake-block period, if any.
    #[inline]
    #[must_use]
    pub fn fake_block(&self) -> Option<Duration> {
        match self.fake_block_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(Duration::from_millis(u64::from(ms))),
        }
    }

    /// The rule the host applies right now.
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        if let Some(period) = self.fake_block() {
            return Schedule::FakeBlock(period);
        }
        match self.interval() {
            0 => Schedule::Fixed(self.fixed_period()),
            interval => Schedule::Vsync(interval),
        }
    }

    fn publish_interval(&self, interval: u32) {
        self.interval.store(interval, Ordering::Release);
    }

    fn publish_fake_block(&self, ms: u32) {
        self.fake_block_ms.store(ms, Ordering::Release);
    }
}

// =============================================================================
// APPLICATION SIDE
// =============================================================================

/// Pacing state owned by the application context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameState {
    /// Refreshes per iteration. 0 when vsync is off.
    pub interval: u32,
    /// Iterations are paced by vsync.
    pub vsync: bool,
    /// The page is hidden, as of the last iteration start.
    pub window_hidden: bool,
    /// A fake block is active.
    pub fake_block: bool,
    /// Re-entry period of the active fake block in milliseconds.
    pub fake_block_ms: u32,
}

/// Main-loop cadence controller for the application context.
///
/// Only one pacer should exist per runtime: it consumes the host event
/// stream.
pub struct FramePacer {
    state: FrameState,
    mode: ThreadingMode,
    canvas_size: (u32, u32),
    last_tick: u64,
    bridge: Arc<ThreadBridge>,
    cadence: Arc<Cadence>,
    clock: Arc<VsyncClock>,
    events: HostEventReceiver,
}

impl FramePacer {
    pub(crate) fn new(
        mode: ThreadingMode,
        bridge: Arc<ThreadBridge>,
        cadence: Arc<Cadence>,
        clock: Arc<VsyncClock>,
        events: HostEventReceiver,
        window_hidden: bool,
        canvas_size: (u32, u32),
    ) -> Self {
        let interval = cadence.interval();
        Self {
            state: FrameState {
                interval,
                vsync: interval != 0,
                window_hidden,
                fake_block: false,
                fake_block_ms: 0,
            },
            mode,
            canvas_size,
            last_tick: clock.ticks(),
            bridge,
            cadence,
            clock,
            events,
        }
    }

    /// Applies host events queued since the previous iteration.
    ///
    /// Call at the start of every iteration, before [`FramePacer::should_drop_iter`].
    pub fn begin_iteration(&mut self) {
        for event in self.events.drain() {
            match event {
                HostEvent::VisibilityChanged { hidden } => {
                    if hidden != self.state.window_hidden {
                        debug!(hidden, "window visibility applied");
                    }
                    self.state.window_hidden = hidden;
                }
                HostEvent::CanvasResized { width, height } => {
                    trace!(width, height, "canvas size applied");
                    self.canvas_size = (width, height);
                }
            }
        }
    }

    /// Sets the main-loop interval.
    ///
    /// 0 switches to the fixed-period cadence with vsync off; `n > 0` paces
    /// every `n` refreshes. Setting the current value again changes nothing.
    pub fn set_main_loop_interval(&mut self, interval: u32) {
        if self.state.interval == interval {
            return;
        }
        self.state.interval = interval;
        self.state.vsync = interval != 0;
        self.last_tick = self.clock.ticks();
        self.cadence.publish_interval(interval);
        debug!(interval, vsync = self.state.vsync, "main loop interval changed");
    }

    /// Blocks until the next frame is due. Threaded mode only.
    ///
    /// Returns immediately when vsync is off or the clock has stopped.
    /// Otherwise waits until `interval` ticks have passed since the last
    /// frame, or for the next tick if the application is already late.
    pub fn wait_for_frame(&mut self) {
        if self.mode == ThreadingMode::Cooperative {
            self.capability_mismatch("wait_for_frame");
            return;
        }
        if !self.state.vsync {
            return;
        }

        let clock = &*self.clock;
        let now = clock.ticks();
        let spaced = self.last_tick + u64::from(self.state.interval);
        let target = if spaced > now { spaced } else { now + 1 };

        self.bridge
            .suspend_until(clock.wake(), &|| clock.is_stopped() || clock.ticks() >= target);
        self.last_tick = clock.ticks();
    }

    /// Hands control back to the host, which re-enters the application every
    /// `ms` milliseconds until [`FramePacer::exit_fake_block`]. Cooperative
    /// mode only. `ms` of 0 is treated as 1.
    pub fn enter_fake_block(&mut self, ms: u32) {
        if self.mode == ThreadingMode::Threaded {
            self.capability_mismatch("enter_fake_block");
            return;
        }
        if self.state.fake_block {
            self.fake_block_misuse(FakeBlockMisuse::NestedEnter);
            return;
        }

        let ms = ms.max(1);
        self.state.fake_block = true;
        self.state.fake_block_ms = ms;
        self.cadence.publish_fake_block(ms);
        debug!(ms, "fake block entered");
    }

    /// Ends the active fake block and restores the interval cadence.
    pub fn exit_fake_block(&mut self) {
        if self.mode == ThreadingMode::Threaded {
            self.capability_mismatch("exit_fake_block");
            return;
        }
        if !self.state.fake_block {
            self.fake_block_misuse(FakeBlockMisuse::ExitWithoutEnter);
            return;
        }

        self.state.fake_block = false;
        self.state.fake_block_ms = 0;
        self.cadence.publish_fake_block(0);
        debug!("fake block exited");
    }

    /// True when this iteration should skip its work: the page is hidden and
    /// the loop is vsync-paced.
    #[inline]
    #[must_use]
    pub const fn should_drop_iter(&self) -> bool {
        self.state.window_hidden && self.state.vsync
    }

    /// Current pacing state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Threading mode the pacer was built for.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> ThreadingMode {
        self.mode
    }

    /// Canvas size as of the last iteration start.
    #[inline]
    #[must_use]
    pub const fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    fn capability_mismatch(&self, operation: &'static str) {
        self.bridge
            .diagnostics()
            .report(ContractViolation::CapabilityMismatch {
                operation,
                mode: self.mode.as_str(),
            });
    }

    fn fake_block_misuse(&self, misuse: FakeBlockMisuse) {
        self.bridge
            .diagnostics()
            .report(ContractViolation::FakeBlockMisuse(misuse));
        debug_assert!(false, "{misuse}");
    }
}

impl std::fmt::Debug for FramePacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePacer")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("last_tick", &self.last_tick)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{host_event_channel, HostEventSender};
    use portal_core::{ParkStrategy, SleepPollStrategy, SuspendStrategy};
    use std::thread;
    use std::time::Instant;

    struct Rig {
        pacer: FramePacer,
        clock: Arc<VsyncClock>,
        cadence: Arc<Cadence>,
        bridge: Arc<ThreadBridge>,
        events: HostEventSender,
    }

    fn rig(mode: ThreadingMode, interval: u32, strategy: Arc<dyn SuspendStrategy>) -> Rig {
        let bridge = Arc::new(ThreadBridge::new(strategy));
        let cadence = Arc::new(Cadence::new(interval, 0));
        let clock = Arc::new(VsyncClock::new());
        let (events, rx) = host_event_channel(8);
        let pacer = FramePacer::new(
            mode,
            Arc::clone(&bridge),
            Arc::clone(&cadence),
            Arc::clone(&clock),
            rx,
            false,
            (800, 600),
        );
        Rig {
            pacer,
            clock,
            cadence,
            bridge,
            events,
        }
    }

    fn threaded(interval: u32) -> Rig {
        rig(ThreadingMode::Threaded, interval, Arc::new(ParkStrategy))
    }

    fn cooperative(interval: u32) -> Rig {
        rig(ThreadingMode::Cooperative, interval, Arc::new(ParkStrategy))
    }

    /// Ticks `clock` every `period` until stopped.
    fn spawn_ticker(clock: &Arc<VsyncClock>, period: Duration) -> thread::JoinHandle<()> {
        let clock = Arc::clone(clock);
        thread::spawn(move || {
            while !clock.is_stopped() {
                thread::sleep(period);
                clock.tick();
            }
        })
    }

    #[test]
    fn test_should_drop_iter_truth_table() {
        let table = [
            (false, 0, false),
            (false, 1, false),
            (true, 0, false),
            (true, 1, true),
        ];
        for (hidden, interval, expected) in table {
            let mut rig = threaded(interval);
            rig.events.send(HostEvent::VisibilityChanged { hidden });
            rig.pacer.begin_iteration();
            assert_eq!(
                rig.pacer.should_drop_iter(),
                expected,
                "hidden={hidden} interval={interval}"
            );
        }
    }

    #[test]
    fn test_visibility_applied_only_at_iteration_start() {
        let mut rig = threaded(1);
        rig.events.send(HostEvent::VisibilityChanged { hidden: true });
        assert!(!rig.pacer.state().window_hidden);
        rig.pacer.begin_iteration();
        assert!(rig.pacer.state().window_hidden);
    }

    #[test]
    fn test_canvas_resize_event() {
        let mut rig = threaded(1);
        rig.events.send(HostEvent::CanvasResized { width: 1024, height: 768 });
        rig.pacer.begin_iteration();
        assert_eq!(rig.pacer.canvas_size(), (1024, 768));
    }

    #[test]
    fn test_interval_zero_disables_vsync() {
        let mut rig = threaded(1);
        rig.pacer.set_main_loop_interval(0);
        assert!(!rig.pacer.state().vsync);
        assert_eq!(rig.cadence.schedule(), Schedule::Fixed(Duration::ZERO));

        let start = Instant::now();
        rig.pacer.wait_for_frame();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_interval_idempotent() {
        let mut rig = threaded(2);
        rig.clock.tick();
        rig.pacer.set_main_loop_interval(2);
        assert_eq!(rig.pacer.last_tick, 0);
        assert_eq!(rig.cadence.schedule(), Schedule::Vsync(2));
    }

    #[test]
    fn test_wait_for_frame_waits_for_tick() {
        let mut rig = threaded(1);
        let ticker = spawn_ticker(&rig.clock, Duration::from_millis(2));

        for _ in 0..5 {
            let before = rig.clock.ticks();
            rig.pacer.wait_for_frame();
            assert!(rig.clock.ticks() > before);
        }

        rig.clock.stop();
        ticker.join().unwrap();
    }

    #[test]
    fn test_wait_for_frame_honours_interval() {
        let mut rig = rig(ThreadingMode::Threaded, 3, Arc::new(SleepPollStrategy::new(1)));
        let ticker = spawn_ticker(&rig.clock, Duration::from_millis(1));

        rig.pacer.wait_for_frame();
        let first = rig.pacer.last_tick;
        rig.pacer.wait_for_frame();
        assert!(rig.clock.ticks() >= first + 3);

        rig.clock.stop();
        ticker.join().unwrap();
    }

    #[test]
    fn test_wait_for_frame_returns_on_stop() {
        let mut rig = threaded(1);
        let clock = Arc::clone(&rig.clock);
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            clock.stop();
        });

        rig.pacer.wait_for_frame();
        assert_eq!(rig.clock.ticks(), 0);
        stopper.join().unwrap();

        rig.pacer.wait_for_frame();
    }

    #[test]
    fn test_wait_for_frame_cooperative_is_mismatch() {
        let mut rig = cooperative(1);
        rig.pacer.wait_for_frame();
        assert_eq!(rig.bridge.diagnostics().snapshot().capability_mismatch, 1);
    }

    #[test]
    fn test_fake_block_publishes_cadence() {
        let mut rig = cooperative(1);
        rig.pacer.enter_fake_block(20);
        assert!(rig.pacer.state().fake_block);
        assert_eq!(rig.cadence.schedule(), Schedule::FakeBlock(Duration::from_millis(20)));

        rig.pacer.exit_fake_block();
        assert!(!rig.pacer.state().fake_block);
        assert_eq!(rig.cadence.schedule(), Schedule::Vsync(1));
    }

    #[test]
    fn test_fake_block_zero_clamped() {
        let mut rig = cooperative(0);
        rig.pacer.enter_fake_block(0);
        assert_eq!(rig.pacer.state().fake_block_ms, 1);
        rig.pacer.exit_fake_block();
        assert_eq!(rig.cadence.schedule(), Schedule::Fixed(Duration::ZERO));
    }

    #[test]
    fn test_fake_block_threaded_is_mismatch() {
        let mut rig = threaded(1);
        rig.pacer.enter_fake_block(10);
        rig.pacer.exit_fake_block();
        assert!(!rig.pacer.state().fake_block);
        assert_eq!(rig.cadence.fake_block(), None);
        assert_eq!(rig.bridge.diagnostics().snapshot().capability_mismatch, 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "nested enter_fake_block")]
    fn test_nested_fake_block_asserts() {
        let mut rig = cooperative(1);
        rig.pacer.enter_fake_block(5);
        rig.pacer.enter_fake_block(5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exit_fake_block without enter")]
    fn test_unmatched_exit_asserts() {
        let mut rig = cooperative(1);
        rig.pacer.exit_fake_block();
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_fake_block_misuse_counted() {
        let mut rig = cooperative(1);
        rig.pacer.exit_fake_block();
        rig.pacer.enter_fake_block(5);
        rig.pacer.enter_fake_block(5);
        assert_eq!(rig.pacer.state().fake_block_ms, 5);
        assert_eq!(rig.bridge.diagnostics().snapshot().fake_block_misuse, 2);
    }
}
