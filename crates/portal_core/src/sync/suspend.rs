//! Suspension strategies for blocking a context without busy-spinning.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Wake-up point shared between a waiter and its notifier.
///
/// Notifiers must change the state the waiter checks *before* calling
/// [`WakeSignal::notify`]. `notify` takes the lock, so a waiter that checked
/// its predicate under the lock cannot miss the wake-up.
#[derive(Debug, Default)]
pub struct WakeSignal {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl WakeSignal {
    /// Creates a wake signal with no waiters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wakes every thread suspended on this signal.
    pub fn notify(&self) {
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }
}

/// How a context suspends until a condition holds.
pub trait SuspendStrategy: Send + Sync + fmt::Debug {
    /// Blocks the calling thread until `ready` returns true.
    ///
    /// `ready` must become true only after the state it reads was published
    /// and `wake` was notified (park strategies rely on the notification,
    /// poll strategies only on the state).
    fn suspend(&self, wake: &WakeSignal, ready: &dyn Fn() -> bool);

    /// Strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Parks the thread on a condition variable. No polling.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParkStrategy;

impl SuspendStrategy for ParkStrategy {
    fn suspend(&self, wake: &WakeSignal, ready: &dyn Fn() -> bool) {
        let mut guard = wake.lock.lock();
        while !ready() {
            wake.condvar.wait(&mut guard);
        }
    }

    fn name(&self) -> &'static str {
        "park"
    }
}

/// Sleeps in fixed steps and re-checks the condition.
///
/// The step is never shorter than the platform's timer floor: asking for less
/// only produces a busier loop with the same latency.
#[derive(Debug, Clone, Copy)]
pub struct SleepPollStrategy {
    step: Duration,
}

impl SleepPollStrategy {
    /// Creates a poll strategy sleeping `floor_ms` per step (at least 1 ms).
    #[must_use]
    pub fn new(floor_ms: u32) -> Self {
        Self {
            step: Duration::from_millis(u64::from(floor_ms.max(1))),
        }
    }

    /// Sleep duration between checks.
    #[inline]
    #[must_use]
    pub const fn step(&self) -> Duration {
        self.step
    }
}

impl SuspendStrategy for SleepPollStrategy {
    fn suspend(&self, _wake: &WakeSignal, ready: &dyn Fn() -> bool) {
        while !ready() {
            thread::sleep(self.step);
        }
    }

    fn name(&self) -> &'static str {
        "sleep-poll"
    }
}

/// Picks the suspension strategy for this process.
///
/// Called once at start-up with the platform's capability flag and measured
/// timer floor.
#[must_use]
pub fn select_strategy(async_suspend: bool, timer_floor_ms: u32) -> Arc<dyn SuspendStrategy> {
    let strategy: Arc<dyn SuspendStrategy> = if async_suspend {
        Arc::new(ParkStrategy)
    } else {
        Arc::new(SleepPollStrategy::new(timer_floor_ms))
    };
    debug!(strategy = strategy.name(), timer_floor_ms, "suspension strategy selected");
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    fn wake_after(strategy: Arc<dyn SuspendStrategy>) -> Duration {
        let flag = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(WakeSignal::new());

        let notifier = {
            let flag = Arc::clone(&flag);
            let wake = Arc::clone(&wake);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                flag.store(true, Ordering::Release);
                wake.notify();
            })
        };

        let start = Instant::now();
        strategy.suspend(&wake, &|| flag.load(Ordering::Acquire));
        let waited = start.elapsed();
        notifier.join().unwrap();
        waited
    }

    #[test]
    fn test_park_wakes_on_notify() {
        let waited = wake_after(Arc::new(ParkStrategy));
        assert!(waited >= Duration::from_millis(15));
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_poll_wakes_on_state() {
        let waited = wake_after(Arc::new(SleepPollStrategy::new(2)));
        assert!(waited >= Duration::from_millis(15));
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_ready_condition_returns_immediately() {
        let wake = WakeSignal::new();
        ParkStrategy.suspend(&wake, &|| true);
        SleepPollStrategy::new(50).suspend(&wake, &|| true);
    }

    #[test]
    fn test_poll_step_respects_floor() {
        assert_eq!(SleepPollStrategy::new(0).step(), Duration::from_millis(1));
        assert_eq!(SleepPollStrategy::new(16).step(), Duration::from_millis(16));
    }

    #[test]
    fn test_select_strategy() {
        assert_eq!(select_strategy(true, 5).name(), "park");
        assert_eq!(select_strategy(false, 5).name(), "sleep-poll");
    }
}
