//! Integration tests for cross-context dispatch through the runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use portal::core::{BridgeError, ContextId};
use portal::platform::{PlatformSection, PortalConfig};
use portal::{Application, Flow, Frame, HostRequest, Runtime};

fn config(threads: bool, async_suspend: bool) -> PortalConfig {
    let mut config = PortalConfig {
        platform: PlatformSection {
            threads,
            async_suspend,
            min_sleep_ms: Some(1),
            ..PlatformSection::default()
        },
        ..PortalConfig::default()
    };
    config.pacing.refresh_hz = 500;
    config
}

/// Serves the host context on a background thread until the runtime shuts down.
fn spawn_host(runtime: &Arc<Runtime>) -> thread::JoinHandle<()> {
    let runtime = Arc::clone(runtime);
    thread::spawn(move || runtime.host_loop().run_until(&|| false))
}

#[test]
fn test_async_fifo_per_sender() {
    let (runtime, _) = Runtime::headless(config(true, true)).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let seen = Arc::clone(&seen);
        assert!(runtime.run_on_host_async(move || seen.lock().push(i)));
    }

    let host = spawn_host(&runtime);
    let sentinel = runtime.run_on_host_sync(|| 0).unwrap();
    runtime.shutdown();
    host.join().unwrap();

    assert_eq!(sentinel, 0);
    assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
}

#[test]
fn test_sync_happens_before_in_every_strategy() {
    for async_suspend in [true, false] {
        let (runtime, _) = Runtime::headless(config(true, async_suspend)).unwrap();
        let host = spawn_host(&runtime);

        let cell = Arc::new(AtomicU64::new(0));
        for expected in 1..=20 {
            let writer = Arc::clone(&cell);
            runtime
                .run_on_host_sync(move || writer.store(expected, Ordering::Relaxed))
                .unwrap();
            assert_eq!(cell.load(Ordering::Relaxed), expected);
        }

        runtime.shutdown();
        host.join().unwrap();
    }
}

#[test]
fn test_reentrant_inline_fast_path() {
    let (runtime, _) = Runtime::headless(config(false, true)).unwrap();
    let _host = runtime.bridge().enter(ContextId::Host);
    let _app = runtime.bridge().enter(ContextId::Application);

    let inner_runtime = Arc::clone(&runtime);
    let value = runtime
        .run_on_host_sync(move || inner_runtime.run_on_host_sync(|| 21).unwrap() * 2)
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(runtime.bridge().pending(ContextId::Host), 0);
}

#[test]
fn test_host_must_not_block_on_application() {
    let (runtime, _) = Runtime::headless(config(true, true)).unwrap();
    let _host = runtime.bridge().enter(ContextId::Host);

    let err = runtime
        .bridge()
        .dispatch_sync(ContextId::Application, || ())
        .unwrap_err();
    assert_eq!(err, BridgeError::HostMustNotBlock);
    assert_eq!(runtime.bridge().pending(ContextId::Application), 0);
}

#[test]
fn test_waiting_caller_released_on_shutdown() {
    let (runtime, _) = Runtime::headless(config(true, true)).unwrap();

    let caller = {
        let runtime = Arc::clone(&runtime);
        thread::spawn(move || {
            let _app = runtime.bridge().enter(ContextId::Application);
            runtime.run_on_host_sync(|| 1)
        })
    };

    while runtime.bridge().pending(ContextId::Host) == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    runtime.shutdown();

    assert_eq!(
        caller.join().unwrap(),
        Err(BridgeError::ContextUnavailable(ContextId::Host))
    );
    assert_eq!(runtime.report().diagnostics.failed_calls, 1);
}

#[test]
fn test_application_jobs_run_at_iteration_start() {
    struct Probe {
        observed: Arc<AtomicU64>,
    }

    impl Application for Probe {
        fn iterate(&mut self, _frame: &mut Frame<'_>) -> Flow {
            assert_eq!(self.observed.load(Ordering::Relaxed), 7);
            Flow::Exit
        }
    }

    for threads in [true, false] {
        let (runtime, _) = Runtime::headless(config(threads, true)).unwrap();
        let observed = Arc::new(AtomicU64::new(0));
        let writer = Arc::clone(&observed);
        assert!(runtime.run_on_application_async(move || writer.store(7, Ordering::Relaxed)));

        let summary = runtime
            .host_loop()
            .run(Probe {
                observed: Arc::clone(&observed),
            })
            .unwrap();
        assert_eq!(summary.stats.iterations, 1);
    }
}

#[test]
fn test_application_queries_and_requests_host() {
    struct Requester {
        canvas: Arc<Mutex<Option<(u32, u32)>>>,
    }

    impl Application for Requester {
        fn iterate(&mut self, frame: &mut Frame<'_>) -> Flow {
            *self.canvas.lock() = frame.runtime().canvas_size().ok();
            frame.runtime().request(HostRequest::WakeLock(true));
            frame.runtime().request(HostRequest::PointerVisible(false));
            if frame.iteration() == 2 {
                Flow::Exit
            } else {
                Flow::Continue
            }
        }
    }

    for threads in [true, false] {
        let (runtime, page) = Runtime::headless(config(threads, true)).unwrap();
        let canvas = Arc::new(Mutex::new(None));

        runtime
            .host_loop()
            .run(Requester {
                canvas: Arc::clone(&canvas),
            })
            .unwrap();

        assert_eq!(*canvas.lock(), Some((800, 600)));
        assert!(page.wake_lock_held(), "threads={threads}");
        assert!(!page.pointer_visible(), "threads={threads}");
    }
}
