//! Integration tests for frame pacing in both threading modes.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use portal::platform::{PlatformSection, PortalConfig, ThreadingMode};
use portal::{Application, Flow, Frame, Runtime, Schedule};

fn config(threads: bool, async_suspend: bool, refresh_hz: u32) -> PortalConfig {
    let mut config = PortalConfig {
        platform: PlatformSection {
            threads,
            async_suspend,
            min_sleep_ms: Some(1),
            ..PlatformSection::default()
        },
        ..PortalConfig::default()
    };
    config.pacing.refresh_hz = refresh_hz;
    config
}

const CAPABILITY_MATRIX: [(bool, bool); 4] =
    [(true, true), (true, false), (false, true), (false, false)];

#[test]
fn test_fake_block_enter_exit_returns_within_interval() {
    const MS: u32 = 50;

    for (threads, async_suspend) in CAPABILITY_MATRIX {
        let (runtime, _) = Runtime::headless(config(threads, async_suspend, 60)).unwrap();
        let mut pacer = runtime.frame_pacer();

        let start = Instant::now();
        pacer.enter_fake_block(MS);
        pacer.exit_fake_block();
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(u64::from(MS)),
            "threads={threads} async_suspend={async_suspend} took {elapsed:?}"
        );
        assert!(!pacer.state().fake_block);
        assert_eq!(runtime.cadence().fake_block(), None);
    }
}

#[test]
fn test_interval_zero_makes_wait_for_frame_immediate() {
    for async_suspend in [true, false] {
        let (runtime, _) = Runtime::headless(config(true, async_suspend, 60)).unwrap();
        let mut pacer = runtime.frame_pacer();

        // No host loop runs, so a vsync wait would never end.
        pacer.set_main_loop_interval(0);
        let start = Instant::now();
        for _ in 0..100 {
            pacer.wait_for_frame();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(runtime.cadence().schedule(), Schedule::Fixed(Duration::ZERO));
    }
}

#[test]
fn test_wait_for_frame_released_by_shutdown() {
    let (runtime, _) = Runtime::headless(config(true, true, 60)).unwrap();
    let waiter = {
        let runtime = Arc::clone(&runtime);
        thread::spawn(move || {
            let mut pacer = runtime.frame_pacer();
            pacer.wait_for_frame();
        })
    };

    thread::sleep(Duration::from_millis(10));
    runtime.shutdown();
    waiter.join().unwrap();
}

/// Records the time of every iteration and runs a scripted pacing sequence.
struct Timeline {
    stamps: Arc<Mutex<Vec<Instant>>>,
    script: fn(u64, &mut Frame<'_>),
    iterations: u64,
}

impl Application for Timeline {
    fn iterate(&mut self, frame: &mut Frame<'_>) -> Flow {
        self.stamps.lock().push(Instant::now());
        (self.script)(frame.iteration(), frame);
        if frame.iteration() + 1 >= self.iterations {
            Flow::Exit
        } else {
            Flow::Continue
        }
    }
}

/// Runs a scripted application cooperatively and returns iteration timestamps.
fn run_cooperative(script: fn(u64, &mut Frame<'_>), iterations: u64) -> Vec<Instant> {
    let (runtime, _) = Runtime::headless(config(false, true, 500)).unwrap();
    assert_eq!(runtime.mode(), ThreadingMode::Cooperative);

    let stamps = Arc::new(Mutex::new(Vec::new()));
    let summary = runtime
        .host_loop()
        .run(Timeline {
            stamps: Arc::clone(&stamps),
            script,
            iterations,
        })
        .unwrap();
    assert_eq!(summary.stats.iterations, iterations);

    let stamps = stamps.lock().clone();
    stamps
}

fn gaps(stamps: &[Instant]) -> Vec<Duration> {
    stamps.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

#[test]
fn test_fake_block_sets_reentry_cadence() {
    fn script(iteration: u64, frame: &mut Frame<'_>) {
        match iteration {
            0 => frame.pacer().enter_fake_block(30),
            3 => frame.pacer().exit_fake_block(),
            _ => {}
        }
    }

    let gaps = gaps(&run_cooperative(script, 6));

    // Iterations 1..=3 run inside the fake block.
    for gap in &gaps[..3] {
        assert!(*gap >= Duration::from_millis(25), "fake block gap {gap:?}");
    }
    // Exit is observed within one fake-block interval.
    assert!(gaps[3] < Duration::from_millis(30), "exit gap {:?}", gaps[3]);
}

#[test]
fn test_vsync_interval_spacing_cooperative() {
    fn script(iteration: u64, frame: &mut Frame<'_>) {
        if iteration == 0 {
            // 500 Hz refresh: 10 refreshes = 20 ms per iteration.
            frame.pacer().set_main_loop_interval(10);
        }
    }

    let gaps = gaps(&run_cooperative(script, 4));
    for gap in &gaps[1..] {
        assert!(*gap >= Duration::from_millis(15), "vsync gap {gap:?}");
    }
}

#[test]
fn test_hidden_page_drops_vsync_iterations() {
    struct UntilVisible;

    impl Application for UntilVisible {
        fn iterate(&mut self, frame: &mut Frame<'_>) -> Flow {
            if frame.pacer().state().window_hidden {
                Flow::Continue
            } else {
                Flow::Exit
            }
        }
    }

    for threads in [true, false] {
        let mut config = config(threads, true, 500);
        config.platform.window_hidden = true;
        let (runtime, page) = Runtime::headless(config).unwrap();

        let revealer = {
            let page = Arc::clone(&page);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                page.set_window_hidden(false);
            })
        };

        let summary = runtime.host_loop().run(UntilVisible).unwrap();
        revealer.join().unwrap();

        assert!(summary.stats.dropped > 0, "threads={threads}");
        assert_eq!(summary.stats.iterations, 1, "threads={threads}");
    }
}

#[test]
fn test_threaded_fake_block_counts_mismatch() {
    fn script(iteration: u64, frame: &mut Frame<'_>) {
        if iteration == 0 {
            frame.pacer().enter_fake_block(10);
            frame.pacer().exit_fake_block();
        }
    }

    let (runtime, _) = Runtime::headless(config(true, true, 500)).unwrap();
    let summary = runtime
        .host_loop()
        .run(Timeline {
            stamps: Arc::new(Mutex::new(Vec::new())),
            script,
            iterations: 2,
        })
        .unwrap();
    assert_eq!(summary.report.diagnostics.capability_mismatch, 2);
}

#[test]
fn test_fixed_cadence_floored_in_both_modes() {
    const WINDOW: Duration = Duration::from_millis(100);

    struct Unpaced {
        started: Option<Instant>,
    }

    impl Application for Unpaced {
        fn iterate(&mut self, frame: &mut Frame<'_>) -> Flow {
            let started = *self.started.get_or_insert_with(Instant::now);
            frame.pacer().set_main_loop_interval(0);
            if started.elapsed() >= WINDOW {
                Flow::Exit
            } else {
                Flow::Continue
            }
        }
    }

    for threads in [true, false] {
        let mut config = config(threads, true, 60);
        config.platform.min_sleep_ms = Some(4);
        let (runtime, _) = Runtime::headless(config).unwrap();

        let summary = runtime
            .host_loop()
            .run(Unpaced { started: None })
            .unwrap();

        // 100 ms at a 4 ms floor is about 25 iterations.
        assert!(
            summary.stats.iterations <= 40,
            "threads={threads} iterations={}",
            summary.stats.iterations
        );
    }
}
