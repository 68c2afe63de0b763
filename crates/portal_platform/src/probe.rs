//! # Platform Probe
//!
//! Capability snapshot taken once at start-up. Static facts (browser, OS,
//! DPR, threading, async suspend, timer floor) are cached; canvas size and
//! visibility are read live from the [`HostEnvironment`].

use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use portal_core::{select_strategy, SuspendStrategy};
use portal_shared::{Browser, HostOs, FALLBACK_MIN_SLEEP_MS};
use tracing::{debug, info};

use crate::environment::HostEnvironment;

/// Sleeps measured during calibration.
const CALIBRATION_SAMPLES: usize = 5;

/// Measurements above this are treated as noise (a descheduled process).
const CALIBRATION_CEILING_MS: u32 = 50;

static TIMER_FLOOR_MS: OnceLock<u32> = OnceLock::new();

/// How the application context is hosted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadingMode {
    /// The application runs on its own thread.
    Threaded,
    /// The host thread runs the application between its own work.
    Cooperative,
}

impl ThreadingMode {
    /// Lowercase mode name for logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Threaded => "threaded",
            Self::Cooperative => "cooperative",
        }
    }
}

impl std::fmt::Display for ThreadingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shortest sleep the platform honours, in whole milliseconds.
///
/// Measured on first call and cached for the life of the process.
#[must_use]
pub fn timer_floor_ms() -> u32 {
    *TIMER_FLOOR_MS.get_or_init(calibrate_timer_floor)
}

fn calibrate_timer_floor() -> u32 {
    let shortest = (0..CALIBRATION_SAMPLES)
        .map(|_| {
            let start = Instant::now();
            thread::sleep(Duration::from_millis(1));
            start.elapsed()
        })
        .min()
        .unwrap_or(Duration::ZERO);

    // Round up: a 1.2 ms sleep means the floor is 2 ms of wall time.
    let micros = shortest.as_micros();
    let floor = u32::try_from(micros.div_ceil(1000)).unwrap_or(u32::MAX);
    let floor = if floor == 0 || floor > CALIBRATION_CEILING_MS {
        FALLBACK_MIN_SLEEP_MS
    } else {
        floor
    };
    debug!(floor_ms = floor, measured_us = micros, "timer floor calibrated");
    floor
}

/// Cached platform capabilities plus live page queries.
pub struct PlatformProbe {
    environment: Arc<dyn HostEnvironment>,
    browser: Browser,
    os: HostOs,
    device_pixel_ratio: f64,
    threads: bool,
    async_suspend: bool,
    min_sleep_ms: u32,
}

impl PlatformProbe {
    /// Takes the start-up snapshot.
    ///
    /// `min_sleep_override` skips timer calibration when set.
    #[must_use]
    pub fn new(environment: Arc<dyn HostEnvironment>, min_sleep_override: Option<u32>) -> Self {
        let min_sleep_ms = min_sleep_override.map_or_else(timer_floor_ms, |ms| ms.max(1));
        let probe = Self {
            browser: environment.browser(),
            os: environment.os(),
            device_pixel_ratio: environment.device_pixel_ratio(),
            threads: environment.supports_threads(),
            async_suspend: environment.supports_async_suspend(),
            min_sleep_ms,
            environment,
        };
        info!(
            browser = ?probe.browser,
            os = ?probe.os,
            dpr = probe.device_pixel_ratio,
            mode = %probe.threading_mode(),
            async_suspend = probe.async_suspend,
            min_sleep_ms,
            "platform probed"
        );
        probe
    }

    /// Browser family.
    #[inline]
    #[must_use]
    pub const fn browser(&self) -> Browser {
        self.browser
    }

    /// Host operating system.
    #[inline]
    #[must_use]
    pub const fn os(&self) -> HostOs {
        self.os
    }

    /// Physical pixels per CSS pixel.
    #[inline]
    #[must_use]
    pub const fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Whether a real application thread is available.
    #[inline]
    #[must_use]
    pub const fn threads(&self) -> bool {
        self.threads
    }

    /// Whether blocking waits can park.
    #[inline]
    #[must_use]
    pub const fn async_suspend(&self) -> bool {
        self.async_suspend
    }

    /// Shortest useful sleep in milliseconds.
    #[inline]
    #[must_use]
    pub const fn min_sleep_ms(&self) -> u32 {
        self.min_sleep_ms
    }

    /// How the application context is hosted.
    #[must_use]
    pub const fn threading_mode(&self) -> ThreadingMode {
        if self.threads {
            ThreadingMode::Threaded
        } else {
            ThreadingMode::Cooperative
        }
    }

    /// Suspension strategy for this platform.
    #[must_use]
    pub fn strategy(&self) -> Arc<dyn SuspendStrategy> {
        select_strategy(self.async_suspend, self.min_sleep_ms)
    }

    /// Current canvas size. Host context only.
    #[must_use]
    pub fn canvas_size(&self) -> (u32, u32) {
        self.environment.canvas_size()
    }

    /// Whether the page is hidden right now. Host context only.
    #[must_use]
    pub fn is_window_hidden(&self) -> bool {
        self.environment.is_window_hidden()
    }

    /// The page behind this probe.
    #[must_use]
    pub fn environment(&self) -> &Arc<dyn HostEnvironment> {
        &self.environment
    }
}

impl std::fmt::Debug for PlatformProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformProbe")
            .field("browser", &self.browser)
            .field("os", &self.os)
            .field("device_pixel_ratio", &self.device_pixel_ratio)
            .field("threads", &self.threads)
            .field("async_suspend", &self.async_suspend)
            .field("min_sleep_ms", &self.min_sleep_ms)
            .finish_non_exhaustive()
    }
}
