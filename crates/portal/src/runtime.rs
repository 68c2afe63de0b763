//! # Runtime
//!
//! One object per process holding the platform probe, the dispatch bridge,
//! the command channel and the pacing state shared by both contexts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (runtime, _page) = Runtime::headless(PortalConfig::from_toml_file("portal.toml")?)?;
//! let runtime = Runtime::install(runtime)?;
//!
//! runtime.channel().post_command(b"GET_STATE");
//! let summary = runtime.host_loop().run(MyApplication::default())?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use portal_core::{
    BridgeResult, ChannelStats, CommandChannel, ContextId, DiagnosticsSnapshot, ThreadBridge,
};
use portal_platform::{HeadlessHost, HostEnvironment, PlatformProbe, PortalConfig, ThreadingMode};
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeResult};
use crate::events::{host_event_channel, HostEventReceiver, HostEventSender, HOST_EVENT_CAPACITY};
use crate::host::HostLoop;
use crate::pacer::{Cadence, FramePacer, VsyncClock};
use crate::requests::HostRequest;

static INSTALLED: OnceLock<Arc<Runtime>> = OnceLock::new();

/// Page state captured when the runtime was created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSnapshot {
    /// The page was hidden.
    pub window_hidden: bool,
    /// Canvas size in pixels.
    pub canvas_size: (u32, u32),
}

/// Counters from every part of the runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeReport {
    /// Bridge and pacing counters.
    pub diagnostics: DiagnosticsSnapshot,
    /// Command channel counters.
    pub channel: ChannelStats,
}

/// Process-wide bridge between the host and application contexts.
pub struct Runtime {
    config: PortalConfig,
    probe: PlatformProbe,
    bridge: Arc<ThreadBridge>,
    channel: Arc<CommandChannel>,
    cadence: Arc<Cadence>,
    clock: Arc<VsyncClock>,
    host_events: HostEventSender,
    app_events: HostEventReceiver,
    initial_page: PageSnapshot,
    running: AtomicBool,
}

impl Runtime {
    /// Builds a runtime on the calling thread, which becomes the host.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Platform`] if `config` fails validation.
    pub fn new(
        config: PortalConfig,
        environment: Arc<dyn HostEnvironment>,
    ) -> RuntimeResult<Arc<Self>> {
        config.validate()?;

        let probe = PlatformProbe::new(environment, config.platform.min_sleep_ms);
        let bridge = Arc::new(ThreadBridge::new(probe.strategy()));
        let channel = Arc::new(CommandChannel::new(config.channel_limits()));
        let cadence = Arc::new(Cadence::new(
            config.pacing.initial_interval,
            config.pacing.fixed_period_ms,
        ));
        let (host_events, app_events) = host_event_channel(HOST_EVENT_CAPACITY);
        let initial_page = PageSnapshot {
            window_hidden: probe.is_window_hidden(),
            canvas_size: probe.canvas_size(),
        };

        info!(
            mode = %probe.threading_mode(),
            strategy = bridge.strategy().name(),
            refresh_hz = config.pacing.refresh_hz,
            "runtime created"
        );

        Ok(Arc::new(Self {
            config,
            probe,
            bridge,
            channel,
            cadence,
            clock: Arc::new(VsyncClock::new()),
            host_events,
            app_events,
            initial_page,
            running: AtomicBool::new(true),
        }))
    }

    /// Builds a runtime over a [`HeadlessHost`] described by `config`.
    ///
    /// The page handle is returned so the caller can simulate page events.
    ///
    /// # Errors
    ///
    /// As [`Runtime::new`].
    pub fn headless(config: PortalConfig) -> RuntimeResult<(Arc<Self>, Arc<HeadlessHost>)> {
        let page = Arc::new(HeadlessHost::new(&config.platform));
        let runtime = Self::new(config, page.clone())?;
        Ok((runtime, page))
    }

    /// Makes `runtime` the process-wide instance.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::AlreadyInstalled`] on every call after the first.
    pub fn install(runtime: Arc<Self>) -> RuntimeResult<&'static Arc<Self>> {
        INSTALLED
            .set(runtime)
            .map_err(|_| RuntimeError::AlreadyInstalled)?;
        INSTALLED.get().ok_or(RuntimeError::AlreadyInstalled)
    }

    /// The process-wide instance, if one was installed.
    #[must_use]
    pub fn installed() -> Option<&'static Arc<Self>> {
        INSTALLED.get()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Runs `f` on the host context and waits for its result.
    ///
    /// Inline when the caller already serves the host.
    ///
    /// # Errors
    ///
    /// Returns [`portal_core::BridgeError::ContextUnavailable`] if the host
    /// loop has stopped.
    pub fn run_on_host_sync<F, R>(&self, f: F) -> BridgeResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.bridge.dispatch_sync(ContextId::Host, f)
    }

    /// Queues `f` on the host context. Returns false if the host has stopped.
    pub fn run_on_host_async<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.bridge.dispatch_async(ContextId::Host, f)
    }

    /// Queues `f` on the application context. It runs at the start of the
    /// next iteration. Returns false if the application has stopped.
    pub fn run_on_application_async<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.bridge.dispatch_async(ContextId::Application, f)
    }

    /// Sends a page operation to the host. Never blocks.
    pub fn request(&self, request: HostRequest) -> bool {
        let environment = Arc::clone(self.probe.environment());
        self.run_on_host_async(move || request.apply(environment.as_ref()))
    }

    // =========================================================================
    // Page queries
    // =========================================================================

    /// Current canvas size, read on the host context.
    ///
    /// # Errors
    ///
    /// As [`Runtime::run_on_host_sync`].
    pub fn canvas_size(&self) -> BridgeResult<(u32, u32)> {
        let environment = Arc::clone(self.probe.environment());
        self.run_on_host_sync(move || environment.canvas_size())
    }

    /// Whether the page is hidden right now, read on the host context.
    ///
    /// # Errors
    ///
    /// As [`Runtime::run_on_host_sync`].
    pub fn is_window_hidden(&self) -> BridgeResult<bool> {
        let environment = Arc::clone(self.probe.environment());
        self.run_on_host_sync(move || environment.is_window_hidden())
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Creates the application's frame pacer.
    ///
    /// Call once per runtime, on the application context.
    #[must_use]
    pub fn frame_pacer(&self) -> FramePacer {
        FramePacer::new(
            self.mode(),
            Arc::clone(&self.bridge),
            Arc::clone(&self.cadence),
            Arc::clone(&self.clock),
            self.app_events.clone(),
            self.initial_page.window_hidden,
            self.initial_page.canvas_size,
        )
    }

    /// Creates the host event loop.
    #[must_use]
    pub fn host_loop(self: &Arc<Self>) -> HostLoop {
        HostLoop::new(Arc::clone(self))
    }

    /// How the application context is hosted.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> ThreadingMode {
        self.probe.threading_mode()
    }

    /// Start-up capability snapshot.
    #[must_use]
    pub const fn probe(&self) -> &PlatformProbe {
        &self.probe
    }

    /// Configuration the runtime was built from.
    #[must_use]
    pub const fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// The dispatch bridge.
    #[must_use]
    pub fn bridge(&self) -> &Arc<ThreadBridge> {
        &self.bridge
    }

    /// The command channel. The host posts commands and reads replies; the
    /// application does the reverse.
    #[must_use]
    pub fn channel(&self) -> &Arc<CommandChannel> {
        &self.channel
    }

    /// Cadence published by the application.
    #[must_use]
    pub fn cadence(&self) -> &Arc<Cadence> {
        &self.cadence
    }

    /// Vsync tick source.
    #[must_use]
    pub fn clock(&self) -> &Arc<VsyncClock> {
        &self.clock
    }

    pub(crate) fn host_events(&self) -> &HostEventSender {
        &self.host_events
    }

    pub(crate) const fn initial_page(&self) -> PageSnapshot {
        self.initial_page
    }

    /// Current counters.
    #[must_use]
    pub fn report(&self) -> RuntimeReport {
        RuntimeReport {
            diagnostics: self.bridge.diagnostics().snapshot(),
            channel: self.channel.stats(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Whether [`Runtime::shutdown`] has not been called yet.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops both contexts.
    ///
    /// Frame waits return, queued work is discarded, and every waiting
    /// synchronous caller fails with `ContextUnavailable`. Idempotent.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.clock.stop();
        let application = self.bridge.shutdown(ContextId::Application);
        let host = self.bridge.shutdown(ContextId::Host);
        debug!(application, host, "runtime shut down");
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("mode", &self.mode())
            .field("bridge", &self.bridge)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_platform::{PlatformError, PlatformSection};

    fn config(threads: bool) -> PortalConfig {
        PortalConfig {
            platform: PlatformSection {
                threads,
                min_sleep_ms: Some(1),
                allow_canvas_resize: true,
                ..PlatformSection::default()
            },
            ..PortalConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config(true);
        bad.channel.reply_capacity = 0;
        let err = Runtime::headless(bad).unwrap_err();
        assert!(matches!(err, RuntimeError::Platform(PlatformError::InvalidConfig(_))));
    }

    #[test]
    fn test_mode_follows_probe() {
        let (threaded, _) = Runtime::headless(config(true)).unwrap();
        let (cooperative, _) = Runtime::headless(config(false)).unwrap();
        assert_eq!(threaded.mode(), ThreadingMode::Threaded);
        assert_eq!(cooperative.mode(), ThreadingMode::Cooperative);
    }

    #[test]
    fn test_host_queries_inline_on_host() {
        let (runtime, page) = Runtime::headless(config(false)).unwrap();
        let _host = runtime.bridge().enter(ContextId::Host);

        assert_eq!(runtime.canvas_size().unwrap(), (800, 600));
        page.set_window_hidden(true);
        assert!(runtime.is_window_hidden().unwrap());
    }

    #[test]
    fn test_request_queued_until_host_runs() {
        let (runtime, page) = Runtime::headless(config(true)).unwrap();
        assert!(runtime.request(HostRequest::Fullscreen(true)));
        assert!(!page.is_fullscreen());

        let _host = runtime.bridge().enter(ContextId::Host);
        assert_eq!(runtime.bridge().run_pending(ContextId::Host), 1);
        assert!(page.is_fullscreen());
    }

    #[test]
    fn test_shutdown_rejects_work() {
        let (runtime, _) = Runtime::headless(config(true)).unwrap();
        runtime.shutdown();
        runtime.shutdown();

        assert!(!runtime.is_running());
        assert!(runtime.clock().is_stopped());
        assert!(!runtime.run_on_host_async(|| {}));
        assert!(!runtime.run_on_application_async(|| {}));
        assert!(runtime.canvas_size().is_err());
        assert_eq!(runtime.report().diagnostics.rejected_dispatches, 3);
    }
}
