//! # Host Environment
//!
//! The page APIs the bridge depends on, behind one trait. Only the host
//! context may call into a [`HostEnvironment`]; everything else reaches it
//! through a host dispatch.
//!
//! [`HeadlessHost`] implements the trait natively from configuration so the
//! bridge runs, and is tested, without a browser.

use parking_lot::Mutex;
use portal_shared::{Browser, HostOs};
use tracing::{debug, trace};

use crate::config::PlatformSection;

/// Page-side capabilities and state.
pub trait HostEnvironment: Send + Sync {
    /// Browser family.
    fn browser(&self) -> Browser;

    /// Host operating system.
    fn os(&self) -> HostOs;

    /// Physical pixels per CSS pixel.
    fn device_pixel_ratio(&self) -> f64;

    /// Whether a real application thread is available.
    fn supports_threads(&self) -> bool;

    /// Whether blocking waits can park instead of polling.
    fn supports_async_suspend(&self) -> bool;

    /// Current canvas size in pixels.
    fn canvas_size(&self) -> (u32, u32);

    /// Resizes the canvas if the embedder allows it.
    ///
    /// Returns false when the request was ignored.
    fn set_canvas_size(&self, width: u32, height: u32) -> bool;

    /// Whether the page is currently hidden.
    fn is_window_hidden(&self) -> bool;

    /// Shows or hides the mouse pointer over the canvas.
    fn set_pointer_visible(&self, visible: bool);

    /// Enters or leaves fullscreen. The page may refuse without a user gesture.
    fn set_fullscreen(&self, fullscreen: bool);

    /// Acquires or releases the screen wake lock.
    fn set_wake_lock(&self, held: bool);
}

#[derive(Debug)]
struct PageState {
    canvas: (u32, u32),
    hidden: bool,
    pointer_visible: bool,
    fullscreen: bool,
    wake_lock: bool,
    requests_applied: u64,
}

/// Native stand-in for a browser page.
///
/// Capabilities come from the `[platform]` section. Page state changes
/// through the same trait calls a browser would receive, plus
/// [`HeadlessHost::set_window_hidden`] to simulate visibility changes.
#[derive(Debug)]
pub struct HeadlessHost {
    browser: Browser,
    os: HostOs,
    device_pixel_ratio: f64,
    threads: bool,
    async_suspend: bool,
    allow_canvas_resize: bool,
    page: Mutex<PageState>,
}

impl HeadlessHost {
    /// Builds a page from the `[platform]` configuration section.
    #[must_use]
    pub fn new(platform: &PlatformSection) -> Self {
        Self {
            browser: platform.browser,
            os: platform.os,
            device_pixel_ratio: platform.device_pixel_ratio,
            threads: platform.threads,
            async_suspend: platform.async_suspend,
            allow_canvas_resize: platform.allow_canvas_resize,
            page: Mutex::new(PageState {
                canvas: (platform.canvas_width, platform.canvas_height),
                hidden: platform.window_hidden,
                pointer_visible: true,
                fullscreen: false,
                wake_lock: false,
                requests_applied: 0,
            }),
        }
    }

    /// Simulates the page being hidden or shown.
    pub fn set_window_hidden(&self, hidden: bool) {
        self.page.lock().hidden = hidden;
        debug!(hidden, "page visibility changed");
    }

    /// Whether the pointer is shown.
    #[must_use]
    pub fn pointer_visible(&self) -> bool {
        self.page.lock().pointer_visible
    }

    /// Whether the page is fullscreen.
    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.page.lock().fullscreen
    }

    /// Whether the wake lock is held.
    #[must_use]
    pub fn wake_lock_held(&self) -> bool {
        self.page.lock().wake_lock
    }

    /// Number of state-changing requests applied so far.
    #[must_use]
    pub fn requests_applied(&self) -> u64 {
        self.page.lock().requests_applied
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new(&PlatformSection::default())
    }
}

impl HostEnvironment for HeadlessHost {
    fn browser(&self) -> Browser {
        self.browser
    }

    fn os(&self) -> HostOs {
        self.os
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    fn supports_threads(&self) -> bool {
        self.threads
    }

    fn supports_async_suspend(&self) -> bool {
        self.async_suspend
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.page.lock().canvas
    }

    fn set_canvas_size(&self, width: u32, height: u32) -> bool {
        if !self.allow_canvas_resize {
            trace!(width, height, "canvas resize not permitted, ignored");
            return false;
        }
        let mut page = self.page.lock();
        page.canvas = (width, height);
        page.requests_applied += 1;
        true
    }

    fn is_window_hidden(&self) -> bool {
        self.page.lock().hidden
    }

    fn set_pointer_visible(&self, visible: bool) {
        let mut page = self.page.lock();
        page.pointer_visible = visible;
        page.requests_applied += 1;
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        let mut page = self.page.lock();
        page.fullscreen = fullscreen;
        page.requests_applied += 1;
    }

    fn set_wake_lock(&self, held: bool) {
        let mut page = self.page.lock();
        page.wake_lock = held;
        page.requests_applied += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_from_config() {
        let platform = PlatformSection {
            threads: false,
            browser: Browser::Firefox,
            os: HostOs::Linux,
            device_pixel_ratio: 1.5,
            ..PlatformSection::default()
        };
        let host = HeadlessHost::new(&platform);

        assert!(!host.supports_threads());
        assert!(host.supports_async_suspend());
        assert_eq!(host.browser(), Browser::Firefox);
        assert_eq!(host.os(), HostOs::Linux);
        assert!((host.device_pixel_ratio() - 1.5).abs() < f64::EPSILON);
        assert_eq!(host.canvas_size(), (800, 600));
    }

    #[test]
    fn test_canvas_resize_ignored_without_permission() {
        let host = HeadlessHost::default();
        assert!(!host.set_canvas_size(320, 240));
        assert_eq!(host.canvas_size(), (800, 600));
        assert_eq!(host.requests_applied(), 0);
    }

    #[test]
    fn test_canvas_resize_with_permission() {
        let host = HeadlessHost::new(&PlatformSection {
            allow_canvas_resize: true,
            ..PlatformSection::default()
        });
        assert!(host.set_canvas_size(320, 240));
        assert_eq!(host.canvas_size(), (320, 240));
    }

    #[test]
    fn test_page_requests() {
        let host = HeadlessHost::default();
        host.set_pointer_visible(false);
        host.set_fullscreen(true);
        host.set_wake_lock(true);

        assert!(!host.pointer_visible());
        assert!(host.is_fullscreen());
        assert!(host.wake_lock_held());
        assert_eq!(host.requests_applied(), 3);
    }

    #[test]
    fn test_visibility() {
        let host = HeadlessHost::default();
        assert!(!host.is_window_hidden());
        host.set_window_hidden(true);
        assert!(host.is_window_hidden());
    }
}
