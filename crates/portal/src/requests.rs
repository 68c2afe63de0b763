//! # Host Requests
//!
//! Fire-and-forget page operations the application asks the host to perform.
//! They are queued on the host context and applied there; the page may
//! refuse any of them and the outcome is not reported back.

use portal_platform::HostEnvironment;
use tracing::trace;

/// A page operation requested from the application context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostRequest {
    /// Show or hide the mouse pointer.
    PointerVisible(bool),
    /// Enter or leave fullscreen.
    Fullscreen(bool),
    /// Acquire or release the screen wake lock.
    WakeLock(bool),
    /// Resize the canvas. Ignored unless the embedder allows resizing.
    CanvasSize {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}

impl HostRequest {
    /// Applies the request to the page. Host context only.
    pub fn apply(self, environment: &dyn HostEnvironment) {
        match self {
            Self::PointerVisible(visible) => environment.set_pointer_visible(visible),
            Self::Fullscreen(fullscreen) => environment.set_fullscreen(fullscreen),
            Self::WakeLock(held) => environment.set_wake_lock(held),
            Self::CanvasSize { width, height } => {
                if !environment.set_canvas_size(width, height) {
                    trace!(width, height, "canvas resize refused by page");
                }
            }
        }
        trace!(request = ?self, "host request applied");
    }
}
