//! # Host Events
//!
//! Page notifications flowing from the host to the application.
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │  HostLoop   │─────>│  HostEvent  │─────>│ FramePacer  │
//! │  (page)     │      │   channel   │      │ (app ctx)   │
//! └─────────────┘      └─────────────┘      └─────────────┘
//! ```
//!
//! Events are queued as they happen and applied only at the start of an
//! application iteration, so state never changes mid-iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

/// Default capacity of the host event channel.
pub const HOST_EVENT_CAPACITY: usize = 64;

/// Notifications from the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// The page was hidden or shown.
    VisibilityChanged {
        /// True when the page is no longer visible.
        hidden: bool,
    },

    /// The canvas was resized by the page.
    CanvasResized {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
}

/// Creates a connected sender/receiver pair.
#[must_use]
pub fn host_event_channel(capacity: usize) -> (HostEventSender, HostEventReceiver) {
    let (sender, receiver) = bounded(capacity);
    let sender = HostEventSender {
        sender,
        saturated: Arc::new(AtomicBool::new(false)),
    };
    (sender, HostEventReceiver { receiver })
}

/// Sending half, held by the host loop.
#[derive(Clone, Debug)]
pub struct HostEventSender {
    sender: Sender<HostEvent>,
    /// Set while the channel stays full; cleared by the next accepted send.
    saturated: Arc<AtomicBool>,
}

impl HostEventSender {
    /// Queues an event without blocking.
    ///
    /// Returns false if the channel is full or the receiver is gone; the
    /// caller keeps its own state and retries on its next turn. Only the
    /// first rejection of a full stretch logs at `warn`.
    #[inline]
    pub fn send(&self, event: HostEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => {
                self.saturated.store(false, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) => {
                if self.saturated.swap(true, Ordering::Relaxed) {
                    debug!(?event, "host event channel still full");
                } else {
                    warn!(?event, "host event channel full");
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Receiving half, held by the application's frame pacer.
#[derive(Clone, Debug)]
pub struct HostEventReceiver {
    receiver: Receiver<HostEvent>,
}

impl HostEventReceiver {
    /// Removes every queued event, oldest first.
    #[inline]
    pub fn drain(&self) -> Vec<HostEvent> {
        self.receiver.try_iter().collect()
    }
}
