//! # PORTAL Core
//!
//! The machinery shared by the host context (the UI-owning thread) and the
//! application context (the thread, real or cooperative, running the main loop).
//!
//! ## Architecture Rules
//!
//! 1. **The host never waits on the application** - host → application is async only
//! 2. **No unbounded queues** - command queues evict, job queues close on shutdown
//! 3. **No hangs after shutdown** - every pending call resolves, success or failure
//!
//! ## Example
//!
//! ```rust,ignore
//! use portal_core::{ContextId, ThreadBridge, sync::ParkStrategy};
//!
//! let bridge = ThreadBridge::new(Arc::new(ParkStrategy));
//! let width = bridge.dispatch_sync(ContextId::Host, || canvas_width())?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bridge;
pub mod channel;
pub mod diagnostics;
pub mod error;
pub mod sync;

pub use bridge::{ContextGuard, ContextId, Job, ThreadBridge};
pub use channel::{ChannelLimits, ChannelStats, CommandChannel, CommandQueue};
pub use diagnostics::{DiagnosticEvent, Diagnostics, DiagnosticsSnapshot};
pub use error::{BridgeError, BridgeResult, ContractViolation, FakeBlockMisuse};
pub use sync::{
    select_strategy, CallOutcome, CompletionSignal, ParkStrategy, SleepPollStrategy,
    SuspendStrategy, WakeSignal,
};
