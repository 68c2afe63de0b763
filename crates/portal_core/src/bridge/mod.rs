//! # Thread Bridge
//!
//! Cross-context function dispatch between the host and the application.
//!
//! ## Architecture
//!
//! ```text
//!   Application ──dispatch_sync(Host)──┐          ┌── run_pending(Host) ── Host loop
//!   Application ──dispatch_async(Host)─┼─> [host queue] ─┘
//!
//!   Host ─────dispatch_async(Application)──> [application queue] ──> run_pending(Application)
//! ```
//!
//! Each queue carries an open flag and a generation counter. Shutting a
//! context down closes its queue, bumps the generation and fails every call
//! still waiting in it, so no caller can hang on a dead loop.

mod context;
mod job;
mod queue;
mod thread_bridge;

pub use context::{ContextGuard, ContextId};
pub use job::{Job, PendingCall};
pub use thread_bridge::ThreadBridge;
