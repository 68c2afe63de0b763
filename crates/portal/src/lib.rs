//! # PORTAL
//!
//! Host/application bridge for programs running inside a browser-hosted
//! sandbox. One thread owns the page (the host); the program's main loop
//! runs in the application context, on its own thread when the platform
//! has threads, or cooperatively inside the host loop when it does not.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   dispatch_async / dispatch_sync   ┌──────────────────────┐
//! │      HOST LOOP       │<───────────────────────────────────│     APPLICATION      │
//! │  page APIs, vsync,   │──── dispatch_async, HostEvent ────>│  main loop, pacer,   │
//! │  host requests       │<════ CommandChannel (bytes) ══════>│  commands / replies  │
//! └──────────────────────┘                                    └──────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! - [`shared`]: constants, platform enums, wire framing
//! - [`core`]: dispatch bridge, suspension strategies, command channel
//! - [`platform`]: probe, host environment, configuration
//! - [`pacer`], [`host`], [`app`]: the two loops and their cadence

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod app;
pub mod error;
pub mod events;
pub mod host;
pub mod pacer;
pub mod requests;
pub mod runtime;
pub mod stats;

// Re-export sub-crates
pub use portal_core as core;
pub use portal_platform as platform;
pub use portal_shared as shared;

pub use app::{spawn_application, Application, ApplicationThread, Flow, Frame, RunSummary};
pub use error::{RuntimeError, RuntimeResult};
pub use events::HostEvent;
pub use host::{HostLoop, HostLoopStats};
pub use pacer::{Cadence, FramePacer, FrameState, Schedule, VsyncClock};
pub use requests::HostRequest;
pub use runtime::{PageSnapshot, Runtime, RuntimeReport};
pub use stats::IterationStats;
