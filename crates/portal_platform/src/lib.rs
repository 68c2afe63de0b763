//! # PORTAL Platform
//!
//! Everything the bridge needs to know about where it is running.
//!
//! ## Layers
//!
//! - [`config`]: TOML configuration with validated defaults
//! - [`environment`]: the page API boundary, only ever touched on the host
//! - [`probe`]: the start-up snapshot that picks the suspension strategy
//!
//! Browser and OS classification happens in the embedding page; only the
//! enumerated result reaches this crate.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod environment;
pub mod error;
pub mod probe;

pub use config::{ChannelSection, PacingSection, PlatformSection, PortalConfig};
pub use environment::{HeadlessHost, HostEnvironment};
pub use error::{PlatformError, PlatformResult};
pub use probe::{timer_floor_ms, PlatformProbe, ThreadingMode};
