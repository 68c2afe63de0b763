//! # PORTAL Shared
//!
//! Common types used by both the host and the application context.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on threading primitives or host APIs.
//! If you need a lock, it belongs in `portal_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod platform;
pub mod protocol;

pub use constants::{
    DEFAULT_COMMAND_CAPACITY, DEFAULT_FIXED_PERIOD_MS, DEFAULT_MAX_MESSAGE_LEN,
    DEFAULT_REFRESH_HZ, DEFAULT_REPLY_CAPACITY, FALLBACK_MIN_SLEEP_MS, MAX_REFRESH_HZ,
};
pub use platform::{Browser, HostOs};
pub use protocol::{decode_frames, encode_frame, FrameError, FrameHeader, FRAME_HEADER_LEN};
