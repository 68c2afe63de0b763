//! # Bridge Constants
//!
//! Defaults used when a configuration file leaves a value out.

// =============================================================================
// COMMAND CHANNEL
// =============================================================================

/// Default number of unread commands (host → application) kept before eviction.
pub const DEFAULT_COMMAND_CAPACITY: usize = 64;

/// Default number of unread replies (application → host) kept before eviction.
pub const DEFAULT_REPLY_CAPACITY: usize = 64;

/// Default upper bound for a single message read into a caller buffer.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 64 * 1024;

// =============================================================================
// PACING
// =============================================================================

/// Display refresh rate assumed when the host does not report one.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Highest refresh rate accepted from configuration.
pub const MAX_REFRESH_HZ: u32 = 1000;

/// Period of the fixed cadence used when vsync pacing is off.
pub const DEFAULT_FIXED_PERIOD_MS: u32 = 0;

/// Timer floor assumed if calibration cannot produce a measurement.
///
/// Browsers clamp nested `setTimeout` to about this value.
pub const FALLBACK_MIN_SLEEP_MS: u32 = 5;
