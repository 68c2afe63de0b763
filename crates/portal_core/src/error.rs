//! # Bridge Error Types
//!
//! Errors returned across the host/application boundary, and the contract
//! violations that are logged and counted instead of returned.

use thiserror::Error;

use crate::bridge::ContextId;

/// Errors returned by dispatch operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The destination context's loop is no longer running.
    #[error("{0} context is not running")]
    ContextUnavailable(ContextId),

    /// A host-only thread asked to block on the application context.
    #[error("host context must not block on the application context")]
    HostMustNotBlock,
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Ways the fake-block pair can be misused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBlockMisuse {
    /// `enter_fake_block` while a fake block is already active.
    #[error("nested enter_fake_block")]
    NestedEnter,
    /// `exit_fake_block` without a matching enter.
    #[error("exit_fake_block without enter")]
    ExitWithoutEnter,
}

/// Programmer contract violations between the two contexts.
///
/// These are never surfaced to the end user. They are logged, counted in
/// [`crate::Diagnostics`], and the offending call becomes a no-op.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    /// Unmatched or nested fake-block call.
    #[error("fake block misuse: {0}")]
    FakeBlockMisuse(FakeBlockMisuse),

    /// A threaded-only operation in cooperative mode, or the reverse.
    #[error("{operation} is unavailable in {mode} mode")]
    CapabilityMismatch {
        /// Operation that was called.
        operation: &'static str,
        /// Threading mode the runtime is in.
        mode: &'static str,
    },
}
