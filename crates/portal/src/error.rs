//! # Runtime Error Types

use portal_core::{BridgeError, ContractViolation};
use portal_platform::PlatformError;
use thiserror::Error;

/// Errors raised while building or driving a [`crate::Runtime`].
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration or platform probing failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A cross-context call failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The operation does not exist in the runtime's threading mode.
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    /// [`crate::Runtime::install`] was called twice.
    #[error("a runtime is already installed in this process")]
    AlreadyInstalled,

    /// The application thread could not be started.
    #[error("failed to spawn application thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The application thread panicked.
    #[error("application thread panicked")]
    ApplicationPanicked,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
