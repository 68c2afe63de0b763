//! Execution context identity.
//!
//! A thread *serves* a context while it holds a [`ContextGuard`] for it.
//! In cooperative mode the host thread serves both contexts at once.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

/// The two execution contexts the bridge knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextId {
    /// The UI-owning thread. Only it may touch page APIs.
    Host,
    /// The thread (or cooperative task) running the main loop.
    Application,
}

impl ContextId {
    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Self::Host => 0b01,
            Self::Application => 0b10,
        }
    }

    /// Stable lowercase name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Application => "application",
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

thread_local! {
    /// (bridge id, served context bits), innermost last.
    static SERVED: RefCell<Vec<(u64, u8)>> = const { RefCell::new(Vec::new()) };
}

/// Returns true if the calling thread currently serves `context` for `bridge_id`.
pub(crate) fn serves(bridge_id: u64, context: ContextId) -> bool {
    SERVED.with(|served| {
        served
            .borrow()
            .iter()
            .any(|&(id, bits)| id == bridge_id && bits & context.bit() != 0)
    })
}

/// Marks the current thread as serving a context until dropped.
///
/// Guards nest; dropping restores the previous state. The guard is tied to
/// the thread that created it and cannot be sent elsewhere.
#[must_use = "the thread stops serving the context when the guard is dropped"]
pub struct ContextGuard {
    bridge_id: u64,
    // Thread-bound: the registration lives in this thread's local storage.
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    pub(crate) fn enter(bridge_id: u64, context: ContextId) -> Self {
        SERVED.with(|served| served.borrow_mut().push((bridge_id, context.bit())));
        Self {
            bridge_id,
            _not_send: PhantomData,
        }
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard")
            .field("bridge_id", &self.bridge_id)
            .finish()
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        SERVED.with(|served| {
            let mut served = served.borrow_mut();
            if let Some(pos) = served.iter().rposition(|&(id, _)| id == self.bridge_id) {
                served.remove(pos);
            }
        });
    }
}
