//! # Diagnostic Counters
//!
//! Lock-free counters for the failure modes that are handled silently:
//! stale jobs, rejected dispatches, contract violations.
//! Queue overflow is counted by each [`crate::CommandQueue`] itself.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::error::ContractViolation;

/// Events tracked by [`Diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// A job submitted under an older generation was discarded.
    StaleJob,
    /// A dispatch was refused because the destination was shut down.
    RejectedDispatch,
    /// A synchronous call resolved as failed.
    FailedCall,
    /// Nested or unmatched fake-block call.
    FakeBlockMisuse,
    /// Operation called in the wrong threading mode.
    CapabilityMismatch,
}

/// Process-wide diagnostic counters.
#[derive(Debug, Default)]
pub struct Diagnostics {
    stale_jobs: AtomicU64,
    rejected_dispatches: AtomicU64,
    failed_calls: AtomicU64,
    fake_block_misuse: AtomicU64,
    capability_mismatch: AtomicU64,
}

/// Point-in-time copy of [`Diagnostics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    /// Jobs discarded because their generation had ended.
    pub stale_jobs: u64,
    /// Dispatches refused at submission.
    pub rejected_dispatches: u64,
    /// Synchronous calls that resolved as failed.
    pub failed_calls: u64,
    /// Fake-block misuse count.
    pub fake_block_misuse: u64,
    /// Capability mismatch count.
    pub capability_mismatch: u64,
}

impl Diagnostics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter for `event`.
    #[inline]
    pub fn record(&self, event: DiagnosticEvent) {
        let counter = match event {
            DiagnosticEvent::StaleJob => &self.stale_jobs,
            DiagnosticEvent::RejectedDispatch => &self.rejected_dispatches,
            DiagnosticEvent::FailedCall => &self.failed_calls,
            DiagnosticEvent::FakeBlockMisuse => &self.fake_block_misuse,
            DiagnosticEvent::CapabilityMismatch => &self.capability_mismatch,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Logs and counts a contract violation.
    pub fn report(&self, violation: ContractViolation) {
        warn!(%violation, "contract violation ignored");
        self.record(match violation {
            ContractViolation::FakeBlockMisuse(_) => DiagnosticEvent::FakeBlockMisuse,
            ContractViolation::CapabilityMismatch { .. } => DiagnosticEvent::CapabilityMismatch,
        });
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            stale_jobs: self.stale_jobs.load(Ordering::Relaxed),
            rejected_dispatches: self.rejected_dispatches.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            fake_block_misuse: self.fake_block_misuse.load(Ordering::Relaxed),
            capability_mismatch: self.capability_mismatch.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FakeBlockMisuse;

    #[test]
    fn test_record_and_snapshot() {
        let diag = Diagnostics::new();
        diag.record(DiagnosticEvent::StaleJob);
        diag.record(DiagnosticEvent::StaleJob);
        diag.record(DiagnosticEvent::RejectedDispatch);

        let snap = diag.snapshot();
        assert_eq!(snap.stale_jobs, 2);
        assert_eq!(snap.rejected_dispatches, 1);
        assert_eq!(snap.failed_calls, 0);
    }

    #[test]
    fn test_report_routes_violations() {
        let diag = Diagnostics::new();
        diag.report(ContractViolation::FakeBlockMisuse(FakeBlockMisuse::ExitWithoutEnter));
        diag.report(ContractViolation::CapabilityMismatch {
            operation: "enter_fake_block",
            mode: "threaded",
        });

        let snap = diag.snapshot();
        assert_eq!(snap.fake_block_misuse, 1);
        assert_eq!(snap.capability_mismatch, 1);
    }
}
