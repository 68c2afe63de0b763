//! # Suspension Primitives
//!
//! ## The Problem
//!
//! ```text
//! Application thread:  dispatch_sync(Host, f)  → must sleep until f ran
//! Host thread:         runs f, then signals
//!
//! Spin-waiting:        burns a core, starves the page
//! Parking:             only if the platform can wake a parked thread
//! ```
//!
//! ## The Solution: Capability-Gated Strategy
//!
//! ```text
//! async suspend available  → ParkStrategy      (condvar park, zero polling)
//! otherwise                → SleepPollStrategy (sleep ≥ timer floor, re-check)
//! ```
//!
//! The strategy is picked once at start-up and shared by every waiter.

mod completion;
mod suspend;

pub use completion::{CallOutcome, CompletionSignal};
pub use suspend::{select_strategy, ParkStrategy, SleepPollStrategy, SuspendStrategy, WakeSignal};
