//! Platform abstraction traits.
//!
//! Clock, randomness, per-action tracing and error telemetry are provided by
//! the embedder. Clock and randomness default to the std implementations;
//! tracing and telemetry default to sinks that discard everything.

mod std_impl;

pub use std_impl::{LogTracer, StdRandomProvider, StdTimeProvider};

use crate::value::AvmValue;

/// Trait for providing time-related functionality.
pub trait TimeProvider {
    /// Current time as milliseconds since the Unix epoch.
    /// Used for `new Date()`.
    fn now_millis(&self) -> i64;

    /// Milliseconds on a monotonic clock with an arbitrary origin.
    /// Used for hang deadlines and the GetTime action.
    fn monotonic_millis(&self) -> u64;
}

/// Trait for providing random number generation.
pub trait RandomProvider {
    /// Generate a random f64 in the range [0, 1).
    /// Used by the RandomNumber action.
    fn random(&mut self) -> f64;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tracing & telemetry sinks
// ═══════════════════════════════════════════════════════════════════════════════

/// Receives one event per decoded action, plus start/stop markers.
///
/// All methods are fire-and-forget; a tracer cannot influence execution.
pub trait ActionTracer {
    /// Called before an action executes. `position` is the offset of the
    /// action's payload inside its block.
    fn print(&self, position: usize, action_code: u8, stack: &[AvmValue]);

    /// A closure body was entered.
    fn indent(&self) {}

    /// A closure body was left.
    fn unindent(&self) {}

    /// Free-form marker (execution starts/stops).
    fn message(&self, _message: &str) {}
}

/// Tracer that discards everything.
pub struct NullTracer;

impl ActionTracer for NullTracer {
    fn print(&self, _position: usize, _action_code: u8, _stack: &[AvmValue]) {}
}

/// Telemetry record sent for every recovered script error
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorTelemetry {
    /// Error category; recovered action errors are always type 1
    pub error_type: u32,
    /// Action code of the failing instruction
    pub action_code: u8,
    /// Human readable error text
    pub message: String,
}

/// Receiver of error telemetry events.
pub trait TelemetrySink {
    fn report_error(&self, event: ErrorTelemetry);
}

/// Telemetry sink that discards everything.
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn report_error(&self, _event: ErrorTelemetry) {}
}
