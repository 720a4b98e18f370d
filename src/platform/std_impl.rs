//! Standard library implementations of platform traits.

use std::cell::Cell;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use super::{ActionTracer, RandomProvider, TimeProvider};
use crate::opcode::ActionCode;
use crate::value::AvmValue;

/// Time provider using std::time.
pub struct StdTimeProvider {
    /// Reference instant for the monotonic clock
    epoch: Instant,
}

impl StdTimeProvider {
    /// Create a new StdTimeProvider.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for StdTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for StdTimeProvider {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn monotonic_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Random provider using a simple xorshift64 PRNG.
///
/// Seeded from the current time on creation.
pub struct StdRandomProvider {
    state: u64,
}

impl StdRandomProvider {
    /// Create a new StdRandomProvider with time-based seed.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x12345678_9abcdef0);

        let seed = if seed == 0 { 0x12345678_9abcdef0 } else { seed };

        Self { state: seed }
    }

    /// Create with a specific seed (for testing).
    pub fn with_seed(seed: u64) -> Self {
        let seed = if seed == 0 { 1 } else { seed };
        Self { state: seed }
    }
}

impl Default for StdRandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomProvider for StdRandomProvider {
    fn random(&mut self) -> f64 {
        // xorshift64
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;

        // Upper 53 bits give a uniform double in [0, 1)
        let mantissa = x >> 11;
        (mantissa as f64) / ((1u64 << 53) as f64)
    }
}

/// Tracer that writes every action through `tracing` at TRACE level.
///
/// Output mirrors the classic player trace format:
/// `12: ActionPush(96), stack=1,x`
#[derive(Default)]
pub struct LogTracer {
    indentation: Cell<usize>,
}

impl LogTracer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionTracer for LogTracer {
    fn print(&self, position: usize, action_code: u8, stack: &[AvmValue]) {
        let stack_dump = stack
            .iter()
            .map(|item| match item {
                AvmValue::Object(obj) => format!("[{:?}]", obj.kind()),
                other => format!("{:?}", other),
            })
            .collect::<Vec<_>>()
            .join(",");
        let name = ActionCode::from_u8(action_code).map_or("Unknown", ActionCode::name);
        tracing::trace!(
            target: "asrun::actions",
            "{}{}: {}({:x}), stack={}",
            "..".repeat(self.indentation.get()),
            position,
            name,
            action_code,
            stack_dump
        );
    }

    fn indent(&self) {
        self.indentation.set(self.indentation.get() + 1);
    }

    fn unindent(&self) {
        self.indentation.set(self.indentation.get().saturating_sub(1));
    }

    fn message(&self, message: &str) {
        tracing::trace!(target: "asrun::actions", "------- {}", message);
    }
}
