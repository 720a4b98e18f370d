//! Interpreter for action bytecode
//!
//! The [`Interpreter`] owns the host services (clock, randomness, tracing,
//! telemetry) and drives execution contexts. All per-program state lives in
//! the [`ExecutionContext`] passed to every entry point.

// Built-in constructors and prototype methods
pub mod builtins;

pub mod closure;
mod coerce;
mod dispatch;
mod exception;
pub mod frame;
mod variables;

use crate::context::{ExecutionContext, PendingScript};
use crate::error::{AvmError, CriticalKind};
use crate::object::ObjectRef;
use crate::platform::{
    ActionTracer, NullTelemetry, NullTracer, RandomProvider, StdRandomProvider, StdTimeProvider,
    TelemetrySink, TimeProvider,
};
use crate::prelude::*;
use crate::reader::ActionBlock;
use crate::value::{AvmValue, CheapClone};

pub use frame::{Completion, ConstantPool, RegisterFile};

/// The action bytecode interpreter
pub struct Interpreter {
    /// Context of the innermost running invocation
    current: Option<Rc<ExecutionContext>>,

    /// Time provider for GetTime, dates and hang deadlines
    time: Box<dyn TimeProvider>,

    /// Random provider for RandomNumber and Math.random
    random: Box<dyn RandomProvider>,

    /// Per-action trace sink
    tracer: Box<dyn ActionTracer>,

    /// Receiver of recovered-error telemetry
    telemetry: Box<dyn TelemetrySink>,
}

impl Interpreter {
    /// Create an interpreter with std-backed clock and randomness and no
    /// tracing or telemetry.
    pub fn new() -> Self {
        Self {
            current: None,
            time: Box::new(StdTimeProvider::new()),
            random: Box::new(StdRandomProvider::new()),
            tracer: Box::new(NullTracer),
            telemetry: Box::new(NullTelemetry),
        }
    }

    pub fn with_time_provider(mut self, time: Box<dyn TimeProvider>) -> Self {
        self.time = time;
        self
    }

    pub fn with_random_provider(mut self, random: Box<dyn RandomProvider>) -> Self {
        self.random = random;
        self
    }

    pub fn with_tracer(mut self, tracer: Box<dyn ActionTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Context of the invocation currently on top of the call stack
    pub fn current_context(&self) -> Option<Rc<ExecutionContext>> {
        self.current.clone()
    }

    /// Current wall-clock time in milliseconds since the Unix epoch
    pub fn now_millis(&self) -> i64 {
        self.time.now_millis()
    }

    /// Next pseudo-random number in [0, 1)
    pub fn next_random(&mut self) -> f64 {
        self.random.random()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Entry points
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run a top-level action block with `scope` (usually a movie clip) as
    /// the innermost scope and default target.
    ///
    /// Does nothing once the context has been disabled by a guard.
    pub fn execute_actions(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        block: ActionBlock,
        scope: ObjectRef,
    ) -> Result<(), AvmError> {
        if ctx.is_execution_prohibited() {
            return Ok(());
        }

        let scope_chain = ctx.initial_scope().push(scope.cheap_clone());
        let now = self.time.monotonic_millis();
        ctx.timer_origin(now);

        self.with_context(ctx, |interp| {
            let saved_active = ctx.is_active();
            ctx.set_active(true);
            ctx.set_abort_execution_at(now.saturating_add(ctx.config().hang_timeout_ms));
            ctx.set_errors_ignored(0);
            ctx.set_default_target(Some(scope.cheap_clone()));
            ctx.globals().set("this", AvmValue::Object(scope));

            tracing::debug!(version = ctx.version(), bytes = block.len(), "executing actions");
            interp.tracer.message("ActionScript Execution Starts");
            interp.tracer.indent();

            let mut registers = RegisterFile::new();
            let result = interp.interpret_actions(
                ctx,
                block,
                scope_chain,
                ConstantPool::empty(),
                &mut registers,
            );

            ctx.set_active(saved_active);
            interp.tracer.unindent();
            interp.tracer.message("ActionScript Execution Stops");
            result.map(|_| ())
        })
    }

    /// Run `block` now, or hold it in the deferred queue while the context
    /// still defers script execution.
    pub fn queue_actions(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        block: ActionBlock,
        scope: ObjectRef,
    ) -> Result<(), AvmError> {
        if !ctx.defers_script_execution() {
            return self.execute_actions(ctx, block, scope);
        }
        ctx.push_pending(PendingScript { block, scope });
        Ok(())
    }

    /// Drain the deferred queue in FIFO order and stop deferring.
    ///
    /// Every queued script runs even if an earlier one fails; the first
    /// failure is returned.
    pub fn flush_pending_scripts(&mut self, ctx: &Rc<ExecutionContext>) -> Result<(), AvmError> {
        tracing::debug!(pending = ctx.pending_script_count(), "flushing deferred scripts");
        let mut first_error = None;
        while let Some(script) = ctx.pop_pending() {
            if let Err(err) = self.execute_actions(ctx, script.block, script.scope) {
                first_error.get_or_insert(err);
            }
        }
        ctx.stop_deferring();
        first_error.map_or(Ok(()), Err)
    }

    /// Invoke a script value from the host (event handlers and the like).
    ///
    /// Non-callable values yield `undefined`, as does any call on a
    /// disabled context.
    pub fn call_function(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        callee: &AvmValue,
        this: AvmValue,
        args: &[AvmValue],
    ) -> Result<AvmValue, AvmError> {
        if ctx.is_execution_prohibited() {
            return Ok(AvmValue::Undefined);
        }
        let Some(function) = callee.as_object().filter(|f| f.is_callable()) else {
            return Ok(AvmValue::Undefined);
        };
        let function = function.cheap_clone();
        self.with_context(ctx, |interp| function.call(interp, this, args))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Context switching & guards
    // ═══════════════════════════════════════════════════════════════════════════

    /// Make `ctx` current for the duration of `f`, restoring the previous
    /// context however `f` exits.
    pub(crate) fn with_context<R>(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let saved = self.current.replace(ctx.cheap_clone());
        let result = f(self);
        self.current = saved;
        result
    }

    /// Disable `ctx` for good and build the error that unwinds to the host
    pub(crate) fn raise_critical(&self, ctx: &ExecutionContext, kind: CriticalKind) -> AvmError {
        tracing::error!(error = %kind, "disabling script execution");
        ctx.prohibit_execution();
        AvmError::critical(kind)
    }

    pub(crate) fn monotonic_millis(&self) -> u64 {
        self.time.monotonic_millis()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
