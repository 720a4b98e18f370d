//! Structured exception handling and error recovery
//!
//! Try and with blocks run their bodies through nested `interpret_actions`
//! calls and inspect the `Result` that comes back; nothing unwinds
//! implicitly. Their nesting depth is bounded by the context. Script
//! errors that no try is listening for are absorbed at the dispatch
//! boundary by [`Interpreter::recover_script_error`].

use super::Interpreter;
use super::dispatch::take_body;
use super::frame::{ActionFrame, Completion, ConstantPool, RegisterFile};
use crate::context::ExecutionContext;
use crate::error::{AvmError, CriticalKind};
use crate::object::{ObjectRef, ScriptObject};
use crate::opcode::ActionCode;
use crate::platform::ErrorTelemetry;
use crate::prelude::*;
use crate::reader::ActionBlock;
use crate::scope::ScopeChain;
use crate::value::{AvmString, AvmValue, CheapClone};

/// Telemetry error type of a recovered action error
const ACTION_ERROR_TYPE: u32 = 1;

/// Where a caught value is stored
enum CatchTarget {
    Register(u8),
    Variable(AvmString),
}

/// Decoded Try action payload
struct TryBlocks {
    catch_target: CatchTarget,
    try_body: ActionBlock,
    catch_body: Option<ActionBlock>,
    finally_body: Option<ActionBlock>,
}

impl TryBlocks {
    const HAS_CATCH: u8 = 0x01;
    const HAS_FINALLY: u8 = 0x02;
    const CATCH_IN_REGISTER: u8 = 0x04;

    fn read(frame: &mut ActionFrame) -> Result<Self, AvmError> {
        let flags = frame.reader.read_u8()?;
        let try_size = frame.reader.read_u16()? as usize;
        let catch_size = frame.reader.read_u16()? as usize;
        let finally_size = frame.reader.read_u16()? as usize;
        let catch_target = if flags & Self::CATCH_IN_REGISTER != 0 {
            CatchTarget::Register(frame.reader.read_u8()?)
        } else {
            CatchTarget::Variable(frame.reader.read_string()?)
        };

        let try_body = take_body(frame, try_size)?;
        let catch_body = take_body(frame, catch_size)?;
        let finally_body = take_body(frame, finally_size)?;
        Ok(Self {
            catch_target,
            try_body,
            catch_body: (flags & Self::HAS_CATCH != 0).then_some(catch_body),
            finally_body: (flags & Self::HAS_FINALLY != 0).then_some(finally_body),
        })
    }
}

impl Interpreter {
    /// Try action: run the try body, dispatch a catchable error to the catch
    /// body, and run the finally body on every exit except a critical error.
    pub(super) fn process_try(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        registers: &mut RegisterFile,
    ) -> Result<Completion, AvmError> {
        let blocks = TryBlocks::read(frame)?;

        let saved_listening = ctx.is_try_catch_listening();
        ctx.set_try_catch_listening(true);
        let mut outcome = self.interpret_nested(
            ctx,
            blocks.try_body,
            frame.scope.cheap_clone(),
            frame.constant_pool.cheap_clone(),
            registers,
        );
        ctx.set_try_catch_listening(saved_listening);

        let caught = match (&outcome, &blocks.catch_body) {
            (Err(err), Some(_)) if err.is_catchable() => Some(err.to_catch_value()),
            _ => None,
        };
        if let (Some(caught), Some(catch_body)) = (caught, blocks.catch_body) {
            match &blocks.catch_target {
                CatchTarget::Register(index) => registers.set(*index, caught),
                CatchTarget::Variable(name) => frame.scope_object().set(name.as_str(), caught),
            }
            outcome = self.interpret_nested(
                ctx,
                catch_body,
                frame.scope.cheap_clone(),
                frame.constant_pool.cheap_clone(),
                registers,
            );
        }

        let Some(finally_body) = blocks.finally_body else {
            return outcome;
        };
        if matches!(&outcome, Err(err) if err.is_critical()) {
            return outcome;
        }
        match self.interpret_nested(
            ctx,
            finally_body,
            frame.scope.cheap_clone(),
            frame.constant_pool.cheap_clone(),
            registers,
        )? {
            // A return from finally replaces whatever the try produced
            Completion::Return(value) => Ok(Completion::Return(value)),
            Completion::Normal => outcome,
        }
    }

    /// With action: run `body` with `target` pushed onto the scope chain
    pub(super) fn process_with(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &ActionFrame,
        registers: &mut RegisterFile,
        target: AvmValue,
        body: ActionBlock,
    ) -> Result<Completion, AvmError> {
        let scope: ObjectRef = match &target {
            AvmValue::Object(obj) => obj.cheap_clone(),
            other => match self.box_primitive(ctx, other) {
                Some(boxed) => boxed,
                None => ScriptObject::new_plain(None),
            },
        };
        self.interpret_nested(
            ctx,
            body,
            frame.scope.push(scope),
            frame.constant_pool.cheap_clone(),
            registers,
        )
    }

    /// Run a With or Try body one nesting level deeper.
    ///
    /// Nesting is counted on the context across closure calls; going past
    /// `max_nesting_depth` disables the context like the recursion limit.
    fn interpret_nested(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        block: ActionBlock,
        scope: ScopeChain,
        constant_pool: ConstantPool,
        registers: &mut RegisterFile,
    ) -> Result<Completion, AvmError> {
        let depth = ctx.nesting_depth() + 1;
        if depth > ctx.config().max_nesting_depth {
            return Err(self.raise_critical(ctx, CriticalKind::NestingLimit));
        }
        ctx.set_nesting_depth(depth);
        let result = self.interpret_actions(ctx, block, scope, constant_pool, registers);
        ctx.set_nesting_depth(depth - 1);
        result
    }

    /// Apply the recovery policy to an error raised by the action at
    /// `frame.action_position`.
    ///
    /// Script errors are absorbed when errors are ignored and no try is
    /// listening: the stack is topped up with `undefined` for each value the
    /// action would have produced and execution resumes at the next action.
    /// A run of consecutive failures counts once against the error budget.
    /// Everything else is returned to the caller.
    pub(super) fn recover_script_error(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        code: u8,
        err: AvmError,
        recovering: &mut bool,
    ) -> Result<(), AvmError> {
        let action = ActionCode::from_u8(code);
        let recoverable = matches!(err, AvmError::Script { .. })
            && action.is_none_or(ActionCode::is_recoverable)
            && ctx.config().ignore_errors
            && !ctx.is_try_catch_listening();
        if !recoverable {
            return Err(err);
        }

        self.telemetry.report_error(ErrorTelemetry {
            error_type: ACTION_ERROR_TYPE,
            action_code: code,
            message: err.to_string(),
        });

        frame.reader.set_position(frame.next_position);
        for _ in 0..action.map_or(0, ActionCode::recovery_pushes) {
            frame.push(AvmValue::Undefined);
        }

        if !*recovering {
            let ignored = ctx.errors_ignored();
            ctx.set_errors_ignored(ignored.saturating_add(1));
            if ignored >= ctx.config().max_errors {
                return Err(self.raise_critical(ctx, CriticalKind::ErrorBudget));
            }
            tracing::warn!(
                action = action.map_or("Unknown", ActionCode::name),
                position = frame.action_position,
                error = %err,
                "recovered script error"
            );
            *recovering = true;
        }
        Ok(())
    }
}
