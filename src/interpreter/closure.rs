//! Script-defined functions
//!
//! A [`Closure`] pairs a function body with the scope chain it was defined
//! in. Invocation always chains the activation onto that captured chain,
//! never onto the caller's.

use super::Interpreter;
use super::dispatch::take_body;
use super::frame::{ActionFrame, Completion, ConstantPool, RegisterFile};
use crate::context::ExecutionContext;
use crate::error::{AvmError, CriticalKind};
use crate::object::{AvmObject, FunctionKind, ObjectKind, ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::reader::ActionBlock;
use crate::scope::ScopeChain;
use crate::value::{AvmString, AvmValue, CheapClone};

/// A declared parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: AvmString,
    /// Register the argument is stored in instead of a scope property
    pub register: Option<u8>,
}

/// Well-known values DefineFunction2 can preload into registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preload {
    This,
    Arguments,
    Super,
    Root,
    Parent,
    Global,
}

/// DefineFunction2 flag bits
mod flags {
    pub const PRELOAD_THIS: u16 = 0x0001;
    pub const SUPPRESS_THIS: u16 = 0x0002;
    pub const PRELOAD_ARGUMENTS: u16 = 0x0004;
    pub const SUPPRESS_ARGUMENTS: u16 = 0x0008;
    pub const PRELOAD_SUPER: u16 = 0x0010;
    pub const SUPPRESS_SUPER: u16 = 0x0020;
    pub const PRELOAD_ROOT: u16 = 0x0040;
    pub const PRELOAD_PARENT: u16 = 0x0080;
    pub const PRELOAD_GLOBAL: u16 = 0x0100;
}

/// Preloads in register order, starting at register 1
const PRELOAD_ORDER: [(u16, Preload); 6] = [
    (flags::PRELOAD_THIS, Preload::This),
    (flags::PRELOAD_ARGUMENTS, Preload::Arguments),
    (flags::PRELOAD_SUPER, Preload::Super),
    (flags::PRELOAD_ROOT, Preload::Root),
    (flags::PRELOAD_PARENT, Preload::Parent),
    (flags::PRELOAD_GLOBAL, Preload::Global),
];

/// A function defined by DefineFunction or DefineFunction2
pub struct Closure {
    name: Option<AvmString>,
    params: Vec<Param>,
    /// (register, value) pairs filled before the body runs
    preloads: Vec<(u8, Preload)>,
    flags: u16,
    register_count: u8,
    body: ActionBlock,
    /// Scope chain at the point of definition
    scope: ScopeChain,
    /// Constant pool in effect at the point of definition
    constant_pool: ConstantPool,
    context: Weak<ExecutionContext>,
    /// Timeline target the body runs against
    definition_target: Option<ObjectRef>,
    /// Class whose base `super` refers to; the function itself until a
    /// class prototype adopts it
    owner_class: RefCell<Option<Weak<dyn AvmObject>>>,
    self_ref: Weak<ScriptObject>,
}

impl Closure {
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(AvmString::as_str)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn preloads(&self) -> &[(u8, Preload)] {
        &self.preloads
    }

    pub fn set_owner_class(&self, class: &ObjectRef) {
        *self.owner_class.borrow_mut() = Some(Rc::downgrade(class));
    }

    pub fn owner_class(&self) -> Option<ObjectRef> {
        let owner = self.owner_class.borrow().as_ref().and_then(Weak::upgrade);
        owner.or_else(|| self.self_ref.upgrade().map(|f| f as ObjectRef))
    }

    fn suppresses(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    /// Call the function with `this` and `args`
    pub fn invoke(
        &self,
        interp: &mut Interpreter,
        this: AvmValue,
        args: &[AvmValue],
    ) -> Result<AvmValue, AvmError> {
        let ctx = self
            .context
            .upgrade()
            .ok_or_else(|| AvmError::script("function outlived its execution context"))?;

        let activation: ObjectRef = ScriptObject::new_plain(None);
        let arguments: ObjectRef = ScriptObject::new_array(
            Some(ctx.prototypes().array.cheap_clone()),
            args.to_vec(),
        );
        if !self.suppresses(flags::SUPPRESS_THIS) {
            activation.set("this", this.clone());
        }
        if !self.suppresses(flags::SUPPRESS_ARGUMENTS) {
            activation.set("arguments", AvmValue::Object(arguments.cheap_clone()));
        }
        if !self.suppresses(flags::SUPPRESS_SUPER) {
            activation.set("super", AvmValue::Super);
        }
        activation.set(
            "__class",
            self.owner_class().map(AvmValue::Object).unwrap_or_default(),
        );

        let mut registers = RegisterFile::with_capacity(self.register_count);
        for (index, param) in self.params.iter().enumerate() {
            let value = args.get(index).cloned().unwrap_or_default();
            match param.register {
                Some(register) => registers.set(register, value),
                None => activation.set(param.name.as_str(), value),
            }
        }
        for &(register, preload) in &self.preloads {
            let value = match preload {
                Preload::This => this.clone(),
                Preload::Arguments => AvmValue::Object(arguments.cheap_clone()),
                Preload::Super => AvmValue::Super,
                Preload::Root => ctx.root().map(AvmValue::Object).unwrap_or_default(),
                Preload::Parent => self.scope.scope().get("_parent").unwrap_or_default(),
                Preload::Global => AvmValue::Object(ctx.globals().cheap_clone()),
            };
            registers.set(register, value);
        }

        let scope = self.scope.push(activation);
        interp.with_context(&ctx, |interp| self.run(interp, &ctx, scope, &mut registers))
    }

    /// Enter the body with the guards applied, restoring the context state
    /// on every exit
    fn run(
        &self,
        interp: &mut Interpreter,
        ctx: &Rc<ExecutionContext>,
        scope: ScopeChain,
        registers: &mut RegisterFile,
    ) -> Result<AvmValue, AvmError> {
        let saved_active = ctx.is_active();
        if !saved_active {
            let deadline = interp
                .monotonic_millis()
                .saturating_add(ctx.config().hang_timeout_ms);
            ctx.set_abort_execution_at(deadline);
            ctx.set_errors_ignored(0);
            ctx.set_active(true);
        }
        let saved_target = ctx.default_target();
        ctx.set_default_target(self.definition_target.clone());
        interp.tracer.indent();

        let depth = ctx.stack_depth() + 1;
        ctx.set_stack_depth(depth);
        let result = if depth >= ctx.config().max_stack_depth {
            Err(interp.raise_critical(ctx, CriticalKind::RecursionLimit))
        } else {
            interp.interpret_actions(
                ctx,
                self.body.cheap_clone(),
                scope,
                self.constant_pool.cheap_clone(),
                registers,
            )
        };

        ctx.set_stack_depth(depth - 1);
        ctx.set_active(saved_active);
        interp.tracer.unindent();
        ctx.set_default_target(saved_target);

        match result? {
            Completion::Return(value) => Ok(value),
            Completion::Normal => Ok(AvmValue::Undefined),
        }
    }
}

impl Interpreter {
    /// DefineFunction / DefineFunction2: decode the header, take the body
    /// that follows the action, and bind the function by name or push it.
    pub(super) fn define_function(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        extended: bool,
    ) -> Result<(), AvmError> {
        let name = frame.reader.read_string()?;
        let param_count = frame.reader.read_u16()?;
        let (register_count, flags) = if extended {
            (frame.reader.read_u8()?, frame.reader.read_u16()?)
        } else {
            (0, 0)
        };

        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            let register = if extended {
                Some(frame.reader.read_u8()?).filter(|&r| r != 0)
            } else {
                None
            };
            let name = frame.reader.read_string()?;
            params.push(Param { name, register });
        }
        let code_size = frame.reader.read_u16()?;
        let body = take_body(frame, code_size as usize)?;

        let preloads = PRELOAD_ORDER
            .iter()
            .filter(|(flag, _)| flags & flag != 0)
            .zip(1u8..)
            .map(|(&(_, preload), register)| (register, preload))
            .collect();

        let scope_object = frame.scope_object();
        let definition_target = if scope_object.kind() == ObjectKind::MovieClip {
            Some(scope_object.cheap_clone())
        } else {
            ctx.default_target()
        };

        let closure = ClosureParts {
            name: (!name.is_empty()).then(|| name.cheap_clone()),
            params,
            preloads,
            flags,
            register_count,
            body,
            scope: frame.scope.cheap_clone(),
            constant_pool: frame.constant_pool.cheap_clone(),
            definition_target,
        };
        let function = create_function(ctx, closure);

        tracing::trace!(name = %name, extended, "defined function");
        if name.is_empty() {
            frame.push(function);
        } else {
            frame.scope_object().set(name.as_str(), AvmValue::Object(function));
        }
        Ok(())
    }
}

/// Everything a closure needs except the handles tied to its function object
struct ClosureParts {
    name: Option<AvmString>,
    params: Vec<Param>,
    preloads: Vec<(u8, Preload)>,
    flags: u16,
    register_count: u8,
    body: ActionBlock,
    scope: ScopeChain,
    constant_pool: ConstantPool,
    definition_target: Option<ObjectRef>,
}

/// Wrap a closure in a function object with its own `prototype`
fn create_function(ctx: &Rc<ExecutionContext>, parts: ClosureParts) -> ObjectRef {
    let function: ObjectRef = ScriptObject::new_function_cyclic(
        Some(ctx.prototypes().function.cheap_clone()),
        |self_ref| {
            FunctionKind::Closure(Closure {
                name: parts.name,
                params: parts.params,
                preloads: parts.preloads,
                flags: parts.flags,
                register_count: parts.register_count,
                body: parts.body,
                scope: parts.scope,
                constant_pool: parts.constant_pool,
                context: Rc::downgrade(ctx),
                definition_target: parts.definition_target,
                owner_class: RefCell::new(None),
                self_ref: self_ref.clone(),
            })
        },
    );
    let prototype: ObjectRef =
        ScriptObject::new_plain(Some(ctx.prototypes().object.cheap_clone()));
    prototype.define_hidden("constructor", AvmValue::Object(function.cheap_clone()));
    function.define_hidden("prototype", AvmValue::Object(prototype));
    function
}
