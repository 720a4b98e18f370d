//! Function constructor and Function.prototype

use super::{BuiltinType, Prototypes, arg, create_native_function, register_constructor, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::{ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::value::AvmValue;

pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    let proto = &prototypes.function;
    register_method(proto, prototypes, "call", function_call);
    register_method(proto, prototypes, "apply", function_apply);
    register_constructor(
        globals,
        prototypes,
        proto,
        BuiltinType::Function,
        "Function",
        function_constructor,
    );
}

/// `Function()` yields an empty function; source text is never compiled
pub fn function_constructor(
    _interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::Object(create_native_function(
        ctx.prototypes(),
        "anonymous",
        function_empty,
    )))
}

fn function_empty(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::Undefined)
}

fn this_function(this: &AvmValue) -> Result<ObjectRef, AvmError> {
    this.as_object()
        .filter(|f| f.is_callable())
        .cloned()
        .ok_or_else(|| AvmError::script("Function.prototype method called on a non-function"))
}

/// `fn.call(thisArg, ...args)`
pub fn function_call(
    interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let function = this_function(&this)?;
    let this_arg = arg(args, 0);
    function.call(interp, this_arg, args.get(1..).unwrap_or_default())
}

/// `fn.apply(thisArg, argsArray)`
pub fn function_apply(
    interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let function = this_function(&this)?;
    let this_arg = arg(args, 0);
    let call_args = arg(args, 1)
        .as_object()
        .and_then(|list| list.as_script_object().and_then(ScriptObject::array_elements))
        .unwrap_or_default();
    function.call(interp, this_arg, &call_args)
}
