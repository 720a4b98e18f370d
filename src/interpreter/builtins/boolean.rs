//! Boolean constructor and Boolean.prototype

use super::{BuiltinType, Prototypes, arg, register_constructor, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::ObjectRef;
use crate::prelude::*;
use crate::value::AvmValue;

pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    let proto = &prototypes.boolean;
    register_method(proto, prototypes, "toString", boolean_to_string);
    register_method(proto, prototypes, "valueOf", boolean_value_of);
    register_constructor(
        globals,
        prototypes,
        proto,
        BuiltinType::Boolean,
        "Boolean",
        boolean_constructor,
    );
}

pub fn boolean_constructor(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::Boolean(arg(args, 0).to_boolean()))
}

fn this_boolean(this: &AvmValue) -> Result<bool, AvmError> {
    match this {
        AvmValue::Boolean(b) => Ok(*b),
        AvmValue::Object(obj) => match obj.primitive_value() {
            Some(AvmValue::Boolean(b)) => Ok(b),
            _ => Err(AvmError::script("Boolean.prototype method called on a non-boolean")),
        },
        _ => Err(AvmError::script("Boolean.prototype method called on a non-boolean")),
    }
}

pub fn boolean_to_string(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let b = this_boolean(&this)?;
    Ok(AvmValue::from(if b { "true" } else { "false" }))
}

pub fn boolean_value_of(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::Boolean(this_boolean(&this)?))
}
