//! Object constructor and Object.prototype

use super::{BuiltinType, Prototypes, arg, register_constructor, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::{ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::value::{AvmValue, CheapClone};

pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    let proto = &prototypes.object;
    register_method(proto, prototypes, "toString", object_to_string);
    register_method(proto, prototypes, "valueOf", object_value_of);
    register_method(proto, prototypes, "hasOwnProperty", object_has_own_property);
    register_method(proto, prototypes, "isPropertyEnumerable", object_is_property_enumerable);
    register_method(proto, prototypes, "isPrototypeOf", object_is_prototype_of);
    register_constructor(
        globals,
        prototypes,
        proto,
        BuiltinType::Object,
        "Object",
        object_constructor,
    );
}

/// `Object(value)`: objects pass through, primitives are boxed, nothing
/// yields a fresh object
pub fn object_constructor(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let value = arg(args, 0);
    let obj = interp
        .to_object(ctx, &value)
        .unwrap_or_else(|| ScriptObject::new_plain(Some(ctx.prototypes().object.cheap_clone())));
    Ok(AvmValue::Object(obj))
}

pub fn object_to_string(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::from("[object Object]"))
}

pub fn object_value_of(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(this)
}

pub fn object_has_own_property(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let name = interp.to_string(ctx, &arg(args, 0))?;
    let owned = this.as_object().is_some_and(|obj| obj.has_own(name.as_str()));
    Ok(AvmValue::Boolean(owned))
}

pub fn object_is_property_enumerable(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let name = interp.to_string(ctx, &arg(args, 0))?;
    let enumerable = this
        .as_object()
        .is_some_and(|obj| obj.own_keys(true).iter().any(|key| *key == name));
    Ok(AvmValue::Boolean(enumerable))
}

pub fn object_is_prototype_of(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let (Some(proto), AvmValue::Object(obj)) = (this.as_object(), arg(args, 0)) else {
        return Ok(AvmValue::Boolean(false));
    };
    let mut current = obj.prototype();
    while let Some(candidate) = current {
        if crate::object::same_object(&candidate, proto) {
            return Ok(AvmValue::Boolean(true));
        }
        current = candidate.prototype();
    }
    Ok(AvmValue::Boolean(false))
}
