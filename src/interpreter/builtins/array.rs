//! Array constructor and Array.prototype

use super::{BuiltinType, Prototypes, arg, register_constructor, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::{ExoticObject, ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::value::{AvmString, AvmValue, CheapClone, to_integer};

/// Longest array `new Array(n)` may preallocate
const MAX_ARRAY_LENGTH: f64 = 16_777_216.0;

pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    let proto = &prototypes.array;
    register_method(proto, prototypes, "push", array_push);
    register_method(proto, prototypes, "pop", array_pop);
    register_method(proto, prototypes, "shift", array_shift);
    register_method(proto, prototypes, "unshift", array_unshift);
    register_method(proto, prototypes, "join", array_join);
    register_method(proto, prototypes, "toString", array_to_string);
    register_method(proto, prototypes, "concat", array_concat);
    register_method(proto, prototypes, "slice", array_slice);
    register_method(proto, prototypes, "splice", array_splice);
    register_method(proto, prototypes, "reverse", array_reverse);
    register_constructor(
        globals,
        prototypes,
        proto,
        BuiltinType::Array,
        "Array",
        array_constructor,
    );
}

/// `new Array(...)`: a single numeric argument is a length, anything else
/// becomes the elements
pub fn construct(ctx: &ExecutionContext, args: &[AvmValue]) -> Result<AvmValue, AvmError> {
    let elements = match args {
        [AvmValue::Number(n)] => {
            if *n < 0.0 || n.fract() != 0.0 || *n > MAX_ARRAY_LENGTH {
                return Err(AvmError::script(format!("Invalid array length: {}", n)));
            }
            vec![AvmValue::Undefined; *n as usize]
        }
        _ => args.to_vec(),
    };
    Ok(AvmValue::Object(ScriptObject::new_array(
        Some(ctx.prototypes().array.cheap_clone()),
        elements,
    )))
}

pub fn array_constructor(
    _interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    construct(ctx, args)
}

fn this_array(this: &AvmValue) -> Result<&ScriptObject, AvmError> {
    this.as_object()
        .and_then(|obj| obj.as_script_object())
        .filter(|obj| matches!(obj.exotic(), ExoticObject::Array(_)))
        .ok_or_else(|| AvmError::script("Array.prototype method called on a non-array"))
}

fn new_array(ctx: &ExecutionContext, elements: Vec<AvmValue>) -> AvmValue {
    AvmValue::Object(ScriptObject::new_array(
        Some(ctx.prototypes().array.cheap_clone()),
        elements,
    ))
}

/// Resolve a relative index (negative counts from the end) into `0..=len`
fn relative_index(n: f64, len: usize) -> usize {
    let n = to_integer(n);
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

pub fn array_push(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let array = this_array(&this)?;
    let mut len = 0;
    for value in args {
        len = array.array_push(value.clone()).unwrap_or(len);
    }
    if args.is_empty() {
        len = array.array_elements().map_or(0, |e| e.len());
    }
    Ok(AvmValue::Number(len as f64))
}

pub fn array_pop(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(this_array(&this)?.array_pop().unwrap_or_default())
}

pub fn array_shift(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let array = this_array(&this)?;
    let mut elements = array.array_elements().unwrap_or_default();
    if elements.is_empty() {
        return Ok(AvmValue::Undefined);
    }
    let first = elements.remove(0);
    array.set_array_elements(elements);
    Ok(first)
}

pub fn array_unshift(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let array = this_array(&this)?;
    let mut elements = args.to_vec();
    elements.extend(array.array_elements().unwrap_or_default());
    let len = elements.len();
    array.set_array_elements(elements);
    Ok(AvmValue::Number(len as f64))
}

pub fn array_join(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let separator = match arg(args, 0) {
        AvmValue::Undefined => AvmString::from(","),
        value => interp.to_string(ctx, &value)?,
    };
    join(interp, ctx, &this, separator.as_str())
}

pub fn array_to_string(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    join(interp, ctx, &this, ",")
}

fn join(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: &AvmValue,
    separator: &str,
) -> Result<AvmValue, AvmError> {
    let elements = this_array(this)?.array_elements().unwrap_or_default();
    let mut out = String::new();
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(interp.to_string(ctx, element)?.as_str());
    }
    Ok(AvmValue::from(out))
}

/// `concat(...)`: array arguments are spread one level
pub fn array_concat(
    _interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let mut elements = this_array(&this)?.array_elements().unwrap_or_default();
    for value in args {
        let spread = value
            .as_object()
            .and_then(|obj| obj.as_script_object())
            .and_then(ScriptObject::array_elements);
        match spread {
            Some(items) => elements.extend(items),
            None => elements.push(value.clone()),
        }
    }
    Ok(new_array(ctx, elements))
}

pub fn array_slice(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let elements = this_array(&this)?.array_elements().unwrap_or_default();
    let len = elements.len();
    let start = relative_index(interp.to_number(ctx, &arg(args, 0))?, len);
    let end = match arg(args, 1) {
        AvmValue::Undefined => len,
        value => relative_index(interp.to_number(ctx, &value)?, len),
    };
    let slice = elements.get(start..end.max(start)).unwrap_or_default();
    Ok(new_array(ctx, slice.to_vec()))
}

/// `splice(start, deleteCount, ...items)`; returns the removed elements
pub fn array_splice(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let array = this_array(&this)?;
    let mut elements = array.array_elements().unwrap_or_default();
    let len = elements.len();
    let start = relative_index(interp.to_number(ctx, &arg(args, 0))?, len);
    let delete_count = match args.get(1) {
        None => len - start,
        Some(value) => {
            let n = to_integer(interp.to_number(ctx, value)?).max(0.0);
            (n as usize).min(len - start)
        }
    };
    let inserted = args.get(2..).unwrap_or_default().iter().cloned();
    let removed: Vec<AvmValue> = elements.splice(start..start + delete_count, inserted).collect();
    array.set_array_elements(elements);
    Ok(new_array(ctx, removed))
}

pub fn array_reverse(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let array = this_array(&this)?;
    let mut elements = array.array_elements().unwrap_or_default();
    elements.reverse();
    array.set_array_elements(elements);
    Ok(this)
}
