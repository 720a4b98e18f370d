//! Number constructor and Number.prototype

use super::{BuiltinType, Prototypes, arg, register_constructor, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::ObjectRef;
use crate::prelude::*;
use crate::value::{AvmValue, format_number};

pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    let proto = &prototypes.number;
    register_method(proto, prototypes, "toString", number_to_string);
    register_method(proto, prototypes, "valueOf", number_value_of);
    let constructor = register_constructor(
        globals,
        prototypes,
        proto,
        BuiltinType::Number,
        "Number",
        number_constructor,
    );

    constructor.define_hidden("MAX_VALUE", AvmValue::Number(f64::MAX));
    constructor.define_hidden("MIN_VALUE", AvmValue::Number(5e-324));
    constructor.define_hidden("NaN", AvmValue::Number(f64::NAN));
    constructor.define_hidden("POSITIVE_INFINITY", AvmValue::Number(f64::INFINITY));
    constructor.define_hidden("NEGATIVE_INFINITY", AvmValue::Number(f64::NEG_INFINITY));
}

/// `Number(value)`; no argument gives 0
pub fn number_constructor(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let Some(value) = args.first() else {
        return Ok(AvmValue::Number(0.0));
    };
    Ok(AvmValue::Number(interp.to_number(ctx, value)?))
}

fn this_number(this: &AvmValue) -> Result<f64, AvmError> {
    match this {
        AvmValue::Number(n) => Ok(*n),
        AvmValue::Object(obj) => match obj.primitive_value() {
            Some(AvmValue::Number(n)) => Ok(n),
            _ => Err(AvmError::script("Number.prototype method called on a non-number")),
        },
        _ => Err(AvmError::script("Number.prototype method called on a non-number")),
    }
}

/// `toString(radix)`: radix 10 by default, integers only in other radixes
pub fn number_to_string(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let n = this_number(&this)?;
    let radix = match arg(args, 0) {
        AvmValue::Undefined => 10,
        value => interp.to_int32(ctx, &value)?,
    };
    if radix == 10 || !(2..=36).contains(&radix) || !n.is_finite() {
        return Ok(AvmValue::from(format_number(n)));
    }
    Ok(AvmValue::from(format_radix(n.trunc(), radix as u32)))
}

fn format_radix(n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    let mut magnitude = n.abs() as u64;
    if magnitude == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = (magnitude % u64::from(radix)) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        magnitude /= u64::from(radix);
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

pub fn number_value_of(
    _interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::Number(this_number(&this)?))
}
