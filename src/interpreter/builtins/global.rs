//! Global functions: isNaN, isFinite, parseInt, parseFloat

use super::{Prototypes, arg, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::ObjectRef;
use crate::prelude::*;
use crate::value::AvmValue;

pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    register_method(globals, prototypes, "isNaN", global_is_nan);
    register_method(globals, prototypes, "isFinite", global_is_finite);
    register_method(globals, prototypes, "parseInt", global_parse_int);
    register_method(globals, prototypes, "parseFloat", global_parse_float);
}

pub fn global_is_nan(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let n = interp.to_number(ctx, &arg(args, 0))?;
    Ok(AvmValue::Boolean(n.is_nan()))
}

pub fn global_is_finite(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let n = interp.to_number(ctx, &arg(args, 0))?;
    Ok(AvmValue::Boolean(n.is_finite()))
}

pub fn global_parse_int(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let s = interp.to_string(ctx, &arg(args, 0))?;
    let radix = match arg(args, 1) {
        AvmValue::Undefined => None,
        value => Some(interp.to_int32(ctx, &value)?),
    };
    Ok(AvmValue::Number(parse_int(s.as_str(), radix)))
}

pub fn global_parse_float(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let s = interp.to_string(ctx, &arg(args, 0))?;
    Ok(AvmValue::Number(parse_float(s.as_str())))
}

/// Parse the leading integer of `s`. A `0x` prefix selects radix 16 when
/// no radix is given.
fn parse_int(s: &str, radix: Option<i32>) -> f64 {
    let s = s.trim_start();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    let (radix, digits) = match (radix, hex) {
        (None | Some(0) | Some(16), Some(rest)) => (16, rest),
        (None | Some(0), None) => (10, s),
        (Some(r), _) if (2..=36).contains(&r) => (r as u32, s),
        _ => return f64::NAN,
    };

    let mut value = 0.0;
    let mut any = false;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        value = value * f64::from(radix) + f64::from(digit);
        any = true;
    }
    match (any, negative) {
        (false, _) => f64::NAN,
        (true, true) => -value,
        (true, false) => value,
    }
}

/// Parse the longest numeric prefix of `s`
fn parse_float(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s.get(end..).is_some_and(|rest| rest.starts_with("Infinity")) {
        return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }

    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };
    let int_end = digits_from(end);
    let mut number_end = int_end;
    if bytes.get(int_end) == Some(&b'.') {
        number_end = digits_from(int_end + 1);
    }
    if number_end == end || (number_end == end + 1 && bytes.get(end) == Some(&b'.')) {
        return f64::NAN;
    }
    if matches!(bytes.get(number_end), Some(b'e' | b'E')) {
        let mut exp_start = number_end + 1;
        if matches!(bytes.get(exp_start), Some(b'+' | b'-')) {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            number_end = exp_end;
        }
    }
    s.get(..number_end)
        .and_then(|prefix| prefix.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
