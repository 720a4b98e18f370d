//! String constructor and String.prototype
//!
//! Indices count characters, not bytes.

use super::{BuiltinType, Prototypes, arg, register_constructor, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::{ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::value::{AvmString, AvmValue, CheapClone, to_integer, to_uint32};

pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    let proto = &prototypes.string;
    register_method(proto, prototypes, "toString", string_to_string);
    register_method(proto, prototypes, "valueOf", string_to_string);
    register_method(proto, prototypes, "charAt", string_char_at);
    register_method(proto, prototypes, "charCodeAt", string_char_code_at);
    register_method(proto, prototypes, "indexOf", string_index_of);
    register_method(proto, prototypes, "lastIndexOf", string_last_index_of);
    register_method(proto, prototypes, "substr", string_substr);
    register_method(proto, prototypes, "substring", string_substring);
    register_method(proto, prototypes, "slice", string_slice);
    register_method(proto, prototypes, "split", string_split);
    register_method(proto, prototypes, "toUpperCase", string_to_upper_case);
    register_method(proto, prototypes, "toLowerCase", string_to_lower_case);
    register_method(proto, prototypes, "concat", string_concat);
    let constructor = register_constructor(
        globals,
        prototypes,
        proto,
        BuiltinType::String,
        "String",
        string_constructor,
    );
    register_method(&constructor, prototypes, "fromCharCode", string_from_char_code);
}

/// `String(value)`; no argument gives the empty string
pub fn string_constructor(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let Some(value) = args.first() else {
        return Ok(AvmValue::String(AvmString::default()));
    };
    Ok(AvmValue::String(interp.to_string(ctx, value)?))
}

/// The string a String.prototype method operates on. Objects that are not
/// boxed strings use their primitive string form, so `toString` borrowed
/// onto another object cannot recurse.
fn this_string(ctx: &ExecutionContext, this: &AvmValue) -> AvmString {
    match this {
        AvmValue::String(s) => s.cheap_clone(),
        AvmValue::Object(obj) => match obj.primitive_value() {
            Some(AvmValue::String(s)) => s,
            _ => this.primitive_to_string(ctx.version()),
        },
        other => other.primitive_to_string(ctx.version()),
    }
}

fn chars_of(s: &AvmString) -> Vec<char> {
    s.as_str().chars().collect()
}

fn from_chars(chars: &[char]) -> AvmValue {
    AvmValue::from(chars.iter().collect::<String>())
}

/// Clamp an index argument into `0..=len`; negative values become 0
fn clamp_index(n: f64, len: usize) -> usize {
    to_integer(n).clamp(0.0, len as f64) as usize
}

pub fn string_to_string(
    _interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::String(this_string(ctx, &this)))
}

pub fn string_char_at(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let s = this_string(ctx, &this);
    let index = to_integer(interp.to_number(ctx, &arg(args, 0))?);
    let found = (index >= 0.0)
        .then(|| s.as_str().chars().nth(index as usize))
        .flatten();
    Ok(AvmValue::from(found.map(String::from).unwrap_or_default()))
}

pub fn string_char_code_at(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let s = this_string(ctx, &this);
    let index = to_integer(interp.to_number(ctx, &arg(args, 0))?);
    let found = (index >= 0.0)
        .then(|| s.as_str().chars().nth(index as usize))
        .flatten();
    Ok(AvmValue::Number(found.map_or(f64::NAN, |c| f64::from(u32::from(c)))))
}

pub fn string_index_of(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let haystack = chars_of(&this_string(ctx, &this));
    let needle = chars_of(&interp.to_string(ctx, &arg(args, 0))?);
    let start = match arg(args, 1) {
        AvmValue::Undefined => 0,
        value => clamp_index(interp.to_number(ctx, &value)?, haystack.len()),
    };
    let found = (start..=haystack.len().saturating_sub(needle.len()))
        .find(|&i| haystack.get(i..i + needle.len()) == Some(needle.as_slice()));
    Ok(AvmValue::Number(found.map_or(-1.0, |i| i as f64)))
}

pub fn string_last_index_of(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let haystack = chars_of(&this_string(ctx, &this));
    let needle = chars_of(&interp.to_string(ctx, &arg(args, 0))?);
    let Some(last_start) = haystack.len().checked_sub(needle.len()) else {
        return Ok(AvmValue::Number(-1.0));
    };
    let from = match arg(args, 1) {
        AvmValue::Undefined => last_start,
        value => clamp_index(interp.to_number(ctx, &value)?, last_start),
    };
    let found = (0..=from)
        .rev()
        .find(|&i| haystack.get(i..i + needle.len()) == Some(needle.as_slice()));
    Ok(AvmValue::Number(found.map_or(-1.0, |i| i as f64)))
}

/// `substr(start, length)`; a negative start counts from the end
pub fn string_substr(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let chars = chars_of(&this_string(ctx, &this));
    let len = chars.len();
    let start = to_integer(interp.to_number(ctx, &arg(args, 0))?);
    let start = if start < 0.0 {
        (len as f64 + start).max(0.0) as usize
    } else {
        (start as usize).min(len)
    };
    let count = match arg(args, 1) {
        AvmValue::Undefined => len - start,
        value => clamp_index(interp.to_number(ctx, &value)?, len - start),
    };
    Ok(from_chars(chars.get(start..start + count).unwrap_or_default()))
}

/// `substring(start, end)`; arguments are clamped and swapped if reversed
pub fn string_substring(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let chars = chars_of(&this_string(ctx, &this));
    let len = chars.len();
    let start = clamp_index(interp.to_number(ctx, &arg(args, 0))?, len);
    let end = match arg(args, 1) {
        AvmValue::Undefined => len,
        value => clamp_index(interp.to_number(ctx, &value)?, len),
    };
    let (from, to) = if start <= end { (start, end) } else { (end, start) };
    Ok(from_chars(chars.get(from..to).unwrap_or_default()))
}

/// `slice(start, end)`; negative positions count from the end
pub fn string_slice(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let chars = chars_of(&this_string(ctx, &this));
    let len = chars.len() as f64;
    let resolve = |n: f64| {
        let n = to_integer(n);
        if n < 0.0 { (len + n).max(0.0) } else { n.min(len) }
    };
    let start = resolve(interp.to_number(ctx, &arg(args, 0))?) as usize;
    let end = match arg(args, 1) {
        AvmValue::Undefined => chars.len(),
        value => resolve(interp.to_number(ctx, &value)?) as usize,
    };
    Ok(from_chars(chars.get(start..end.max(start)).unwrap_or_default()))
}

/// `split(separator, limit)`; an undefined separator yields the whole string
pub fn string_split(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let s = this_string(ctx, &this);
    let limit = match arg(args, 1) {
        AvmValue::Undefined => usize::MAX,
        value => to_uint32(interp.to_number(ctx, &value)?) as usize,
    };
    let parts: Vec<AvmValue> = match arg(args, 0) {
        AvmValue::Undefined => vec![AvmValue::String(s.cheap_clone())],
        value => {
            let separator = interp.to_string(ctx, &value)?;
            if separator.is_empty() {
                s.as_str().chars().map(|c| AvmValue::from(String::from(c))).collect()
            } else {
                s.as_str().split(separator.as_str()).map(AvmValue::from).collect()
            }
        }
    };
    Ok(AvmValue::Object(ScriptObject::new_array(
        Some(ctx.prototypes().array.cheap_clone()),
        parts.into_iter().take(limit).collect(),
    )))
}

pub fn string_to_upper_case(
    _interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::from(this_string(ctx, &this).as_str().to_uppercase()))
}

pub fn string_to_lower_case(
    _interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::from(this_string(ctx, &this).as_str().to_lowercase()))
}

pub fn string_concat(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let mut out = this_string(ctx, &this);
    for value in args {
        out = out + &interp.to_string(ctx, value)?;
    }
    Ok(AvmValue::String(out))
}

/// `String.fromCharCode(...codes)`; invalid code points are dropped
pub fn string_from_char_code(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let mut out = String::with_capacity(args.len());
    for value in args {
        let code = to_uint32(interp.to_number(ctx, value)?) & 0xFFFF;
        out.extend(char::from_u32(code));
    }
    Ok(AvmValue::from(out))
}
