//! Math object

use super::{NativeFn, Prototypes, register_method};
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::{ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::value::{AvmValue, CheapClone};

/// Create the Math object and install it on the global object
pub fn init(globals: &ObjectRef, prototypes: &Prototypes) {
    let math: ObjectRef = ScriptObject::new_plain(Some(prototypes.object.cheap_clone()));

    let constants = [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ];
    for (name, value) in constants {
        math.define_hidden(name, AvmValue::Number(value));
    }

    let unary: [(&'static str, NativeFn); 13] = [
        ("abs", math_abs),
        ("floor", math_floor),
        ("ceil", math_ceil),
        ("round", math_round),
        ("sqrt", math_sqrt),
        ("sin", math_sin),
        ("cos", math_cos),
        ("tan", math_tan),
        ("asin", math_asin),
        ("acos", math_acos),
        ("atan", math_atan),
        ("exp", math_exp),
        ("log", math_log),
    ];
    for (name, func) in unary {
        register_method(&math, prototypes, name, func);
    }
    register_method(&math, prototypes, "atan2", math_atan2);
    register_method(&math, prototypes, "pow", math_pow);
    register_method(&math, prototypes, "min", math_min);
    register_method(&math, prototypes, "max", math_max);
    register_method(&math, prototypes, "random", math_random);

    globals.define_hidden("Math", AvmValue::Object(math));
}

fn number_arg(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    args: &[AvmValue],
    index: usize,
) -> Result<f64, AvmError> {
    match args.get(index) {
        Some(value) => interp.to_number(ctx, value),
        None => Ok(f64::NAN),
    }
}

macro_rules! unary_math {
    ($name:ident, $op:expr) => {
        pub fn $name(
            interp: &mut Interpreter,
            ctx: &Rc<ExecutionContext>,
            _this: AvmValue,
            args: &[AvmValue],
        ) -> Result<AvmValue, AvmError> {
            let n = number_arg(interp, ctx, args, 0)?;
            let op: fn(f64) -> f64 = $op;
            Ok(AvmValue::Number(op(n)))
        }
    };
}

unary_math!(math_abs, f64::abs);
unary_math!(math_floor, f64::floor);
unary_math!(math_ceil, f64::ceil);
// Halves round towards positive infinity
unary_math!(math_round, |n| (n + 0.5).floor());
unary_math!(math_sqrt, f64::sqrt);
unary_math!(math_sin, f64::sin);
unary_math!(math_cos, f64::cos);
unary_math!(math_tan, f64::tan);
unary_math!(math_asin, f64::asin);
unary_math!(math_acos, f64::acos);
unary_math!(math_atan, f64::atan);
unary_math!(math_exp, f64::exp);
unary_math!(math_log, f64::ln);

pub fn math_atan2(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let y = number_arg(interp, ctx, args, 0)?;
    let x = number_arg(interp, ctx, args, 1)?;
    Ok(AvmValue::Number(y.atan2(x)))
}

pub fn math_pow(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    let base = number_arg(interp, ctx, args, 0)?;
    let exponent = number_arg(interp, ctx, args, 1)?;
    Ok(AvmValue::Number(base.powf(exponent)))
}

/// `min()`/`max()` with no arguments give +/-Infinity; any NaN wins
fn fold_numbers(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    args: &[AvmValue],
    init: f64,
    pick: fn(f64, f64) -> f64,
) -> Result<AvmValue, AvmError> {
    let mut acc = init;
    for value in args {
        let n = interp.to_number(ctx, value)?;
        if n.is_nan() {
            return Ok(AvmValue::Number(f64::NAN));
        }
        acc = pick(acc, n);
    }
    Ok(AvmValue::Number(acc))
}

pub fn math_min(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    fold_numbers(interp, ctx, args, f64::INFINITY, f64::min)
}

pub fn math_max(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    fold_numbers(interp, ctx, args, f64::NEG_INFINITY, f64::max)
}

pub fn math_random(
    interp: &mut Interpreter,
    _ctx: &Rc<ExecutionContext>,
    _this: AvmValue,
    _args: &[AvmValue],
) -> Result<AvmValue, AvmError> {
    Ok(AvmValue::Number(interp.next_random()))
}
