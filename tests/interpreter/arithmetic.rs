//! Arithmetic, comparison, bitwise and string actions

use super::{ActionBuilder, Push, eval, eval_stack};
use asrun::{ActionCode, AvmValue};

fn binary(version: u8, left: Push, right: Push, op: ActionCode) -> Vec<AvmValue> {
    eval_stack(version, ActionBuilder::new().push(&[left, right]).op(op))
}

#[test]
fn test_int_push_add() {
    assert_eq!(
        binary(7, Push::Int(1), Push::Int(2), ActionCode::Add),
        vec![AvmValue::Number(3.0)]
    );
}

#[test]
fn test_double_sum_is_exact() {
    let result = binary(7, Push::Double(0.1), Push::Double(0.2), ActionCode::Add2);
    assert_eq!(result, vec![AvmValue::Number(0.1 + 0.2)]);
}

#[test]
fn test_float_push() {
    let result = binary(7, Push::Float(1.5), Push::Int(2), ActionCode::Multiply);
    assert_eq!(result, vec![AvmValue::Number(3.0)]);
}

#[test]
fn test_comparison_result_depends_on_version() {
    assert_eq!(
        binary(4, Push::Int(1), Push::Int(2), ActionCode::Less),
        vec![AvmValue::Number(1.0)]
    );
    assert_eq!(
        binary(5, Push::Int(1), Push::Int(2), ActionCode::Less),
        vec![AvmValue::Boolean(true)]
    );
    assert_eq!(
        binary(4, Push::Int(2), Push::Int(2), ActionCode::Less),
        vec![AvmValue::Number(0.0)]
    );
}

#[test]
fn test_divide_by_zero() {
    assert_eq!(
        binary(4, Push::Int(1), Push::Int(0), ActionCode::Divide),
        vec![AvmValue::from("#ERROR#")]
    );
    assert_eq!(
        binary(5, Push::Int(1), Push::Int(0), ActionCode::Divide),
        vec![AvmValue::Number(f64::INFINITY)]
    );
}

#[test]
fn test_add2_concatenates_strings() {
    assert_eq!(
        binary(7, Push::Str("a"), Push::Int(1), ActionCode::Add2),
        vec![AvmValue::from("a1")]
    );
    assert_eq!(
        binary(7, Push::Int(1), Push::Str("2"), ActionCode::Add2),
        vec![AvmValue::from("12")]
    );
}

#[test]
fn test_undefined_to_number_by_version() {
    let v7 = binary(7, Push::Undefined, Push::Int(1), ActionCode::Add2);
    assert!(matches!(v7.as_slice(), [AvmValue::Number(n)] if n.is_nan()));
    assert_eq!(
        binary(6, Push::Undefined, Push::Int(1), ActionCode::Add2),
        vec![AvmValue::Number(1.0)]
    );
}

#[test]
fn test_empty_string_is_zero_before_version_5() {
    assert_eq!(
        binary(4, Push::Str(""), Push::Int(3), ActionCode::Add),
        vec![AvmValue::Number(3.0)]
    );
}

#[test]
fn test_modulo_and_bitwise() {
    assert_eq!(
        binary(7, Push::Int(7), Push::Int(3), ActionCode::Modulo),
        vec![AvmValue::Number(1.0)]
    );
    assert_eq!(
        binary(7, Push::Int(-1), Push::Int(28), ActionCode::BitURShift),
        vec![AvmValue::Number(15.0)]
    );
    assert_eq!(
        binary(7, Push::Int(-16), Push::Int(2), ActionCode::BitRShift),
        vec![AvmValue::Number(-4.0)]
    );
    assert_eq!(
        binary(7, Push::Int(6), Push::Int(3), ActionCode::BitXor),
        vec![AvmValue::Number(5.0)]
    );
}

#[test]
fn test_equality() {
    assert_eq!(
        binary(7, Push::Str("1"), Push::Int(1), ActionCode::Equals2),
        vec![AvmValue::Boolean(true)]
    );
    assert_eq!(
        binary(7, Push::Str("1"), Push::Int(1), ActionCode::StrictEquals),
        vec![AvmValue::Boolean(false)]
    );
    assert_eq!(
        binary(7, Push::Null, Push::Undefined, ActionCode::Equals2),
        vec![AvmValue::Boolean(true)]
    );
}

#[test]
fn test_greater_and_string_ordering() {
    assert_eq!(
        binary(7, Push::Int(3), Push::Int(2), ActionCode::Greater),
        vec![AvmValue::Boolean(true)]
    );
    assert_eq!(
        binary(7, Push::Str("a"), Push::Str("b"), ActionCode::Less2),
        vec![AvmValue::Boolean(true)]
    );
    assert_eq!(
        binary(7, Push::Str("b"), Push::Str("a"), ActionCode::StringGreater),
        vec![AvmValue::Boolean(true)]
    );
}

#[test]
fn test_unary_conversions() {
    let script = ActionBuilder::new()
        .push(&[Push::Double(-2.5)])
        .op(ActionCode::ToInteger)
        .push(&[Push::Int(41)])
        .op(ActionCode::Increment)
        .push(&[Push::Null])
        .op(ActionCode::TypeOf)
        .push(&[Push::Str("12.5")])
        .op(ActionCode::ToNumber);
    assert_eq!(
        eval_stack(7, script),
        vec![
            AvmValue::Number(-2.0),
            AvmValue::Number(42.0),
            AvmValue::from("null"),
            AvmValue::Number(12.5),
        ]
    );
}

#[test]
fn test_number_formatting() {
    let format = |value: f64| eval(ActionBuilder::new().push(&[Push::Double(value)]).op(ActionCode::ToString));
    assert_eq!(format(0.1 + 0.2), AvmValue::from("0.30000000000000004"));
    assert_eq!(format(1e21), AvmValue::from("1e+21"));
    assert_eq!(format(1.5), AvmValue::from("1.5"));
    assert_eq!(format(-0.000001), AvmValue::from("-0.000001"));
    assert_eq!(format(f64::NAN), AvmValue::from("NaN"));
}

#[test]
fn test_string_actions() {
    let script = ActionBuilder::new()
        .push(&[Push::Str("hello"), Push::Int(2), Push::Int(3)])
        .op(ActionCode::StringExtract)
        .push(&[Push::Str("ab"), Push::Str("cd")])
        .op(ActionCode::StringAdd)
        .push(&[Push::Str("héllo")])
        .op(ActionCode::MbStringLength)
        .push(&[Push::Str("A")])
        .op(ActionCode::CharToAscii)
        .push(&[Push::Int(66)])
        .op(ActionCode::AsciiToChar);
    assert_eq!(
        eval_stack(7, script),
        vec![
            AvmValue::from("ell"),
            AvmValue::from("abcd"),
            AvmValue::Number(5.0),
            AvmValue::Number(65.0),
            AvmValue::from("B"),
        ]
    );
}

#[test]
fn test_string_equals_pushes_number_before_version_5() {
    assert_eq!(
        binary(4, Push::Str("x"), Push::Str("x"), ActionCode::StringEquals),
        vec![AvmValue::Number(1.0)]
    );
}
