//! Throw, try/catch/finally

use super::{ActionBuilder, CatchTo, Harness, Push, eval};
use asrun::{ActionCode, AvmError, AvmValue};

fn say(word: &str) -> ActionBuilder {
    ActionBuilder::new().push_str(word).trace()
}

fn throw(value: &str) -> ActionBuilder {
    ActionBuilder::new().push_str(value).op(ActionCode::Throw)
}

#[test]
fn test_catch_then_finally_order() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new().try_block(
        say("T").push_str("oops").op(ActionCode::Throw).push_str("unreachable").trace(),
        Some((CatchTo::Variable("e"), say("C"))),
        Some(say("F")),
    );
    h.run(script).unwrap();
    assert_eq!(h.traces(), vec!["T", "C", "F"]);
    assert_eq!(h.var("e"), AvmValue::from("oops"));
}

#[test]
fn test_finally_runs_on_normal_completion() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new().try_block(
        say("T"),
        Some((CatchTo::Variable("e"), say("C"))),
        Some(say("F")),
    );
    h.run(script).unwrap();
    assert_eq!(h.traces(), vec!["T", "F"]);
}

#[test]
fn test_uncaught_throw_runs_finally_and_propagates() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new()
        .try_block(say("T").push_str("boom").op(ActionCode::Throw), None, Some(say("F")))
        .set_var("after", Push::Bool(true));
    let err = h.run(script).unwrap_err();
    assert!(matches!(err, AvmError::Thrown { value } if value == AvmValue::from("boom")));
    assert_eq!(h.traces(), vec!["T", "F"]);
    assert_eq!(h.var("after"), AvmValue::Undefined);
}

#[test]
fn test_catch_into_register() {
    let script = ActionBuilder::new()
        .try_block(
            throw("in-register"),
            Some((CatchTo::Register(1), ActionBuilder::new())),
            None,
        )
        .push(&[Push::Register(1)]);
    assert_eq!(eval(script), AvmValue::from("in-register"));
}

#[test]
fn test_script_error_is_caught_as_object() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new().try_block(
        ActionBuilder::new().call("nope", &[]),
        Some((CatchTo::Variable("e"), ActionBuilder::new())),
        None,
    );
    h.run(script).unwrap();

    let AvmValue::Object(error) = h.var("e") else {
        panic!("expected an error object, got {:?}", h.var("e"));
    };
    assert_eq!(
        error.get("message"),
        Some(AvmValue::from("Function \"nope\" is not found"))
    );
    assert!(h.telemetry().is_empty());
}

#[test]
fn test_return_in_finally_overrides() {
    let body = ActionBuilder::new().try_block(
        ActionBuilder::new().push_int(1).op(ActionCode::Return),
        None,
        Some(ActionBuilder::new().push_int(2).op(ActionCode::Return)),
    );
    let script = ActionBuilder::new()
        .define_function("f", &[], body)
        .call("f", &[]);
    assert_eq!(eval(script), AvmValue::Number(2.0));
}

#[test]
fn test_finally_runs_after_return_in_try() {
    let mut h = Harness::new(7);
    let body = ActionBuilder::new().try_block(
        ActionBuilder::new().push_int(1).op(ActionCode::Return),
        None,
        Some(ActionBuilder::new().set_var("ran", Push::Bool(true))),
    );
    let script = ActionBuilder::new()
        .define_function("f", &[], body)
        .call("f", &[]);
    h.run(script).unwrap();
    assert_eq!(h.final_stack(), vec![AvmValue::Number(1.0)]);
    assert_eq!(h.var("ran"), AvmValue::Boolean(true));
}

#[test]
fn test_throw_from_nested_function_is_caught() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new()
        .define_function("fail", &[], throw("deep"))
        .try_block(
            ActionBuilder::new().call("fail", &[]).op(ActionCode::Pop),
            Some((CatchTo::Variable("e"), ActionBuilder::new())),
            None,
        );
    h.run(script).unwrap();
    assert_eq!(h.var("e"), AvmValue::from("deep"));
    assert_eq!(h.ctx.stack_depth(), 0);
}

#[test]
fn test_rethrow_from_catch() {
    let mut h = Harness::new(7);
    let inner = ActionBuilder::new().try_block(
        throw("first"),
        Some((CatchTo::Variable("e"), throw("second"))),
        None,
    );
    let script = ActionBuilder::new().try_block(
        inner,
        Some((CatchTo::Variable("outer"), ActionBuilder::new())),
        None,
    );
    h.run(script).unwrap();
    assert_eq!(h.var("e"), AvmValue::from("first"));
    assert_eq!(h.var("outer"), AvmValue::from("second"));
}

#[test]
fn test_listening_flag_is_restored() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new()
        .try_block(
            throw("x"),
            Some((CatchTo::Variable("e"), ActionBuilder::new())),
            None,
        )
        .call("missing", &[])
        .push_int(1);
    h.run(script).unwrap();
    assert!(!h.ctx.is_try_catch_listening());
    // The failing call after the try was recovered, not rethrown
    assert_eq!(
        h.final_stack(),
        vec![AvmValue::Undefined, AvmValue::Number(1.0)]
    );
    assert_eq!(h.telemetry().len(), 1);
}
