//! Recovery from failing actions and malformed input

use super::{ActionBuilder, Harness, Push, eval_stack};
use asrun::{ActionCode, AvmError, AvmValue, GuardConfig};

#[test]
fn test_failed_call_pushes_undefined_and_continues() {
    let script = ActionBuilder::new().call("missing", &[]).push_int(7);
    assert_eq!(
        eval_stack(7, script),
        vec![AvmValue::Undefined, AvmValue::Number(7.0)]
    );
}

#[test]
fn test_unknown_action_is_skipped() {
    let mut h = Harness::new(7);
    h.run(ActionBuilder::new().raw(&[0x16]).push_int(7)).unwrap();
    assert_eq!(h.final_stack(), vec![AvmValue::Number(7.0)]);
    let events = h.telemetry();
    assert_eq!(events.len(), 1);
    assert!(events.iter().all(|e| e.action_code == 0x16));
}

#[test]
fn test_unknown_action_with_payload_is_skipped_whole() {
    let script = ActionBuilder::new()
        .raw(&[0xA0, 0x03, 0x00, 0x96, 0x96, 0x96])
        .push_int(1);
    assert_eq!(eval_stack(7, script), vec![AvmValue::Number(1.0)]);
}

#[test]
fn test_errors_abort_when_not_ignored() {
    let config = GuardConfig {
        ignore_errors: false,
        ..GuardConfig::default()
    };
    let mut h = Harness::with_config(7, config);
    let err = h
        .run(ActionBuilder::new().call("missing", &[]).push_int(7))
        .unwrap_err();
    assert!(matches!(err, AvmError::Script { .. }));
    assert!(!h.reached_end());
    assert!(!h.ctx.is_execution_prohibited());
}

#[test]
fn test_set_member_on_undefined_is_recovered() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new()
        .get_var("nothing")
        .push(&[Push::Str("a"), Push::Int(1)])
        .op(ActionCode::SetMember);
    h.run(script).unwrap();
    assert!(h.reached_end());
    assert!(h.final_stack().is_empty());
}

#[test]
fn test_bad_property_index_pushes_undefined() {
    let script = ActionBuilder::new()
        .push(&[Push::Str(""), Push::Int(99)])
        .op(ActionCode::GetProperty);
    assert_eq!(eval_stack(7, script), vec![AvmValue::Undefined]);
}

#[test]
fn test_unknown_push_type_is_recovered() {
    let script = ActionBuilder::new()
        .action(ActionCode::Push, &[0x0A])
        .push_int(3);
    assert_eq!(eval_stack(7, script), vec![AvmValue::Number(3.0)]);
}

#[test]
fn test_throw_is_never_recovered() {
    let mut h = Harness::new(7);
    let err = h
        .run(ActionBuilder::new().push_str("up").op(ActionCode::Throw).push_int(1))
        .unwrap_err();
    assert!(matches!(err, AvmError::Thrown { .. }));
    assert!(h.telemetry().is_empty());
    assert!(!h.ctx.is_execution_prohibited());
}

#[test]
fn test_truncated_push_is_decode_error() {
    let mut h = Harness::new(7);
    let err = h
        .run(ActionBuilder::new().raw(&[0x96, 0x05, 0x00, 0x07, 0x01]))
        .unwrap_err();
    assert!(matches!(err, AvmError::Decode { .. }));
    assert!(h.telemetry().is_empty());
}

#[test]
fn test_truncated_header_is_decode_error() {
    let mut h = Harness::new(7);
    // Build appends End, which becomes the first length byte
    let err = h.run(ActionBuilder::new().raw(&[0x96])).unwrap_err();
    assert!(matches!(err, AvmError::Decode { .. }));
}

#[test]
fn test_stack_underflow_is_decode_error() {
    let mut h = Harness::new(7);
    let err = h.run(ActionBuilder::new().op(ActionCode::Add)).unwrap_err();
    assert!(matches!(err, AvmError::Decode { .. }));
}

#[test]
fn test_bad_argument_count_is_decode_error() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new()
        .push(&[Push::Int(5), Push::Str("f")])
        .op(ActionCode::CallFunction);
    assert!(matches!(h.run(script), Err(AvmError::Decode { .. })));
}

#[test]
fn test_recovery_inside_function() {
    let body = ActionBuilder::new()
        .call("missing", &[])
        .op(ActionCode::Pop)
        .push_int(4)
        .op(ActionCode::Return);
    let script = ActionBuilder::new()
        .define_function("f", &[], body)
        .call("f", &[]);
    assert_eq!(eval_stack(7, script), vec![AvmValue::Number(4.0)]);
}
