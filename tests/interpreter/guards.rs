//! Hang timeout, recursion limit and error budget

use super::{ActionBuilder, CatchTo, Harness, Push, with_main_thread_stack};
use asrun::{ActionCode, AvmError, AvmValue, CriticalKind, GuardConfig};

/// `depth = depth + 1; recurse();`
fn recursion_script() -> ActionBuilder {
    let body = ActionBuilder::new()
        .push_str("depth")
        .get_var("depth")
        .op(ActionCode::Increment)
        .op(ActionCode::SetVariable)
        .call("recurse", &[])
        .op(ActionCode::Pop);
    ActionBuilder::new()
        .set_var("depth", Push::Int(0))
        .define_function("recurse", &[], body)
        .call("recurse", &[])
}

fn infinite_loop() -> ActionBuilder {
    ActionBuilder::new().label("top").jump("top")
}

#[test]
fn test_recursion_limit_disables_context() {
    with_main_thread_stack(|| {
        let mut h = Harness::new(7);
        let err = h.run(recursion_script()).unwrap_err();
        assert!(matches!(err, AvmError::Critical(CriticalKind::RecursionLimit)));
        assert_eq!(h.var("depth"), AvmValue::Number(255.0));
        assert!(h.ctx.is_execution_prohibited());
        assert_eq!(h.ctx.stack_depth(), 0);

        // A disabled context runs nothing
        let executed = h.executed();
        assert!(h.run(ActionBuilder::new().set_var("later", Push::Int(1))).is_ok());
        assert_eq!(h.executed(), executed);
        assert_eq!(h.var("later"), AvmValue::Undefined);
    });
}

#[test]
fn test_configured_recursion_limit() {
    let config = GuardConfig {
        max_stack_depth: 8,
        ..GuardConfig::default()
    };
    let mut h = Harness::with_config(7, config);
    let err = h.run(recursion_script()).unwrap_err();
    assert!(matches!(err, AvmError::Critical(CriticalKind::RecursionLimit)));
    assert_eq!(h.var("depth"), AvmValue::Number(7.0));
}

#[test]
fn test_hang_timeout() {
    let mut h = Harness::new(7).with_clock_step(1);
    let err = h.run(infinite_loop()).unwrap_err();
    assert!(matches!(err, AvmError::Critical(CriticalKind::HangTimeout)));
    assert!(h.ctx.is_execution_prohibited());
    assert!(!h.ctx.is_active());
}

#[test]
fn test_hang_timeout_from_config() {
    let config = GuardConfig::from_json(r#"{ "hang_timeout_ms": 5 }"#).unwrap();
    let mut h = Harness::with_config(7, config).with_clock_step(1);
    let err = h.run(infinite_loop()).unwrap_err();
    assert!(matches!(err, AvmError::Critical(CriticalKind::HangTimeout)));
    // Five checks at one per hundred actions
    assert!(h.executed() <= 600);
}

#[test]
fn test_finally_skipped_on_critical_error() {
    let mut h = Harness::new(7).with_clock_step(1);
    let script = ActionBuilder::new().try_block(
        infinite_loop(),
        None,
        Some(ActionBuilder::new().set_var("cleaned", Push::Bool(true))),
    );
    assert!(h.run(script).unwrap_err().is_critical());
    assert_eq!(h.var("cleaned"), AvmValue::Undefined);
}

#[test]
fn test_catch_cannot_observe_critical_error() {
    let mut h = Harness::new(7).with_clock_step(1);
    let script = ActionBuilder::new().try_block(
        infinite_loop(),
        Some((
            CatchTo::Variable("e"),
            ActionBuilder::new().set_var("caught", Push::Bool(true)),
        )),
        None,
    );
    assert!(h.run(script).unwrap_err().is_critical());
    assert_eq!(h.var("caught"), AvmValue::Undefined);
}

#[test]
fn test_deadline_resets_per_invocation() {
    let mut h = Harness::new(7);
    h.run(ActionBuilder::new().set_var("a", Push::Int(1))).unwrap();
    h.clock.advance(5_000);
    h.run(ActionBuilder::new().set_var("b", Push::Int(2))).unwrap();
    assert_eq!(h.var("b"), AvmValue::Number(2.0));
    assert!(!h.ctx.is_execution_prohibited());
}

/// `count` failing calls, each followed by a successful action
fn separated_failures(count: usize) -> ActionBuilder {
    (0..count).fold(ActionBuilder::new(), |script, _| {
        script.raw(&[0x16]).push_int(0).op(ActionCode::Pop)
    })
}

#[test]
fn test_error_budget() {
    let config = GuardConfig {
        max_errors: 3,
        ..GuardConfig::default()
    };

    let mut within = Harness::with_config(7, config.clone());
    assert!(within.run(separated_failures(3)).is_ok());
    assert_eq!(within.ctx.errors_ignored(), 3);

    let mut over = Harness::with_config(7, config);
    let err = over.run(separated_failures(4)).unwrap_err();
    assert!(matches!(err, AvmError::Critical(CriticalKind::ErrorBudget)));
    assert!(over.ctx.is_execution_prohibited());
}

#[test]
fn test_consecutive_failures_count_once() {
    let config = GuardConfig {
        max_errors: 1,
        ..GuardConfig::default()
    };
    let mut h = Harness::with_config(7, config);
    h.run(ActionBuilder::new().raw(&[0x16, 0x16, 0x16, 0x16, 0x16]))
        .unwrap();
    assert_eq!(h.ctx.errors_ignored(), 1);
    assert_eq!(h.telemetry().len(), 5);
}

#[test]
fn test_error_budget_resets_per_invocation() {
    let config = GuardConfig {
        max_errors: 2,
        ..GuardConfig::default()
    };
    let mut h = Harness::with_config(7, config);
    h.run(separated_failures(2)).unwrap();
    h.run(separated_failures(2)).unwrap();
    assert!(!h.ctx.is_execution_prohibited());
}

#[test]
fn test_telemetry_for_recovered_errors() {
    let mut h = Harness::new(7);
    h.run(ActionBuilder::new().raw(&[0x16]).call("missing", &[]))
        .unwrap();
    let events = h.telemetry();
    assert_eq!(events.len(), 2);
    let codes: Vec<u8> = events.iter().map(|e| e.action_code).collect();
    assert_eq!(codes, vec![0x16, ActionCode::CallFunction.code()]);
    assert!(events.iter().all(|e| e.error_type == 1));
    assert!(events.last().is_some_and(|e| e.message.contains("missing")));
}

/// `levels` nested `with (undefined) { ... }` blocks with an empty innermost body
fn nested_with(levels: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(levels * 9);
    for level in 0..levels {
        let body_size = ((levels - level - 1) * 9) as u16;
        // Push undefined
        bytes.extend_from_slice(&[ActionCode::Push.code(), 0x01, 0x00, 0x03]);
        bytes.push(ActionCode::With.code());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&body_size.to_le_bytes());
    }
    bytes
}

#[test]
fn test_deeply_nested_with_blocks_disable_context() {
    with_main_thread_stack(|| {
        let mut h = Harness::new(7);
        let err = h
            .run(ActionBuilder::new().raw(&nested_with(7000)))
            .unwrap_err();
        assert!(matches!(err, AvmError::Critical(CriticalKind::NestingLimit)));
        assert!(h.ctx.is_execution_prohibited());
        assert_eq!(h.ctx.nesting_depth(), 0);
    });
}

#[test]
fn test_nesting_within_limit() {
    let config = GuardConfig {
        max_nesting_depth: 3,
        ..GuardConfig::default()
    };
    let mut within = Harness::with_config(7, config.clone());
    within
        .run(ActionBuilder::new().raw(&nested_with(3)).push_int(1))
        .unwrap();
    assert_eq!(within.final_stack(), vec![AvmValue::Number(1.0)]);
    assert_eq!(within.ctx.nesting_depth(), 0);

    let mut over = Harness::with_config(7, config);
    let err = over.run(ActionBuilder::new().raw(&nested_with(4))).unwrap_err();
    assert!(matches!(err, AvmError::Critical(CriticalKind::NestingLimit)));
}

#[test]
fn test_deeply_nested_try_blocks_disable_context() {
    with_main_thread_stack(|| {
        let script = (0..1000).fold(ActionBuilder::new().push_int(1), |inner, _| {
            ActionBuilder::new().try_block(
                inner,
                Some((
                    CatchTo::Variable("e"),
                    ActionBuilder::new().set_var("caught", Push::Bool(true)),
                )),
                None,
            )
        });
        let mut h = Harness::new(7);
        let err = h.run(script).unwrap_err();
        assert!(matches!(err, AvmError::Critical(CriticalKind::NestingLimit)));
        assert_eq!(h.var("caught"), AvmValue::Undefined);
    });
}

#[test]
fn test_nesting_counts_across_calls() {
    let config = GuardConfig {
        max_nesting_depth: 2,
        ..GuardConfig::default()
    };
    let body = ActionBuilder::new().raw(&nested_with(2));
    let mut h = Harness::with_config(7, config);

    // Called at top level the function stays within the limit
    h.run(
        ActionBuilder::new()
            .define_function("f", &[], body)
            .call("f", &[])
            .op(ActionCode::Pop),
    )
    .unwrap();

    // One enclosing with block pushes it over
    let call_in_with = ActionBuilder::new().call("f", &[]).op(ActionCode::Pop);
    let err = h
        .run(ActionBuilder::new().get_var("_global").with_block(call_in_with))
        .unwrap_err();
    assert!(matches!(err, AvmError::Critical(CriticalKind::NestingLimit)));
    assert_eq!(h.ctx.stack_depth(), 0);
    assert_eq!(h.ctx.nesting_depth(), 0);
}
