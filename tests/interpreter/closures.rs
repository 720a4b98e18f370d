//! Function definition, invocation, closures and classes

use super::{ActionBuilder, Harness, Push, eval, eval_stack};
use asrun::{ActionCode, AvmValue};

fn add_function() -> ActionBuilder {
    ActionBuilder::new().define_function(
        "add",
        &["a", "b"],
        ActionBuilder::new()
            .get_var("a")
            .get_var("b")
            .op(ActionCode::Add2)
            .op(ActionCode::Return),
    )
}

#[test]
fn test_call_defined_function() {
    let script = add_function().call("add", &[Push::Int(2), Push::Int(3)]);
    assert_eq!(eval(script), AvmValue::Number(5.0));
}

#[test]
fn test_missing_arguments_are_undefined() {
    let script = ActionBuilder::new()
        .define_function(
            "second",
            &["a", "b"],
            ActionBuilder::new()
                .get_var("b")
                .op(ActionCode::TypeOf)
                .op(ActionCode::Return),
        )
        .call("second", &[Push::Int(1)]);
    assert_eq!(eval(script), AvmValue::from("undefined"));
}

#[test]
fn test_function_without_return_yields_undefined() {
    let script = ActionBuilder::new()
        .define_function("noop", &[], ActionBuilder::new().push_int(1).op(ActionCode::Pop))
        .call("noop", &[]);
    assert_eq!(eval(script), AvmValue::Undefined);
}

#[test]
fn test_closure_captures_definition_scope() {
    let counter = ActionBuilder::new()
        .push_str("count")
        .get_var("count")
        .op(ActionCode::Increment)
        .op(ActionCode::SetVariable)
        .get_var("count")
        .op(ActionCode::Return);
    let make_counter = ActionBuilder::new()
        .push(&[Push::Str("count"), Push::Int(0)])
        .op(ActionCode::DefineLocal)
        .define_function("", &[], counter)
        .op(ActionCode::Return);

    let mut h = Harness::new(7);
    let script = ActionBuilder::new()
        .define_function("makeCounter", &[], make_counter)
        .push_str("c")
        .call("makeCounter", &[])
        .op(ActionCode::SetVariable)
        .call("c", &[])
        .call("c", &[]);
    h.run(script).unwrap();
    assert_eq!(
        h.final_stack(),
        vec![AvmValue::Number(1.0), AvmValue::Number(2.0)]
    );
    // The counter lives in the activation, not on the timeline
    assert_eq!(h.var("count"), AvmValue::Undefined);
}

#[test]
fn test_caller_scope_is_not_visible() {
    let script = ActionBuilder::new()
        .define_function(
            "peek",
            &[],
            ActionBuilder::new().get_var("secret").op(ActionCode::Return),
        )
        .define_function(
            "outer",
            &[],
            ActionBuilder::new()
                .push(&[Push::Str("secret"), Push::Int(1)])
                .op(ActionCode::DefineLocal)
                .call("peek", &[])
                .op(ActionCode::Return),
        )
        .call("outer", &[]);
    assert_eq!(eval(script), AvmValue::Undefined);
}

#[test]
fn test_define_local_does_not_leak() {
    let mut h = Harness::new(7);
    let script = ActionBuilder::new()
        .define_function(
            "f",
            &[],
            ActionBuilder::new()
                .push(&[Push::Str("local"), Push::Int(1)])
                .op(ActionCode::DefineLocal),
        )
        .call("f", &[])
        .op(ActionCode::Pop);
    h.run(script).unwrap();
    assert_eq!(h.var("local"), AvmValue::Undefined);
    assert_eq!(h.ctx.globals().get("local"), None);
}

#[test]
fn test_define_function2_register_params() {
    let body = ActionBuilder::new()
        .push(&[Push::Register(3)])
        .get_var("b")
        .op(ActionCode::Add2)
        .op(ActionCode::Return);
    let script = ActionBuilder::new()
        .define_function2("f", 4, 0, &[(3, "a"), (0, "b")], body)
        .call("f", &[Push::Int(4), Push::Int(5)]);
    assert_eq!(eval(script), AvmValue::Number(9.0));
}

#[test]
fn test_define_function2_preloads() {
    // PreloadThis | PreloadGlobal: this in r1, _global in r2
    let body = ActionBuilder::new()
        .push(&[Push::Register(1)])
        .get_var("_root")
        .op(ActionCode::StrictEquals)
        .push(&[Push::Register(2)])
        .get_var("_global")
        .op(ActionCode::StrictEquals)
        .op(ActionCode::And)
        .op(ActionCode::Return);
    let script = ActionBuilder::new()
        .define_function2("g", 3, 0x0101, &[], body)
        .call("g", &[]);
    assert_eq!(eval(script), AvmValue::Boolean(true));
}

#[test]
fn test_method_call_binds_this() {
    let getter = ActionBuilder::new()
        .get_var("this")
        .push_str("v")
        .op(ActionCode::GetMember)
        .op(ActionCode::Return);
    let script = ActionBuilder::new()
        .push_str("o")
        .push(&[Push::Str("v"), Push::Int(5), Push::Int(1)])
        .op(ActionCode::InitObject)
        .op(ActionCode::SetVariable)
        .get_var("o")
        .push_str("get")
        .define_function("", &[], getter)
        .op(ActionCode::SetMember)
        .push_int(0)
        .get_var("o")
        .push_str("get")
        .op(ActionCode::CallMethod);
    assert_eq!(eval(script), AvmValue::Number(5.0));
}

#[test]
fn test_new_object_with_script_constructor() {
    let constructor = ActionBuilder::new()
        .get_var("this")
        .push_str("x")
        .get_var("x")
        .op(ActionCode::SetMember);
    let script = ActionBuilder::new()
        .define_function("Point", &["x"], constructor)
        .push_str("p")
        .push(&[Push::Int(7), Push::Int(1), Push::Str("Point")])
        .op(ActionCode::NewObject)
        .op(ActionCode::SetVariable)
        .get_var("p")
        .push_str("x")
        .op(ActionCode::GetMember)
        .get_var("p")
        .get_var("Point")
        .op(ActionCode::InstanceOf);
    assert_eq!(
        eval_stack(7, script),
        vec![AvmValue::Number(7.0), AvmValue::Boolean(true)]
    );
}

#[test]
fn test_recursive_factorial() {
    let body = ActionBuilder::new()
        .get_var("n")
        .push_int(2)
        .op(ActionCode::Less2)
        .if_true("base")
        .get_var("n")
        .get_var("n")
        .push_int(1)
        .op(ActionCode::Subtract)
        .push(&[Push::Int(1), Push::Str("fact")])
        .op(ActionCode::CallFunction)
        .op(ActionCode::Multiply)
        .op(ActionCode::Return)
        .label("base")
        .push_int(1)
        .op(ActionCode::Return);
    let script = ActionBuilder::new()
        .define_function("fact", &["n"], body)
        .call("fact", &[Push::Int(10)]);
    assert_eq!(eval(script), AvmValue::Number(3628800.0));
}

#[test]
fn test_arguments_object() {
    let body = ActionBuilder::new()
        .get_var("arguments")
        .push_str("length")
        .op(ActionCode::GetMember)
        .op(ActionCode::Return);
    let script = ActionBuilder::new()
        .define_function("count", &[], body)
        .call("count", &[Push::Int(1), Push::Int(2), Push::Int(3)]);
    assert_eq!(eval(script), AvmValue::Number(3.0));
}

#[test]
fn test_host_calls_script_function() {
    let mut h = Harness::new(7);
    let body = ActionBuilder::new()
        .get_var("x")
        .push_int(2)
        .op(ActionCode::Multiply)
        .op(ActionCode::Return);
    h.run(ActionBuilder::new().define_function("double", &["x"], body))
        .unwrap();

    let double = h.var("double");
    let result = h
        .interp
        .call_function(&h.ctx, &double, AvmValue::Undefined, &[AvmValue::Number(21.0)])
        .unwrap();
    assert_eq!(result, AvmValue::Number(42.0));

    let not_callable = h
        .interp
        .call_function(&h.ctx, &AvmValue::Number(1.0), AvmValue::Undefined, &[])
        .unwrap();
    assert_eq!(not_callable, AvmValue::Undefined);
    assert_eq!(h.ctx.stack_depth(), 0);
}

#[test]
fn test_extends_and_instance_of() {
    let script = ActionBuilder::new()
        .define_function("A", &[], ActionBuilder::new())
        .define_function("B", &[], ActionBuilder::new())
        .get_var("B")
        .get_var("A")
        .op(ActionCode::Extends)
        .get_var("A")
        .push_str("prototype")
        .op(ActionCode::GetMember)
        .push(&[Push::Str("name"), Push::Str("A")])
        .op(ActionCode::SetMember)
        .push_str("b")
        .push(&[Push::Int(0), Push::Str("B")])
        .op(ActionCode::NewObject)
        .op(ActionCode::SetVariable)
        .get_var("b")
        .push_str("name")
        .op(ActionCode::GetMember)
        .get_var("b")
        .get_var("A")
        .op(ActionCode::InstanceOf);
    assert_eq!(
        eval_stack(7, script),
        vec![AvmValue::from("A"), AvmValue::Boolean(true)]
    );
}

#[test]
fn test_function_constants_come_from_definition_pool() {
    let body = ActionBuilder::new()
        .push(&[Push::Constant(0)])
        .op(ActionCode::Return);
    let script = ActionBuilder::new()
        .constant_pool(&["from-definition"])
        .define_function("f", &[], body)
        .constant_pool(&["replaced"])
        .call("f", &[]);
    assert_eq!(eval(script), AvmValue::from("from-definition"));
}

/// `class.prototype.greet = function () { <body> }`
fn define_greet(script: ActionBuilder, class: &str, body: ActionBuilder) -> ActionBuilder {
    script
        .get_var(class)
        .push_str("prototype")
        .op(ActionCode::GetMember)
        .push_str("greet")
        .define_function("", &[], body)
        .op(ActionCode::SetMember)
}

/// `return super.greet() + suffix;`
fn greet_via_super(suffix: &str) -> ActionBuilder {
    ActionBuilder::new()
        .push_int(0)
        .get_var("super")
        .push_str("greet")
        .op(ActionCode::CallMethod)
        .push_str(suffix)
        .op(ActionCode::Add2)
        .op(ActionCode::Return)
}

/// `subclass extends base`, both with empty constructors
fn declare_subclass(script: ActionBuilder, subclass: &str, base: &str) -> ActionBuilder {
    script
        .define_function(subclass, &[], ActionBuilder::new())
        .get_var(subclass)
        .get_var(base)
        .op(ActionCode::Extends)
}

/// `new class().greet()`
fn greet_new_instance(script: ActionBuilder, class: &str) -> ActionBuilder {
    script
        .push_int(0)
        .push(&[Push::Int(0), Push::Str(class)])
        .op(ActionCode::NewObject)
        .push_str("greet")
        .op(ActionCode::CallMethod)
}

#[test]
fn test_super_method_call() {
    let script = ActionBuilder::new().define_function("A", &[], ActionBuilder::new());
    let script = declare_subclass(script, "B", "A");
    let script = define_greet(
        script,
        "A",
        ActionBuilder::new().push_str("A").op(ActionCode::Return),
    );
    let script = define_greet(script, "B", greet_via_super("B"));
    assert_eq!(eval(greet_new_instance(script, "B")), AvmValue::from("AB"));
}

#[test]
fn test_super_resolves_through_three_levels() {
    let script = ActionBuilder::new().define_function("A", &[], ActionBuilder::new());
    let script = declare_subclass(script, "B", "A");
    let script = declare_subclass(script, "C", "B");
    let script = define_greet(
        script,
        "A",
        ActionBuilder::new().push_str("A").op(ActionCode::Return),
    );
    let script = define_greet(script, "B", greet_via_super("B"));
    let script = define_greet(script, "C", greet_via_super("C"));
    assert_eq!(eval(greet_new_instance(script, "C")), AvmValue::from("ABC"));
}

#[test]
fn test_super_constructor_call() {
    let base = ActionBuilder::new()
        .get_var("this")
        .push(&[Push::Str("a"), Push::Str("fromA")])
        .op(ActionCode::SetMember);
    // super(); this.b = 1;
    let derived = ActionBuilder::new()
        .push_int(0)
        .get_var("super")
        .push(&[Push::Undefined])
        .op(ActionCode::CallMethod)
        .op(ActionCode::Pop)
        .get_var("this")
        .push(&[Push::Str("b"), Push::Int(1)])
        .op(ActionCode::SetMember);
    let script = ActionBuilder::new()
        .define_function("A", &[], base)
        .define_function("B", &[], derived)
        .get_var("B")
        .get_var("A")
        .op(ActionCode::Extends)
        .push_str("o")
        .push(&[Push::Int(0), Push::Str("B")])
        .op(ActionCode::NewObject)
        .op(ActionCode::SetVariable)
        .get_var("o")
        .push_str("a")
        .op(ActionCode::GetMember)
        .get_var("o")
        .push_str("b")
        .op(ActionCode::GetMember);
    assert_eq!(
        eval_stack(7, script),
        vec![AvmValue::from("fromA"), AvmValue::Number(1.0)]
    );
}

#[test]
fn test_super_outside_a_class_is_recovered() {
    let mut h = Harness::new(7);
    let lonely = greet_via_super("!");
    let script = ActionBuilder::new()
        .define_function("f", &[], lonely)
        .call("f", &[]);
    h.run(script).unwrap();
    assert_eq!(h.final_stack(), vec![AvmValue::from("undefined!")]);
    assert_eq!(h.telemetry().len(), 1);
}
