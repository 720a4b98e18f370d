//! Built-in constructors and prototype methods
//!
//! The global object starts out with the constructors below, each owning a
//! `prototype` object, plus `Math`, a handful of global functions and
//! `_global` pointing back at the global object itself.

pub mod array;
pub mod boolean;
pub mod date;
pub mod function;
pub mod global;
pub mod math;
pub mod number;
pub mod object;
pub mod string;

use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::object::{ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::value::{AvmValue, CheapClone};

/// Signature of a native method: interpreter, running context, `this` and
/// the call arguments
pub type NativeFn = fn(
    &mut Interpreter,
    &Rc<ExecutionContext>,
    AvmValue,
    &[AvmValue],
) -> Result<AvmValue, AvmError>;

/// Constructors that NewObject instantiates specially
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    Object,
    Array,
    Boolean,
    Number,
    String,
    Date,
    Function,
}

/// Payload of a function object implemented in Rust
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
    /// Set on the built-in constructors
    pub builtin: Option<BuiltinType>,
}

/// Prototype objects of the built-in constructors
#[derive(Clone)]
pub struct Prototypes {
    pub object: ObjectRef,
    pub function: ObjectRef,
    pub array: ObjectRef,
    pub boolean: ObjectRef,
    pub number: ObjectRef,
    pub string: ObjectRef,
    pub date: ObjectRef,
}

/// Build a fresh global object and the prototypes hanging off it
pub fn create_globals() -> (ObjectRef, Prototypes) {
    let object_proto: ObjectRef = ScriptObject::new_plain(None);
    let function_proto: ObjectRef = ScriptObject::new_plain(Some(object_proto.cheap_clone()));
    let new_proto = || -> ObjectRef { ScriptObject::new_plain(Some(object_proto.cheap_clone())) };
    let prototypes = Prototypes {
        array: new_proto(),
        boolean: new_proto(),
        number: new_proto(),
        string: new_proto(),
        date: new_proto(),
        function: function_proto,
        object: object_proto,
    };

    let globals: ObjectRef = ScriptObject::new_plain(Some(prototypes.object.cheap_clone()));
    globals.define_hidden("_global", AvmValue::Object(globals.cheap_clone()));

    object::init(&globals, &prototypes);
    function::init(&globals, &prototypes);
    array::init(&globals, &prototypes);
    boolean::init(&globals, &prototypes);
    number::init(&globals, &prototypes);
    string::init(&globals, &prototypes);
    date::init(&globals, &prototypes);
    math::init(&globals, &prototypes);
    global::init(&globals, &prototypes);

    (globals, prototypes)
}

/// Create a native function object
pub fn create_native_function(
    prototypes: &Prototypes,
    name: &'static str,
    func: NativeFn,
) -> ObjectRef {
    ScriptObject::new_native_function(
        Some(prototypes.function.cheap_clone()),
        NativeFunction {
            name,
            func,
            builtin: None,
        },
    )
}

/// Install a native method as a hidden property of `target`
pub fn register_method(
    target: &ObjectRef,
    prototypes: &Prototypes,
    name: &'static str,
    func: NativeFn,
) {
    let method = create_native_function(prototypes, name, func);
    target.define_hidden(name, AvmValue::Object(method));
}

/// Create a built-in constructor linked with its prototype and install it
/// on the global object
pub fn register_constructor(
    globals: &ObjectRef,
    prototypes: &Prototypes,
    prototype: &ObjectRef,
    builtin: BuiltinType,
    name: &'static str,
    func: NativeFn,
) -> ObjectRef {
    let constructor: ObjectRef = ScriptObject::new_native_function(
        Some(prototypes.function.cheap_clone()),
        NativeFunction {
            name,
            func,
            builtin: Some(builtin),
        },
    );
    constructor.define_hidden("prototype", AvmValue::Object(prototype.cheap_clone()));
    prototype.define_hidden("constructor", AvmValue::Object(constructor.cheap_clone()));
    globals.define_hidden(name, AvmValue::Object(constructor.cheap_clone()));
    constructor
}

/// Argument `index`, or `undefined` when it was not passed
pub fn arg(args: &[AvmValue], index: usize) -> AvmValue {
    args.get(index).cloned().unwrap_or_default()
}

/// NewObject / NewMethod on a built-in constructor. Returns `None` when
/// `constructor` is not one of them.
pub(crate) fn create_builtin_type(
    interp: &mut Interpreter,
    ctx: &Rc<ExecutionContext>,
    constructor: &ObjectRef,
    args: &[AvmValue],
) -> Result<Option<AvmValue>, AvmError> {
    let Some(builtin) = constructor
        .as_script_object()
        .and_then(ScriptObject::as_native)
        .and_then(|native| native.builtin)
    else {
        return Ok(None);
    };

    let value = match builtin {
        BuiltinType::Object => {
            AvmValue::Object(ScriptObject::new_plain(Some(ctx.prototypes().object.cheap_clone())))
        }
        BuiltinType::Array => array::construct(ctx, args)?,
        // Converting constructors yield primitives, not wrapper objects
        BuiltinType::Boolean => boolean::boolean_constructor(interp, ctx, AvmValue::Undefined, args)?,
        BuiltinType::Number => number::number_constructor(interp, ctx, AvmValue::Undefined, args)?,
        BuiltinType::String => string::string_constructor(interp, ctx, AvmValue::Undefined, args)?,
        BuiltinType::Function => function::function_constructor(interp, ctx, AvmValue::Undefined, args)?,
        BuiltinType::Date => date::construct(interp, ctx, args)?,
    };
    Ok(Some(value))
}
