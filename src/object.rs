//! Object model
//!
//! Every object that takes part in variable resolution implements the
//! [`AvmObject`] capability trait: get/set/has/delete by qualified name,
//! plus call/construct for callables and child lookup for movie clips.
//! The interpreter never inspects a concrete object type directly.
//!
//! [`ScriptObject`] is the object the interpreter itself creates: plain
//! objects, arrays, dates, boxed primitives and functions.

use std::borrow::Cow;

use crate::error::AvmError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::NativeFunction;
use crate::interpreter::closure::Closure;
use crate::prelude::*;
use crate::value::{AvmString, AvmValue, CheapClone};

/// Shared reference to any object
pub type ObjectRef = Rc<dyn AvmObject>;

/// Maximum number of prototype hops followed during lookup
const MAX_PROTOTYPE_DEPTH: usize = 256;

/// Array indices above this are stored as ordinary properties
const MAX_DENSE_INDEX: usize = 1 << 24;

/// A namespace-qualified property name.
///
/// Names with no namespace (or an empty one) are public and map to the bare
/// name; qualified names map to `namespace::name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiname<'a> {
    pub namespace: Option<&'a str>,
    pub name: &'a str,
}

impl<'a> Multiname<'a> {
    pub fn public(name: &'a str) -> Self {
        Self {
            namespace: None,
            name,
        }
    }

    pub fn qualified(namespace: &'a str, name: &'a str) -> Self {
        Self {
            namespace: Some(namespace),
            name,
        }
    }

    /// The single storage key this name resolves to
    pub fn key(&self) -> Cow<'a, str> {
        match self.namespace {
            Some(ns) if !ns.is_empty() => Cow::Owned(format!("{}::{}", ns, self.name)),
            _ => Cow::Borrowed(self.name),
        }
    }
}

/// Coarse classification of an object, used by TypeOf and tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Object,
    Array,
    Function,
    Date,
    Boxed,
    MovieClip,
}

/// Capability interface implemented by every object variant.
///
/// Implementors provide own-property storage; prototype-chain traversal
/// and qualified-name handling are shared.
pub trait AvmObject: fmt::Debug {
    /// Read an own property
    fn get_own(&self, key: &str) -> Option<AvmValue>;

    /// Write an own property, creating an enumerable one if absent
    fn set_own(&self, key: &str, value: AvmValue);

    fn has_own(&self, key: &str) -> bool;

    /// Remove an own property. Returns whether something was removed.
    fn delete_own(&self, key: &str) -> bool;

    /// Create or overwrite an own property that enumeration skips
    fn define_hidden(&self, key: &str, value: AvmValue);

    /// Own property names in insertion order
    fn own_keys(&self, enumerable_only: bool) -> Vec<AvmString>;

    fn prototype(&self) -> Option<ObjectRef>;

    fn set_prototype(&self, prototype: Option<ObjectRef>);

    fn kind(&self) -> ObjectKind;

    fn is_callable(&self) -> bool {
        false
    }

    /// Invoke the object as a function
    fn call(
        &self,
        _interp: &mut Interpreter,
        _this: AvmValue,
        _args: &[AvmValue],
    ) -> Result<AvmValue, AvmError> {
        Err(AvmError::script("object is not a function"))
    }

    /// Objects that build their own instances return `Some`; everything
    /// else is instantiated from its `prototype` property.
    fn construct(
        &self,
        _interp: &mut Interpreter,
        _args: &[AvmValue],
    ) -> Option<Result<ObjectRef, AvmError>> {
        None
    }

    /// Container lookup used by target paths
    fn lookup_child(&self, _name: &str) -> Option<ObjectRef> {
        None
    }

    /// Slash-syntax target path (`/a/b`) for movie clips
    fn target_path(&self) -> Option<AvmString> {
        None
    }

    /// Dotted instance path (`_level0.a.b`) for movie clips
    fn instance_path(&self) -> Option<AvmString> {
        None
    }

    /// The wrapped primitive of boxed values and dates
    fn primitive_value(&self) -> Option<AvmValue> {
        None
    }

    fn as_script_object(&self) -> Option<&ScriptObject> {
        None
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Qualified-name protocol
    // ═══════════════════════════════════════════════════════════════════════════

    /// Look a property up on the object and then its prototype chain
    fn get_property(&self, name: &Multiname<'_>) -> Option<AvmValue> {
        let key = name.key();
        if let Some(value) = self.get_own(&key) {
            return Some(value);
        }
        let mut current = self.prototype();
        for _ in 0..MAX_PROTOTYPE_DEPTH {
            let proto = current?;
            if let Some(value) = proto.get_own(&key) {
                return Some(value);
            }
            current = proto.prototype();
        }
        None
    }

    fn set_property(&self, name: &Multiname<'_>, value: AvmValue) {
        self.set_own(&name.key(), value);
    }

    fn has_property(&self, name: &Multiname<'_>) -> bool {
        let key = name.key();
        if self.has_own(&key) {
            return true;
        }
        let mut current = self.prototype();
        for _ in 0..MAX_PROTOTYPE_DEPTH {
            let Some(proto) = current else {
                return false;
            };
            if proto.has_own(&key) {
                return true;
            }
            current = proto.prototype();
        }
        false
    }

    fn delete_property(&self, name: &Multiname<'_>) -> bool {
        self.delete_own(&name.key())
    }
}

impl dyn AvmObject {
    /// Public property read
    pub fn get(&self, name: &str) -> Option<AvmValue> {
        self.get_property(&Multiname::public(name))
    }

    /// Public property write
    pub fn set(&self, name: &str, value: AvmValue) {
        self.set_property(&Multiname::public(name), value);
    }

    pub fn has(&self, name: &str) -> bool {
        self.has_property(&Multiname::public(name))
    }

    pub fn delete(&self, name: &str) -> bool {
        self.delete_property(&Multiname::public(name))
    }
}

/// Identity comparison of two object references
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Whether a property name is purely numeric
pub fn is_numeric_name(name: &str) -> bool {
    !name.trim().is_empty() && name.trim().parse::<f64>().is_ok_and(|n| n.is_finite())
}

/// Resolve `name` against `obj` the lenient way: exact match first, then a
/// case-insensitive scan of the names along the prototype chain. Numeric
/// names never take the case-insensitive path.
pub fn resolve_property(obj: &dyn AvmObject, name: &str) -> Option<AvmString> {
    if obj.has_property(&Multiname::public(name)) {
        return Some(AvmString::from(name));
    }
    if is_numeric_name(name) {
        return None;
    }

    let lower = name.to_lowercase();
    let matches = |key: &AvmString| key.as_str().to_lowercase() == lower;

    if let Some(found) = obj.own_keys(false).into_iter().find(matches) {
        return Some(found);
    }
    let mut current = obj.prototype();
    for _ in 0..MAX_PROTOTYPE_DEPTH {
        let proto = current?;
        if let Some(found) = proto.own_keys(false).into_iter().find(matches) {
            return Some(found);
        }
        current = proto.prototype();
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// ScriptObject
// ═══════════════════════════════════════════════════════════════════════════════

/// An own property slot
#[derive(Debug, Clone)]
pub struct Property {
    pub value: AvmValue,
    pub enumerable: bool,
}

/// Function payload of a callable ScriptObject
pub enum FunctionKind {
    /// Defined by DefineFunction / DefineFunction2
    Closure(Closure),
    /// Implemented in Rust
    Native(NativeFunction),
}

/// Variant-specific state of a ScriptObject
pub enum ExoticObject {
    Ordinary,
    Array(RefCell<Vec<AvmValue>>),
    /// Milliseconds since the Unix epoch (NaN for an invalid date)
    Date(Cell<f64>),
    /// A boxed boolean, number or string
    Primitive(AvmValue),
    Function(FunctionKind),
}

/// The object variant created by the interpreter itself
pub struct ScriptObject {
    properties: RefCell<IndexMap<AvmString, Property>>,
    prototype: RefCell<Option<ObjectRef>>,
    exotic: ExoticObject,
}

impl ScriptObject {
    fn with_exotic(prototype: Option<ObjectRef>, exotic: ExoticObject) -> Self {
        Self {
            properties: RefCell::new(index_map_new()),
            prototype: RefCell::new(prototype),
            exotic,
        }
    }

    /// Create an ordinary object
    pub fn new_plain(prototype: Option<ObjectRef>) -> Rc<Self> {
        Rc::new(Self::with_exotic(prototype, ExoticObject::Ordinary))
    }

    /// Create an array holding `elements`
    pub fn new_array(prototype: Option<ObjectRef>, elements: Vec<AvmValue>) -> Rc<Self> {
        Rc::new(Self::with_exotic(
            prototype,
            ExoticObject::Array(RefCell::new(elements)),
        ))
    }

    /// Create a date from a millisecond timestamp
    pub fn new_date(prototype: Option<ObjectRef>, millis: f64) -> Rc<Self> {
        Rc::new(Self::with_exotic(
            prototype,
            ExoticObject::Date(Cell::new(millis)),
        ))
    }

    /// Wrap a primitive value in an object
    pub fn new_boxed(prototype: Option<ObjectRef>, value: AvmValue) -> Rc<Self> {
        Rc::new(Self::with_exotic(prototype, ExoticObject::Primitive(value)))
    }

    /// Create a function object backed by a Rust function
    pub fn new_native_function(prototype: Option<ObjectRef>, native: NativeFunction) -> Rc<Self> {
        Rc::new(Self::with_exotic(
            prototype,
            ExoticObject::Function(FunctionKind::Native(native)),
        ))
    }

    /// Create a function object whose payload needs a weak handle to the
    /// object itself
    pub fn new_function_cyclic(
        prototype: Option<ObjectRef>,
        build: impl FnOnce(&Weak<ScriptObject>) -> FunctionKind,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak| {
            Self::with_exotic(prototype, ExoticObject::Function(build(weak)))
        })
    }

    pub fn exotic(&self) -> &ExoticObject {
        &self.exotic
    }

    /// Define an enumerable own property
    pub fn define_value(&self, key: &str, value: AvmValue) {
        self.properties.borrow_mut().insert(
            AvmString::from(key),
            Property {
                value,
                enumerable: true,
            },
        );
    }

    pub fn as_closure(&self) -> Option<&Closure> {
        match &self.exotic {
            ExoticObject::Function(FunctionKind::Closure(closure)) => Some(closure),
            _ => None,
        }
    }

    pub fn as_native(&self) -> Option<&NativeFunction> {
        match &self.exotic {
            ExoticObject::Function(FunctionKind::Native(native)) => Some(native),
            _ => None,
        }
    }

    /// Snapshot of the elements of an array object
    pub fn array_elements(&self) -> Option<Vec<AvmValue>> {
        match &self.exotic {
            ExoticObject::Array(elements) => Some(elements.borrow().clone()),
            _ => None,
        }
    }

    /// Append to an array object. Returns the new length.
    pub fn array_push(&self, value: AvmValue) -> Option<usize> {
        match &self.exotic {
            ExoticObject::Array(elements) => {
                let mut elements = elements.borrow_mut();
                elements.push(value);
                Some(elements.len())
            }
            _ => None,
        }
    }

    /// Remove the last element of an array object. `None` for non-arrays,
    /// `Some(Undefined)` for an empty array.
    pub fn array_pop(&self) -> Option<AvmValue> {
        match &self.exotic {
            ExoticObject::Array(elements) => Some(elements.borrow_mut().pop().unwrap_or_default()),
            _ => None,
        }
    }

    /// Replace the elements of an array object. Returns false for non-arrays.
    pub fn set_array_elements(&self, new_elements: Vec<AvmValue>) -> bool {
        match &self.exotic {
            ExoticObject::Array(elements) => {
                *elements.borrow_mut() = new_elements;
                true
            }
            _ => false,
        }
    }

    pub fn date_value(&self) -> Option<f64> {
        match &self.exotic {
            ExoticObject::Date(millis) => Some(millis.get()),
            _ => None,
        }
    }

    pub fn set_date_value(&self, value: f64) {
        if let ExoticObject::Date(millis) = &self.exotic {
            millis.set(value);
        }
    }

    fn array_get(&self, key: &str) -> Option<AvmValue> {
        let ExoticObject::Array(elements) = &self.exotic else {
            return None;
        };
        if key == "length" {
            return Some(AvmValue::Number(elements.borrow().len() as f64));
        }
        let index = array_index(key)?;
        elements.borrow().get(index).cloned()
    }

    /// Returns true when the write was absorbed by the array storage
    fn array_set(&self, key: &str, value: &AvmValue) -> bool {
        let ExoticObject::Array(elements) = &self.exotic else {
            return false;
        };
        if key == "length" {
            let new_len = match value {
                AvmValue::Number(n) if *n >= 0.0 && n.is_finite() => {
                    (n.trunc() as usize).min(MAX_DENSE_INDEX)
                }
                _ => return true,
            };
            elements.borrow_mut().resize(new_len, AvmValue::Undefined);
            return true;
        }
        let Some(index) = array_index(key) else {
            return false;
        };
        if index >= MAX_DENSE_INDEX {
            return false;
        }
        let mut elements = elements.borrow_mut();
        if index >= elements.len() {
            elements.resize(index + 1, AvmValue::Undefined);
        }
        if let Some(slot) = elements.get_mut(index) {
            *slot = value.clone();
        }
        true
    }
}

/// Parse a canonical array index ("0", "17"; not "017" or "-1")
fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.exotic {
            ExoticObject::Ordinary => write!(f, "{{{} props}}", self.properties.borrow().len()),
            ExoticObject::Array(elements) => write!(f, "[{} elements]", elements.borrow().len()),
            ExoticObject::Date(millis) => write!(f, "Date({})", millis.get()),
            ExoticObject::Primitive(value) => write!(f, "Boxed({:?})", value),
            ExoticObject::Function(FunctionKind::Closure(closure)) => {
                write!(f, "[Function: {}]", closure.name().unwrap_or("anonymous"))
            }
            ExoticObject::Function(FunctionKind::Native(native)) => {
                write!(f, "[Function: {}]", native.name)
            }
        }
    }
}

impl AvmObject for ScriptObject {
    fn get_own(&self, key: &str) -> Option<AvmValue> {
        match &self.exotic {
            ExoticObject::Array(_) => {
                if let Some(value) = self.array_get(key) {
                    return Some(value);
                }
            }
            ExoticObject::Primitive(AvmValue::String(s)) if key == "length" => {
                return Some(AvmValue::Number(s.char_count() as f64));
            }
            _ => {}
        }
        self.properties.borrow().get(key).map(|p| p.value.clone())
    }

    fn set_own(&self, key: &str, value: AvmValue) {
        if self.array_set(key, &value) {
            return;
        }
        let mut properties = self.properties.borrow_mut();
        if let Some(existing) = properties.get_mut(key) {
            existing.value = value;
        } else {
            properties.insert(
                AvmString::from(key),
                Property {
                    value,
                    enumerable: true,
                },
            );
        }
    }

    fn has_own(&self, key: &str) -> bool {
        match &self.exotic {
            ExoticObject::Array(elements) => {
                if key == "length" {
                    return true;
                }
                if array_index(key).is_some_and(|i| i < elements.borrow().len()) {
                    return true;
                }
            }
            ExoticObject::Primitive(AvmValue::String(_)) if key == "length" => return true,
            _ => {}
        }
        self.properties.borrow().contains_key(key)
    }

    fn delete_own(&self, key: &str) -> bool {
        if let ExoticObject::Array(elements) = &self.exotic {
            if let Some(index) = array_index(key) {
                if let Some(slot) = elements.borrow_mut().get_mut(index) {
                    *slot = AvmValue::Undefined;
                    return true;
                }
            }
        }
        self.properties.borrow_mut().shift_remove(key).is_some()
    }

    fn define_hidden(&self, key: &str, value: AvmValue) {
        self.properties.borrow_mut().insert(
            AvmString::from(key),
            Property {
                value,
                enumerable: false,
            },
        );
    }

    fn own_keys(&self, enumerable_only: bool) -> Vec<AvmString> {
        let mut keys = Vec::new();
        if let ExoticObject::Array(elements) = &self.exotic {
            let len = elements.borrow().len();
            keys.extend((0..len).map(|i| AvmString::from(i.to_string())));
        }
        keys.extend(
            self.properties
                .borrow()
                .iter()
                .filter(|(_, p)| p.enumerable || !enumerable_only)
                .map(|(k, _)| k.cheap_clone()),
        );
        keys
    }

    fn prototype(&self) -> Option<ObjectRef> {
        self.prototype.borrow().clone()
    }

    fn set_prototype(&self, prototype: Option<ObjectRef>) {
        *self.prototype.borrow_mut() = prototype;
    }

    fn kind(&self) -> ObjectKind {
        match &self.exotic {
            ExoticObject::Ordinary => ObjectKind::Object,
            ExoticObject::Array(_) => ObjectKind::Array,
            ExoticObject::Date(_) => ObjectKind::Date,
            ExoticObject::Primitive(_) => ObjectKind::Boxed,
            ExoticObject::Function(_) => ObjectKind::Function,
        }
    }

    fn is_callable(&self) -> bool {
        matches!(self.exotic, ExoticObject::Function(_))
    }

    fn call(
        &self,
        interp: &mut Interpreter,
        this: AvmValue,
        args: &[AvmValue],
    ) -> Result<AvmValue, AvmError> {
        match &self.exotic {
            ExoticObject::Function(FunctionKind::Closure(closure)) => {
                closure.invoke(interp, this, args)
            }
            ExoticObject::Function(FunctionKind::Native(native)) => {
                let ctx = interp
                    .current_context()
                    .ok_or_else(|| AvmError::script("no active execution context"))?;
                (native.func)(interp, &ctx, this, args)
            }
            _ => Err(AvmError::script("object is not a function")),
        }
    }

    fn primitive_value(&self) -> Option<AvmValue> {
        match &self.exotic {
            ExoticObject::Primitive(value) => Some(value.clone()),
            ExoticObject::Date(millis) => Some(AvmValue::Number(millis.get())),
            _ => None,
        }
    }

    fn as_script_object(&self) -> Option<&ScriptObject> {
        Some(self)
    }
}
