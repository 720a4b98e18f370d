//! Value coercions that may call back into script code
//!
//! Primitive conversions live on [`AvmValue`]; the ones here first reduce
//! objects to primitives, which can run user `valueOf`/`toString` methods.

use super::Interpreter;
use crate::context::ExecutionContext;
use crate::error::AvmError;
use crate::object::{ObjectKind, ObjectRef, ScriptObject, resolve_property, same_object};
use crate::prelude::*;
use crate::value::{AvmString, AvmValue, CheapClone, to_int32};

impl Interpreter {
    /// Reduce an object to a primitive through its wrapped value or a
    /// callable `valueOf`. Objects without either are returned unchanged.
    pub fn to_primitive(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        value: &AvmValue,
    ) -> Result<AvmValue, AvmError> {
        let AvmValue::Object(obj) = value else {
            return Ok(value.clone());
        };
        if let Some(primitive) = obj.primitive_value() {
            return Ok(primitive);
        }
        if let Some(AvmValue::Object(value_of)) = obj.get("valueOf") {
            if value_of.is_callable() {
                let result = self.with_context(ctx, |interp| {
                    value_of.call(interp, value.clone(), &[])
                })?;
                if !matches!(result, AvmValue::Object(_)) {
                    return Ok(result);
                }
            }
        }
        Ok(value.clone())
    }

    /// Primitive conversion used by Add2: dates prefer their string form
    /// from version 6 on.
    pub fn to_add_primitive(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        value: &AvmValue,
    ) -> Result<AvmValue, AvmError> {
        if let AvmValue::Object(obj) = value {
            if obj.kind() == ObjectKind::Date && ctx.version() >= 6 {
                return Ok(AvmValue::String(self.to_string(ctx, value)?));
            }
        }
        self.to_primitive(ctx, value)
    }

    pub fn to_number(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        value: &AvmValue,
    ) -> Result<f64, AvmError> {
        if let AvmValue::Number(n) = value {
            return Ok(*n);
        }
        let primitive = self.to_primitive(ctx, value)?;
        Ok(primitive.primitive_to_number(ctx.version()))
    }

    pub fn to_int32(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        value: &AvmValue,
    ) -> Result<i32, AvmError> {
        Ok(to_int32(self.to_number(ctx, value)?))
    }

    /// String conversion: movie clips give their instance path, functions
    /// `[type Function]`, other objects the result of a callable `toString`.
    pub fn to_string(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        value: &AvmValue,
    ) -> Result<AvmString, AvmError> {
        let AvmValue::Object(obj) = value else {
            return Ok(value.primitive_to_string(ctx.version()));
        };
        if obj.instance_path().is_some() || obj.is_callable() {
            return Ok(value.primitive_to_string(ctx.version()));
        }
        if let Some(AvmValue::Object(to_string)) = obj.get("toString") {
            if to_string.is_callable() {
                let result = self.with_context(ctx, |interp| {
                    to_string.call(interp, value.clone(), &[])
                })?;
                if let AvmValue::String(s) = result {
                    return Ok(s);
                }
            }
        }
        Ok(value.primitive_to_string(ctx.version()))
    }

    /// Abstract less-than: string comparison when both sides are strings,
    /// numeric otherwise. NaN compares false.
    pub fn less_than(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        x: &AvmValue,
        y: &AvmValue,
    ) -> Result<bool, AvmError> {
        let x = self.to_primitive(ctx, x)?;
        let y = self.to_primitive(ctx, y)?;
        if let (AvmValue::String(a), AvmValue::String(b)) = (&x, &y) {
            return Ok(a < b);
        }
        let version = ctx.version();
        Ok(x.primitive_to_number(version) < y.primitive_to_number(version))
    }

    /// Loose equality (Equals2)
    pub fn loose_equals(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        x: &AvmValue,
        y: &AvmValue,
    ) -> Result<bool, AvmError> {
        match (x, y) {
            (AvmValue::Object(a), AvmValue::Object(b)) => Ok(same_object(a, b)),
            (AvmValue::Object(_), other) | (other, AvmValue::Object(_))
                if other.is_null_or_undefined() =>
            {
                Ok(false)
            }
            (AvmValue::Object(_), _) => match self.to_primitive(ctx, x)? {
                AvmValue::Object(_) => Ok(false),
                x => Ok(x.loose_equals_primitive(y)),
            },
            (_, AvmValue::Object(_)) => match self.to_primitive(ctx, y)? {
                AvmValue::Object(_) => Ok(false),
                y => Ok(x.loose_equals_primitive(&y)),
            },
            _ => Ok(x.loose_equals_primitive(y)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Objects
    // ═══════════════════════════════════════════════════════════════════════════

    /// Wrap a boolean, number or string in an object with the matching
    /// prototype
    pub fn box_primitive(&self, ctx: &ExecutionContext, value: &AvmValue) -> Option<ObjectRef> {
        let prototypes = ctx.prototypes();
        let proto = match value {
            AvmValue::Boolean(_) => &prototypes.boolean,
            AvmValue::Number(_) => &prototypes.number,
            AvmValue::String(_) => &prototypes.string,
            _ => return None,
        };
        Some(ScriptObject::new_boxed(Some(proto.cheap_clone()), value.clone()))
    }

    /// Object view of a value for member access: objects as-is, primitives
    /// boxed, everything else none
    pub fn to_object(&self, ctx: &ExecutionContext, value: &AvmValue) -> Option<ObjectRef> {
        match value {
            AvmValue::Object(obj) => Some(obj.cheap_clone()),
            other => self.box_primitive(ctx, other),
        }
    }

    /// Member read with lenient name resolution
    pub fn get_member(&self, ctx: &ExecutionContext, value: &AvmValue, name: &str) -> AvmValue {
        let Some(obj) = self.to_object(ctx, value) else {
            return AvmValue::Undefined;
        };
        resolve_property(&*obj, name)
            .and_then(|resolved| obj.get(resolved.as_str()))
            .unwrap_or_default()
    }

    /// Prototype-chain membership test, also honouring interfaces recorded
    /// by ImplementsOp. Primitives are boxed first when `box_primitives`.
    pub fn instance_of(
        &self,
        ctx: &ExecutionContext,
        value: &AvmValue,
        constructor: &AvmValue,
        box_primitives: bool,
    ) -> bool {
        let Some(constructor) = constructor.as_object() else {
            return false;
        };
        let Some(AvmValue::Object(target_proto)) = constructor.get("prototype") else {
            return false;
        };
        let obj = match value {
            AvmValue::Object(obj) => obj.cheap_clone(),
            other if box_primitives => match self.box_primitive(ctx, other) {
                Some(boxed) => boxed,
                None => return false,
            },
            _ => return false,
        };

        let mut current = obj.prototype();
        let mut hops = 0;
        while let Some(proto) = current {
            if same_object(&proto, &target_proto) {
                return true;
            }
            if implements(&proto, constructor) {
                return true;
            }
            hops += 1;
            if hops > 256 {
                break;
            }
            current = proto.prototype();
        }
        false
    }
}

/// Whether the class owning `proto` lists `interface` among its interfaces
fn implements(proto: &ObjectRef, interface: &ObjectRef) -> bool {
    let Some(AvmValue::Object(class)) = proto.get_own("constructor") else {
        return false;
    };
    let Some(AvmValue::Object(list)) = class.get_own("__interfaces") else {
        return false;
    };
    list.as_script_object()
        .and_then(ScriptObject::array_elements)
        .is_some_and(|items| {
            items
                .iter()
                .any(|item| item.as_object().is_some_and(|i| same_object(i, interface)))
        })
}
