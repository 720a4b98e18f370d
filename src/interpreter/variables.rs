//! Variable resolution against the scope chain
//!
//! Lookups try, in order: the innermost scope, a qualified path
//! (`/clip:var` or `a.b.c`), the rest of the chain, the `this` object and
//! finally the children of the default target.

use super::frame::ActionFrame;
use crate::context::{ExecutionContext, lookup_target_path};
use crate::error::AvmError;
use crate::object::{ObjectKind, ObjectRef, resolve_property};
use crate::value::{AvmString, AvmValue, CheapClone};

/// Read a variable
pub(super) fn get_variable(
    ctx: &ExecutionContext,
    frame: &ActionFrame,
    name: &str,
) -> Result<AvmValue, AvmError> {
    let scope = frame.scope_object();
    if scope.has(name) {
        return Ok(scope.get(name).unwrap_or_default());
    }

    if let Some((obj, resolved)) = resolve_qualified(ctx, name, false)? {
        return Ok(obj.get(resolved.as_str()).unwrap_or_default());
    }

    if let Some((obj, resolved)) = frame.scope.find_declaring(name) {
        return Ok(obj.get(resolved.as_str()).unwrap_or_default());
    }

    if let Some(this) = this_object(frame) {
        if let Some(resolved) = resolve_property(&*this, name) {
            return Ok(this.get(resolved.as_str()).unwrap_or_default());
        }
    }

    let child = ctx
        .default_target()
        .filter(|target| target.kind() == ObjectKind::MovieClip)
        .and_then(|target| target.lookup_child(name));
    Ok(child.map(AvmValue::Object).unwrap_or_default())
}

/// Assign a variable. Unknown names are created on `this`, or on the
/// innermost scope when there is no `this`; assignments never create
/// globals implicitly.
pub(super) fn set_variable(
    ctx: &ExecutionContext,
    frame: &ActionFrame,
    name: &str,
    value: AvmValue,
) -> Result<(), AvmError> {
    let scope = frame.scope_object();
    if scope.has(name) {
        scope.set(name, value);
        return Ok(());
    }

    if let Some((obj, resolved)) = resolve_qualified(ctx, name, true)? {
        obj.set(resolved.as_str(), value);
        return Ok(());
    }

    let this = this_object(frame);
    if let Some(this) = &this {
        if let Some(resolved) = resolve_property(&**this, name) {
            this.set(resolved.as_str(), value);
            return Ok(());
        }
    }

    if let Some((obj, resolved)) = frame.scope.find_declaring_local(name) {
        obj.set(resolved.as_str(), value);
        return Ok(());
    }

    this.unwrap_or_else(|| scope.cheap_clone()).set(name, value);
    Ok(())
}

/// Delete the first declaration of `name` along the chain
pub(super) fn delete_variable(frame: &ActionFrame, name: &str) -> bool {
    for node in frame.scope.iter() {
        let scope = node.scope();
        if scope.has(name) {
            scope.set(name, AvmValue::Undefined);
            return scope.delete(name);
        }
    }
    false
}

/// The value of `this` visible from the current scope
pub(super) fn this_value(frame: &ActionFrame) -> AvmValue {
    if let Some(this) = frame.scope_object().get("this") {
        if this.to_boolean() {
            return this;
        }
    }
    frame
        .scope
        .find_declaring("this")
        .and_then(|(obj, resolved)| obj.get(resolved.as_str()))
        .unwrap_or_default()
}

fn this_object(frame: &ActionFrame) -> Option<ObjectRef> {
    match this_value(frame) {
        AvmValue::Object(obj) => Some(obj),
        _ => None,
    }
}

/// Resolve `/path:name` and `a.b.name` references to the holding object
/// and property name. Plain names yield `None`.
///
/// With `non_strict`, a property that does not exist yet still resolves,
/// so assignments can create it.
fn resolve_qualified(
    ctx: &ExecutionContext,
    name: &str,
    non_strict: bool,
) -> Result<Option<(ObjectRef, AvmString)>, AvmError> {
    let (obj, property) = if let Some((path, property)) = name.split_once(':') {
        let obj = lookup_target_path(path, ctx.default_target().as_ref(), ctx.root().as_ref())?;
        (obj, property)
    } else if let Some((path, property)) = name.rsplit_once('.') {
        let mut obj = ctx.globals().cheap_clone();
        let mut walked = String::new();
        for segment in path.split('.') {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);
            obj = match obj.get(segment) {
                Some(AvmValue::Object(next)) => next,
                _ => return Err(AvmError::script(format!("{} is undefined", walked))),
            };
        }
        (obj, property)
    } else {
        return Ok(None);
    };

    match resolve_property(&*obj, property) {
        Some(resolved) => Ok(Some((obj, resolved))),
        None if non_strict => Ok(Some((obj, AvmString::from(property)))),
        None => Ok(None),
    }
}

/// SetTarget: retarget timeline actions to the clip at `path`, relative to
/// the target in effect when the block was entered. An empty path restores
/// that target; a failed lookup leaves no target at all.
pub(super) fn set_target(
    ctx: &ExecutionContext,
    frame: &ActionFrame,
    path: &str,
) -> Result<(), AvmError> {
    if path.is_empty() {
        ctx.set_default_target(frame.base_target.clone());
        return Ok(());
    }
    match lookup_target_path(path, frame.base_target.as_ref(), ctx.root().as_ref()) {
        Ok(target) => {
            ctx.set_default_target(Some(target));
            Ok(())
        }
        Err(err) => {
            ctx.set_default_target(None);
            Err(err)
        }
    }
}
