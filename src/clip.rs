//! Display-list movie clips
//!
//! A minimal movie clip: a named node in a tree of clips with its own
//! property storage. Hosts with a real display list implement
//! [`AvmObject`] on their own clip type; this one backs the command line
//! runner and the tests.

use crate::object::{AvmObject, ObjectKind, ObjectRef, ScriptObject};
use crate::prelude::*;
use crate::value::{AvmString, AvmValue, CheapClone};

/// Clip property names addressed by index in GetProperty / SetProperty
pub const CLIP_PROPERTY_NAMES: [&str; 22] = [
    "_x",
    "_y",
    "_xscale",
    "_yscale",
    "_currentframe",
    "_totalframes",
    "_alpha",
    "_visible",
    "_width",
    "_height",
    "_rotation",
    "_target",
    "_framesloaded",
    "_name",
    "_droptarget",
    "_url",
    "_highquality",
    "_focusrect",
    "_soundbuftime",
    "_quality",
    "_xmouse",
    "_ymouse",
];

/// A movie clip in a display tree
pub struct DisplayClip {
    name: AvmString,
    level: u32,
    parent: Option<Weak<DisplayClip>>,
    children: RefCell<IndexMap<AvmString, Rc<DisplayClip>>>,
    properties: Rc<ScriptObject>,
}

impl DisplayClip {
    /// Create the root clip of level `level`
    pub fn new_root(level: u32, prototype: Option<ObjectRef>) -> Rc<Self> {
        Rc::new(Self {
            name: AvmString::from(format!("_level{}", level)),
            level,
            parent: None,
            children: RefCell::new(index_map_new()),
            properties: ScriptObject::new_plain(prototype),
        })
    }

    /// Create and attach a named child clip
    pub fn add_child(self: &Rc<Self>, name: &str) -> Rc<DisplayClip> {
        let child = Rc::new(Self {
            name: AvmString::from(name),
            level: self.level,
            parent: Some(Rc::downgrade(self)),
            children: RefCell::new(index_map_new()),
            properties: ScriptObject::new_plain(self.properties.prototype()),
        });
        self.children
            .borrow_mut()
            .insert(AvmString::from(name), child.cheap_clone());
        child
    }

    /// Detach a child clip
    pub fn remove_child(&self, name: &str) -> bool {
        self.children.borrow_mut().shift_remove(name).is_some()
    }

    pub fn name(&self) -> &AvmString {
        &self.name
    }

    pub fn parent(&self) -> Option<Rc<DisplayClip>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn child(&self, name: &str) -> Option<Rc<DisplayClip>> {
        let children = self.children.borrow();
        if let Some(child) = children.get(name) {
            return Some(child.cheap_clone());
        }
        let lower = name.to_lowercase();
        children
            .iter()
            .find(|(key, _)| key.as_str().to_lowercase() == lower)
            .map(|(_, child)| child.cheap_clone())
    }

    /// Names from the root down to this clip, root excluded
    fn path_segments(&self) -> Vec<AvmString> {
        let mut segments = Vec::new();
        if self.parent.is_some() {
            segments.push(self.name.cheap_clone());
        }
        let mut current = self.parent();
        while let Some(clip) = current {
            if clip.parent.is_some() {
                segments.push(clip.name.cheap_clone());
            }
            current = clip.parent();
        }
        segments.reverse();
        segments
    }
}

impl fmt::Debug for DisplayClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayClip({})", self.name)
    }
}

impl AvmObject for DisplayClip {
    fn get_own(&self, key: &str) -> Option<AvmValue> {
        match key {
            "_name" => return Some(AvmValue::String(self.name.cheap_clone())),
            "_target" => return self.target_path().map(AvmValue::String),
            "_parent" => {
                return self
                    .parent()
                    .map(|p| AvmValue::Object(p as ObjectRef));
            }
            _ => {}
        }
        if let Some(value) = self.properties.get_own(key) {
            return Some(value);
        }
        self.children
            .borrow()
            .get(key)
            .map(|child| AvmValue::Object(child.cheap_clone() as ObjectRef))
    }

    fn set_own(&self, key: &str, value: AvmValue) {
        if matches!(key, "_name" | "_target" | "_parent") {
            return;
        }
        self.properties.set_own(key, value);
    }

    fn has_own(&self, key: &str) -> bool {
        matches!(key, "_name" | "_target")
            || (key == "_parent" && self.parent.is_some())
            || self.properties.has_own(key)
            || self.children.borrow().contains_key(key)
    }

    fn delete_own(&self, key: &str) -> bool {
        self.properties.delete_own(key)
    }

    fn define_hidden(&self, key: &str, value: AvmValue) {
        self.properties.define_hidden(key, value);
    }

    fn own_keys(&self, enumerable_only: bool) -> Vec<AvmString> {
        let mut keys = self.properties.own_keys(enumerable_only);
        keys.extend(self.children.borrow().keys().map(CheapClone::cheap_clone));
        keys
    }

    fn prototype(&self) -> Option<ObjectRef> {
        self.properties.prototype()
    }

    fn set_prototype(&self, prototype: Option<ObjectRef>) {
        self.properties.set_prototype(prototype);
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::MovieClip
    }

    fn lookup_child(&self, name: &str) -> Option<ObjectRef> {
        if name == "_parent" {
            return self.parent().map(|p| p as ObjectRef);
        }
        self.child(name).map(|c| c as ObjectRef)
    }

    fn target_path(&self) -> Option<AvmString> {
        let segments = self.path_segments();
        if segments.is_empty() {
            return Some(AvmString::from("/"));
        }
        let mut path = String::new();
        for segment in &segments {
            path.push('/');
            path.push_str(segment.as_str());
        }
        Some(AvmString::from(path))
    }

    fn instance_path(&self) -> Option<AvmString> {
        let mut path = format!("_level{}", self.level);
        for segment in self.path_segments() {
            path.push('.');
            path.push_str(segment.as_str());
        }
        Some(AvmString::from(path))
    }
}
