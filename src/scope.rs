//! Scope chain
//!
//! A singly linked list of scope objects, innermost first. Nodes are shared:
//! every closure keeps the chain it was defined in, and pushing a scope
//! never touches existing nodes, so chains form a tree with shared suffixes.

use crate::object::{ObjectRef, resolve_property};
use crate::prelude::*;
use crate::value::{AvmString, CheapClone};

struct ScopeNode {
    scope: ObjectRef,
    parent: Option<ScopeChain>,
}

/// Handle to the innermost node of a scope chain
#[derive(Clone)]
pub struct ScopeChain(Rc<ScopeNode>);

impl CheapClone for ScopeChain {}

impl ScopeChain {
    /// A chain with a single (outermost) scope
    pub fn new(scope: ObjectRef) -> Self {
        ScopeChain(Rc::new(ScopeNode {
            scope,
            parent: None,
        }))
    }

    /// A new chain with `scope` in front of this one
    pub fn push(&self, scope: ObjectRef) -> Self {
        ScopeChain(Rc::new(ScopeNode {
            scope,
            parent: Some(self.cheap_clone()),
        }))
    }

    /// The innermost scope object
    pub fn scope(&self) -> &ObjectRef {
        &self.0.scope
    }

    pub fn parent(&self) -> Option<&ScopeChain> {
        self.0.parent.as_ref()
    }

    /// Whether this node is the outermost (global) one
    pub fn is_outermost(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Iterate nodes from innermost to outermost
    pub fn iter(&self) -> ScopeIter<'_> {
        ScopeIter { next: Some(self) }
    }

    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// First scope declaring `name` (leniently resolved), with the resolved name
    pub fn find_declaring(&self, name: &str) -> Option<(ObjectRef, AvmString)> {
        self.iter().find_map(|node| {
            resolve_property(&**node.scope(), name).map(|n| (node.scope().cheap_clone(), n))
        })
    }

    /// Like [`find_declaring`](Self::find_declaring), but never returns the
    /// outermost scope. Assignments use this so they do not leak into globals.
    pub fn find_declaring_local(&self, name: &str) -> Option<(ObjectRef, AvmString)> {
        self.iter()
            .filter(|node| !node.is_outermost())
            .find_map(|node| {
                resolve_property(&**node.scope(), name).map(|n| (node.scope().cheap_clone(), n))
            })
    }
}

impl fmt::Debug for ScopeChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeChain(depth={})", self.depth())
    }
}

pub struct ScopeIter<'a> {
    next: Option<&'a ScopeChain>,
}

impl<'a> Iterator for ScopeIter<'a> {
    type Item = &'a ScopeChain;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}
