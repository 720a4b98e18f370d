//! Per-invocation state of the decode-execute loop

use crate::error::AvmError;
use crate::object::ObjectRef;
use crate::prelude::*;
use crate::reader::{ActionBlock, ActionReader};
use crate::scope::ScopeChain;
use crate::value::{AvmString, AvmValue, CheapClone};

/// Completion record of an action block
#[derive(Debug)]
pub enum Completion {
    /// Ran off the end of the block (or hit an End action)
    Normal,
    /// A Return action fired, possibly inside a nested with/try block
    Return(AvmValue),
}

/// Result of executing a single action
pub(crate) enum Step {
    Continue,
    Return(AvmValue),
    End,
}

/// Register file of one closure invocation. Slots read as `undefined`
/// until written; there are at most 256 of them.
#[derive(Debug, Default)]
pub struct RegisterFile {
    slots: Vec<AvmValue>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(count: u8) -> Self {
        Self {
            slots: Vec::with_capacity(count as usize),
        }
    }

    pub fn get(&self, index: u8) -> AvmValue {
        self.slots.get(index as usize).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, index: u8, value: AvmValue) {
        let index = index as usize;
        if index >= self.slots.len() {
            self.slots.resize(index + 1, AvmValue::Undefined);
        }
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = value;
        }
    }
}

/// String table installed by the ConstantPool action
#[derive(Clone, Default)]
pub struct ConstantPool(Rc<[AvmString]>);

impl CheapClone for ConstantPool {}

impl ConstantPool {
    pub fn new(entries: Vec<AvmString>) -> Self {
        ConstantPool(entries.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Entry `index`, or `undefined` when the pool has no such entry
    pub fn get(&self, index: usize) -> AvmValue {
        self.0
            .get(index)
            .map(|s| AvmValue::String(s.cheap_clone()))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ConstantPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstantPool({} entries)", self.0.len())
    }
}

/// State of one `interpret_actions` call: the reader, operand stack,
/// scope chain and constant pool. Registers live outside the frame because
/// nested with/try blocks share them with their parent.
pub(crate) struct ActionFrame {
    pub reader: ActionReader,
    pub stack: Vec<AvmValue>,
    pub scope: ScopeChain,
    pub constant_pool: ConstantPool,
    /// Default target when this block was entered
    pub base_target: Option<ObjectRef>,
    /// Offset of the action currently executing
    pub action_position: usize,
    /// Offset of the next action, computed before the current one runs
    pub next_position: usize,
}

impl ActionFrame {
    pub fn new(
        block: ActionBlock,
        version: u8,
        scope: ScopeChain,
        constant_pool: ConstantPool,
        base_target: Option<ObjectRef>,
    ) -> Self {
        Self {
            reader: ActionReader::new(block, version),
            stack: Vec::new(),
            scope,
            constant_pool,
            base_target,
            action_position: 0,
            next_position: 0,
        }
    }

    /// The innermost scope object
    pub fn scope_object(&self) -> &ObjectRef {
        self.scope.scope()
    }

    pub fn push(&mut self, value: impl Into<AvmValue>) {
        self.stack.push(value.into());
    }

    pub fn pop(&mut self) -> Result<AvmValue, AvmError> {
        self.stack.pop().ok_or_else(|| self.underflow())
    }

    pub fn peek(&self) -> Result<&AvmValue, AvmError> {
        self.stack.last().ok_or_else(|| self.underflow())
    }

    fn underflow(&self) -> AvmError {
        AvmError::decode("operand stack underflow", self.action_position)
    }

    /// Pop an element count and validate it against what the stack holds.
    /// `per_item` is the number of stack slots each counted item occupies.
    pub fn pop_count(&mut self, per_item: usize) -> Result<usize, AvmError> {
        let raw = self.pop()?;
        let count = match &raw {
            AvmValue::Number(n) => *n,
            other => other.primitive_to_number(7),
        };
        let available = self.stack.len() / per_item.max(1);
        if count.is_nan() || count < 0.0 || count.fract() != 0.0 || count > available as f64 {
            return Err(AvmError::decode(
                format!("Invalid number of arguments: {:?}", raw),
                self.action_position,
            ));
        }
        Ok(count as usize)
    }

    /// Pop an argument count followed by that many values. The first value
    /// popped becomes the first argument.
    pub fn pop_args(&mut self) -> Result<Vec<AvmValue>, AvmError> {
        let count = self.pop_count(1)?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.pop()?);
        }
        Ok(args)
    }
}
