//! Error types for the action interpreter

use thiserror::Error;

use crate::object::ScriptObject;
use crate::value::{AvmString, AvmValue};

/// The condition that caused a context to be disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CriticalKind {
    /// The wall-clock budget of a top-level invocation ran out
    #[error("long running script -- AVM1 instruction hang timeout")]
    HangTimeout,
    /// Closure invocations nested deeper than the recursion limit
    #[error("long running script -- AVM1 recursion limit is reached")]
    RecursionLimit,
    /// With and Try bodies nested deeper than the block nesting limit
    #[error("long running script -- AVM1 block nesting limit is reached")]
    NestingLimit,
    /// More recovered script errors than the configured budget
    #[error("long running script -- AVM1 errors limit is reached")]
    ErrorBudget,
}

/// Main error type for the interpreter
#[derive(Debug, Error)]
pub enum AvmError {
    /// The byte stream is malformed; the current invocation cannot continue
    #[error("DecodeError: {message} at offset {position}")]
    Decode { message: String, position: usize },

    /// A host-level fault while executing a single action
    #[error("ScriptError: {message}")]
    Script { message: String },

    /// A value thrown by the script with the Throw action
    #[error("Thrown: {value:?}")]
    Thrown { value: AvmValue },

    /// A guard fired; the owning context is disabled for good
    #[error("CriticalError: {0}")]
    Critical(CriticalKind),
}

impl AvmError {
    pub fn decode(message: impl Into<String>, position: usize) -> Self {
        AvmError::Decode {
            message: message.into(),
            position,
        }
    }

    pub fn script(message: impl Into<String>) -> Self {
        AvmError::Script {
            message: message.into(),
        }
    }

    pub fn thrown(value: AvmValue) -> Self {
        AvmError::Thrown { value }
    }

    pub fn critical(kind: CriticalKind) -> Self {
        AvmError::Critical(kind)
    }

    /// Whether this error is a critical one (context gets disabled)
    pub fn is_critical(&self) -> bool {
        matches!(self, AvmError::Critical(_))
    }

    /// Whether a script-level `catch` block may observe this error
    pub fn is_catchable(&self) -> bool {
        matches!(self, AvmError::Thrown { .. } | AvmError::Script { .. })
    }

    /// Convert a catchable error into the value bound to the catch target.
    ///
    /// Thrown values are passed through untouched. Script errors become a
    /// plain object carrying `name` and `message`.
    pub fn to_catch_value(&self) -> AvmValue {
        match self {
            AvmError::Thrown { value } => value.clone(),
            AvmError::Script { message } => {
                let error = ScriptObject::new_plain(None);
                error.define_value("name", AvmValue::from("Error"));
                error.define_value("message", AvmValue::String(AvmString::from(message.as_str())));
                AvmValue::Object(error)
            }
            AvmError::Decode { message, .. } => AvmValue::from(message.as_str()),
            AvmError::Critical(kind) => AvmValue::from(kind.to_string()),
        }
    }
}
