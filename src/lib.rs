//! Interpreter for legacy ActionScript (AVM1) action bytecode
//!
//! Scripts arrive as raw action blocks carved out of a movie. The
//! interpreter decodes and executes them against an [`ExecutionContext`],
//! which owns the global object and the guards (hang timeout, recursion
//! limit, error budget) that keep a broken script from taking the host
//! down with it. Timeline side effects are forwarded to a [`MovieHost`].
//!
//! # Example
//!
//! ```
//! use asrun::{ActionBlock, DisplayClip, ExecutionContext, Interpreter, ObjectRef};
//!
//! let ctx = ExecutionContext::with_defaults(7);
//! let root: ObjectRef = DisplayClip::new_root(0, Some(ctx.prototypes().object.clone()));
//! ctx.set_root(root.clone());
//!
//! // x = 1 + 2
//! let bytes = vec![
//!     0x96, 0x03, 0x00, 0x00, b'x', 0x00, // Push "x"
//!     0x96, 0x0A, 0x00, 0x07, 1, 0, 0, 0, 0x07, 2, 0, 0, 0, // Push 1, 2
//!     0x47, // Add2
//!     0x1D, // SetVariable
//!     0x00, // End
//! ];
//! let mut interp = Interpreter::new();
//! interp
//!     .execute_actions(&ctx, ActionBlock::new(bytes), root.clone())
//!     .unwrap();
//! assert_eq!(root.get("x"), Some(asrun::AvmValue::Number(3.0)));
//! ```

pub mod clip;
pub mod context;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod object;
pub mod opcode;
pub mod platform;
pub mod prelude;
pub mod reader;
pub mod scope;
pub mod value;

pub use clip::DisplayClip;
pub use context::{ExecutionContext, GuardConfig};
pub use error::{AvmError, CriticalKind};
pub use host::{DragConstraint, MovieHost, NullHost, SendVarsMethod};
pub use interpreter::{Completion, ConstantPool, Interpreter, RegisterFile};
pub use object::{AvmObject, Multiname, ObjectKind, ObjectRef, ScriptObject};
pub use opcode::ActionCode;
pub use platform::{
    ActionTracer, ErrorTelemetry, LogTracer, NullTelemetry, NullTracer, RandomProvider,
    StdRandomProvider, StdTimeProvider, TelemetrySink, TimeProvider,
};
pub use reader::{ActionBlock, ActionReader};
pub use scope::ScopeChain;
pub use value::{AvmString, AvmValue, CheapClone};
