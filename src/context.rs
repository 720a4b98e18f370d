//! Execution context
//!
//! One context exists per loaded program. It owns the global object, the
//! guard counters and the deferred-script queue, and it is the unit that
//! gets disabled when a guard fires.

use serde::{Deserialize, Serialize};

use crate::error::AvmError;
use crate::host::{MovieHost, NullHost};
use crate::interpreter::builtins::{self, Prototypes};
use crate::object::{ObjectKind, ObjectRef};
use crate::prelude::*;
use crate::reader::ActionBlock;
use crate::scope::ScopeChain;
use crate::value::{AvmString, AvmValue, CheapClone};

/// The hang deadline is checked once every this many decoded actions
pub const HANG_CHECK_INTERVAL: u32 = 100;

fn default_hang_timeout_ms() -> u64 {
    1000
}

fn default_max_errors() -> u32 {
    1000
}

fn default_max_stack_depth() -> usize {
    256
}

fn default_max_nesting_depth() -> usize {
    64
}

fn default_ignore_errors() -> bool {
    true
}

/// Limits that protect the host from runaway or broken scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Wall-clock budget of one top-level invocation
    #[serde(default = "default_hang_timeout_ms")]
    pub hang_timeout_ms: u64,
    /// Recovered script errors tolerated per top-level invocation
    #[serde(default = "default_max_errors")]
    pub max_errors: u32,
    /// Maximum closure nesting depth
    #[serde(default = "default_max_stack_depth")]
    pub max_stack_depth: usize,
    /// Maximum nesting of With and Try bodies, counted across closure calls
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// When false, a script error with no listening try aborts the invocation
    #[serde(default = "default_ignore_errors")]
    pub ignore_errors: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            hang_timeout_ms: default_hang_timeout_ms(),
            max_errors: default_max_errors(),
            max_stack_depth: default_max_stack_depth(),
            max_nesting_depth: default_max_nesting_depth(),
            ignore_errors: default_ignore_errors(),
        }
    }
}

impl GuardConfig {
    /// Parse a JSON guard configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A top-level action block waiting for the deferred queue to be flushed
pub struct PendingScript {
    pub block: ActionBlock,
    pub scope: ObjectRef,
}

/// Per-program interpreter state
pub struct ExecutionContext {
    version: u8,
    globals: ObjectRef,
    initial_scope: ScopeChain,
    prototypes: Prototypes,
    host: Rc<dyn MovieHost>,
    config: GuardConfig,

    default_target: RefCell<Option<ObjectRef>>,
    is_active: Cell<bool>,
    execution_prohibited: Cell<bool>,
    abort_execution_at: Cell<u64>,
    stack_depth: Cell<usize>,
    nesting_depth: Cell<usize>,
    errors_ignored: Cell<u32>,
    is_try_catch_listening: Cell<bool>,

    defer_script_execution: Cell<bool>,
    pending_scripts: RefCell<VecDeque<PendingScript>>,
    assets: RefCell<FxHashMap<AvmString, AvmValue>>,
    timer_origin: Cell<Option<u64>>,
}

impl ExecutionContext {
    /// Create a context for a program of format version `version`
    pub fn new(version: u8, host: Rc<dyn MovieHost>, config: GuardConfig) -> Rc<Self> {
        let (globals, prototypes) = builtins::create_globals();
        Rc::new(Self {
            version,
            initial_scope: ScopeChain::new(globals.cheap_clone()),
            globals,
            prototypes,
            host,
            config,
            default_target: RefCell::new(None),
            is_active: Cell::new(false),
            execution_prohibited: Cell::new(false),
            abort_execution_at: Cell::new(0),
            stack_depth: Cell::new(0),
            nesting_depth: Cell::new(0),
            errors_ignored: Cell::new(0),
            is_try_catch_listening: Cell::new(false),
            defer_script_execution: Cell::new(true),
            pending_scripts: RefCell::new(VecDeque::new()),
            assets: RefCell::new(FxHashMap::default()),
            timer_origin: Cell::new(None),
        })
    }

    /// Context with a [`NullHost`] and default guards
    pub fn with_defaults(version: u8) -> Rc<Self> {
        Self::new(version, Rc::new(NullHost), GuardConfig::default())
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn globals(&self) -> &ObjectRef {
        &self.globals
    }

    /// The chain holding only the global object
    pub fn initial_scope(&self) -> &ScopeChain {
        &self.initial_scope
    }

    pub fn prototypes(&self) -> &Prototypes {
        &self.prototypes
    }

    pub fn host(&self) -> &Rc<dyn MovieHost> {
        &self.host
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Mutable state
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn default_target(&self) -> Option<ObjectRef> {
        self.default_target.borrow().clone()
    }

    pub fn set_default_target(&self, target: Option<ObjectRef>) {
        *self.default_target.borrow_mut() = target;
    }

    pub fn is_active(&self) -> bool {
        self.is_active.get()
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.is_active.set(active);
    }

    /// Whether a guard has permanently disabled this context
    pub fn is_execution_prohibited(&self) -> bool {
        self.execution_prohibited.get()
    }

    pub(crate) fn prohibit_execution(&self) {
        self.execution_prohibited.set(true);
    }

    /// Monotonic deadline of the current top-level invocation
    pub fn abort_execution_at(&self) -> u64 {
        self.abort_execution_at.get()
    }

    pub(crate) fn set_abort_execution_at(&self, deadline: u64) {
        self.abort_execution_at.set(deadline);
    }

    /// Current closure nesting depth
    pub fn stack_depth(&self) -> usize {
        self.stack_depth.get()
    }

    pub(crate) fn set_stack_depth(&self, depth: usize) {
        self.stack_depth.set(depth);
    }

    /// Current With/Try body nesting depth
    pub fn nesting_depth(&self) -> usize {
        self.nesting_depth.get()
    }

    pub(crate) fn set_nesting_depth(&self, depth: usize) {
        self.nesting_depth.set(depth);
    }

    /// Recovered errors counted against the budget in this invocation
    pub fn errors_ignored(&self) -> u32 {
        self.errors_ignored.get()
    }

    pub(crate) fn set_errors_ignored(&self, count: u32) {
        self.errors_ignored.set(count);
    }

    pub fn is_try_catch_listening(&self) -> bool {
        self.is_try_catch_listening.get()
    }

    pub(crate) fn set_try_catch_listening(&self, listening: bool) {
        self.is_try_catch_listening.set(listening);
    }

    pub fn defers_script_execution(&self) -> bool {
        self.defer_script_execution.get()
    }

    pub(crate) fn stop_deferring(&self) {
        self.defer_script_execution.set(false);
    }

    pub(crate) fn push_pending(&self, script: PendingScript) {
        self.pending_scripts.borrow_mut().push_back(script);
    }

    pub(crate) fn pop_pending(&self) -> Option<PendingScript> {
        self.pending_scripts.borrow_mut().pop_front()
    }

    pub fn pending_script_count(&self) -> usize {
        self.pending_scripts.borrow().len()
    }

    /// Monotonic time origin for GetTime, fixed by the first invocation
    pub(crate) fn timer_origin(&self, now: u64) -> u64 {
        match self.timer_origin.get() {
            Some(origin) => origin,
            None => {
                self.timer_origin.set(Some(now));
                now
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Targets
    // ═══════════════════════════════════════════════════════════════════════════

    /// Install the root movie clip as `_root` and `_level0`
    pub fn set_root(&self, root: ObjectRef) {
        self.globals.set("_level0", AvmValue::Object(root.cheap_clone()));
        self.globals.set("_root", AvmValue::Object(root));
    }

    pub fn root(&self) -> Option<ObjectRef> {
        match self.globals.get("_root") {
            Some(AvmValue::Object(root)) => Some(root),
            _ => None,
        }
    }

    /// Resolve a target designator to a movie clip: nothing means the
    /// default target, a string is a target path, an object is itself.
    pub fn resolve_target(&self, target: &AvmValue) -> Result<ObjectRef, AvmError> {
        let resolved = match target {
            AvmValue::Undefined | AvmValue::Null => self.default_target(),
            AvmValue::String(s) if s.is_empty() => self.default_target(),
            AvmValue::String(path) => Some(lookup_target_path(
                path.as_str(),
                self.default_target().as_ref(),
                self.root().as_ref(),
            )?),
            AvmValue::Object(obj) => Some(obj.cheap_clone()),
            _ => None,
        };
        match resolved {
            Some(obj) if obj.kind() == ObjectKind::MovieClip => Ok(obj),
            _ => Err(AvmError::script(format!(
                "Invalid target object: {:?}",
                target
            ))),
        }
    }

    /// Resolve `_level{n}`
    pub fn resolve_level(&self, level: u32) -> Result<ObjectRef, AvmError> {
        let value = self
            .globals
            .get(&format!("_level{}", level))
            .unwrap_or_default();
        if value.is_null_or_undefined() {
            return Err(AvmError::script(format!("_level{} is not loaded", level)));
        }
        self.resolve_target(&value)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Assets
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register the symbol properties of an exported class
    pub fn register_asset(&self, class_name: &str, symbol_props: AvmValue) {
        self.assets
            .borrow_mut()
            .insert(AvmString::from(class_name), symbol_props);
    }

    pub fn asset(&self, class_name: &str) -> Option<AvmValue> {
        self.assets.borrow().get(class_name).cloned()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("version", &self.version)
            .field("is_active", &self.is_active.get())
            .field("execution_prohibited", &self.execution_prohibited.get())
            .field("stack_depth", &self.stack_depth.get())
            .field("nesting_depth", &self.nesting_depth.get())
            .field("errors_ignored", &self.errors_ignored.get())
            .finish()
    }
}

/// Walk a target path (`/a/b`, `a.b`, `_root.a`) starting at the default
/// target, or at the root when the path starts with a separator, `_root`
/// or `_level0`.
pub fn lookup_target_path(
    path: &str,
    default_target: Option<&ObjectRef>,
    root: Option<&ObjectRef>,
) -> Result<ObjectRef, AvmError> {
    let mut segments: Vec<&str> = path.split(['/', '.']).collect();
    if segments.last() == Some(&"") {
        segments.pop();
    }

    let mut current = default_target.cloned();
    if let Some(&first) = segments.first() {
        if matches!(first, "" | "_level0" | "_root") {
            current = root.cloned();
            segments.remove(0);
        }
    }

    let mut obj = current.ok_or_else(|| {
        AvmError::script(format!("no target to resolve '{}' against", path))
    })?;
    for segment in segments {
        obj = obj.lookup_child(segment).ok_or_else(|| {
            let parent = obj
                .target_path()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "[object]".to_string());
            AvmError::script(format!(
                "{} (expr {}) is not found in {}",
                segment, path, parent
            ))
        })?;
    }
    Ok(obj)
}
