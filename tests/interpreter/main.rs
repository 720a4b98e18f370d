//! Integration tests for the interpreter, organized by feature
//!
//! Scripts are assembled with [`ActionBuilder`] and executed through the
//! public API against a fresh root movie clip. The operand stack left at
//! the final `End` action is captured by a tracer so tests can assert on
//! it directly.

mod arithmetic;
mod closures;
mod exceptions;
mod guards;
mod recovery;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use asrun::{
    ActionBlock, ActionCode, ActionTracer, AvmError, AvmValue, DisplayClip, ErrorTelemetry,
    ExecutionContext, GuardConfig, Interpreter, MovieHost, ObjectRef, TelemetrySink,
    TimeProvider,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Bytecode assembly
// ═══════════════════════════════════════════════════════════════════════════════

/// One value of a Push action
#[derive(Debug, Clone, Copy)]
pub enum Push<'a> {
    Str(&'a str),
    Float(f32),
    Null,
    Undefined,
    Register(u8),
    Bool(bool),
    Double(f64),
    Int(i32),
    Constant(u8),
    Constant16(u16),
}

/// Where a Try action stores the caught value
pub enum CatchTo<'a> {
    Register(u8),
    Variable(&'a str),
}

/// Fluent assembler for action blocks.
///
/// Branches refer to named labels; offsets are patched in when the block
/// is turned into bytes.
#[derive(Default)]
pub struct ActionBuilder {
    bytes: Vec<u8>,
    labels: Vec<(&'static str, usize)>,
    branches: Vec<(usize, &'static str)>,
}

fn push_cstr(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

impl ActionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An action without payload
    pub fn op(mut self, code: ActionCode) -> Self {
        self.bytes.push(code.code());
        self
    }

    /// An action with payload (codes >= 0x80)
    pub fn action(mut self, code: ActionCode, payload: &[u8]) -> Self {
        self.bytes.push(code.code());
        self.bytes
            .extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Arbitrary bytes, for malformed input
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn push(self, values: &[Push]) -> Self {
        let mut payload = Vec::new();
        for value in values {
            match *value {
                Push::Str(s) => {
                    payload.push(0);
                    push_cstr(&mut payload, s);
                }
                Push::Float(f) => {
                    payload.push(1);
                    payload.extend_from_slice(&f.to_le_bytes());
                }
                Push::Null => payload.push(2),
                Push::Undefined => payload.push(3),
                Push::Register(r) => payload.extend_from_slice(&[4, r]),
                Push::Bool(b) => payload.extend_from_slice(&[5, u8::from(b)]),
                Push::Double(d) => {
                    // Doubles are stored high word first
                    payload.push(6);
                    let bytes = d.to_le_bytes();
                    payload.extend_from_slice(&bytes[4..]);
                    payload.extend_from_slice(&bytes[..4]);
                }
                Push::Int(i) => {
                    payload.push(7);
                    payload.extend_from_slice(&i.to_le_bytes());
                }
                Push::Constant(index) => payload.extend_from_slice(&[8, index]),
                Push::Constant16(index) => {
                    payload.push(9);
                    payload.extend_from_slice(&index.to_le_bytes());
                }
            }
        }
        self.action(ActionCode::Push, &payload)
    }

    pub fn push_str(self, s: &str) -> Self {
        self.push(&[Push::Str(s)])
    }

    pub fn push_int(self, i: i32) -> Self {
        self.push(&[Push::Int(i)])
    }

    /// `name = value` through SetVariable
    pub fn set_var(self, name: &str, value: Push) -> Self {
        self.push(&[Push::Str(name), value])
            .op(ActionCode::SetVariable)
    }

    /// Push the value of variable `name`
    pub fn get_var(self, name: &str) -> Self {
        self.push_str(name).op(ActionCode::GetVariable)
    }

    /// Call the function stored in variable `name` with `args`
    pub fn call(self, name: &str, args: &[Push]) -> Self {
        let mut values: Vec<Push> = args.iter().rev().copied().collect();
        values.push(Push::Int(args.len() as i32));
        values.push(Push::Str(name));
        self.push(&values).op(ActionCode::CallFunction)
    }

    pub fn trace(self) -> Self {
        self.op(ActionCode::Trace)
    }

    pub fn constant_pool(self, entries: &[&str]) -> Self {
        let mut payload = (entries.len() as u16).to_le_bytes().to_vec();
        for entry in entries {
            push_cstr(&mut payload, entry);
        }
        self.action(ActionCode::ConstantPool, &payload)
    }

    pub fn store_register(self, register: u8) -> Self {
        self.action(ActionCode::StoreRegister, &[register])
    }

    pub fn label(mut self, name: &'static str) -> Self {
        self.labels.push((name, self.bytes.len()));
        self
    }

    pub fn jump(self, label: &'static str) -> Self {
        self.branch(ActionCode::Jump, label)
    }

    /// Branch to `label` when the popped value is true
    pub fn if_true(self, label: &'static str) -> Self {
        self.branch(ActionCode::If, label)
    }

    fn branch(mut self, code: ActionCode, label: &'static str) -> Self {
        self = self.action(code, &[0, 0]);
        self.branches.push((self.bytes.len() - 2, label));
        self
    }

    pub fn define_function(self, name: &str, params: &[&str], body: ActionBuilder) -> Self {
        let body = body.into_bytes();
        let mut payload = Vec::new();
        push_cstr(&mut payload, name);
        payload.extend_from_slice(&(params.len() as u16).to_le_bytes());
        for param in params {
            push_cstr(&mut payload, param);
        }
        payload.extend_from_slice(&(body.len() as u16).to_le_bytes());
        self.action(ActionCode::DefineFunction, &payload).raw(&body)
    }

    /// DefineFunction2; params are `(register, name)` with register 0
    /// meaning "bind by name"
    pub fn define_function2(
        self,
        name: &str,
        register_count: u8,
        flags: u16,
        params: &[(u8, &str)],
        body: ActionBuilder,
    ) -> Self {
        let body = body.into_bytes();
        let mut payload = Vec::new();
        push_cstr(&mut payload, name);
        payload.extend_from_slice(&(params.len() as u16).to_le_bytes());
        payload.push(register_count);
        payload.extend_from_slice(&flags.to_le_bytes());
        for (register, param) in params {
            payload.push(*register);
            push_cstr(&mut payload, param);
        }
        payload.extend_from_slice(&(body.len() as u16).to_le_bytes());
        self.action(ActionCode::DefineFunction2, &payload).raw(&body)
    }

    /// With action; the target object must already be on the stack
    pub fn with_block(self, body: ActionBuilder) -> Self {
        let body = body.into_bytes();
        self.action(ActionCode::With, &(body.len() as u16).to_le_bytes())
            .raw(&body)
    }

    pub fn try_block(
        self,
        try_body: ActionBuilder,
        catch: Option<(CatchTo, ActionBuilder)>,
        finally: Option<ActionBuilder>,
    ) -> Self {
        let try_body = try_body.into_bytes();
        let mut flags = 0u8;
        let mut target = Vec::new();
        let catch_body = match catch {
            Some((to, body)) => {
                flags |= 0x01;
                match to {
                    CatchTo::Register(r) => {
                        flags |= 0x04;
                        target.push(r);
                    }
                    CatchTo::Variable(name) => push_cstr(&mut target, name),
                }
                body.into_bytes()
            }
            None => {
                push_cstr(&mut target, "");
                Vec::new()
            }
        };
        let finally_body = match finally {
            Some(body) => {
                flags |= 0x02;
                body.into_bytes()
            }
            None => Vec::new(),
        };

        let mut payload = vec![flags];
        payload.extend_from_slice(&(try_body.len() as u16).to_le_bytes());
        payload.extend_from_slice(&(catch_body.len() as u16).to_le_bytes());
        payload.extend_from_slice(&(finally_body.len() as u16).to_le_bytes());
        payload.extend_from_slice(&target);
        self.action(ActionCode::Try, &payload)
            .raw(&try_body)
            .raw(&catch_body)
            .raw(&finally_body)
    }

    /// Resolve branches and return the bytes, without a trailing End
    #[allow(clippy::panic, clippy::indexing_slicing)]
    pub fn into_bytes(mut self) -> Vec<u8> {
        for (field, label) in &self.branches {
            let Some(&(_, target)) = self.labels.iter().find(|(name, _)| name == label) else {
                panic!("undefined label {}", label);
            };
            let offset = (target as i64 - (*field as i64 + 2)) as i16;
            self.bytes[*field..*field + 2].copy_from_slice(&offset.to_le_bytes());
        }
        self.bytes
    }

    /// Terminate with End and wrap as a block
    pub fn build(self) -> ActionBlock {
        ActionBlock::new(self.op(ActionCode::End).into_bytes())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Host doubles
// ═══════════════════════════════════════════════════════════════════════════════

/// Host that records every request as a line of text
#[derive(Default)]
pub struct RecordingHost {
    pub calls: RefCell<Vec<String>>,
    pub traces: RefCell<Vec<String>>,
    /// Highest loaded frame number; every frame is loaded when unset
    pub loaded_frames: Cell<Option<f64>>,
}

impl RecordingHost {
    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn target_name(target: Option<&ObjectRef>) -> String {
        target
            .and_then(|t| t.target_path())
            .map_or_else(|| "-".to_string(), |p| p.to_string())
    }
}

impl MovieHost for RecordingHost {
    fn goto_frame(&self, target: Option<&ObjectRef>, frame: &AvmValue, scene_bias: u16, play: bool) {
        self.record(format!(
            "goto {} {:?} bias={} play={}",
            Self::target_name(target),
            frame,
            scene_bias,
            play
        ));
    }

    fn goto_label(&self, target: Option<&ObjectRef>, label: &str) {
        self.record(format!("label {} {}", Self::target_name(target), label));
    }

    fn play(&self, target: Option<&ObjectRef>) {
        self.record(format!("play {}", Self::target_name(target)));
    }

    fn stop(&self, target: Option<&ObjectRef>) {
        self.record(format!("stop {}", Self::target_name(target)));
    }

    fn next_frame(&self, target: Option<&ObjectRef>) {
        self.record(format!("next {}", Self::target_name(target)));
    }

    fn get_url(&self, url: &str, window: &str, method: Option<asrun::SendVarsMethod>) {
        self.record(format!("url {} {} {:?}", url, window, method));
    }

    fn frame_loaded(&self, _target: Option<&ObjectRef>, frame: &AvmValue) -> bool {
        match (self.loaded_frames.get(), frame) {
            (Some(loaded), AvmValue::Number(n)) => *n <= loaded,
            _ => true,
        }
    }

    fn trace(&self, message: &str) {
        self.traces.borrow_mut().push(message.to_string());
    }
}

/// Clock under test control. Every monotonic read advances it by `step`.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    step: u64,
}

impl ManualClock {
    pub fn new(step: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            step,
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get() + millis);
    }
}

impl TimeProvider for ManualClock {
    fn now_millis(&self) -> i64 {
        // 2001-09-09T01:46:40Z
        1_000_000_000_000 + self.now.get() as i64
    }

    fn monotonic_millis(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// Tracer that keeps the stack seen by the top-level End action
#[derive(Default)]
struct StackCapture {
    depth: Cell<usize>,
    final_stack: Rc<RefCell<Option<Vec<AvmValue>>>>,
    executed: Rc<Cell<usize>>,
}

impl ActionTracer for StackCapture {
    fn print(&self, _position: usize, action_code: u8, stack: &[AvmValue]) {
        self.executed.set(self.executed.get() + 1);
        if action_code == ActionCode::End.code() && self.depth.get() == 1 {
            *self.final_stack.borrow_mut() = Some(stack.to_vec());
        }
    }

    fn indent(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    fn unindent(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[derive(Default)]
struct TelemetryLog(Rc<RefCell<Vec<ErrorTelemetry>>>);

impl TelemetrySink for TelemetryLog {
    fn report_error(&self, event: ErrorTelemetry) {
        self.0.borrow_mut().push(event);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Harness
// ═══════════════════════════════════════════════════════════════════════════════

/// An interpreter, a context and a root clip wired to test doubles
pub struct Harness {
    pub interp: Interpreter,
    pub ctx: Rc<ExecutionContext>,
    pub root: Rc<DisplayClip>,
    pub host: Rc<RecordingHost>,
    pub clock: ManualClock,
    final_stack: Rc<RefCell<Option<Vec<AvmValue>>>>,
    executed: Rc<Cell<usize>>,
    telemetry: Rc<RefCell<Vec<ErrorTelemetry>>>,
}

impl Harness {
    pub fn new(version: u8) -> Self {
        Self::with_config(version, GuardConfig::default())
    }

    pub fn with_config(version: u8, config: GuardConfig) -> Self {
        let host = Rc::new(RecordingHost::default());
        let ctx = ExecutionContext::new(version, host.clone(), config);
        let root = DisplayClip::new_root(0, Some(ctx.prototypes().object.clone()));
        ctx.set_root(root.clone());

        let clock = ManualClock::new(0);
        let capture = StackCapture::default();
        let final_stack = capture.final_stack.clone();
        let executed = capture.executed.clone();
        let telemetry = TelemetryLog::default();
        let events = telemetry.0.clone();
        let interp = Interpreter::new()
            .with_time_provider(Box::new(clock.clone()))
            .with_tracer(Box::new(capture))
            .with_telemetry(Box::new(telemetry));

        Self {
            interp,
            ctx,
            root,
            host,
            clock,
            final_stack,
            executed,
            telemetry: events,
        }
    }

    /// Use a clock that advances by `step` on every read
    pub fn with_clock_step(mut self, step: u64) -> Self {
        let clock = ManualClock::new(step);
        self.interp = self.interp.with_time_provider(Box::new(clock.clone()));
        self.clock = clock;
        self
    }

    /// Execute `script` with the root clip as scope
    pub fn run(&mut self, script: ActionBuilder) -> Result<(), AvmError> {
        *self.final_stack.borrow_mut() = None;
        let root: ObjectRef = self.root.clone();
        self.interp.execute_actions(&self.ctx, script.build(), root)
    }

    /// Stack at the final End, empty if the script never got there
    pub fn final_stack(&self) -> Vec<AvmValue> {
        self.final_stack.borrow().clone().unwrap_or_default()
    }

    /// Whether the top-level End action was reached
    pub fn reached_end(&self) -> bool {
        self.final_stack.borrow().is_some()
    }

    /// Number of actions decoded so far
    pub fn executed(&self) -> usize {
        self.executed.get()
    }

    /// Variable stored on the root clip
    pub fn var(&self, name: &str) -> AvmValue {
        let root: ObjectRef = self.root.clone();
        root.get(name).unwrap_or_default()
    }

    pub fn traces(&self) -> Vec<String> {
        self.host.traces.borrow().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.host.calls.borrow().clone()
    }

    pub fn telemetry(&self) -> Vec<ErrorTelemetry> {
        self.telemetry.borrow().clone()
    }
}

/// Run `script` for format version `version` and return the final stack
#[allow(clippy::expect_used)]
pub fn eval_stack(version: u8, script: ActionBuilder) -> Vec<AvmValue> {
    let mut harness = Harness::new(version);
    harness.run(script).expect("script failed");
    harness.final_stack()
}

/// Run `script` at version 7 and return the single value left on the stack
#[allow(clippy::panic)]
pub fn eval(script: ActionBuilder) -> AvmValue {
    match eval_stack(7, script).as_slice() {
        [value] => value.clone(),
        other => panic!("expected one value on the stack, got {:?}", other),
    }
}

/// Run `f` on a thread with the stack size of a default process main
/// thread; test threads get much less.
#[allow(clippy::expect_used)]
pub fn with_main_thread_stack<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(f)
        .expect("spawn test thread")
        .join()
        .expect("test thread panicked");
}
