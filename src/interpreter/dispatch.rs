//! The decode-execute loop
//!
//! [`Interpreter::interpret_actions`] runs one action block: it decodes an
//! action, computes where the next one starts, executes it and applies the
//! error-recovery policy when it fails. Nested blocks (with, try, closure
//! bodies) re-enter the loop recursively.

use super::Interpreter;
use super::frame::{ActionFrame, Completion, RegisterFile, Step};
use super::variables;
use crate::clip::CLIP_PROPERTY_NAMES;
use crate::context::{ExecutionContext, HANG_CHECK_INTERVAL};
use crate::error::{AvmError, CriticalKind};
use crate::host::{DragConstraint, SendVarsMethod};
use crate::object::{ObjectKind, ObjectRef, ScriptObject, resolve_property, same_object};
use crate::opcode::ActionCode;
use crate::prelude::*;
use crate::reader::ActionBlock;
use crate::scope::ScopeChain;
use crate::value::{AvmString, AvmValue, CheapClone, to_int32, to_integer, to_uint32};

impl Interpreter {
    /// Run `block` with `scope` as its scope chain until it ends or returns.
    ///
    /// `registers` is shared with nested with/try blocks of the same closure.
    pub(crate) fn interpret_actions(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        block: ActionBlock,
        scope: ScopeChain,
        constant_pool: super::frame::ConstantPool,
        registers: &mut RegisterFile,
    ) -> Result<Completion, AvmError> {
        let mut frame = ActionFrame::new(
            block,
            ctx.version(),
            scope,
            constant_pool,
            ctx.default_target(),
        );
        let mut executed: u32 = 0;
        let mut recovering = false;

        while !frame.reader.is_at_end() {
            if executed % HANG_CHECK_INTERVAL == 0
                && self.monotonic_millis() >= ctx.abort_execution_at()
            {
                return Err(self.raise_critical(ctx, CriticalKind::HangTimeout));
            }
            executed = executed.wrapping_add(1);

            frame.action_position = frame.reader.position();
            let code = frame.reader.read_u8()?;
            let length = if code >= 0x80 {
                frame.reader.read_u16()? as usize
            } else {
                0
            };
            frame.next_position = frame.reader.position() + length;

            self.tracer.print(frame.reader.position(), code, &frame.stack);

            let result = match ActionCode::from_u8(code) {
                Some(action) => self.execute_action(ctx, &mut frame, registers, action),
                None => Err(AvmError::script(format!("Unknown action code: {}", code))),
            };

            match result {
                Ok(Step::Continue) => {
                    frame.reader.set_position(frame.next_position);
                    recovering = false;
                }
                Ok(Step::Return(value)) => return Ok(Completion::Return(value)),
                Ok(Step::End) => return Ok(Completion::Normal),
                Err(err) => self.recover_script_error(ctx, &mut frame, code, err, &mut recovering)?,
            }
        }
        Ok(Completion::Normal)
    }

    /// Execute a single decoded action.
    ///
    /// Handlers live in one function per group so the frame that stays on
    /// the native stack while a nested block or call runs is small.
    fn execute_action(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        registers: &mut RegisterFile,
        action: ActionCode,
    ) -> Result<Step, AvmError> {
        use ActionCode::*;
        match action {
            End => return Ok(Step::End),
            Return => return Ok(Step::Return(frame.stack.pop().unwrap_or_default())),
            Throw => return Err(AvmError::thrown(frame.pop()?)),
            With => {
                if let Completion::Return(value) = self.action_with(ctx, frame, registers)? {
                    return Ok(Step::Return(value));
                }
            }
            Try => {
                if let Completion::Return(value) = self.process_try(ctx, frame, registers)? {
                    return Ok(Step::Return(value));
                }
            }
            Jump => {
                let offset = frame.reader.read_i16()?;
                jump(frame, offset)?;
            }
            If => {
                let offset = frame.reader.read_i16()?;
                if frame.pop()?.to_boolean() {
                    jump(frame, offset)?;
                }
            }

            GotoFrame | GetUrl | NextFrame | PreviousFrame | Play | Stop | ToggleQuality
            | StopSounds | WaitForFrame | WaitForFrame2 | SetTarget | SetTarget2 | GoToLabel
            | GetUrl2 | GotoFrame2 | Call | GetProperty | SetProperty | CloneSprite
            | RemoveSprite | StartDrag | EndDrag | Trace | FsCommand2 => {
                self.timeline_action(ctx, frame, action)?
            }
            Push | Pop | PushDuplicate | StackSwap | StoreRegister | ConstantPool | StrictMode => {
                self.stack_action(frame, registers, action)?
            }
            Add | Subtract | Multiply | Divide | Modulo | Increment | Decrement | Equals | Less
            | And | Or | Not | Add2 | Less2 | Greater | Equals2 | StrictEquals | BitAnd | BitOr
            | BitXor | BitLShift | BitRShift | BitURShift | ToInteger | ToNumber | ToString
            | TypeOf | RandomNumber | GetTime => self.arithmetic_action(ctx, frame, action)?,
            StringEquals | StringLess | StringGreater | StringAdd | StringLength
            | MbStringLength | StringExtract | MbStringExtract | CharToAscii | MbCharToAscii
            | AsciiToChar | MbAsciiToChar => self.string_action(ctx, frame, action)?,
            GetVariable | SetVariable | DefineLocal | DefineLocal2 | Delete | Delete2
            | TargetPath => self.variable_action(ctx, frame, action)?,
            GetMember | SetMember | InitArray | InitObject | Enumerate | Enumerate2
            | InstanceOf | CastOp | ImplementsOp | Extends => {
                self.object_action(ctx, frame, action)?
            }
            DefineFunction | DefineFunction2 | CallFunction | CallMethod | NewObject
            | NewMethod => self.call_action(ctx, frame, action)?,
        }
        Ok(Step::Continue)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Timeline & host requests
    // ═══════════════════════════════════════════════════════════════════════════

    /// Timeline control and other requests forwarded to the host
    #[inline(never)]
    fn timeline_action(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        use ActionCode::*;
        match action {
            GotoFrame => self.action_goto_frame(ctx, frame)?,
            GetUrl => {
                let url = frame.reader.read_string()?;
                let window = frame.reader.read_string()?;
                ctx.host().get_url(url.as_str(), window.as_str(), None);
            }
            NextFrame => ctx.host().next_frame(ctx.default_target().as_ref()),
            PreviousFrame => ctx.host().prev_frame(ctx.default_target().as_ref()),
            Play => ctx.host().play(ctx.default_target().as_ref()),
            Stop => ctx.host().stop(ctx.default_target().as_ref()),
            ToggleQuality => ctx.host().toggle_quality(),
            StopSounds => ctx.host().stop_sounds(),
            WaitForFrame => {
                let frame_number = frame.reader.read_u16()?;
                let skip = frame.reader.read_u8()?;
                let loaded = ctx.host().frame_loaded(
                    ctx.default_target().as_ref(),
                    &AvmValue::Number(f64::from(frame_number) + 1.0),
                );
                if !loaded {
                    skip_actions(frame, skip)?;
                }
            }
            WaitForFrame2 => {
                let skip = frame.reader.read_u8()?;
                let frame_value = frame.pop()?;
                if !ctx
                    .host()
                    .frame_loaded(ctx.default_target().as_ref(), &frame_value)
                {
                    skip_actions(frame, skip)?;
                }
            }
            SetTarget => {
                let path = frame.reader.read_string()?;
                variables::set_target(ctx, frame, path.as_str())?;
            }
            SetTarget2 => {
                let target = frame.pop()?;
                match &target {
                    AvmValue::Object(obj) if obj.kind() == ObjectKind::MovieClip => {
                        ctx.set_default_target(Some(obj.cheap_clone()));
                    }
                    _ => {
                        let path = self.to_string(ctx, &target)?;
                        variables::set_target(ctx, frame, path.as_str())?;
                    }
                }
            }
            GoToLabel => {
                let label = frame.reader.read_string()?;
                ctx.host()
                    .goto_label(ctx.default_target().as_ref(), label.as_str());
            }
            GetUrl2 => self.action_get_url2(ctx, frame)?,
            GotoFrame2 => {
                let flags = frame.reader.read_u8()?;
                let frame_value = frame.pop()?;
                let scene_bias = if flags & 2 != 0 {
                    frame.reader.read_u16()?
                } else {
                    0
                };
                ctx.host().goto_frame(
                    ctx.default_target().as_ref(),
                    &frame_value,
                    scene_bias,
                    flags & 1 != 0,
                );
            }
            Call => {
                let frame_value = frame.pop()?;
                ctx.host()
                    .call_frame(ctx.default_target().as_ref(), &frame_value)?;
            }
            GetProperty => {
                let index = frame.pop()?;
                let target = frame.pop()?;
                let (clip, name) = self.clip_property(ctx, &target, &index)?;
                frame.push(clip.get(name).unwrap_or_default());
            }
            SetProperty => {
                let value = frame.pop()?;
                let index = frame.pop()?;
                let target = frame.pop()?;
                let (clip, name) = self.clip_property(ctx, &target, &index)?;
                clip.set(name, value);
            }
            CloneSprite => {
                let depth = frame.pop()?;
                let name = frame.pop()?;
                let source = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                let depth = self.to_number(ctx, &depth)?;
                ctx.host().duplicate_clip(&source, name.as_str(), depth)?;
            }
            RemoveSprite => {
                let target = frame.pop()?;
                ctx.host().remove_clip(&target)?;
            }
            StartDrag => self.action_start_drag(ctx, frame)?,
            EndDrag => ctx.host().stop_drag(),
            Trace => {
                let value = frame.pop()?;
                let message = self.to_string(ctx, &value)?;
                ctx.host().trace(message.as_str());
            }
            FsCommand2 => {
                let args = frame.pop_args()?;
                frame.push(ctx.host().fscommand(&args));
            }
            _ => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Stack & registers
    // ═══════════════════════════════════════════════════════════════════════════

    /// Operand stack, registers and the constant pool
    #[inline(never)]
    fn stack_action(
        &mut self,
        frame: &mut ActionFrame,
        registers: &mut RegisterFile,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        use ActionCode::*;
        match action {
            Push => self.action_push(frame, registers)?,
            Pop => {
                frame.pop()?;
            }
            PushDuplicate => {
                let top = frame.peek()?.clone();
                frame.push(top);
            }
            StackSwap => {
                let a = frame.pop()?;
                let b = frame.pop()?;
                frame.push(a);
                frame.push(b);
            }
            StoreRegister => {
                let index = frame.reader.read_u8()?;
                let value = frame.peek()?.clone();
                registers.set(index, value);
            }
            ConstantPool => {
                let count = frame.reader.read_u16()?;
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    entries.push(frame.reader.read_string()?);
                }
                frame.constant_pool = super::frame::ConstantPool::new(entries);
            }
            StrictMode => {
                frame.reader.read_u8()?;
            }
            _ => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Arithmetic & comparison
    // ═══════════════════════════════════════════════════════════════════════════

    /// Numeric, logical and comparison actions
    #[inline(never)]
    fn arithmetic_action(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        use ActionCode::*;
        match action {
            Add | Subtract | Multiply | Divide | Modulo => self.action_arithmetic(ctx, frame, action)?,
            Increment | Decrement => {
                let value = frame.pop()?;
                let n = self.to_number(ctx, &value)?;
                frame.push(if action == Increment { n + 1.0 } else { n - 1.0 });
            }
            Equals | Less => {
                let (left, right) = self.pop_numbers(ctx, frame)?;
                let result = if action == Equals {
                    left == right
                } else {
                    left < right
                };
                push_bool(ctx, frame, result);
            }
            And | Or => {
                let a = frame.pop()?.to_boolean();
                let b = frame.pop()?.to_boolean();
                push_bool(ctx, frame, if action == And { b && a } else { b || a });
            }
            Not => {
                let value = frame.pop()?.to_boolean();
                push_bool(ctx, frame, !value);
            }
            Add2 => self.action_add2(ctx, frame)?,
            Less2 => {
                let a = frame.pop()?;
                let b = frame.pop()?;
                let result = self.less_than(ctx, &b, &a)?;
                frame.push(result);
            }
            Greater => {
                let a = frame.pop()?;
                let b = frame.pop()?;
                let result = self.less_than(ctx, &a, &b)?;
                frame.push(result);
            }
            Equals2 => {
                let a = frame.pop()?;
                let b = frame.pop()?;
                let result = self.loose_equals(ctx, &b, &a)?;
                frame.push(result);
            }
            StrictEquals => {
                let a = frame.pop()?;
                let b = frame.pop()?;
                frame.push(b.strict_equals(&a));
            }
            BitAnd | BitOr | BitXor | BitLShift | BitRShift | BitURShift => {
                self.action_bitwise(ctx, frame, action)?
            }
            ToInteger => {
                let value = frame.pop()?;
                let n = self.to_number(ctx, &value)?;
                frame.push(to_integer(n));
            }
            ToNumber => {
                let value = frame.pop()?;
                let n = self.to_number(ctx, &value)?;
                frame.push(n);
            }
            ToString => {
                let value = frame.pop()?;
                let s = self.to_string(ctx, &value)?;
                frame.push(s);
            }
            TypeOf => {
                let value = frame.pop()?;
                frame.push(value.type_of());
            }
            RandomNumber => {
                let max = frame.pop()?;
                let max = self.to_number(ctx, &max)?;
                let random = self.next_random();
                frame.push((random * to_integer(max)).floor());
            }
            GetTime => {
                let now = self.monotonic_millis();
                let origin = ctx.timer_origin(now);
                frame.push(now.saturating_sub(origin) as f64);
            }
            _ => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Strings
    // ═══════════════════════════════════════════════════════════════════════════

    /// String and multi-byte string actions
    #[inline(never)]
    fn string_action(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        use ActionCode::*;
        match action {
            StringEquals | StringLess | StringGreater => {
                let (left, right) = self.pop_strings(ctx, frame)?;
                let result = match action {
                    StringEquals => left == right,
                    StringLess => left < right,
                    _ => left > right,
                };
                push_bool(ctx, frame, result);
            }
            StringAdd => {
                let (left, right) = self.pop_strings(ctx, frame)?;
                frame.push(left + &right);
            }
            StringLength | MbStringLength => {
                let value = frame.pop()?;
                let s = self.to_string(ctx, &value)?;
                let len = if action == StringLength {
                    s.len()
                } else {
                    s.char_count()
                };
                frame.push(len as f64);
            }
            StringExtract | MbStringExtract => self.action_string_extract(ctx, frame, action)?,
            CharToAscii | MbCharToAscii => {
                let value = frame.pop()?;
                let s = self.to_string(ctx, &value)?;
                let code = if action == CharToAscii {
                    s.as_str().bytes().next().map_or(0, u32::from)
                } else {
                    s.as_str().chars().next().map_or(0, u32::from)
                };
                frame.push(f64::from(code));
            }
            AsciiToChar | MbAsciiToChar => {
                let value = frame.pop()?;
                let code = to_uint32(self.to_number(ctx, &value)?);
                let ch = if action == AsciiToChar {
                    Some(char::from(code as u8))
                } else {
                    char::from_u32(code)
                };
                frame.push(ch.map(String::from).unwrap_or_default());
            }
            _ => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Variables
    // ═══════════════════════════════════════════════════════════════════════════

    /// Actions resolving names through the scope chain
    #[inline(never)]
    fn variable_action(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        use ActionCode::*;
        match action {
            GetVariable => {
                let name = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                let value = variables::get_variable(ctx, frame, name.as_str())?;
                frame.push(value);
            }
            SetVariable => {
                let value = frame.pop()?;
                let name = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                variables::set_variable(ctx, frame, name.as_str(), value)?;
            }
            DefineLocal => {
                let value = frame.pop()?;
                let name = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                frame.scope_object().set(name.as_str(), value);
            }
            DefineLocal2 => {
                let name = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                let scope = frame.scope_object();
                if !scope.has_own(name.as_str()) {
                    scope.set(name.as_str(), AvmValue::Undefined);
                }
            }
            Delete => {
                let name = frame.pop()?;
                let target = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                let deleted = match &target {
                    AvmValue::Object(obj) => {
                        obj.set(name.as_str(), AvmValue::Undefined);
                        obj.delete(name.as_str())
                    }
                    _ => false,
                };
                frame.push(deleted);
            }
            Delete2 => {
                let name = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                let deleted = variables::delete_variable(frame, name.as_str());
                frame.push(deleted);
            }
            TargetPath => {
                let value = frame.pop()?;
                let path = match &value {
                    AvmValue::Object(obj) if obj.kind() == ObjectKind::MovieClip => {
                        obj.target_path().map(AvmValue::String).unwrap_or_default()
                    }
                    _ => AvmValue::Undefined,
                };
                frame.push(path);
            }
            _ => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Objects & members
    // ═══════════════════════════════════════════════════════════════════════════

    /// Member access, object construction literals and class wiring
    #[inline(never)]
    fn object_action(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        use ActionCode::*;
        match action {
            GetMember => {
                let name = frame.pop()?;
                let target = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                frame.push(self.get_member(ctx, &target, name.as_str()));
            }
            SetMember => self.action_set_member(ctx, frame)?,
            InitArray => {
                let elements = frame.pop_args()?;
                let array: ObjectRef = ScriptObject::new_array(
                    Some(ctx.prototypes().array.cheap_clone()),
                    elements,
                );
                frame.push(array);
            }
            InitObject => self.action_init_object(ctx, frame)?,
            Enumerate => {
                let name = frame.pop()?;
                let name = self.to_string(ctx, &name)?;
                frame.push(AvmValue::Null);
                match variables::get_variable(ctx, frame, name.as_str())? {
                    AvmValue::Object(obj) => push_property_names(frame, &obj),
                    _ => {
                        return Err(AvmError::script(format!("Object \"{}\" is not found", name)));
                    }
                }
            }
            Enumerate2 => {
                let target = frame.pop()?;
                frame.push(AvmValue::Null);
                if let AvmValue::Object(obj) = target {
                    push_property_names(frame, &obj);
                }
            }
            InstanceOf => {
                let constructor = frame.pop()?;
                let value = frame.pop()?;
                let result = self.instance_of(ctx, &value, &constructor, true);
                frame.push(result);
            }
            CastOp => {
                let value = frame.pop()?;
                let constructor = frame.pop()?;
                if self.instance_of(ctx, &value, &constructor, false) {
                    frame.push(value);
                } else {
                    frame.push(AvmValue::Null);
                }
            }
            ImplementsOp => {
                let constructor = frame.pop()?;
                let count = frame.pop_count(1)?;
                let mut interfaces = Vec::with_capacity(count);
                for _ in 0..count {
                    interfaces.push(frame.pop()?);
                }
                let constructor = expect_object(&constructor, "ImplementsOp")?;
                let list: ObjectRef = ScriptObject::new_array(
                    Some(ctx.prototypes().array.cheap_clone()),
                    interfaces,
                );
                constructor.define_hidden("__interfaces", AvmValue::Object(list));
            }
            Extends => {
                let superclass = frame.pop()?;
                let subclass = frame.pop()?;
                extend_class(ctx, &subclass, &superclass)?;
            }
            _ => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Functions & calls
    // ═══════════════════════════════════════════════════════════════════════════

    /// Function definitions, calls and constructions
    #[inline(never)]
    fn call_action(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        use ActionCode::*;
        match action {
            DefineFunction => self.define_function(ctx, frame, false)?,
            DefineFunction2 => self.define_function(ctx, frame, true)?,
            CallFunction => self.action_call_function(ctx, frame)?,
            CallMethod => self.action_call_method(ctx, frame)?,
            NewObject => self.action_new_object(ctx, frame)?,
            NewMethod => self.action_new_method(ctx, frame)?,
            _ => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Handlers with a payload or several operands
    // ═══════════════════════════════════════════════════════════════════════════

    fn action_with(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        registers: &mut RegisterFile,
    ) -> Result<Completion, AvmError> {
        let size = frame.reader.read_u16()?;
        let target = frame.pop()?;
        let body = take_body(frame, size as usize)?;
        self.process_with(ctx, frame, registers, target, body)
    }

    fn action_new_object(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let name = frame.pop()?;
        let args = frame.pop_args()?;
        let name = self.to_string(ctx, &name)?;
        let constructor = match variables::get_variable(ctx, frame, name.as_str())? {
            AvmValue::Object(obj) => obj,
            _ => {
                return Err(AvmError::script(format!("Object \"{}\" is not found", name)));
            }
        };
        let result = self.construct_object(ctx, &constructor, &args)?;
        frame.push(result);
        Ok(())
    }

    fn action_push(
        &mut self,
        frame: &mut ActionFrame,
        registers: &RegisterFile,
    ) -> Result<(), AvmError> {
        while frame.reader.position() < frame.next_position {
            let value = match frame.reader.read_u8()? {
                0 => AvmValue::String(frame.reader.read_string()?),
                1 => AvmValue::Number(f64::from(frame.reader.read_f32()?)),
                2 => AvmValue::Null,
                3 => AvmValue::Undefined,
                4 => registers.get(frame.reader.read_u8()?),
                5 => AvmValue::Boolean(frame.reader.read_boolean()?),
                6 => AvmValue::Number(frame.reader.read_f64()?),
                7 => AvmValue::Number(f64::from(frame.reader.read_i32()?)),
                8 => {
                    let index = frame.reader.read_u8()?;
                    frame.constant_pool.get(index as usize)
                }
                9 => {
                    let index = frame.reader.read_u16()?;
                    frame.constant_pool.get(index as usize)
                }
                other => {
                    return Err(AvmError::script(format!("Unknown value type: {}", other)));
                }
            };
            frame.push(value);
        }
        Ok(())
    }

    fn action_goto_frame(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let frame_number = frame.reader.read_u16()?;
        // A Play right after the goto turns it into goto-and-play
        frame.reader.set_position(frame.next_position);
        let play = frame.reader.peek_u8() == Some(ActionCode::Play.code());
        if play {
            frame.next_position += 1;
        }
        ctx.host().goto_frame(
            ctx.default_target().as_ref(),
            &AvmValue::Number(f64::from(frame_number) + 1.0),
            0,
            play,
        );
        Ok(())
    }

    fn action_get_url2(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let flags = frame.reader.read_u8()?;
        let target = frame.pop()?;
        let url = frame.pop()?;
        let url = self.to_string(ctx, &url)?;
        let method = SendVarsMethod::from_flags(flags);
        let host = ctx.host();
        if flags & 0x40 == 0 {
            let window = self.to_string(ctx, &target)?;
            host.get_url(url.as_str(), window.as_str(), method);
        } else if flags & 0x80 != 0 {
            host.load_variables(url.as_str(), &target, method);
        } else {
            host.load_movie(url.as_str(), &target, method);
        }
        Ok(())
    }

    fn action_start_drag(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let target = frame.pop()?;
        let lock_center = frame.pop()?.to_boolean();
        let constraint = if frame.pop()?.to_boolean() {
            let y2 = frame.pop()?;
            let x2 = frame.pop()?;
            let y1 = frame.pop()?;
            let x1 = frame.pop()?;
            Some(DragConstraint {
                x1: self.to_number(ctx, &x1)?,
                y1: self.to_number(ctx, &y1)?,
                x2: self.to_number(ctx, &x2)?,
                y2: self.to_number(ctx, &y2)?,
            })
        } else {
            None
        };
        ctx.host().start_drag(&target, lock_center, constraint);
        Ok(())
    }

    /// Resolve the clip and property name addressed by GetProperty/SetProperty
    fn clip_property(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        target: &AvmValue,
        index: &AvmValue,
    ) -> Result<(ObjectRef, &'static str), AvmError> {
        let index = self.to_number(ctx, index)?;
        let name = (index >= 0.0 && index.fract() == 0.0)
            .then(|| CLIP_PROPERTY_NAMES.get(index as usize).copied())
            .flatten()
            .ok_or_else(|| AvmError::script(format!("Invalid property index: {}", index)))?;
        let clip = ctx.resolve_target(target)?;
        Ok((clip, name))
    }

    /// Pop two operands and convert them to numbers, left operand first
    fn pop_numbers(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(f64, f64), AvmError> {
        let right = frame.pop()?;
        let left = frame.pop()?;
        let right = self.to_number(ctx, &right)?;
        let left = self.to_number(ctx, &left)?;
        Ok((left, right))
    }

    /// Pop two operands and convert them to strings, left operand first
    fn pop_strings(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(AvmString, AvmString), AvmError> {
        let right = frame.pop()?;
        let left = frame.pop()?;
        let right = self.to_string(ctx, &right)?;
        let left = self.to_string(ctx, &left)?;
        Ok((left, right))
    }

    fn action_arithmetic(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        let (left, right) = self.pop_numbers(ctx, frame)?;
        let result = match action {
            ActionCode::Add => left + right,
            ActionCode::Subtract => left - right,
            ActionCode::Multiply => left * right,
            ActionCode::Modulo => left % right,
            _ => {
                let quotient = left / right;
                if ctx.version() < 5 && !quotient.is_finite() {
                    frame.push("#ERROR#");
                    return Ok(());
                }
                quotient
            }
        };
        frame.push(result);
        Ok(())
    }

    fn action_bitwise(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        let right = frame.pop()?;
        let left = frame.pop()?;
        let right = self.to_int32(ctx, &right)?;
        let left = self.to_int32(ctx, &left)?;
        let shift = (right as u32) & 31;
        let result = match action {
            ActionCode::BitAnd => f64::from(left & right),
            ActionCode::BitOr => f64::from(left | right),
            ActionCode::BitXor => f64::from(left ^ right),
            ActionCode::BitLShift => f64::from(left.wrapping_shl(shift)),
            ActionCode::BitRShift => f64::from(left >> shift),
            _ => f64::from((left as u32) >> shift),
        };
        frame.push(result);
        Ok(())
    }

    fn action_add2(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let right = frame.pop()?;
        let left = frame.pop()?;
        let right = self.to_add_primitive(ctx, &right)?;
        let left = self.to_add_primitive(ctx, &left)?;
        if left.is_string() || right.is_string() {
            let left = self.to_string(ctx, &left)?;
            let right = self.to_string(ctx, &right)?;
            frame.push(left + &right);
        } else {
            let version = ctx.version();
            frame.push(left.primitive_to_number(version) + right.primitive_to_number(version));
        }
        Ok(())
    }

    fn action_string_extract(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
        action: ActionCode,
    ) -> Result<(), AvmError> {
        let count = frame.pop()?;
        let index = frame.pop()?;
        let value = frame.pop()?;
        let count = to_int32(self.to_number(ctx, &count)?);
        let index = to_int32(self.to_number(ctx, &index)?);
        let s = self.to_string(ctx, &value)?;

        // 1-based start; a negative count takes the rest of the string
        let start = (index.max(1) - 1) as usize;
        let take = usize::try_from(count).unwrap_or(usize::MAX);
        let extracted = if action == ActionCode::StringExtract {
            let bytes = s.as_str().as_bytes();
            let slice = bytes.get(start.min(bytes.len())..).unwrap_or_default();
            let end = take.min(slice.len());
            String::from_utf8_lossy(slice.get(..end).unwrap_or_default()).into_owned()
        } else {
            s.as_str().chars().skip(start).take(take).collect()
        };
        frame.push(extracted);
        Ok(())
    }

    fn action_set_member(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let value = frame.pop()?;
        let name = frame.pop()?;
        let target = frame.pop()?;
        let name = self.to_string(ctx, &name)?;
        let obj = match &target {
            AvmValue::Object(obj) => obj,
            AvmValue::Undefined | AvmValue::Null => {
                return Err(AvmError::script(format!(
                    "Cannot set property '{}' of {}",
                    name,
                    target.type_of()
                )));
            }
            // Writes to primitives are dropped
            _ => return Ok(()),
        };
        adopt_method(obj, &value);
        obj.set(name.as_str(), value);
        Ok(())
    }

    fn action_init_object(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let count = frame.pop_count(2)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let value = frame.pop()?;
            let name = frame.pop()?;
            entries.push((name, value));
        }
        let obj: ObjectRef = ScriptObject::new_plain(Some(ctx.prototypes().object.cheap_clone()));
        for (name, value) in entries {
            let name = self.to_string(ctx, &name)?;
            obj.set(name.as_str(), value);
        }
        frame.push(obj);
        Ok(())
    }

    fn action_call_function(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let name = frame.pop()?;
        let args = frame.pop_args()?;
        let name = self.to_string(ctx, &name)?;
        let callee = variables::get_variable(ctx, frame, name.as_str())?;
        let function = callee
            .as_object()
            .filter(|f| f.is_callable())
            .ok_or_else(|| AvmError::script(format!("Function \"{}\" is not found", name)))?;
        let this = variables::this_value(frame);
        let result = function.call(self, this, &args)?;
        frame.push(result);
        Ok(())
    }

    fn action_call_method(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let method_name = frame.pop()?;
        let target = frame.pop()?;
        let args = frame.pop_args()?;
        let method_name = if method_name.is_null_or_undefined() {
            AvmString::default()
        } else {
            self.to_string(ctx, &method_name)?
        };

        // A blank name calls the target itself
        if method_name.is_empty() {
            let (function, this) = match &target {
                AvmValue::Super => (
                    super_constructor(ctx, frame)?,
                    variables::this_value(frame),
                ),
                _ => (
                    expect_callable(&target, "method target")?,
                    target.clone(),
                ),
            };
            let result = function.call(self, this, &args)?;
            frame.push(result);
            return Ok(());
        }

        let (holder, this) = match &target {
            AvmValue::Undefined | AvmValue::Null => {
                return Err(AvmError::script(format!(
                    "Cannot call method {} of {}",
                    method_name,
                    target.type_of()
                )));
            }
            AvmValue::Super => {
                let base = super_constructor(ctx, frame)?;
                let proto = match base.get("prototype") {
                    Some(AvmValue::Object(proto)) => proto,
                    _ => ctx.prototypes().object.cheap_clone(),
                };
                (proto, variables::this_value(frame))
            }
            other => {
                let holder = self.to_object(ctx, other).ok_or_else(|| {
                    AvmError::script(format!("Cannot call method {}", method_name))
                })?;
                (holder, other.clone())
            }
        };
        let method = resolve_property(&*holder, method_name.as_str())
            .and_then(|resolved| holder.get(resolved.as_str()))
            .ok_or_else(|| {
                AvmError::script(format!("Method {} is not defined.", method_name))
            })?;
        let function = expect_callable(&method, method_name.as_str())?;
        let result = function.call(self, this, &args)?;
        frame.push(result);
        Ok(())
    }

    fn action_new_method(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        frame: &mut ActionFrame,
    ) -> Result<(), AvmError> {
        let method_name = frame.pop()?;
        let target = frame.pop()?;
        let args = frame.pop_args()?;
        let method_name = if method_name.is_null_or_undefined() {
            AvmString::default()
        } else {
            self.to_string(ctx, &method_name)?
        };
        if target.is_null_or_undefined() {
            return Err(AvmError::script(format!(
                "Cannot call new using {}",
                target.type_of()
            )));
        }

        let constructor = if method_name.is_empty() {
            target.clone()
        } else {
            let holder = self.to_object(ctx, &target).ok_or_else(|| {
                AvmError::script(format!("Method {} is not defined.", method_name))
            })?;
            resolve_property(&*holder, method_name.as_str())
                .and_then(|resolved| holder.get(resolved.as_str()))
                .ok_or_else(|| {
                    AvmError::script(format!("Method {} is not defined.", method_name))
                })?
        };
        let constructor = expect_object(&constructor, "new")?;
        let result = self.construct_object(ctx, &constructor, &args)?;
        frame.push(result);
        Ok(())
    }

    /// Instantiate `constructor`: built-in types first, then objects that
    /// construct themselves, then a plain object inheriting from the
    /// constructor's `prototype` and initialised by calling it.
    pub(crate) fn construct_object(
        &mut self,
        ctx: &Rc<ExecutionContext>,
        constructor: &ObjectRef,
        args: &[AvmValue],
    ) -> Result<AvmValue, AvmError> {
        if let Some(value) = super::builtins::create_builtin_type(self, ctx, constructor, args)? {
            return Ok(value);
        }
        if let Some(result) = constructor.construct(self, args) {
            return result.map(AvmValue::Object);
        }

        let proto = match constructor.get("prototype") {
            Some(AvmValue::Object(proto)) => proto,
            _ => ctx.prototypes().object.cheap_clone(),
        };
        let instance: ObjectRef = ScriptObject::new_plain(Some(proto));
        instance.define_hidden("constructor", AvmValue::Object(constructor.cheap_clone()));
        if constructor.is_callable() {
            constructor.call(self, AvmValue::Object(instance.cheap_clone()), args)?;
        }
        Ok(AvmValue::Object(instance))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Push a comparison result: a boolean from version 5 on, 1/0 before
fn push_bool(ctx: &ExecutionContext, frame: &mut ActionFrame, value: bool) {
    if ctx.version() >= 5 {
        frame.push(value);
    } else {
        frame.push(if value { 1.0 } else { 0.0 });
    }
}

/// Relative jump from the end of the current action
fn jump(frame: &mut ActionFrame, offset: i16) -> Result<(), AvmError> {
    let target = frame.next_position as i64 + i64::from(offset);
    frame.next_position = usize::try_from(target).map_err(|_| {
        AvmError::decode(
            format!("jump target {} is before the block start", target),
            frame.action_position,
        )
    })?;
    Ok(())
}

/// Skip `count` whole actions following the current one without running them
fn skip_actions(frame: &mut ActionFrame, count: u8) -> Result<(), AvmError> {
    frame.reader.set_position(frame.next_position);
    for _ in 0..count {
        if frame.reader.is_at_end() {
            break;
        }
        let code = frame.reader.read_u8()?;
        let length = if code >= 0x80 {
            frame.reader.read_u16()? as usize
        } else {
            0
        };
        frame.reader.set_position(frame.reader.position() + length);
    }
    frame.next_position = frame.reader.position();
    Ok(())
}

/// Take the `size` bytes following the current action as a nested block
pub(super) fn take_body(frame: &mut ActionFrame, size: usize) -> Result<ActionBlock, AvmError> {
    frame.reader.set_position(frame.next_position);
    let body = frame.reader.read_block(size)?;
    frame.next_position = frame.reader.position();
    Ok(body)
}

/// Push the own enumerable property names of `obj`
fn push_property_names(frame: &mut ActionFrame, obj: &ObjectRef) {
    for name in obj.own_keys(true) {
        frame.push(name);
    }
}

fn expect_object(value: &AvmValue, what: &str) -> Result<ObjectRef, AvmError> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| AvmError::script(format!("{}: {:?} is not an object", what, value)))
}

fn expect_callable(value: &AvmValue, what: &str) -> Result<ObjectRef, AvmError> {
    value
        .as_object()
        .filter(|f| f.is_callable())
        .cloned()
        .ok_or_else(|| AvmError::script(format!("{} is not a function", what)))
}

/// The base-class constructor of the running closure's owner class
fn super_constructor(ctx: &ExecutionContext, frame: &ActionFrame) -> Result<ObjectRef, AvmError> {
    let class = variables::get_variable(ctx, frame, "__class")?;
    class
        .as_object()
        .and_then(|class| class.get("__super"))
        .and_then(|base| base.as_object().cloned())
        .ok_or_else(|| AvmError::script("super is not available here"))
}

/// Make `subclass.prototype` a fresh object inheriting from the superclass
/// prototype
fn extend_class(
    ctx: &ExecutionContext,
    subclass: &AvmValue,
    superclass: &AvmValue,
) -> Result<(), AvmError> {
    let subclass = expect_object(subclass, "Extends")?;
    let superclass = expect_object(superclass, "Extends")?;
    let base_proto = match superclass.get("prototype") {
        Some(AvmValue::Object(proto)) => proto,
        _ => ctx.prototypes().object.cheap_clone(),
    };
    let proto: ObjectRef = ScriptObject::new_plain(Some(base_proto));
    proto.define_hidden("constructor", AvmValue::Object(subclass.cheap_clone()));
    subclass.define_hidden("__super", AvmValue::Object(superclass));
    subclass.define_hidden("prototype", AvmValue::Object(proto));
    Ok(())
}

/// A closure stored on a class prototype takes that class as its owner, so
/// `super` inside it resolves against the class's base.
fn adopt_method(target: &ObjectRef, value: &AvmValue) {
    let Some(closure) = value
        .as_object()
        .and_then(|f| f.as_script_object())
        .and_then(ScriptObject::as_closure)
    else {
        return;
    };
    let Some(AvmValue::Object(class)) = target.get_own("constructor") else {
        return;
    };
    if let Some(AvmValue::Object(proto)) = class.get_own("prototype") {
        if same_object(&proto, target) {
            closure.set_owner_class(&class);
        }
    }
}
