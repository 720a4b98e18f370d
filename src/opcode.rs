//! Action code table
//!
//! One entry per action the interpreter understands. Codes with the high
//! bit set carry a 16-bit payload length after the code byte.

/// Action codes by SWF version of introduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionCode {
    End = 0x00,

    // SWF 3
    NextFrame = 0x04,
    PreviousFrame = 0x05,
    Play = 0x06,
    Stop = 0x07,
    ToggleQuality = 0x08,
    StopSounds = 0x09,
    GotoFrame = 0x81,
    GetUrl = 0x83,
    WaitForFrame = 0x8A,
    SetTarget = 0x8B,
    GoToLabel = 0x8C,

    // SWF 4
    Add = 0x0A,
    Subtract = 0x0B,
    Multiply = 0x0C,
    Divide = 0x0D,
    Equals = 0x0E,
    Less = 0x0F,
    And = 0x10,
    Or = 0x11,
    Not = 0x12,
    StringEquals = 0x13,
    StringLength = 0x14,
    StringExtract = 0x15,
    Pop = 0x17,
    ToInteger = 0x18,
    GetVariable = 0x1C,
    SetVariable = 0x1D,
    SetTarget2 = 0x20,
    StringAdd = 0x21,
    GetProperty = 0x22,
    SetProperty = 0x23,
    CloneSprite = 0x24,
    RemoveSprite = 0x25,
    Trace = 0x26,
    StartDrag = 0x27,
    EndDrag = 0x28,
    StringLess = 0x29,
    RandomNumber = 0x30,
    MbStringLength = 0x31,
    CharToAscii = 0x32,
    AsciiToChar = 0x33,
    GetTime = 0x34,
    MbStringExtract = 0x35,
    MbCharToAscii = 0x36,
    MbAsciiToChar = 0x37,
    WaitForFrame2 = 0x8D,
    Push = 0x96,
    Jump = 0x99,
    GetUrl2 = 0x9A,
    If = 0x9D,
    Call = 0x9E,
    GotoFrame2 = 0x9F,

    // SWF 5
    Delete = 0x3A,
    Delete2 = 0x3B,
    DefineLocal = 0x3C,
    CallFunction = 0x3D,
    Return = 0x3E,
    Modulo = 0x3F,
    NewObject = 0x40,
    DefineLocal2 = 0x41,
    InitArray = 0x42,
    InitObject = 0x43,
    TypeOf = 0x44,
    TargetPath = 0x45,
    Enumerate = 0x46,
    Add2 = 0x47,
    Less2 = 0x48,
    Equals2 = 0x49,
    ToNumber = 0x4A,
    ToString = 0x4B,
    PushDuplicate = 0x4C,
    StackSwap = 0x4D,
    GetMember = 0x4E,
    SetMember = 0x4F,
    Increment = 0x50,
    Decrement = 0x51,
    CallMethod = 0x52,
    NewMethod = 0x53,
    BitAnd = 0x60,
    BitOr = 0x61,
    BitXor = 0x62,
    BitLShift = 0x63,
    BitRShift = 0x64,
    BitURShift = 0x65,
    StoreRegister = 0x87,
    ConstantPool = 0x88,
    With = 0x94,
    DefineFunction = 0x9B,

    // SWF 6
    InstanceOf = 0x54,
    Enumerate2 = 0x55,
    StrictEquals = 0x66,
    Greater = 0x67,
    StringGreater = 0x68,

    // SWF 7
    Extends = 0x69,
    CastOp = 0x2B,
    ImplementsOp = 0x2C,
    Throw = 0x2A,
    DefineFunction2 = 0x8E,
    Try = 0x8F,

    // Undocumented
    FsCommand2 = 0x2D,
    StrictMode = 0x89,
}

impl ActionCode {
    /// Decode an action code byte
    pub fn from_u8(code: u8) -> Option<ActionCode> {
        use ActionCode::*;
        let action = match code {
            0x00 => End,
            0x04 => NextFrame,
            0x05 => PreviousFrame,
            0x06 => Play,
            0x07 => Stop,
            0x08 => ToggleQuality,
            0x09 => StopSounds,
            0x0A => Add,
            0x0B => Subtract,
            0x0C => Multiply,
            0x0D => Divide,
            0x0E => Equals,
            0x0F => Less,
            0x10 => And,
            0x11 => Or,
            0x12 => Not,
            0x13 => StringEquals,
            0x14 => StringLength,
            0x15 => StringExtract,
            0x17 => Pop,
            0x18 => ToInteger,
            0x1C => GetVariable,
            0x1D => SetVariable,
            0x20 => SetTarget2,
            0x21 => StringAdd,
            0x22 => GetProperty,
            0x23 => SetProperty,
            0x24 => CloneSprite,
            0x25 => RemoveSprite,
            0x26 => Trace,
            0x27 => StartDrag,
            0x28 => EndDrag,
            0x29 => StringLess,
            0x2A => Throw,
            0x2B => CastOp,
            0x2C => ImplementsOp,
            0x2D => FsCommand2,
            0x30 => RandomNumber,
            0x31 => MbStringLength,
            0x32 => CharToAscii,
            0x33 => AsciiToChar,
            0x34 => GetTime,
            0x35 => MbStringExtract,
            0x36 => MbCharToAscii,
            0x37 => MbAsciiToChar,
            0x3A => Delete,
            0x3B => Delete2,
            0x3C => DefineLocal,
            0x3D => CallFunction,
            0x3E => Return,
            0x3F => Modulo,
            0x40 => NewObject,
            0x41 => DefineLocal2,
            0x42 => InitArray,
            0x43 => InitObject,
            0x44 => TypeOf,
            0x45 => TargetPath,
            0x46 => Enumerate,
            0x47 => Add2,
            0x48 => Less2,
            0x49 => Equals2,
            0x4A => ToNumber,
            0x4B => ToString,
            0x4C => PushDuplicate,
            0x4D => StackSwap,
            0x4E => GetMember,
            0x4F => SetMember,
            0x50 => Increment,
            0x51 => Decrement,
            0x52 => CallMethod,
            0x53 => NewMethod,
            0x54 => InstanceOf,
            0x55 => Enumerate2,
            0x60 => BitAnd,
            0x61 => BitOr,
            0x62 => BitXor,
            0x63 => BitLShift,
            0x64 => BitRShift,
            0x65 => BitURShift,
            0x66 => StrictEquals,
            0x67 => Greater,
            0x68 => StringGreater,
            0x69 => Extends,
            0x81 => GotoFrame,
            0x83 => GetUrl,
            0x87 => StoreRegister,
            0x88 => ConstantPool,
            0x89 => StrictMode,
            0x8A => WaitForFrame,
            0x8B => SetTarget,
            0x8C => GoToLabel,
            0x8D => WaitForFrame2,
            0x8E => DefineFunction2,
            0x8F => Try,
            0x94 => With,
            0x96 => Push,
            0x99 => Jump,
            0x9A => GetUrl2,
            0x9B => DefineFunction,
            0x9D => If,
            0x9E => Call,
            0x9F => GotoFrame2,
            _ => return None,
        };
        Some(action)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a 16-bit payload length follows the code byte
    pub fn has_payload(self) -> bool {
        self.code() >= 0x80
    }

    /// Name as listed in the SWF action table
    pub fn name(self) -> &'static str {
        use ActionCode::*;
        match self {
            End => "End",
            NextFrame => "ActionNextFrame",
            PreviousFrame => "ActionPreviousFrame",
            Play => "ActionPlay",
            Stop => "ActionStop",
            ToggleQuality => "ActionToggleQuality",
            StopSounds => "ActionStopSounds",
            GotoFrame => "ActionGotoFrame",
            GetUrl => "ActionGetURL",
            WaitForFrame => "ActionWaitForFrame",
            SetTarget => "ActionSetTarget",
            GoToLabel => "ActionGoToLabel",
            Add => "ActionAdd",
            Subtract => "ActionSubtract",
            Multiply => "ActionMultiply",
            Divide => "ActionDivide",
            Equals => "ActionEquals",
            Less => "ActionLess",
            And => "ActionAnd",
            Or => "ActionOr",
            Not => "ActionNot",
            StringEquals => "ActionStringEquals",
            StringLength => "ActionStringLength",
            StringExtract => "ActionStringExtract",
            Pop => "ActionPop",
            ToInteger => "ActionToInteger",
            GetVariable => "ActionGetVariable",
            SetVariable => "ActionSetVariable",
            SetTarget2 => "ActionSetTarget2",
            StringAdd => "ActionStringAdd",
            GetProperty => "ActionGetProperty",
            SetProperty => "ActionSetProperty",
            CloneSprite => "ActionCloneSprite",
            RemoveSprite => "ActionRemoveSprite",
            Trace => "ActionTrace",
            StartDrag => "ActionStartDrag",
            EndDrag => "ActionEndDrag",
            StringLess => "ActionStringLess",
            RandomNumber => "ActionRandomNumber",
            MbStringLength => "ActionMBStringLength",
            CharToAscii => "ActionCharToAscii",
            AsciiToChar => "ActionAsciiToChar",
            GetTime => "ActionGetTime",
            MbStringExtract => "ActionMBStringExtract",
            MbCharToAscii => "ActionMBCharToAscii",
            MbAsciiToChar => "ActionMBAsciiToChar",
            WaitForFrame2 => "ActionWaitForFrame2",
            Push => "ActionPush",
            Jump => "ActionJump",
            GetUrl2 => "ActionGetURL2",
            If => "ActionIf",
            Call => "ActionCall",
            GotoFrame2 => "ActionGotoFrame2",
            Delete => "ActionDelete",
            Delete2 => "ActionDelete2",
            DefineLocal => "ActionDefineLocal",
            CallFunction => "ActionCallFunction",
            Return => "ActionReturn",
            Modulo => "ActionModulo",
            NewObject => "ActionNewObject",
            DefineLocal2 => "ActionDefineLocal2",
            InitArray => "ActionInitArray",
            InitObject => "ActionInitObject",
            TypeOf => "ActionTypeOf",
            TargetPath => "ActionTargetPath",
            Enumerate => "ActionEnumerate",
            Add2 => "ActionAdd2",
            Less2 => "ActionLess2",
            Equals2 => "ActionEquals2",
            ToNumber => "ActionToNumber",
            ToString => "ActionToString",
            PushDuplicate => "ActionPushDuplicate",
            StackSwap => "ActionStackSwap",
            GetMember => "ActionGetMember",
            SetMember => "ActionSetMember",
            Increment => "ActionIncrement",
            Decrement => "ActionDecrement",
            CallMethod => "ActionCallMethod",
            NewMethod => "ActionNewMethod",
            BitAnd => "ActionBitAnd",
            BitOr => "ActionBitOr",
            BitXor => "ActionBitXor",
            BitLShift => "ActionBitLShift",
            BitRShift => "ActionBitRShift",
            BitURShift => "ActionBitURShift",
            StoreRegister => "ActionStoreRegister",
            ConstantPool => "ActionConstantPool",
            With => "ActionWith",
            DefineFunction => "ActionDefineFunction",
            InstanceOf => "ActionInstanceOf",
            Enumerate2 => "ActionEnumerate2",
            StrictEquals => "ActionStrictEquals",
            Greater => "ActionGreater",
            StringGreater => "ActionStringGreater",
            Extends => "ActionExtends",
            CastOp => "ActionCastOp",
            ImplementsOp => "ActionImplementsOp",
            Throw => "ActionThrow",
            DefineFunction2 => "ActionDefineFunction2",
            Try => "ActionTry",
            FsCommand2 => "ActionFSCommand2",
            StrictMode => "ActionStrictMode",
        }
    }

    /// Number of `undefined` values pushed when a failed instance of this
    /// action is recovered, so the stack keeps the depth it would have had.
    ///
    /// Handlers pop every operand before doing anything that can fail, so
    /// this is the count of values the action produces. Enumerate pushes its
    /// sentinel before resolving the target and needs no replenishment.
    pub fn recovery_pushes(self) -> usize {
        use ActionCode::*;
        match self {
            Add | Subtract | Multiply | Divide | Equals | Less | And | Or | Not
            | StringEquals | StringLength | StringExtract | ToInteger | GetVariable
            | StringAdd | GetProperty | StringLess | RandomNumber | MbStringLength
            | CharToAscii | AsciiToChar | GetTime | MbStringExtract | MbCharToAscii
            | MbAsciiToChar => 1,
            Delete | Delete2 | CallFunction | Modulo | NewObject | InitArray | InitObject
            | TypeOf | TargetPath | Add2 | Less2 | Equals2 | ToNumber | ToString
            | GetMember | Increment | Decrement | CallMethod | NewMethod | BitAnd | BitOr
            | BitXor | BitLShift | BitRShift | BitURShift => 1,
            InstanceOf | StrictEquals | Greater | StringGreater | CastOp | FsCommand2 => 1,
            _ => 0,
        }
    }

    /// Whether a script error raised by this action may be swallowed by
    /// the recovery policy. Throw always propagates.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ActionCode::Throw)
    }
}
