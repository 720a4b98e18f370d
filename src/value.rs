//! Action value representation
//!
//! The dynamically typed `AvmValue` that lives on the operand stack, in
//! registers and in object properties, plus the primitive coercions whose
//! results depend on the format version of the running program.

use std::fmt;
use std::rc::Rc;

use crate::object::ObjectRef;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This trait makes it explicit when a clone is cheap (just incrementing a reference count)
/// vs when it might be expensive (copying data). Types implementing this trait should have
/// O(1) clone operations, typically because they use `Rc` or similar reference counting.
///
/// # Examples
/// - `ObjectRef` (Rc<dyn AvmObject>) - cheap clone
/// - `AvmString` (Rc<str>) - cheap clone
/// - `ScopeChain` (contains Rc) - cheap clone
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    ///
    /// This is semantically identical to `clone()` but makes it explicit that
    /// the operation is O(1) and only increments a reference count.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

// Implement CheapClone for Rc-based types (Rc<dyn AvmObject> is covered by this)
impl<T: ?Sized> CheapClone for Rc<T> {}

/// A value manipulated by action bytecode
#[derive(Clone, Default)]
pub enum AvmValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(AvmString),
    Object(ObjectRef),
    /// Placeholder bound to `super` inside closures. Method calls on it are
    /// redirected to the owner class's base prototype.
    Super,
}

impl CheapClone for AvmValue {}

impl AvmValue {
    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, AvmValue::Null | AvmValue::Undefined)
    }

    /// Check if this is a string value
    pub fn is_string(&self) -> bool {
        matches!(self, AvmValue::String(_))
    }

    /// Check if this value is callable
    pub fn is_callable(&self) -> bool {
        match self {
            AvmValue::Object(obj) => obj.is_callable(),
            _ => false,
        }
    }

    /// Borrow the object reference, if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            AvmValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get the TypeOf result for this value.
    ///
    /// Unlike later ECMAScript dialects, functions report `"object"` and
    /// null reports `"null"`.
    pub fn type_of(&self) -> &'static str {
        match self {
            AvmValue::Undefined => "undefined",
            AvmValue::Null => "null",
            AvmValue::Boolean(_) => "boolean",
            AvmValue::Number(_) => "number",
            AvmValue::String(_) => "string",
            AvmValue::Object(obj) if obj.kind() == crate::object::ObjectKind::MovieClip => {
                "movieclip"
            }
            AvmValue::Object(_) | AvmValue::Super => "object",
        }
    }

    /// Convert to boolean
    pub fn to_boolean(&self) -> bool {
        match self {
            AvmValue::Undefined | AvmValue::Null => false,
            AvmValue::Boolean(b) => *b,
            AvmValue::Number(n) => *n != 0.0 && !n.is_nan(),
            AvmValue::String(s) => !s.is_empty(),
            AvmValue::Object(_) | AvmValue::Super => true,
        }
    }

    /// Convert an already-primitive value to a number.
    ///
    /// Objects reaching this point have no primitive value; they convert to
    /// NaN from version 5 on and to 0 before that.
    pub fn primitive_to_number(&self, version: u8) -> f64 {
        match self {
            AvmValue::Undefined | AvmValue::Null => {
                if version >= 7 {
                    f64::NAN
                } else {
                    0.0
                }
            }
            AvmValue::Boolean(true) => 1.0,
            AvmValue::Boolean(false) => 0.0,
            AvmValue::Number(n) => *n,
            AvmValue::String(s) => {
                if s.is_empty() && version < 5 {
                    0.0
                } else {
                    parse_number(s.as_str())
                }
            }
            AvmValue::Object(_) | AvmValue::Super => {
                if version >= 5 {
                    f64::NAN
                } else {
                    0.0
                }
            }
        }
    }

    /// Convert an already-primitive value to a string.
    ///
    /// Objects with no usable `toString` fall back to `[type Object]` or
    /// `[type Function]`; movie clips use their dotted instance path.
    pub fn primitive_to_string(&self, version: u8) -> AvmString {
        match self {
            AvmValue::Undefined => {
                if version >= 7 {
                    AvmString::from("undefined")
                } else {
                    AvmString::default()
                }
            }
            AvmValue::Null => AvmString::from("null"),
            AvmValue::Boolean(true) => AvmString::from("true"),
            AvmValue::Boolean(false) => AvmString::from("false"),
            AvmValue::Number(n) => AvmString::from(format_number(*n)),
            AvmValue::String(s) => s.cheap_clone(),
            AvmValue::Object(obj) => {
                if let Some(path) = obj.instance_path() {
                    path
                } else if obj.is_callable() {
                    AvmString::from("[type Function]")
                } else {
                    AvmString::from("[type Object]")
                }
            }
            AvmValue::Super => AvmString::from("[type Object]"),
        }
    }

    /// Strict equality (StrictEquals action)
    pub fn strict_equals(&self, other: &AvmValue) -> bool {
        match (self, other) {
            (AvmValue::Undefined, AvmValue::Undefined) => true,
            (AvmValue::Null, AvmValue::Null) => true,
            (AvmValue::Boolean(a), AvmValue::Boolean(b)) => a == b,
            // NaN != NaN falls out of f64 comparison
            (AvmValue::Number(a), AvmValue::Number(b)) => a == b,
            (AvmValue::String(a), AvmValue::String(b)) => a == b,
            (AvmValue::Object(a), AvmValue::Object(b)) => crate::object::same_object(a, b),
            (AvmValue::Super, AvmValue::Super) => true,
            _ => false,
        }
    }

    /// Loose equality between two primitives.
    ///
    /// Object operands must be reduced with ToPrimitive by the caller first;
    /// two objects compare by identity.
    pub fn loose_equals_primitive(&self, other: &AvmValue) -> bool {
        match (self, other) {
            (AvmValue::Undefined | AvmValue::Null, AvmValue::Undefined | AvmValue::Null) => true,
            (AvmValue::Undefined | AvmValue::Null, _) | (_, AvmValue::Undefined | AvmValue::Null) => {
                false
            }
            (AvmValue::Number(a), AvmValue::String(b)) => *a == parse_number(b.as_str()),
            (AvmValue::String(a), AvmValue::Number(b)) => parse_number(a.as_str()) == *b,
            (AvmValue::Boolean(a), _) => {
                AvmValue::Number(if *a { 1.0 } else { 0.0 }).loose_equals_primitive(other)
            }
            (_, AvmValue::Boolean(b)) => {
                self.loose_equals_primitive(&AvmValue::Number(if *b { 1.0 } else { 0.0 }))
            }
            _ => self.strict_equals(other),
        }
    }
}

impl fmt::Debug for AvmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvmValue::Undefined => write!(f, "undefined"),
            AvmValue::Null => write!(f, "null"),
            AvmValue::Boolean(b) => write!(f, "{}", b),
            AvmValue::Number(n) => write!(f, "{}", format_number(*n)),
            AvmValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            AvmValue::Object(obj) => write!(f, "[{:?}]", obj.kind()),
            AvmValue::Super => write!(f, "super"),
        }
    }
}

impl PartialEq for AvmValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for AvmValue {
    fn from(b: bool) -> Self {
        AvmValue::Boolean(b)
    }
}

impl From<f64> for AvmValue {
    fn from(n: f64) -> Self {
        AvmValue::Number(n)
    }
}

impl From<i32> for AvmValue {
    fn from(n: i32) -> Self {
        AvmValue::Number(n as f64)
    }
}

impl From<&str> for AvmValue {
    fn from(s: &str) -> Self {
        AvmValue::String(AvmString::from(s))
    }
}

impl From<String> for AvmValue {
    fn from(s: String) -> Self {
        AvmValue::String(AvmString::from(s))
    }
}

impl From<AvmString> for AvmValue {
    fn from(s: AvmString) -> Self {
        AvmValue::String(s)
    }
}

impl From<ObjectRef> for AvmValue {
    fn from(obj: ObjectRef) -> Self {
        AvmValue::Object(obj)
    }
}

/// Reference-counted string for efficient string handling
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AvmString(Rc<str>);

// AvmString wraps Rc<str>, so clone is cheap (just reference count increment)
impl CheapClone for AvmString {}

impl AvmString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Length in characters
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl Default for AvmString {
    fn default() -> Self {
        AvmString(Rc::from(""))
    }
}

impl AsRef<str> for AvmString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for AvmString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for AvmString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for AvmString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for AvmString {
    fn from(s: &str) -> Self {
        AvmString(s.into())
    }
}

impl From<String> for AvmString {
    fn from(s: String) -> Self {
        AvmString(s.into())
    }
}

impl fmt::Debug for AvmString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for AvmString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add<&AvmString> for AvmString {
    type Output = AvmString;

    fn add(self, other: &AvmString) -> AvmString {
        let mut s = String::with_capacity(self.len() + other.len());
        s.push_str(&self.0);
        s.push_str(&other.0);
        AvmString::from(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Number conversions
// ═══════════════════════════════════════════════════════════════════════════════

/// Format a number the way ECMAScript's Number::toString does
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    // Shortest round-trip digits and decimal exponent
    let sci = format!("{:e}", n.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: Vec<char> = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exponent + 1;

    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }

    if k <= point && point <= 21 {
        out.extend(digits.iter());
        out.extend(std::iter::repeat_n('0', (point - k) as usize));
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        out.extend(int_part.iter());
        out.push('.');
        out.extend(frac_part.iter());
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-point) as usize));
        out.extend(digits.iter());
    } else {
        let mut iter = digits.iter();
        if let Some(first) = iter.next() {
            out.push(*first);
        }
        if k > 1 {
            out.push('.');
            out.extend(iter);
        }
        out.push('e');
        out.push(if point - 1 >= 0 { '+' } else { '-' });
        out.push_str(&(point - 1).abs().to_string());
    }
    out
}

/// Parse a string the way the number conversion of the action language does
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let sign = if negative { -1.0 } else { 1.0 };

    if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        return match u64::from_str_radix(hex, 16) {
            Ok(v) => sign * v as f64,
            Err(_) => f64::NAN,
        };
    }

    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }

    // Rust accepts "inf" and "nan" spellings that are not numbers here
    if unsigned
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
    {
        return f64::NAN;
    }

    unsigned.parse::<f64>().map(|v| sign * v).unwrap_or(f64::NAN)
}

/// ToInt32: wrap a number into the signed 32-bit range
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let wrapped = n.trunc() % 4_294_967_296.0;
    wrapped as i64 as u32 as i32
}

/// ToUint32: wrap a number into the unsigned 32-bit range
pub fn to_uint32(n: f64) -> u32 {
    to_int32(n) as u32
}

/// ToInteger as the action language defines it: NaN becomes 0, infinities
/// are kept, everything else truncates through the 32-bit range
pub fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        return 0.0;
    }
    if n.is_infinite() || n == 0.0 {
        return n;
    }
    to_int32(n) as f64
}
