//! Scalar values and the coercion applied to everything read back from a store.
//!
//! Stores only ever hand back text. [`coerce`] guesses which scalar a piece of
//! text was before it was written: `undefined`, `null`, an integer, a float, or
//! just a string.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Literal text that coerces to [`Value::Undefined`]
pub const UNDEFINED_TEXT: &str = "undefined";

/// Literal text that coerces to [`Value::Null`]
pub const NULL_TEXT: &str = "null";

/// A whole-string decimal number: optional sign, digits with an optional
/// fraction (or a bare `.5` style fraction), optional exponent.
static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
        .expect("numeric pattern is a valid regex")
});

/// A single scalar as held by a configuration map or read from a store.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value at all (distinct from an explicit null)
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Returns `false` for `Undefined`, `Null`, `false`, `0`, `0.0`, `NaN` and
    /// the empty string. Every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
        }
    }

    /// Returns `true` for `Undefined` and `Null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text written to a store for this value.
    ///
    /// Reading the text back with [`coerce_str`] is lossy in a few places:
    /// zero becomes [`Value::Null`], `10.0` becomes `Int(10)`, booleans come
    /// back as strings, and non-finite floats (written `"Infinity"`,
    /// `"-Infinity"` and `"NaN"`) are not numeric, so they come back as
    /// strings too.
    pub fn to_stored(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str(UNDEFINED_TEXT),
            Value::Null => f.write_str(NULL_TEXT),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) if x.is_nan() => f.write_str("NaN"),
            Value::Float(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Converts a value read from a store back into the scalar it most likely was.
///
/// Rules, applied in order:
///
/// 1. the text `"undefined"` becomes [`Value::Undefined`];
/// 2. falsy values, the text `"null"` and numeric text equal to zero become
///    [`Value::Null`] (so a stored zero does **not** come back as a number);
/// 3. anything that is not a whole-string decimal number is returned as is;
/// 4. numbers whose integer parse equals their float parse become
///    [`Value::Int`], all others [`Value::Float`].
///
/// ```rust
/// use kvhelper_core::{coerce, Value};
///
/// assert_eq!(coerce(&Value::from("123")), Value::Int(123));
/// assert_eq!(coerce(&Value::from("10.11")), Value::Float(10.11));
/// assert_eq!(coerce(&Value::from("abc")), Value::from("abc"));
/// assert_eq!(coerce(&Value::Int(0)), Value::Null);
/// ```
pub fn coerce(item: &Value) -> Value {
    match item {
        Value::Str(s) if s == UNDEFINED_TEXT => Value::Undefined,
        v if is_empty(v) => Value::Null,
        Value::Str(s) => parse_numeric(s).unwrap_or_else(|| item.clone()),
        // native numbers and `true` are already typed
        other => other.clone(),
    }
}

/// [`coerce`] for raw store text, without building an intermediate [`Value`].
pub fn coerce_str(text: &str) -> Value {
    if text == UNDEFINED_TEXT {
        return Value::Undefined;
    }
    if text.is_empty() || text == NULL_TEXT || text == "0" {
        return Value::Null;
    }
    parse_numeric(text).unwrap_or_else(|| Value::Str(text.to_string()))
}

/// [`coerce`] for a store reply that may be missing; a missing reply is `Null`.
pub fn coerce_opt(text: Option<&str>) -> Value {
    text.map_or(Value::Null, coerce_str)
}

/// Returns `true` if the whole of `text` (ignoring surrounding ASCII
/// whitespace) is a decimal number. `"123abc"`, hex and `Infinity` are not.
pub fn is_numeric(text: &str) -> bool {
    NUMERIC.is_match(text.trim_matches(|c: char| c.is_ascii_whitespace()))
}

fn is_empty(item: &Value) -> bool {
    match item {
        Value::Str(s) => s.is_empty() || s == NULL_TEXT || s == "0",
        other => !other.is_truthy(),
    }
}

fn parse_numeric(text: &str) -> Option<Value> {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    if !NUMERIC.is_match(trimmed) {
        return None;
    }
    let float: f64 = trimmed.parse().ok()?;
    if float == 0.0 {
        // "00", "0.0" and "-0" read back like "0"
        return Some(Value::Null);
    }
    match leading_integer(trimmed) {
        Some(int) if int as f64 == float => Some(Value::Int(int)),
        _ => Some(Value::Float(float)),
    }
}

/// Integer parse of the mantissa only: `"1e3"` gives 1, `".5"` gives nothing.
fn leading_integer(text: &str) -> Option<i64> {
    let end = text
        .find(|c: char| c == '.' || c == 'e' || c == 'E')
        .unwrap_or(text.len());
    text[..end].parse().ok()
}
