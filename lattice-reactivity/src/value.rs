//! Dynamic Values
//!
//! Reactive state in this crate is dynamic: a reactive object is a bag of
//! properties whose values may be primitives, nested objects, proxies over
//! objects, or refs. This module defines that value model.
//!
//! # Identity vs. Equality
//!
//! Change detection uses [`same_value`], which follows the `Object.is`
//! rules of the data model this engine mirrors:
//!
//! - `NaN` is the same value as `NaN`
//! - `+0` and `-0` are different values
//! - objects, proxies and refs compare by identity, never by contents
//!
//! The `PartialEq` impl is the ordinary one (IEEE numbers) and is meant for
//! assertions, not for deciding whether to notify subscribers.

use std::fmt;
use std::rc::Rc;

use serde::ser::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::object::RawObject;
use crate::reactive::{Reactive, Ref};

/// A property key on a reactive object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropKey {
    /// A named property, e.g. `foo`.
    Name(Rc<str>),
    /// An array slot.
    Index(usize),
}

impl PropKey {
    /// The synthetic key tracked by array length reads.
    pub fn length() -> Self {
        PropKey::Name(Rc::from("length"))
    }

    /// The property name, if this is a named key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PropKey::Name(name) => Some(name),
            PropKey::Index(_) => None,
        }
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Name(name) => f.write_str(name),
            PropKey::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        PropKey::Name(Rc::from(name))
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        PropKey::Name(Rc::from(name))
    }
}

impl From<&String> for PropKey {
    fn from(name: &String) -> Self {
        PropKey::Name(Rc::from(name.as_str()))
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        PropKey::Index(index)
    }
}

impl From<&PropKey> for PropKey {
    fn from(key: &PropKey) -> Self {
        key.clone()
    }
}

/// A dynamically typed value stored in, or read from, a reactive object.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent or null.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// A plain, untracked object or array.
    Object(RawObject),
    /// A reactive or read-only view over an object.
    Proxy(Reactive),
    /// A single-value reactive cell.
    Ref(Ref),
}

impl Value {
    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Proxy(_) => "proxy",
            Value::Ref(_) => "ref",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value is an object (raw or behind a proxy).
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Proxy(_))
    }

    /// Truthiness as used by conditional reads in effect bodies.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Proxy(_) | Value::Ref(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The raw object, if this is an unwrapped object.
    pub fn as_object(&self) -> Option<&RawObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Reactive> {
        match self {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Strip a proxy down to its raw target. Other values are unchanged.
    pub fn into_raw(self) -> Value {
        match self {
            Value::Proxy(proxy) => Value::Object(proxy.raw().clone()),
            other => other,
        }
    }

    /// Snapshot the value as JSON without tracking any reads.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// `Object.is` semantics.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan())
        }
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        (Value::Proxy(x), Value::Proxy(y)) => x.ptr_eq(y),
        (Value::Ref(x), Value::Ref(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// Whether assigning `new` over `old` counts as a change.
pub fn has_changed(new: &Value, old: &Value) -> bool {
    !same_value(new, old)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(x), Value::Number(y)) => x == y,
            _ => same_value(self, other),
        }
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        self.as_f64() == Some(*other)
    }
}

impl PartialEq<i32> for Value {
    fn eq(&self, other: &i32) -> bool {
        self.as_f64() == Some(f64::from(*other))
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<RawObject> for Value {
    fn from(object: RawObject) -> Self {
        Value::Object(object)
    }
}

impl From<Reactive> for Value {
    fn from(proxy: Reactive) -> Self {
        Value::Proxy(proxy)
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Object(RawObject::array(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(map) => Value::Object(RawObject::from_entries(
                map.into_iter().map(|(k, v)| (PropKey::from(k), Value::from(v))),
            )),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> Error {
    Error::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("number", &value))
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", &value))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl TryFrom<Value> for RawObject {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(object) => Ok(object),
            Value::Proxy(proxy) => Ok(proxy.raw().clone()),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl TryFrom<Value> for Reactive {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Proxy(proxy) => Ok(proxy),
            other => Err(mismatch("proxy", &other)),
        }
    }
}

impl TryFrom<Value> for Ref {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Ref(r) => Ok(r),
            other => Err(mismatch("ref", &other)),
        }
    }
}

/// Finite, whole and within `i64` range, so it serializes as an integer.
fn is_integral(n: f64) -> bool {
    let in_range = n >= i64::MIN as f64 && n < i64::MAX as f64;
    in_range && n.fract() == 0.0 && !(n == 0.0 && n.is_sign_negative())
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if is_integral(*n) => serializer.serialize_i64(*n as i64),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Object(object) => object.serialize(serializer),
            Value::Proxy(proxy) => proxy.raw().serialize(serializer),
            Value::Ref(r) => r.get_untracked().serialize(serializer),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
