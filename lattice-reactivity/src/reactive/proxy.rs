//! Reactive Proxies
//!
//! A [`Reactive`] is a handle over a [`RawObject`] whose accessors do the
//! dependency bookkeeping: reads track, writes trigger. All four flavours
//! are the same type with different [`ProxyFlags`]:
//!
//! | constructor          | tracks reads | accepts writes | wraps nested objects |
//! |----------------------|--------------|----------------|----------------------|
//! | [`reactive`]         | yes          | yes            | yes, reactive        |
//! | [`readonly`]         | no           | no (warns)     | yes, read-only       |
//! | [`shallow_reactive`] | yes          | yes            | no                   |
//! | [`shallow_readonly`] | no           | no (warns)     | no                   |
//!
//! Nested objects are wrapped again on every read rather than cached;
//! wrapping is one `Rc` clone, and two wrappers over the same target with
//! the same flags behave identically (and compare equal with
//! [`Reactive::ptr_eq`]).

use std::fmt;

use super::dep_store;
use super::handlers;
use super::refs::Ref;
use crate::error::{Error, Result};
use crate::object::RawObject;
use crate::value::{PropKey, Value};

/// Uniform get/set capability shared by raw objects, proxies and
/// ref-unwrapping views.
pub trait PropertyAccess {
    fn get(&self, key: &PropKey) -> Value;

    /// Write a property. Returns whether the write was accepted, which for
    /// read-only proxies is `true` even though nothing changed.
    fn set(&self, key: PropKey, value: Value) -> bool;

    /// Own keys, untracked.
    fn keys(&self) -> Vec<PropKey>;

    /// The ref stored at `key`, if the property holds one.
    ///
    /// Views that unwrap refs on read override this to reach the binding.
    fn ref_at(&self, key: &PropKey) -> Option<Ref> {
        match self.get(key) {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }
}

/// Reserved introspection keys answered by every proxy without touching
/// its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactiveFlags {
    IsReactive,
    IsReadonly,
}

impl ReactiveFlags {
    pub fn key(self) -> &'static str {
        match self {
            ReactiveFlags::IsReactive => "__v_isReactive",
            ReactiveFlags::IsReadonly => "__v_isReadonly",
        }
    }

    pub fn from_key(key: &PropKey) -> Option<Self> {
        match key.as_name()? {
            "__v_isReactive" => Some(ReactiveFlags::IsReactive),
            "__v_isReadonly" => Some(ReactiveFlags::IsReadonly),
            _ => None,
        }
    }
}

/// Mode of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProxyFlags {
    pub readonly: bool,
    pub shallow: bool,
}

/// A reactive (or read-only) view over a raw object.
///
/// Cloning a `Reactive` creates a new handle to the **same** target.
#[derive(Clone)]
pub struct Reactive {
    target: RawObject,
    flags: ProxyFlags,
}

impl Reactive {
    /// Read a property. See the module docs for what is tracked and wrapped.
    pub fn get(&self, key: impl Into<PropKey>) -> Value {
        handlers::get(self, &key.into())
    }

    /// Write a property and notify subscribers if the value changed.
    pub fn set(&self, key: impl Into<PropKey>, value: impl Into<Value>) -> bool {
        handlers::set(self, key.into(), value.into())
    }

    /// Number of own properties (array length for arrays). Tracks `length`.
    pub fn len(&self) -> usize {
        if !self.flags.readonly {
            dep_store::track(self.target.id(), &PropKey::length());
        }
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to an array target.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        let index = self.target.len();
        self.set(PropKey::Index(index), value)
    }

    /// Snapshot of the target's own keys. Untracked.
    pub fn keys(&self) -> Vec<PropKey> {
        self.target.keys()
    }

    /// The raw object behind this proxy.
    pub fn raw(&self) -> &RawObject {
        &self.target
    }

    pub fn flags(&self) -> ProxyFlags {
        self.flags
    }

    /// Same target, same flags.
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        self.target.ptr_eq(&other.target) && self.flags == other.flags
    }
}

impl PropertyAccess for Reactive {
    fn get(&self, key: &PropKey) -> Value {
        handlers::get(self, key)
    }

    fn set(&self, key: PropKey, value: Value) -> bool {
        handlers::set(self, key, value)
    }

    fn keys(&self) -> Vec<PropKey> {
        self.target.keys()
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("target", &self.target)
            .field("readonly", &self.flags.readonly)
            .field("shallow", &self.flags.shallow)
            .finish()
    }
}

fn create_reactive_object(target: RawObject, readonly: bool, shallow: bool) -> Reactive {
    Reactive {
        target,
        flags: ProxyFlags { readonly, shallow },
    }
}

/// Deeply reactive view over `target`.
pub fn reactive(target: RawObject) -> Reactive {
    create_reactive_object(target, false, false)
}

/// Deeply read-only view over `target`. Reads are not tracked.
pub fn readonly(target: RawObject) -> Reactive {
    create_reactive_object(target, true, false)
}

/// Reactive at the top level only; nested objects come back raw.
pub fn shallow_reactive(target: RawObject) -> Reactive {
    create_reactive_object(target, false, true)
}

/// Read-only at the top level only; nested objects come back raw and
/// mutable.
pub fn shallow_readonly(target: RawObject) -> Reactive {
    create_reactive_object(target, true, true)
}

/// [`reactive`] for a dynamic value.
///
/// An existing proxy is returned unchanged; primitives are rejected.
pub fn reactive_value(value: Value) -> Result<Reactive> {
    match value {
        Value::Object(target) => Ok(reactive(target)),
        Value::Proxy(proxy) => Ok(proxy),
        other => Err(Error::NotAnObject { found: other.kind() }),
    }
}

fn read_flag(value: &Value, flag: ReactiveFlags) -> bool {
    match value {
        Value::Proxy(proxy) => proxy.get(flag.key()).is_truthy(),
        _ => false,
    }
}

/// Whether `value` is a mutable reactive proxy.
pub fn is_reactive(value: &Value) -> bool {
    read_flag(value, ReactiveFlags::IsReactive)
}

/// Whether `value` is a read-only proxy.
pub fn is_readonly(value: &Value) -> bool {
    read_flag(value, ReactiveFlags::IsReadonly)
}

/// Whether `value` is any kind of proxy.
pub fn is_proxy(value: &Value) -> bool {
    is_reactive(value) || is_readonly(value)
}

/// The raw object behind a proxy, or the object itself.
pub fn to_raw(value: &Value) -> Option<RawObject> {
    match value {
        Value::Object(object) => Some(object.clone()),
        Value::Proxy(proxy) => Some(proxy.raw().clone()),
        _ => None,
    }
}
