//! Raw Objects
//!
//! A [`RawObject`] is the plain, untracked data that reactive proxies wrap.
//! Reading or writing it directly never tracks or triggers anything; code
//! that wants reactivity must go through a [`Reactive`](crate::Reactive)
//! handle instead.
//!
//! # Identity
//!
//! Every raw object gets a [`TargetId`] when it is created. The dependency
//! store is keyed by that id rather than by the object's contents, so two
//! objects with identical properties are still tracked separately.
//!
//! When the last handle to a raw object is dropped, its entry is removed
//! from the dependency store. Subscriptions to an object nobody can reach
//! any more are dead weight, so this only reclaims memory.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::reactive::PropertyAccess;
use crate::value::{PropKey, Value};

/// Stable identity of a raw object in the dependency store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

impl TargetId {
    /// Allocate a new unique target ID.
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Whether a raw object behaves as a keyed record or as an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Object,
    Array,
}

struct ObjectInner {
    id: TargetId,
    kind: ObjectKind,
    props: RefCell<IndexMap<PropKey, Value>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        crate::reactive::dep_store::forget(self.id);
    }
}

/// A plain object or array, shared by reference.
///
/// Cloning a `RawObject` creates a new handle to the **same** object.
#[derive(Clone)]
pub struct RawObject {
    inner: Rc<ObjectInner>,
}

impl RawObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Object, IndexMap::new())
    }

    /// Create an object from key/value pairs, keeping their order.
    pub fn from_entries<K, V, I>(entries: I) -> Self
    where
        K: Into<PropKey>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let props = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_kind(ObjectKind::Object, props)
    }

    /// Create an array object; items are stored under index keys.
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let props = items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (PropKey::Index(i), v.into()))
            .collect();
        Self::with_kind(ObjectKind::Array, props)
    }

    fn with_kind(kind: ObjectKind, props: IndexMap<PropKey, Value>) -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: TargetId::next(),
                kind,
                props: RefCell::new(props),
            }),
        }
    }

    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.inner.kind
    }

    pub fn is_array(&self) -> bool {
        self.inner.kind == ObjectKind::Array
    }

    /// Read a property. Missing properties read as [`Value::Null`].
    pub fn get(&self, key: &PropKey) -> Value {
        self.inner
            .props
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Write a property, returning the previous value if there was one.
    pub fn set(&self, key: PropKey, value: Value) -> Option<Value> {
        self.inner.props.borrow_mut().insert(key, value)
    }

    pub fn contains(&self, key: &PropKey) -> bool {
        self.inner.props.borrow().contains_key(key)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<PropKey> {
        self.inner.props.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &RawObject) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for RawObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyAccess for RawObject {
    fn get(&self, key: &PropKey) -> Value {
        RawObject::get(self, key)
    }

    fn set(&self, key: PropKey, value: Value) -> bool {
        RawObject::set(self, key, value);
        true
    }

    fn keys(&self) -> Vec<PropKey> {
        RawObject::keys(self)
    }
}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawObject")
            .field("id", &self.inner.id.raw())
            .field("kind", &self.inner.kind)
            .field("len", &self.len())
            .finish()
    }
}

impl Serialize for RawObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let props = self.inner.props.borrow();
        match self.inner.kind {
            ObjectKind::Array => {
                let mut seq = serializer.serialize_seq(Some(props.len()))?;
                for value in props.values() {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            ObjectKind::Object => {
                let mut map = serializer.serialize_map(Some(props.len()))?;
                for (key, value) in props.iter() {
                    map.serialize_entry(&key.to_string(), value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_ids_are_unique() {
        let a = RawObject::new();
        let b = RawObject::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test]
    fn raw_reads_and_writes() {
        let object = RawObject::from_entries([("foo", 1)]);
        assert_eq!(object.get(&"foo".into()), 1);
        assert!(object.get(&"missing".into()).is_null());

        let previous = object.set("foo".into(), Value::from(2));
        assert_eq!(previous, Some(Value::from(1)));
        assert_eq!(object.get(&"foo".into()), 2);
    }

    #[test]
    fn keys_keep_insertion_order() {
        let object = RawObject::from_entries([("b", 1), ("a", 2)]);
        object.set("c".into(), Value::from(3));
        assert_eq!(
            object.keys(),
            vec![PropKey::from("b"), PropKey::from("a"), PropKey::from("c")]
        );
    }

    #[test]
    fn clone_shares_state() {
        let a = RawObject::new();
        let b = a.clone();
        b.set("x".into(), Value::from(true));
        assert!(a.ptr_eq(&b));
        assert_eq!(a.get(&"x".into()), true);
    }
}
