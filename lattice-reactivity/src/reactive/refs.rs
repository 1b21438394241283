//! Refs
//!
//! A [`Ref`] is a single reactive cell. Reading it tracks, writing it
//! triggers, and a write of the same value (per
//! [`same_value`](crate::value::same_value)) is ignored.
//!
//! Besides plain cells, a ref can be a *view* of one property of another
//! object, built by [`to_ref`]. Such a ref owns nothing: reads go to the
//! source object and writes go back to it, so the source's own reactivity
//! does all the tracking.
//!
//! [`proxy_refs`] goes the other way: it wraps an object holding refs and
//! unwraps them on read, so `p.get("age")` yields `10` rather than the ref.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::context::ReactiveContext;
use super::dep::{track_effects, trigger_effects, Dep};
use super::proxy::PropertyAccess;
use crate::value::{has_changed, PropKey, Value};

enum RefInner {
    Cell { value: RefCell<Value>, dep: Dep },
    Property {
        source: Rc<dyn PropertyAccess>,
        key: PropKey,
    },
}

/// A single-value reactive cell.
///
/// Cloning a `Ref` creates a new handle to the **same** cell.
#[derive(Clone)]
pub struct Ref {
    inner: Rc<RefInner>,
}

impl Ref {
    /// Create a cell holding `value`.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            inner: Rc::new(RefInner::Cell {
                value: RefCell::new(value.into()),
                dep: Dep::new(),
            }),
        }
    }

    fn property(source: Rc<dyn PropertyAccess>, key: PropKey) -> Self {
        Self {
            inner: Rc::new(RefInner::Property { source, key }),
        }
    }

    /// Read the value, subscribing the active effect.
    pub fn get(&self) -> Value {
        match &*self.inner {
            RefInner::Cell { value, dep } => {
                track_effects(dep);
                value.borrow().clone()
            }
            RefInner::Property { source, key } => source.get(key),
        }
    }

    /// Read the value without tracking.
    pub fn get_untracked(&self) -> Value {
        match &*self.inner {
            RefInner::Cell { value, .. } => value.borrow().clone(),
            RefInner::Property { source, key } => ReactiveContext::untracked(|| source.get(key)),
        }
    }

    /// Write the value. Subscribers re-run only if it actually changed.
    pub fn set(&self, new_value: impl Into<Value>) {
        let new_value = new_value.into();
        match &*self.inner {
            RefInner::Cell { value, dep } => {
                if !has_changed(&new_value, &value.borrow()) {
                    return;
                }
                let old = value.replace(new_value);
                drop(old);
                trigger_effects(dep);
            }
            RefInner::Property { source, key } => {
                source.set(key.clone(), new_value);
            }
        }
    }

    /// Replace the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&Value) -> Value) {
        let next = f(&self.get_untracked());
        self.set(next);
    }

    /// Whether this ref is a view onto another object's property.
    pub fn is_property_view(&self) -> bool {
        matches!(&*self.inner, RefInner::Property { .. })
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.inner {
            RefInner::Cell { value, dep } => f
                .debug_struct("Ref")
                .field("value", &*value.borrow())
                .field("subscribers", &dep.len())
                .finish(),
            RefInner::Property { key, .. } => {
                f.debug_struct("Ref").field("property", key).finish()
            }
        }
    }
}

/// Create a ref holding `value`.
pub fn ref_value(value: impl Into<Value>) -> Ref {
    Ref::new(value)
}

pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// The ref's value if `value` is a ref, otherwise `value` itself.
pub fn un_ref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        other => other.clone(),
    }
}

/// A ref bound to `object[key]`.
///
/// If the property already holds a ref, that ref is returned as is.
pub fn to_ref<T>(object: &T, key: impl Into<PropKey>) -> Ref
where
    T: PropertyAccess + Clone + 'static,
{
    let key = key.into();
    match object.ref_at(&key) {
        Some(existing) => existing,
        None => Ref::property(Rc::new(object.clone()), key),
    }
}

/// [`to_ref`] for every own key of `object`, in key order.
pub fn to_refs<T>(object: &T) -> IndexMap<PropKey, Ref>
where
    T: PropertyAccess + Clone + 'static,
{
    let source: Rc<dyn PropertyAccess> = Rc::new(object.clone());
    object
        .keys()
        .into_iter()
        .map(|key| {
            let r = object
                .ref_at(&key)
                .unwrap_or_else(|| Ref::property(Rc::clone(&source), key.clone()));
            (key, r)
        })
        .collect()
}

/// A view over an object that unwraps ref-valued properties.
#[derive(Clone)]
pub struct ProxyRefs<T> {
    target: T,
}

impl<T: PropertyAccess> ProxyRefs<T> {
    /// Read a property, unwrapping it if it holds a ref.
    pub fn get(&self, key: impl Into<PropKey>) -> Value {
        un_ref(&self.target.get(&key.into()))
    }

    /// Write a property.
    ///
    /// Assigning a plain value over a ref writes through the ref and keeps
    /// the binding; assigning a ref replaces the binding.
    pub fn set(&self, key: impl Into<PropKey>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        match self.target.get(&key) {
            Value::Ref(existing) if !is_ref(&value) => {
                existing.set(value);
                true
            }
            _ => self.target.set(key, value),
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }
}

impl<T: PropertyAccess> PropertyAccess for ProxyRefs<T> {
    fn get(&self, key: &PropKey) -> Value {
        ProxyRefs::get(self, key)
    }

    fn set(&self, key: PropKey, value: Value) -> bool {
        ProxyRefs::set(self, key, value)
    }

    fn keys(&self) -> Vec<PropKey> {
        self.target.keys()
    }

    fn ref_at(&self, key: &PropKey) -> Option<Ref> {
        self.target.ref_at(key)
    }
}

/// Wrap `target` so its ref-valued properties read and write as plain values.
pub fn proxy_refs<T: PropertyAccess>(target: T) -> ProxyRefs<T> {
    ProxyRefs { target }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::RawObject;
    use crate::reactive::{effect, reactive};
    use std::cell::Cell;

    #[test]
    fn ref_has_a_value() {
        let a = Ref::new(1);
        assert_eq!(a.get(), 1);
    }

    #[test]
    fn ref_is_reactive_and_ignores_same_value_writes() {
        let a = Ref::new(1);
        let dummy = Rc::new(RefCell::new(Value::Null));
        let calls = Rc::new(Cell::new(0));

        let a_clone = a.clone();
        let dummy_clone = dummy.clone();
        let calls_clone = calls.clone();
        let _runner = effect(move || {
            calls_clone.set(calls_clone.get() + 1);
            *dummy_clone.borrow_mut() = a_clone.get();
        });

        assert_eq!(calls.get(), 1);
        assert_eq!(*dummy.borrow(), 1);

        a.set(2);
        assert_eq!(calls.get(), 2);
        assert_eq!(*dummy.borrow(), 2);

        // same value should not trigger
        a.set(2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn is_ref_and_un_ref() {
        let a = Value::from(Ref::new(1));
        assert!(is_ref(&a));
        assert!(!is_ref(&Value::from(1)));
        assert_eq!(un_ref(&a), 1);
        assert_eq!(un_ref(&Value::from(1)), 1);
    }

    #[test]
    fn to_ref_reads_and_writes_through_the_source() {
        let state = reactive(RawObject::from_entries([("foo", 1)]));
        let foo = to_ref(&state, "foo");

        assert!(foo.is_property_view());
        assert_eq!(foo.get(), 1);

        state.set("foo", 2);
        assert_eq!(foo.get(), 2);

        foo.set(3);
        assert_eq!(state.get("foo"), 3);
    }

    #[test]
    fn to_ref_tracks_through_the_source() {
        let state = reactive(RawObject::from_entries([("foo", 1)]));
        let foo = to_ref(&state, "foo");
        let calls = Rc::new(Cell::new(0));

        let calls_clone = calls.clone();
        let _runner = effect(move || {
            calls_clone.set(calls_clone.get() + 1);
            foo.get();
        });

        state.set("foo", 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn to_ref_returns_an_existing_ref_unchanged() {
        let age = Ref::new(10);
        let user = RawObject::from_entries([("age", age.clone())]);
        assert!(to_ref(&user, "age").ptr_eq(&age));
    }

    #[test]
    fn to_refs_through_proxy_refs_keeps_existing_refs() {
        let age = Ref::new(10);
        let user = RawObject::from_entries([
            ("age", Value::from(age.clone())),
            ("name", Value::from("x")),
        ]);
        let refs = to_refs(&proxy_refs(user.clone()));

        assert!(refs[&PropKey::from("age")].ptr_eq(&age));
        assert!(!refs[&PropKey::from("age")].is_property_view());
        assert!(refs[&PropKey::from("name")].is_property_view());
        assert!(to_ref(&proxy_refs(user), "age").ptr_eq(&age));
    }

    #[test]
    fn update_applies_to_the_current_value() {
        let count = Ref::new(1);
        let seen = Rc::new(Cell::new(0.0));

        let count_clone = count.clone();
        let seen_clone = seen.clone();
        let _runner = effect(move || {
            seen_clone.set(count_clone.get().as_f64().unwrap_or_default());
        });

        count.update(|n| Value::from(n.as_f64().unwrap_or_default() + 1.0));
        assert_eq!(count.get(), 2);
        assert_eq!(seen.get(), 2.0);
    }

    #[test]
    fn to_refs_covers_every_key() {
        let state = reactive(RawObject::from_entries([("a", 1), ("b", 2)]));
        let refs = to_refs(&state);

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[&PropKey::from("b")].get(), 2);

        refs[&PropKey::from("a")].set(5);
        assert_eq!(state.get("a"), 5);
    }

    #[test]
    fn proxy_refs_unwraps_and_rebinds() {
        let age = Ref::new(10);
        let user = RawObject::from_entries([
            ("age", Value::from(age.clone())),
            ("name", Value::from("x")),
        ]);
        let p = proxy_refs(user.clone());

        assert_eq!(p.get("age"), 10);
        assert_eq!(p.get("name"), "x");

        p.set("age", 20);
        assert_eq!(age.get(), 20);
        assert!(user.get(&"age".into()).as_ref_cell().is_some_and(|r| r.ptr_eq(&age)));

        let replacement = Ref::new(5);
        p.set("age", replacement.clone());
        assert!(user.get(&"age".into()).as_ref_cell().is_some_and(|r| r.ptr_eq(&replacement)));
        assert_eq!(p.get("age"), 5);
        assert_eq!(age.get(), 20);
    }
}
