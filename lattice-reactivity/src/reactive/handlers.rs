//! Get/set traps shared by every proxy flavour.

use tracing::warn;

use super::dep_store;
use super::proxy::{reactive, readonly, ProxyFlags, Reactive, ReactiveFlags};
use crate::value::{has_changed, PropKey, Value};

pub(crate) fn get(proxy: &Reactive, key: &PropKey) -> Value {
    let ProxyFlags {
        readonly: is_readonly,
        shallow,
    } = proxy.flags();

    if let Some(flag) = ReactiveFlags::from_key(key) {
        return Value::Bool(match flag {
            ReactiveFlags::IsReactive => !is_readonly,
            ReactiveFlags::IsReadonly => is_readonly,
        });
    }

    let target = proxy.raw();
    if !is_readonly {
        dep_store::track(target.id(), key);
    }

    let res = target.get(key);
    if shallow {
        return res;
    }

    match res {
        Value::Object(object) if is_readonly => Value::Proxy(readonly(object)),
        Value::Object(object) => Value::Proxy(reactive(object)),
        Value::Proxy(inner) if is_readonly && !inner.flags().readonly => {
            Value::Proxy(readonly(inner.raw().clone()))
        }
        other => other,
    }
}

pub(crate) fn set(proxy: &Reactive, key: PropKey, value: Value) -> bool {
    if proxy.flags().readonly {
        warn!(key = %key, "set operation on key \"{}\" failed: target is readonly", key);
        return true;
    }

    let target = proxy.raw();
    let value = value.into_raw();
    let old = target.set(key.clone(), value.clone());

    match old {
        Some(old) if !has_changed(&value, &old) => {}
        Some(_) => dep_store::trigger(target.id(), &key),
        None => {
            dep_store::trigger(target.id(), &key);
            if target.is_array() {
                dep_store::trigger(target.id(), &PropKey::length());
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::RawObject;
    use crate::reactive::effect;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_effect(read: impl Fn() + 'static) -> Rc<Cell<i32>> {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let _runner = effect(move || {
            calls_clone.set(calls_clone.get() + 1);
            read();
        });
        calls
    }

    #[test]
    fn same_value_writes_do_not_trigger() {
        let state = reactive(RawObject::from_entries([("n", f64::NAN)]));
        let state_clone = state.clone();
        let calls = counting_effect(move || {
            state_clone.get("n");
        });

        state.set("n", f64::NAN);
        assert_eq!(calls.get(), 1);

        state.set("n", 1);
        assert_eq!(calls.get(), 2);

        state.set("n", 1);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn adding_a_key_triggers_readers_of_that_key() {
        let state = reactive(RawObject::new());
        let state_clone = state.clone();
        let calls = counting_effect(move || {
            state_clone.get("later");
        });

        state.set("later", "here");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn push_triggers_length_readers() {
        let list = reactive(RawObject::array([1]));
        let list_clone = list.clone();
        let calls = counting_effect(move || {
            list_clone.len();
        });

        list.push(2);
        assert_eq!(calls.get(), 2);

        // Overwriting an existing slot leaves the length alone
        list.set(0usize, 5);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn proxies_are_stored_as_their_raw_target() {
        let state = reactive(RawObject::new());
        let child = reactive(RawObject::new());

        state.set("child", child.clone());
        let stored = state.raw().get(&"child".into());
        assert!(stored.as_object().is_some_and(|o| o.ptr_eq(child.raw())));
    }

    #[test]
    fn readonly_parent_hides_a_stored_reactive_child() {
        let child = RawObject::from_entries([("foo", 1)]);
        let parent = readonly(RawObject::from_entries([("child", reactive(child.clone()))]));

        let nested = parent.get("child");
        assert!(crate::reactive::is_readonly(&nested));

        let nested = Reactive::try_from(nested).expect("nested proxy");
        assert!(nested.set("foo", 99));
        assert_eq!(child.get(&"foo".into()), 1);
    }

    #[test]
    fn readonly_writes_are_swallowed_but_succeed() {
        let proxy = readonly(RawObject::from_entries([("n", 1)]));
        assert!(proxy.set("n", 2));
        assert_eq!(proxy.get("n"), 1);
    }
}
