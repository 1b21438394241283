//! Dependency Store
//!
//! Maps `(target, key)` to the set of effects that read that property.
//!
//! ```text
//! TargetId -> PropKey -> Dep { effect, effect, ... }
//! ```
//!
//! Entries are created lazily, the first time a property is read while an
//! effect is running; reads outside any effect leave the store untouched.
//! A target's entry is dropped when the raw object itself is dropped (see
//! [`RawObject`](crate::RawObject)), so the store never keeps an object's
//! subscriptions alive longer than the object.

use std::cell::RefCell;
use std::collections::HashMap;

use super::context::ReactiveContext;
use super::dep::{track_effects, trigger_effects, Dep};
use crate::object::{RawObject, TargetId};
use crate::value::PropKey;

type KeyToDep = HashMap<PropKey, Dep>;

thread_local! {
    static TARGET_MAP: RefCell<HashMap<TargetId, KeyToDep>> = RefCell::new(HashMap::new());
}

/// Record that the active effect read `key` on `target`.
pub(crate) fn track(target: TargetId, key: &PropKey) {
    if !ReactiveContext::is_tracking() {
        return;
    }

    let dep = TARGET_MAP.with(|map| {
        map.borrow_mut()
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default()
            .clone()
    });
    track_effects(&dep);
}

/// Notify every effect that read `key` on `target`.
pub(crate) fn trigger(target: TargetId, key: &PropKey) {
    let dep = TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target)
            .and_then(|keys| keys.get(key))
            .cloned()
    });
    if let Some(dep) = dep {
        trigger_effects(&dep);
    }
}

/// Drop every subscription recorded against `target`.
pub(crate) fn forget(target: TargetId) {
    // Removed entries can own effects whose closures own other raw objects;
    // their drops call back in here, so the map must not be borrowed then.
    let removed = TARGET_MAP
        .try_with(|map| {
            map.try_borrow_mut()
                .ok()
                .and_then(|mut map| map.remove(&target))
        })
        .ok()
        .flatten();
    drop(removed);
}

/// Number of effects currently subscribed to `key` on `target`.
pub fn subscriber_count(target: &RawObject, key: impl Into<PropKey>) -> usize {
    let key = key.into();
    TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target.id())
            .and_then(|keys| keys.get(&key))
            .map_or(0, Dep::len)
    })
}

/// Whether the store holds an entry for `target` at all.
pub fn is_tracked(target: &RawObject) -> bool {
    TARGET_MAP.with(|map| map.borrow().contains_key(&target.id()))
}
