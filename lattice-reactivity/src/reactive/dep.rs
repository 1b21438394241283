//! Dependency Sets
//!
//! A [`Dep`] is the set of effects subscribed to one reactive source: a
//! single property of an object, a ref, or a computed value. Sets keep
//! insertion order, so effects re-run in the order they first tracked the
//! source.
//!
//! The two primitives here are shared by every source kind:
//!
//! - [`track_effects`] links the active effect to a set (and records the
//!   reverse edge on the effect so it can unsubscribe later).
//! - [`trigger_effects`] re-runs, or hands to a scheduler, every effect in
//!   a set.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::trace;

use super::context::ReactiveContext;
use super::subscriber::{EffectHandle, EffectId};

/// The shared storage behind a [`Dep`].
pub(crate) type Subscribers = RefCell<IndexMap<EffectId, EffectHandle>>;

/// A set of subscribed effects.
///
/// Cloning a `Dep` creates a new handle to the **same** set.
#[derive(Clone, Default)]
pub(crate) struct Dep {
    subscribers: Rc<Subscribers>,
}

impl Dep {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub(crate) fn contains(&self, id: EffectId) -> bool {
        self.subscribers.borrow().contains_key(&id)
    }

    pub(crate) fn downgrade(&self) -> Weak<Subscribers> {
        Rc::downgrade(&self.subscribers)
    }
}

/// Subscribe the active effect to `dep`.
///
/// A no-op when no effect is running, when the active effect has been
/// stopped, or when it is already subscribed.
pub(crate) fn track_effects(dep: &Dep) {
    let Some(effect) = ReactiveContext::current_effect() else {
        return;
    };
    if !effect.is_active() {
        return;
    }

    let id = effect.id();
    if dep.contains(id) {
        return;
    }

    dep.subscribers.borrow_mut().insert(id, effect.clone());
    effect.core().add_dep(dep.downgrade());
}

/// Notify every effect subscribed to `dep`.
///
/// The set is copied before anything runs: an effect body that re-tracks
/// the same source would otherwise mutate the set mid-iteration. Effects
/// that subscribe during this pass are picked up by the next trigger, not
/// this one.
pub(crate) fn trigger_effects(dep: &Dep) {
    let current = ReactiveContext::current_effect_id();
    let effects: Vec<EffectHandle> = dep
        .subscribers
        .borrow()
        .values()
        .filter(|effect| Some(effect.id()) != current)
        .cloned()
        .collect();

    if effects.is_empty() {
        return;
    }
    trace!(count = effects.len(), "triggering effects");

    for effect in effects {
        // Stopped by an earlier effect in this same pass
        if !effect.is_active() {
            continue;
        }
        match effect.scheduler() {
            Some(scheduler) => scheduler.schedule(&effect),
            None => effect.run(),
        }
    }
}
