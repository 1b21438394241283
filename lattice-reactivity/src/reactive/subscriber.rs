//! Subscriber types for the reactive system.
//!
//! A subscriber is anything that can sit in a dependency set: today that is
//! always an effect, whether it was registered directly, built by a
//! computed value, or created by a watcher.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::EffectCore;
use crate::scheduler::Scheduler;

/// Unique identifier for an effect.
///
/// Each effect gets a unique ID when created. The ID keys the effect in
/// every dependency set it joins, which is what keeps a set free of
/// duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Object-safe view of an effect, independent of its result type.
pub(crate) trait AnyEffect {
    fn core(&self) -> &EffectCore;

    /// Run the work function and discard its result.
    fn rerun(self: Rc<Self>);
}

/// A type-erased, clonable handle to an effect.
///
/// This is what dependency sets store and what a [`Scheduler`] receives
/// when a triggered effect is handed to it instead of being run inline.
#[derive(Clone)]
pub struct EffectHandle {
    effect: Rc<dyn AnyEffect>,
}

impl EffectHandle {
    pub(crate) fn new(effect: Rc<dyn AnyEffect>) -> Self {
        Self { effect }
    }

    pub(crate) fn core(&self) -> &EffectCore {
        self.effect.core()
    }

    pub fn id(&self) -> EffectId {
        self.core().id()
    }

    /// Re-run the effect now, re-tracking its dependencies.
    pub fn run(&self) {
        Rc::clone(&self.effect).rerun();
    }

    /// Stop the effect. See [`ReactiveEffect::stop`](super::ReactiveEffect::stop).
    pub fn stop(&self) {
        self.core().stop();
    }

    /// Whether the effect has not been stopped.
    pub fn is_active(&self) -> bool {
        self.core().is_active()
    }

    pub(crate) fn scheduler(&self) -> Option<Rc<dyn Scheduler>> {
        self.core().scheduler()
    }

    pub fn ptr_eq(&self, other: &EffectHandle) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectHandle")
            .field("id", &self.id().raw())
            .field("active", &self.is_active())
            .finish()
    }
}
