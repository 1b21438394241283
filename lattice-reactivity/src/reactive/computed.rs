//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computeds Work
//!
//! 1. The getter runs inside a lazy effect, so nothing is evaluated until
//!    the first [`Computed::get`].
//!
//! 2. When accessed again with no dependency changed, the cached value is
//!    returned and the getter does not run.
//!
//! 3. When a dependency changes, the effect's scheduler only marks the
//!    computed dirty and notifies the computed's own subscribers. The getter
//!    still does not run.
//!
//! 4. The next [`Computed::get`] sees the dirty flag, re-runs the getter and
//!    caches the result.
//!
//! A computed that is never read after an invalidation does no work at all.
//! Several invalidations before the next read notify subscribers once.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::dep::{track_effects, trigger_effects, Dep};
use super::effect::{EffectOptions, ReactiveEffect};
use super::subscriber::EffectHandle;

struct ComputedInner<T> {
    /// The cached value (None until first read).
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    effect: ReactiveEffect<T>,
    /// Effects that read this computed.
    dep: Dep,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.stop();
    }
}

/// A lazily evaluated, memoized derived value.
///
/// Cloning a `Computed` creates a new handle to the **same** cache.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed value. The getter does not run until first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            let options = EffectOptions::new()
                .lazy(true)
                .scheduler(move |_: &EffectHandle| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    if !inner.dirty.replace(true) {
                        trigger_effects(&inner.dep);
                    }
                });

            ComputedInner {
                value: RefCell::new(None),
                dirty: Cell::new(true),
                effect: ReactiveEffect::new(getter, options),
                dep: Dep::new(),
            }
        });

        Self { inner }
    }

    /// Get the current value, recomputing if a dependency changed since the
    /// last read.
    ///
    /// The active effect, if any, is subscribed to this computed.
    pub fn get(&self) -> T {
        let inner = &self.inner;
        let cached = if inner.dirty.get() {
            None
        } else {
            inner.value.borrow().clone()
        };

        let value = match cached {
            Some(value) => value,
            None => {
                let value = inner.effect.run();
                inner.dirty.set(false);
                *inner.value.borrow_mut() = Some(value.clone());
                value
            }
        };

        track_effects(&inner.dep);
        value
    }

    /// Whether the next read will re-run the getter.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// The internal effect running the getter.
    pub fn effect(&self) -> &ReactiveEffect<T> {
        &self.inner.effect
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &*self.inner.value.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("subscribers", &self.inner.dep.len())
            .finish()
    }
}

/// Create a computed value from `getter`.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}
