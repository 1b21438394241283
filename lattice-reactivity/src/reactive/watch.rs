//! Watchers
//!
//! A watcher runs a getter inside a lazy effect and, whenever something the
//! getter read changes, re-runs it and hands the new and previous results
//! to a callback. Unlike an effect, the side effect lives in the callback,
//! which is never tracked.
//!
//! ```text
//! source write -> scheduler -> job -> getter (tracked) -> callback(new, old)
//! ```
//!
//! With [`WatchFlush::Post`] the job goes through a [`JobQueue`], so any
//! number of writes before the next flush produce one callback.

use std::any::Any;
use std::cell::{OnceCell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::effect::{EffectOptions, ReactiveEffect};
use super::proxy::Reactive;
use super::subscriber::EffectHandle;
use crate::object::TargetId;
use crate::scheduler::{Job, JobQueue};
use crate::value::Value;

/// When the watch callback runs relative to the write that caused it.
#[derive(Debug, Clone, Default)]
pub enum WatchFlush {
    /// Inside the write.
    #[default]
    Sync,
    /// On the next flush of the given queue.
    Post(JobQueue),
}

/// Options accepted by [`watch`].
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    immediate: bool,
    flush: WatchFlush,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call the callback once at creation, with no previous value.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn flush(mut self, flush: WatchFlush) -> Self {
        self.flush = flush;
        self
    }
}

struct WatchState<T> {
    effect: OnceCell<ReactiveEffect<T>>,
    old: RefCell<Option<T>>,
    callback: Box<dyn Fn(&T, Option<&T>)>,
}

impl<T: 'static> WatchState<T> {
    fn job(&self) {
        let Some(effect) = self.effect.get() else {
            return;
        };
        if !effect.is_active() {
            return;
        }

        let new = effect.run();
        let old = self.old.borrow_mut().take();
        (self.callback)(&new, old.as_ref());
        *self.old.borrow_mut() = Some(new);
    }
}

/// Handle to a running watcher. Dropping it stops the watcher.
#[must_use = "dropping a WatchHandle stops the watcher"]
pub struct WatchHandle {
    effect: EffectHandle,
    _state: Rc<dyn Any>,
}

impl WatchHandle {
    /// Stop watching. Idempotent.
    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.effect.stop();
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("effect", &self.effect)
            .finish()
    }
}

/// Watch the result of `getter`.
///
/// Without [`WatchOptions::immediate`], the getter runs once now to record
/// the initial value and the callback first fires on the next change.
pub fn watch<T, G, C>(getter: G, callback: C, options: WatchOptions) -> WatchHandle
where
    T: 'static,
    G: Fn() -> T + 'static,
    C: Fn(&T, Option<&T>) + 'static,
{
    let WatchOptions { immediate, flush } = options;

    let state = Rc::new(WatchState {
        effect: OnceCell::new(),
        old: RefCell::new(None),
        callback: Box::new(callback),
    });

    let weak = Rc::downgrade(&state);
    let job: Rc<dyn Fn()> = Rc::new(move || {
        if let Some(state) = weak.upgrade() {
            state.job();
        }
    });

    let options = EffectOptions::new().lazy(true);
    let options = match flush {
        WatchFlush::Sync => options.scheduler(move |_: &EffectHandle| job()),
        WatchFlush::Post(queue) => options.scheduler(move |effect: &EffectHandle| {
            let job = Rc::clone(&job);
            queue.queue_job(Job::new(effect.id(), move || job()));
        }),
    };

    let effect = ReactiveEffect::new(getter, options);
    let handle = effect.handle();
    let _ = state.effect.set(effect.clone());

    if immediate {
        state.job();
    } else {
        *state.old.borrow_mut() = Some(effect.run());
    }

    WatchHandle {
        effect: handle,
        _state: state,
    }
}

/// Watch every property of `source`, at any depth.
///
/// The callback receives the source itself, so new and old are the same
/// proxy.
pub fn watch_reactive<C>(source: &Reactive, callback: C, options: WatchOptions) -> WatchHandle
where
    C: Fn(&Value, Option<&Value>) + 'static,
{
    let source = source.clone();
    watch(
        move || {
            let value = Value::Proxy(source.clone());
            traverse(&value);
            value
        },
        callback,
        options,
    )
}

/// Read every property reachable from `value`, tracking each one.
///
/// Shared and cyclic structures are visited once per target.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    traverse_inner(value, &mut seen);
}

fn traverse_inner(value: &Value, seen: &mut HashSet<TargetId>) {
    match value {
        Value::Proxy(proxy) => {
            if !seen.insert(proxy.raw().id()) {
                return;
            }
            if proxy.raw().is_array() {
                proxy.len();
            }
            for key in proxy.keys() {
                traverse_inner(&proxy.get(key), seen);
            }
        }
        Value::Ref(r) => traverse_inner(&r.get(), seen),
        _ => {}
    }
}
