//! Effect Implementation
//!
//! An Effect is a re-runnable computation that runs again whenever reactive
//! data it read during its previous run changes.
//!
//! # How Effects Work
//!
//! 1. When registered, the effect runs immediately (unless it is lazy) to
//!    produce its first result and establish initial dependencies.
//!
//! 2. When any dependency changes, the effect is re-run, or handed to its
//!    scheduler if it has one.
//!
//! 3. Before every run, the effect unsubscribes from everything it is
//!    currently subscribed to and re-tracks from scratch. A body like
//!    `if a.ok { a.text } else { "" }` reads different properties from one
//!    run to the next; without this cleanup the effect would stay subscribed
//!    to `text` after `ok` turned false.
//!
//! # Lifecycle
//!
//! ```text
//! constructed -> running -> idle <-> running -> stopped
//! ```
//!
//! Stopping is terminal: the effect leaves every dependency set, its
//! `on_stop` callback fires once, and it can never be subscribed again.
//!
//! # Failure
//!
//! The engine does not catch anything. A fallible body returns `Result` and
//! the runner hands it back unchanged; a panicking body unwinds through the
//! runner with the active-effect stack restored. Edges tracked before the
//! failure stay in place.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::debug;

use super::context::ReactiveContext;
use super::dep::Subscribers;
use super::subscriber::{AnyEffect, EffectHandle, EffectId};
use crate::scheduler::Scheduler;

/// Options accepted by [`effect_with`].
#[derive(Default)]
pub struct EffectOptions {
    lazy: bool,
    scheduler: Option<Rc<dyn Scheduler>>,
    on_stop: Option<Box<dyn FnOnce()>>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the eager first run. The effect tracks nothing until it is run.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Hand triggered runs to `scheduler` instead of running inline.
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Called once when the effect is stopped.
    pub fn on_stop(mut self, on_stop: impl FnOnce() + 'static) -> Self {
        self.on_stop = Some(Box::new(on_stop));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("scheduler", &self.scheduler.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

/// Bookkeeping shared by every effect, whatever its result type.
pub(crate) struct EffectCore {
    id: EffectId,
    active: Cell<bool>,
    /// Reverse edges: every dependency set this effect is currently in.
    deps: RefCell<SmallVec<[Weak<Subscribers>; 4]>>,
    scheduler: Option<Rc<dyn Scheduler>>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    run_count: Cell<usize>,
}

impl EffectCore {
    fn new(scheduler: Option<Rc<dyn Scheduler>>, on_stop: Option<Box<dyn FnOnce()>>) -> Self {
        Self {
            id: EffectId::new(),
            active: Cell::new(true),
            deps: RefCell::new(SmallVec::new()),
            scheduler,
            on_stop: RefCell::new(on_stop),
            run_count: Cell::new(0),
        }
    }

    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn scheduler(&self) -> Option<Rc<dyn Scheduler>> {
        self.scheduler.clone()
    }

    pub(crate) fn add_dep(&self, dep: Weak<Subscribers>) {
        self.deps.borrow_mut().push(dep);
    }

    /// Number of dependency sets this effect is currently subscribed to.
    fn dependency_count(&self) -> usize {
        self.deps
            .borrow()
            .iter()
            .filter(|dep| dep.strong_count() > 0)
            .count()
    }

    /// Leave every dependency set and forget the reverse edges.
    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps {
            if let Some(dep) = dep.upgrade() {
                // Dropped after the borrow is released
                let removed = dep.borrow_mut().shift_remove(&self.id);
                drop(removed);
            }
        }
    }

    pub(crate) fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }
        debug!(effect = self.id.raw(), "stopping effect");
        self.cleanup();
        let on_stop = self.on_stop.borrow_mut().take();
        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }
}

struct EffectInner<T> {
    core: EffectCore,
    work: Box<dyn Fn() -> T>,
}

impl<T: 'static> AnyEffect for EffectInner<T> {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn rerun(self: Rc<Self>) {
        let _ = ReactiveEffect { inner: self }.run();
    }
}

/// A re-runnable computation with automatic dependency tracking.
///
/// Cloning a `ReactiveEffect` creates a new handle to the **same** effect.
pub struct ReactiveEffect<T> {
    inner: Rc<EffectInner<T>>,
}

impl<T: 'static> ReactiveEffect<T> {
    /// Create an effect. It runs immediately unless `options` make it lazy.
    pub fn new<F>(work: F, options: EffectOptions) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let EffectOptions {
            lazy,
            scheduler,
            on_stop,
        } = options;

        let effect = Self {
            inner: Rc::new(EffectInner {
                core: EffectCore::new(scheduler, on_stop),
                work: Box::new(work),
            }),
        };

        if !lazy {
            // The first result is only observable through the runner
            let _ = effect.run();
        }

        effect
    }

    /// Run the work function, re-tracking dependencies from scratch.
    ///
    /// A stopped effect still runs its work function when asked to, but
    /// outside any tracking context, so it cannot resubscribe itself.
    pub fn run(&self) -> T {
        let core = &self.inner.core;
        if !core.is_active() {
            return (self.inner.work)();
        }

        core.cleanup();
        core.run_count.set(core.run_count.get() + 1);

        let _ctx = ReactiveContext::enter(self.handle());
        (self.inner.work)()
    }

    /// A type-erased handle to this effect.
    pub fn handle(&self) -> EffectHandle {
        let inner: Rc<dyn AnyEffect> = self.inner.clone();
        EffectHandle::new(inner)
    }

    pub fn id(&self) -> EffectId {
        self.inner.core.id()
    }

    /// Whether the effect has not been stopped.
    pub fn is_active(&self) -> bool {
        self.inner.core.is_active()
    }

    /// Number of tracked runs so far.
    pub fn run_count(&self) -> usize {
        self.inner.core.run_count.get()
    }

    /// Number of dependency sets the effect is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.inner.core.dependency_count()
    }
}

impl<T> ReactiveEffect<T> {
    /// Stop the effect. Idempotent.
    pub fn stop(&self) {
        self.inner.core.stop();
    }
}

impl<T> Clone for ReactiveEffect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> fmt::Debug for ReactiveEffect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.id().raw())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Handle returned by [`effect`]. Calling [`Runner::run`] re-runs the effect.
pub struct Runner<T> {
    effect: ReactiveEffect<T>,
}

impl<T: 'static> Runner<T> {
    /// Force a run and return its result, independent of any reactive write.
    pub fn run(&self) -> T {
        self.effect.run()
    }

    /// The effect behind this runner.
    pub fn effect(&self) -> &ReactiveEffect<T> {
        &self.effect
    }
}

impl<T> Clone for Runner<T> {
    fn clone(&self) -> Self {
        Self {
            effect: self.effect.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Runner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Runner").field(&self.effect).finish()
    }
}

/// Register an effect that runs now and again whenever what it read changes.
pub fn effect<T, F>(work: F) -> Runner<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    effect_with(work, EffectOptions::default())
}

/// Register an effect with explicit options.
pub fn effect_with<T, F>(work: F, options: EffectOptions) -> Runner<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Runner {
        effect: ReactiveEffect::new(work, options),
    }
}

/// Stop the effect behind `runner`.
pub fn stop<T: 'static>(runner: &Runner<T>) {
    runner.effect.stop();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::RawObject;
    use crate::reactive::{reactive, ReactiveContext, Ref};
    use std::cell::Cell;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let _runner = effect(move || {
            run_count_clone.set(run_count_clone.get() + 1);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn lazy_effect_does_not_run_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let runner = effect_with(
            move || run_count_clone.set(run_count_clone.get() + 1),
            EffectOptions::new().lazy(true),
        );

        assert_eq!(run_count.get(), 0);
        assert_eq!(runner.effect().run_count(), 0);

        runner.run();
        assert_eq!(run_count.get(), 1);
        assert_eq!(runner.effect().run_count(), 1);
    }

    #[test]
    fn runner_returns_the_latest_result() {
        let foo = Rc::new(Cell::new(0));
        let foo_clone = foo.clone();

        let runner = effect(move || {
            foo_clone.set(foo_clone.get() + 1);
            foo_clone.get()
        });

        assert_eq!(foo.get(), 1);
        runner.run();
        assert_eq!(foo.get(), 2);
        assert_eq!(runner.run(), 3);
    }

    #[test]
    fn effect_reruns_when_a_dependency_changes() {
        let count = Ref::new(1);
        let seen = Rc::new(Cell::new(0.0));

        let count_clone = count.clone();
        let seen_clone = seen.clone();
        let _runner = effect(move || {
            seen_clone.set(count_clone.get().as_f64().unwrap_or_default());
        });

        assert_eq!(seen.get(), 1.0);
        count.set(7);
        assert_eq!(seen.get(), 7.0);
    }

    #[test]
    fn stop_unsubscribes_and_calls_on_stop_once() {
        let state = reactive(RawObject::from_entries([("n", 1)]));
        let runs = Rc::new(Cell::new(0));
        let stops = Rc::new(Cell::new(0));

        let state_clone = state.clone();
        let runs_clone = runs.clone();
        let stops_clone = stops.clone();
        let runner = effect_with(
            move || {
                state_clone.get("n");
                runs_clone.set(runs_clone.get() + 1);
            },
            EffectOptions::new().on_stop(move || stops_clone.set(stops_clone.get() + 1)),
        );

        assert_eq!(runner.effect().dependency_count(), 1);

        stop(&runner);
        stop(&runner);

        assert!(!runner.effect().is_active());
        assert_eq!(stops.get(), 1);
        assert_eq!(runner.effect().dependency_count(), 0);

        state.set("n", 2);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn stopped_effect_runs_manually_without_resubscribing() {
        let state = reactive(RawObject::from_entries([("n", 1)]));
        let runs = Rc::new(Cell::new(0));

        let state_clone = state.clone();
        let runs_clone = runs.clone();
        let runner = effect(move || {
            runs_clone.set(runs_clone.get() + 1);
            state_clone.get("n")
        });

        stop(&runner);
        assert_eq!(runner.run(), 1);
        assert_eq!(runs.get(), 2);
        assert_eq!(runner.effect().dependency_count(), 0);

        state.set("n", 5);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn fallible_bodies_pass_their_result_through() {
        let runner = effect(|| -> Result<i32, String> { Err("boom".to_string()) });
        assert_eq!(runner.run(), Err("boom".to_string()));
    }

    #[test]
    fn dependencies_read_before_a_panic_stay_tracked() {
        let state = reactive(RawObject::from_entries([("a", 1)]));
        let runs = Rc::new(Cell::new(0));

        let state_clone = state.clone();
        let runs_clone = runs.clone();
        let runner = effect_with(
            move || {
                runs_clone.set(runs_clone.get() + 1);
                if state_clone.get("a") == 1 {
                    panic!("effect body failed");
                }
            },
            EffectOptions::new().lazy(true),
        );

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| runner.run()));
        assert!(result.is_err());
        assert_eq!(runs.get(), 1);
        assert_eq!(ReactiveContext::depth(), 0);
        assert_eq!(runner.effect().dependency_count(), 1);

        state.set("a", 2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = ReactiveEffect::new(|| {}, EffectOptions::new());
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());
        assert_eq!(effect2.run_count(), 1);

        effect1.run();
        assert_eq!(effect2.run_count(), 2);

        effect1.stop();
        assert!(!effect2.is_active());
    }
}
