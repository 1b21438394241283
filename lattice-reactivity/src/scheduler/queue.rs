//! Job Queue
//!
//! Deferred execution for scheduled effects.
//!
//! Jobs are keyed by the id of the effect they came from and kept in an
//! insertion-ordered map, so queueing the same effect twice before a flush
//! leaves a single job in its original position.
//!
//! # Flushing
//!
//! [`JobQueue::flush`] drains the queue in batches: it takes everything
//! currently queued, runs it, and repeats until a batch comes back empty.
//! A job that queues another job (or itself) during a flush therefore runs
//! in the next batch of the same flush.
//!
//! An in-flight flag makes a nested `flush()` return immediately. Without
//! it, a job that triggers a write, which schedules an effect, which
//! flushes, would start a second drain underneath the first.
//!
//! # Automatic flushing
//!
//! A queue built with [`JobQueue::auto_flush`] flushes itself. The first job
//! queued after a flush sets a pending flag and spawns one local task that
//! yields and then flushes; jobs queued while the flag is set spawn nothing.
//! The task is spawned with [`tokio::task::spawn_local`], so such a queue
//! must be used from inside a [`tokio::task::LocalSet`]. Outside a runtime
//! the jobs wait for an explicit flush.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::Scheduler;
use crate::reactive::{EffectHandle, EffectId};

/// A unit of deferred work.
#[derive(Clone)]
pub struct Job {
    id: EffectId,
    task: Rc<dyn Fn()>,
}

impl Job {
    /// A job identified by `id`. Jobs with the same id are deduplicated.
    pub fn new(id: EffectId, task: impl Fn() + 'static) -> Self {
        Self {
            id,
            task: Rc::new(task),
        }
    }

    /// A job that re-runs `effect`, unless it has been stopped by then.
    pub fn from_effect(effect: &EffectHandle) -> Self {
        let effect = effect.clone();
        Self::new(effect.id(), move || {
            if effect.is_active() {
                effect.run();
            }
        })
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn run(&self) {
        (self.task)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id.raw()).finish()
    }
}

struct QueueInner {
    jobs: RefCell<IndexMap<EffectId, Job>>,
    flushing: Cell<bool>,
    auto_flush: bool,
    /// A spawned flush has not run yet.
    pending: Cell<bool>,
}

/// Clears the in-flight and pending flags even if a job panics.
struct FlushGuard<'a> {
    inner: &'a QueueInner,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.inner.flushing.set(false);
        self.inner.pending.set(false);
    }
}

/// A deduplicating queue of jobs, flushed explicitly or on the next tick.
///
/// Cloning a `JobQueue` creates a new handle to the **same** queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Rc<QueueInner>,
}

impl JobQueue {
    /// A queue that runs jobs only on [`flush`](Self::flush) or
    /// [`tick`](Self::tick).
    pub fn new() -> Self {
        Self::build(false)
    }

    /// A queue that schedules its own flush on the current `LocalSet`.
    pub fn auto_flush() -> Self {
        Self::build(true)
    }

    fn build(auto_flush: bool) -> Self {
        Self {
            inner: Rc::new(QueueInner {
                jobs: RefCell::new(IndexMap::new()),
                flushing: Cell::new(false),
                auto_flush,
                pending: Cell::new(false),
            }),
        }
    }

    /// Queue `job`. Returns `false` if a job with the same id was already
    /// waiting, in which case the queue is unchanged.
    pub fn queue_job(&self, job: Job) -> bool {
        {
            let mut jobs = self.inner.jobs.borrow_mut();
            if jobs.contains_key(&job.id) {
                return false;
            }
            jobs.insert(job.id, job);
        }
        self.schedule_flush();
        true
    }

    fn schedule_flush(&self) {
        if !self.inner.auto_flush || self.inner.flushing.get() {
            return;
        }
        if self.inner.pending.replace(true) {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            self.inner.pending.set(false);
            debug!("no runtime; jobs wait for an explicit flush");
            return;
        }

        let queue = self.clone();
        tokio::task::spawn_local(async move {
            queue.tick().await;
        });
    }

    /// Number of jobs waiting.
    pub fn len(&self) -> usize {
        self.inner.jobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a flush is running right now.
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    /// Whether an automatic flush has been spawned and not yet run.
    pub fn is_flush_pending(&self) -> bool {
        self.inner.pending.get()
    }

    /// Run every queued job, including jobs queued along the way.
    ///
    /// Returns the number of jobs run; a nested call returns 0 without
    /// running anything.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.replace(true) {
            return 0;
        }
        let _guard = FlushGuard { inner: &self.inner };

        let mut ran = 0;
        loop {
            let batch = std::mem::take(&mut *self.inner.jobs.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for job in batch.into_values() {
                job.run();
                ran += 1;
            }
        }

        trace!(jobs = ran, "flushed job queue");
        ran
    }

    /// Yield to the runtime once, then flush.
    pub async fn tick(&self) -> usize {
        tokio::task::yield_now().await;
        self.flush()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for JobQueue {
    fn schedule(&self, effect: &EffectHandle) {
        self.queue_job(Job::from_effect(effect));
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("len", &self.len())
            .field("flushing", &self.is_flushing())
            .field("pending", &self.is_flush_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::RawObject;
    use crate::reactive::{effect_with, reactive, stop, EffectOptions};

    fn counter() -> (Rc<Cell<usize>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        (count, move || count_clone.set(count_clone.get() + 1))
    }

    #[test]
    fn duplicate_jobs_are_dropped() {
        let queue = JobQueue::new();
        let (count, bump) = counter();
        let bump = Rc::new(bump);
        let id = EffectId::new();

        let first = bump.clone();
        let second = bump.clone();
        assert!(queue.queue_job(Job::new(id, move || first())));
        assert!(!queue.queue_job(Job::new(id, move || second())));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.flush(), 1);
        assert_eq!(count.get(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn jobs_run_in_queue_order() {
        let queue = JobQueue::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            queue.queue_job(Job::new(EffectId::new(), move || order.borrow_mut().push(n)));
        }

        queue.flush();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn jobs_queued_during_a_flush_run_in_the_same_flush() {
        let queue = JobQueue::new();
        let (count, bump) = counter();

        let queue_clone = queue.clone();
        let bump = Rc::new(bump);
        queue.queue_job(Job::new(EffectId::new(), move || {
            let bump = bump.clone();
            queue_clone.queue_job(Job::new(EffectId::new(), move || bump()));
        }));

        assert_eq!(queue.flush(), 2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn nested_flush_is_a_no_op() {
        let queue = JobQueue::new();
        let nested = Rc::new(Cell::new(usize::MAX));

        let queue_clone = queue.clone();
        let nested_clone = nested.clone();
        queue.queue_job(Job::new(EffectId::new(), move || {
            assert!(queue_clone.is_flushing());
            nested_clone.set(queue_clone.flush());
        }));

        assert_eq!(queue.flush(), 1);
        assert_eq!(nested.get(), 0);
        assert!(!queue.is_flushing());
    }

    #[test]
    fn writes_in_one_tick_coalesce_into_one_run() {
        let queue = JobQueue::new();
        let state = reactive(RawObject::from_entries([("n", 0)]));
        let (runs, bump) = counter();

        let state_clone = state.clone();
        let _runner = effect_with(
            move || {
                state_clone.get("n");
                bump();
            },
            EffectOptions::new().scheduler(queue.clone()),
        );
        assert_eq!(runs.get(), 1);

        state.set("n", 1);
        state.set("n", 2);
        state.set("n", 3);
        assert_eq!(runs.get(), 1);
        assert_eq!(queue.len(), 1);

        queue.flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn stopped_effects_are_skipped_at_flush() {
        let queue = JobQueue::new();
        let state = reactive(RawObject::from_entries([("n", 0)]));
        let (runs, bump) = counter();

        let state_clone = state.clone();
        let runner = effect_with(
            move || {
                state_clone.get("n");
                bump();
            },
            EffectOptions::new().scheduler(queue.clone()),
        );

        state.set("n", 1);
        stop(&runner);

        assert_eq!(queue.flush(), 1);
        assert_eq!(runs.get(), 1);
    }

    #[tokio::test]
    async fn auto_flush_runs_once_for_many_writes() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let queue = JobQueue::auto_flush();
                let state = reactive(RawObject::from_entries([("n", 0)]));
                let (runs, bump) = counter();

                let state_clone = state.clone();
                let _runner = effect_with(
                    move || {
                        state_clone.get("n");
                        bump();
                    },
                    EffectOptions::new().scheduler(queue.clone()),
                );

                state.set("n", 1);
                assert!(queue.is_flush_pending());
                state.set("n", 2);
                state.set("n", 3);
                assert_eq!(runs.get(), 1);
                assert_eq!(queue.len(), 1);

                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(runs.get(), 2);
                assert!(queue.is_empty());
                assert!(!queue.is_flush_pending());

                // A later write schedules a fresh flush
                state.set("n", 4);
                assert!(queue.is_flush_pending());
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                assert_eq!(runs.get(), 3);
            })
            .await;
    }

    #[test]
    fn auto_flush_without_a_runtime_waits_for_flush() {
        let queue = JobQueue::auto_flush();
        let (count, bump) = counter();

        queue.queue_job(Job::new(EffectId::new(), bump));
        assert!(!queue.is_flush_pending());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.flush(), 1);
        assert_eq!(count.get(), 1);
    }

    #[tokio::test]
    async fn tick_flushes_after_yielding() {
        let queue = JobQueue::new();
        let (count, bump) = counter();
        queue.queue_job(Job::new(EffectId::new(), bump));

        assert_eq!(queue.tick().await, 1);
        assert_eq!(count.get(), 1);
    }
}
