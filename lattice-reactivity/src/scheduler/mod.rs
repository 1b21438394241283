//! Scheduling
//!
//! By default a triggered effect re-runs synchronously, inside the write
//! that triggered it. An effect created with a [`Scheduler`] is instead
//! handed to that scheduler, which decides when (and whether) to run it.
//!
//! The usual strategy is [`JobQueue`]: it collects triggered effects,
//! drops duplicates, and runs each of them once on the next flush. A
//! renderer that schedules its render effect on a queue re-renders once per
//! tick no matter how many writes happened in between.

mod queue;

pub use queue::{Job, JobQueue};

use crate::reactive::EffectHandle;

/// Decides what happens when a scheduled effect is triggered.
pub trait Scheduler {
    fn schedule(&self, effect: &EffectHandle);
}

impl<F> Scheduler for F
where
    F: Fn(&EffectHandle),
{
    fn schedule(&self, effect: &EffectHandle) {
        self(effect)
    }
}
