//! Reactive Context
//!
//! The reactive context tracks which effect is currently running.
//! This enables automatic dependency tracking: when a reactive property is
//! read, the current effect can be registered as a subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack of effects. Running an effect pushes it onto
//! the stack; when the run completes, it is popped and the previous top
//! becomes the active effect again. A single "current effect" slot would
//! lose the outer effect as soon as an inner one finished, so reads made by
//! the outer body after a nested run would go untracked.
//!
//! [`ReactiveContext::untracked`] pushes an empty slot, so reads inside it
//! are attributed to no effect at all.
//!
//! The stack is thread-local, so each thread has its own reactive world and
//! nothing here needs synchronization.

use std::cell::RefCell;

use super::subscriber::{EffectHandle, EffectId};

thread_local! {
    static EFFECT_STACK: RefCell<Vec<Option<EffectHandle>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the active effect when dropped.
///
/// This keeps the stack balanced even if the effect body panics.
pub struct ReactiveContext {
    effect_id: Option<EffectId>,
}

impl ReactiveContext {
    /// Make `effect` the active effect until the returned guard is dropped.
    pub(crate) fn enter(effect: EffectHandle) -> Self {
        let effect_id = Some(effect.id());
        EFFECT_STACK.with(|stack| stack.borrow_mut().push(Some(effect)));
        Self { effect_id }
    }

    /// Run `f` with tracking paused: its reads subscribe no effect.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        EFFECT_STACK.with(|stack| stack.borrow_mut().push(None));
        let _ctx = Self { effect_id: None };
        f()
    }

    /// Whether reads on this thread are currently attributed to an effect.
    pub fn is_tracking() -> bool {
        EFFECT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// The effect on top of the stack, if any.
    pub fn current_effect() -> Option<EffectHandle> {
        EFFECT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// ID of the effect on top of the stack, if any.
    pub fn current_effect_id() -> Option<EffectId> {
        EFFECT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|top| top.as_ref().map(EffectHandle::id))
        })
    }

    /// Number of stack slots, untracked sections included.
    pub fn depth() -> usize {
        EFFECT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = EFFECT_STACK
            .try_with(|stack| stack.borrow_mut().pop())
            .ok()
            .flatten();

        if let Some(slot) = popped {
            let popped_id = slot.as_ref().map(EffectHandle::id);
            debug_assert_eq!(
                popped_id, self.effect_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.effect_id, popped_id
            );
        }
    }
}
