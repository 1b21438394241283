//! Lattice Reactivity
//!
//! This crate provides a fine-grained reactivity engine: plain data wrapped
//! in proxies that record who read what, and effects that re-run when what
//! they read changes. It implements:
//!
//! - Reactive, read-only and shallow proxies over dynamic objects
//! - Effects with automatic dependency tracking and per-run cleanup
//! - Lazy, memoized computed values
//! - Refs and the utilities that convert between refs and object properties
//! - Watchers and a deduplicating job queue for deferred re-runs
//!
//! The engine is single-threaded. All reactive state lives in thread-locals,
//! and handles are `Rc`-based and neither `Send` nor `Sync`.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value` / `object`: the dynamic data model that proxies wrap
//! - `reactive`: proxies, effects, computed values, refs, watchers
//! - `scheduler`: the scheduler trait and the job queue
//! - `error`: conversion errors at the typed boundary
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_reactivity::{computed, effect, reactive, RawObject};
//!
//! let state = reactive(RawObject::from_entries([("count", 1)]));
//!
//! let doubled = {
//!     let state = state.clone();
//!     computed(move || state.get("count").as_f64().unwrap_or_default() * 2.0)
//! };
//!
//! let _runner = effect(move || {
//!     println!("doubled: {}", doubled.get());
//! });
//!
//! // Effect automatically runs, prints: "doubled: 10"
//! state.set("count", 5);
//! ```

pub mod error;
pub mod object;
pub mod reactive;
pub mod scheduler;
pub mod value;

pub use error::{Error, Result};
pub use object::{ObjectKind, RawObject, TargetId};
pub use reactive::{
    computed, effect, effect_with, is_proxy, is_reactive, is_readonly, is_ref, proxy_refs,
    reactive, readonly, ref_value, shallow_reactive, shallow_readonly, stop, to_raw, to_ref,
    to_refs, un_ref, watch, watch_reactive, Computed, EffectHandle, EffectOptions,
    PropertyAccess, Reactive, ReactiveEffect, Ref, Runner, WatchFlush, WatchHandle,
    WatchOptions,
};
pub use scheduler::{Job, JobQueue, Scheduler};
pub use value::{has_changed, same_value, PropKey, Value};
