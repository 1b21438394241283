//! Reactive Primitives
//!
//! This module implements the core reactive system: proxies, effects,
//! computed values and refs. Everything else in the crate either feeds data
//! into it ([`RawObject`](crate::RawObject), [`Value`](crate::Value)) or
//! decides when its effects run ([`scheduler`](crate::scheduler)).
//!
//! # Concepts
//!
//! ## Proxies
//!
//! A [`Reactive`] wraps a raw object. Reading a property through it records
//! the running effect as a subscriber of that property; writing a property
//! re-runs every subscriber. Read-only and shallow variants exist for
//! handing state to code that must not mutate it.
//!
//! ## Effects
//!
//! An effect is a function that is re-run whenever anything it read during
//! its last run changes. Every run starts from a clean slate, so an effect
//! only ever depends on what its *latest* run read.
//!
//! ## Computed values
//!
//! A [`Computed`] is a lazily evaluated effect with a cache. Its getter runs
//! on the first read after a change, never earlier, and other effects can
//! depend on it like any other source.
//!
//! ## Refs
//!
//! A [`Ref`] is a reactive cell holding a single value, plus the utilities
//! to turn object properties into refs ([`to_ref`], [`to_refs`]) and back
//! ([`proxy_refs`]).
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local stack of running effects to
//! detect dependencies. When a property is read, we check the top of the
//! stack and, if an effect is there, record the dependency in both
//! directions: the property's subscriber set gets the effect, and the effect
//! remembers the set so it can leave it before its next run.

mod computed;
mod context;
mod dep;
pub(crate) mod dep_store;
mod effect;
mod handlers;
mod proxy;
mod refs;
mod subscriber;
mod watch;

pub use computed::{computed, Computed};
pub use context::ReactiveContext;
pub use dep_store::{is_tracked, subscriber_count};
pub use effect::{effect, effect_with, stop, EffectOptions, ReactiveEffect, Runner};
pub use proxy::{
    is_proxy, is_reactive, is_readonly, reactive, reactive_value, readonly, shallow_reactive,
    shallow_readonly, to_raw, PropertyAccess, ProxyFlags, Reactive, ReactiveFlags,
};
pub use refs::{is_ref, proxy_refs, ref_value, to_ref, to_refs, un_ref, ProxyRefs, Ref};
pub use subscriber::{EffectHandle, EffectId};
pub use watch::{traverse, watch, watch_reactive, WatchFlush, WatchHandle, WatchOptions};
