//! Error types for the reactivity engine.
//!
//! The engine itself has very few failure modes. Writes through a read-only
//! proxy are reported as warnings, not errors, and failures inside user
//! effect bodies are passed through untouched. What remains are conversion
//! errors at the boundary between the dynamic [`Value`](crate::Value) model
//! and typed Rust code.

use thiserror::Error;

/// Errors produced by the reactivity engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A value had a different variant than the caller asked for.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An object-only operation was handed a primitive value.
    #[error("value cannot be made reactive: {found} is not an object")]
    NotAnObject { found: &'static str },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
