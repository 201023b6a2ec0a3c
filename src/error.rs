//! Errors reported by `KeyedStack`.

use thiserror::Error;

/// Misuse errors: the requested element does not exist.
///
/// Panics raised by user `Clone`/`Ord` code are not turned into errors; they
/// unwind through the operation, which rolls back before they propagate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum StackError {
    /// Unkeyed `pop`/`front` on a stack with no elements.
    #[error("stack is empty")]
    EmptyContainer,

    /// Keyed `pop_key`/`front_key` for a key with no live occurrence.
    #[error("key not found in stack")]
    KeyNotFound,
}
