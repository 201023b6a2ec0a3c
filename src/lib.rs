//! keyed-stack: a single-threaded stack of `(key, value)` pairs with keyed
//! access, copy-on-write clones, and all-or-nothing mutations.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a LIFO container where every pair is also reachable by key, whose
//!   clones are O(1), and whose mutations never leave a half-applied state.
//! - Layers:
//!   - MainSequence<K, V>: doubly linked list laid out in a `SlotMap`;
//!     elements most recent first, addressed by stable generational
//!     `Position`s. Source of truth for `len`, `front`, and `pop`.
//!   - KeyIndex<K>: `BTreeMap` from each distinct key to the stack of its
//!     positions, most recent on top. Source of truth for `count`, keyed
//!     access, and ascending key iteration.
//!   - Storage<K, V>: the pair of the two, mutated only through rollback
//!     guards (`guard`), and shared between clones behind one `Rc`.
//!   - KeyedStack<K, V>: public API. Runs the copy-on-write check before
//!     each mutation and hands out `Keys` iterators.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by construction (`Rc`).
//! - One `Rc<K>` per distinct key per storage, shared by the index entry and
//!   every element with that key. Lookups borrow `&K` directly.
//! - `len()` equals the sequence length; `count(k)` equals the length of
//!   `k`'s stack; every sequence position appears in exactly one stack.
//!
//! Copy-on-write
//! - Clones share storage while the source is shareable. A mutation on
//!   storage with more than one owner first deep-copies it (oldest pair
//!   first, through the ordinary push path) and swaps the copy in.
//! - Handing out `&mut V` (`front_mut`, `front_key_mut`) marks the stack
//!   unshareable; the next clone copies eagerly. Any push or pop marks it
//!   shareable again, because the borrow checker has ended the mutable
//!   borrow by then.
//!
//! Failure model
//! - Misuse (`pop` on empty, keyed access to an absent key) returns
//!   `StackError`; the stack is not touched and nothing is copied.
//! - User code (`K: Ord`, `K: Clone`, `V: Clone`) may panic. Each mutation
//!   is a chain of guards: the copy-on-write snapshot, the sequence
//!   insertion, the key entry creation, and the per-key push. Unwinding drops
//!   them in reverse and restores the previous state; the panic itself
//!   propagates unchanged.
//!
//! Diagnostics
//! - In debug builds every committed mutation re-checks the structural
//!   invariants above; release builds skip the check entirely.

mod error;
mod guard;
mod index;
mod iter;
mod keyed_stack;
mod sequence;
mod sequence_proptest;
mod storage;

// Public surface
pub use error::StackError;
pub use iter::Keys;
pub use keyed_stack::KeyedStack;

#[cfg(feature = "bench_internal")]
pub use sequence::{Element, MainSequence, Position};
