//! Rollback guards for multi-step mutations.
//!
//! Each guard performs one structural action when it is created and undoes
//! exactly that action when dropped, unless `keep` was called first. A
//! mutation declares its guards in step order; if a later step unwinds, the
//! guards drop in reverse order and restore every touched structure. Once the
//! last step succeeds the caller keeps all of them.
//!
//! Undo actions never allocate. `KeyEntryGuard` compares keys while undoing,
//! so a key `Ord` that panics twice in one mutation aborts the process
//! (double panic).

use crate::index::{KeyIndex, KeyStack};
use crate::sequence::{MainSequence, Position};
use std::rc::Rc;

/// Element pushed onto the front of the main sequence.
pub(crate) struct SequenceGuard<'a, K, V> {
    sequence: &'a mut MainSequence<K, V>,
    position: Position,
    armed: bool,
}

impl<'a, K, V> SequenceGuard<'a, K, V> {
    pub(crate) fn push_front(sequence: &'a mut MainSequence<K, V>, key: Rc<K>, value: V) -> Self {
        let position = sequence.push_front(key, value);
        Self {
            sequence,
            position,
            armed: true,
        }
    }

    pub(crate) fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn keep(mut self) -> Position {
        self.armed = false;
        self.position
    }
}

impl<K, V> Drop for SequenceGuard<'_, K, V> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.sequence.remove(self.position);
        }
    }
}

/// Fresh, empty key entry in the index.
pub(crate) struct KeyEntryGuard<'a, K: Ord> {
    index: &'a mut KeyIndex<K>,
    handle: Rc<K>,
    armed: bool,
}

impl<'a, K: Ord> KeyEntryGuard<'a, K> {
    /// The key must not be indexed yet.
    pub(crate) fn insert(index: &'a mut KeyIndex<K>, handle: Rc<K>) -> Self {
        let created = index.insert_empty(Rc::clone(&handle));
        debug_assert!(created, "key entry guard used for an already indexed key");
        Self {
            index,
            handle,
            armed: created,
        }
    }

    /// Stack of the entry this guard created.
    pub(crate) fn stack_mut(&mut self) -> &mut KeyStack {
        self.index
            .stack_mut(&self.handle)
            .expect("entry must exist immediately after successful insert")
    }

    pub(crate) fn keep(mut self) {
        self.armed = false;
    }
}

impl<K: Ord> Drop for KeyEntryGuard<'_, K> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.index.remove_entry(&self.handle);
        }
    }
}

/// Position pushed onto a per-key stack.
pub(crate) struct StackPushGuard<'a> {
    stack: &'a mut KeyStack,
    armed: bool,
}

impl<'a> StackPushGuard<'a> {
    pub(crate) fn push(stack: &'a mut KeyStack, position: Position) -> Self {
        stack.push(position);
        Self { stack, armed: true }
    }

    pub(crate) fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for StackPushGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.stack.pop();
        }
    }
}
