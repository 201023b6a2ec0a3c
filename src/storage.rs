//! Storage: the shareable bundle of main sequence and key index.

use crate::guard::{KeyEntryGuard, SequenceGuard, StackPushGuard};
use crate::index::KeyIndex;
use crate::sequence::{Element, MainSequence, Position};
use std::fmt;
use std::rc::Rc;

/// Everything one or more `KeyedStack`s may alias through a single `Rc`.
pub(crate) struct Storage<K, V> {
    pub(crate) sequence: MainSequence<K, V>,
    pub(crate) index: KeyIndex<K>,
}

impl<K, V> Storage<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            sequence: MainSequence::new(),
            index: KeyIndex::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sequence.len()
    }

    pub(crate) fn front(&self) -> Option<&Element<K, V>> {
        self.sequence.front()
    }

    pub(crate) fn front_mut(&mut self) -> Option<&mut Element<K, V>> {
        self.sequence.front_mut()
    }

    pub(crate) fn value_mut(&mut self, pos: Position) -> Option<&mut V> {
        self.sequence.get_mut(pos).map(|e| &mut e.value)
    }
}

impl<K: Ord, V> Storage<K, V> {
    /// Push `(key, value)` as a single transaction over both structures.
    ///
    /// User code runs only inside key comparisons; a panic there unwinds the
    /// guards taken so far and leaves both structures as they were.
    pub(crate) fn push(&mut self, key: K, value: V) {
        let Self { sequence, index } = self;
        let existing = index.handle(&key);
        let fresh = existing.is_none();
        let handle = existing.unwrap_or_else(|| Rc::new(key));

        let front = SequenceGuard::push_front(sequence, Rc::clone(&handle), value);
        if fresh {
            let mut entry = KeyEntryGuard::insert(index, handle);
            StackPushGuard::push(entry.stack_mut(), front.position()).keep();
            entry.keep();
        } else {
            let stack = index
                .stack_mut(&handle)
                .expect("handle was resolved from this index");
            StackPushGuard::push(stack, front.position()).keep();
        }
        front.keep();
        self.debug_check();
    }

    /// Remove the front element; its key loses its most recent occurrence.
    pub(crate) fn pop_front(&mut self) -> Option<V> {
        let key = Rc::clone(&self.sequence.front()?.key);
        let pos = self
            .index
            .pop_position(&key)
            .expect("front element must be indexed under its key");
        let element = self
            .sequence
            .pop_front()
            .expect("sequence was checked to be non-empty");
        debug_assert!(
            self.sequence.get(pos).is_none(),
            "top of the front key's stack must be the front element"
        );
        drop(key);
        self.debug_check();
        Some(element.value)
    }

    /// Remove the most recent occurrence of `key`, wherever it sits.
    pub(crate) fn pop_key(&mut self, key: &K) -> Option<V> {
        let pos = self.index.pop_position(key)?;
        let element = self
            .sequence
            .remove(pos)
            .expect("indexed position must be live in the sequence");
        self.debug_check();
        Some(element.value)
    }

    pub(crate) fn count(&self, key: &K) -> usize {
        self.index.count(key)
    }

    pub(crate) fn front_key(&self, key: &K) -> Option<&V> {
        let pos = self.index.top(key)?;
        self.sequence.get(pos).map(|e| &e.value)
    }

    /// Position of the most recent occurrence of `key`.
    pub(crate) fn top(&self, key: &K) -> Option<Position> {
        self.index.top(key)
    }

    /// Structural self-check, compiled only with debug assertions.
    #[inline]
    pub(crate) fn debug_check(&self) {
        #[cfg(debug_assertions)]
        self.check_consistency();
    }

    #[cfg(debug_assertions)]
    fn check_consistency(&self) {
        let mut indexed = 0;
        for (handle, stack) in self.index.stacks() {
            assert!(!stack.is_empty(), "index entry with an empty stack");
            for &pos in stack {
                let element = self
                    .sequence
                    .get(pos)
                    .expect("indexed position must be live in the sequence");
                assert!(
                    Rc::ptr_eq(&element.key, handle),
                    "element does not share its key's handle"
                );
            }
            indexed += stack.len();
        }
        assert_eq!(indexed, self.sequence.len(), "index and sequence sizes differ");
        debug_assert_eq!(self.sequence.positions().count(), self.sequence.len());
    }
}

impl<K: Ord + Clone, V: Clone> Storage<K, V> {
    /// Deep copy, replaying every pair oldest first so the copy has the same
    /// order and its own key handles. A panicking clone drops the partial
    /// copy and leaves `self` untouched.
    pub(crate) fn duplicate(&self) -> Self {
        let mut copy = Self::new();
        for element in self.sequence.iter_oldest_first() {
            copy.push((*element.key).clone(), element.value.clone());
        }
        copy
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Storage<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("sequence", &self.sequence)
            .field("index", &self.index)
            .finish()
    }
}
