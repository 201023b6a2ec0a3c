//! MainSequence: the element list, most recent push first, with stable positions.

use slotmap::{DefaultKey, SlotMap};
use std::fmt;
use std::rc::Rc;

/// Stable position of an element inside a `MainSequence`.
///
/// Positions stay valid across unrelated insertions and removals. A
/// position whose element was removed never resolves again, even if the
/// underlying slot is reused (generational keys).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Position(DefaultKey);

impl Position {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Position(k)
    }
    pub(crate) fn raw_slot(&self) -> DefaultKey {
        self.0
    }
}

/// One stored pair. The key handle is shared with the key index and with
/// every other element of the same key.
pub struct Element<K, V> {
    pub key: Rc<K>,
    pub value: V,
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Element<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Element")
            .field(&*self.key)
            .field(&self.value)
            .finish()
    }
}

#[derive(Debug)]
struct Node<K, V> {
    element: Element<K, V>,
    // Toward the front (more recent).
    prev: Option<DefaultKey>,
    // Toward the back (older).
    next: Option<DefaultKey>,
}

/// Doubly linked list laid out in a slot map.
///
/// Front insertion, front removal and removal at a known position are all
/// O(1); no operation here calls into user code except `Drop` of removed
/// elements, which happens after the links are consistent again.
pub struct MainSequence<K, V> {
    slots: SlotMap<DefaultKey, Node<K, V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> Default for MainSequence<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MainSequence<K, V> {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Insert at the front and return the new element's position.
    pub fn push_front(&mut self, key: Rc<K>, value: V) -> Position {
        let old_head = self.head;
        let k = self.slots.insert(Node {
            element: Element { key, value },
            prev: None,
            next: old_head,
        });
        match old_head {
            Some(h) => self.slots[h].prev = Some(k),
            None => self.tail = Some(k),
        }
        self.head = Some(k);
        Position::new(k)
    }

    pub fn pop_front(&mut self) -> Option<Element<K, V>> {
        let head = self.head?;
        self.remove(Position::new(head))
    }

    /// Unlink and return the element at `pos`. Returns `None` for a stale
    /// position.
    pub fn remove(&mut self, pos: Position) -> Option<Element<K, V>> {
        let node = self.slots.remove(pos.raw_slot())?;
        match node.prev {
            Some(p) => self.slots[p].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.slots[n].prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node.element)
    }

    pub fn front(&self) -> Option<&Element<K, V>> {
        self.head.map(|h| &self.slots[h].element)
    }

    pub fn front_mut(&mut self) -> Option<&mut Element<K, V>> {
        let h = self.head?;
        Some(&mut self.slots[h].element)
    }

    pub fn get(&self, pos: Position) -> Option<&Element<K, V>> {
        self.slots.get(pos.raw_slot()).map(|n| &n.element)
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Element<K, V>> {
        self.slots.get_mut(pos.raw_slot()).map(|n| &mut n.element)
    }

    /// Elements from the front (most recent) to the back (oldest).
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
            remaining: self.slots.len(),
            oldest_first: false,
        }
    }

    /// Elements from the back (oldest) to the front: the order in which
    /// they were pushed.
    pub fn iter_oldest_first(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.tail,
            remaining: self.slots.len(),
            oldest_first: true,
        }
    }

    /// Positions from front to back.
    pub(crate) fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let k = cursor?;
            cursor = self.slots[k].next;
            Some(Position::new(k))
        })
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MainSequence<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over the elements of a `MainSequence`.
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Node<K, V>>,
    cursor: Option<DefaultKey>,
    remaining: usize,
    oldest_first: bool,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a Element<K, V>;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cursor?;
        let node = &self.slots[k];
        self.cursor = if self.oldest_first { node.prev } else { node.next };
        self.remaining -= 1;
        Some(&node.element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
