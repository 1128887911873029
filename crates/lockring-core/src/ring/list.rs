//! The list container.
//!
//! A `List` owns the arena; callers work through [`Element`] handles that
//! only hold a weak reference to it. Push and pop at either end go through
//! the same lock-set protocols as element-level edits, anchored on the
//! sentinel.
use super::arena::Arena;
use super::element::{append, detach, read_links, Anchor, Detach, Direction, Element};
use super::slot::Link;
use crate::error::{InvariantViolation, RingError};
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, trace};

/// A list shared between threads.
pub type SharedList<T> = Arc<List<T>>;

/// A doubly linked list whose elements are individually locked.
///
/// All operations take `&self`; wrap the list in an [`Arc`] (see
/// [`SharedList`]) or borrow it from scoped threads to use it concurrently.
pub struct List<T> {
    arena: Arc<Arena<T>>,
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty list with room for `estimated_elements` before the
    /// arena has to grow.
    pub fn with_capacity(estimated_elements: usize) -> Self {
        Self {
            arena: Arc::new(Arena::with_capacity(estimated_elements)),
        }
    }

    /// Number of attached elements. Never blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle(&self, link: Link) -> Element<T> {
        Element::new(Arc::downgrade(&self.arena), link)
    }

    fn sentinel(&self) -> Element<T> {
        self.handle(Link::SENTINEL)
    }

    /// Current `(tail, head)` links as seen by the sentinel.
    fn ends(&self) -> (Link, Link) {
        read_links(&self.arena, Link::SENTINEL).unwrap_or((Link::SENTINEL, Link::SENTINEL))
    }

    /// The first element, or the sentinel when the list is empty.
    ///
    /// Never absent, so `.ok()`, `.get()` and `.next()` can be chained
    /// without checking for an empty list first.
    pub fn head(&self) -> Element<T> {
        self.handle(self.ends().1)
    }

    /// The last element, or the sentinel when the list is empty.
    pub fn tail(&self) -> Element<T> {
        self.handle(self.ends().0)
    }

    pub fn push_front(&self, value: T) -> Element<T> {
        match append(&self.arena, Anchor::After(Link::SENTINEL), value) {
            Ok(link) => self.handle(link),
            Err(_) => InvariantViolation::DetachedAnchor.raise(),
        }
    }

    pub fn push_back(&self, value: T) -> Element<T> {
        match append(&self.arena, Anchor::Last, value) {
            Ok(link) => self.handle(link),
            Err(_) => InvariantViolation::DetachedAnchor.raise(),
        }
    }

    /// Same as [`push_back`](List::push_back).
    pub fn append(&self, value: T) -> Element<T> {
        self.push_back(value)
    }

    /// Insert `value` immediately after `anchor`.
    ///
    /// # Panics
    ///
    /// If `anchor` belongs to another list or is no longer attached.
    pub fn insert_after(&self, anchor: &Element<T>, value: T) -> Element<T> {
        if !anchor.belongs_to(&self.arena) {
            InvariantViolation::ForeignAnchor.raise();
        }
        anchor.insert_after(value)
    }

    /// Remove the first element and return its value.
    ///
    /// `None` if the list is empty. An unset head is still removed and also
    /// yields `None`, so check [`is_empty`](List::is_empty) rather than the
    /// result when draining a list that may hold unset elements.
    pub fn pop_front(&self) -> Option<T> {
        self.pop_edge(Direction::Backward)
    }

    /// Remove the last element and return its value.
    ///
    /// Unset elements are handled as in [`pop_front`](List::pop_front).
    pub fn pop_back(&self) -> Option<T> {
        self.pop_edge(Direction::Forward)
    }

    /// `Backward` pops the head (whose predecessor is the sentinel),
    /// `Forward` pops the tail.
    fn pop_edge(&self, edge: Direction) -> Option<T> {
        loop {
            let (tail, head) = self.ends();
            let target = match edge {
                Direction::Backward => head,
                Direction::Forward => tail,
            };
            if target.is_sentinel() {
                return None;
            }
            match detach(&self.arena, target, Some(edge)) {
                Detach::Removed(value) => return value,
                Detach::Gone | Detach::Moved => {
                    trace!(index = target.index.0, "list end changed before pop; retrying");
                }
            }
        }
    }

    /// Forward traversal over element handles.
    ///
    /// Weakly consistent: edits ahead of the cursor are seen, edits behind
    /// it are not. If the next element is removed before the cursor reaches
    /// it, the traversal ends there.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            cursor: self.sentinel().neighbour(Direction::Forward),
            direction: Direction::Forward,
        }
    }

    /// Backward traversal over element handles, starting at the tail.
    pub fn iter_rev(&self) -> Iter<T> {
        Iter {
            cursor: self.sentinel().neighbour(Direction::Backward),
            direction: Direction::Backward,
        }
    }

    /// Lazy forward sequence of values. Unset elements are skipped.
    pub fn values(&self) -> Values<T>
    where
        T: Clone,
    {
        Values { inner: self.iter() }
    }

    /// Lazy backward sequence of values.
    pub fn values_rev(&self) -> Values<T>
    where
        T: Clone,
    {
        Values {
            inner: self.iter_rev(),
        }
    }

    /// Walk the ring and verify that every link is mirrored by its
    /// neighbour and that the size counter matches the walk.
    ///
    /// Only meaningful while no other thread is editing the list; returns
    /// the number of reachable elements.
    pub fn check_ring(&self) -> Result<usize, RingError> {
        let limit = self.arena.slot_count();
        let mut previous = Link::SENTINEL;
        let (_, mut current) = self.ends();
        let mut visited = 0;

        while !current.is_sentinel() {
            if visited >= limit {
                return Err(RingError::Unterminated { visited });
            }
            let (prev, next) = read_links(&self.arena, current).ok_or(RingError::StaleLink {
                index: current.index.0,
                generation: current.generation,
            })?;
            if prev != previous {
                return Err(RingError::BrokenBacklink {
                    index: current.index.0,
                    found: prev.index.0,
                    expected: previous.index.0,
                });
            }
            visited += 1;
            previous = current;
            current = next;
        }

        let (tail, _) = self.ends();
        if tail != previous {
            return Err(RingError::BrokenBacklink {
                index: 0,
                found: tail.index.0,
                expected: previous.index.0,
            });
        }

        let counted = self.len();
        if counted != visited {
            return Err(RingError::SizeMismatch {
                counted,
                reachable: visited,
            });
        }
        debug!(elements = visited, "ring check passed");
        Ok(visited)
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

/// Appends every value at the back. Takes `&List` so it works on a shared list.
impl<T> Extend<T> for &List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> Extend<T> for List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut shared = &*self;
        shared.extend(iter);
    }
}

impl<T: fmt::Debug + Clone> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values()).finish()
    }
}

/// Iterator over element handles. Created by [`List::iter`] and
/// [`List::iter_rev`].
pub struct Iter<T> {
    cursor: Option<Element<T>>,
    direction: Direction,
}

impl<T> Iterator for Iter<T> {
    type Item = Element<T>;

    fn next(&mut self) -> Option<Element<T>> {
        let current = self.cursor.take()?;
        self.cursor = current.neighbour(self.direction);
        Some(current)
    }
}

impl<T> FusedIterator for Iter<T> {}

/// Iterator over cloned values. Created by [`List::values`] and
/// [`List::values_rev`].
pub struct Values<T> {
    inner: Iter<T>,
}

impl<T: Clone> Iterator for Values<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.find_map(|element| element.get())
    }
}

impl<T: Clone> FusedIterator for Values<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_back_smoke() {
        let list = List::new();
        assert_eq!(list.len(), 0);
        list.push_back(1);
        assert_eq!(list.len(), 1);
        list.push_back(2);
        assert_eq!(list.len(), 2);
        assert_eq!(list.tail().get(), Some(2));
        assert_eq!(list.head().get(), Some(1));
        assert_eq!(list.pop_back(), Some(2));
        assert_eq!(list.len(), 1);
        assert_eq!(list.pop_back(), Some(1));
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_push_front_smoke() {
        let list = List::new();
        list.push_front(1);
        list.push_front(2);
        assert_eq!(list.len(), 2);
        assert_eq!(list.head().get(), Some(2));
        assert_eq!(list.tail().get(), Some(1));
        assert_eq!(list.pop_front(), Some(2));
        assert_eq!(list.pop_front(), Some(1));
        assert!(list.is_empty());
    }

    #[test]
    fn test_append_adds_to_the_back() {
        let list = List::new();
        list.push_back(1);
        let last = list.append(2);
        assert_eq!(last.get(), Some(2));
        assert_eq!(list.tail(), last);
        list.push_front(0);
        assert_eq!(list.append(3).previous(), Some(last));
        assert_eq!(list.values().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_pop_unset_end_removes_it_without_value() {
        let list: List<i32> = (1..=3).collect();
        list.head().unset();
        list.tail().unset();

        assert_eq!(list.pop_front(), None);
        assert_eq!(list.len(), 2);
        assert_eq!(list.pop_back(), None);
        assert_eq!(list.len(), 1);

        // Draining by `is_empty` still reaches the remaining values.
        list.push_front(0);
        list.head().unset();
        let mut drained = Vec::new();
        while !list.is_empty() {
            drained.extend(list.pop_front());
        }
        assert_eq!(drained, vec![2]);
        assert_eq!(list.check_ring(), Ok(0));
    }

    #[test]
    fn test_pop_empty_list() {
        let list: List<i32> = List::new();
        assert_eq!(list.pop_back(), None);
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_empty_ends_are_sentinel() {
        let list: List<i32> = List::new();
        let head = list.head();
        let tail = list.tail();
        assert!(head.is_sentinel());
        assert_eq!(head, tail);
        assert!(!head.ok());
        assert_eq!(head.value(), None);
        assert_eq!(head.next(), None);
        assert_eq!(tail.previous(), None);
    }

    #[test]
    fn test_single_element_is_head_and_tail() {
        let list = List::new();
        let only = list.push_back("x");
        assert_eq!(list.head(), only);
        assert_eq!(list.tail(), only);
        assert_eq!(list.check_ring(), Ok(1));
    }

    #[test]
    fn test_unset_elements_are_skipped_by_values() {
        let list: List<i32> = (1..=4).collect();
        list.head().next().unwrap().unset();
        assert_eq!(list.values().collect::<Vec<_>>(), vec![1, 3, 4]);
        assert_eq!(list.iter().count(), 4);
    }

    #[test]
    fn test_reverse_iteration() {
        let list: List<i32> = (1..=5).collect();
        assert_eq!(list.values_rev().collect::<Vec<_>>(), vec![5, 4, 3, 2, 1]);
        assert_eq!(list.iter_rev().next(), Some(list.tail()));
    }

    #[test]
    fn test_iteration_sees_edits_ahead_of_cursor() {
        let list: List<i32> = (1..=3).collect();
        let mut values = list.values();
        assert_eq!(values.next(), Some(1));
        list.push_back(4);
        list.tail().previous().unwrap().set(30);
        assert_eq!(values.collect::<Vec<_>>(), vec![2, 30, 4]);
    }

    #[test]
    fn test_insert_after_via_list() {
        let list: List<i32> = [1, 3].into_iter().collect();
        let one = list.head();
        list.insert_after(&one, 2);
        assert_eq!(list.values().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "different list")]
    fn test_insert_after_foreign_anchor_panics() {
        let a: List<i32> = [1].into_iter().collect();
        let b: List<i32> = [2].into_iter().collect();
        b.insert_after(&a.head(), 3);
    }

    #[test]
    fn test_extend_shared_reference() {
        let list = List::new();
        (&list).extend([1, 2]);
        let mut owned = list;
        owned.extend([3]);
        assert_eq!(owned.values().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_debug_lists_values() {
        let list: List<i32> = (1..=3).collect();
        assert_eq!(format!("{list:?}"), "[1, 2, 3]");
    }

    #[test]
    fn test_check_ring_after_churn() {
        let list = List::with_capacity(16);
        for i in 0..16 {
            if i % 3 == 0 {
                list.push_front(i);
            } else {
                list.push_back(i);
            }
        }
        for _ in 0..5 {
            list.pop_back();
            list.head().next().unwrap().discard();
        }
        assert_eq!(list.check_ring(), Ok(6));
        assert_eq!(list.len(), 6);
    }
}
