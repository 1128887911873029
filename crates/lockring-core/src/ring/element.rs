//! Element handles and the structural edit protocols.
//!
//! An [`Element`] is a cheap, cloneable handle: a weak reference to the
//! owning list's arena plus the `Link` (index + generation) of its slot.
//! Value access and navigation lock only that slot. Insertion and removal
//! lock every participant through a [`LockCells`] set, re-validate the
//! links they read beforehand, and retry if a concurrent edit got there
//! first.
use super::arena::Arena;
#[cfg(test)]
use super::arena::SlotCell;
use super::lock_set::LockCells;
use super::slot::{Link, NodeIndex, Slot};
use crate::error::InvariantViolation;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Traversal direction along the ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

/// Where an insertion goes.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Anchor {
    /// Immediately after this slot. Fails if the slot is detached.
    After(Link),
    /// After whichever element is the tail when the locks are taken.
    Last,
}

/// Result of a removal attempt.
pub(crate) enum Detach<T> {
    Removed(Option<T>),
    /// The target was already detached.
    Gone,
    /// The target is attached but no longer at the requested end.
    Moved,
}

/// Read `(prev, next)` of a live slot under its own lock.
pub(crate) fn read_links<T>(arena: &Arena<T>, link: Link) -> Option<(Link, Link)> {
    let cell = arena.cell(link.index);
    let slot = cell.lock();
    if slot.is_live(link.generation) {
        slot.links()
    } else {
        None
    }
}

/// Insert `value` into a freshly reserved slot at `anchor`.
///
/// Locks the anchor, both of its neighbours and the new slot. Hands the
/// value back if an `After` anchor turns out to be detached.
pub(crate) fn append<T>(arena: &Arena<T>, anchor: Anchor, value: T) -> Result<Link, T> {
    let new = arena.reserve();
    loop {
        let target = match anchor {
            Anchor::After(link) => link,
            Anchor::Last => match read_links(arena, Link::SENTINEL) {
                Some((tail, _)) => tail,
                None => continue,
            },
        };
        let Some((prev, next)) = read_links(arena, target) else {
            if matches!(anchor, Anchor::Last) {
                continue;
            }
            arena.release(new.index);
            return Err(value);
        };
        if matches!(anchor, Anchor::Last) && !next.is_sentinel() {
            trace!("tail moved before append; retrying");
            continue;
        }

        let cells = LockCells::collect(arena, &[target.index, prev.index, next.index, new.index]);
        let mut set = cells.lock();

        let current = set.slot(target.index);
        if !current.is_live(target.generation) {
            drop(set);
            if matches!(anchor, Anchor::Last) {
                continue;
            }
            arena.release(new.index);
            return Err(value);
        }
        if current.links() != Some((prev, next)) {
            drop(set);
            trace!(anchor = target.index.0, "neighbours changed before append; retrying");
            continue;
        }
        // Reserved slots are unlinked and unreachable until `occupy` below.
        debug_assert!(!set.slot(new.index).is_attached(), "reserved slot is already attached");

        set.slot_mut(new.index).occupy(target, next, value);
        set.slot_mut(target.index).set_next(new);
        set.slot_mut(next.index).set_prev(new);
        arena.increment();
        return Ok(new);
    }
}

/// Unlink `target` from its ring.
///
/// `edge` additionally requires the target to still be the head
/// (`Backward`: its predecessor is the sentinel) or the tail (`Forward`).
pub(crate) fn detach<T>(arena: &Arena<T>, target: Link, edge: Option<Direction>) -> Detach<T> {
    if target.is_sentinel() {
        return Detach::Gone;
    }
    loop {
        let Some((prev, next)) = read_links(arena, target) else {
            return Detach::Gone;
        };
        let at_edge = match edge {
            None => true,
            Some(Direction::Backward) => prev.is_sentinel(),
            Some(Direction::Forward) => next.is_sentinel(),
        };
        if !at_edge {
            return Detach::Moved;
        }

        let cells = LockCells::collect(arena, &[prev.index, target.index, next.index]);
        let mut set = cells.lock();

        let current = set.slot(target.index);
        if !current.is_live(target.generation) {
            return Detach::Gone;
        }
        if current.links() != Some((prev, next)) {
            drop(set);
            trace!(index = target.index.0, "neighbours changed before detach; retrying");
            continue;
        }

        set.slot_mut(prev.index).set_next(next);
        set.slot_mut(next.index).set_prev(prev);
        let value = set.slot_mut(target.index).vacate();
        arena.decrement();
        drop(set);

        arena.release(target.index);
        return Detach::Removed(value);
    }
}

/// A handle to one element of a [`List`](crate::List).
///
/// Handles never keep the list alive and never dangle: once the element is
/// removed (or the list dropped) every operation on the handle reports
/// absence, even after its slot has been reused for a new element.
///
/// The list's sentinel is reachable only as the `head()`/`tail()` of an
/// empty list. It is always attached, never holds a value and has no
/// neighbours as far as [`next`](Element::next) and
/// [`previous`](Element::previous) are concerned.
pub struct Element<T> {
    owner: Weak<Arena<T>>,
    link: Link,
}

impl<T> Element<T> {
    pub(crate) fn new(owner: Weak<Arena<T>>, link: Link) -> Self {
        Self { owner, link }
    }

    /// Arena slot index of this element. Slot 0 is the sentinel.
    #[inline]
    pub fn index(&self) -> NodeIndex {
        self.link.index
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.link.is_sentinel()
    }

    /// `true` if this handle still refers to a linked element (or the
    /// sentinel of a live list).
    pub fn is_attached(&self) -> bool {
        self.with_slot(|_| ()).is_some()
    }

    pub(crate) fn belongs_to(&self, arena: &Arc<Arena<T>>) -> bool {
        std::ptr::eq(self.owner.as_ptr(), Arc::as_ptr(arena))
    }

    /// Run `op` on the slot under its lock if the handle is still live.
    fn with_slot<R>(&self, op: impl FnOnce(&mut Slot<T>) -> R) -> Option<R> {
        let arena = self.owner.upgrade()?;
        let cell = arena.cell(self.link.index);
        let mut slot = cell.lock();
        if slot.is_live(self.link.generation) {
            Some(op(&mut *slot))
        } else {
            None
        }
    }

    /// A clone of the current value, or `None` if the element is unset,
    /// detached or the sentinel.
    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.with_value(T::clone)
    }

    /// Same as [`get`](Element::get).
    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        self.get()
    }

    /// Borrow the current value under the element's lock.
    pub fn with_value<R>(&self, op: impl FnOnce(&T) -> R) -> Option<R> {
        self.with_slot(|slot| slot.value().map(op)).flatten()
    }

    /// Store `value` and mark the element present.
    ///
    /// A detached element silently drops the value.
    ///
    /// # Panics
    ///
    /// On the sentinel.
    pub fn set(&self, value: T) -> &Self {
        if self.is_sentinel() {
            InvariantViolation::SentinelValue.raise();
        }
        if self.with_slot(|slot| slot.store(value)) != Some(true) {
            trace!(index = self.link.index.0, "set on detached element ignored");
        }
        self
    }

    /// Clear the value, returning what was removed.
    pub fn unset(&self) -> Option<T> {
        self.with_slot(Slot::take_value).flatten()
    }

    /// `true` iff the element currently holds a value.
    pub fn ok(&self) -> bool {
        self.with_slot(|slot| slot.value().is_some()).unwrap_or(false)
    }

    /// The following element, or `None` at the end of the list.
    pub fn next(&self) -> Option<Self> {
        if self.is_sentinel() {
            return None;
        }
        self.neighbour(Direction::Forward)
    }

    /// The preceding element, or `None` at the start of the list.
    pub fn previous(&self) -> Option<Self> {
        if self.is_sentinel() {
            return None;
        }
        self.neighbour(Direction::Backward)
    }

    /// Neighbour in `direction`, hiding the sentinel. Unlike
    /// [`next`](Element::next) this also works from the sentinel.
    pub(crate) fn neighbour(&self, direction: Direction) -> Option<Self> {
        let (prev, next) = self.with_slot(|slot| slot.links()).flatten()?;
        let link = match direction {
            Direction::Forward => next,
            Direction::Backward => prev,
        };
        if link.is_sentinel() {
            None
        } else {
            Some(Self::new(self.owner.clone(), link))
        }
    }

    /// Remove the element from its list and return its value.
    ///
    /// Returns `None` for the sentinel, an element that is already detached,
    /// or an element that was unset when removed.
    pub fn pop(&self) -> Option<T> {
        let arena = self.owner.upgrade()?;
        match detach(&arena, self.link, None) {
            Detach::Removed(value) => value,
            Detach::Gone | Detach::Moved => None,
        }
    }

    /// Remove the element from its list, dropping its value.
    pub fn discard(&self) {
        let _ = self.pop();
    }

    /// Insert `value` immediately after this element.
    ///
    /// # Panics
    ///
    /// If this element is not attached to a list.
    pub fn insert_after(&self, value: T) -> Self {
        match self.try_insert_after(value) {
            Ok(element) => element,
            Err(_) => InvariantViolation::DetachedAnchor.raise(),
        }
    }

    /// Like [`insert_after`](Element::insert_after) but hands the value
    /// back instead of panicking when this element is detached.
    pub fn try_insert_after(&self, value: T) -> Result<Self, T> {
        let Some(arena) = self.owner.upgrade() else {
            return Err(value);
        };
        let link = append(&arena, Anchor::After(self.link), value)?;
        Ok(Self::new(self.owner.clone(), link))
    }

    /// Whitebox hook: the mutex guarding this element's slot.
    #[cfg(test)]
    pub(crate) fn slot_cell(&self) -> Option<SlotCell<T>> {
        self.owner.upgrade().map(|arena| arena.cell(self.link.index))
    }
}

impl<T> Clone for Element<T> {
    fn clone(&self) -> Self {
        Self::new(self.owner.clone(), self.link)
    }
}

impl<T> PartialEq for Element<T> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.owner, &other.owner) && self.link == other.link
    }
}

impl<T> Eq for Element<T> {}

impl<T> fmt::Debug for Element<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("index", &self.link.index.0)
            .field("generation", &self.link.generation)
            .field("sentinel", &self.is_sentinel())
            .finish()
    }
}
