//! Multi-slot lock acquisition for structural edits.
//!
//! Every edit that rewrites links on more than one slot goes through here:
//!
//! 1. [`LockCells::collect`] takes the participant indices, sorts them into
//!    canonical (ascending `NodeIndex`) order, removes duplicates (a short
//!    ring aliases neighbours, e.g. `anchor.prev == anchor.next`) and clones
//!    the slot handles out of the arena.
//! 2. [`LockCells::lock`] acquires every mutex in that order.
//! 3. Dropping the [`LockSet`] releases them in reverse order.
//!
//! Two edits that share a slot always contend for it at the same position
//! in their acquisition sequence, so neither can hold a slot the other
//! needs while waiting for one the other holds.
use super::arena::{Arena, SlotCell};
use super::slot::{NodeIndex, Slot};
use parking_lot::MutexGuard;

/// Slot handles for one edit, already in canonical order.
pub(crate) struct LockCells<T> {
    indices: Vec<NodeIndex>,
    cells: Vec<SlotCell<T>>,
}

impl<T> LockCells<T> {
    pub fn collect(arena: &Arena<T>, participants: &[NodeIndex]) -> Self {
        let mut indices = participants.to_vec();
        indices.sort_unstable();
        indices.dedup();
        let cells = arena.cells(&indices);
        Self { indices, cells }
    }

    /// Block until every slot is held.
    pub fn lock(&self) -> LockSet<'_, T> {
        let held = self
            .indices
            .iter()
            .zip(&self.cells)
            .map(|(&index, cell)| (index, cell.lock()))
            .collect();
        LockSet { held }
    }
}

/// Guards for every participant of one edit.
pub(crate) struct LockSet<'a, T> {
    /// Sorted by index; searched with `binary_search_by_key`.
    held: Vec<(NodeIndex, MutexGuard<'a, Slot<T>>)>,
}

impl<T> LockSet<'_, T> {
    pub fn slot(&self, index: NodeIndex) -> &Slot<T> {
        let pos = self.position(index);
        &self.held[pos].1
    }

    pub fn slot_mut(&mut self, index: NodeIndex) -> &mut Slot<T> {
        let pos = self.position(index);
        &mut self.held[pos].1
    }

    fn position(&self, index: NodeIndex) -> usize {
        match self.held.binary_search_by_key(&index, |(i, _)| *i) {
            Ok(pos) => pos,
            Err(_) => panic!("slot {} is not part of this lock set", index.0),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.held.len()
    }
}

impl<T> Drop for LockSet<'_, T> {
    fn drop(&mut self) {
        while self.held.pop().is_some() {}
    }
}
