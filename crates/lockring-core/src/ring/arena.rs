//! Arena of independently lockable slots backing one list.
//!
//! All slots live in a single `Vec`. Each slot is an `Arc<Mutex<Slot<T>>>`
//! so a thread can clone the handles it needs under a brief read lock on
//! the vector and then wait on the slot mutexes with the vector unlocked.
//! The vector only ever grows; vacated slots are recycled through a free
//! list and carry a bumped generation, so indices stay stable for the
//! arena's whole lifetime.
use super::slot::{Link, NodeIndex, Slot};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One lockable slot.
pub(crate) type SlotCell<T> = Arc<Mutex<Slot<T>>>;

pub(crate) struct Arena<T> {
    /// Index 0 is the sentinel.
    slots: RwLock<Vec<SlotCell<T>>>,
    /// Vacated slots available for reuse.
    free: Mutex<Vec<NodeIndex>>,
    /// Attached non-sentinel elements. Only changed inside a lock set.
    size: AtomicUsize,
}

impl<T> Arena<T> {
    /// Create an arena holding only a self-linked sentinel.
    pub fn with_capacity(estimated_elements: usize) -> Self {
        let mut slots = Vec::with_capacity(estimated_elements + 1);
        slots.push(Arc::new(Mutex::new(Slot::new_sentinel())));
        Self {
            slots: RwLock::new(slots),
            free: Mutex::new(Vec::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Clone the handle for one slot.
    #[inline]
    pub fn cell(&self, index: NodeIndex) -> SlotCell<T> {
        Arc::clone(&self.slots.read()[index.idx()])
    }

    /// Clone the handles for several slots under one read lock.
    pub fn cells(&self, indices: &[NodeIndex]) -> Vec<SlotCell<T>> {
        let slots = self.slots.read();
        indices.iter().map(|i| Arc::clone(&slots[i.idx()])).collect()
    }

    /// Reserve an empty slot for a new element.
    ///
    /// The reserved slot is unreachable from any ring and absent from the
    /// free list until it is either linked or handed back via [`release`].
    ///
    /// [`release`]: Arena::release
    pub fn reserve(&self) -> Link {
        let recycled = self.free.lock().pop();
        if let Some(index) = recycled {
            let generation = self.cell(index).lock().generation();
            return Link { index, generation };
        }

        let mut slots = self.slots.write();
        let index = NodeIndex::new(slots.len());
        slots.push(Arc::new(Mutex::new(Slot::new_empty())));
        Link {
            index,
            generation: 0,
        }
    }

    /// Return a vacated or unused reserved slot to the free list.
    pub fn release(&self, index: NodeIndex) {
        debug_assert_ne!(index, NodeIndex::SENTINEL, "the sentinel is never released");
        self.free.lock().push(index);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    #[inline]
    pub fn increment(&self) {
        self.size.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn decrement(&self) {
        self.size.fetch_sub(1, Ordering::AcqRel);
    }

    /// Total slots ever allocated, sentinel included.
    pub fn slot_count(&self) -> usize {
        self.slots.read().len()
    }
}
