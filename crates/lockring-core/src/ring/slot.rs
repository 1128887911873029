//! A single storage slot in the list arena.
//!
//! Slots are stored in a flat arena and refer to their neighbours through
//! `Link`s (index + generation) rather than pointers. A slot is in exactly
//! one of three states, so the sentinel has no value field at all and an
//! empty slot has no links.

/// Lightweight index into the slot arena.
///
/// Uses `u32` to keep links small. Index 0 is always the sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// The permanent index of a list's sentinel slot.
    pub const SENTINEL: NodeIndex = NodeIndex(0);

    /// Create a new `NodeIndex` from a `usize`, panicking if it exceeds `u32::MAX`.
    ///
    /// Wrapping would alias slot 0, so the check stays on in release builds.
    #[inline]
    pub fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("NodeIndex overflow"))
    }

    /// Return the index as a `usize` for Vec indexing.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A reference to a slot as it was when the reference was taken.
///
/// The generation changes every time a slot is vacated, so a `Link` held
/// past a removal never matches the slot's next occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Link {
    pub index: NodeIndex,
    pub generation: u32,
}

impl Link {
    pub const SENTINEL: Link = Link {
        index: NodeIndex::SENTINEL,
        generation: 0,
    };

    #[inline]
    pub fn is_sentinel(self) -> bool {
        self.index == NodeIndex::SENTINEL
    }
}

/// Storage state of one arena slot. Guarded as a unit by the slot's mutex.
#[derive(Debug)]
pub(crate) enum Slot<T> {
    /// The list boundary. Always linked (to itself when the list is empty).
    Sentinel { next: Link, prev: Link },
    /// An attached element. `value` is `None` while the element is unset.
    Occupied {
        generation: u32,
        next: Link,
        prev: Link,
        value: Option<T>,
    },
    /// Free or reserved; not part of any ring.
    Empty { generation: u32 },
}

impl<T> Slot<T> {
    pub fn new_sentinel() -> Self {
        Self::Sentinel {
            next: Link::SENTINEL,
            prev: Link::SENTINEL,
        }
    }

    pub fn new_empty() -> Self {
        Self::Empty { generation: 0 }
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        match self {
            Self::Sentinel { .. } => 0,
            Self::Occupied { generation, .. } | Self::Empty { generation } => *generation,
        }
    }

    /// `true` if a handle carrying `generation` still refers to this slot's
    /// current, linked occupant.
    #[inline]
    pub fn is_live(&self, generation: u32) -> bool {
        match self {
            Self::Sentinel { .. } => generation == 0,
            Self::Occupied { generation: g, .. } => *g == generation,
            Self::Empty { .. } => false,
        }
    }

    /// `true` for any slot that is part of a ring.
    #[inline]
    pub fn is_attached(&self) -> bool {
        !matches!(self, Self::Empty { .. })
    }

    /// `(prev, next)` for linked slots.
    #[inline]
    pub fn links(&self) -> Option<(Link, Link)> {
        match self {
            Self::Sentinel { next, prev } | Self::Occupied { next, prev, .. } => {
                Some((*prev, *next))
            }
            Self::Empty { .. } => None,
        }
    }

    pub fn set_next(&mut self, link: Link) {
        match self {
            Self::Sentinel { next, .. } | Self::Occupied { next, .. } => *next = link,
            Self::Empty { .. } => debug_assert!(false, "relinking an empty slot"),
        }
    }

    pub fn set_prev(&mut self, link: Link) {
        match self {
            Self::Sentinel { prev, .. } | Self::Occupied { prev, .. } => *prev = link,
            Self::Empty { .. } => debug_assert!(false, "relinking an empty slot"),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Occupied { value, .. } => value.as_ref(),
            _ => None,
        }
    }

    /// Store a value into an occupied slot. Returns `false` (and drops the
    /// value) for any other state.
    pub fn store(&mut self, new_value: T) -> bool {
        match self {
            Self::Occupied { value, .. } => {
                *value = Some(new_value);
                true
            }
            _ => false,
        }
    }

    pub fn take_value(&mut self) -> Option<T> {
        match self {
            Self::Occupied { value, .. } => value.take(),
            _ => None,
        }
    }

    /// Turn a reserved empty slot into an attached element.
    pub fn occupy(&mut self, prev: Link, next: Link, value: T) {
        debug_assert!(!self.is_attached(), "occupying an attached slot");
        let generation = self.generation();
        *self = Self::Occupied {
            generation,
            next,
            prev,
            value: Some(value),
        };
    }

    /// Detach an occupied slot, bumping its generation. Returns the value it held.
    pub fn vacate(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::Empty { generation: 0 }) {
            Self::Occupied {
                generation, value, ..
            } => {
                *self = Self::Empty {
                    generation: generation.wrapping_add(1),
                };
                value
            }
            other => {
                *self = other;
                None
            }
        }
    }
}
