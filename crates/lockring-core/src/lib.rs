//! LockRing Core — a concurrent doubly linked list with per-element locks.
//!
//! Every element carries its own mutex. Value reads and writes lock one
//! element; insertions and removals lock the handful of elements whose
//! links change, always in ascending slot order so overlapping edits
//! cannot deadlock. The element count is an atomic readable without any
//! lock.
//!
//! # Modules
//!
//! - [`ring`] — the list, its element handles and the locking protocol.
//! - [`error`] — invariant violations, ring check and configuration errors.
//! - [`stress`] — multi-threaded workload driver with progress reporting.
pub mod error;
pub mod ring;
pub mod stress;

pub use error::{ConfigError, InvariantViolation, RingError};
pub use ring::{Element, Iter, List, NodeIndex, SharedList, Values};
