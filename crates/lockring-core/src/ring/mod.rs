//! Concurrent doubly linked list.
//!
//! - [`slot`] — arena slot states and stable indices.
//! - [`arena`] — the lockable slot arena and the size counter.
//! - [`lock_set`] — canonical-order acquisition of several slot locks.
//! - [`element`] — element handles, insertion and removal.
//! - [`list`] — the list container and its iterators.
mod arena;
pub mod element;
pub mod list;
mod lock_set;
pub mod slot;

pub use element::Element;
pub use list::{Iter, List, SharedList, Values};
pub use slot::NodeIndex;
