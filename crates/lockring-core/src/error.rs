//! Error types.
//!
//! Absence (unset values, detached handles, empty lists) is never an error
//! and is reported through `Option`/`bool`. The types here cover the three
//! remaining cases: caller bugs that abort the offending call, ring
//! consistency findings, and stress configuration problems.
use std::path::PathBuf;
use thiserror::Error;

/// A caller-side programming error. Raised as a panic before any link is
/// written, so no partial edit is ever visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("cannot store a value in the sentinel element")]
    SentinelValue,
    #[error("cannot append after an element that is not attached to a list")]
    DetachedAnchor,
    #[error("cannot insert after an element that belongs to a different list")]
    ForeignAnchor,
}

impl InvariantViolation {
    #[track_caller]
    pub(crate) fn raise(self) -> ! {
        panic!("{self}")
    }
}

/// A broken ring found by [`List::check_ring`](crate::List::check_ring).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    #[error("slot {index} is linked at generation {generation} but no longer holds that element")]
    StaleLink { index: u32, generation: u32 },
    #[error("slot {index} points back to slot {found}, expected slot {expected}")]
    BrokenBacklink { index: u32, found: u32, expected: u32 },
    #[error("ring did not return to the sentinel after {visited} slots")]
    Unterminated { visited: usize },
    #[error("size counter reports {counted} elements but {reachable} are reachable")]
    SizeMismatch { counted: usize, reachable: usize },
}

/// Failure to load or validate a [`StressConfig`](crate::stress::StressConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
