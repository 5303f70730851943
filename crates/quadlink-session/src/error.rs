//! Session error types.
//!
//! Load failures are fatal to session start and retain nothing. State sizing
//! failures are rejected before any instance is touched. Everything else in
//! the per-tick path is infallible by contract.

use std::fmt;

/// Why a session failed to load. No partial session survives any of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The ROM image was empty.
    EmptyRom,
    /// Requested instance count outside 1..=4.
    BadInstanceCount(usize),
    /// The probe for one instance rejected the ROM.
    ProbeFailed { instance: usize },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRom => write!(f, "empty ROM image"),
            Self::BadInstanceCount(count) => {
                write!(f, "instance count {count} outside 1..=4")
            }
            Self::ProbeFailed { instance } => {
                write!(f, "no platform claimed the ROM (instance {instance})")
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Why a serialize/deserialize call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// The caller-supplied buffer is not exactly the aggregate state size.
    SizeMismatch {
        /// Required size: instance count x per-instance state size.
        expected: usize,
        /// What the caller supplied.
        actual: usize,
    },
    /// No session is loaded.
    NotLoaded,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "state blob is {actual} bytes (expected exactly {expected})")
            }
            Self::NotLoaded => write!(f, "no session loaded"),
        }
    }
}

impl std::error::Error for StateError {}
