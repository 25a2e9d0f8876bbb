//! Store-specific error types.

use std::error::Error;
use std::fmt;

use ember_core::{CellRef, Kind};

/// Errors that can occur during store operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The arena has no room for the requested cells.
    OutOfMemory {
        /// Number of cells the operation needed.
        requested: usize,
        /// Number of free cells at the time of the request.
        free: usize,
    },
    /// An operation was applied to a cell of the wrong kind.
    WrongKind {
        /// The offending cell.
        cell: CellRef,
        /// What the operation accepts.
        expected: &'static str,
        /// What the cell actually holds.
        found: Kind,
    },
    /// The store configuration is unusable.
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: &'static str,
    },
    /// A typed view does not fit inside its backing buffer.
    InvalidView {
        /// Requested byte offset into the buffer.
        byte_offset: usize,
        /// Requested element count.
        length: usize,
        /// Element width in bytes.
        width: usize,
        /// Bytes available in the backing buffer.
        available: usize,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested, free } => {
                write!(f, "out of memory: requested {requested} cells, {free} free")
            }
            Self::WrongKind {
                cell,
                expected,
                found,
            } => {
                write!(f, "cell {cell} is {found}, expected {expected}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid store config: {reason}")
            }
            Self::InvalidView {
                byte_offset,
                length,
                width,
                available,
            } => {
                write!(
                    f,
                    "view of {length} x {width}-byte elements at offset {byte_offset} exceeds {available} bytes"
                )
            }
        }
    }
}

impl Error for StoreError {}
