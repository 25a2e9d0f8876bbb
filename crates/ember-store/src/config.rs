//! Store configuration parameters.

use crate::error::StoreError;

/// Configuration for a cell store.
///
/// The store is a single preallocated slab; its size is fixed for the
/// store's lifetime.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Number of cells in the arena.
    ///
    /// Default: 256. Must be between 1 and [`StoreConfig::MAX_CELL_COUNT`]
    /// because cell references are 16-bit and zero is reserved.
    pub cell_count: u16,
}

impl StoreConfig {
    /// Default arena size in cells.
    pub const DEFAULT_CELL_COUNT: u16 = 256;

    /// Largest arena a 16-bit reference can address.
    pub const MAX_CELL_COUNT: u16 = u16::MAX;

    /// Create a config for an arena of `cell_count` cells.
    pub fn new(cell_count: u16) -> Self {
        Self { cell_count }
    }

    /// Check the config before building a store from it.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.cell_count == 0 {
            return Err(StoreError::InvalidConfig {
                reason: "cell_count must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CELL_COUNT)
    }
}
