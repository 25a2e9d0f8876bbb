//! Test fixtures and accounting helpers for Ember development.
//!
//! Fixtures build common value shapes directly through the store so that
//! iterator tests do not depend on the iterators they exercise.
//! [`UsageBaseline`] checks that a block of code returned every cell it
//! allocated.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use ember_store::Store;

/// Records the store's usage so it can be compared later.
pub struct UsageBaseline {
    store: Store,
    used: usize,
}

impl UsageBaseline {
    pub fn capture(store: &Store) -> Self {
        Self {
            store: store.clone(),
            used: store.usage(),
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Cells allocated since the baseline was captured.
    pub fn leaked(&self) -> isize {
        self.store.usage() as isize - self.used as isize
    }

    /// Panic with a per-kind breakdown unless usage is back at baseline.
    pub fn assert_balanced(&self) {
        let leaked = self.leaked();
        if leaked != 0 {
            let report = self.store.usage_report();
            panic!(
                "usage moved by {leaked} cells (now {} of {}): {:?}",
                report.used, report.total, report.by_kind
            );
        }
    }
}

/// A store with `cells` cells, panicking on invalid sizes.
pub fn store(cells: u16) -> Store {
    Store::with_cells(cells).expect("test store size must be non-zero")
}
