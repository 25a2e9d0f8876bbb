//! Benchmark profiles for the Ember cell store and iterators.
//!
//! - [`reference_store`]: a 4K-cell store, the size of a small device heap
//! - [`reference_payload`]: a mixed value exercising every walker path
//! - [`text_of_len`]: deterministic printable text

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use ember_core::{ElementType, VarInt};
use ember_store::{Store, StoreError, Var};
use ember_test_utils::fixtures::{data_count, int_array, typed_array};

/// Cells in the reference store.
pub const REFERENCE_CELLS: u16 = 4096;

/// A store sized like a small device heap.
pub fn reference_store() -> Result<Store, StoreError> {
    Store::with_cells(REFERENCE_CELLS)
}

/// `len` bytes cycling through the printable ASCII range.
pub fn text_of_len(len: usize) -> Vec<u8> {
    (0..len).map(|i| b' ' + (i % 95) as u8).collect()
}

/// An array holding a 64-element int array, a 256-byte `Uint8Array`,
/// a 200-byte string and a `{data, count}` object repeating 16 ints 8
/// times: 1,752 integers when walked.
pub fn reference_payload(store: &Store) -> Result<Var, StoreError> {
    let ints: Vec<VarInt> = (0..64).collect();
    let bytes: Vec<VarInt> = (0..256).map(|i| i % 256).collect();
    let outer = store.new_array()?;
    outer.array_push(&int_array(store, &ints))?;
    outer.array_push(&typed_array(store, ElementType::UInt8, &bytes))?;
    outer.array_push(&store.new_bytes(&text_of_len(200))?)?;
    let rep = data_count(store, &int_array(store, &ints[..16]), 8);
    outer.array_push(&rep)?;
    Ok(outer)
}

/// Integers [`reference_payload`] expands to.
pub const REFERENCE_PAYLOAD_LEN: usize = 64 + 256 + 200 + 16 * 8;
