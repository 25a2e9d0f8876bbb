//! Core types for the Ember cell store.
//!
//! This crate defines the vocabulary shared by every other Ember crate:
//! cell references, the public kind tag of a cell, and the array-buffer
//! element encoding. It contains no allocation logic.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod id;
pub mod kind;

pub use element::ElementType;
pub use id::CellRef;
pub use kind::Kind;

/// Integer payload of a numeric cell.
pub type VarInt = i32;

/// Floating-point payload of a numeric cell.
pub type VarFloat = f64;
