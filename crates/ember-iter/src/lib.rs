//! Iterators and the value walker for the Ember cell store.
//!
//! Every iterator holds [`Var`](ember_store::Var) locks on the cells it is
//! positioned on, so the cells it reads stay live while it exists and are
//! released when it moves on or is dropped. Clones are independent
//! cursors with their own locks.
//!
//! # Architecture
//!
//! ```text
//! VarIter (dispatch on kind)
//! ├── ObjectIter       child names of composites
//! ├── StringIter       bytes across chained fragments or a flat run
//! └── ArrayBufferIter  typed elements, decoded through a StringIter
//!
//! Walker   numbers / {data, count} / strings / iterables → integers
//! ops      indexed buffer access, formatted append, typed-array building
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arraybuffer;
pub mod error;
pub mod object;
pub mod ops;
pub mod string;
pub mod unified;
pub mod walk;

pub use arraybuffer::ArrayBufferIter;
pub use error::{IterError, WalkError};
pub use object::ObjectIter;
pub use string::StringIter;
pub use unified::VarIter;
pub use walk::Walker;
