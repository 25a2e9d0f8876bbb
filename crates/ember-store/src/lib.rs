//! Fixed-arena, reference-counted cell store for the Ember runtime.
//!
//! Every runtime value lives in one fixed-size cell of a preallocated
//! slab. Cells are addressed by 16-bit [`CellRef`]s and reclaimed
//! deterministically when their lock and reference counts both reach zero.
//!
//! # Architecture
//!
//! ```text
//! Store (Rc<RefCell<Arena>>, cheap to clone)
//! ├── Arena
//! │   ├── Cell[] (counters + sibling links + Body)
//! │   └── free list threaded through unused cells
//! ├── Var (scoped lock: Clone locks again, Drop unlocks)
//! ├── string     chained fragments + flat runs
//! ├── composite  name cells linked as children of objects/arrays
//! └── arraybuffer typed views over backing strings
//! ```
//!
//! # Locks versus references
//!
//! A *lock* is held by code that is currently using a cell; a [`Var`] is
//! one lock. A *reference* is held by another cell that owns it: a parent
//! composite owns its names, a name owns its value, an array buffer owns
//! its backing string. String continuation cells and flat-string data
//! blocks are never referenced; they belong to the string that links them.
//!
//! Allocation failure is always recoverable: constructors return
//! [`StoreError::OutOfMemory`] and appends report truncation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod arena;
pub mod arraybuffer;
pub mod cell;
pub mod composite;
pub mod config;
pub mod error;
pub mod store;
pub mod string;
pub mod var;

pub use arraybuffer::ArrayBufferView;
pub use composite::Key;
pub use config::StoreConfig;
pub use error::StoreError;
pub use store::{Store, UsageReport};
pub use string::{FragmentInfo, StringLayout};
pub use var::Var;

pub use ember_core::{CellRef, ElementType, Kind, VarFloat, VarInt};
