//! Ember: fixed-arena variable memory and iterators for a small embedded
//! script runtime.
//!
//! This is the facade crate that re-exports the public API of the Ember
//! sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use ember::prelude::*;
//!
//! let store = Store::new(StoreConfig::new(64)).unwrap();
//!
//! // [1, 2] followed by "AB" repeated twice.
//! let list = store.new_array().unwrap();
//! list.array_push(&store.new_int(1).unwrap()).unwrap();
//! list.array_push(&store.new_int(2).unwrap()).unwrap();
//! let rep = store.new_object().unwrap();
//! rep.object_set("data", &store.new_str("AB").unwrap()).unwrap();
//! rep.object_set("count", &store.new_int(2).unwrap()).unwrap();
//! list.array_push(&rep).unwrap();
//!
//! let mut out = Vec::new();
//! Walker::default().iterate_callback(&list, &mut |v| out.push(v)).unwrap();
//! assert_eq!(out, vec![1, 2, 65, 66, 65, 66]);
//!
//! // Pack a string's character codes into a typed array.
//! let text = store.new_str("hi").unwrap();
//! let packed = ember::iter::ops::typed_array_from(&store, ElementType::UInt8, &text).unwrap();
//! assert_eq!(packed.array_buffer_len().unwrap(), 2);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `ember-core` | Cell references, kinds, element types |
//! | [`store`] | `ember-store` | The cell arena, `Var` handles, strings, composites, buffers |
//! | [`iter`] | `ember-iter` | String, buffer, object and unified iterators; the walker |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Identifiers, value kinds and array-buffer element types (`ember-core`).
pub use ember_core as types;

/// The cell arena and everything allocated in it (`ember-store`).
///
/// [`store::Store`] owns the cells; [`store::Var`] is a locked handle to
/// one of them.
pub use ember_store as store;

/// Iterators and the value walker (`ember-iter`).
///
/// [`iter::VarIter`] picks the right cursor for any iterable value;
/// [`iter::Walker`] flattens values into integers.
pub use ember_iter as iter;

/// Common imports for typical Ember usage.
///
/// ```rust
/// use ember::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use ember_core::{CellRef, ElementType, Kind, VarFloat, VarInt};

    // Store
    pub use ember_store::{Key, Store, StoreConfig, StoreError, Var};

    // Iteration
    pub use ember_iter::{
        ArrayBufferIter, IterError, ObjectIter, StringIter, VarIter, WalkError, Walker,
    };
}
