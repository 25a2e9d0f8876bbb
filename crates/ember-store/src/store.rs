//! The shared store handle and primitive constructors.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use ember_core::{CellRef, Kind, VarFloat, VarInt};

use crate::arena::Arena;
use crate::cell::{Body, Children};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::var::Var;

/// Handle to a cell arena.
///
/// Cloning is cheap and yields another handle to the same arena. The
/// store is single-threaded: it is neither `Send` nor `Sync`, and every
/// method completes without yielding.
#[derive(Clone)]
pub struct Store {
    inner: Rc<RefCell<Arena>>,
}

/// Snapshot of arena occupancy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageReport {
    /// Cells in use, including string continuations and flat-data blocks.
    pub used: usize,
    /// Total cells in the arena.
    pub total: usize,
    /// Live cells per kind, in the order kinds first appear in the arena.
    pub by_kind: IndexMap<Kind, usize>,
}

impl Store {
    /// Build a store with the given configuration.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        Ok(Self {
            inner: Rc::new(RefCell::new(Arena::new(&config)?)),
        })
    }

    /// Build a store of `cell_count` cells with default settings otherwise.
    pub fn with_cells(cell_count: u16) -> Result<Self, StoreError> {
        Self::new(StoreConfig::new(cell_count))
    }

    // Borrows must never be held across the creation or drop of a `Var`:
    // both touch the arena.
    pub(crate) fn arena(&self) -> Ref<'_, Arena> {
        self.inner.borrow()
    }

    pub(crate) fn arena_mut(&self) -> RefMut<'_, Arena> {
        self.inner.borrow_mut()
    }

    /// Whether two handles point at the same arena.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Take a new lock on a cell already known to be live.
    pub(crate) fn lock(&self, cell: CellRef) -> Var {
        self.arena_mut().lock(cell);
        Var::adopt(self.clone(), cell)
    }

    /// Lock `cell` if it is in range and in use.
    ///
    /// Returns `None` for references past the end of the arena, for freed
    /// cells and for the data blocks of a flat string.
    pub fn try_lock(&self, cell: CellRef) -> Option<Var> {
        if !self.arena().is_lockable(cell) {
            tracing::debug!(%cell, "refusing to lock dead cell");
            return None;
        }
        Some(self.lock(cell))
    }

    pub(crate) fn alloc(&self, body: Body) -> Result<Var, StoreError> {
        let cell = self.arena_mut().alloc(body);
        match cell {
            Ok(cell) => Ok(Var::adopt(self.clone(), cell)),
            Err(e) => {
                tracing::warn!(error = %e, "unable to allocate cell");
                Err(e)
            }
        }
    }

    // ── Primitive constructors ──────────────────────────────────

    /// A new integer.
    pub fn new_int(&self, v: VarInt) -> Result<Var, StoreError> {
        self.alloc(Body::Integer(v))
    }

    /// An integer when `v` fits 32 bits, otherwise a float.
    pub fn new_long(&self, v: i64) -> Result<Var, StoreError> {
        match VarInt::try_from(v) {
            Ok(i) => self.new_int(i),
            Err(_) => self.new_float(v as VarFloat),
        }
    }

    /// A new float.
    pub fn new_float(&self, v: VarFloat) -> Result<Var, StoreError> {
        self.alloc(Body::Float(v))
    }

    /// A new boolean.
    pub fn new_bool(&self, v: bool) -> Result<Var, StoreError> {
        self.alloc(Body::Boolean(v))
    }

    /// A new `null`.
    pub fn new_null(&self) -> Result<Var, StoreError> {
        self.alloc(Body::Null)
    }

    /// A new empty object.
    pub fn new_object(&self) -> Result<Var, StoreError> {
        self.alloc(Body::Object(Children::default()))
    }

    /// A new empty array.
    pub fn new_array(&self) -> Result<Var, StoreError> {
        self.alloc(Body::Array {
            children: Children::default(),
            length: 0,
        })
    }

    /// A new function cell with no children.
    pub fn new_function(&self) -> Result<Var, StoreError> {
        self.alloc(Body::Function(Children::default()))
    }

    /// A new root scope.
    pub fn new_root(&self) -> Result<Var, StoreError> {
        self.alloc(Body::Root(Children::default()))
    }

    /// A pointer to native code and its packed argument signature.
    ///
    /// The store only records the pair; calling it is someone else's job.
    pub fn new_native(&self, ptr: usize, signature: u16) -> Result<Var, StoreError> {
        self.alloc(Body::Native { ptr, signature })
    }

    // ── Statistics ──────────────────────────────────────────────

    /// Cells currently in use.
    pub fn usage(&self) -> usize {
        self.arena().used()
    }

    /// Total cells in the arena.
    pub fn total(&self) -> usize {
        self.arena().total()
    }

    /// Whether no single cell can be allocated.
    pub fn is_full(&self) -> bool {
        self.arena().is_full()
    }

    /// Occupancy broken down by kind.
    pub fn usage_report(&self) -> UsageReport {
        let arena = self.arena();
        UsageReport {
            used: arena.used(),
            total: arena.total(),
            by_kind: arena.usage_by_kind(),
        }
    }

    /// Emit one `debug` event per live cell.
    pub fn trace_allocated(&self) {
        let arena = self.arena();
        for (cell, c) in arena.live_cells() {
            tracing::debug!(
                %cell,
                kind = ?c.body.kind(),
                locks = c.locks,
                refs = c.refs,
                "allocated"
            );
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(arena) => f
                .debug_struct("Store")
                .field("used", &arena.used())
                .field("total", &arena.total())
                .finish(),
            Err(_) => f.write_str("Store { <borrowed> }"),
        }
    }
}
