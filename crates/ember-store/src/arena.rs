//! The fixed cell arena: free list, locks, references and reclamation.
//!
//! A cell is reclaimed the moment both its lock count and its reference
//! count reach zero. Reclamation walks owned cells with an explicit
//! worklist, so arbitrarily long string chains or child lists never
//! recurse.

use indexmap::IndexMap;
use smallvec::{smallvec, SmallVec};

use ember_core::{CellRef, Kind};

use crate::cell::{flat_blocks, Body, Cell, KeyRef};
use crate::config::StoreConfig;
use crate::error::StoreError;

pub(crate) struct Arena {
    cells: Vec<Cell>,
    free_head: Option<CellRef>,
    used: usize,
}

impl Arena {
    pub(crate) fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let cells = vec![Cell::unused(None); usize::from(config.cell_count)];
        let mut arena = Self {
            cells,
            free_head: None,
            used: 0,
        };
        arena.rebuild_free_list();
        Ok(arena)
    }

    /// Relink every unused cell in ascending order.
    fn rebuild_free_list(&mut self) {
        let mut next = None;
        for i in (0..self.cells.len()).rev() {
            if let Body::Unused { next_free } = &mut self.cells[i].body {
                *next_free = next;
                next = CellRef::from_index(i);
            }
        }
        self.free_head = next;
    }

    pub(crate) fn cell(&self, r: CellRef) -> &Cell {
        &self.cells[r.index()]
    }

    pub(crate) fn cell_mut(&mut self, r: CellRef) -> &mut Cell {
        &mut self.cells[r.index()]
    }

    pub(crate) fn body(&self, r: CellRef) -> &Body {
        &self.cells[r.index()].body
    }

    pub(crate) fn body_mut(&mut self, r: CellRef) -> &mut Body {
        &mut self.cells[r.index()].body
    }

    pub(crate) fn kind(&self, r: CellRef) -> Option<Kind> {
        self.body(r).kind()
    }

    // ── Allocation ──────────────────────────────────────────────

    /// Take one cell off the free list. The new cell holds one lock.
    pub(crate) fn alloc(&mut self, body: Body) -> Result<CellRef, StoreError> {
        let Some(cell) = self.free_head else {
            return Err(StoreError::OutOfMemory {
                requested: 1,
                free: 0,
            });
        };
        let slot = &mut self.cells[cell.index()];
        self.free_head = match slot.body {
            Body::Unused { next_free } => next_free,
            _ => None,
        };
        *slot = Cell::live(body);
        self.used += 1;
        tracing::trace!(%cell, "alloc");
        Ok(cell)
    }

    /// Allocate a continuation cell owned by a string; it carries no lock.
    pub(crate) fn alloc_owned(&mut self, body: Body) -> Result<CellRef, StoreError> {
        let cell = self.alloc(body)?;
        self.cells[cell.index()].locks = 0;
        Ok(cell)
    }

    /// Reserve a contiguous run for a flat string: one header cell holding
    /// the length, followed by zeroed data blocks.
    pub(crate) fn alloc_flat(&mut self, byte_len: u32) -> Result<CellRef, StoreError> {
        let needed = 1 + flat_blocks(byte_len as usize);
        let mut run = 0;
        let mut found = None;
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.is_unused() {
                run += 1;
                if run == needed {
                    found = Some(i + 1 - needed);
                    break;
                }
            } else {
                run = 0;
            }
        }
        let (Some(first), Some(header)) = (found, found.and_then(CellRef::from_index)) else {
            return Err(StoreError::OutOfMemory {
                requested: needed,
                free: self.free_count(),
            });
        };
        self.cells[first] = Cell::live(Body::FlatStr { byte_len });
        for slot in &mut self.cells[first + 1..first + needed] {
            *slot = Cell::owned(Body::FlatData([0; crate::cell::FLAT_BLOCK_LEN]));
        }
        self.used += needed;
        self.rebuild_free_list();
        tracing::trace!(cell = %header, blocks = needed - 1, "alloc flat");
        Ok(header)
    }

    // ── Locks and references ────────────────────────────────────

    /// Whether `r` is in range and names a cell a handle may lock.
    /// Flat data blocks belong to their header and are never locked alone.
    pub(crate) fn is_lockable(&self, r: CellRef) -> bool {
        self.cells
            .get(r.index())
            .is_some_and(|c| !c.is_unused() && !matches!(c.body, Body::FlatData(_)))
    }

    pub(crate) fn lock(&mut self, r: CellRef) {
        let cell = self.cell_mut(r);
        debug_assert!(!cell.is_unused(), "locking freed cell {r}");
        cell.locks += 1;
    }

    pub(crate) fn unlock(&mut self, r: CellRef) {
        let cell = self.cell_mut(r);
        debug_assert!(cell.locks > 0, "unbalanced unlock of {r}");
        cell.locks = cell.locks.saturating_sub(1);
        self.collect_if_dead(r);
    }

    pub(crate) fn add_ref(&mut self, r: CellRef) {
        let cell = self.cell_mut(r);
        debug_assert!(!cell.is_unused(), "referencing freed cell {r}");
        cell.refs = cell.refs.saturating_add(1);
    }

    pub(crate) fn release_ref(&mut self, r: CellRef) {
        let cell = self.cell_mut(r);
        debug_assert!(cell.refs > 0, "unbalanced unref of {r}");
        cell.refs = cell.refs.saturating_sub(1);
        self.collect_if_dead(r);
    }

    fn collect_if_dead(&mut self, r: CellRef) {
        let cell = self.cell(r);
        if cell.locks != 0 || cell.refs != 0 || cell.is_unused() {
            return;
        }
        let owned = cell.body.kind().is_some_and(Kind::is_owned_storage);
        if owned && !cell.orphan {
            return;
        }
        self.free(r);
    }

    // ── Reclamation ─────────────────────────────────────────────

    fn free(&mut self, start: CellRef) {
        let mut pending: SmallVec<[CellRef; 8]> = smallvec![start];
        while let Some(r) = pending.pop() {
            let slot = &mut self.cells[r.index()];
            if slot.is_unused() {
                continue;
            }
            let body = std::mem::replace(&mut slot.body, Body::Unused { next_free: None });
            slot.next_sibling = None;
            slot.prev_sibling = None;
            match body {
                Body::Root(c) | Body::Object(c) | Body::Function(c) | Body::Array { children: c, .. } => {
                    let mut child = c.first;
                    while let Some(ch) = child {
                        let cell = self.cell_mut(ch);
                        child = cell.next_sibling.take();
                        cell.prev_sibling = None;
                        self.drop_ref(ch, &mut pending);
                    }
                }
                Body::Name { key, value } => {
                    if let KeyRef::Str(k) = key {
                        self.drop_ref(k, &mut pending);
                    }
                    if let Some(v) = value {
                        self.drop_ref(v, &mut pending);
                    }
                }
                Body::Str(f) | Body::StrExt(f) => {
                    if let Some(ext) = f.next {
                        let cell = self.cell_mut(ext);
                        if cell.locks == 0 {
                            pending.push(ext);
                        } else {
                            cell.orphan = true;
                        }
                    }
                }
                Body::ArrayBuffer { backing, .. } => self.drop_ref(backing, &mut pending),
                Body::FlatStr { byte_len } => {
                    for i in 1..=flat_blocks(byte_len as usize) {
                        if let Some(block) = CellRef::from_index(r.index() + i) {
                            self.release_slot(block);
                        }
                    }
                }
                _ => {}
            }
            self.release_slot(r);
        }
    }

    fn drop_ref(&mut self, r: CellRef, pending: &mut SmallVec<[CellRef; 8]>) {
        let cell = self.cell_mut(r);
        cell.refs = cell.refs.saturating_sub(1);
        if cell.refs == 0 && cell.locks == 0 {
            pending.push(r);
        }
    }

    fn release_slot(&mut self, r: CellRef) {
        self.cells[r.index()] = Cell::unused(self.free_head);
        self.free_head = Some(r);
        self.used -= 1;
        tracing::trace!(cell = %r, "free");
    }

    // ── Statistics ──────────────────────────────────────────────

    pub(crate) fn used(&self) -> usize {
        self.used
    }

    pub(crate) fn total(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn free_count(&self) -> usize {
        self.cells.len() - self.used
    }

    pub(crate) fn is_full(&self) -> bool {
        self.free_head.is_none()
    }

    pub(crate) fn usage_by_kind(&self) -> IndexMap<Kind, usize> {
        let mut out = IndexMap::new();
        for kind in self.cells.iter().filter_map(|c| c.body.kind()) {
            *out.entry(kind).or_insert(0) += 1;
        }
        out
    }

    pub(crate) fn live_cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_unused())
            .filter_map(|(i, c)| CellRef::from_index(i).map(|r| (r, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Fragment;

    fn arena(n: u16) -> Arena {
        Arena::new(&StoreConfig::new(n)).unwrap()
    }

    #[test]
    fn fresh_arena_is_empty() {
        let a = arena(8);
        assert_eq!(a.used(), 0);
        assert_eq!(a.total(), 8);
        assert!(!a.is_full());
    }

    #[test]
    fn alloc_takes_lowest_cell_first() {
        let mut a = arena(4);
        let r = a.alloc(Body::Null).unwrap();
        assert_eq!(r.get(), 1);
        assert_eq!(a.cell(r).locks, 1);
    }

    #[test]
    fn exhaustion_is_an_error_not_a_panic() {
        let mut a = arena(2);
        a.alloc(Body::Null).unwrap();
        a.alloc(Body::Null).unwrap();
        assert!(a.is_full());
        assert_eq!(
            a.alloc(Body::Null),
            Err(StoreError::OutOfMemory {
                requested: 1,
                free: 0
            })
        );
    }

    #[test]
    fn unlock_to_zero_frees() {
        let mut a = arena(4);
        let r = a.alloc(Body::Integer(1)).unwrap();
        a.unlock(r);
        assert_eq!(a.used(), 0);
        assert!(a.cell(r).is_unused());
    }

    #[test]
    fn referenced_cell_survives_unlock() {
        let mut a = arena(4);
        let r = a.alloc(Body::Integer(1)).unwrap();
        a.add_ref(r);
        a.unlock(r);
        assert_eq!(a.used(), 1);
        a.release_ref(r);
        assert_eq!(a.used(), 0);
    }

    #[test]
    fn freeing_head_frees_whole_chain() {
        let mut a = arena(64);
        let head = a.alloc(Body::Str(Fragment::empty())).unwrap();
        let mut prev = head;
        for _ in 0..40 {
            let ext = a.alloc_owned(Body::StrExt(Fragment::empty())).unwrap();
            if let Some(f) = a.body_mut(prev).fragment_mut() {
                f.next = Some(ext);
            }
            prev = ext;
        }
        assert_eq!(a.used(), 41);
        a.unlock(head);
        assert_eq!(a.used(), 0);
    }

    #[test]
    fn locked_fragment_outlives_its_string() {
        let mut a = arena(8);
        let head = a.alloc(Body::Str(Fragment::empty())).unwrap();
        let ext = a.alloc_owned(Body::StrExt(Fragment::empty())).unwrap();
        if let Some(f) = a.body_mut(head).fragment_mut() {
            f.next = Some(ext);
        }
        a.lock(ext);
        a.unlock(head);
        assert_eq!(a.used(), 1);
        assert!(a.cell(ext).orphan);
        a.unlock(ext);
        assert_eq!(a.used(), 0);
    }

    #[test]
    fn unlocking_live_fragment_does_not_free_it() {
        let mut a = arena(8);
        let head = a.alloc(Body::Str(Fragment::empty())).unwrap();
        let ext = a.alloc_owned(Body::StrExt(Fragment::empty())).unwrap();
        if let Some(f) = a.body_mut(head).fragment_mut() {
            f.next = Some(ext);
        }
        a.lock(ext);
        a.unlock(ext);
        assert_eq!(a.used(), 2);
    }

    #[test]
    fn flat_run_is_contiguous_and_skips_holes() {
        let mut a = arena(8);
        let _x = a.alloc(Body::Null).unwrap();
        let hole = a.alloc(Body::Null).unwrap();
        let _y = a.alloc(Body::Null).unwrap();
        a.unlock(hole);
        // 20 bytes needs header + 2 blocks; the single hole at #2 is too small.
        let flat = a.alloc_flat(20).unwrap();
        assert_eq!(flat.get(), 4);
        assert_eq!(a.used(), 5);
        // The hole is still on the free list.
        assert_eq!(a.alloc(Body::Null).unwrap(), hole);
    }

    #[test]
    fn flat_release_returns_every_block() {
        let mut a = arena(8);
        let flat = a.alloc_flat(40).unwrap();
        assert_eq!(a.used(), 4);
        a.unlock(flat);
        assert_eq!(a.used(), 0);
        assert_eq!(a.free_count(), 8);
    }

    #[test]
    fn flat_without_room_fails() {
        let mut a = arena(2);
        assert!(matches!(
            a.alloc_flat(40),
            Err(StoreError::OutOfMemory { requested: 4, .. })
        ));
    }

    #[test]
    fn usage_by_kind_counts_live_cells() {
        let mut a = arena(8);
        a.alloc(Body::Integer(1)).unwrap();
        a.alloc(Body::Integer(2)).unwrap();
        a.alloc(Body::Null).unwrap();
        let usage = a.usage_by_kind();
        assert_eq!(usage.get(&Kind::Integer), Some(&2));
        assert_eq!(usage.get(&Kind::Null), Some(&1));
    }
}
