//! String storage: chained fragments and flat runs.
//!
//! A chained string is a head cell with [`STRING_HEAD_LEN`] inline bytes
//! followed by continuation cells of [`STRING_EXT_LEN`] bytes each. A flat
//! string is one header cell holding the byte length followed by
//! contiguous data blocks of [`FLAT_BLOCK_LEN`] bytes, addressed by
//! arithmetic. Flat strings never change length.
//!
//! The fragment-level accessors at the bottom of this file exist for
//! cursors that walk a string one cell at a time.
//!
//! [`STRING_HEAD_LEN`]: crate::cell::STRING_HEAD_LEN
//! [`STRING_EXT_LEN`]: crate::cell::STRING_EXT_LEN

use ember_core::{CellRef, Kind};

use crate::arena::Arena;
use crate::cell::{Body, Fragment, FLAT_BLOCK_LEN};
use crate::error::StoreError;
use crate::store::Store;
use crate::var::Var;

/// How a string's bytes are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringLayout {
    /// Linked fragments.
    Chain,
    /// One contiguous run.
    Flat {
        /// Length in bytes.
        byte_len: usize,
    },
}

/// Shape of one string fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentInfo {
    /// Bytes stored in this fragment.
    pub len: usize,
    /// Bytes this fragment can hold.
    pub capacity: usize,
    /// The continuation fragment, if any.
    pub next: Option<CellRef>,
}

/// Read every byte of a string cell, or `None` if it is not a string.
pub(crate) fn read_string(arena: &Arena, head: CellRef) -> Option<Vec<u8>> {
    match arena.body(head) {
        Body::FlatStr { byte_len } => {
            let len = *byte_len as usize;
            let mut out = Vec::with_capacity(len);
            let mut block = head;
            while out.len() < len {
                block = CellRef::from_index(block.index() + 1)?;
                if let Body::FlatData(data) = arena.body(block) {
                    let n = (len - out.len()).min(FLAT_BLOCK_LEN);
                    out.extend_from_slice(&data[..n]);
                }
            }
            Some(out)
        }
        Body::Str(_) => {
            let mut out = Vec::new();
            let mut cur = Some(head);
            while let Some(r) = cur {
                let frag = arena.body(r).fragment()?;
                out.extend_from_slice(&frag.bytes[..usize::from(frag.len)]);
                cur = frag.next;
            }
            Some(out)
        }
        _ => None,
    }
}

/// Locate flat-string byte `idx`: the data block and the offset within it.
fn flat_slot(arena: &Arena, header: CellRef, idx: usize) -> Option<(CellRef, usize)> {
    match arena.body(header) {
        Body::FlatStr { byte_len } if idx < *byte_len as usize => {
            let block = CellRef::from_index(header.index() + 1 + idx / FLAT_BLOCK_LEN)?;
            Some((block, idx % FLAT_BLOCK_LEN))
        }
        _ => None,
    }
}

impl Store {
    /// A new chained string holding `s`.
    ///
    /// If the arena fills up part-way the string is truncated and a
    /// warning is logged; only failure to allocate the head is an error.
    pub fn new_str(&self, s: &str) -> Result<Var, StoreError> {
        self.new_bytes(s.as_bytes())
    }

    /// A new chained string holding `bytes`. Truncates like [`Store::new_str`].
    pub fn new_bytes(&self, bytes: &[u8]) -> Result<Var, StoreError> {
        let head = self.new_empty_string()?;
        if !head.append_bytes(bytes)? {
            tracing::warn!(wanted = bytes.len(), "truncating string as not enough memory");
        }
        Ok(head)
    }

    /// A new empty chained string.
    pub fn new_empty_string(&self) -> Result<Var, StoreError> {
        self.alloc(Body::Str(Fragment::empty()))
    }

    /// A chained string of `byte_len` zero bytes. Truncates like
    /// [`Store::new_str`].
    pub fn new_string_of_length(&self, byte_len: usize) -> Result<Var, StoreError> {
        self.new_bytes(&vec![0; byte_len])
    }

    /// A zero-filled flat string of `byte_len` bytes.
    ///
    /// Needs a contiguous run of free cells; fails with
    /// [`StoreError::OutOfMemory`] when none is long enough even if the
    /// arena has enough free cells in total.
    pub fn new_flat_string(&self, byte_len: usize) -> Result<Var, StoreError> {
        let len = u32::try_from(byte_len).map_err(|_| StoreError::OutOfMemory {
            requested: byte_len,
            free: self.total() - self.usage(),
        })?;
        let header = self.arena_mut().alloc_flat(len);
        match header {
            Ok(cell) => Ok(Var::adopt(self.clone(), cell)),
            Err(e) => {
                tracing::debug!(error = %e, "no contiguous run for flat string");
                Err(e)
            }
        }
    }

    /// A flat string holding `bytes`.
    pub fn new_flat_from_bytes(&self, bytes: &[u8]) -> Result<Var, StoreError> {
        let flat = self.new_flat_string(bytes.len())?;
        for (i, b) in bytes.iter().enumerate() {
            flat.set_flat_byte(i, *b);
        }
        Ok(flat)
    }

    /// A new chained string copied from `len` bytes of `src` starting at
    /// `start`. The range is clamped to the source.
    pub fn new_substring(&self, src: &Var, start: usize, len: usize) -> Result<Var, StoreError> {
        let bytes = src.to_bytes()?;
        let from = start.min(bytes.len());
        let to = from.saturating_add(len).min(bytes.len());
        self.new_bytes(&bytes[from..to])
    }
}

impl Var {
    /// Layout of this string, or `None` for non-strings.
    pub fn string_layout(&self) -> Option<StringLayout> {
        match self.store().arena().body(self.cell()) {
            Body::Str(_) => Some(StringLayout::Chain),
            Body::FlatStr { byte_len } => Some(StringLayout::Flat {
                byte_len: *byte_len as usize,
            }),
            _ => None,
        }
    }

    /// Length of this string in bytes.
    pub fn string_len(&self) -> Result<usize, StoreError> {
        let len = {
            let arena = self.store().arena();
            match arena.body(self.cell()) {
                Body::FlatStr { byte_len } => Some(*byte_len as usize),
                Body::Str(_) => {
                    let mut total = 0;
                    let mut cur = Some(self.cell());
                    while let Some(f) = cur.and_then(|r| arena.body(r).fragment()) {
                        total += usize::from(f.len);
                        cur = f.next;
                    }
                    Some(total)
                }
                _ => None,
            }
        };
        len.ok_or_else(|| self.wrong_kind("string"))
    }

    /// Every byte of this string.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let bytes = read_string(&self.store().arena(), self.cell());
        bytes.ok_or_else(|| self.wrong_kind("string"))
    }

    /// This string as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Result<String, StoreError> {
        Ok(String::from_utf8_lossy(&self.to_bytes()?).into_owned())
    }

    /// Whether this is a string equal to `bytes`.
    pub fn eq_bytes(&self, bytes: &[u8]) -> bool {
        read_string(&self.store().arena(), self.cell()).is_some_and(|b| b == bytes)
    }

    /// Whether two strings hold the same bytes, whatever their layout.
    pub fn string_eq(&self, other: &Var) -> bool {
        let arena = self.store().arena();
        let a = read_string(&arena, self.cell());
        drop(arena);
        let arena = other.store().arena();
        let b = read_string(&arena, other.cell());
        matches!((a, b), (Some(a), Some(b)) if a == b)
    }

    /// Byte at `idx`, `None` past the end.
    pub fn char_at(&self, idx: usize) -> Result<Option<u8>, StoreError> {
        Ok(self.to_bytes()?.get(idx).copied())
    }

    /// Index of the first occurrence of `ch`.
    pub fn index_of(&self, ch: u8) -> Result<Option<usize>, StoreError> {
        Ok(self.to_bytes()?.iter().position(|&b| b == ch))
    }

    /// Append bytes to a chained string.
    ///
    /// Returns `Ok(false)` if the arena filled up and the string was
    /// truncated; what fit is kept. Flat strings are fixed-length and
    /// rejected with [`StoreError::WrongKind`].
    pub fn append_bytes(&self, bytes: &[u8]) -> Result<bool, StoreError> {
        if self.kind() != Kind::String {
            return Err(self.wrong_kind("chained string"));
        }
        let mut arena = self.store().arena_mut();
        let mut cur = self.cell();
        while let Some(next) = arena.body(cur).fragment().and_then(|f| f.next) {
            cur = next;
        }
        let mut rest = bytes;
        loop {
            let cap = arena.body(cur).fragment_capacity();
            let Some(frag) = arena.body_mut(cur).fragment_mut() else {
                break;
            };
            let len = usize::from(frag.len);
            let n = (cap - len).min(rest.len());
            frag.bytes[len..len + n].copy_from_slice(&rest[..n]);
            frag.len += n as u8;
            rest = &rest[n..];
            if rest.is_empty() {
                break;
            }
            match arena.alloc_owned(Body::StrExt(Fragment::empty())) {
                Ok(ext) => {
                    if let Some(frag) = arena.body_mut(cur).fragment_mut() {
                        frag.next = Some(ext);
                    }
                    cur = ext;
                }
                Err(_) => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Append a UTF-8 string. See [`Var::append_bytes`].
    pub fn append_str(&self, s: &str) -> Result<bool, StoreError> {
        self.append_bytes(s.as_bytes())
    }

    // ── Fragment access ─────────────────────────────────────────

    /// Shape of this fragment, or `None` if the cell is not a chained
    /// string fragment.
    pub fn fragment(&self) -> Option<FragmentInfo> {
        let arena = self.store().arena();
        let body = arena.body(self.cell());
        body.fragment().map(|f| FragmentInfo {
            len: usize::from(f.len),
            capacity: body.fragment_capacity(),
            next: f.next,
        })
    }

    /// Byte `idx` of this fragment, 0 when out of range.
    pub fn fragment_byte(&self, idx: usize) -> u8 {
        let arena = self.store().arena();
        arena
            .body(self.cell())
            .fragment()
            .filter(|f| idx < usize::from(f.len))
            .map_or(0, |f| f.bytes[idx])
    }

    /// Overwrite an existing byte of this fragment. Never extends it.
    pub fn set_fragment_byte(&self, idx: usize, b: u8) -> bool {
        let mut arena = self.store().arena_mut();
        match arena.body_mut(self.cell()).fragment_mut() {
            Some(f) if idx < usize::from(f.len) => {
                f.bytes[idx] = b;
                true
            }
            _ => false,
        }
    }

    /// Store `b` at `idx` and make it the fragment's last byte.
    ///
    /// Fails when `idx` is beyond the fragment's capacity.
    pub fn put_fragment_byte(&self, idx: usize, b: u8) -> bool {
        let mut arena = self.store().arena_mut();
        let cap = arena.body(self.cell()).fragment_capacity();
        match arena.body_mut(self.cell()).fragment_mut() {
            Some(f) if idx < cap => {
                f.bytes[idx] = b;
                f.len = (idx + 1) as u8;
                true
            }
            _ => false,
        }
    }

    /// Lock the continuation fragment.
    pub fn next_fragment(&self) -> Option<Var> {
        let next = self.fragment()?.next;
        next.map(|r| self.store().lock(r))
    }

    /// Allocate an empty continuation after this, the last fragment, and
    /// return it locked.
    pub fn extend_fragment(&self) -> Result<Var, StoreError> {
        match self.fragment() {
            Some(FragmentInfo { next: None, .. }) => {}
            _ => return Err(self.wrong_kind("last string fragment")),
        }
        let ext = self
            .store()
            .arena_mut()
            .alloc_owned(Body::StrExt(Fragment::empty()));
        match ext {
            Ok(ext) => {
                if let Some(f) = self.store().arena_mut().body_mut(self.cell()).fragment_mut() {
                    f.next = Some(ext);
                }
                Ok(self.store().lock(ext))
            }
            Err(e) => {
                tracing::warn!(error = %e, "unable to extend string");
                Err(e)
            }
        }
    }

    /// Byte `idx` of a flat string, 0 when out of range.
    pub fn flat_byte(&self, idx: usize) -> u8 {
        let arena = self.store().arena();
        match flat_slot(&arena, self.cell(), idx) {
            Some((block, off)) => match arena.body(block) {
                Body::FlatData(data) => data[off],
                _ => 0,
            },
            None => 0,
        }
    }

    /// Overwrite byte `idx` of a flat string.
    pub fn set_flat_byte(&self, idx: usize, b: u8) -> bool {
        let mut arena = self.store().arena_mut();
        let Some((block, off)) = flat_slot(&arena, self.cell(), idx) else {
            return false;
        };
        match arena.body_mut(block) {
            Body::FlatData(data) => {
                data[off] = b;
                true
            }
            _ => false,
        }
    }
}
