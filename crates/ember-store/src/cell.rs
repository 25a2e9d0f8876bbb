//! Cell layout.
//!
//! Every cell has the same shape: bookkeeping counters, two sibling links
//! and a [`Body`] sized to the largest kind. The body is a closed sum type,
//! so kind checks are exhaustive matches rather than flag arithmetic.

use ember_core::{CellRef, Kind, VarFloat, VarInt};

use crate::arraybuffer::ArrayBufferView;

/// Inline bytes in the head cell of a chained string.
pub const STRING_HEAD_LEN: usize = 8;

/// Inline bytes in a string continuation cell.
///
/// Continuation cells carry no header payload, so they hold more.
pub const STRING_EXT_LEN: usize = 12;

/// Bytes of flat-string data stored in each block after the header.
pub const FLAT_BLOCK_LEN: usize = 16;

/// Number of data blocks a flat string of `byte_len` bytes occupies.
pub fn flat_blocks(byte_len: usize) -> usize {
    byte_len.div_ceil(FLAT_BLOCK_LEN)
}

/// One fragment of a chained string.
#[derive(Clone, Debug)]
pub(crate) struct Fragment {
    pub(crate) bytes: [u8; STRING_EXT_LEN],
    pub(crate) len: u8,
    /// Continuation cell. Reuses the composite "last child" slot.
    pub(crate) next: Option<CellRef>,
}

impl Fragment {
    pub(crate) fn empty() -> Self {
        Self {
            bytes: [0; STRING_EXT_LEN],
            len: 0,
            next: None,
        }
    }
}

/// First and last child of a composite.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Children {
    pub(crate) first: Option<CellRef>,
    pub(crate) last: Option<CellRef>,
}

/// Key of a name cell.
#[derive(Clone, Copy, Debug)]
pub(crate) enum KeyRef {
    Int(VarInt),
    /// A referenced string cell.
    Str(CellRef),
}

#[derive(Clone, Debug)]
pub(crate) enum Body {
    Unused {
        next_free: Option<CellRef>,
    },
    Root(Children),
    Object(Children),
    Function(Children),
    Array {
        children: Children,
        length: u32,
    },
    ArrayBuffer {
        /// Referenced string, or another array buffer for views.
        backing: CellRef,
        view: ArrayBufferView,
    },
    Integer(VarInt),
    Float(VarFloat),
    Boolean(bool),
    Null,
    Str(Fragment),
    StrExt(Fragment),
    FlatStr {
        byte_len: u32,
    },
    FlatData([u8; FLAT_BLOCK_LEN]),
    Name {
        key: KeyRef,
        value: Option<CellRef>,
    },
    Native {
        ptr: usize,
        signature: u16,
    },
}

impl Body {
    pub(crate) fn kind(&self) -> Option<Kind> {
        Some(match self {
            Self::Unused { .. } => return None,
            Self::Root(_) => Kind::Root,
            Self::Object(_) => Kind::Object,
            Self::Function(_) => Kind::Function,
            Self::Array { .. } => Kind::Array,
            Self::ArrayBuffer { .. } => Kind::ArrayBuffer,
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::Boolean(_) => Kind::Boolean,
            Self::Null => Kind::Null,
            Self::Str(_) => Kind::String,
            Self::StrExt(_) => Kind::StringExt,
            Self::FlatStr { .. } => Kind::FlatString,
            Self::FlatData(_) => Kind::FlatData,
            Self::Name { .. } => Kind::Name,
            Self::Native { .. } => Kind::NativeFunction,
        })
    }

    pub(crate) fn children(&self) -> Option<&Children> {
        match self {
            Self::Root(c) | Self::Object(c) | Self::Function(c) => Some(c),
            Self::Array { children, .. } => Some(children),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            Self::Root(c) | Self::Object(c) | Self::Function(c) => Some(c),
            Self::Array { children, .. } => Some(children),
            _ => None,
        }
    }

    pub(crate) fn fragment(&self) -> Option<&Fragment> {
        match self {
            Self::Str(f) | Self::StrExt(f) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn fragment_mut(&mut self) -> Option<&mut Fragment> {
        match self {
            Self::Str(f) | Self::StrExt(f) => Some(f),
            _ => None,
        }
    }

    /// Inline capacity of a string fragment, zero for anything else.
    pub(crate) fn fragment_capacity(&self) -> usize {
        match self {
            Self::Str(_) => STRING_HEAD_LEN,
            Self::StrExt(_) => STRING_EXT_LEN,
            _ => 0,
        }
    }
}

/// A single arena slot.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Scoped handles currently held on this cell.
    pub(crate) locks: u32,
    /// Owners: parents, names and array buffers pointing here.
    pub(crate) refs: u16,
    /// A continuation fragment whose string was freed while it was locked.
    pub(crate) orphan: bool,
    pub(crate) next_sibling: Option<CellRef>,
    pub(crate) prev_sibling: Option<CellRef>,
    pub(crate) body: Body,
}

impl Cell {
    pub(crate) fn unused(next_free: Option<CellRef>) -> Self {
        Self::with(Body::Unused { next_free }, 0)
    }

    /// A freshly allocated cell carrying the caller's lock.
    pub(crate) fn live(body: Body) -> Self {
        Self::with(body, 1)
    }

    /// A cell owned by another cell's storage: no lock, no references.
    pub(crate) fn owned(body: Body) -> Self {
        Self::with(body, 0)
    }

    fn with(body: Body, locks: u32) -> Self {
        Self {
            locks,
            refs: 0,
            orphan: false,
            next_sibling: None,
            prev_sibling: None,
            body,
        }
    }

    pub(crate) fn is_unused(&self) -> bool {
        matches!(self.body, Body::Unused { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_stay_compact() {
        assert!(std::mem::size_of::<Cell>() <= 48);
    }

    #[test]
    fn flat_block_count_rounds_up() {
        assert_eq!(flat_blocks(0), 0);
        assert_eq!(flat_blocks(1), 1);
        assert_eq!(flat_blocks(FLAT_BLOCK_LEN), 1);
        assert_eq!(flat_blocks(FLAT_BLOCK_LEN + 1), 2);
    }

    #[test]
    fn head_holds_fewer_bytes_than_ext() {
        assert_eq!(Body::Str(Fragment::empty()).fragment_capacity(), STRING_HEAD_LEN);
        assert_eq!(Body::StrExt(Fragment::empty()).fragment_capacity(), STRING_EXT_LEN);
        assert_eq!(Body::Null.fragment_capacity(), 0);
    }
}
