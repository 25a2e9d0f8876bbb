//! Strongly-typed cell references.

use std::fmt;
use std::num::NonZeroU16;

/// Reference to a cell in the store.
///
/// Cells are numbered from 1; zero is reserved so that `Option<CellRef>`
/// stays two bytes wide and "no cell" needs no separate flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef(NonZeroU16);

impl CellRef {
    /// Build a reference from its 1-based number. Returns `None` for zero.
    pub fn new(n: u16) -> Option<Self> {
        NonZeroU16::new(n).map(Self)
    }

    /// Build a reference from a 0-based slot index.
    ///
    /// Returns `None` if the index does not fit a 16-bit reference.
    pub fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index + 1).ok().and_then(Self::new)
    }

    /// The 0-based slot index of this cell.
    pub fn index(self) -> usize {
        usize::from(self.0.get()) - 1
    }

    /// The raw 1-based reference number.
    pub fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<NonZeroU16> for CellRef {
    fn from(v: NonZeroU16) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_cell() {
        assert!(CellRef::new(0).is_none());
    }

    #[test]
    fn index_is_one_below_number() {
        let r = CellRef::new(5).unwrap();
        assert_eq!(r.index(), 4);
        assert_eq!(CellRef::from_index(4), Some(r));
    }

    #[test]
    fn from_index_rejects_overflow() {
        assert!(CellRef::from_index(usize::from(u16::MAX)).is_none());
        assert!(CellRef::from_index(usize::from(u16::MAX) - 1).is_some());
    }

    #[test]
    fn option_stays_two_bytes() {
        assert_eq!(std::mem::size_of::<Option<CellRef>>(), 2);
    }

    #[test]
    fn display_has_hash_prefix() {
        assert_eq!(CellRef::new(12).unwrap().to_string(), "#12");
    }
}
