//! Character cursor over chained and flat strings.
//!
//! The cursor holds a lock on the cell it is reading: the current fragment
//! of a chained string, or the header of a flat string. Crossing into the
//! next fragment locks it before releasing the previous one. Running off
//! the end releases the lock and leaves the cursor in the "at end" state
//! with no current cell.

use std::fmt;

use ember_store::{Store, StringLayout, Var};

use crate::error::IterError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Addressing {
    Chain,
    Flat,
}

/// A lazy, stateful cursor over a string's bytes.
///
/// Cloning duplicates the position with a fresh lock on the current cell;
/// dropping releases it.
#[derive(Clone, Debug)]
pub struct StringIter {
    var: Option<Var>,
    addressing: Addressing,
    /// Offset of the cursor within `var`.
    char_idx: usize,
    /// Bytes stored in `var`; for flat strings, the whole length.
    chars_in_var: usize,
    /// String index of the first byte of `var`.
    var_index: usize,
}

impl StringIter {
    /// Open a cursor on `string` positioned at byte `start`.
    ///
    /// Starting at or past the end leaves the cursor at end; it does not
    /// fail.
    pub fn new(string: &Var, start: usize) -> Result<Self, IterError> {
        let (addressing, chars_in_var) = match string.string_layout() {
            Some(StringLayout::Chain) => (
                Addressing::Chain,
                string.fragment().map_or(0, |f| f.len),
            ),
            Some(StringLayout::Flat { byte_len }) => (Addressing::Flat, byte_len),
            None => {
                return Err(IterError::WrongKind {
                    expected: "string",
                    found: string.kind(),
                })
            }
        };
        let mut it = Self {
            var: Some(string.clone()),
            addressing,
            char_idx: start,
            chars_in_var,
            var_index: 0,
        };
        while it.char_idx > 0 && it.char_idx >= it.chars_in_var {
            it.char_idx -= it.chars_in_var;
            it.var_index += it.chars_in_var;
            match it.following() {
                Some((next, len)) => {
                    it.var = Some(next);
                    it.chars_in_var = len;
                }
                None => {
                    it.var = None;
                    it.chars_in_var = 0;
                    it.var_index = start - it.char_idx;
                    break;
                }
            }
        }
        Ok(it)
    }

    /// Lock the fragment after the current one, with its length.
    fn following(&self) -> Option<(Var, usize)> {
        if self.addressing == Addressing::Flat {
            return None;
        }
        let next = self.var.as_ref()?.next_fragment()?;
        let len = next.fragment().map_or(0, |f| f.len);
        Some((next, len))
    }

    fn byte_at(var: &Var, addressing: Addressing, idx: usize) -> u8 {
        match addressing {
            Addressing::Chain => var.fragment_byte(idx),
            Addressing::Flat => var.flat_byte(idx),
        }
    }

    /// Store of the cell under the cursor.
    pub(crate) fn store(&self) -> Option<&Store> {
        self.var.as_ref().map(Var::store)
    }

    /// Whether the cursor is on a character.
    pub fn has_char(&self) -> bool {
        self.char_idx < self.chars_in_var
    }

    /// The current byte, or 0 at end.
    pub fn get_char(&self) -> u8 {
        match &self.var {
            Some(var) if self.has_char() => Self::byte_at(var, self.addressing, self.char_idx),
            _ => 0,
        }
    }

    /// The current byte as `0..=255`, or -1 at end.
    pub fn get_char_or_minus_one(&self) -> i32 {
        match &self.var {
            Some(var) if self.has_char() => {
                i32::from(Self::byte_at(var, self.addressing, self.char_idx))
            }
            _ => -1,
        }
    }

    /// Overwrite the current byte. Never extends the string.
    pub fn set_char(&mut self, b: u8) {
        if !self.has_char() {
            return;
        }
        if let Some(var) = &self.var {
            match self.addressing {
                Addressing::Chain => var.set_fragment_byte(self.char_idx, b),
                Addressing::Flat => var.set_flat_byte(self.char_idx, b),
            };
        }
    }

    /// Index of the cursor within the whole string.
    pub fn get_index(&self) -> usize {
        self.var_index + self.char_idx
    }

    /// Whether the cursor still holds a cell. False after running off the
    /// end or after an append that could not allocate.
    pub fn is_valid(&self) -> bool {
        self.var.is_some()
    }

    /// Advance one byte, crossing into the next fragment when needed.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        self.char_idx += 1;
        if self.char_idx < self.chars_in_var {
            return;
        }
        self.char_idx -= self.chars_in_var;
        match self.following() {
            Some((next, len)) => {
                self.var_index += self.chars_in_var;
                self.chars_in_var = len;
                self.var = Some(next);
            }
            None => {
                self.var = None;
                self.var_index += self.chars_in_var;
                self.chars_in_var = 0;
            }
        }
    }

    /// Move to the last character, walking every remaining fragment.
    /// An empty string leaves the cursor at index 0.
    pub fn goto_end(&mut self) {
        if self.var.is_none() {
            return;
        }
        while let Some((next, len)) = self.following() {
            self.var_index += self.chars_in_var;
            self.chars_in_var = len;
            self.var = Some(next);
        }
        self.char_idx = self.chars_in_var.saturating_sub(1);
    }

    fn at_last_char(&self) -> bool {
        let is_last_fragment = self
            .var
            .as_ref()
            .and_then(Var::fragment)
            .is_some_and(|f| f.next.is_none());
        let on_last_byte = if self.chars_in_var == 0 {
            self.char_idx == 0
        } else {
            self.char_idx + 1 == self.chars_in_var
        };
        is_last_fragment && on_last_byte
    }

    /// Append a byte to the end of the string.
    ///
    /// Moves to the end first if the cursor is elsewhere. When the current
    /// fragment is full a continuation is allocated and linked. If that
    /// allocation fails the string keeps what it had and the cursor
    /// becomes invalid: see [`StringIter::is_valid`]. Flat strings are
    /// fixed-length, so appending to one also invalidates the cursor.
    pub fn append(&mut self, b: u8) {
        if self.var.is_none() {
            return;
        }
        if self.addressing == Addressing::Flat {
            tracing::warn!("cannot append to a flat string");
            self.invalidate();
            return;
        }
        if !self.at_last_char() {
            self.goto_end();
        }
        if self.chars_in_var > 0 {
            self.char_idx += 1;
        }
        let Some(var) = self.var.as_ref() else {
            return;
        };
        let capacity = var.fragment().map_or(0, |f| f.capacity);
        if self.char_idx >= capacity {
            match var.extend_fragment() {
                Ok(next) => {
                    self.var_index += self.char_idx;
                    self.char_idx = 0;
                    self.var = Some(next);
                }
                Err(_) => {
                    self.invalidate();
                    return;
                }
            }
        }
        if let Some(var) = &self.var {
            var.put_fragment_byte(self.char_idx, b);
            self.chars_in_var = self.char_idx + 1;
        }
    }

    fn invalidate(&mut self) {
        self.var = None;
        self.char_idx = 0;
        self.chars_in_var = 0;
    }
}

/// Appends formatted text. Fails once the cursor becomes invalid.
impl fmt::Write for StringIter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            self.append(b);
            if !self.is_valid() {
                return Err(fmt::Error);
            }
        }
        Ok(())
    }
}
