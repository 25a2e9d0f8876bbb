//! Element cursor over array buffers and typed views.
//!
//! Elements are decoded from, and encoded into, the backing string through
//! a [`StringIter`]. Reading or writing a multi-byte element leaves the
//! string cursor on the following element; `has_accessed_element` records
//! that so [`ArrayBufferIter::next`] does not move it twice. Accessing the
//! same element again first puts the string cursor back.

use ember_core::element::float_to_int;
use ember_core::{ElementType, Kind, VarFloat, VarInt};
use ember_store::{Store, Var};

use crate::error::IterError;
use crate::string::StringIter;

/// A cursor over the elements of an array buffer.
///
/// An index past the end yields a cursor of type
/// [`ElementType::Undefined`]: it has no elements, reads return nothing
/// and writes are ignored.
#[derive(Clone, Debug)]
pub struct ArrayBufferIter {
    it: Option<StringIter>,
    backing: Option<Var>,
    ty: ElementType,
    /// End of the view within the backing string, in bytes.
    byte_length: usize,
    /// Position of the current element within the backing string.
    byte_offset: usize,
    index: usize,
    has_accessed_element: bool,
}

impl ArrayBufferIter {
    /// Open a cursor on `buffer` at element `index`.
    pub fn new(buffer: &Var, index: usize) -> Result<Self, IterError> {
        if buffer.kind() != Kind::ArrayBuffer {
            return Err(IterError::WrongKind {
                expected: "arraybuffer",
                found: buffer.kind(),
            });
        }
        let view = buffer.array_buffer_view()?;
        let width = view.width();
        let byte_length = view.byte_len() + usize::from(view.byte_offset);
        let byte_offset = index
            .checked_mul(width)
            .and_then(|o| o.checked_add(usize::from(view.byte_offset)));
        let end = byte_offset.and_then(|o| o.checked_add(width));
        let (Some(byte_offset), Some(end)) = (byte_offset, end) else {
            return Ok(Self::undefined(index));
        };
        if width == 0 || end > byte_length {
            return Ok(Self::undefined(index));
        }
        let backing = buffer.backing_string()?;
        let it = StringIter::new(&backing, byte_offset)?;
        Ok(Self {
            it: Some(it),
            backing: Some(backing),
            ty: view.ty,
            byte_length,
            byte_offset,
            index,
            has_accessed_element: false,
        })
    }

    fn undefined(index: usize) -> Self {
        Self {
            it: None,
            backing: None,
            ty: ElementType::Undefined,
            byte_length: 0,
            byte_offset: 0,
            index,
            has_accessed_element: false,
        }
    }

    /// Element type of the view, or `Undefined` for an out-of-range cursor.
    pub fn element_type(&self) -> ElementType {
        self.ty
    }

    pub(crate) fn store(&self) -> Option<&Store> {
        self.backing.as_ref().map(Var::store)
    }

    /// Index of the current element.
    pub fn get_index(&self) -> usize {
        self.index
    }

    /// Whether the cursor is on an element.
    pub fn has_element(&self) -> bool {
        if self.ty == ElementType::Undefined {
            return false;
        }
        self.has_accessed_element
            || self
                .byte_offset
                .checked_add(self.ty.width())
                .is_some_and(|end| end <= self.byte_length)
    }

    /// Move to the next element.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        self.index = self.index.saturating_add(1);
        let width = self.ty.width();
        self.byte_offset = self.byte_offset.saturating_add(width);
        if self.has_accessed_element {
            self.has_accessed_element = false;
            return;
        }
        if let Some(it) = self.it.as_mut() {
            for _ in 0..width {
                it.next();
            }
        }
    }

    /// Put the string cursor back on the current element if an access
    /// already moved it past.
    fn reposition(&mut self) -> Result<(), IterError> {
        if self.has_accessed_element {
            if let Some(backing) = &self.backing {
                self.it = Some(StringIter::new(backing, self.byte_offset)?);
            }
            self.has_accessed_element = false;
        }
        Ok(())
    }

    fn read_raw(&mut self) -> Result<[u8; 8], IterError> {
        self.reposition()?;
        let width = self.ty.width();
        let mut data = [0u8; 8];
        if let Some(it) = self.it.as_mut() {
            for b in data.iter_mut().take(width) {
                *b = it.get_char();
                if width != 1 {
                    it.next();
                }
            }
        }
        if width != 1 {
            self.has_accessed_element = true;
        }
        Ok(data)
    }

    fn write_raw(&mut self, data: [u8; 8]) -> Result<(), IterError> {
        if self.ty == ElementType::Undefined {
            return Ok(());
        }
        self.reposition()?;
        let width = self.ty.width();
        if let Some(it) = self.it.as_mut() {
            for b in data.iter().take(width) {
                it.set_char(*b);
                if width != 1 {
                    it.next();
                }
            }
        }
        if width != 1 {
            self.has_accessed_element = true;
        }
        Ok(())
    }

    /// The current element as a new value: a float for float views, a
    /// long for `Uint32`, an integer otherwise. `None` past the end.
    pub fn get_value(&mut self) -> Result<Option<Var>, IterError> {
        if !self.has_element() {
            return Ok(None);
        }
        let data = self.read_raw()?;
        let Some(store) = self.store().cloned() else {
            return Ok(None);
        };
        let value = if self.ty.is_float() {
            store.new_float(self.ty.decode_float(&data))?
        } else if self.ty == ElementType::UInt32 {
            store.new_long(self.ty.decode_int(&data))?
        } else {
            store.new_int(self.ty.decode_int(&data) as VarInt)?
        };
        Ok(Some(value))
    }

    /// The current element as an integer. Floats truncate; 0 past the end.
    pub fn get_int(&mut self) -> Result<VarInt, IterError> {
        if !self.has_element() {
            return Ok(0);
        }
        let data = self.read_raw()?;
        Ok(if self.ty.is_float() {
            float_to_int(self.ty.decode_float(&data))
        } else {
            self.ty.decode_int(&data) as VarInt
        })
    }

    /// The current element as a float; 0 past the end.
    pub fn get_float(&mut self) -> Result<VarFloat, IterError> {
        if !self.has_element() {
            return Ok(0.0);
        }
        let data = self.read_raw()?;
        Ok(if self.ty.is_float() {
            self.ty.decode_float(&data)
        } else {
            self.ty.decode_int(&data) as VarFloat
        })
    }

    /// Store `value` into the current element, converted to the view's
    /// type. Clamped views saturate; other integer views truncate.
    pub fn set_value(&mut self, value: &Var) -> Result<(), IterError> {
        let data = if self.ty.is_float() {
            self.ty.encode_float(value.as_float())
        } else {
            self.ty.encode_int(value.as_int())
        };
        self.write_raw(data)
    }

    /// Store an integer into the current element.
    pub fn set_int(&mut self, v: VarInt) -> Result<(), IterError> {
        let data = self.ty.encode_int(v);
        self.write_raw(data)
    }

    /// Store a float into the current element.
    pub fn set_float(&mut self, v: VarFloat) -> Result<(), IterError> {
        let data = self.ty.encode_float(v);
        self.write_raw(data)
    }

    /// Overwrite the current byte of a one-byte-wide view.
    pub fn set_byte_value(&mut self, b: u8) -> Result<(), IterError> {
        if self.ty.width() != 1 {
            tracing::warn!(ty = %self.ty, "set_byte_value needs a one-byte view");
            return Ok(());
        }
        self.write_raw([b, 0, 0, 0, 0, 0, 0, 0])
    }

    /// Read the current element and leave the cursor where it was.
    pub fn get_value_and_rewind(&mut self) -> Result<Option<Var>, IterError> {
        let saved = (self.it.clone(), self.has_accessed_element);
        let value = self.get_value();
        (self.it, self.has_accessed_element) = saved;
        value
    }

    /// Write the current element and leave the cursor where it was.
    pub fn set_value_and_rewind(&mut self, value: &Var) -> Result<(), IterError> {
        let saved = (self.it.clone(), self.has_accessed_element);
        let result = self.set_value(value);
        (self.it, self.has_accessed_element) = saved;
        result
    }
}
