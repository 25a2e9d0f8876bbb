//! Array-buffer headers and typed views.
//!
//! An array buffer is a header cell over a backing byte string. A plain
//! `ArrayBuffer` references the string directly; a typed view references a
//! plain buffer. Either way the header records the element type, a byte
//! offset into the backing string and a length in elements.

use ember_core::{ElementType, Kind};

use crate::cell::{Body, STRING_EXT_LEN, STRING_HEAD_LEN};
use crate::error::StoreError;
use crate::store::Store;
use crate::var::Var;

/// Header of an array buffer or typed view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayBufferView {
    /// Element type.
    pub ty: ElementType,
    /// Offset of element 0 in the backing string, in bytes.
    pub byte_offset: u16,
    /// Length in elements.
    pub length: u16,
}

impl ArrayBufferView {
    /// Element width in bytes.
    pub fn width(&self) -> usize {
        self.ty.width()
    }

    /// Bytes covered by the view, excluding the offset.
    pub fn byte_len(&self) -> usize {
        usize::from(self.length) * self.width()
    }
}

/// Buffers up to this many bytes fit in a head fragment plus one
/// continuation and are cheaper to build as a chain than as a flat run.
const FLAT_BREAK_EVEN: usize = STRING_HEAD_LEN + STRING_EXT_LEN;

impl Store {
    /// A plain `ArrayBuffer` over `backing`.
    ///
    /// A zero `length_or_zero` takes the string's current length.
    pub fn new_array_buffer_from_string(
        &self,
        backing: &Var,
        length_or_zero: u16,
    ) -> Result<Var, StoreError> {
        let length = match length_or_zero {
            0 => u16::try_from(backing.string_len()?).unwrap_or(u16::MAX),
            n => {
                if !backing.is_string() {
                    return Err(backing.wrong_kind("string"));
                }
                n
            }
        };
        self.new_header(
            backing,
            ArrayBufferView {
                ty: ElementType::ArrayBuffer,
                byte_offset: 0,
                length,
            },
        )
    }

    /// A zero-filled plain `ArrayBuffer` of `byte_len` bytes.
    ///
    /// Larger buffers try a flat backing string first and fall back to a
    /// chain when no contiguous run is free.
    pub fn new_array_buffer(&self, byte_len: u16) -> Result<Var, StoreError> {
        let len = usize::from(byte_len);
        let flat = if len > FLAT_BREAK_EVEN {
            self.new_flat_string(len).ok()
        } else {
            None
        };
        let backing = match flat {
            Some(f) => f,
            None => {
                let chain = self.new_string_of_length(len)?;
                if chain.string_len()? < len {
                    return Err(StoreError::OutOfMemory {
                        requested: len,
                        free: self.total() - self.usage(),
                    });
                }
                chain
            }
        };
        self.new_array_buffer_from_string(&backing, byte_len)
    }

    /// A zero-filled typed array of `length` elements.
    pub fn new_typed_array(&self, ty: ElementType, length: u16) -> Result<Var, StoreError> {
        let invalid = StoreError::InvalidView {
            byte_offset: 0,
            length: usize::from(length),
            width: ty.width(),
            available: usize::from(u16::MAX),
        };
        if ty == ElementType::Undefined {
            return Err(invalid);
        }
        let byte_len = u16::try_from(usize::from(length) * ty.width()).map_err(|_| invalid)?;
        let buffer = self.new_array_buffer(byte_len)?;
        if ty == ElementType::ArrayBuffer {
            return Ok(buffer);
        }
        self.new_view(&buffer, ty, 0, length)
    }

    /// A typed view of `length` elements over a plain buffer, starting
    /// `byte_offset` bytes in.
    ///
    /// The offset must be a multiple of the element width and the view
    /// must fit inside the buffer.
    pub fn new_view(
        &self,
        buffer: &Var,
        ty: ElementType,
        byte_offset: u16,
        length: u16,
    ) -> Result<Var, StoreError> {
        let base = buffer.array_buffer_view()?;
        if base.ty != ElementType::ArrayBuffer {
            return Err(buffer.wrong_kind("plain ArrayBuffer"));
        }
        let width = ty.width();
        let offset = usize::from(byte_offset);
        let available = base.byte_len();
        let fits = width != 0
            && offset % width == 0
            && offset + usize::from(length) * width <= available;
        let absolute = u16::try_from(usize::from(base.byte_offset) + offset).ok();
        let (true, Some(byte_offset)) = (fits, absolute) else {
            return Err(StoreError::InvalidView {
                byte_offset: offset,
                length: usize::from(length),
                width,
                available,
            });
        };
        self.new_header(
            buffer,
            ArrayBufferView {
                ty,
                byte_offset,
                length,
            },
        )
    }

    fn new_header(&self, backing: &Var, view: ArrayBufferView) -> Result<Var, StoreError> {
        let header = self.alloc(Body::ArrayBuffer {
            backing: backing.cell(),
            view,
        })?;
        self.arena_mut().add_ref(backing.cell());
        Ok(header)
    }
}

impl Var {
    /// The header of an array buffer or typed view.
    pub fn array_buffer_view(&self) -> Result<ArrayBufferView, StoreError> {
        let view = match self.store().arena().body(self.cell()) {
            Body::ArrayBuffer { view, .. } => Some(*view),
            _ => None,
        };
        view.ok_or_else(|| self.wrong_kind("arraybuffer"))
    }

    /// Length in elements.
    pub fn array_buffer_len(&self) -> Result<usize, StoreError> {
        Ok(usize::from(self.array_buffer_view()?.length))
    }

    /// What this header directly references: a string or a plain buffer.
    pub fn array_buffer_backing(&self) -> Result<Var, StoreError> {
        let backing = match self.store().arena().body(self.cell()) {
            Body::ArrayBuffer { backing, .. } => Some(*backing),
            _ => None,
        };
        match backing {
            Some(b) => Ok(self.store().lock(b)),
            None => Err(self.wrong_kind("arraybuffer")),
        }
    }

    /// The byte string holding this buffer's data, following views down
    /// to their plain buffer.
    pub fn backing_string(&self) -> Result<Var, StoreError> {
        let mut cur = self.array_buffer_backing()?;
        while cur.kind() == Kind::ArrayBuffer {
            cur = cur.array_buffer_backing()?;
        }
        if cur.is_string() {
            Ok(cur)
        } else {
            Err(cur.wrong_kind("string"))
        }
    }
}
