//! Operations built on the iterators.

use std::fmt;

use ember_core::{ElementType, VarFloat};
use ember_store::{Store, StoreError, StringLayout, Var};
use smallvec::SmallVec;

use crate::arraybuffer::ArrayBufferIter;
use crate::error::IterError;
use crate::string::StringIter;
use crate::unified::VarIter;

/// Element `index` of an array buffer, or `None` past the end.
pub fn array_buffer_get(buffer: &Var, index: usize) -> Result<Option<Var>, IterError> {
    ArrayBufferIter::new(buffer, index)?.get_value()
}

/// Store `value` at element `index` of an array buffer. Out-of-range
/// indices are ignored.
pub fn array_buffer_set(buffer: &Var, index: usize, value: &Var) -> Result<(), IterError> {
    ArrayBufferIter::new(buffer, index)?.set_value(value)
}

/// Append formatted text to a chained string.
///
/// Returns `false` if the store ran out of cells part way; the string
/// keeps whatever fitted.
pub fn append_fmt(string: &Var, args: fmt::Arguments<'_>) -> Result<bool, IterError> {
    if let Some(StringLayout::Flat { .. }) = string.string_layout() {
        return Err(IterError::WrongKind {
            expected: "chained string",
            found: string.kind(),
        });
    }
    let mut it = StringIter::new(string, 0)?;
    it.goto_end();
    Ok(fmt::Write::write_fmt(&mut it, args).is_ok())
}

/// A typed array of `ty` holding every element of `source`, converted.
///
/// Sources with more elements than a typed array can index are rejected
/// with [`StoreError::InvalidView`].
pub fn typed_array_from(store: &Store, ty: ElementType, source: &Var) -> Result<Var, IterError> {
    let mut values: SmallVec<[VarFloat; 16]> = SmallVec::new();
    let mut it = VarIter::new(source)?;
    while it.has_element() {
        values.push(it.get_float()?);
        it.next();
    }
    drop(it);
    let Ok(length) = u16::try_from(values.len()) else {
        tracing::warn!(elements = values.len(), %ty, "source too long for a typed array");
        return Err(StoreError::InvalidView {
            byte_offset: 0,
            length: values.len(),
            width: ty.width(),
            available: usize::from(u16::MAX),
        }
        .into());
    };
    let array = store.new_typed_array(ty, length)?;
    let mut out = ArrayBufferIter::new(&array, 0)?;
    for v in &values {
        out.set_float(*v)?;
        out.next();
    }
    Ok(array)
}
