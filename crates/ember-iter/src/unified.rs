//! One cursor for every iterable kind.

use ember_core::{Kind, VarFloat, VarInt};
use ember_store::Var;

use crate::arraybuffer::ArrayBufferIter;
use crate::error::IterError;
use crate::object::ObjectIter;
use crate::string::StringIter;

/// A cursor over any iterable value, chosen by the value's kind.
///
/// Composites yield their names as keys; strings and array buffers yield
/// integer names built from the element index.
#[derive(Clone, Debug)]
pub enum VarIter {
    /// Children of an object, array, function or root.
    Object(ObjectIter),
    /// Bytes of a string.
    String(StringIter),
    /// Elements of an array buffer or typed view.
    ArrayBuffer(ArrayBufferIter),
}

impl VarIter {
    /// Open the cursor that suits `value`.
    pub fn new(value: &Var) -> Result<Self, IterError> {
        let kind = value.kind();
        if kind.is_composite() {
            Ok(Self::Object(ObjectIter::new(value)?))
        } else if kind == Kind::ArrayBuffer {
            Ok(Self::ArrayBuffer(ArrayBufferIter::new(value, 0)?))
        } else if kind.has_char_data() {
            Ok(Self::String(StringIter::new(value, 0)?))
        } else {
            Err(IterError::NotIterable { kind })
        }
    }

    /// Key of the current element.
    pub fn get_key(&self) -> Result<Option<Var>, IterError> {
        match self {
            Self::Object(it) => Ok(it.get_key()),
            Self::String(it) => match it.store() {
                Some(store) if it.has_char() => {
                    Ok(Some(store.new_name_int(index_key(it.get_index()), None)?))
                }
                _ => Ok(None),
            },
            Self::ArrayBuffer(it) => match it.store() {
                Some(store) if it.has_element() => {
                    Ok(Some(store.new_name_int(index_key(it.get_index()), None)?))
                }
                _ => Ok(None),
            },
        }
    }

    /// Value of the current element. Strings yield one-character strings.
    /// Array buffers are read without moving the cursor.
    pub fn get_value(&mut self) -> Result<Option<Var>, IterError> {
        match self {
            Self::Object(it) => it.get_value(),
            Self::String(it) => match it.store() {
                Some(store) if it.has_char() => Ok(Some(store.new_bytes(&[it.get_char()])?)),
                _ => Ok(None),
            },
            Self::ArrayBuffer(it) => it.get_value_and_rewind(),
        }
    }

    /// Current element as an integer. Strings yield the character code.
    pub fn get_int(&mut self) -> Result<VarInt, IterError> {
        match self {
            Self::Object(it) => Ok(it.get_value()?.map_or(0, |v| v.as_int())),
            Self::String(it) => Ok(VarInt::from(it.get_char())),
            Self::ArrayBuffer(it) => it.get_int(),
        }
    }

    /// Current element as a float. Strings yield the character code.
    pub fn get_float(&mut self) -> Result<VarFloat, IterError> {
        match self {
            Self::Object(it) => Ok(it.get_value()?.map_or(0.0, |v| v.as_float())),
            Self::String(it) => Ok(VarFloat::from(it.get_char())),
            Self::ArrayBuffer(it) => it.get_float(),
        }
    }

    /// Overwrite the current element.
    ///
    /// A string element takes the first byte of a string value, or the
    /// low byte of anything else's integer value.
    pub fn set_value(&mut self, value: &Var) -> Result<(), IterError> {
        match self {
            Self::Object(it) => it.set_value(Some(value)),
            Self::String(it) => {
                let b = if value.is_string() {
                    value.char_at(0)?.unwrap_or(0)
                } else {
                    value.as_int() as u8
                };
                it.set_char(b);
                Ok(())
            }
            Self::ArrayBuffer(it) => it.set_value_and_rewind(value),
        }
    }

    /// Whether the cursor is on an element.
    pub fn has_element(&self) -> bool {
        match self {
            Self::Object(it) => it.has_value(),
            Self::String(it) => it.has_char(),
            Self::ArrayBuffer(it) => it.has_element(),
        }
    }

    /// Move to the next element.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        match self {
            Self::Object(it) => it.next(),
            Self::String(it) => it.next(),
            Self::ArrayBuffer(it) => it.next(),
        }
    }
}

fn index_key(index: usize) -> VarInt {
    VarInt::try_from(index).unwrap_or(VarInt::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::ElementType;
    use ember_store::{Key, Store};

    fn drain_ints(it: &mut VarIter) -> Vec<VarInt> {
        let mut out = Vec::new();
        while it.has_element() {
            out.push(it.get_int().unwrap());
            it.next();
        }
        out
    }

    #[test]
    fn arrays_and_typed_arrays_agree() {
        let s = Store::with_cells(32).unwrap();
        let arr = s.new_array().unwrap();
        let buf = s.new_typed_array(ElementType::UInt8, 3).unwrap();
        let mut w = ArrayBufferIter::new(&buf, 0).unwrap();
        for v in [10, 20, 30] {
            arr.array_push(&s.new_int(v).unwrap()).unwrap();
            w.set_int(v).unwrap();
            w.next();
        }
        drop(w);
        let mut a = VarIter::new(&arr).unwrap();
        let mut b = VarIter::new(&buf).unwrap();
        assert!(matches!(a, VarIter::Object(_)));
        assert!(matches!(b, VarIter::ArrayBuffer(_)));
        assert_eq!(drain_ints(&mut a), vec![10, 20, 30]);
        assert_eq!(drain_ints(&mut b), vec![10, 20, 30]);
    }

    #[test]
    fn strings_yield_char_codes_and_one_char_values() {
        let s = Store::with_cells(16).unwrap();
        let text = s.new_str("AB").unwrap();
        let mut it = VarIter::new(&text).unwrap();
        let v = it.get_value().unwrap().unwrap();
        assert!(v.eq_bytes(b"A"));
        assert_eq!(drain_ints(&mut it), vec![65, 66]);
    }

    #[test]
    fn string_and_buffer_keys_are_indices() {
        let s = Store::with_cells(16).unwrap();
        let text = s.new_str("xyz").unwrap();
        let mut it = VarIter::new(&text).unwrap();
        it.next();
        let key = it.get_key().unwrap().unwrap();
        assert!(matches!(key.name_key().unwrap(), Key::Int(1)));

        let buf = s.new_typed_array(ElementType::Int16, 4).unwrap();
        let mut it = VarIter::new(&buf).unwrap();
        it.next();
        it.next();
        let key = it.get_key().unwrap().unwrap();
        assert_eq!(key.name_key().unwrap().as_int(), 2);
    }

    #[test]
    fn set_value_on_strings_takes_first_byte() {
        let s = Store::with_cells(16).unwrap();
        let text = s.new_str("abc").unwrap();
        let mut it = VarIter::new(&text).unwrap();
        it.set_value(&s.new_str("Zed").unwrap()).unwrap();
        it.next();
        it.set_value(&s.new_int(0x141).unwrap()).unwrap();
        drop(it);
        assert!(text.eq_bytes(b"ZAc"));
    }

    #[test]
    fn buffer_access_does_not_advance() {
        let s = Store::with_cells(16).unwrap();
        let buf = s.new_typed_array(ElementType::Int32, 2).unwrap();
        let mut it = VarIter::new(&buf).unwrap();
        it.set_value(&s.new_int(5).unwrap()).unwrap();
        let v = it.get_value().unwrap().unwrap();
        assert_eq!(v.as_int(), 5);
        it.next();
        it.set_value(&s.new_int(6).unwrap()).unwrap();
        drop(it);
        let mut it = VarIter::new(&buf).unwrap();
        assert_eq!(drain_ints(&mut it), vec![5, 6]);
    }

    #[test]
    fn scalars_are_not_iterable() {
        let s = Store::with_cells(8).unwrap();
        let n = s.new_int(3).unwrap();
        assert_eq!(
            VarIter::new(&n).unwrap_err(),
            IterError::NotIterable { kind: Kind::Integer }
        );
    }

    #[test]
    fn clones_iterate_independently() {
        let s = Store::with_cells(16).unwrap();
        let text = s.new_str("hey").unwrap();
        let mut a = VarIter::new(&text).unwrap();
        let b = a.clone();
        a.next();
        assert_eq!(a.clone().get_int().unwrap(), i32::from(b'e'));
        let mut b = b;
        assert_eq!(b.get_int().unwrap(), i32::from(b'h'));
    }
}
