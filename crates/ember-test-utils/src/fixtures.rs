//! Builders for common value shapes.
//!
//! - [`int_array`]: an array of integers.
//! - [`typed_array`]: a typed view holding the given values.
//! - [`data_count`]: a `{data, count}` repeat object.
//! - [`nested`]: a value wrapped in single-element arrays.

use ember_core::{ElementType, VarInt};
use ember_store::{Store, Var};

pub fn int_array(store: &Store, values: &[VarInt]) -> Var {
    let arr = store.new_array().expect("array");
    for v in values {
        let el = store.new_int(*v).expect("array element");
        arr.array_push(&el).expect("array push");
    }
    arr
}

/// A typed array of `ty` holding `values`, encoded straight into its
/// backing string.
pub fn typed_array(store: &Store, ty: ElementType, values: &[VarInt]) -> Var {
    let width = ty.width();
    let mut bytes = Vec::with_capacity(values.len() * width);
    for v in values {
        bytes.extend_from_slice(&ty.encode_int(*v)[..width]);
    }
    let backing = store.new_bytes(&bytes).expect("backing string");
    let byte_len = u16::try_from(bytes.len()).expect("buffer fits u16");
    let plain = store
        .new_array_buffer_from_string(&backing, byte_len)
        .expect("plain buffer");
    if ty == ElementType::ArrayBuffer {
        return plain;
    }
    let length = u16::try_from(values.len()).expect("length fits u16");
    store.new_view(&plain, ty, 0, length).expect("typed view")
}

pub fn uint8_array(store: &Store, values: &[u8]) -> Var {
    let ints: Vec<VarInt> = values.iter().map(|b| VarInt::from(*b)).collect();
    typed_array(store, ElementType::UInt8, &ints)
}

pub fn data_count(store: &Store, data: &Var, count: VarInt) -> Var {
    let obj = store.new_object().expect("object");
    obj.object_set("data", data).expect("data");
    let count = store.new_int(count).expect("count");
    obj.object_set("count", &count).expect("count");
    obj
}

pub fn nested(store: &Store, leaf: &Var, depth: usize) -> Var {
    let mut cur = leaf.clone();
    for _ in 0..depth {
        let arr = store.new_array().expect("array");
        arr.array_push(&cur).expect("array push");
        cur = arr;
    }
    cur
}
