//! Array-buffer element types and their byte encoding.
//!
//! The numeric values of [`ElementType`] are a wire format: they are stored
//! in array-buffer headers and shared with code that reads those headers
//! directly, so they must never change.
//!
//! ```text
//! bit 7      6        5      4       3..0
//!     plain  clamped  float  signed  width in bytes
//! ```
//!
//! Multi-byte elements are little-endian.

use std::fmt;

use crate::VarInt;

/// Mask selecting the element width in bytes.
pub const SIZE_MASK: u8 = 15;
/// Flag: integer elements are sign-extended on read.
pub const SIGNED: u8 = 16;
/// Flag: elements are IEEE-754 floats.
pub const FLOAT: u8 = 32;
/// Flag: integer writes saturate to `0..=255` instead of truncating.
pub const CLAMPED: u8 = 64;
/// Flag: an untyped `ArrayBuffer` rather than a typed view.
pub const PLAIN: u8 = 128;

/// Element type of an array-buffer view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    /// Sentinel for an out-of-range or invalid view. Width 0.
    Undefined = 0,
    /// Unsigned 8-bit.
    UInt8 = 1,
    /// Signed 8-bit.
    Int8 = 1 | SIGNED,
    /// Unsigned 8-bit, saturating on write.
    UInt8Clamped = 1 | CLAMPED,
    /// Unsigned 16-bit.
    UInt16 = 2,
    /// Signed 16-bit.
    Int16 = 2 | SIGNED,
    /// Unsigned 32-bit.
    UInt32 = 4,
    /// Signed 32-bit.
    Int32 = 4 | SIGNED,
    /// 32-bit float.
    Float32 = 4 | FLOAT,
    /// 64-bit float.
    Float64 = 8 | FLOAT,
    /// Untyped byte buffer; reads and writes like `UInt8`.
    ArrayBuffer = 1 | PLAIN,
}

impl ElementType {
    /// Every encodable type, `Undefined` included.
    pub const ALL: [ElementType; 11] = [
        Self::Undefined,
        Self::UInt8,
        Self::Int8,
        Self::UInt8Clamped,
        Self::UInt16,
        Self::Int16,
        Self::UInt32,
        Self::Int32,
        Self::Float32,
        Self::Float64,
        Self::ArrayBuffer,
    ];

    /// Decode a header byte. Unknown bit patterns yield `None`.
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.bits() == bits)
    }

    /// The header byte for this type.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Element width in bytes: 0, 1, 2, 4 or 8.
    pub fn width(self) -> usize {
        usize::from(self.bits() & SIZE_MASK)
    }

    /// Whether integer reads sign-extend.
    pub fn is_signed(self) -> bool {
        self.bits() & SIGNED != 0
    }

    /// Whether elements are floats.
    pub fn is_float(self) -> bool {
        self.bits() & FLOAT != 0
    }

    /// Whether integer writes saturate.
    pub fn is_clamped(self) -> bool {
        self.bits() & CLAMPED != 0
    }

    /// Decode an integer element from the first `width()` bytes of `data`.
    ///
    /// `data` is the fixed-size element buffer produced by
    /// [`encode_int`](Self::encode_int), so every width fits.
    ///
    /// Signed types sign-extend; unsigned types are masked to their width,
    /// so a `UInt32` element yields `0..=u32::MAX`.
    pub fn decode_int(self, data: &[u8; 8]) -> i64 {
        let v = match self.width() {
            1 => i64::from(data[0] as i8),
            2 => i64::from(i16::from_le_bytes([data[0], data[1]])),
            4 => i64::from(i32::from_le_bytes([data[0], data[1], data[2], data[3]])),
            8 => i64::from_le_bytes(*data),
            _ => 0,
        };
        if self.is_signed() || self.width() >= 8 {
            v
        } else {
            v & ((1i64 << (8 * self.width())) - 1)
        }
    }

    /// Decode a float element. Widths other than 4 or 8 decode as zero.
    pub fn decode_float(self, data: &[u8; 8]) -> f64 {
        match self.width() {
            4 => f64::from(f32::from_le_bytes([data[0], data[1], data[2], data[3]])),
            8 => f64::from_le_bytes(*data),
            _ => 0.0,
        }
    }

    /// Encode an integer into `width()` little-endian bytes.
    ///
    /// Clamped types saturate to `0..=255`. Every other integer type
    /// truncates to its width without a range check. Float types store
    /// the value converted to a float.
    pub fn encode_int(self, v: VarInt) -> [u8; 8] {
        if self.is_float() {
            return self.encode_float(f64::from(v));
        }
        let v = if self.is_clamped() { v.clamp(0, 255) } else { v };
        let mut out = [0u8; 8];
        match self.width() {
            1 => out[0] = v as u8,
            2 => out[..2].copy_from_slice(&(v as i16).to_le_bytes()),
            4 => out[..4].copy_from_slice(&v.to_le_bytes()),
            8 => out.copy_from_slice(&i64::from(v).to_le_bytes()),
            _ => {}
        }
        out
    }

    /// Encode a float into `width()` bytes. Integer types truncate the
    /// float to an integer first.
    pub fn encode_float(self, v: f64) -> [u8; 8] {
        let mut out = [0u8; 8];
        match (self.is_float(), self.width()) {
            (true, 4) => out[..4].copy_from_slice(&(v as f32).to_le_bytes()),
            (true, 8) => out.copy_from_slice(&v.to_le_bytes()),
            (true, _) => {}
            (false, _) => return self.encode_int(float_to_int(v)),
        }
        out
    }

    /// Display name, matching the runtime's typed-array class names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::UInt8 => "Uint8Array",
            Self::Int8 => "Int8Array",
            Self::UInt8Clamped => "Uint8ClampedArray",
            Self::UInt16 => "Uint16Array",
            Self::Int16 => "Int16Array",
            Self::UInt32 => "Uint32Array",
            Self::Int32 => "Int32Array",
            Self::Float32 => "Float32Array",
            Self::Float64 => "Float64Array",
            Self::ArrayBuffer => "ArrayBuffer",
        }
    }
}

/// Float to integer conversion used for every numeric store: finite values
/// truncate toward zero through a 64-bit intermediate, anything else is 0.
pub fn float_to_int(v: f64) -> VarInt {
    if v.is_finite() {
        (v as i64) as VarInt
    } else {
        0
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bytes_are_stable() {
        assert_eq!(ElementType::Undefined.bits(), 0);
        assert_eq!(ElementType::UInt8.bits(), 1);
        assert_eq!(ElementType::Int8.bits(), 17);
        assert_eq!(ElementType::UInt8Clamped.bits(), 65);
        assert_eq!(ElementType::UInt16.bits(), 2);
        assert_eq!(ElementType::Int16.bits(), 18);
        assert_eq!(ElementType::UInt32.bits(), 4);
        assert_eq!(ElementType::Int32.bits(), 20);
        assert_eq!(ElementType::Float32.bits(), 36);
        assert_eq!(ElementType::Float64.bits(), 40);
        assert_eq!(ElementType::ArrayBuffer.bits(), 129);
    }

    #[test]
    fn from_bits_inverts_bits() {
        for t in ElementType::ALL {
            assert_eq!(ElementType::from_bits(t.bits()), Some(t));
        }
        assert_eq!(ElementType::from_bits(3), None);
        assert_eq!(ElementType::from_bits(1 | FLOAT), None);
    }

    #[test]
    fn widths() {
        assert_eq!(ElementType::Undefined.width(), 0);
        assert_eq!(ElementType::ArrayBuffer.width(), 1);
        assert_eq!(ElementType::Int16.width(), 2);
        assert_eq!(ElementType::Float32.width(), 4);
        assert_eq!(ElementType::Float64.width(), 8);
    }

    fn padded(bytes: &[u8]) -> [u8; 8] {
        let mut b = [0u8; 8];
        b[..bytes.len()].copy_from_slice(bytes);
        b
    }

    #[test]
    fn unsigned_reads_are_masked() {
        assert_eq!(ElementType::UInt8.decode_int(&padded(&[0xff])), 255);
        assert_eq!(ElementType::Int8.decode_int(&padded(&[0xff])), -1);
        assert_eq!(ElementType::UInt16.decode_int(&padded(&[0xff, 0xff])), 65535);
        assert_eq!(ElementType::Int16.decode_int(&padded(&[0x00, 0x80])), -32768);
        assert_eq!(
            ElementType::UInt32.decode_int(&padded(&[0xff, 0xff, 0xff, 0xff])),
            i64::from(u32::MAX)
        );
        assert_eq!(
            ElementType::Int32.decode_int(&padded(&[0xff, 0xff, 0xff, 0xff])),
            -1
        );
    }

    #[test]
    fn bytes_past_the_width_are_ignored() {
        let b = [0x01, 0x02, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(ElementType::UInt8.decode_int(&b), 1);
        assert_eq!(ElementType::UInt16.decode_int(&b), 0x0201);
        assert_eq!(ElementType::Undefined.decode_int(&b), 0);
        assert_eq!(ElementType::Undefined.decode_float(&b), 0.0);
    }

    #[test]
    fn clamped_saturates_but_plain_truncates() {
        assert_eq!(ElementType::UInt8Clamped.encode_int(300)[0], 255);
        assert_eq!(ElementType::UInt8Clamped.encode_int(-10)[0], 0);
        assert_eq!(ElementType::UInt8.encode_int(300)[0], 44);
        assert_eq!(ElementType::Int8.encode_int(-10)[0], 0xf6);
    }

    #[test]
    fn multi_byte_is_little_endian() {
        let b = ElementType::UInt16.encode_int(0x1234);
        assert_eq!(&b[..2], &[0x34, 0x12]);
    }

    #[test]
    fn float_store_into_integer_type_truncates() {
        let b = ElementType::Int16.encode_float(-2.9);
        assert_eq!(ElementType::Int16.decode_int(&b), -2);
        let b = ElementType::UInt8.encode_float(f64::NAN);
        assert_eq!(b[0], 0);
    }

    #[test]
    fn integer_store_into_float_type_converts() {
        let b = ElementType::Float32.encode_int(7);
        assert_eq!(ElementType::Float32.decode_float(&b), 7.0);
    }

    #[test]
    fn float_to_int_handles_non_finite() {
        assert_eq!(float_to_int(f64::INFINITY), 0);
        assert_eq!(float_to_int(f64::NAN), 0);
        assert_eq!(float_to_int(-3.7), -3);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn int32_round_trips(v in any::<i32>()) {
                let b = ElementType::Int32.encode_int(v);
                prop_assert_eq!(ElementType::Int32.decode_int(&b), i64::from(v));
            }

            #[test]
            fn uint16_keeps_low_bits(v in any::<i32>()) {
                let b = ElementType::UInt16.encode_int(v);
                prop_assert_eq!(ElementType::UInt16.decode_int(&b), i64::from(v & 0xffff));
            }

            #[test]
            fn float64_round_trips(v in any::<f64>().prop_filter("not nan", |v| !v.is_nan())) {
                let b = ElementType::Float64.encode_float(v);
                prop_assert_eq!(ElementType::Float64.decode_float(&b), v);
            }
        }
    }
}
