//! Scoped handles to live cells and value conversions.

use std::fmt;

use ember_core::element::float_to_int;
use ember_core::{CellRef, Kind, VarFloat, VarInt};

use crate::cell::{Body, KeyRef};
use crate::error::StoreError;
use crate::store::Store;

/// A locked cell.
///
/// Holding a `Var` keeps its cell alive. Cloning takes another lock and
/// dropping releases one, so every acquisition is paired with exactly one
/// release on every exit path. "Undefined" is `Option<Var>::None`.
pub struct Var {
    store: Store,
    cell: CellRef,
}

impl Var {
    /// Wrap a cell whose lock the caller has already taken.
    pub(crate) fn adopt(store: Store, cell: CellRef) -> Self {
        Self { store, cell }
    }

    /// The locked cell.
    pub fn cell(&self) -> CellRef {
        self.cell
    }

    /// The store this cell lives in.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// What this cell holds.
    pub fn kind(&self) -> Kind {
        // A locked cell is never reclaimed, so it always has a kind.
        self.store.arena().kind(self.cell).unwrap_or(Kind::Null)
    }

    /// Current lock count.
    pub fn locks(&self) -> u32 {
        self.store.arena().cell(self.cell).locks
    }

    /// Current reference count.
    pub fn refs(&self) -> u16 {
        self.store.arena().cell(self.cell).refs
    }

    /// Whether both handles lock the same cell of the same store.
    pub fn same_cell(&self, other: &Var) -> bool {
        self.cell == other.cell && self.store.ptr_eq(&other.store)
    }

    pub(crate) fn wrong_kind(&self, expected: &'static str) -> StoreError {
        StoreError::WrongKind {
            cell: self.cell,
            expected,
            found: self.kind(),
        }
    }

    /// Whether this cell has character data (chained or flat string).
    pub fn is_string(&self) -> bool {
        self.kind().has_char_data()
    }

    /// Integers, floats and booleans.
    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    /// Objects, arrays, functions and the root.
    pub fn is_composite(&self) -> bool {
        self.kind().is_composite()
    }

    /// Whether this is an array.
    pub fn is_array(&self) -> bool {
        self.kind() == Kind::Array
    }

    /// Whether this is an array buffer or typed view.
    pub fn is_array_buffer(&self) -> bool {
        self.kind() == Kind::ArrayBuffer
    }

    /// Whether this is a name cell.
    pub fn is_name(&self) -> bool {
        self.kind() == Kind::Name
    }

    /// Overwrite an integer cell in place.
    pub fn set_int(&self, v: VarInt) -> Result<(), StoreError> {
        let mut arena = self.store.arena_mut();
        match arena.body_mut(self.cell) {
            Body::Integer(i) => {
                *i = v;
                Ok(())
            }
            _ => {
                drop(arena);
                Err(self.wrong_kind("integer"))
            }
        }
    }

    /// Code pointer and packed argument signature of a native function.
    pub fn native(&self) -> Result<(usize, u16), StoreError> {
        let found = match self.store.arena().body(self.cell) {
            Body::Native { ptr, signature } => Some((*ptr, *signature)),
            _ => None,
        };
        found.ok_or_else(|| self.wrong_kind("native-function"))
    }

    // ── Conversions ─────────────────────────────────────────────

    /// Integer value of this cell.
    ///
    /// Finite floats truncate toward zero and non-finite floats give 0.
    /// Booleans give 0 or 1, `null` gives 0. Integer-keyed names give their
    /// key. Numeric strings are parsed. A one-element array gives its
    /// element's integer value. Anything else is 0.
    pub fn as_int(&self) -> VarInt {
        let arena = self.store.arena();
        match arena.body(self.cell) {
            Body::Integer(i) => *i,
            Body::Boolean(b) => VarInt::from(*b),
            Body::Float(f) => float_to_int(*f),
            Body::Name {
                key: KeyRef::Int(i),
                ..
            } => *i,
            Body::Str(_) | Body::FlatStr { .. } => {
                drop(arena);
                parse_number(&self.to_bytes().unwrap_or_default()).map_or(0, float_to_int)
            }
            Body::Array { length: 1, .. } => {
                drop(arena);
                self.single_element().map_or(0, |v| v.as_int())
            }
            _ => 0,
        }
    }

    /// 64-bit integer value: exact for integers, truncated otherwise.
    pub fn as_long(&self) -> i64 {
        match self.kind() {
            Kind::Integer => i64::from(self.as_int()),
            _ => {
                let f = self.as_float();
                if f.is_finite() {
                    f as i64
                } else {
                    0
                }
            }
        }
    }

    /// Float value of this cell.
    ///
    /// An empty string or empty array is 0, a one-element array gives its
    /// element's value, unparseable strings and other kinds are NaN.
    pub fn as_float(&self) -> VarFloat {
        let arena = self.store.arena();
        match arena.body(self.cell) {
            Body::Float(f) => *f,
            Body::Integer(i) => VarFloat::from(*i),
            Body::Boolean(b) => VarFloat::from(u8::from(*b)),
            Body::Null => 0.0,
            Body::Name {
                key: KeyRef::Int(i),
                ..
            } => VarFloat::from(*i),
            Body::Str(_) | Body::FlatStr { .. } => {
                drop(arena);
                let bytes = self.to_bytes().unwrap_or_default();
                if bytes.is_empty() {
                    0.0
                } else {
                    parse_number(&bytes).unwrap_or(VarFloat::NAN)
                }
            }
            Body::Array { length: 0, .. } => 0.0,
            Body::Array { length: 1, .. } => {
                drop(arena);
                self.single_element().map_or(VarFloat::NAN, |v| v.as_float())
            }
            _ => VarFloat::NAN,
        }
    }

    /// Truthiness.
    pub fn as_bool(&self) -> bool {
        match self.kind() {
            Kind::String | Kind::FlatString => self.string_len().is_ok_and(|n| n != 0),
            Kind::Object | Kind::Array | Kind::Function | Kind::Root => true,
            Kind::Float => {
                let f = self.as_float();
                !f.is_nan() && f != 0.0
            }
            _ => self.as_int() != 0,
        }
    }

    fn single_element(&self) -> Option<Var> {
        self.array_get(0).ok().flatten()
    }
}

/// Parse a number the way string-to-number coercion does: surrounding
/// whitespace ignored, `0x` hex, `Infinity`, or a decimal float.
pub(crate) fn parse_number(bytes: &[u8]) -> Option<VarFloat> {
    let s = std::str::from_utf8(bytes).ok()?.trim();
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()? as VarFloat
    } else if body == "Infinity" {
        VarFloat::INFINITY
    } else if body.is_empty() || body.starts_with(['+', '-']) {
        return None;
    } else {
        body.parse::<VarFloat>().ok().filter(|f| f.is_finite())?
    };
    Some(if neg { -magnitude } else { magnitude })
}

impl Clone for Var {
    fn clone(&self) -> Self {
        self.store.lock(self.cell)
    }
}

impl Drop for Var {
    fn drop(&mut self) {
        self.store.arena_mut().unlock(self.cell);
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var({} {})", self.cell, self.kind())
    }
}
