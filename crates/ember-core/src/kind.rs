//! The public kind tag of a cell.

use std::fmt;

/// What a live cell holds.
///
/// Every cell in the store carries exactly one kind. `StringExt` and
/// `FlatData` cells are owned by the string that links to them and are
/// never referenced directly by user code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// The global scope object.
    Root,
    /// A plain object with named children.
    Object,
    /// An array; children are names with integer keys.
    Array,
    /// A function used as a namespace for named children.
    Function,
    /// A typed view over a backing byte string.
    ArrayBuffer,
    /// A 32-bit integer.
    Integer,
    /// A 64-bit float.
    Float,
    /// `true` or `false`.
    Boolean,
    /// `null`.
    Null,
    /// The head fragment of a chained string.
    String,
    /// A continuation fragment of a chained string.
    StringExt,
    /// The length header of a flat string.
    FlatString,
    /// A data block following a flat string header.
    FlatData,
    /// A key/value link owned by a composite.
    Name,
    /// A pointer to native code plus its argument signature.
    NativeFunction,
}

impl Kind {
    /// Objects, arrays, functions and the root: anything with named children.
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Root | Self::Object | Self::Array | Self::Function)
    }

    /// Integers, floats and booleans.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Boolean)
    }

    /// Whether a string iterator can be opened over this cell.
    pub fn has_char_data(self) -> bool {
        matches!(self, Self::String | Self::FlatString)
    }

    /// Kinds the unified iterator accepts.
    pub fn is_iterable(self) -> bool {
        self.is_composite() || self == Self::ArrayBuffer || self.has_char_data()
    }

    /// Cells that live only as part of another cell's storage.
    pub fn is_owned_storage(self) -> bool {
        matches!(self, Self::StringExt | Self::FlatData)
    }

    /// Short lowercase name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Object => "object",
            Self::Array => "array",
            Self::Function => "function",
            Self::ArrayBuffer => "arraybuffer",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::String => "string",
            Self::StringExt => "string-ext",
            Self::FlatString => "flat-string",
            Self::FlatData => "flat-data",
            Self::Name => "name",
            Self::NativeFunction => "native-function",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_iterable_but_numbers_are_not() {
        assert!(Kind::String.is_iterable());
        assert!(Kind::FlatString.is_iterable());
        assert!(!Kind::Integer.is_iterable());
        assert!(!Kind::StringExt.is_iterable());
    }

    #[test]
    fn root_iterates_like_an_object() {
        assert!(Kind::Root.is_composite());
        assert!(Kind::Root.is_iterable());
    }

    #[test]
    fn booleans_count_as_numeric() {
        assert!(Kind::Boolean.is_numeric());
        assert!(!Kind::Null.is_numeric());
    }
}
