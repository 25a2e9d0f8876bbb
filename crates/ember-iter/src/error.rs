//! Iterator and walker error types.

use std::error::Error;
use std::fmt;

use ember_core::Kind;
use ember_store::StoreError;

/// Errors from constructing or driving an iterator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IterError {
    /// The unified iterator was asked to walk a kind it cannot walk.
    NotIterable {
        /// The kind that was offered.
        kind: Kind,
    },
    /// A kind-specific iterator was opened over the wrong kind.
    WrongKind {
        /// What the iterator accepts.
        expected: &'static str,
        /// What it was given.
        found: Kind,
    },
    /// The store could not satisfy a request.
    Store(StoreError),
}

impl fmt::Display for IterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotIterable { kind } => write!(f, "cannot iterate over {kind}"),
            Self::WrongKind { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl Error for IterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for IterError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Errors from the value walker.
///
/// Callbacks already delivered before the error stay delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalkError {
    /// An object that is not of the form `{data: ..., count: N}`.
    UnexpectedShape {
        /// Kind of the offending value.
        kind: Kind,
    },
    /// A value that is neither numeric nor iterable.
    NotIterable {
        /// Kind of the offending value.
        kind: Kind,
    },
    /// An array hole or unset name, which carries no value to walk.
    Undefined,
    /// Nesting went deeper than the walker allows.
    DepthExceeded {
        /// The configured limit.
        max_depth: usize,
    },
    /// The underlying iteration failed.
    Iter(IterError),
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedShape { kind } => write!(
                f,
                "if specifying an object, it must be of the form {{data : ..., count : N}} (got {kind})"
            ),
            Self::NotIterable { kind } => {
                write!(f, "expecting a number or something iterable, got {kind}")
            }
            Self::Undefined => f.write_str("expecting a number or something iterable, got undefined"),
            Self::DepthExceeded { max_depth } => {
                write!(f, "nesting deeper than {max_depth} levels")
            }
            Self::Iter(e) => write!(f, "iteration failed: {e}"),
        }
    }
}

impl Error for WalkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Iter(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IterError> for WalkError {
    fn from(e: IterError) -> Self {
        Self::Iter(e)
    }
}

impl From<StoreError> for WalkError {
    fn from(e: StoreError) -> Self {
        Self::Iter(IterError::Store(e))
    }
}
