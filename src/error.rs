//! The crate-wide error type.
//!
//! Following the error-handling shape used throughout this codebase
//! (see e.g. `io::OpenFastqError`), each variant is a plain struct/tuple
//! carrying just the context needed to explain the failure, with manual
//! [`Display`] and [`std::error::Error`] impls rather than a derive macro.

use std::fmt;

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the alignment core.
///
/// `DegenerateQuery` is included for completeness, but it is never
/// returned as an `Err` by any public function: a degenerate query is
/// resolved into a placeholder alignment record at the point of
/// detection instead.
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// A molecule's label sequence was not strictly non-decreasing, or did
    /// not end with a terminal marker equal to its length.
    MalformedInput { molecule_id: u64, reason: &'static str },
    /// A query had fewer labels than the signature window or `min_labels`.
    /// Never surfaced to a caller; see the module docs.
    DegenerateQuery { molecule_id: u64 },
    /// The chainer traced back to a reference id absent from the posting
    /// list it was built from. This indicates a corrupted index and the
    /// query aborts with a placeholder record rather than panicking.
    IndexInconsistency { reference_id: u64 },
    /// DTW was invoked with an empty query or target gap sequence.
    DtwEmpty,
    /// An I/O failure while loading molecules/reference maps or writing
    /// output records.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedInput { molecule_id, reason } => {
                write!(f, "molecule {molecule_id} has a malformed label sequence: {reason}")
            }
            Error::DegenerateQuery { molecule_id } => {
                write!(f, "query molecule {molecule_id} has too few labels to align")
            }
            Error::IndexInconsistency { reference_id } => {
                write!(f, "chainer traced back to reference {reference_id}, which is absent from the index")
            }
            Error::DtwEmpty => write!(f, "DTW was invoked with an empty query or target sequence"),
            Error::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}
