use std::error;
use std::fmt;

/// Errors surfaced by vector and transient operations.
///
/// All failures are reported to the caller at the API boundary; nothing is
/// retried internally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An index or slice bound lies beyond the end of the vector.
    OutOfRange { index: usize, len: usize },
    /// `peek` or `pop` was called on an empty vector.
    Empty,
    /// A transient was used after freezing, frozen twice, or touched from a
    /// thread other than the one that created it.
    MisusedTransient,
    /// The structural validator found a broken invariant. Produced only by
    /// `Vector::validate`; never returned by normal operations.
    InvariantViolated(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange { index, len } => {
                write!(f, "index {} out of range for vector of length {}", index, len)
            }
            Error::Empty => write!(f, "empty vector"),
            Error::MisusedTransient => {
                write!(f, "transient used after freeze or from a foreign thread")
            }
            Error::InvariantViolated(detail) => write!(f, "tree invariant violated: {}", detail),
        }
    }
}

impl error::Error for Error {}
