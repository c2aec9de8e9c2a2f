use crate::oid::{InvalidOid, Oid};

/// Corruption found while decoding a compressed object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// No header delimiter, or the header is not `<kind> <len>`.
    #[error("malformed object header: {0}")]
    MalformedHeader(String),

    /// The zlib stream could not be inflated.
    #[error("corrupt compressed content: {0}")]
    CorruptContent(String),

    /// The header's declared length disagrees with the body.
    #[error("body size mismatch: declared {declared}, actual {actual}")]
    SizeMismatch { declared: usize, actual: usize },
}

/// Errors from store, source and codec operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A malformed identifier was supplied or found in stored data.
    #[error("invalid object id: {0:?}")]
    InvalidId(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Content hashes to a different id than the one it was stored under.
    #[error("hash mismatch: expected {expected}, content hashes to {actual}")]
    HashMismatch { expected: Oid, actual: Oid },

    /// A graph edge points at an object the store does not have.
    #[error("git object {0} required but not found")]
    MissingObject(Oid),

    #[error("unsafe ref name: {0:?}")]
    UnsafeRefName(String),

    /// The external git process failed or produced unexpected output.
    #[error("object source error: {0}")]
    Source(String),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InvalidOid> for Error {
    fn from(value: InvalidOid) -> Self {
        Self::InvalidId(value.0)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
