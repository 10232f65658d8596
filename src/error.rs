use thiserror::Error;

/// Errors returned by map lookups and deletions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The key is not present in the map.
    ///
    /// Either the map was empty, or the probe walk for the key reached an
    /// empty slot (or ran out of slots) before finding a match.
    #[error("key not found")]
    KeyNotFound,
}

/// A specialized `Result` type for map operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = core::result::Result<T, Error>;
