//! # Error Types
//!
//! This module defines the error type used throughout the library.
//! All operations return [`Result<T, AtcError>`](AtcError); nothing in the
//! lock/unlock pipeline panics or unwinds on malformed input.

use thiserror::Error;

/// The error type for all AttacheCase container operations.
#[derive(Error, Debug)]
pub enum AtcError {
    /// I/O error on the underlying byte stream.
    ///
    /// Wraps [`std::io::Error`]; a truncated container surfaces here as
    /// [`std::io::ErrorKind::UnexpectedEof`].
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The supplied key buffer is all zero bytes.
    #[error("Key error: key is empty")]
    NullKey,

    /// The first decrypted manifest block does not carry the expected marker.
    ///
    /// This is the only password check the format has; there is no MAC.
    #[error("Wrong key: manifest marker not found after decryption")]
    WrongKey,

    /// The container carries the self-destructed token.
    #[error("Archive has been destroyed")]
    DestroyedArchive,

    /// Neither a plain header nor an embedded (self-extracting) archive was found.
    #[error("Unrecognized format: not an encrypted archive")]
    UnrecognizedFormat,

    /// Format version newer than supported, or from an unrelated container family.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(i32),

    /// The manifest decrypted but could not be parsed.
    #[error("Broken header: {0}")]
    BrokenHeader(String),

    /// Writer-side entry rejected (empty name, or added after the header).
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Reader-side entry lookup out of range.
    #[error("Invalid index: {index} (entries: {len})")]
    InvalidIndex { index: usize, len: usize },

    /// The zlib codec reported an unrecoverable fault.
    #[error("Codec error: {0}")]
    Codec(String),

    /// An operation was called in the wrong session state.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),
}

impl From<flate2::CompressError> for AtcError {
    fn from(err: flate2::CompressError) -> Self {
        AtcError::Codec(err.to_string())
    }
}

impl From<flate2::DecompressError> for AtcError {
    fn from(err: flate2::DecompressError) -> Self {
        AtcError::Codec(err.to_string())
    }
}
