//! Shared types for the `nczarr` crates.
//!
//! ## Licence
//! `nczarr_shared` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

use derive_more::Display;

/// The category of an error raised by any `nczarr` component.
///
/// Every error type in the workspace can be classified into one of these kinds with a `kind()` method,
/// so that callers can branch on the failure category without matching crate-specific variants.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
pub enum ErrorKind {
    /// A malformed slice, stride, rank, key or argument.
    #[display("invalid argument")]
    InvalidArgument,
    /// A missing key, chunk, store or metadata entry.
    #[display("not found")]
    NotFound,
    /// The target already exists.
    #[display("already exists")]
    AlreadyExists,
    /// A ranged access past the end of an object.
    #[display("out of range")]
    OutOfRange,
    /// The backend cannot perform the operation.
    #[display("not supported")]
    NotSupported,
    /// A backend I/O failure.
    #[display("I/O error")]
    IOError,
    /// The store or handle does not permit the operation.
    #[display("permission denied")]
    PermissionDenied,
    /// An allocation failed.
    #[display("out of memory")]
    OutOfMemory,
    /// Malformed JSON or an inconsistent consolidated document.
    #[display("corrupt")]
    Corrupt,
}

impl ErrorKind {
    /// Classify a [`std::io::Error`].
    #[must_use]
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::OutOfMemory => Self::OutOfMemory,
            std::io::ErrorKind::UnexpectedEof => Self::OutOfRange,
            std::io::ErrorKind::InvalidInput => Self::InvalidArgument,
            _ => Self::IOError,
        }
    }
}
