//! The map API for the [`nczarr`](https://docs.rs/nczarr/latest/nczarr/index.html) crate.
//!
//! A map is a key/value object store addressed by `/` separated [`StoreKey`]s.
//! Values are byte sequences which are read and written by byte range.
//! Every backend (in-memory, filesystem, object store) implements [`MapTraits`] and is created or opened through [`MapBackend`].
//!
//! This crate includes the in-memory backend [`MemoryMap`](map::MemoryMap) and the [`PerformanceMetricsMapAdapter`](map_adapter::performance_metrics::PerformanceMetricsMapAdapter).
//!
//! ## Licence
//! `nczarr_storage` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod byte_range;
pub mod map;
pub mod map_adapter;
mod map_sync;
mod store_key;
mod store_prefix;

#[cfg(any(test, feature = "tests"))]
/// Map test utilities (for external backend development).
pub mod map_test;

use std::collections::TryReserveError;
use std::str::FromStr;
use std::sync::Arc;

use derive_more::Display;
use thiserror::Error;

use nczarr_shared::ErrorKind;

use byte_range::InvalidByteRangeError;

pub use map_sync::{
    child_names, validate_write_count, ListableMapTraits, MapBackend, MapTraits,
    ReadableMapTraits, WritableMapTraits,
};
pub use store_key::{StoreKey, StoreKeyError, StoreKeys};
pub use store_prefix::{StorePrefix, StorePrefixError, StorePrefixes};

/// An open map of any backend.
pub type Map = Box<dyn MapTraits>;

/// The type for bytes returned by map reads.
///
/// An alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// The access mode of a map.
///
/// The default mode is read only without overwrite.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct MapMode {
    writable: bool,
    overwrite: bool,
}

impl MapMode {
    /// A read only mode.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            writable: false,
            overwrite: false,
        }
    }

    /// A read and write mode.
    #[must_use]
    pub const fn read_write() -> Self {
        Self {
            writable: true,
            overwrite: false,
        }
    }

    /// Set whether an existing map is replaced on create (clobber).
    #[must_use]
    pub const fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set whether the map is writable.
    #[must_use]
    pub const fn with_writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Returns true if the map is writable.
    #[must_use]
    pub const fn writable(&self) -> bool {
        self.writable
    }

    /// Returns true if an existing map is replaced on create.
    #[must_use]
    pub const fn overwrite(&self) -> bool {
        self.overwrite
    }
}

/// The backend implementing a map.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
pub enum MapImpl {
    /// The in-memory backend.
    #[display("mem")]
    Memory,
    /// The filesystem backend.
    #[display("file")]
    File,
    /// The object store backend.
    #[display("object_store")]
    ObjectStore,
}

impl FromStr for MapImpl {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mem" | "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "object_store" | "s3" => Ok(Self::ObjectStore),
            _ => Err(MapError::UnknownImplementation(s.to_string())),
        }
    }
}

/// A map error.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum MapError {
    /// A write operation was attempted on a read only map.
    #[error("a write operation was attempted on a read only map")]
    ReadOnly,
    /// A key does not exist.
    #[error("key {0} not found")]
    KeyNotFound(StoreKey),
    /// There is no map at a path.
    #[error("no map found at {0}")]
    MapNotFound(String),
    /// A map already exists at a path.
    #[error("a map already exists at {0}")]
    MapExists(String),
    /// A byte range extends beyond the end of a value.
    #[error("{1} for key {0}")]
    OutOfRange(StoreKey, InvalidByteRangeError),
    /// The write count does not match the number of bytes supplied.
    #[error("write count {count} does not match the length {len} of the bytes")]
    CountMismatch {
        /// The requested count.
        count: u64,
        /// The number of bytes supplied.
        len: usize,
    },
    /// An invalid store key.
    #[error(transparent)]
    InvalidStoreKey(#[from] StoreKeyError),
    /// An invalid store prefix.
    #[error(transparent)]
    InvalidStorePrefix(#[from] StorePrefixError),
    /// An invalid map path.
    #[error("invalid map path {0}")]
    InvalidPath(String),
    /// An unknown map implementation tag.
    #[error("unknown map implementation {0}")]
    UnknownImplementation(String),
    /// The requested operation is not supported by the backend.
    #[error("{0}")]
    Unsupported(String),
    /// An allocation failure.
    #[error(transparent)]
    OutOfMemory(#[from] TryReserveError),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl MapError {
    /// Returns the [`ErrorKind`] of the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReadOnly => ErrorKind::PermissionDenied,
            Self::KeyNotFound(_) | Self::MapNotFound(_) => ErrorKind::NotFound,
            Self::MapExists(_) => ErrorKind::AlreadyExists,
            Self::OutOfRange(..) => ErrorKind::OutOfRange,
            Self::CountMismatch { .. }
            | Self::InvalidStoreKey(_)
            | Self::InvalidStorePrefix(_)
            | Self::InvalidPath(_)
            | Self::UnknownImplementation(_) => ErrorKind::InvalidArgument,
            Self::Unsupported(_) => ErrorKind::NotSupported,
            Self::OutOfMemory(_) => ErrorKind::OutOfMemory,
            Self::IOError(err) => ErrorKind::from_io(err),
            Self::Other(_) => ErrorKind::IOError,
        }
    }
}

impl From<std::io::Error> for MapError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for MapError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for MapError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Allocate a zeroed buffer of `count` bytes for a read.
///
/// # Errors
/// Returns [`MapError::OutOfMemory`] if the allocation fails, or [`MapError::Other`] if `count` does not fit in memory.
pub fn read_buffer(count: u64) -> Result<Vec<u8>, MapError> {
    let count = usize::try_from(count)
        .map_err(|_| MapError::Other(format!("read of {count} bytes exceeds the address space")))?;
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(count)?;
    buffer.resize(count, 0);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_impl_from_str() {
        assert_eq!("mem".parse::<MapImpl>().unwrap(), MapImpl::Memory);
        assert_eq!("file".parse::<MapImpl>().unwrap(), MapImpl::File);
        assert_eq!("s3".parse::<MapImpl>().unwrap(), MapImpl::ObjectStore);
        assert_eq!(MapImpl::ObjectStore.to_string(), "object_store");
        let err = "zip".parse::<MapImpl>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn map_mode() {
        let mode = MapMode::default();
        assert!(!mode.writable());
        assert!(!mode.overwrite());
        let mode = MapMode::read_write().with_overwrite(true);
        assert!(mode.writable());
        assert!(mode.overwrite());
        assert!(!mode.with_writable(false).writable());
    }

    #[test]
    fn map_error_kind() {
        assert_eq!(MapError::ReadOnly.kind(), ErrorKind::PermissionDenied);
        let err = MapError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = MapError::Unsupported("partial write".to_string());
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert_eq!(read_buffer(3).unwrap(), vec![0; 3]);
    }
}
