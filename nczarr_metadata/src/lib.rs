//! The metadata dispatcher for the [`nczarr`](https://docs.rs/nczarr/latest/nczarr/index.html) crate.
//!
//! Zarr V2 metadata is stored as JSON objects under the keys `.zgroup`, `.zarray` and `.zattrs` of each node.
//! A map may additionally hold a consolidated document at `.zmetadata` which aggregates every metadata object of the hierarchy:
//! ```json
//! {
//!     "zarr_consolidated_format": 1,
//!     "metadata": {
//!         ".zgroup": {"zarr_format": 2},
//!         "g/.zattrs": {"x": 1}
//!     }
//! }
//! ```
//!
//! [`Metadata`] presents both layouts through one interface.
//! A metadata handler is chosen once per open file, either by inspecting the map ([`Metadata::set_metadata_handler`]) or explicitly on create ([`Metadata::select_metadata_handler`]).
//! Handlers are plugins held in a process-wide registry populated by [`initialize`] and emptied by [`finalize`].
//!
//! ## Licence
//! `nczarr_metadata` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod consolidated;
mod handler;
mod metadata;
mod registry;

use derive_more::Display;
use thiserror::Error;

use nczarr_shared::ErrorKind;
use nczarr_storage::{MapError, StoreKey, StoreKeyError};

pub use consolidated::{
    ConsolidatedMetadata, ConsolidatedMetadataHandler, CONSOLIDATED_FORMAT, ZMETADATA_KEY,
    ZMETADATA_TMP_KEY,
};
pub use handler::{MetadataHandlerKind, MetadataHandlerTraits, PerKeyMetadataHandler};
pub use metadata::Metadata;
pub use registry::{
    finalize, initialize, is_initialized, register_metadata_handler,
    unregister_metadata_handler, MetadataHandlerPlugin, MetadataHandlerRegistryHandle,
};

/// A JSON object.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// The kind of a metadata object, identified by the last component of its key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
pub enum JsonKind {
    /// Group metadata (`.zgroup`).
    #[display(".zgroup")]
    Group,
    /// Array metadata (`.zarray`).
    #[display(".zarray")]
    Array,
    /// User attributes (`.zattrs`).
    #[display(".zattrs")]
    Attributes,
}

impl JsonKind {
    /// The key name of this kind of metadata object.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Group => ".zgroup",
            Self::Array => ".zarray",
            Self::Attributes => ".zattrs",
        }
    }

    /// The key of this kind of metadata object for the node at `node_path`.
    ///
    /// Leading and trailing `/` of `node_path` are ignored, and an empty path is the root.
    ///
    /// # Errors
    /// Returns a [`StoreKeyError`] if `node_path` has empty, `.` or `..` components.
    pub fn key(&self, node_path: &str) -> Result<StoreKey, StoreKeyError> {
        let node_path = node_path.trim_matches('/');
        if node_path.is_empty() {
            StoreKey::new(self.name())
        } else {
            StoreKey::new(format!("{node_path}/{}", self.name()))
        }
    }

    /// Returns true if the last component of `key` names this kind.
    #[must_use]
    pub fn matches(&self, key: &StoreKey) -> bool {
        key.name() == self.name()
    }
}

/// A metadata error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum MetadataError {
    /// The metadata handler registry is not initialized.
    #[error("the metadata handler registry is not initialized")]
    NotInitialized,
    /// A metadata handler is already set.
    #[error("a metadata handler is already set to {0}")]
    HandlerAlreadySet(MetadataHandlerKind),
    /// No metadata handler is set.
    #[error("no metadata handler is set")]
    HandlerNotSet,
    /// No registered metadata handler matches.
    #[error("no registered metadata handler matches {0}")]
    UnknownHandler(String),
    /// The key does not name the requested kind of metadata.
    #[error("key {key} is not {kind} metadata")]
    KindMismatch {
        /// The key.
        key: StoreKey,
        /// The requested kind.
        kind: JsonKind,
    },
    /// Metadata must be a JSON object.
    #[error("metadata for key {0} is not a JSON object")]
    NotAnObject(StoreKey),
    /// A metadata object does not exist.
    #[error("metadata {0} not found")]
    NotFound(StoreKey),
    /// Metadata is not valid JSON or does not have the expected structure.
    #[error("corrupt metadata: {0}")]
    Corrupt(String),
    /// An invalid node path.
    #[error(transparent)]
    InvalidPath(#[from] StoreKeyError),
    /// A map error.
    #[error(transparent)]
    MapError(#[from] MapError),
}

impl MetadataError {
    /// Returns the [`ErrorKind`] of the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized
            | Self::HandlerAlreadySet(_)
            | Self::HandlerNotSet
            | Self::KindMismatch { .. }
            | Self::NotAnObject(_)
            | Self::InvalidPath(_) => ErrorKind::InvalidArgument,
            Self::UnknownHandler(_) => ErrorKind::NotSupported,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Corrupt(_) => ErrorKind::Corrupt,
            Self::MapError(err) => err.kind(),
        }
    }
}

/// Parse a metadata object read from `key`.
pub(crate) fn parse_json_object(
    key: &StoreKey,
    bytes: &[u8],
) -> Result<JsonObject, MetadataError> {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(serde_json::Value::Object(object)) => Ok(object),
        Ok(_) => Err(MetadataError::Corrupt(format!("{key} is not a JSON object"))),
        Err(err) => Err(MetadataError::Corrupt(format!("{key}: {err}"))),
    }
}
