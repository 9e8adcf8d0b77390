use thiserror::Error;

use nczarr_chunk_key_encoding::ChunkKeyEncoding;
use nczarr_metadata::{JsonKind, JsonObject, Metadata, MetadataError, MetadataHandlerKind};
use nczarr_shared::ErrorKind;
use nczarr_storage::{Map, MapError, MapImpl, MapMode, MapTraits, StoreKey, StoreKeyError};

use crate::config::global_config;
use crate::{create_map, open_map, MapParams};

/// A [`ZarrFile`] error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ZarrFileError {
    /// A map error.
    #[error(transparent)]
    MapError(#[from] MapError),
    /// A metadata error.
    #[error(transparent)]
    MetadataError(#[from] MetadataError),
    /// An invalid node path.
    #[error(transparent)]
    InvalidPath(#[from] StoreKeyError),
}

impl ZarrFileError {
    /// Returns the [`ErrorKind`] of the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MapError(err) => err.kind(),
            Self::MetadataError(err) => err.kind(),
            Self::InvalidPath(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// An open file: one map and the metadata dispatcher of its hierarchy.
///
/// The file exclusively owns its map until [`close`](ZarrFile::close).
pub struct ZarrFile {
    map: Map,
    metadata: Metadata,
}

impl core::fmt::Debug for ZarrFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ZarrFile")
            .field("implementation", &self.map.implementation())
            .field("path", &self.map.path())
            .field("mode", &self.map.mode())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl ZarrFile {
    /// Create a new file with a new map of `implementation` at `path`.
    ///
    /// The metadata handler is consolidated if the global [consolidated metadata on create](crate::config::Config#consolidated-metadata-on-create) configuration is enabled, otherwise per-key.
    ///
    /// # Errors
    /// Returns a [`ZarrFileError`] if the map cannot be created, or [`MetadataError::NotInitialized`] if [`initialize`](crate::initialize) has not been called.
    pub fn create(
        implementation: MapImpl,
        path: &str,
        mode: MapMode,
        params: MapParams,
    ) -> Result<Self, ZarrFileError> {
        let kind = if global_config().consolidated_metadata_on_create() {
            MetadataHandlerKind::Consolidated
        } else {
            MetadataHandlerKind::PerKey
        };
        let map = create_map(implementation, path, mode, params)?;
        let mut metadata = Metadata::new();
        metadata.select_metadata_handler(kind)?;
        metadata.create(&*map)?;
        log::debug!("created {implementation} file {path} with {kind} metadata");
        Ok(Self { map, metadata })
    }

    /// Open an existing file with the map of `implementation` at `path`.
    ///
    /// The metadata handler is chosen from the content of the map.
    ///
    /// # Errors
    /// Returns a [`ZarrFileError`] if the map cannot be opened or its metadata cannot be loaded, or [`MetadataError::NotInitialized`] if [`initialize`](crate::initialize) has not been called.
    pub fn open(
        implementation: MapImpl,
        path: &str,
        mode: MapMode,
        params: MapParams,
    ) -> Result<Self, ZarrFileError> {
        let map = open_map(implementation, path, mode, params)?;
        let mut metadata = Metadata::new();
        let kind = metadata.set_metadata_handler(&*map)?;
        metadata.open(&*map)?;
        log::debug!("opened {implementation} file {path} with {kind} metadata");
        Ok(Self { map, metadata })
    }

    /// Close the file.
    ///
    /// Pending metadata is flushed before the map is closed.
    /// If `delete` is true, the map and its content are removed instead.
    ///
    /// # Errors
    /// Returns a [`ZarrFileError`] if pending metadata cannot be written or the map cannot be closed.
    pub fn close(self, delete: bool) -> Result<(), ZarrFileError> {
        let Self { map, mut metadata } = self;
        if !delete {
            metadata.close(&*map)?;
        }
        map.close(delete)?;
        Ok(())
    }

    /// The map of the file.
    #[must_use]
    pub fn map(&self) -> &dyn MapTraits {
        &*self.map
    }

    /// The metadata of the file.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Return the metadata object of `kind` of the node at `node_path`.
    ///
    /// # Errors
    /// Returns a [`ZarrFileError`] if `node_path` is invalid or the metadata cannot be fetched. See [`Metadata::fetch_json_content`].
    pub fn fetch_json_content(
        &self,
        kind: JsonKind,
        node_path: &str,
    ) -> Result<JsonObject, ZarrFileError> {
        let key = kind.key(node_path)?;
        Ok(self.metadata.fetch_json_content(&*self.map, kind, &key)?)
    }

    /// Replace the metadata object of `kind` of the node at `node_path` with `json`.
    ///
    /// # Errors
    /// Returns a [`ZarrFileError`] if `node_path` is invalid or the metadata cannot be updated. See [`Metadata::update_json_content`].
    pub fn update_json_content(
        &mut self,
        kind: JsonKind,
        node_path: &str,
        json: serde_json::Value,
    ) -> Result<(), ZarrFileError> {
        let key = kind.key(node_path)?;
        Ok(self
            .metadata
            .update_json_content(&*self.map, kind, &key, json)?)
    }

    /// Write any pending metadata to the map.
    ///
    /// # Errors
    /// Returns a [`ZarrFileError`] if there is an underlying map error.
    pub fn consolidate(&mut self) -> Result<(), ZarrFileError> {
        Ok(self.metadata.consolidate(&*self.map)?)
    }

    /// Returns true if `path` names a key or any key lies under it.
    ///
    /// # Errors
    /// Returns a [`ZarrFileError`] if `path` is invalid or there is an underlying map error.
    pub fn exists(&self, path: &str) -> Result<bool, ZarrFileError> {
        Ok(self.metadata.exists(&*self.map, path)?)
    }

    /// The key of the chunk at `chunk_indices` of the array at `array_path`.
    ///
    /// Chunk indices are joined with the global [chunk key separator](crate::config::Config#chunk-key-separator).
    ///
    /// # Errors
    /// Returns [`ZarrFileError::InvalidPath`] if `array_path` is not a valid path.
    pub fn chunk_key(
        &self,
        array_path: &str,
        chunk_indices: &[u64],
    ) -> Result<StoreKey, ZarrFileError> {
        let encoding = ChunkKeyEncoding::new(global_config().chunk_key_separator());
        Ok(encoding.chunk_key(array_path, chunk_indices)?)
    }
}
