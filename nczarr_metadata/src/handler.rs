use derive_more::Display;

use nczarr_storage::{Bytes, MapTraits, StoreKey, StoreKeys, StorePrefix};

use crate::{parse_json_object, JsonObject, MetadataError};

/// The kind of a metadata handler.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
pub enum MetadataHandlerKind {
    /// Every metadata object is a separate key of the map.
    #[display("per_key")]
    PerKey,
    /// Metadata objects are held in the consolidated document at `.zmetadata`.
    #[display("consolidated")]
    Consolidated,
}

/// Metadata handler traits.
///
/// A handler does not own the map of its file, every operation is given the map instead.
pub trait MetadataHandlerTraits: core::fmt::Debug + Send + Sync {
    /// The kind of the handler.
    fn kind(&self) -> MetadataHandlerKind;

    /// Prepare the handler for an existing file.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if the existing metadata cannot be loaded.
    fn open(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError>;

    /// Prepare the handler for a new file.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if the handler cannot be initialised.
    fn create(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError>;

    /// Release the handler, flushing any pending metadata.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if pending metadata cannot be written.
    fn close(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError>;

    /// Write any pending metadata to the map.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if there is an underlying map error.
    fn consolidate(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError>;

    /// Return the metadata object at `key`.
    ///
    /// # Errors
    /// Returns [`MetadataError::NotFound`] if there is no metadata at `key`, [`MetadataError::Corrupt`] if it is not a JSON object,
    /// or another [`MetadataError`] if there is an underlying map error.
    fn fetch_json_content(
        &self,
        map: &dyn MapTraits,
        key: &StoreKey,
    ) -> Result<JsonObject, MetadataError>;

    /// Replace the metadata object at `key`.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if there is an underlying map error.
    fn update_json_content(
        &mut self,
        map: &dyn MapTraits,
        key: &StoreKey,
        json: JsonObject,
    ) -> Result<(), MetadataError>;

    /// Return the sorted names of the immediate children of `prefix`.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if there is an underlying map error.
    fn list(&self, map: &dyn MapTraits, prefix: &StorePrefix)
        -> Result<Vec<String>, MetadataError>;

    /// Return every key under `prefix`, sorted.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if there is an underlying map error.
    fn list_all(&self, map: &dyn MapTraits, prefix: &StorePrefix)
        -> Result<StoreKeys, MetadataError>;

    /// Returns true if `key` exists or any key lies under it.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if there is an underlying map error.
    fn exists(&self, map: &dyn MapTraits, key: &StoreKey) -> Result<bool, MetadataError> {
        Ok(self.list_all(map, &key.parent())?.contains(key)
            || !self.list_all(map, &key.to_prefix())?.is_empty())
    }
}

/// A metadata handler reading and writing each metadata object as a separate key.
#[derive(Debug, Default)]
pub struct PerKeyMetadataHandler;

impl PerKeyMetadataHandler {
    /// Create a new per-key metadata handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MetadataHandlerTraits for PerKeyMetadataHandler {
    fn kind(&self) -> MetadataHandlerKind {
        MetadataHandlerKind::PerKey
    }

    fn open(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        log::debug!("opened per-key metadata of {}", map.path());
        Ok(())
    }

    fn create(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        log::debug!("created per-key metadata of {}", map.path());
        Ok(())
    }

    fn close(&mut self, _map: &dyn MapTraits) -> Result<(), MetadataError> {
        Ok(())
    }

    fn consolidate(&mut self, _map: &dyn MapTraits) -> Result<(), MetadataError> {
        Ok(())
    }

    fn fetch_json_content(
        &self,
        map: &dyn MapTraits,
        key: &StoreKey,
    ) -> Result<JsonObject, MetadataError> {
        let bytes = map.get(key).map_err(|err| match err {
            nczarr_storage::MapError::KeyNotFound(key) => MetadataError::NotFound(key),
            err => err.into(),
        })?;
        parse_json_object(key, &bytes)
    }

    fn update_json_content(
        &mut self,
        map: &dyn MapTraits,
        key: &StoreKey,
        json: JsonObject,
    ) -> Result<(), MetadataError> {
        let bytes = serde_json::to_vec(&json)
            .map_err(|err| MetadataError::Corrupt(format!("{key}: {err}")))?;
        map.set(key, Bytes::from(bytes))?;
        Ok(())
    }

    fn list(
        &self,
        map: &dyn MapTraits,
        prefix: &StorePrefix,
    ) -> Result<Vec<String>, MetadataError> {
        Ok(map.list(prefix)?)
    }

    fn list_all(
        &self,
        map: &dyn MapTraits,
        prefix: &StorePrefix,
    ) -> Result<StoreKeys, MetadataError> {
        Ok(map.list_all(prefix)?)
    }

    fn exists(&self, map: &dyn MapTraits, key: &StoreKey) -> Result<bool, MetadataError> {
        Ok(map.exists(key)? || !map.list_all(&key.to_prefix())?.is_empty())
    }
}
