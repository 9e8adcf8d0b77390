use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use nczarr_storage::{child_names, Bytes, MapError, MapTraits, StoreKey, StoreKeys, StorePrefix};

use crate::{JsonObject, MetadataError, MetadataHandlerKind, MetadataHandlerTraits};

/// The key of the consolidated metadata document.
pub const ZMETADATA_KEY: &str = ".zmetadata";

/// The key a consolidated metadata document is written to before it is renamed to [`ZMETADATA_KEY`].
pub const ZMETADATA_TMP_KEY: &str = ".zmetadata.tmp";

/// The supported consolidated metadata format version.
pub const CONSOLIDATED_FORMAT: u64 = 1;

/// A consolidated metadata document.
///
/// The `metadata` field maps the key of every metadata object of the hierarchy to its content.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ConsolidatedMetadata {
    /// The format version. Must be `1`.
    pub zarr_consolidated_format: u64,
    /// A mapping from metadata key to metadata object.
    pub metadata: JsonObject,
}

impl Default for ConsolidatedMetadata {
    fn default() -> Self {
        Self {
            zarr_consolidated_format: CONSOLIDATED_FORMAT,
            metadata: JsonObject::default(),
        }
    }
}

/// A metadata handler serving metadata objects from the consolidated document at `.zmetadata`.
///
/// The document is loaded on open and held in memory, so fetches perform no map access.
/// Updates are held in memory until [`consolidate`](MetadataHandlerTraits::consolidate) or close.
#[derive(Debug, Default)]
pub struct ConsolidatedMetadataHandler {
    document: ConsolidatedMetadata,
    dirty_keys: BTreeSet<StoreKey>,
    dirty: bool,
}

impl ConsolidatedMetadataHandler {
    /// Create a new consolidated metadata handler with an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The in-memory consolidated document.
    #[must_use]
    pub fn document(&self) -> &ConsolidatedMetadata {
        &self.document
    }

    /// Returns true if the in-memory document has changes not yet written to the map.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn keys(&self) -> StoreKeys {
        let mut keys: StoreKeys = self
            .document
            .metadata
            .keys()
            .filter_map(|key| match StoreKey::new(key.as_str()) {
                Ok(key) => Some(key),
                Err(err) => {
                    log::warn!("skipping consolidated metadata entry: {err}");
                    None
                }
            })
            .collect();
        keys.sort();
        keys
    }
}

fn to_json_bytes<T: Serialize>(key: &str, value: &T) -> Result<Bytes, MetadataError> {
    serde_json::to_vec_pretty(value)
        .map(Bytes::from)
        .map_err(|err| MetadataError::Corrupt(format!("{key}: {err}")))
}

impl MetadataHandlerTraits for ConsolidatedMetadataHandler {
    fn kind(&self) -> MetadataHandlerKind {
        MetadataHandlerKind::Consolidated
    }

    fn open(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        let key = StoreKey::new(ZMETADATA_KEY)?;
        let bytes = map.get(&key).map_err(|err| match err {
            MapError::KeyNotFound(key) => MetadataError::NotFound(key),
            err => err.into(),
        })?;
        let document: ConsolidatedMetadata = serde_json::from_slice(&bytes)
            .map_err(|err| MetadataError::Corrupt(format!("{ZMETADATA_KEY}: {err}")))?;
        if document.zarr_consolidated_format != CONSOLIDATED_FORMAT {
            log::warn!(
                "unknown consolidated metadata format {} in {}, expected {CONSOLIDATED_FORMAT}",
                document.zarr_consolidated_format,
                map.path()
            );
        }
        log::debug!(
            "opened consolidated metadata of {} with {} entries",
            map.path(),
            document.metadata.len()
        );
        self.document = document;
        self.dirty_keys.clear();
        self.dirty = false;
        Ok(())
    }

    fn create(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        log::debug!("created consolidated metadata of {}", map.path());
        self.document = ConsolidatedMetadata::default();
        self.dirty_keys.clear();
        self.dirty = true;
        Ok(())
    }

    fn close(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        if self.dirty {
            self.consolidate(map)?;
        }
        Ok(())
    }

    /// Write the updated metadata objects under their own keys, then replace `.zmetadata` by writing `.zmetadata.tmp` and renaming it.
    fn consolidate(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        for key in &self.dirty_keys {
            if let Some(value) = self.document.metadata.get(key.as_str()) {
                map.set(key, to_json_bytes(key.as_str(), value)?)?;
            }
        }
        let tmp_key = StoreKey::new(ZMETADATA_TMP_KEY)?;
        map.set(&tmp_key, to_json_bytes(ZMETADATA_KEY, &self.document)?)?;
        map.rename(&tmp_key, &StoreKey::new(ZMETADATA_KEY)?)?;
        log::debug!(
            "consolidated {} metadata objects of {}",
            self.document.metadata.len(),
            map.path()
        );
        self.dirty_keys.clear();
        self.dirty = false;
        Ok(())
    }

    fn fetch_json_content(
        &self,
        _map: &dyn MapTraits,
        key: &StoreKey,
    ) -> Result<JsonObject, MetadataError> {
        match self.document.metadata.get(key.as_str()) {
            Some(serde_json::Value::Object(object)) => Ok(object.clone()),
            Some(_) => Err(MetadataError::Corrupt(format!(
                "consolidated metadata entry {key} is not a JSON object"
            ))),
            None => Err(MetadataError::NotFound(key.clone())),
        }
    }

    fn update_json_content(
        &mut self,
        map: &dyn MapTraits,
        key: &StoreKey,
        json: JsonObject,
    ) -> Result<(), MetadataError> {
        if !map.mode().writable() {
            return Err(MapError::ReadOnly.into());
        }
        self.document
            .metadata
            .insert(key.to_string(), serde_json::Value::Object(json));
        self.dirty_keys.insert(key.clone());
        self.dirty = true;
        Ok(())
    }

    fn list(
        &self,
        map: &dyn MapTraits,
        prefix: &StorePrefix,
    ) -> Result<Vec<String>, MetadataError> {
        Ok(child_names(prefix, &self.list_all(map, prefix)?))
    }

    fn list_all(
        &self,
        _map: &dyn MapTraits,
        prefix: &StorePrefix,
    ) -> Result<StoreKeys, MetadataError> {
        Ok(self
            .keys()
            .into_iter()
            .filter(|key| key.has_prefix(prefix))
            .collect())
    }

    fn exists(&self, _map: &dyn MapTraits, key: &StoreKey) -> Result<bool, MetadataError> {
        let prefix = key.to_prefix();
        Ok(self.document.metadata.contains_key(key.as_str())
            || self.keys().iter().any(|k| k.has_prefix(&prefix)))
    }
}
