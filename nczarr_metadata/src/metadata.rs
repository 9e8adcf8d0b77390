use nczarr_storage::{MapTraits, StoreKey, StoreKeys, StorePrefix};

use crate::registry::{create_metadata_handler, match_metadata_handler};
use crate::{JsonKind, JsonObject, MetadataError, MetadataHandlerKind, MetadataHandlerTraits};

/// The metadata of an open file.
///
/// A handler is set exactly once, with [`set_metadata_handler`](Metadata::set_metadata_handler) when opening an existing file
/// or [`select_metadata_handler`](Metadata::select_metadata_handler) when creating a new one, and kept until the file is closed.
/// Every other operation fails with [`MetadataError::HandlerNotSet`] before then.
///
/// The map is not owned, it is passed to every operation.
///
/// ```
/// # use nczarr_metadata::{JsonKind, Metadata, MetadataHandlerKind};
/// # use nczarr_storage::map::MemoryMap;
/// nczarr_metadata::initialize();
/// let map = MemoryMap::new();
/// let mut metadata = Metadata::new();
/// metadata.select_metadata_handler(MetadataHandlerKind::Consolidated)?;
/// metadata.create(&map)?;
/// let key = JsonKind::Group.key("")?;
/// metadata.update_json_content(&map, JsonKind::Group, &key, serde_json::json!({"zarr_format": 2}))?;
/// assert_eq!(metadata.fetch_json_content(&map, JsonKind::Group, &key)?["zarr_format"], 2);
/// metadata.close(&map)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct Metadata {
    handler: Option<Box<dyn MetadataHandlerTraits>>,
}

impl Metadata {
    /// Create metadata without a handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The kind of the handler, if set.
    #[must_use]
    pub fn handler_kind(&self) -> Option<MetadataHandlerKind> {
        self.handler.as_ref().map(|handler| handler.kind())
    }

    fn set_handler(&mut self, handler: Box<dyn MetadataHandlerTraits>) {
        self.handler = Some(handler);
    }

    fn check_unset(&self) -> Result<(), MetadataError> {
        match self.handler_kind() {
            Some(kind) => Err(MetadataError::HandlerAlreadySet(kind)),
            None => Ok(()),
        }
    }

    fn handler(&self) -> Result<&dyn MetadataHandlerTraits, MetadataError> {
        self.handler.as_deref().ok_or(MetadataError::HandlerNotSet)
    }

    fn handler_mut(&mut self) -> Result<&mut Box<dyn MetadataHandlerTraits>, MetadataError> {
        self.handler.as_mut().ok_or(MetadataError::HandlerNotSet)
    }

    /// Set the handler to the first registered handler applying to the content of `map`.
    ///
    /// With the built-in handlers, the consolidated handler is chosen if `map` has a `.zmetadata` key, otherwise the per-key handler.
    ///
    /// # Errors
    /// Returns
    ///  - [`MetadataError::HandlerAlreadySet`] if a handler is already set,
    ///  - [`MetadataError::NotInitialized`] if the registry is not initialized, or
    ///  - another [`MetadataError`] if the map cannot be inspected.
    pub fn set_metadata_handler(
        &mut self,
        map: &dyn MapTraits,
    ) -> Result<MetadataHandlerKind, MetadataError> {
        self.check_unset()?;
        let handler = match_metadata_handler(map)?;
        let kind = handler.kind();
        self.set_handler(handler);
        Ok(kind)
    }

    /// Set the handler to the registered handler of `kind`.
    ///
    /// # Errors
    /// Returns [`MetadataError::HandlerAlreadySet`] if a handler is already set, or [`MetadataError::NotInitialized`] if the registry is not initialized.
    pub fn select_metadata_handler(
        &mut self,
        kind: MetadataHandlerKind,
    ) -> Result<(), MetadataError> {
        self.check_unset()?;
        let handler = create_metadata_handler(&kind.to_string())?;
        log::debug!("selected {kind} metadata handler");
        self.set_handler(handler);
        Ok(())
    }

    /// Load the metadata of an existing file.
    ///
    /// # Errors
    /// Returns [`MetadataError::HandlerNotSet`] if no handler is set, or another [`MetadataError`] if the metadata cannot be loaded.
    pub fn open(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        self.handler_mut()?.open(map)
    }

    /// Initialise the metadata of a new file.
    ///
    /// # Errors
    /// Returns [`MetadataError::HandlerNotSet`] if no handler is set, or another [`MetadataError`] if the metadata cannot be initialised.
    pub fn create(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        self.handler_mut()?.create(map)
    }

    /// Flush any pending metadata.
    ///
    /// The handler stays set.
    ///
    /// # Errors
    /// Returns [`MetadataError::HandlerNotSet`] if no handler is set, or another [`MetadataError`] if pending metadata cannot be written.
    pub fn close(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        self.handler_mut()?.close(map)
    }

    /// Write any pending metadata to the map.
    ///
    /// # Errors
    /// Returns [`MetadataError::HandlerNotSet`] if no handler is set, or another [`MetadataError`] if there is an underlying map error.
    pub fn consolidate(&mut self, map: &dyn MapTraits) -> Result<(), MetadataError> {
        self.handler_mut()?.consolidate(map)
    }

    /// Return the metadata object of `kind` at `key`.
    ///
    /// # Errors
    /// Returns
    ///  - [`MetadataError::KindMismatch`] if the last component of `key` is not the name of `kind`,
    ///  - [`MetadataError::NotFound`] if there is no metadata at `key`,
    ///  - [`MetadataError::Corrupt`] if the metadata is not a JSON object, or
    ///  - another [`MetadataError`] if there is an underlying map error.
    pub fn fetch_json_content(
        &self,
        map: &dyn MapTraits,
        kind: JsonKind,
        key: &StoreKey,
    ) -> Result<JsonObject, MetadataError> {
        check_kind(kind, key)?;
        self.handler()?.fetch_json_content(map, key)
    }

    /// Replace the metadata object of `kind` at `key` with `json`.
    ///
    /// # Errors
    /// Returns
    ///  - [`MetadataError::KindMismatch`] if the last component of `key` is not the name of `kind`,
    ///  - [`MetadataError::NotAnObject`] if `json` is not a JSON object, or
    ///  - another [`MetadataError`] if there is an underlying map error.
    pub fn update_json_content(
        &mut self,
        map: &dyn MapTraits,
        kind: JsonKind,
        key: &StoreKey,
        json: serde_json::Value,
    ) -> Result<(), MetadataError> {
        check_kind(kind, key)?;
        let serde_json::Value::Object(json) = json else {
            return Err(MetadataError::NotAnObject(key.clone()));
        };
        self.handler_mut()?.update_json_content(map, key, json)
    }

    /// Return the sorted names of the immediate children of `prefix`.
    ///
    /// # Errors
    /// Returns [`MetadataError::HandlerNotSet`] if no handler is set, or another [`MetadataError`] if there is an underlying map error.
    pub fn list(
        &self,
        map: &dyn MapTraits,
        prefix: &StorePrefix,
    ) -> Result<Vec<String>, MetadataError> {
        self.handler()?.list(map, prefix)
    }

    /// Return every key under `prefix`, sorted.
    ///
    /// # Errors
    /// Returns [`MetadataError::HandlerNotSet`] if no handler is set, or another [`MetadataError`] if there is an underlying map error.
    pub fn list_all(
        &self,
        map: &dyn MapTraits,
        prefix: &StorePrefix,
    ) -> Result<StoreKeys, MetadataError> {
        self.handler()?.list_all(map, prefix)
    }

    /// Returns true if `path` names a key or any key lies under it.
    ///
    /// Leading and trailing `/` of `path` are ignored, and an empty path is the root, which exists if any key exists.
    ///
    /// # Errors
    /// Returns [`MetadataError::InvalidPath`] if `path` is not a valid key, [`MetadataError::HandlerNotSet`] if no handler is set,
    /// or another [`MetadataError`] if there is an underlying map error.
    pub fn exists(&self, map: &dyn MapTraits, path: &str) -> Result<bool, MetadataError> {
        let handler = self.handler()?;
        let path = path.trim_matches('/');
        if path.is_empty() {
            Ok(!handler.list_all(map, &StorePrefix::root())?.is_empty())
        } else {
            handler.exists(map, &StoreKey::new(path)?)
        }
    }
}

fn check_kind(kind: JsonKind, key: &StoreKey) -> Result<(), MetadataError> {
    if kind.matches(key) {
        Ok(())
    } else {
        Err(MetadataError::KindMismatch {
            key: key.clone(),
            kind,
        })
    }
}
