//! The process-wide metadata handler registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use nczarr_storage::{MapTraits, StoreKey};

use crate::{
    ConsolidatedMetadataHandler, MetadataError, MetadataHandlerKind, MetadataHandlerTraits,
    PerKeyMetadataHandler, ZMETADATA_KEY,
};

type MatchesFn = dyn Fn(&dyn MapTraits) -> Result<bool, MetadataError> + Send + Sync;
type CreateFn = dyn Fn() -> Box<dyn MetadataHandlerTraits> + Send + Sync;

/// A metadata handler plugin.
///
/// A plugin decides whether its handler applies to the content of a map, and creates the handler.
pub struct MetadataHandlerPlugin {
    identifier: String,
    matches_fn: Box<MatchesFn>,
    create_fn: Box<CreateFn>,
}

impl MetadataHandlerPlugin {
    /// Create a new metadata handler plugin.
    pub fn new<M, C>(identifier: impl Into<String>, matches_fn: M, create_fn: C) -> Self
    where
        M: Fn(&dyn MapTraits) -> Result<bool, MetadataError> + Send + Sync + 'static,
        C: Fn() -> Box<dyn MetadataHandlerTraits> + Send + Sync + 'static,
    {
        Self {
            identifier: identifier.into(),
            matches_fn: Box::new(matches_fn),
            create_fn: Box::new(create_fn),
        }
    }

    /// Returns the identifier of the plugin.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns true if the handler of this plugin applies to the content of `map`.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if the map cannot be inspected.
    pub fn matches(&self, map: &dyn MapTraits) -> Result<bool, MetadataError> {
        (self.matches_fn)(map)
    }

    /// Create a new handler.
    #[must_use]
    pub fn create(&self) -> Box<dyn MetadataHandlerTraits> {
        (self.create_fn)()
    }
}

impl core::fmt::Debug for MetadataHandlerPlugin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MetadataHandlerPlugin")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// A handle to a registered metadata handler plugin. See [`register_metadata_handler`].
pub type MetadataHandlerRegistryHandle = Arc<MetadataHandlerPlugin>;

static METADATA_HANDLER_REGISTRY: RwLock<Vec<MetadataHandlerRegistryHandle>> =
    RwLock::new(Vec::new());

static INITIALIZED: AtomicBool = AtomicBool::new(false);

fn consolidated_plugin() -> MetadataHandlerPlugin {
    MetadataHandlerPlugin::new(
        MetadataHandlerKind::Consolidated.to_string(),
        |map| Ok(map.exists(&StoreKey::new(ZMETADATA_KEY)?)?),
        || Box::new(ConsolidatedMetadataHandler::new()),
    )
}

fn per_key_plugin() -> MetadataHandlerPlugin {
    MetadataHandlerPlugin::new(
        MetadataHandlerKind::PerKey.to_string(),
        |_map| Ok(true),
        || Box::new(PerKeyMetadataHandler::new()),
    )
}

/// Register the built-in metadata handlers.
///
/// The consolidated handler is consulted first and applies if the map has a `.zmetadata` key.
/// The per-key handler applies to any map.
/// Calling this again before [`finalize`] has no effect.
pub fn initialize() {
    let mut plugins = METADATA_HANDLER_REGISTRY.write();
    if INITIALIZED.load(Ordering::Acquire) {
        return;
    }
    plugins.push(Arc::new(consolidated_plugin()));
    plugins.push(Arc::new(per_key_plugin()));
    // only flipped once the built-in plugins are visible
    INITIALIZED.store(true, Ordering::Release);
    log::debug!("initialized the metadata handler registry");
}

/// Unregister every metadata handler.
pub fn finalize() {
    let mut plugins = METADATA_HANDLER_REGISTRY.write();
    if !INITIALIZED.swap(false, Ordering::AcqRel) {
        log::warn!("metadata handler registry finalized without being initialized");
    }
    plugins.clear();
    log::debug!("finalized the metadata handler registry");
}

/// Returns true if [`initialize`] has been called without a subsequent [`finalize`].
#[must_use]
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Register a metadata handler plugin.
///
/// Registered plugins are consulted before the built-in handlers.
///
/// # Returns
/// A handle that can be used to unregister the plugin later.
pub fn register_metadata_handler(plugin: MetadataHandlerPlugin) -> MetadataHandlerRegistryHandle {
    let plugin = Arc::new(plugin);
    METADATA_HANDLER_REGISTRY.write().insert(0, plugin.clone());
    plugin
}

/// Unregister a metadata handler plugin.
///
/// # Returns
/// `true` if the plugin was found and removed, `false` otherwise.
pub fn unregister_metadata_handler(handle: &MetadataHandlerRegistryHandle) -> bool {
    let mut plugins = METADATA_HANDLER_REGISTRY.write();
    if let Some(position) = plugins.iter().position(|p| Arc::ptr_eq(p, handle)) {
        plugins.remove(position);
        true
    } else {
        false
    }
}

/// Create the handler of the first registered plugin matching `map`.
pub(crate) fn match_metadata_handler(
    map: &dyn MapTraits,
) -> Result<Box<dyn MetadataHandlerTraits>, MetadataError> {
    let plugins = METADATA_HANDLER_REGISTRY.read();
    if !is_initialized() {
        return Err(MetadataError::NotInitialized);
    }
    for plugin in plugins.iter() {
        if plugin.matches(map)? {
            log::debug!(
                "selected {} metadata handler for {}",
                plugin.identifier(),
                map.path()
            );
            return Ok(plugin.create());
        }
    }
    Err(MetadataError::UnknownHandler(map.path().to_string()))
}

/// Create the handler of the registered plugin with `identifier`.
pub(crate) fn create_metadata_handler(
    identifier: &str,
) -> Result<Box<dyn MetadataHandlerTraits>, MetadataError> {
    let plugins = METADATA_HANDLER_REGISTRY.read();
    if !is_initialized() {
        return Err(MetadataError::NotInitialized);
    }
    plugins
        .iter()
        .find(|plugin| plugin.identifier() == identifier)
        .map(|plugin| plugin.create())
        .ok_or_else(|| MetadataError::UnknownHandler(identifier.to_string()))
}
