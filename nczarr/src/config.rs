//! `nczarr` global configuration options.

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use nczarr_chunk_key_encoding::ChunkKeySeparator;

/// Global configuration options for the nczarr crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Odometer Use Slabs
/// > default: [`true`]
///
/// If enabled, odometers created with [`new_odometer`](crate::new_odometer) collapse the trailing contiguous dimensions of a selection,
/// so that [`linear_offset`](crate::chunk_grid::Odometer::linear_offset) is computed incrementally.
///
/// ## Consolidated Metadata On Create
/// > default: [`false`]
///
/// If enabled, files created with [`ZarrFile::create`](crate::ZarrFile::create) use the consolidated metadata handler and write `.zmetadata`,
/// otherwise they use the per-key metadata handler.
///
/// ## Chunk Key Separator
/// > default: [`ChunkKeySeparator::Dot`]
///
/// The separator between chunk indices in chunk keys created with [`ZarrFile::chunk_key`](crate::ZarrFile::chunk_key).
#[derive(Debug, Clone)]
pub struct Config {
    odometer_use_slabs: bool,
    consolidated_metadata_on_create: bool,
    chunk_key_separator: ChunkKeySeparator,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            odometer_use_slabs: true,
            consolidated_metadata_on_create: false,
            chunk_key_separator: ChunkKeySeparator::Dot,
        }
    }
}

impl Config {
    /// Get the [odometer use slabs](#odometer-use-slabs) configuration.
    #[must_use]
    pub fn odometer_use_slabs(&self) -> bool {
        self.odometer_use_slabs
    }

    /// Set the [odometer use slabs](#odometer-use-slabs) configuration.
    pub fn set_odometer_use_slabs(&mut self, odometer_use_slabs: bool) -> &mut Self {
        self.odometer_use_slabs = odometer_use_slabs;
        self
    }

    /// Get the [consolidated metadata on create](#consolidated-metadata-on-create) configuration.
    #[must_use]
    pub fn consolidated_metadata_on_create(&self) -> bool {
        self.consolidated_metadata_on_create
    }

    /// Set the [consolidated metadata on create](#consolidated-metadata-on-create) configuration.
    pub fn set_consolidated_metadata_on_create(&mut self, consolidated: bool) -> &mut Self {
        self.consolidated_metadata_on_create = consolidated;
        self
    }

    /// Get the [chunk key separator](#chunk-key-separator) configuration.
    #[must_use]
    pub fn chunk_key_separator(&self) -> ChunkKeySeparator {
        self.chunk_key_separator
    }

    /// Set the [chunk key separator](#chunk-key-separator) configuration.
    pub fn set_chunk_key_separator(&mut self, separator: ChunkKeySeparator) -> &mut Self {
        self.chunk_key_separator = separator;
        self
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global nczarr configuration.
///
/// This function might deadlock if the global config is already mutably held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global nczarr configuration.
///
/// This function might deadlock if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert!(config.odometer_use_slabs());
        assert!(!config.consolidated_metadata_on_create());
        assert_eq!(config.chunk_key_separator(), ChunkKeySeparator::Dot);
    }

    #[test]
    fn config_setters() {
        let mut config = Config::default();
        config
            .set_odometer_use_slabs(false)
            .set_consolidated_metadata_on_create(true)
            .set_chunk_key_separator(ChunkKeySeparator::Slash);
        assert!(!config.odometer_use_slabs());
        assert!(config.consolidated_metadata_on_create());
        assert_eq!(config.chunk_key_separator(), ChunkKeySeparator::Slash);
    }
}
