//! `nczarr` is the chunked array storage engine of the NCZarr format, a Zarr V2 compatible layout for netCDF variables.
//!
//! It covers three subsystems:
//! - the chunk grid ([`chunk_grid`]): strided slices, the [`Odometer`](chunk_grid::Odometer), and the projection of a selection onto every chunk it touches;
//! - maps ([`storage`]): a uniform key/value interface with in-memory, filesystem ([`filesystem`]) and object store ([`object_store`]) backends;
//! - the metadata dispatcher ([`metadata`]): JSON metadata read either from per-key objects or from one consolidated `.zmetadata` document.
//!
//! A [`ZarrFile`] bundles an open map with its metadata.
//!
//! ## Example
//! ```rust
//! # use nczarr::chunk_grid::{ChunkProjections, Slice};
//! # use nczarr::metadata::JsonKind;
//! # use nczarr::storage::{MapImpl, MapMode, WritableMapTraits};
//! # use nczarr::{MapParams, ZarrFile};
//! nczarr::initialize();
//! let mut file = ZarrFile::create(MapImpl::Memory, "doc_example", MapMode::read_write(), MapParams::default())?;
//! file.update_json_content(JsonKind::Array, "v", serde_json::json!({"shape": [10, 10], "chunks": [4, 4]}))?;
//!
//! // Write every chunk touched by v[2..9, 2..9]
//! let slices = [Slice::new(2, 9, 1)?, Slice::new(2, 9, 1)?];
//! let projections = ChunkProjections::new_with_array_shape(&slices, &[4, 4], &[10, 10])?;
//! assert_eq!(projections.num_chunks(), 9);
//! for projection in &projections {
//!     let key = file.chunk_key("v", projection.chunk_indices())?;
//!     file.map().set(&key, vec![0; 16].into())?;
//! }
//! file.close(true)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Features
//! - `filesystem` (default): the filesystem map, re-exported as [`filesystem`].
//! - `object_store` (default): the [`object_store`](https://docs.rs/object_store) map, re-exported as [`object_store`].
//! - `aws`, `fs`: enable Amazon S3 and local filesystem stores of the `object_store` crate.
//!
//! ## Logging
//! `nczarr` logs through the [`log`](https://docs.rs/log) crate and does not install a logger.
//!
//! ## Licence
//! `nczarr` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
mod file;

pub use nczarr_chunk_grid as chunk_grid;
pub use nczarr_chunk_key_encoding as chunk_key_encoding;
#[cfg(feature = "filesystem")]
pub use nczarr_filesystem as filesystem;
pub use nczarr_metadata as metadata;
#[cfg(feature = "object_store")]
pub use nczarr_object_store as object_store;
pub use nczarr_shared::ErrorKind;
pub use nczarr_storage as storage;

pub use file::{ZarrFile, ZarrFileError};
pub use nczarr_metadata::{finalize, initialize, is_initialized};

use nczarr_chunk_grid::{Odometer, Slice, SliceError};
use nczarr_storage::map::{MemoryMap, MemoryMapOptions};
use nczarr_storage::{Map, MapBackend, MapError, MapImpl, MapMode};

use crate::config::global_config;

/// Backend options for [`create_map`] and [`open_map`].
///
/// Only the options of the selected backend are used.
#[derive(Clone, Debug, Default)]
pub struct MapParams {
    /// Options for [`MapImpl::Memory`].
    pub memory: MemoryMapOptions,
    /// Options for [`MapImpl::File`].
    #[cfg(feature = "filesystem")]
    pub file: nczarr_filesystem::FileMapOptions,
    /// Options for [`MapImpl::ObjectStore`].
    #[cfg(feature = "object_store")]
    pub object_store: nczarr_object_store::ObjectStoreMapOptions,
}

fn create_or_open<T: MapBackend + 'static>(
    create: bool,
    path: &str,
    mode: MapMode,
    options: T::Options,
) -> Result<Map, MapError> {
    let map = if create {
        T::create(path, mode, options)?
    } else {
        T::open(path, mode, options)?
    };
    Ok(Box::new(map))
}

fn create_or_open_impl(
    create: bool,
    implementation: MapImpl,
    path: &str,
    mode: MapMode,
    params: MapParams,
) -> Result<Map, MapError> {
    match implementation {
        MapImpl::Memory => create_or_open::<MemoryMap>(create, path, mode, params.memory),
        #[cfg(feature = "filesystem")]
        MapImpl::File => {
            create_or_open::<nczarr_filesystem::FileMap>(create, path, mode, params.file)
        }
        #[cfg(feature = "object_store")]
        MapImpl::ObjectStore => create_or_open::<nczarr_object_store::ObjectStoreMap>(
            create,
            path,
            mode,
            params.object_store,
        ),
        implementation => Err(MapError::Unsupported(format!(
            "the {implementation} map implementation is not enabled"
        ))),
    }
}

/// Create a new map of `implementation` at `path`.
///
/// # Errors
/// Returns [`MapError::Unsupported`] if the implementation is not enabled, [`MapError::MapExists`] if a map already exists at `path` and `mode` does not permit overwriting,
/// or another [`MapError`] if the map cannot be created.
pub fn create_map(
    implementation: MapImpl,
    path: &str,
    mode: MapMode,
    params: MapParams,
) -> Result<Map, MapError> {
    create_or_open_impl(true, implementation, path, mode, params)
}

/// Open an existing map of `implementation` at `path`.
///
/// # Errors
/// Returns [`MapError::Unsupported`] if the implementation is not enabled, [`MapError::MapNotFound`] if there is no map at `path`,
/// or another [`MapError`] if the map cannot be opened.
pub fn open_map(
    implementation: MapImpl,
    path: &str,
    mode: MapMode,
    params: MapParams,
) -> Result<Map, MapError> {
    create_or_open_impl(false, implementation, path, mode, params)
}

/// Create an odometer over `slices` of an array with shape `max`.
///
/// Slab collapse follows the global [odometer use slabs](config::Config#odometer-use-slabs) configuration.
///
/// # Errors
/// Returns a [`SliceError`] if the slices are incompatible with `max`. See [`Odometer::new`].
pub fn new_odometer(slices: &[Slice], max: &[u64]) -> Result<Odometer, SliceError> {
    let use_slabs = global_config().odometer_use_slabs();
    Ok(Odometer::from_slices(slices, max)?.with_slabs(use_slabs))
}
