//! [`object_store`] map support for the [`nczarr`](https://docs.rs/nczarr/latest/nczarr/index.html) crate.
//!
//! [`ObjectStoreMap`] wraps any [`object_store::ObjectStore`] (in-memory, local filesystem, Amazon S3, Google Cloud Storage, Azure, ...) under a root path.
//! The map API is synchronous, so each request is driven to completion with a [`BlockOn`] executor.
//!
//! Object stores replace whole objects: a [`write`](WritableMapTraits::write) must start at byte 0 and becomes the entire value.
//!
//! ```
//! # use std::sync::Arc;
//! # use nczarr_object_store::{ObjectStoreMap, ObjectStoreMapOptions};
//! # use nczarr_storage::{MapBackend, MapMode, ReadableMapTraits, WritableMapTraits};
//! let options = ObjectStoreMapOptions::default()
//!     .with_store(Arc::new(object_store::memory::InMemory::new()));
//! let map: ObjectStoreMap = ObjectStoreMap::create("root", MapMode::read_write(), options)?;
//! map.write(&"a".try_into()?, 0, 3, b"abc")?;
//! assert_eq!(map.read(&"a".try_into()?, 1, 2)?.as_ref(), b"bc");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Licence
//! `nczarr_object_store` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

use std::future::Future;
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::{path::Path, ObjectStore};

use nczarr_storage::{
    byte_range::ByteRange, validate_write_count, Bytes, ListableMapTraits, MapBackend, MapError,
    MapImpl, MapMode, MapTraits, ReadableMapTraits, StoreKey, StoreKeys, StorePrefix,
    WritableMapTraits,
};

/// Runs a future to completion on the current thread.
pub trait BlockOn: Send + Sync {
    /// Block on a future.
    fn block_on<F: Future>(&self, future: F) -> F::Output;
}

/// A [`BlockOn`] executor using [`futures::executor::block_on`].
///
/// Stores which depend on a particular async runtime (e.g. `tokio` for network stores) need a [`BlockOn`] backed by that runtime instead.
#[derive(Copy, Clone, Debug, Default)]
pub struct FuturesBlockOn;

impl BlockOn for FuturesBlockOn {
    fn block_on<F: Future>(&self, future: F) -> F::Output {
        futures::executor::block_on(future)
    }
}

/// Options for an [`ObjectStoreMap`].
#[derive(Clone, Debug, Default)]
pub struct ObjectStoreMapOptions {
    store: Option<Arc<dyn ObjectStore>>,
}

impl ObjectStoreMapOptions {
    /// Use `store` as the underlying object store.
    ///
    /// The map path is then the root path within the store.
    /// Without a store, the map path is parsed as a URL with [`object_store::parse_url`].
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }
}

fn object_store_error(err: object_store::Error, key: Option<&StoreKey>) -> MapError {
    use object_store::Error;
    use std::io::ErrorKind;
    match (err, key) {
        (Error::NotFound { .. }, Some(key)) => MapError::KeyNotFound(key.clone()),
        (err @ (Error::NotImplemented | Error::NotSupported { .. }), _) => {
            MapError::Unsupported(err.to_string())
        }
        (err @ (Error::PermissionDenied { .. } | Error::Unauthenticated { .. }), _) => {
            std::io::Error::new(ErrorKind::PermissionDenied, err).into()
        }
        (err @ Error::AlreadyExists { .. }, _) => {
            std::io::Error::new(ErrorKind::AlreadyExists, err).into()
        }
        (err @ Error::NotFound { .. }, None) => std::io::Error::new(ErrorKind::NotFound, err).into(),
        (err, _) => MapError::Other(err.to_string()),
    }
}

/// A map backed by an [`object_store::ObjectStore`].
#[derive(Debug)]
pub struct ObjectStoreMap<B: BlockOn = FuturesBlockOn> {
    store: Arc<dyn ObjectStore>,
    root: Path,
    path: String,
    mode: MapMode,
    block_on: B,
}

impl<B: BlockOn> ObjectStoreMap<B> {
    /// Create a new map over `store` under `root`, without checking whether the root exists.
    #[must_use]
    pub fn new_with_block_on(
        store: Arc<dyn ObjectStore>,
        root: &str,
        mode: MapMode,
        block_on: B,
    ) -> Self {
        Self {
            store,
            root: Path::from(root),
            path: root.to_string(),
            mode,
            block_on,
        }
    }

    /// Maps a [`StoreKey`] to an [`object_store`] path.
    fn key_to_path(&self, key: &StoreKey) -> Path {
        self.join(key.as_str())
    }

    /// Maps a [`StorePrefix`] to an [`object_store`] path.
    fn prefix_to_path(&self, prefix: &StorePrefix) -> Path {
        self.join(prefix.as_str().trim_end_matches('/'))
    }

    fn join(&self, relative: &str) -> Path {
        if self.root.as_ref().is_empty() {
            Path::from(relative)
        } else if relative.is_empty() {
            self.root.clone()
        } else {
            Path::from(format!("{}/{relative}", self.root))
        }
    }

    /// Maps an [`object_store`] path to a [`StoreKey`].
    fn path_to_key(&self, path: &Path) -> Result<StoreKey, MapError> {
        let path = path.as_ref();
        let relative = if self.root.as_ref().is_empty() {
            path
        } else {
            path.strip_prefix(self.root.as_ref())
                .and_then(|path| path.strip_prefix('/'))
                .ok_or_else(|| MapError::Other(format!("{path} is not under {}", self.root)))?
        };
        Ok(StoreKey::new(relative)?)
    }

    fn check_writable(&self) -> Result<(), MapError> {
        if self.mode.writable() {
            Ok(())
        } else {
            Err(MapError::ReadOnly)
        }
    }

    fn list_paths(&self, prefix: &Path) -> Result<Vec<Path>, MapError> {
        let prefix = (!prefix.as_ref().is_empty()).then_some(prefix);
        let objects = self
            .block_on
            .block_on(self.store.list(prefix).try_collect::<Vec<_>>())
            .map_err(|err| object_store_error(err, None))?;
        Ok(objects.into_iter().map(|meta| meta.location).collect())
    }

    fn root_exists(&self) -> Result<bool, MapError> {
        Ok(!self.list_paths(&self.root)?.is_empty())
    }

    fn delete_all(&self) -> Result<(), MapError> {
        for location in self.list_paths(&self.root)? {
            self.block_on
                .block_on(self.store.delete(&location))
                .map_err(|err| object_store_error(err, None))?;
        }
        Ok(())
    }
}

impl<B: BlockOn + Default> ObjectStoreMap<B> {
    fn new_from_options(
        path: &str,
        mode: MapMode,
        options: ObjectStoreMapOptions,
    ) -> Result<Self, MapError> {
        if let Some(store) = options.store {
            Ok(Self::new_with_block_on(store, path, mode, B::default()))
        } else {
            let url = url::Url::parse(path).map_err(|_| MapError::InvalidPath(path.to_string()))?;
            let (store, root) = object_store::parse_url(&url)
                .map_err(|err| object_store_error(err, None))?;
            Ok(Self {
                store: Arc::from(store),
                root,
                path: path.to_string(),
                mode,
                block_on: B::default(),
            })
        }
    }
}

impl<B: BlockOn + Default> MapBackend for ObjectStoreMap<B> {
    type Options = ObjectStoreMapOptions;

    fn create(path: &str, mode: MapMode, options: Self::Options) -> Result<Self, MapError> {
        let map = Self::new_from_options(path, mode.with_writable(true), options)?;
        if map.root_exists()? {
            if !mode.overwrite() {
                return Err(MapError::MapExists(path.to_string()));
            }
            map.delete_all()?;
        }
        log::debug!("created object store map {path}");
        Ok(map)
    }

    /// Open an existing map.
    ///
    /// Object stores have no directories, so a root holding no objects does not exist.
    fn open(path: &str, mode: MapMode, options: Self::Options) -> Result<Self, MapError> {
        let map = Self::new_from_options(path, mode, options)?;
        if !map.root_exists()? {
            return Err(MapError::MapNotFound(path.to_string()));
        }
        log::debug!("opened object store map {path}");
        Ok(map)
    }
}

impl<B: BlockOn> ReadableMapTraits for ObjectStoreMap<B> {
    fn len(&self, key: &StoreKey) -> Result<u64, MapError> {
        let meta = self
            .block_on
            .block_on(self.store.head(&self.key_to_path(key)))
            .map_err(|err| object_store_error(err, Some(key)))?;
        Ok(meta.size)
    }

    fn read(&self, key: &StoreKey, start: u64, count: u64) -> Result<Bytes, MapError> {
        let size = self.len(key)?;
        let range = ByteRange::new(start, count)
            .to_range_usize(size)
            .map_err(|err| MapError::OutOfRange(key.clone(), err))?;
        if range.is_empty() {
            return Ok(Bytes::new());
        }
        let bytes = self
            .block_on
            .block_on(
                self.store
                    .get_range(&self.key_to_path(key), start..start + count),
            )
            .map_err(|err| object_store_error(err, Some(key)))?;
        if bytes.len() != range.len() {
            return Err(MapError::Other(format!(
                "unexpected length of bytes returned, expected {}, got {}",
                range.len(),
                bytes.len()
            )));
        }
        log::trace!("read {count} bytes at {start} from {key}");
        Ok(bytes)
    }
}

impl<B: BlockOn> WritableMapTraits for ObjectStoreMap<B> {
    fn write(&self, key: &StoreKey, start: u64, count: u64, bytes: &[u8]) -> Result<(), MapError> {
        validate_write_count(count, bytes)?;
        if start != 0 {
            return Err(MapError::Unsupported(format!(
                "object store maps cannot write {count} bytes at offset {start} of {key}, only whole objects"
            )));
        }
        self.set(key, Bytes::copy_from_slice(bytes))
    }

    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), MapError> {
        self.check_writable()?;
        let len = value.len();
        self.block_on
            .block_on(self.store.put(&self.key_to_path(key), value.into()))
            .map_err(|err| object_store_error(err, Some(key)))?;
        log::trace!("set {len} bytes to {key}");
        Ok(())
    }

    fn rename(&self, old: &StoreKey, new: &StoreKey) -> Result<(), MapError> {
        self.check_writable()?;
        self.block_on
            .block_on(
                self.store
                    .rename(&self.key_to_path(old), &self.key_to_path(new)),
            )
            .map_err(|err| object_store_error(err, Some(old)))
    }

    fn erase(&self, key: &StoreKey) -> Result<(), MapError> {
        self.check_writable()?;
        match self
            .block_on
            .block_on(self.store.delete(&self.key_to_path(key)))
        {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(object_store_error(err, Some(key))),
        }
    }

    fn clear(&self) -> Result<(), MapError> {
        self.check_writable()?;
        self.delete_all()
    }
}

impl<B: BlockOn> ListableMapTraits for ObjectStoreMap<B> {
    fn list(&self, prefix: &StorePrefix) -> Result<Vec<String>, MapError> {
        let path = self.prefix_to_path(prefix);
        let path = (!path.as_ref().is_empty()).then_some(&path);
        let result = self
            .block_on
            .block_on(self.store.list_with_delimiter(path))
            .map_err(|err| object_store_error(err, None))?;
        let mut names: Vec<String> = result
            .common_prefixes
            .iter()
            .chain(result.objects.iter().map(|meta| &meta.location))
            .filter_map(|location| location.filename().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn list_all(&self, prefix: &StorePrefix) -> Result<StoreKeys, MapError> {
        let mut keys = self
            .list_paths(&self.prefix_to_path(prefix))?
            .iter()
            .map(|location| self.path_to_key(location))
            .collect::<Result<StoreKeys, _>>()?;
        keys.sort();
        Ok(keys)
    }
}

impl<B: BlockOn> MapTraits for ObjectStoreMap<B> {
    fn implementation(&self) -> MapImpl {
        MapImpl::ObjectStore
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn mode(&self) -> MapMode {
        self.mode
    }

    fn close(self: Box<Self>, delete: bool) -> Result<(), MapError> {
        if delete {
            self.delete_all()?;
        }
        log::debug!("closed object store map {} (delete: {delete})", self.path);
        Ok(())
    }
}
