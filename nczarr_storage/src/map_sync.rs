use auto_impl::auto_impl;

use nczarr_shared::ErrorKind;

use super::{Bytes, MapError, MapImpl, MapMode, StoreKey, StoreKeys, StorePrefix};

/// Readable map traits.
#[auto_impl(&, Box, Arc)]
pub trait ReadableMapTraits: Send + Sync {
    /// Return the length in bytes of the value at `key`.
    ///
    /// # Errors
    /// Returns [`MapError::KeyNotFound`] if the key does not exist, or another [`MapError`] if there is an underlying storage error.
    fn len(&self, key: &StoreKey) -> Result<u64, MapError>;

    /// Read `count` bytes of the value at `key` starting at byte `start`.
    ///
    /// # Errors
    /// Returns [`MapError::KeyNotFound`] if the key does not exist, [`MapError::OutOfRange`] if `start + count` exceeds the value length,
    /// or another [`MapError`] if there is an underlying storage error.
    fn read(&self, key: &StoreKey, start: u64, count: u64) -> Result<Bytes, MapError>;

    /// Returns true if `key` exists.
    ///
    /// # Errors
    /// Returns a [`MapError`] if there is an underlying storage error.
    fn exists(&self, key: &StoreKey) -> Result<bool, MapError> {
        match self.len(key) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Read the whole value at `key`.
    ///
    /// # Errors
    /// Returns [`MapError::KeyNotFound`] if the key does not exist, or another [`MapError`] if there is an underlying storage error.
    fn get(&self, key: &StoreKey) -> Result<Bytes, MapError> {
        let len = self.len(key)?;
        self.read(key, 0, len)
    }
}

/// Writable map traits.
#[auto_impl(&, Box, Arc)]
pub trait WritableMapTraits: Send + Sync {
    /// Write `bytes` to the value at `key` starting at byte `start`.
    ///
    /// The value is created if it does not exist.
    /// Backends supporting partial writes zero-fill any gap before `start` and never truncate.
    ///
    /// # Errors
    /// Returns
    ///  - [`MapError::CountMismatch`] if `count` is not the length of `bytes`,
    ///  - [`MapError::ReadOnly`] if the map is not writable,
    ///  - [`MapError::Unsupported`] if the backend cannot write the range, or
    ///  - another [`MapError`] if there is an underlying storage error.
    fn write(&self, key: &StoreKey, start: u64, count: u64, bytes: &[u8]) -> Result<(), MapError>;

    /// Replace the value at `key` with `value`.
    ///
    /// # Errors
    /// Returns [`MapError::ReadOnly`] if the map is not writable, or another [`MapError`] if there is an underlying storage error.
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), MapError>;

    /// Rename the value at `old` to `new`, replacing any value at `new`.
    ///
    /// # Errors
    /// Returns [`MapError::KeyNotFound`] if `old` does not exist, [`MapError::ReadOnly`] if the map is not writable,
    /// or another [`MapError`] if there is an underlying storage error.
    fn rename(&self, old: &StoreKey, new: &StoreKey) -> Result<(), MapError>;

    /// Erase the value at `key`.
    ///
    /// Succeeds if the key does not exist.
    ///
    /// # Errors
    /// Returns [`MapError::ReadOnly`] if the map is not writable, or another [`MapError`] if there is an underlying storage error.
    fn erase(&self, key: &StoreKey) -> Result<(), MapError>;

    /// Erase every key in the map, keeping the map itself.
    ///
    /// # Errors
    /// Returns [`MapError::ReadOnly`] if the map is not writable, or another [`MapError`] if there is an underlying storage error.
    fn clear(&self) -> Result<(), MapError>;
}

/// Listable map traits.
#[auto_impl(&, Box, Arc)]
pub trait ListableMapTraits: Send + Sync {
    /// Return the sorted names of the immediate children of `prefix`.
    ///
    /// A child is either a key directly under `prefix` or the first component of a deeper key.
    /// Names do not include `prefix` or a trailing `/`.
    ///
    /// # Errors
    /// Returns a [`MapError`] if there is an underlying storage error.
    fn list(&self, prefix: &StorePrefix) -> Result<Vec<String>, MapError>;

    /// Return every key under `prefix`, sorted.
    ///
    /// # Errors
    /// Returns a [`MapError`] if there is an underlying storage error.
    fn list_all(&self, prefix: &StorePrefix) -> Result<StoreKeys, MapError>;
}

/// An open map.
///
/// A map is exclusively owned by its opener and released with [`close`](MapTraits::close).
pub trait MapTraits: ReadableMapTraits + WritableMapTraits + ListableMapTraits {
    /// The backend implementing the map.
    fn implementation(&self) -> MapImpl;

    /// The root path of the map.
    fn path(&self) -> &str;

    /// The mode the map was created or opened with.
    fn mode(&self) -> MapMode;

    /// Close the map.
    ///
    /// If `delete` is true, the content of the map and its root are removed.
    ///
    /// # Errors
    /// Returns a [`MapError`] if there is an underlying storage error while deleting the map.
    fn close(self: Box<Self>, delete: bool) -> Result<(), MapError>;
}

/// A map backend which can create and open maps.
pub trait MapBackend: MapTraits + Sized {
    /// Backend specific options.
    type Options: Default;

    /// Create a new map at `path`.
    ///
    /// The map is always writable.
    ///
    /// # Errors
    /// Returns [`MapError::MapExists`] if a map already exists at `path` and `mode` does not permit overwriting,
    /// or another [`MapError`] if the map cannot be created.
    fn create(path: &str, mode: MapMode, options: Self::Options) -> Result<Self, MapError>;

    /// Open an existing map at `path`.
    ///
    /// # Errors
    /// Returns [`MapError::MapNotFound`] if there is no map at `path`, or another [`MapError`] if the map cannot be opened.
    fn open(path: &str, mode: MapMode, options: Self::Options) -> Result<Self, MapError>;
}

/// Return the immediate child names of `prefix` from a sorted list of keys.
///
/// Backends which can only enumerate all keys under a prefix can use this to implement [`ListableMapTraits::list`].
#[must_use]
pub fn child_names(prefix: &StorePrefix, keys: &[StoreKey]) -> Vec<String> {
    let mut names: Vec<String> = keys
        .iter()
        .filter_map(|key| key.as_str().strip_prefix(prefix.as_str()))
        .filter_map(|rest| rest.split('/').next())
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Check that a write of `count` bytes is consistent with `bytes`.
///
/// # Errors
/// Returns [`MapError::CountMismatch`] if `count` is not the length of `bytes`.
pub fn validate_write_count(count: u64, bytes: &[u8]) -> Result<(), MapError> {
    if count == bytes.len() as u64 {
        Ok(())
    } else {
        Err(MapError::CountMismatch {
            count,
            len: bytes.len(),
        })
    }
}
