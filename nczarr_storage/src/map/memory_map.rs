//! An in-memory map.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};

use bytes::BytesMut;
use parking_lot::Mutex;

use crate::byte_range::ByteRange;
use crate::{
    child_names, read_buffer, validate_write_count, Bytes, ListableMapTraits, MapBackend,
    MapError, MapImpl, MapMode, MapTraits, ReadableMapTraits, StoreKey, StoreKeys, StorePrefix,
    WritableMapTraits,
};

type MemoryData = Arc<Mutex<BTreeMap<StoreKey, BytesMut>>>;

/// Named in-memory maps, so that a map created at a path can be opened again until it is deleted.
static MEMORY_MAPS: LazyLock<Mutex<HashMap<String, MemoryData>>> = LazyLock::new(Mutex::default);

/// Options for a [`MemoryMap`].
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct MemoryMapOptions {}

/// An in-memory map.
///
/// Maps created with [`MapBackend::create`] are registered process-wide under their path and can be reopened with [`MapBackend::open`] until closed with `delete`.
/// A map from [`MemoryMap::new`] is anonymous.
#[derive(Debug)]
pub struct MemoryMap {
    path: String,
    mode: MapMode,
    data: MemoryData,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMap {
    /// Create a new anonymous writable memory map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: String::new(),
            mode: MapMode::read_write(),
            data: MemoryData::default(),
        }
    }

    fn check_writable(&self) -> Result<(), MapError> {
        if self.mode.writable() {
            Ok(())
        } else {
            Err(MapError::ReadOnly)
        }
    }
}

impl MapBackend for MemoryMap {
    type Options = MemoryMapOptions;

    fn create(path: &str, mode: MapMode, _options: Self::Options) -> Result<Self, MapError> {
        if path.is_empty() {
            return Err(MapError::InvalidPath(path.to_string()));
        }
        let mut maps = MEMORY_MAPS.lock();
        if maps.contains_key(path) && !mode.overwrite() {
            return Err(MapError::MapExists(path.to_string()));
        }
        let data = MemoryData::default();
        maps.insert(path.to_string(), data.clone());
        log::debug!("created memory map {path}");
        Ok(Self {
            path: path.to_string(),
            mode: mode.with_writable(true),
            data,
        })
    }

    fn open(path: &str, mode: MapMode, _options: Self::Options) -> Result<Self, MapError> {
        let maps = MEMORY_MAPS.lock();
        let data = maps
            .get(path)
            .cloned()
            .ok_or_else(|| MapError::MapNotFound(path.to_string()))?;
        log::debug!("opened memory map {path}");
        Ok(Self {
            path: path.to_string(),
            mode,
            data,
        })
    }
}

impl ReadableMapTraits for MemoryMap {
    fn len(&self, key: &StoreKey) -> Result<u64, MapError> {
        let data_map = self.data.lock();
        data_map
            .get(key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| MapError::KeyNotFound(key.clone()))
    }

    fn read(&self, key: &StoreKey, start: u64, count: u64) -> Result<Bytes, MapError> {
        let data_map = self.data.lock();
        let data = data_map
            .get(key)
            .ok_or_else(|| MapError::KeyNotFound(key.clone()))?;
        let byte_range = ByteRange::new(start, count);
        let range = byte_range
            .to_range_usize(data.len() as u64)
            .map_err(|err| MapError::OutOfRange(key.clone(), err))?;
        let mut buffer = read_buffer(count)?;
        buffer.copy_from_slice(&data[range]);
        log::trace!("read {count} bytes at {start} from {key}");
        Ok(Bytes::from(buffer))
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, MapError> {
        Ok(self.data.lock().contains_key(key))
    }
}

impl WritableMapTraits for MemoryMap {
    fn write(&self, key: &StoreKey, start: u64, count: u64, bytes: &[u8]) -> Result<(), MapError> {
        validate_write_count(count, bytes)?;
        self.check_writable()?;
        let end = ByteRange::new(start, count)
            .end()
            .and_then(|end| usize::try_from(end).ok())
            .ok_or_else(|| MapError::Other(format!("write of {count} bytes at {start} overflows")))?;
        let offset = end - bytes.len();

        let mut data_map = self.data.lock();
        let data = data_map.entry(key.clone()).or_default();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(bytes);
        log::trace!("wrote {count} bytes at {start} to {key}");
        Ok(())
    }

    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), MapError> {
        self.check_writable()?;
        let mut data_map = self.data.lock();
        data_map.insert(key.clone(), BytesMut::from(value.as_ref()));
        log::trace!("set {} bytes to {key}", value.len());
        Ok(())
    }

    fn rename(&self, old: &StoreKey, new: &StoreKey) -> Result<(), MapError> {
        self.check_writable()?;
        let mut data_map = self.data.lock();
        let data = data_map
            .remove(old)
            .ok_or_else(|| MapError::KeyNotFound(old.clone()))?;
        data_map.insert(new.clone(), data);
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), MapError> {
        self.check_writable()?;
        self.data.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), MapError> {
        self.check_writable()?;
        self.data.lock().clear();
        Ok(())
    }
}

impl ListableMapTraits for MemoryMap {
    fn list(&self, prefix: &StorePrefix) -> Result<Vec<String>, MapError> {
        Ok(child_names(prefix, &self.list_all(prefix)?))
    }

    fn list_all(&self, prefix: &StorePrefix) -> Result<StoreKeys, MapError> {
        let data_map = self.data.lock();
        Ok(data_map
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }
}

impl MapTraits for MemoryMap {
    fn implementation(&self) -> MapImpl {
        MapImpl::Memory
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn mode(&self) -> MapMode {
        self.mode
    }

    fn close(self: Box<Self>, delete: bool) -> Result<(), MapError> {
        if delete {
            self.data.lock().clear();
            let mut maps = MEMORY_MAPS.lock();
            if maps
                .get(&self.path)
                .is_some_and(|data| Arc::ptr_eq(data, &self.data))
            {
                maps.remove(&self.path);
            }
        }
        log::debug!("closed memory map {} (delete: {delete})", self.path);
        Ok(())
    }
}
