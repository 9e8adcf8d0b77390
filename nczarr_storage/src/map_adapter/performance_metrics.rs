//! A map adapter which records performance metrics.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    Bytes, ListableMapTraits, MapError, MapImpl, MapMode, MapTraits, ReadableMapTraits, StoreKey,
    StoreKeys, StorePrefix, WritableMapTraits,
};

/// The performance metrics map adapter. Accumulates metrics, such as bytes read and written.
///
/// It is intended to aid in testing by allowing the application to validate that metrics (e.g., bytes read/written, total read/write operations) match expected values for specific operations.
///
/// ### Example
/// ```rust
/// # use nczarr_storage::map::MemoryMap;
/// # use nczarr_storage::map_adapter::performance_metrics::PerformanceMetricsMapAdapter;
/// # use nczarr_storage::{ReadableMapTraits, WritableMapTraits};
/// let map = PerformanceMetricsMapAdapter::new(MemoryMap::new());
/// map.set(&"a".try_into()?, vec![0, 1, 2].into())?;
/// map.read(&"a".try_into()?, 1, 2)?;
/// assert_eq!(map.writes(), 1);
/// assert_eq!(map.bytes_written(), 3);
/// assert_eq!(map.reads(), 1);
/// assert_eq!(map.bytes_read(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct PerformanceMetricsMapAdapter<TMap> {
    map: TMap,
    bytes_read: AtomicUsize,
    bytes_written: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    keys_erased: AtomicUsize,
    queries: AtomicUsize,
}

impl<TMap> PerformanceMetricsMapAdapter<TMap> {
    /// Create a new performance metrics map adapter.
    #[must_use]
    pub fn new(map: TMap) -> Self {
        Self {
            map,
            bytes_read: AtomicUsize::default(),
            bytes_written: AtomicUsize::default(),
            reads: AtomicUsize::default(),
            writes: AtomicUsize::default(),
            keys_erased: AtomicUsize::default(),
            queries: AtomicUsize::default(),
        }
    }

    /// Return the inner map.
    pub fn into_inner(self) -> TMap {
        self.map
    }

    /// Reset the performance metrics.
    pub fn reset(&self) {
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.keys_erased.store(0, Ordering::Relaxed);
        self.queries.store(0, Ordering::Relaxed);
    }

    /// Returns the number of bytes read.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Returns the number of bytes written.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of read requests.
    ///
    /// Length and existence queries are not reads, see [`queries`](PerformanceMetricsMapAdapter::queries).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of write requests, including renames.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of key erase requests.
    ///
    /// Includes keys erased that may not have existed, and excludes [`clear`](WritableMapTraits::clear).
    pub fn keys_erased(&self) -> usize {
        self.keys_erased.load(Ordering::Relaxed)
    }

    /// Returns the number of length, existence and listing requests.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl<TMap: ReadableMapTraits> ReadableMapTraits for PerformanceMetricsMapAdapter<TMap> {
    fn len(&self, key: &StoreKey) -> Result<u64, MapError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.map.len(key)
    }

    fn read(&self, key: &StoreKey, start: u64, count: u64) -> Result<Bytes, MapError> {
        let value = self.map.read(key, start, count);
        let bytes_read = value.as_ref().map_or(0, Bytes::len);
        self.bytes_read.fetch_add(bytes_read, Ordering::Relaxed);
        self.reads.fetch_add(1, Ordering::Relaxed);
        value
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, MapError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.map.exists(key)
    }
}

impl<TMap: WritableMapTraits> WritableMapTraits for PerformanceMetricsMapAdapter<TMap> {
    fn write(&self, key: &StoreKey, start: u64, count: u64, bytes: &[u8]) -> Result<(), MapError> {
        self.bytes_written.fetch_add(bytes.len(), Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.map.write(key, start, count, bytes)
    }

    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), MapError> {
        self.bytes_written.fetch_add(value.len(), Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.map.set(key, value)
    }

    fn rename(&self, old: &StoreKey, new: &StoreKey) -> Result<(), MapError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.map.rename(old, new)
    }

    fn erase(&self, key: &StoreKey) -> Result<(), MapError> {
        self.keys_erased.fetch_add(1, Ordering::Relaxed);
        self.map.erase(key)
    }

    fn clear(&self) -> Result<(), MapError> {
        self.map.clear()
    }
}

impl<TMap: ListableMapTraits> ListableMapTraits for PerformanceMetricsMapAdapter<TMap> {
    fn list(&self, prefix: &StorePrefix) -> Result<Vec<String>, MapError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.map.list(prefix)
    }

    fn list_all(&self, prefix: &StorePrefix) -> Result<StoreKeys, MapError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.map.list_all(prefix)
    }
}

impl<TMap: MapTraits> MapTraits for PerformanceMetricsMapAdapter<TMap> {
    fn implementation(&self) -> MapImpl {
        self.map.implementation()
    }

    fn path(&self) -> &str {
        self.map.path()
    }

    fn mode(&self) -> MapMode {
        self.map.mode()
    }

    fn close(self: Box<Self>, delete: bool) -> Result<(), MapError> {
        Box::new(self.map).close(delete)
    }
}
