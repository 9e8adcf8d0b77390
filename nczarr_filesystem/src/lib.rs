//! A filesystem map for the [`nczarr`](https://docs.rs/nczarr/latest/nczarr/index.html) crate.
//!
//! The map root is a directory and every key is a file under it, with `/` separated key components mapped to nested directories.
//!
//! ## Licence
//! `nczarr_filesystem` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

use nczarr_storage::{
    byte_range::ByteRange, read_buffer, validate_write_count, Bytes, ListableMapTraits,
    MapBackend, MapError, MapImpl, MapMode, MapTraits, ReadableMapTraits, StoreKey, StoreKeys,
    StorePrefix, WritableMapTraits,
};

use parking_lot::{Mutex, RwLock};
use walkdir::WalkDir;

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Options for use with [`FileMap`].
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct FileMapOptions {
    sync_data: bool,
}

impl FileMapOptions {
    /// Set whether file data is flushed to the device after every write.
    pub fn sync_data(&mut self, sync_data: bool) -> &mut Self {
        self.sync_data = sync_data;
        self
    }
}

/// A filesystem map.
#[derive(Debug)]
pub struct FileMap {
    root: PathBuf,
    path: String,
    mode: MapMode,
    readonly: bool,
    options: FileMapOptions,
    files: Mutex<HashMap<StoreKey, Arc<RwLock<()>>>>,
}

impl FileMap {
    fn new(path: &str, mode: MapMode, options: FileMapOptions) -> Result<Self, MapError> {
        let root = PathBuf::from(path);
        let permissions_readonly = std::fs::metadata(&root)?.permissions().readonly();
        Ok(Self {
            root,
            path: path.to_string(),
            mode,
            readonly: !mode.writable() || permissions_readonly,
            options,
            files: Mutex::default(),
        })
    }

    /// Maps a [`StoreKey`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Maps a [`StorePrefix`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn prefix_to_fspath(&self, prefix: &StorePrefix) -> PathBuf {
        self.root.join(prefix.as_str())
    }

    /// Maps a filesystem path to a [`StoreKey`].
    ///
    /// Returns [`None`] if the path is not under the root or is not a valid key.
    fn fspath_to_key(&self, path: &Path) -> Option<StoreKey> {
        let path = pathdiff::diff_paths(path, &self.root)?;
        let Some(path_str) = path.to_str() else {
            log::warn!("skipping file {} with a non UTF-8 name", path.display());
            return None;
        };
        #[cfg(target_os = "windows")]
        {
            StoreKey::new(path_str.replace('\\', "/")).ok()
        }
        #[cfg(not(target_os = "windows"))]
        {
            StoreKey::new(path_str).ok()
        }
    }

    fn get_file_mutex(&self, key: &StoreKey) -> Arc<RwLock<()>> {
        let mut files = self.files.lock();
        let file = files
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone();
        drop(files);
        file
    }

    fn check_writable(&self) -> Result<(), MapError> {
        if self.readonly {
            Err(MapError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn open_key(&self, key: &StoreKey) -> Result<File, MapError> {
        let key_path = self.key_to_fspath(key);
        match File::open(&key_path) {
            Ok(file) if file.metadata()?.is_file() => Ok(file),
            Ok(_) => Err(MapError::KeyNotFound(key.clone())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(MapError::KeyNotFound(key.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn set_impl(
        &self,
        key: &StoreKey,
        value: &[u8],
        offset: u64,
        truncate: bool,
    ) -> Result<(), MapError> {
        self.check_writable()?;
        let file = self.get_file_mutex(key);
        let _lock = file.write();

        // Create directories
        let key_path = self.key_to_fspath(key);
        if let Some(parent) = key_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(key_path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(value)?;
        if self.options.sync_data {
            file.sync_data()?;
        }
        log::trace!("wrote {} bytes at {offset} to {key}", value.len());
        Ok(())
    }

    /// Remove empty directories from `path` up to, but excluding, the root.
    fn remove_empty_parents(&self, path: &Path) {
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir == self.root || std::fs::remove_dir(dir).is_err() {
                break;
            }
            parent = dir.parent();
        }
    }
}

impl MapBackend for FileMap {
    type Options = FileMapOptions;

    fn create(path: &str, mode: MapMode, options: Self::Options) -> Result<Self, MapError> {
        if path.is_empty() {
            return Err(MapError::InvalidPath(path.to_string()));
        }
        let root = Path::new(path);
        if root.exists() {
            if !mode.overwrite() {
                return Err(MapError::MapExists(path.to_string()));
            }
            if root.is_dir() {
                std::fs::remove_dir_all(root)?;
            } else {
                std::fs::remove_file(root)?;
            }
        }
        std::fs::create_dir_all(root)?;
        log::debug!("created file map {path}");
        Self::new(path, mode.with_writable(true), options)
    }

    fn open(path: &str, mode: MapMode, options: Self::Options) -> Result<Self, MapError> {
        if !Path::new(path).is_dir() {
            return Err(MapError::MapNotFound(path.to_string()));
        }
        log::debug!("opened file map {path}");
        Self::new(path, mode, options)
    }
}

impl ReadableMapTraits for FileMap {
    fn len(&self, key: &StoreKey) -> Result<u64, MapError> {
        let file = self.get_file_mutex(key);
        let _lock = file.read();
        Ok(self.open_key(key)?.metadata()?.len())
    }

    fn read(&self, key: &StoreKey, start: u64, count: u64) -> Result<Bytes, MapError> {
        // Lock and open the file
        let file = self.get_file_mutex(key);
        let _lock = file.read();
        let mut file = self.open_key(key)?;

        let size = file.metadata()?.len();
        ByteRange::new(start, count)
            .to_range_usize(size)
            .map_err(|err| MapError::OutOfRange(key.clone(), err))?;

        let mut buffer = read_buffer(count)?;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut buffer)?;
        log::trace!("read {count} bytes at {start} from {key}");
        Ok(Bytes::from(buffer))
    }

    fn exists(&self, key: &StoreKey) -> Result<bool, MapError> {
        Ok(self.key_to_fspath(key).is_file())
    }
}

impl WritableMapTraits for FileMap {
    fn write(&self, key: &StoreKey, start: u64, count: u64, bytes: &[u8]) -> Result<(), MapError> {
        validate_write_count(count, bytes)?;
        self.set_impl(key, bytes, start, false)
    }

    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), MapError> {
        self.set_impl(key, &value, 0, true)
    }

    fn rename(&self, old: &StoreKey, new: &StoreKey) -> Result<(), MapError> {
        self.check_writable()?;
        if old == new {
            return if self.exists(old)? {
                Ok(())
            } else {
                Err(MapError::KeyNotFound(old.clone()))
            };
        }

        // Lock in key order
        let (first, second) = if old < new { (old, new) } else { (new, old) };
        let first = self.get_file_mutex(first);
        let second = self.get_file_mutex(second);
        let _lock_first = first.write();
        let _lock_second = second.write();

        let old_path = self.key_to_fspath(old);
        if !old_path.is_file() {
            return Err(MapError::KeyNotFound(old.clone()));
        }
        let new_path = self.key_to_fspath(new);
        if let Some(parent) = new_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&old_path, &new_path)?;
        self.remove_empty_parents(&old_path);
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), MapError> {
        self.check_writable()?;

        let file = self.get_file_mutex(key);
        let _lock = file.write();

        let key_path = self.key_to_fspath(key);
        match std::fs::remove_file(&key_path) {
            Ok(()) => {
                self.remove_empty_parents(&key_path);
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&self) -> Result<(), MapError> {
        self.check_writable()?;

        let _lock = self.files.lock(); // lock all operations

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(path)?;
            } else {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

impl ListableMapTraits for FileMap {
    fn list(&self, prefix: &StorePrefix) -> Result<Vec<String>, MapError> {
        let dir = match std::fs::read_dir(self.prefix_to_fspath(prefix)) {
            Ok(dir) => dir,
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                return Ok(vec![]);
            }
            Err(err) => return Err(err.into()),
        };
        let mut names = vec![];
        for entry in dir {
            let file_name = entry?.file_name();
            if let Some(name) = file_name.to_str() {
                names.push(name.to_string());
            } else {
                log::warn!(
                    "skipping file {} with a non UTF-8 name",
                    file_name.to_string_lossy()
                );
            }
        }
        names.sort();
        Ok(names)
    }

    fn list_all(&self, prefix: &StorePrefix) -> Result<StoreKeys, MapError> {
        let mut keys: StoreKeys = WalkDir::new(self.prefix_to_fspath(prefix))
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|v| v.file_type().is_file())
            .filter_map(|v| self.fspath_to_key(v.path()))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl MapTraits for FileMap {
    fn implementation(&self) -> MapImpl {
        MapImpl::File
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn mode(&self) -> MapMode {
        self.mode
    }

    fn close(self: Box<Self>, delete: bool) -> Result<(), MapError> {
        if delete {
            match std::fs::remove_dir_all(&self.root) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        log::debug!("closed file map {} (delete: {delete})", self.path);
        Ok(())
    }
}
