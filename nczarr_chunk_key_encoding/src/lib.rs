//! The chunk key encoding for the [`nczarr`](https://docs.rs/nczarr/latest/nczarr/index.html) crate.
//!
//! A chunk is stored under its array path followed by the decimal chunk indices joined by a [`ChunkKeySeparator`].
//! For example, chunk `[3, 0, 1]` of array `group1/array2` is stored at `group1/array2/3.0.1`.
//!
//! ## Licence
//! `nczarr_chunk_key_encoding` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use nczarr_storage::{StoreKey, StoreKeyError};

/// A chunk key separator.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Display, Serialize, Deserialize)]
pub enum ChunkKeySeparator {
    /// The dot '.' character.
    #[default]
    #[display(".")]
    #[serde(rename = ".")]
    Dot,
    /// The slash '/' character.
    #[display("/")]
    #[serde(rename = "/")]
    Slash,
}

impl TryFrom<char> for ChunkKeySeparator {
    type Error = char;

    fn try_from(separator: char) -> Result<Self, Self::Error> {
        match separator {
            '.' => Ok(Self::Dot),
            '/' => Ok(Self::Slash),
            _ => Err(separator),
        }
    }
}

impl From<ChunkKeySeparator> for char {
    fn from(separator: ChunkKeySeparator) -> Self {
        match separator {
            ChunkKeySeparator::Dot => '.',
            ChunkKeySeparator::Slash => '/',
        }
    }
}

/// A chunk key encoding.
///
/// The key of a chunk with at least one dimension is the decimal index in each dimension joined by the separator.
/// A scalar (rank 0) chunk has the key `0`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct ChunkKeyEncoding {
    separator: ChunkKeySeparator,
}

impl ChunkKeyEncoding {
    /// Create a new chunk key encoding with separator `separator`.
    #[must_use]
    pub const fn new(separator: ChunkKeySeparator) -> Self {
        Self { separator }
    }

    /// Create a new chunk key encoding with separator `.`.
    #[must_use]
    pub const fn new_dot() -> Self {
        Self::new(ChunkKeySeparator::Dot)
    }

    /// Create a new chunk key encoding with separator `/`.
    #[must_use]
    pub const fn new_slash() -> Self {
        Self::new(ChunkKeySeparator::Slash)
    }

    /// The separator.
    #[must_use]
    pub const fn separator(&self) -> ChunkKeySeparator {
        self.separator
    }

    /// Encode chunk grid indices into the chunk name relative to its array.
    #[must_use]
    pub fn encode(&self, chunk_indices: &[u64]) -> String {
        if chunk_indices.is_empty() {
            return '0'.to_string();
        }
        let mut separator = [0; 4];
        let separator: &str = char::from(self.separator).encode_utf8(&mut separator);
        let mut buffers = vec![itoa::Buffer::new(); chunk_indices.len()];
        chunk_indices
            .iter()
            .zip(&mut buffers)
            .map(|(&index, buffer)| buffer.format(index))
            .join(separator)
    }

    /// The store key of the chunk at `chunk_indices` of the array at `array_path`.
    ///
    /// Leading and trailing `/` of `array_path` are ignored, and an empty path is the root.
    ///
    /// # Errors
    /// Returns a [`StoreKeyError`] if `array_path` has empty, `.` or `..` components.
    pub fn chunk_key(
        &self,
        array_path: &str,
        chunk_indices: &[u64],
    ) -> Result<StoreKey, StoreKeyError> {
        let array_path = array_path.trim_matches('/');
        let name = self.encode(chunk_indices);
        if array_path.is_empty() {
            StoreKey::new(name)
        } else {
            StoreKey::new(format!("{array_path}/{name}"))
        }
    }
}
