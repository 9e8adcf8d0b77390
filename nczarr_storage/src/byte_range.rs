//! Byte ranges.
//!
//! A [`ByteRange`] addresses `count` bytes of a value starting at byte `start`.

use std::ops::Range;

use thiserror::Error;

/// A byte offset.
pub type ByteOffset = u64;

/// A byte length.
pub type ByteLength = u64;

/// A byte range.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ByteRange {
    start: ByteOffset,
    count: ByteLength,
}

/// An invalid byte range error.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("invalid byte range {byte_range:?} for bytes of length {size}")]
pub struct InvalidByteRangeError {
    byte_range: ByteRange,
    size: u64,
}

impl InvalidByteRangeError {
    /// Create a new [`InvalidByteRangeError`].
    #[must_use]
    pub const fn new(byte_range: ByteRange, size: u64) -> Self {
        Self { byte_range, size }
    }
}

impl ByteRange {
    /// Create a new byte range.
    #[must_use]
    pub const fn new(start: ByteOffset, count: ByteLength) -> Self {
        Self { start, count }
    }

    /// The first byte of the range.
    #[must_use]
    pub const fn start(&self) -> ByteOffset {
        self.start
    }

    /// The number of bytes in the range.
    #[must_use]
    pub const fn count(&self) -> ByteLength {
        self.count
    }

    /// The exclusive end of the range, if it does not overflow.
    #[must_use]
    pub const fn end(&self) -> Option<ByteOffset> {
        self.start.checked_add(self.count)
    }

    /// Convert to a [`Range<usize>`] into a value of `size` bytes.
    ///
    /// # Errors
    /// Returns [`InvalidByteRangeError`] if the range ends beyond `size`.
    pub fn to_range_usize(&self, size: u64) -> Result<Range<usize>, InvalidByteRangeError> {
        let error = InvalidByteRangeError::new(*self, size);
        match self.end() {
            Some(end) if end <= size => {
                let start = usize::try_from(self.start).map_err(|_| error)?;
                let end = usize::try_from(end).map_err(|_| error)?;
                Ok(start..end)
            }
            _ => Err(error),
        }
    }
}
