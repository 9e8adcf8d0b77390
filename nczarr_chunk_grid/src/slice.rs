use std::fmt::Display;
use std::ops::Range;

use nczarr_shared::ErrorKind;
use thiserror::Error;

/// An invalid slice, odometer or projection request.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[allow(missing_docs)]
pub enum SliceError {
    /// The slice has a zero stride or a start beyond its stop.
    #[error("invalid slice {start}:{stop}:{stride}")]
    InvalidSlice { start: u64, stop: u64, stride: u64 },
    /// The rank exceeds [`MAX_RANK`](crate::MAX_RANK).
    #[error("rank {rank} exceeds the maximum supported rank {max}")]
    RankTooLarge { rank: usize, max: usize },
    /// A per-dimension argument does not have one entry per dimension.
    #[error("incompatible dimensionality {got}, expected {expected}")]
    IncompatibleDimensionality { got: usize, expected: usize },
    /// A zero stride.
    #[error("stride of dimension {dim} is zero")]
    ZeroStride { dim: usize },
    /// A start beyond the stop.
    #[error("start {start} exceeds stop {stop} in dimension {dim}")]
    StartAfterStop { dim: usize, start: u64, stop: u64 },
    /// A stop beyond the extent of the dimension.
    #[error("stop {stop} exceeds the extent {max} of dimension {dim}")]
    StopBeyondExtent { dim: usize, stop: u64, max: u64 },
    /// A slice which selects no elements where at least one is required.
    #[error("slice {0} selects no elements")]
    EmptySlice(Slice),
    /// A zero chunk length.
    #[error("chunk length is zero")]
    ZeroChunkLength,
    /// The number of elements in an array shape overflows [`u64`].
    #[error("the number of elements in shape {0:?} overflows u64")]
    ShapeOverflow(Vec<u64>),
}

impl SliceError {
    /// Returns the [`ErrorKind`] of the error.
    ///
    /// Slice errors are always [`ErrorKind::InvalidArgument`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// The access pattern of one dimension: `start, start + stride, ...` strictly less than `stop`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Slice {
    start: u64,
    stop: u64,
    stride: u64,
}

impl Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.stop, self.stride)
    }
}

impl Slice {
    /// Create a new slice.
    ///
    /// # Errors
    /// Returns [`SliceError::InvalidSlice`] if `stride` is zero or `start > stop`.
    pub fn new(start: u64, stop: u64, stride: u64) -> Result<Self, SliceError> {
        if stride == 0 || start > stop {
            Err(SliceError::InvalidSlice {
                start,
                stop,
                stride,
            })
        } else {
            Ok(Self {
                start,
                stop,
                stride,
            })
        }
    }

    /// Create a new unit stride slice from a [`Range`].
    ///
    /// # Errors
    /// Returns [`SliceError::InvalidSlice`] if the range end precedes its start.
    pub fn from_range(range: Range<u64>) -> Result<Self, SliceError> {
        Self::new(range.start, range.end, 1)
    }

    /// Create a new slice from a start, a count of elements and a stride.
    ///
    /// This is the netCDF `start`/`count`/`stride` form of a hyperslab.
    ///
    /// # Errors
    /// Returns [`SliceError::InvalidSlice`] if `stride` is zero or the slice end overflows.
    pub fn from_start_count(start: u64, count: u64, stride: u64) -> Result<Self, SliceError> {
        let invalid = SliceError::InvalidSlice {
            start,
            stop: start,
            stride,
        };
        if stride == 0 {
            return Err(invalid);
        }
        if count == 0 {
            return Self::new(start, start, stride);
        }
        let stop = (count - 1)
            .checked_mul(stride)
            .and_then(|span| span.checked_add(start))
            .and_then(|last| last.checked_add(1))
            .ok_or(invalid)?;
        Self::new(start, stop, stride)
    }

    /// The first index of the slice.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// The exclusive end of the slice.
    #[must_use]
    pub const fn stop(&self) -> u64 {
        self.stop
    }

    /// The step between selected indices.
    #[must_use]
    pub const fn stride(&self) -> u64 {
        self.stride
    }

    /// The number of selected indices, `ceil((stop - start) / stride)`.
    #[must_use]
    pub const fn count(&self) -> u64 {
        (self.stop - self.start).div_ceil(self.stride)
    }

    /// Returns true if the slice selects no indices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// The last selected index, if any.
    #[must_use]
    pub const fn last(&self) -> Option<u64> {
        if self.is_empty() {
            None
        } else {
            Some(self.start + (self.count() - 1) * self.stride)
        }
    }

    /// Returns true if `index` is selected by the slice.
    #[must_use]
    pub const fn contains(&self, index: u64) -> bool {
        index >= self.start && index < self.stop && (index - self.start) % self.stride == 0
    }

    /// Iterate over the selected indices.
    pub fn indices(&self) -> impl Iterator<Item = u64> {
        let start = self.start;
        let stride = self.stride;
        (0..self.count()).map(move |i| start + i * stride)
    }
}
