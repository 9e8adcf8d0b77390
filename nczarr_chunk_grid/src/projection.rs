//! Projection of a strided slice onto the chunks of one dimension.

use std::ops::RangeInclusive;

use crate::{Slice, SliceError};

/// The inclusive range of chunk indices overlapped by a slice in one dimension.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChunkRange {
    first: u64,
    last: u64,
}

impl ChunkRange {
    /// The first chunk index.
    #[must_use]
    pub const fn first(&self) -> u64 {
        self.first
    }

    /// The last chunk index (inclusive).
    #[must_use]
    pub const fn last(&self) -> u64 {
        self.last
    }

    /// The number of chunks in the range.
    #[must_use]
    pub const fn num_chunks(&self) -> u64 {
        self.last - self.first + 1
    }

    /// The chunk indices in the range.
    #[must_use]
    pub const fn to_range(&self) -> RangeInclusive<u64> {
        self.first..=self.last
    }
}

/// Return the range of chunks overlapped by `slice` along a dimension with chunks of length `chunk_len`.
///
/// Chunks in the range may contribute no element when the stride exceeds the chunk length, see [`project`].
///
/// # Errors
/// Returns [`SliceError::EmptySlice`] if the slice selects nothing, or [`SliceError::ZeroChunkLength`] if `chunk_len` is zero.
pub fn chunk_range(slice: &Slice, chunk_len: u64) -> Result<ChunkRange, SliceError> {
    if chunk_len == 0 {
        return Err(SliceError::ZeroChunkLength);
    }
    if slice.is_empty() {
        return Err(SliceError::EmptySlice(*slice));
    }
    Ok(ChunkRange {
        first: slice.start() / chunk_len,
        last: (slice.stop() - 1) / chunk_len,
    })
}

/// The part of a slice that falls into one chunk along one dimension.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Projection {
    chunk_index: u64,
    offset: u64,
    limit: u64,
    chunk_slice: Slice,
    memory_slice: Slice,
}

impl Projection {
    /// The chunk index along the dimension.
    #[must_use]
    pub const fn chunk_index(&self) -> u64 {
        self.chunk_index
    }

    /// The absolute index of the first element of the chunk, `chunk_index * chunk_len`.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// The number of valid elements in the chunk.
    ///
    /// This is the chunk length, unless the chunk overhangs a known array extent.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// The selected elements in chunk-local coordinates.
    #[must_use]
    pub const fn chunk_slice(&self) -> &Slice {
        &self.chunk_slice
    }

    /// The selected elements in the coordinates of the caller's buffer for this dimension.
    ///
    /// The caller's buffer is dense, so the stride is always 1.
    #[must_use]
    pub const fn memory_slice(&self) -> &Slice {
        &self.memory_slice
    }

    /// The number of selected elements.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.chunk_slice.count()
    }

    /// The absolute index of the last selected element.
    #[must_use]
    pub const fn last_index(&self) -> u64 {
        self.offset + self.chunk_slice.start() + (self.count() - 1) * self.chunk_slice.stride()
    }
}

/// Return the projection of `slice` onto chunk `chunk_index` with chunks of length `chunk_len`.
///
/// Returns [`None`] if the chunk contributes no element, which includes chunks within the [`chunk_range`] skipped over by a large stride.
///
/// # Errors
/// Returns [`SliceError::ZeroChunkLength`] if `chunk_len` is zero.
pub fn project(
    slice: &Slice,
    chunk_len: u64,
    chunk_index: u64,
) -> Result<Option<Projection>, SliceError> {
    project_impl(slice, chunk_len, chunk_index, None)
}

/// Return the projection of `slice` onto chunk `chunk_index`, clipping the chunk [`limit`](Projection::limit) to an array `extent`.
///
/// # Errors
/// Returns [`SliceError::ZeroChunkLength`] if `chunk_len` is zero or [`SliceError::StopBeyondExtent`] if the slice ends beyond `extent`.
pub fn project_with_extent(
    slice: &Slice,
    chunk_len: u64,
    chunk_index: u64,
    extent: u64,
) -> Result<Option<Projection>, SliceError> {
    if slice.stop() > extent {
        return Err(SliceError::StopBeyondExtent {
            dim: 0,
            stop: slice.stop(),
            max: extent,
        });
    }
    project_impl(slice, chunk_len, chunk_index, Some(extent))
}

fn project_impl(
    slice: &Slice,
    chunk_len: u64,
    chunk_index: u64,
    extent: Option<u64>,
) -> Result<Option<Projection>, SliceError> {
    if chunk_len == 0 {
        return Err(SliceError::ZeroChunkLength);
    }
    let Some(offset) = chunk_index.checked_mul(chunk_len) else {
        return Ok(None);
    };
    let stride = slice.stride();

    // first selected index at or after the chunk start
    let first = if slice.start() >= offset {
        slice.start()
    } else {
        let steps = (offset - slice.start()).div_ceil(stride);
        match steps
            .checked_mul(stride)
            .and_then(|span| span.checked_add(slice.start()))
        {
            Some(first) => first,
            None => return Ok(None),
        }
    };
    let bound = slice.stop().min(offset.saturating_add(chunk_len));
    if first >= bound {
        return Ok(None);
    }

    let count = (bound - first).div_ceil(stride);
    let last = first + (count - 1) * stride;
    let chunk_slice = Slice::new(first - offset, last + 1 - offset, stride)?;
    let memory_start = (first - slice.start()) / stride;
    let memory_slice = Slice::new(memory_start, memory_start + count, 1)?;
    let limit = extent.map_or(chunk_len, |extent| {
        chunk_len.min(extent.saturating_sub(offset))
    });

    Ok(Some(Projection {
        chunk_index,
        offset,
        limit,
        chunk_slice,
        memory_slice,
    }))
}

/// Return every non-empty projection of `slice` along a dimension, in increasing chunk order.
///
/// Chunks skipped over by the stride are not visited. An empty slice has no projections.
///
/// # Errors
/// Returns [`SliceError::ZeroChunkLength`] if `chunk_len` is zero.
pub fn project_dimension(slice: &Slice, chunk_len: u64) -> Result<Vec<Projection>, SliceError> {
    project_dimension_impl(slice, chunk_len, None)
}

pub(crate) fn project_dimension_impl(
    slice: &Slice,
    chunk_len: u64,
    extent: Option<u64>,
) -> Result<Vec<Projection>, SliceError> {
    if chunk_len == 0 {
        return Err(SliceError::ZeroChunkLength);
    }
    let mut projections = Vec::new();
    let mut index = slice.start();
    while index < slice.stop() {
        let Some(projection) = project_impl(slice, chunk_len, index / chunk_len, extent)? else {
            break;
        };
        let Some(next) = projection.last_index().checked_add(slice.stride()) else {
            projections.push(projection);
            break;
        };
        projections.push(projection);
        index = next;
    }
    Ok(projections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_range_aligned() {
        for (start, stop, chunk_len) in [(0, 16, 4), (4, 12, 2), (10, 40, 10)] {
            let range = chunk_range(&Slice::new(start, stop, 1).unwrap(), chunk_len).unwrap();
            assert_eq!(range.num_chunks(), (stop - start) / chunk_len);
        }
    }

    #[test]
    fn chunk_range_invalid() {
        let slice = Slice::new(2, 9, 1).unwrap();
        assert_eq!(chunk_range(&slice, 4).unwrap().to_range(), 0..=2);
        assert_eq!(
            chunk_range(&slice, 0).unwrap_err(),
            SliceError::ZeroChunkLength
        );
        let empty = Slice::new(3, 3, 1).unwrap();
        assert_eq!(
            chunk_range(&empty, 4).unwrap_err(),
            SliceError::EmptySlice(empty)
        );
    }

    #[test]
    fn project_unit_stride() {
        let slice = Slice::new(2, 9, 1).unwrap();
        let projection = project(&slice, 4, 0).unwrap().unwrap();
        assert_eq!(projection.offset(), 0);
        assert_eq!(projection.chunk_slice(), &Slice::new(2, 4, 1).unwrap());
        assert_eq!(projection.memory_slice(), &Slice::new(0, 2, 1).unwrap());

        let projection = project(&slice, 4, 1).unwrap().unwrap();
        assert_eq!(projection.chunk_slice(), &Slice::new(0, 4, 1).unwrap());
        assert_eq!(projection.memory_slice(), &Slice::new(2, 6, 1).unwrap());

        let projection = project(&slice, 4, 2).unwrap().unwrap();
        assert_eq!(projection.offset(), 8);
        assert_eq!(projection.chunk_slice(), &Slice::new(0, 1, 1).unwrap());
        assert_eq!(projection.memory_slice(), &Slice::new(6, 7, 1).unwrap());
        assert_eq!(projection.count(), 1);

        assert_eq!(project(&slice, 4, 3).unwrap(), None);
    }

    #[test]
    fn project_strided() {
        // selects 1, 4, 7, 10
        let slice = Slice::new(1, 11, 3).unwrap();
        let projection = project(&slice, 4, 1).unwrap().unwrap();
        assert_eq!(projection.chunk_slice(), &Slice::new(0, 4, 3).unwrap());
        assert_eq!(projection.memory_slice(), &Slice::new(1, 3, 1).unwrap());
        assert_eq!(projection.last_index(), 7);

        let projection = project(&slice, 4, 2).unwrap().unwrap();
        assert_eq!(projection.chunk_slice(), &Slice::new(2, 3, 3).unwrap());
        assert_eq!(projection.memory_slice(), &Slice::new(3, 4, 1).unwrap());
    }

    #[test]
    fn project_skipped_chunks() {
        // selects 0, 10, 20 with chunks of 3
        let slice = Slice::new(0, 21, 10).unwrap();
        assert_eq!(chunk_range(&slice, 3).unwrap().to_range(), 0..=6);
        assert!(project(&slice, 3, 1).unwrap().is_none());
        assert!(project(&slice, 3, 2).unwrap().is_none());
        let chunks: Vec<u64> = project_dimension(&slice, 3)
            .unwrap()
            .iter()
            .map(Projection::chunk_index)
            .collect();
        assert_eq!(chunks, vec![0, 3, 6]);
    }

    #[test]
    fn project_extent() {
        let slice = Slice::new(2, 10, 1).unwrap();
        let projection = project_with_extent(&slice, 4, 2, 10).unwrap().unwrap();
        assert_eq!(projection.limit(), 2);
        assert_eq!(project(&slice, 4, 2).unwrap().unwrap().limit(), 4);
        assert!(project_with_extent(&slice, 4, 2, 9).is_err());
    }

    #[test]
    fn project_dimension_empty() {
        let slice = Slice::new(5, 5, 1).unwrap();
        assert!(project_dimension(&slice, 4).unwrap().is_empty());
        assert!(project_dimension(&slice, 0).is_err());
    }

    #[test]
    fn project_dimension_memory_contiguous() {
        let slice = Slice::new(3, 50, 7).unwrap();
        let projections = project_dimension(&slice, 5).unwrap();
        let mut next = 0;
        for projection in &projections {
            assert_eq!(projection.memory_slice().start(), next);
            next = projection.memory_slice().stop();
        }
        assert_eq!(next, slice.count());
    }
}
