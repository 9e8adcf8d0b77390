//! The cross product of per-dimension projections.

use std::iter::FusedIterator;

use crate::{
    projection::project_dimension_impl, ArrayIndicesTinyVec, Odometer, Projection, Slice,
    SliceError, MAX_RANK,
};

/// The projections of a selection onto one chunk, one [`Projection`] per dimension.
///
/// This is the unit of storage access: one chunk is read or written per [`SliceProjections`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SliceProjections {
    chunk_indices: ArrayIndicesTinyVec,
    projections: Vec<Projection>,
}

impl SliceProjections {
    /// The chunk grid indices of the chunk.
    #[must_use]
    pub fn chunk_indices(&self) -> &[u64] {
        &self.chunk_indices
    }

    /// The per-dimension projections.
    #[must_use]
    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// The selected elements in chunk-local coordinates, one slice per dimension.
    #[must_use]
    pub fn chunk_slices(&self) -> Vec<Slice> {
        self.projections.iter().map(|p| *p.chunk_slice()).collect()
    }

    /// The selected elements in the coordinates of the caller's buffer, one slice per dimension.
    #[must_use]
    pub fn memory_slices(&self) -> Vec<Slice> {
        self.projections.iter().map(|p| *p.memory_slice()).collect()
    }

    /// The number of selected elements in the chunk.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.projections.iter().map(Projection::count).product()
    }

    /// Return an odometer over the selected elements of a chunk with shape `chunk_shape`.
    ///
    /// # Errors
    /// Returns a [`SliceError`] if `chunk_shape` is incompatible with the projections.
    pub fn chunk_odometer(&self, chunk_shape: &[u64]) -> Result<Odometer, SliceError> {
        Odometer::from_slices(&self.chunk_slices(), chunk_shape)
    }

    /// Return an odometer over the destination elements in a caller's buffer with shape `memory_shape`.
    ///
    /// It visits positions in the same order as [`chunk_odometer`](SliceProjections::chunk_odometer).
    ///
    /// # Errors
    /// Returns a [`SliceError`] if `memory_shape` is incompatible with the projections.
    pub fn memory_odometer(&self, memory_shape: &[u64]) -> Result<Odometer, SliceError> {
        Odometer::from_slices(&self.memory_slices(), memory_shape)
    }
}

/// The projections of an N-dimensional strided selection onto every chunk it touches.
///
/// A chunk is touched only if every dimension contributes at least one element.
/// The per-dimension projections are computed on creation; the cross product is produced lazily in row-major chunk order by [`iter`](ChunkProjections::iter), which may be called any number of times.
#[derive(Clone, Debug)]
pub struct ChunkProjections {
    dimensions: Vec<Vec<Projection>>,
    odometer: Odometer,
}

impl ChunkProjections {
    /// Create the projections of `slices` onto a regular grid of chunks with shape `chunk_shape`.
    ///
    /// # Errors
    /// Returns a [`SliceError`] if
    ///  - the rank exceeds [`MAX_RANK`],
    ///  - `slices` and `chunk_shape` have different lengths, or
    ///  - any chunk length is zero.
    pub fn new(slices: &[Slice], chunk_shape: &[u64]) -> Result<Self, SliceError> {
        Self::new_impl(slices, chunk_shape, None)
    }

    /// Create the projections of `slices` onto the chunks of an array with shape `array_shape`.
    ///
    /// The [`limit`](Projection::limit) of each projection is clipped to the array extent.
    ///
    /// # Errors
    /// Returns a [`SliceError`] under the conditions of [`ChunkProjections::new`], or if `array_shape` has a different length or any slice ends beyond the array extent.
    pub fn new_with_array_shape(
        slices: &[Slice],
        chunk_shape: &[u64],
        array_shape: &[u64],
    ) -> Result<Self, SliceError> {
        Self::new_impl(slices, chunk_shape, Some(array_shape))
    }

    fn new_impl(
        slices: &[Slice],
        chunk_shape: &[u64],
        array_shape: Option<&[u64]>,
    ) -> Result<Self, SliceError> {
        let rank = slices.len();
        if rank > MAX_RANK {
            return Err(SliceError::RankTooLarge {
                rank,
                max: MAX_RANK,
            });
        }
        if chunk_shape.len() != rank {
            return Err(SliceError::IncompatibleDimensionality {
                got: chunk_shape.len(),
                expected: rank,
            });
        }
        if let Some(array_shape) = array_shape {
            if array_shape.len() != rank {
                return Err(SliceError::IncompatibleDimensionality {
                    got: array_shape.len(),
                    expected: rank,
                });
            }
            for (dim, (slice, &max)) in std::iter::zip(slices, array_shape).enumerate() {
                if slice.stop() > max {
                    return Err(SliceError::StopBeyondExtent {
                        dim,
                        stop: slice.stop(),
                        max,
                    });
                }
            }
        }

        let dimensions = slices
            .iter()
            .zip(chunk_shape)
            .enumerate()
            .map(|(dim, (slice, &chunk_len))| {
                let extent = array_shape.map(|shape| shape[dim]);
                project_dimension_impl(slice, chunk_len, extent)
            })
            .collect::<Result<Vec<Vec<Projection>>, _>>()?;

        // an odometer over the indices of the per-dimension projection lists
        let lengths: Vec<u64> = dimensions.iter().map(|d| d.len() as u64).collect();
        let zeros = vec![0; rank];
        let ones = vec![1; rank];
        let odometer = Odometer::new(rank, &zeros, &lengths, &ones, &lengths)?.with_slabs(false);
        Ok(Self {
            dimensions,
            odometer,
        })
    }

    /// The number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// The non-empty projections of dimension `dim`, in increasing chunk order.
    ///
    /// # Panics
    /// Panics if `dim` is not less than the rank.
    #[must_use]
    pub fn dimension(&self, dim: usize) -> &[Projection] {
        &self.dimensions[dim]
    }

    /// The number of touched chunks.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.dimensions.iter().map(|d| d.len() as u64).product()
    }

    /// Returns true if no chunk is touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_chunks() == 0
    }

    /// Iterate over the touched chunks in row-major chunk order.
    #[must_use]
    pub fn iter(&self) -> ChunkProjectionsIterator<'_> {
        ChunkProjectionsIterator::new(self)
    }
}

impl<'a> IntoIterator for &'a ChunkProjections {
    type Item = SliceProjections;
    type IntoIter = ChunkProjectionsIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the [`SliceProjections`] of a [`ChunkProjections`].
///
/// See [`ChunkProjections::iter`].
#[derive(Clone, Debug)]
pub struct ChunkProjectionsIterator<'a> {
    projections: &'a ChunkProjections,
    odometer: Odometer,
    remaining: u64,
}

impl<'a> ChunkProjectionsIterator<'a> {
    fn new(projections: &'a ChunkProjections) -> Self {
        Self {
            projections,
            odometer: projections.odometer.clone(),
            remaining: projections.num_chunks(),
        }
    }
}

impl Iterator for ChunkProjectionsIterator<'_> {
    type Item = SliceProjections;

    #[allow(clippy::cast_possible_truncation)]
    fn next(&mut self) -> Option<Self::Item> {
        if !self.odometer.has_more() {
            return None;
        }
        let projections: Vec<Projection> = std::iter::zip(
            &self.projections.dimensions,
            self.odometer.current_indices(),
        )
        .map(|(dimension, &i)| dimension[i as usize])
        .collect();
        let chunk_indices = projections.iter().map(Projection::chunk_index).collect();
        self.odometer.advance();
        self.remaining = self.remaining.saturating_sub(1);
        Some(SliceProjections {
            chunk_indices,
            projections,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl ExactSizeIterator for ChunkProjectionsIterator<'_> {}

impl FusedIterator for ChunkProjectionsIterator<'_> {}
