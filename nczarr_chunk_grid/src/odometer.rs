//! A multi-dimensional counter over the positions selected by per-dimension slices.

use std::iter::FusedIterator;

use itertools::izip;

use crate::{ArrayIndicesTinyVec, Slice, SliceError, MAX_RANK};

/// An odometer enumerating the positions of a strided N-dimensional selection.
///
/// Iterates over the last dimension fastest (i.e. C-contiguous order).
/// For example, an odometer with `start = [0, 1]`, `stop = [2, 5]`, `stride = [1, 2]` visits
/// ```text
/// (0, 1)  (0, 3)  (1, 1)  (1, 3)
/// ```
///
/// The odometer is driven with [`has_more`](Odometer::has_more), [`current_indices`](Odometer::current_indices) and [`advance`](Odometer::advance).
/// All validation happens in the constructors; traversal cannot fail.
///
/// ### Slabs
/// The *slab* is the longest trailing run of dimensions that is contiguous in row-major order:
/// dimension [`slab1`](Odometer::slab1) and every dimension after it have a stride of 1, and every dimension after [`slab1`](Odometer::slab1) spans its full extent.
/// With slabs enabled (the default), [`linear_offset`](Odometer::linear_offset) is maintained incrementally instead of being summed over every dimension.
/// [`slabs`](Odometer::slabs) iterates over whole contiguous runs.
#[derive(Clone, Debug)]
pub struct Odometer {
    start: ArrayIndicesTinyVec,
    stop: ArrayIndicesTinyVec,
    stride: ArrayIndicesTinyVec,
    max: ArrayIndicesTinyVec,
    index: ArrayIndicesTinyVec,
    /// Row-major element stride of each dimension, the product of `max` over the following dimensions.
    element_stride: ArrayIndicesTinyVec,
    exhausted: bool,
    use_slabs: bool,
    slab1: usize,
    slabprod: u64,
    prefix_offset: u64,
    suffix_offset: u64,
}

impl Odometer {
    /// Create a new odometer from explicit per-dimension arrays.
    ///
    /// `max` is the full extent of each dimension in the underlying array.
    ///
    /// # Errors
    /// Returns a [`SliceError`] if
    ///  - `rank` exceeds [`MAX_RANK`],
    ///  - any per-dimension array does not have `rank` elements,
    ///  - any `stride[d]` is zero,
    ///  - any `start[d] > stop[d]`,
    ///  - any `stop[d] > max[d]`, or
    ///  - the number of elements in `max` overflows [`u64`].
    pub fn new(
        rank: usize,
        start: &[u64],
        stop: &[u64],
        stride: &[u64],
        max: &[u64],
    ) -> Result<Self, SliceError> {
        if rank > MAX_RANK {
            return Err(SliceError::RankTooLarge {
                rank,
                max: MAX_RANK,
            });
        }
        for got in [start.len(), stop.len(), stride.len(), max.len()] {
            if got != rank {
                return Err(SliceError::IncompatibleDimensionality {
                    got,
                    expected: rank,
                });
            }
        }
        for (dim, (&start, &stop, &stride, &max)) in izip!(start, stop, stride, max).enumerate() {
            if stride == 0 {
                return Err(SliceError::ZeroStride { dim });
            }
            if start > stop {
                return Err(SliceError::StartAfterStop { dim, start, stop });
            }
            if stop > max {
                return Err(SliceError::StopBeyondExtent { dim, stop, max });
            }
        }

        let mut element_stride = ArrayIndicesTinyVec::with_capacity(rank);
        element_stride.resize(rank, 1);
        let mut product: u64 = 1;
        for dim in (0..rank).rev() {
            element_stride[dim] = product;
            product = product
                .checked_mul(max[dim])
                .ok_or_else(|| SliceError::ShapeOverflow(max.to_vec()))?;
        }

        let mut odometer = Self {
            start: start.into(),
            stop: stop.into(),
            stride: stride.into(),
            max: max.into(),
            index: start.into(),
            element_stride,
            exhausted: false,
            use_slabs: true,
            slab1: rank,
            slabprod: 1,
            prefix_offset: 0,
            suffix_offset: 0,
        };
        odometer.slabify();
        odometer.reset();
        Ok(odometer)
    }

    /// Create a new odometer from one [`Slice`] per dimension.
    ///
    /// The extent of each dimension (`max`) is not inferable from a slice and must be supplied.
    ///
    /// # Errors
    /// Returns a [`SliceError`] under the same conditions as [`Odometer::new`].
    pub fn from_slices(slices: &[Slice], max: &[u64]) -> Result<Self, SliceError> {
        let start: Vec<u64> = slices.iter().map(Slice::start).collect();
        let stop: Vec<u64> = slices.iter().map(Slice::stop).collect();
        let stride: Vec<u64> = slices.iter().map(Slice::stride).collect();
        Self::new(slices.len(), &start, &stop, &stride, max)
    }

    /// Enable or disable the slab optimisation of [`linear_offset`](Odometer::linear_offset).
    ///
    /// The odometer is reset.
    #[must_use]
    pub fn with_slabs(mut self, use_slabs: bool) -> Self {
        self.use_slabs = use_slabs;
        self.reset();
        self
    }

    /// Find the lowest dimension from which the selection is one contiguous run.
    fn slabify(&mut self) {
        let rank = self.rank();
        if rank == 0 || self.stride[rank - 1] != 1 {
            self.slab1 = rank;
            self.slabprod = 1;
            return;
        }
        let mut slab1 = rank - 1;
        while slab1 > 0 && self.stride[slab1 - 1] == 1 && self.spans_extent(slab1) {
            slab1 -= 1;
        }
        self.slab1 = slab1;
        self.slabprod = self.element_stride[slab1];
    }

    fn spans_extent(&self, dim: usize) -> bool {
        self.start[dim] == 0 && self.stop[dim] == self.max[dim] && self.stride[dim] == 1
    }

    /// The number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.start.len()
    }

    /// The start of each dimension.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// The exclusive stop of each dimension.
    #[must_use]
    pub fn stop(&self) -> &[u64] {
        &self.stop
    }

    /// The stride of each dimension.
    #[must_use]
    pub fn stride(&self) -> &[u64] {
        &self.stride
    }

    /// The full extent of each dimension.
    #[must_use]
    pub fn max(&self) -> &[u64] {
        &self.max
    }

    /// Returns true if the slab optimisation is enabled.
    #[must_use]
    pub fn use_slabs(&self) -> bool {
        self.use_slabs
    }

    /// The lowest dimension of the trailing contiguous run.
    ///
    /// Equal to the rank if the last dimension is strided.
    #[must_use]
    pub fn slab1(&self) -> usize {
        self.slab1
    }

    /// The product of `max` over the dimensions after [`slab1`](Odometer::slab1).
    #[must_use]
    pub fn slabprod(&self) -> u64 {
        self.slabprod
    }

    /// The number of positions the odometer visits from a reset.
    #[must_use]
    pub fn num_positions(&self) -> u64 {
        izip!(&self.start, &self.stop, &self.stride)
            .map(|(&start, &stop, &stride)| (stop - start).div_ceil(stride))
            .product()
    }

    /// Return every index to its start.
    pub fn reset(&mut self) {
        self.index.clone_from(&self.start);
        self.exhausted = std::iter::zip(&self.start, &self.stop).any(|(start, stop)| start == stop);
        self.prefix_offset = self.prefix_offset_unoptimised();
        self.suffix_offset = self.suffix_start_offset();
    }

    /// Returns true while [`current_indices`](Odometer::current_indices) is a valid position.
    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    /// The current position.
    ///
    /// This is a view of the odometer state and changes on the next [`advance`](Odometer::advance).
    #[must_use]
    pub fn current_indices(&self) -> &[u64] {
        &self.index
    }

    /// Step to the next position in row-major order.
    ///
    /// Returns true if a further valid position exists.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let mut dim = self.rank();
        loop {
            if dim == 0 {
                // carry out of the outermost dimension
                self.exhausted = true;
                return false;
            }
            dim -= 1;
            let next = self.index[dim].saturating_add(self.stride[dim]);
            if next < self.stop[dim] {
                self.index[dim] = next;
                break;
            }
            self.index[dim] = self.start[dim];
        }

        if self.use_slabs {
            if dim >= self.slab1 {
                self.suffix_offset += 1;
            } else {
                self.prefix_offset = self.prefix_offset_unoptimised();
                self.suffix_offset = self.suffix_start_offset();
            }
        }
        true
    }

    /// The row-major offset of the current position in an array of shape `max`.
    #[must_use]
    pub fn linear_offset(&self) -> u64 {
        if self.use_slabs {
            self.prefix_offset + self.suffix_offset
        } else {
            self.linear_offset_unoptimised()
        }
    }

    /// The row-major offset of the current position, summed over every dimension.
    #[must_use]
    pub fn linear_offset_unoptimised(&self) -> u64 {
        std::iter::zip(&self.index, &self.element_stride)
            .map(|(index, stride)| index * stride)
            .sum()
    }

    fn prefix_offset_unoptimised(&self) -> u64 {
        std::iter::zip(&self.index[..self.slab1], &self.element_stride[..self.slab1])
            .map(|(index, stride)| index * stride)
            .sum()
    }

    fn suffix_start_offset(&self) -> u64 {
        if self.slab1 < self.rank() {
            self.start[self.slab1] * self.slabprod
        } else {
            0
        }
    }

    /// The number of contiguous elements in each run yielded by [`slabs`](Odometer::slabs).
    #[must_use]
    pub fn slab_length(&self) -> u64 {
        if self.slab1 < self.rank() {
            (self.stop[self.slab1] - self.start[self.slab1]) * self.slabprod
        } else {
            1
        }
    }

    /// Iterate over the contiguous runs of the selection, from the first position.
    ///
    /// Each item is `(linear offset, number of contiguous elements)`.
    /// The dimensions from [`slab1`](Odometer::slab1) are collapsed into a single run.
    #[must_use]
    pub fn slabs(&self) -> Slabs {
        let empty = std::iter::zip(&self.start, &self.stop).any(|(start, stop)| start == stop);
        let mut outer = self.clone();
        outer.use_slabs = false;
        for dim in self.slab1..self.rank() {
            outer.stop[dim] = outer.start[dim] + 1;
        }
        outer.reset();
        outer.exhausted |= empty;
        Slabs {
            outer,
            slab_length: self.slab_length(),
        }
    }
}

/// An iterator over the contiguous runs of an [`Odometer`] selection.
///
/// See [`Odometer::slabs`].
#[derive(Clone, Debug)]
pub struct Slabs {
    outer: Odometer,
    slab_length: u64,
}

impl Iterator for Slabs {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.outer.has_more() {
            let offset = self.outer.linear_offset_unoptimised();
            self.outer.advance();
            Some((offset, self.slab_length))
        } else {
            None
        }
    }
}

impl FusedIterator for Slabs {}
