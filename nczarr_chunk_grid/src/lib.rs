//! Strided slices, the odometer and chunk projections for the [`nczarr`](https://docs.rs/nczarr/latest/nczarr/index.html) crate.
//!
//! A read or write of an N-dimensional variable is described by one [`Slice`] per dimension.
//! [`ChunkProjections`] resolves the slices against a regular chunk shape into the sequence of chunks they touch,
//! and for each chunk the chunk-local and caller-buffer ranges to transfer ([`SliceProjections`]).
//! An [`Odometer`] walks a strided selection in row-major order and computes linear offsets.
//!
//! ## Licence
//! `nczarr_chunk_grid` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.

mod slice;
pub use slice::{Slice, SliceError};

mod odometer;
pub use odometer::{Odometer, Slabs};

mod projection;
pub use projection::{
    chunk_range, project, project_dimension, project_with_extent, ChunkRange, Projection,
};

mod slice_projections;
pub use slice_projections::{ChunkProjections, ChunkProjectionsIterator, SliceProjections};

/// The maximum number of dimensions of a variable.
pub const MAX_RANK: usize = 1024;

/// An ND index to an element in an array or chunk.
/// Uses [`TinyVec`](tinyvec::TinyVec) for stack allocation up to 4 dimensions.
pub type ArrayIndicesTinyVec = tinyvec::TinyVec<[u64; 4]>;
