//! Array subsets.
//!
//! An [`ArraySubset`] represents a rectangular axis-aligned region of an array: a per-axis start
//! and shape, equivalent to half-open intervals `[start, start + shape)`.
//! It is used throughout this library to express region requests and chunk intersections, and it
//! can produce iterators over element indices, contiguous element runs, and covering chunks.

mod iterators;
pub mod selection;

pub use iterators::{
    ChunksIterator, ContiguousIndicesIterator, ContiguousLinearisedIndicesIterator,
    IndicesIterator,
};

use derive_more::Display;
use itertools::izip;
use thiserror::Error;

/// An array subset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: Vec<u64>,
    /// The shape of the array subset.
    shape: Vec<u64>,
}

impl ArraySubset {
    /// Create a new array subset at the origin with `shape`.
    #[must_use]
    pub fn new_with_shape(shape: Vec<u64>) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset from per-axis half-open `ranges`.
    #[must_use]
    pub fn new_with_ranges(ranges: &[std::ops::Range<u64>]) -> Self {
        Self {
            start: ranges.iter().map(|range| range.start).collect(),
            shape: ranges
                .iter()
                .map(|range| range.end.saturating_sub(range.start))
                .collect(),
        }
    }

    /// Create a new array subset from `start` and `shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: Vec<u64>,
        shape: Vec<u64>,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(
                start.len(),
                shape.len(),
            ))
        }
    }

    /// Create a new array subset from `start` and an exclusive `end`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `end` do not match.
    pub fn new_with_start_end_exc(
        start: Vec<u64>,
        end: &[u64],
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == end.len() {
            let shape = std::iter::zip(&start, end)
                .map(|(start, end)| end.saturating_sub(*start))
                .collect();
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError::new(start.len(), end.len()))
        }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> Vec<u64> {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    ///
    /// Equal to the product of the components of its shape.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of elements of the array subset as a [`usize`].
    ///
    /// # Panics
    /// Panics if [`num_elements()`](Self::num_elements()) is greater than [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns true if the array subset has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        if self.dimensionality() != array_shape.len() {
            return false;
        }
        izip!(&self.start, &self.shape, array_shape)
            .all(|(start, shape, array_shape)| start + shape <= *array_shape)
    }

    /// Return the intersection of this array subset with `other`.
    ///
    /// Both subsets are in the same (absolute) coordinate system.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `other` does not
    /// match the dimensionality of this array subset.
    pub fn overlap(&self, other: &ArraySubset) -> Result<ArraySubset, IncompatibleDimensionalityError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let mut starts = Vec::with_capacity(self.dimensionality());
        let mut shapes = Vec::with_capacity(self.dimensionality());
        for (start, size, other_start, other_size) in
            izip!(&self.start, &self.shape, other.start(), other.shape())
        {
            let overlap_start = std::cmp::max(*start, *other_start);
            let overlap_end = std::cmp::min(start + size, other_start + other_size);
            starts.push(overlap_start);
            shapes.push(overlap_end.saturating_sub(overlap_start));
        }
        Ok(ArraySubset {
            start: starts,
            shape: shapes,
        })
    }

    /// Return this array subset relative to `start`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `start` does not match the
    /// dimensionality of this array subset.
    ///
    /// # Panics
    /// Panics if any component of `start` exceeds the matching start of this array subset.
    pub fn relative_to(&self, start: &[u64]) -> Result<ArraySubset, IncompatibleDimensionalityError> {
        if start.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                start.len(),
                self.dimensionality(),
            ));
        }
        Ok(ArraySubset {
            start: std::iter::zip(&self.start, start)
                .map(|(self_start, start)| self_start.checked_sub(*start).unwrap())
                .collect(),
            shape: self.shape.clone(),
        })
    }

    /// Return the bytes in this array subset from the C-order `bytes` of an array with shape
    /// `array_shape` and `element_size`.
    ///
    /// # Errors
    /// Returns [`ArrayExtractBytesError`] if the length of `array_shape` does not match the array
    /// subset dimensionality, the subset is not within the array bounds, or `bytes` has an
    /// unexpected length.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, ArrayExtractBytesError> {
        if !self.inbounds(array_shape)
            || bytes.len() as u64 != array_shape.iter().product::<u64>() * element_size as u64
        {
            return Err(ArrayExtractBytesError(
                self.clone(),
                array_shape.to_vec(),
                element_size,
            ));
        }
        let mut bytes_subset: Vec<u8> =
            Vec::with_capacity(self.num_elements_usize() * element_size);
        for (array_index, contiguous_elements) in self
            .iter_contiguous_linearised_indices(array_shape)
            .expect("dimensionality already validated")
        {
            let byte_index = usize::try_from(array_index).unwrap() * element_size;
            let byte_length = usize::try_from(contiguous_elements).unwrap() * element_size;
            debug_assert!(byte_index + byte_length <= bytes.len());
            bytes_subset.extend_from_slice(&bytes[byte_index..byte_index + byte_length]);
        }
        Ok(bytes_subset)
    }

    /// Returns an iterator over the indices of elements within the subset.
    #[must_use]
    pub fn iter_indices(&self) -> IndicesIterator {
        IndicesIterator::new(self.clone())
    }

    /// Collect the indices of elements within the subset.
    #[must_use]
    pub fn indices(&self) -> Vec<Vec<u64>> {
        self.iter_indices().collect()
    }

    /// Returns an iterator over the indices of contiguous element runs within the subset of an
    /// array with `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `array_shape` does not match
    /// the array subset dimensionality.
    pub fn iter_contiguous_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousIndicesIterator, IncompatibleDimensionalityError> {
        if self.dimensionality() == array_shape.len() {
            Ok(ContiguousIndicesIterator::new(self, array_shape))
        } else {
            Err(IncompatibleDimensionalityError::new(
                array_shape.len(),
                self.dimensionality(),
            ))
        }
    }

    /// Returns an iterator over the linearised indices of contiguous element runs within the
    /// subset of an array with `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `array_shape` does not match
    /// the array subset dimensionality.
    pub fn iter_contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousLinearisedIndicesIterator, IncompatibleDimensionalityError> {
        Ok(ContiguousLinearisedIndicesIterator::new(
            self.iter_contiguous_indices(array_shape)?,
            array_shape.to_vec(),
        ))
    }

    /// Returns an iterator over chunks with shape `chunk_shape` overlapping the array subset.
    ///
    /// All chunks overlapping the array subset are returned, and they all have the same shape
    /// `chunk_shape`; the chunk subsets may thus extend beyond the array subset.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `chunk_shape` does not match
    /// the array subset dimensionality.
    pub fn iter_chunks(
        &self,
        chunk_shape: &[u64],
    ) -> Result<ChunksIterator, IncompatibleDimensionalityError> {
        if chunk_shape.len() == self.dimensionality() {
            Ok(ChunksIterator::new(self, chunk_shape))
        } else {
            Err(IncompatibleDimensionalityError::new(
                chunk_shape.len(),
                self.dimensionality(),
            ))
        }
    }
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An array extract bytes error.
#[derive(Debug, Error)]
#[error("array subset {_0} is incompatible with array of shape {_1:?} and element size {_2}")]
pub struct ArrayExtractBytesError(ArraySubset, Vec<u64>, usize);
