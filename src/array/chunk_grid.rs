//! The regular chunk grid.

use crate::array_subset::{ArraySubset, IncompatibleDimensionalityError};

/// A regular chunk grid: chunks of a fixed shape tile the array from the origin.
///
/// The grid has `ceil(array_shape / chunk_shape)` chunks per axis.
/// Chunks on the upper border of an axis may extend beyond the array shape; their *bounded*
/// shape is clamped to the array bounds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegularChunkGrid {
    chunk_shape: Vec<u64>,
}

impl RegularChunkGrid {
    /// Create a new regular chunk grid.
    ///
    /// Every component of `chunk_shape` must be non-zero; this is validated at array creation.
    #[must_use]
    pub fn new(chunk_shape: Vec<u64>) -> Self {
        debug_assert!(chunk_shape.iter().all(|c| *c > 0));
        Self { chunk_shape }
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[u64] {
        &self.chunk_shape
    }

    /// Return the dimensionality of the grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.chunk_shape.len()
    }

    /// Return the number of chunks per axis for an array with `array_shape`.
    #[must_use]
    pub fn grid_shape(&self, array_shape: &[u64]) -> Vec<u64> {
        std::iter::zip(array_shape, &self.chunk_shape)
            .map(|(array_shape, chunk_shape)| array_shape.div_ceil(*chunk_shape))
            .collect()
    }

    /// Returns true if `chunk_indices` addresses a chunk of an array with `array_shape`.
    #[must_use]
    pub fn chunk_indices_inbounds(&self, chunk_indices: &[u64], array_shape: &[u64]) -> bool {
        chunk_indices.len() == self.dimensionality()
            && array_shape.len() == self.dimensionality()
            && std::iter::zip(chunk_indices, self.grid_shape(array_shape))
                .all(|(index, grid_shape)| *index < grid_shape)
    }

    /// Return the origin (first element indices) of the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_origin(&self, chunk_indices: &[u64]) -> Vec<u64> {
        std::iter::zip(chunk_indices, &self.chunk_shape)
            .map(|(index, chunk_shape)| index * chunk_shape)
            .collect()
    }

    /// Return the shape of the chunk at `chunk_indices` clamped to the bounds of an array with
    /// `array_shape`.
    ///
    /// This is the canonical chunk shape except on the upper borders, where it is trimmed.
    #[must_use]
    pub fn chunk_shape_bounded(&self, chunk_indices: &[u64], array_shape: &[u64]) -> Vec<u64> {
        itertools::izip!(chunk_indices, &self.chunk_shape, array_shape)
            .map(|(index, chunk_shape, array_shape)| {
                let start = index * chunk_shape;
                std::cmp::min(start + chunk_shape, *array_shape).saturating_sub(start)
            })
            .collect()
    }

    /// Return the array subset covered by the chunk at `chunk_indices`, clamped to the bounds of
    /// an array with `array_shape`.
    #[must_use]
    pub fn chunk_subset_bounded(&self, chunk_indices: &[u64], array_shape: &[u64]) -> ArraySubset {
        ArraySubset::new_with_start_shape(
            self.chunk_origin(chunk_indices),
            self.chunk_shape_bounded(chunk_indices, array_shape),
        )
        .expect("chunk origin and shape have the grid dimensionality")
    }

    /// Return the chunk grid indices of the chunks intersecting `array_subset`, as an
    /// [`ArraySubset`] of the chunk grid.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `array_subset` does
    /// not match the grid.
    pub fn chunks_in_array_subset(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<ArraySubset, IncompatibleDimensionalityError> {
        if array_subset.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                array_subset.dimensionality(),
                self.dimensionality(),
            ));
        }
        if array_subset.is_empty() {
            return Ok(ArraySubset::new_with_shape(vec![0; self.dimensionality()]));
        }
        let first_chunk: Vec<u64> = std::iter::zip(array_subset.start(), &self.chunk_shape)
            .map(|(start, chunk_shape)| start / chunk_shape)
            .collect();
        let last_chunk_exc: Vec<u64> = std::iter::zip(array_subset.end_exc(), &self.chunk_shape)
            .map(|(end, chunk_shape)| end.div_ceil(*chunk_shape))
            .collect();
        ArraySubset::new_with_start_end_exc(first_chunk, &last_chunk_exc)
    }
}
