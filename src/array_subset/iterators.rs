//! Iterators over the elements, contiguous runs, and covering chunks of an array subset.

use super::ArraySubset;

/// Iterates over the indices of elements within an array subset, in C order.
pub struct IndicesIterator {
    subset: ArraySubset,
    next: Option<Vec<u64>>,
    remaining: u64,
}

impl IndicesIterator {
    /// Create a new indices iterator.
    #[must_use]
    pub fn new(subset: ArraySubset) -> Self {
        let remaining = subset.num_elements();
        let next = (remaining > 0).then(|| subset.start().to_vec());
        Self {
            subset,
            next,
            remaining,
        }
    }

    fn advance(&mut self) {
        let Some(indices) = &mut self.next else {
            return;
        };
        for (index, (start, shape)) in std::iter::zip(
            indices.iter_mut().rev(),
            std::iter::zip(self.subset.start().iter().rev(), self.subset.shape().iter().rev()),
        ) {
            *index += 1;
            if *index < start + shape {
                return;
            }
            *index = *start;
        }
        self.next = None;
    }
}

impl Iterator for IndicesIterator {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.clone()?;
        self.remaining -= 1;
        if self.remaining == 0 {
            self.next = None;
        } else {
            self.advance();
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndicesIterator {}

/// Iterates over the start indices and lengths of the contiguous element runs of an array subset
/// within an array of a given shape.
pub struct ContiguousIndicesIterator {
    inner: IndicesIterator,
    contiguous_elements: u64,
}

impl ContiguousIndicesIterator {
    /// Create a new contiguous indices iterator.
    ///
    /// The dimensionality of `subset` and the length of `array_shape` must match.
    #[must_use]
    pub fn new(subset: &ArraySubset, array_shape: &[u64]) -> Self {
        debug_assert_eq!(subset.dimensionality(), array_shape.len());

        // Determine the run length: axes are merged from the innermost outwards while the subset
        // spans the whole array axis.
        let mut contiguous_elements: u64 = 1;
        let mut merged_axes: usize = 0;
        for (subset_start, subset_shape, shape) in itertools::izip!(
            subset.start().iter().rev(),
            subset.shape().iter().rev(),
            array_shape.iter().rev(),
        ) {
            contiguous_elements *= subset_shape;
            merged_axes += 1;
            if !(*subset_start == 0 && subset_shape == shape) {
                break;
            }
        }

        // Iterate over the run starts: the merged axes are pinned to their subset start.
        let dimensionality = subset.dimensionality();
        let mut outer_shape = subset.shape().to_vec();
        for shape in outer_shape.iter_mut().skip(dimensionality - merged_axes) {
            *shape = std::cmp::min(*shape, 1);
        }
        let outer_subset =
            ArraySubset::new_with_start_shape(subset.start().to_vec(), outer_shape)
                .expect("start and shape lengths match");

        Self {
            inner: IndicesIterator::new(outer_subset),
            contiguous_elements,
        }
    }

    /// Return the number of contiguous elements in each run.
    #[must_use]
    pub const fn contiguous_elements(&self) -> u64 {
        self.contiguous_elements
    }

    /// Return the number of contiguous elements in each run as a [`usize`].
    ///
    /// # Panics
    /// Panics if the number of contiguous elements exceeds [`usize::MAX`].
    #[must_use]
    pub fn contiguous_elements_usize(&self) -> usize {
        usize::try_from(self.contiguous_elements).unwrap()
    }
}

impl Iterator for ContiguousIndicesIterator {
    type Item = (Vec<u64>, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|indices| (indices, self.contiguous_elements))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ContiguousIndicesIterator {}

/// Iterates over the linearised start indices and lengths of the contiguous element runs of an
/// array subset within an array of a given shape.
pub struct ContiguousLinearisedIndicesIterator {
    inner: ContiguousIndicesIterator,
    array_shape: Vec<u64>,
}

impl ContiguousLinearisedIndicesIterator {
    /// Create a new contiguous linearised indices iterator.
    #[must_use]
    pub fn new(inner: ContiguousIndicesIterator, array_shape: Vec<u64>) -> Self {
        Self { inner, array_shape }
    }

    /// Return the number of contiguous elements in each run.
    #[must_use]
    pub const fn contiguous_elements(&self) -> u64 {
        self.inner.contiguous_elements()
    }

    /// Return the number of contiguous elements in each run as a [`usize`].
    ///
    /// # Panics
    /// Panics if the number of contiguous elements exceeds [`usize::MAX`].
    #[must_use]
    pub fn contiguous_elements_usize(&self) -> usize {
        self.inner.contiguous_elements_usize()
    }
}

impl Iterator for ContiguousLinearisedIndicesIterator {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(indices, contiguous_elements)| {
                let linearised = std::iter::zip(&indices, &self.array_shape)
                    .fold(0u64, |acc, (index, shape)| acc * shape + index);
                (linearised, contiguous_elements)
            })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ContiguousLinearisedIndicesIterator {}

/// Iterates over the chunks with a fixed shape overlapping an array subset.
///
/// Yields the chunk grid indices and the (unclamped) array subset of each chunk.
pub struct ChunksIterator {
    inner: IndicesIterator,
    chunk_shape: Vec<u64>,
}

impl ChunksIterator {
    /// Create a new chunks iterator.
    ///
    /// The dimensionality of `subset` and the length of `chunk_shape` must match.
    #[must_use]
    pub fn new(subset: &ArraySubset, chunk_shape: &[u64]) -> Self {
        debug_assert_eq!(subset.dimensionality(), chunk_shape.len());
        let chunks = if subset.is_empty() {
            ArraySubset::new_with_shape(vec![0; subset.dimensionality()])
        } else {
            let first_chunk: Vec<u64> = std::iter::zip(subset.start(), chunk_shape)
                .map(|(start, chunk_shape)| start / chunk_shape)
                .collect();
            let last_chunk_exc: Vec<u64> = std::iter::zip(subset.end_exc(), chunk_shape)
                .map(|(end, chunk_shape)| end.div_ceil(*chunk_shape))
                .collect();
            ArraySubset::new_with_start_end_exc(first_chunk, &last_chunk_exc)
                .expect("start and end lengths match")
        };
        Self {
            inner: IndicesIterator::new(chunks),
            chunk_shape: chunk_shape.to_vec(),
        }
    }
}

impl Iterator for ChunksIterator {
    type Item = (Vec<u64>, ArraySubset);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|chunk_indices| {
            let start: Vec<u64> = std::iter::zip(&chunk_indices, &self.chunk_shape)
                .map(|(index, shape)| index * shape)
                .collect();
            let chunk_subset =
                ArraySubset::new_with_start_shape(start, self.chunk_shape.clone())
                    .expect("start and shape lengths match");
            (chunk_indices, chunk_subset)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ChunksIterator {}
