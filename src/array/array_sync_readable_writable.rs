use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::array_subset::{
    selection::{normalize_selection, SliceSpec},
    ArraySubset,
};
use crate::storage::WritableStorageTraits;

use super::{
    codec::CodecOptions, concurrency::concurrency_chunks, transmute_to_bytes, Array, ArrayError,
    Element,
};

impl<TStorage: ?Sized + WritableStorageTraits> Array<TStorage> {
    /// Store `chunk_subset_bytes` (native endian) in the `chunk_subset` of the chunk at
    /// `chunk_indices`, with read-modify-write for a partial chunk.
    ///
    /// `chunk_subset` is relative to the chunk origin and must be within the chunk's bounded
    /// shape. If it covers the whole bounded chunk, the read is skipped and the bytes are stored
    /// directly.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the array was opened without write permission,
    ///  - `chunk_indices` or `chunk_subset` are invalid,
    ///  - the length of `chunk_subset_bytes` does not match `chunk_subset`, or
    ///  - a codec or store error occurs.
    pub fn store_chunk_subset(
        &self,
        chunk_indices: &[u64],
        chunk_subset: &ArraySubset,
        chunk_subset_bytes: &[u8],
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        let chunk_shape = self.chunk_shape_bounded(chunk_indices)?;
        if !chunk_subset.inbounds(&chunk_shape) {
            return Err(ArrayError::InvalidArraySubset(
                chunk_subset.clone(),
                chunk_shape,
            ));
        }
        let element_size = self.data_type().size();
        let expected_size = chunk_subset.num_elements() * element_size as u64;
        if chunk_subset_bytes.len() as u64 != expected_size {
            return Err(ArrayError::InvalidBytesInputSize(
                chunk_subset_bytes.len(),
                expected_size,
            ));
        }
        if chunk_subset.is_empty() {
            return Ok(());
        }

        if chunk_subset.shape() == chunk_shape
            && chunk_subset.start().iter().all(|&start| start == 0)
        {
            // The subset spans the whole chunk, so store the bytes directly and skip decoding
            self.store_chunk(chunk_indices, chunk_subset_bytes)
        } else {
            // Decode the entire chunk, overlay the subset, and re-store it
            let mut chunk_bytes = self.retrieve_chunk(chunk_indices)?;
            let mut offset = 0;
            for (chunk_index, num_elements) in
                chunk_subset.iter_contiguous_linearised_indices(&chunk_shape)?
            {
                let byte_index = usize::try_from(chunk_index).unwrap() * element_size;
                let byte_length = usize::try_from(num_elements).unwrap() * element_size;
                debug_assert!(byte_index + byte_length <= chunk_bytes.len());
                chunk_bytes[byte_index..byte_index + byte_length]
                    .copy_from_slice(&chunk_subset_bytes[offset..offset + byte_length]);
                offset += byte_length;
            }
            self.store_chunk(chunk_indices, &chunk_bytes)
        }
    }

    /// Store `subset_bytes` (native endian, C order) in the `array_subset` of the array with
    /// default codec options.
    ///
    /// Chunks that are fully covered by `array_subset` are stored without reading; partially
    /// covered chunks are read-modified-written.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the array was opened without write permission,
    ///  - the dimensionality of `array_subset` does not match the array or it is out of bounds,
    ///  - the length of `subset_bytes` does not match `array_subset`, or
    ///  - a codec or store error occurs.
    pub fn store_array_subset(
        &self,
        array_subset: &ArraySubset,
        subset_bytes: &[u8],
    ) -> Result<(), ArrayError> {
        self.store_array_subset_opt(array_subset, subset_bytes, &CodecOptions::default())
    }

    /// Store `subset_elements` in the `array_subset` of the array with default codec options.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the element type does not match the array data type or a
    /// [`store_array_subset`](Array::store_array_subset) error condition is met.
    pub fn store_array_subset_elements<T: Element>(
        &self,
        array_subset: &ArraySubset,
        subset_elements: &[T],
    ) -> Result<(), ArrayError> {
        self.store_array_subset_elements_opt(
            array_subset,
            subset_elements,
            &CodecOptions::default(),
        )
    }

    #[cfg(feature = "ndarray")]
    /// Store `subset_array` in the array subset starting at `subset_start` with default codec
    /// options.
    ///
    /// # Errors
    /// See [`store_array_subset_elements`](Array::store_array_subset_elements).
    pub fn store_array_subset_ndarray<T: Element, D: ndarray::Dimension>(
        &self,
        subset_start: &[u64],
        subset_array: &ndarray::Array<T, D>,
    ) -> Result<(), ArrayError> {
        let subset = ArraySubset::new_with_start_shape(
            subset_start.to_vec(),
            subset_array.shape().iter().map(|size| *size as u64).collect(),
        )?;
        let elements: Vec<T> = subset_array.iter().copied().collect();
        self.store_array_subset_elements(&subset, &elements)
    }

    /// Broadcast a scalar `value` over the `array_subset` of the array with default codec
    /// options.
    ///
    /// The element type is validated before any I/O. Fully covered chunks are synthesised
    /// without reading; the read-modify-write rule applies to partially covered chunks, and the
    /// sparse invariant applies when `value` equals the fill value.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the element type does not match the array data type or a
    /// [`store_array_subset`](Array::store_array_subset) error condition is met.
    pub fn store_array_subset_scalar<T: Element>(
        &self,
        array_subset: &ArraySubset,
        value: T,
    ) -> Result<(), ArrayError> {
        self.store_array_subset_scalar_opt(array_subset, value, &CodecOptions::default())
    }

    /// Store `elements` in a NumPy-style `selection` of the array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the selection is invalid or a
    /// [`store_array_subset_elements`](Array::store_array_subset_elements) error condition is
    /// met.
    pub fn store_selection_elements<T: Element>(
        &self,
        selection: &[SliceSpec],
        elements: &[T],
    ) -> Result<(), ArrayError> {
        let (subset, _squeeze) = normalize_selection(selection, self.shape())?;
        self.store_array_subset_elements(&subset, elements)
    }

    /// Explicit options version of [`store_array_subset`](Array::store_array_subset).
    #[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
    pub fn store_array_subset_opt(
        &self,
        array_subset: &ArraySubset,
        subset_bytes: &[u8],
        options: &CodecOptions,
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        if array_subset.dimensionality() != self.dimensionality()
            || !array_subset.inbounds(self.shape())
        {
            return Err(ArrayError::InvalidArraySubset(
                array_subset.clone(),
                self.shape().to_vec(),
            ));
        }
        let element_size = self.data_type().size();
        let expected_size = array_subset.num_elements() * element_size as u64;
        if subset_bytes.len() as u64 != expected_size {
            return Err(ArrayError::InvalidBytesInputSize(
                subset_bytes.len(),
                expected_size,
            ));
        }
        if array_subset.is_empty() {
            return Ok(());
        }

        let chunks = self.chunk_grid().chunks_in_array_subset(array_subset)?;
        let num_chunks = chunks.num_elements_usize();

        let store_chunk_subset_from_input =
            |chunk_indices: Vec<u64>| -> Result<(), ArrayError> {
                let chunk_subset = self.chunk_subset(&chunk_indices)?;
                let overlap = chunk_subset.overlap(array_subset)?;
                let chunk_subset_bytes = overlap
                    .relative_to(array_subset.start())?
                    .extract_bytes(subset_bytes, array_subset.shape(), element_size)
                    .expect("overlap is within the array subset");
                self.store_chunk_subset(
                    &chunk_indices,
                    &overlap.relative_to(chunk_subset.start())?,
                    &chunk_subset_bytes,
                )
            };

        if num_chunks == 1 {
            store_chunk_subset_from_input(chunks.start().to_vec())
        } else {
            let chunk_concurrent_limit =
                concurrency_chunks(options.concurrent_target(), num_chunks);
            let indices = chunks.indices();
            iter_concurrent_limit!(
                chunk_concurrent_limit,
                indices,
                try_for_each,
                store_chunk_subset_from_input
            )?;
            Ok(())
        }
    }

    /// Explicit options version of
    /// [`store_array_subset_elements`](Array::store_array_subset_elements).
    #[allow(clippy::missing_errors_doc)]
    pub fn store_array_subset_elements_opt<T: Element>(
        &self,
        array_subset: &ArraySubset,
        subset_elements: &[T],
        options: &CodecOptions,
    ) -> Result<(), ArrayError> {
        self.validate_element_type::<T>()?;
        self.store_array_subset_opt(array_subset, transmute_to_bytes(subset_elements), options)
    }

    /// Explicit options version of
    /// [`store_array_subset_scalar`](Array::store_array_subset_scalar).
    #[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
    pub fn store_array_subset_scalar_opt<T: Element>(
        &self,
        array_subset: &ArraySubset,
        value: T,
        options: &CodecOptions,
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        self.validate_element_type::<T>()?;
        if array_subset.dimensionality() != self.dimensionality()
            || !array_subset.inbounds(self.shape())
        {
            return Err(ArrayError::InvalidArraySubset(
                array_subset.clone(),
                self.shape().to_vec(),
            ));
        }
        if array_subset.is_empty() {
            return Ok(());
        }

        let chunks = self.chunk_grid().chunks_in_array_subset(array_subset)?;
        let num_chunks = chunks.num_elements_usize();

        let store_chunk_scalar = |chunk_indices: Vec<u64>| -> Result<(), ArrayError> {
            let chunk_subset = self.chunk_subset(&chunk_indices)?;
            let overlap = chunk_subset.overlap(array_subset)?;
            let value_bytes =
                transmute_to_bytes(std::slice::from_ref(&value))
                    .repeat(overlap.num_elements_usize());
            self.store_chunk_subset(
                &chunk_indices,
                &overlap.relative_to(chunk_subset.start())?,
                &value_bytes,
            )
        };

        if num_chunks == 1 {
            store_chunk_scalar(chunks.start().to_vec())
        } else {
            let chunk_concurrent_limit =
                concurrency_chunks(options.concurrent_target(), num_chunks);
            let indices = chunks.indices();
            iter_concurrent_limit!(
                chunk_concurrent_limit,
                indices,
                try_for_each,
                store_chunk_scalar
            )?;
            Ok(())
        }
    }
}
