use std::sync::Arc;

use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;

use crate::{
    array_subset::{
        selection::{normalize_selection, squeeze_shape, SliceSpec},
        ArraySubset,
    },
    attributes::{read_attributes, AttributeMap},
    file::{FileMode, Format},
    metadata::{n5::N5ArrayMetadata, zarr::ZarrArrayMetadata},
    storage::{
        data_key, meta_key_n5_attributes, meta_key_zarr_array, ReadableStorageTraits,
        StorageError,
    },
};

use super::{
    codec::CodecOptions, concurrency::concurrency_chunks, transmute_from_bytes_vec,
    unsafe_cell_slice::UnsafeCellSlice, Array, ArrayCreateError, ArrayError, ArrayMetadata,
    Element, N5BlockHeader,
};

#[cfg(feature = "ndarray")]
use super::elements_to_ndarray;

impl<TStorage: ?Sized + ReadableStorageTraits> Array<TStorage> {
    /// Open an existing array in `storage` at `path` with `mode`. The metadata is read from the
    /// store.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the metadata is missing or invalid, or on an underlying
    /// store error.
    pub fn open(
        storage: Arc<TStorage>,
        path: &str,
        format: Format,
        mode: FileMode,
    ) -> Result<Self, ArrayCreateError> {
        let node_path = crate::node::NodePath::new(path)?;
        let metadata = match format {
            Format::Zarr => {
                let key = meta_key_zarr_array(&node_path);
                let metadata = storage
                    .get(&key)?
                    .ok_or(ArrayCreateError::MissingMetadata)?;
                let metadata: ZarrArrayMetadata = serde_json::from_slice(&metadata)
                    .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?;
                ArrayMetadata::Zarr(metadata)
            }
            Format::N5 => {
                let key = meta_key_n5_attributes(&node_path);
                let metadata = storage
                    .get(&key)?
                    .ok_or(ArrayCreateError::MissingMetadata)?;
                let metadata: N5ArrayMetadata = serde_json::from_slice(&metadata)
                    .map_err(|err| StorageError::InvalidMetadata(key, err.to_string()))?;
                ArrayMetadata::N5(metadata)
            }
        };
        Self::new_with_metadata(storage, path, mode, metadata)
    }

    /// Returns true if the chunk at `chunk_indices` has a stored representation.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `chunk_indices` is invalid or on an underlying store error.
    pub fn chunk_exists(&self, chunk_indices: &[u64]) -> Result<bool, ArrayError> {
        if !self
            .chunk_grid()
            .chunk_indices_inbounds(chunk_indices, self.shape())
        {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        let key = data_key(self.path(), chunk_indices, self.chunk_key_encoding());
        Ok(self.storage.size_key(&key)?.is_some())
    }

    /// Read and decode the chunk at `chunk_indices` into its bytes (at the chunk's bounded
    /// shape) if it exists.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - `chunk_indices` are invalid,
    ///  - the chunk is corrupt or there is a codec decoding error, or
    ///  - an underlying store error.
    pub fn retrieve_chunk_if_exists(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<u8>>, ArrayError> {
        if !self
            .chunk_grid()
            .chunk_indices_inbounds(chunk_indices, self.shape())
        {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        let key = data_key(self.path(), chunk_indices, self.chunk_key_encoding());
        let Some(encoded) = self.storage.get(&key)? else {
            return Ok(None);
        };
        Ok(Some(self.decode_chunk(encoded, chunk_indices)?))
    }

    /// Read and decode the chunk at `chunk_indices` into a vector of its elements if it exists.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the element type does not match the array data type or a
    /// [`retrieve_chunk_if_exists`](Array::retrieve_chunk_if_exists) error condition is met.
    pub fn retrieve_chunk_elements_if_exists<T: Element>(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<T>>, ArrayError> {
        self.validate_element_type::<T>()?;
        let bytes = self.retrieve_chunk_if_exists(chunk_indices)?;
        Ok(bytes.map(|bytes| transmute_from_bytes_vec::<T>(bytes)))
    }

    /// Read and decode the chunk at `chunk_indices` into its bytes, or the fill value if it does
    /// not exist.
    ///
    /// # Errors
    /// See [`retrieve_chunk_if_exists`](Array::retrieve_chunk_if_exists).
    ///
    /// # Panics
    /// Panics if the number of bytes in the chunk exceeds `usize::MAX`.
    pub fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Vec<u8>, ArrayError> {
        if let Some(chunk) = self.retrieve_chunk_if_exists(chunk_indices)? {
            Ok(chunk)
        } else {
            let num_elements = self
                .chunk_shape_bounded(chunk_indices)?
                .iter()
                .product::<u64>();
            Ok(self
                .fill_value()
                .as_ne_bytes()
                .repeat(usize::try_from(num_elements).unwrap()))
        }
    }

    /// Read and decode the chunk at `chunk_indices` into a vector of its elements, filled with
    /// the fill value if it does not exist.
    ///
    /// # Errors
    /// See [`retrieve_chunk_elements_if_exists`](Array::retrieve_chunk_elements_if_exists).
    pub fn retrieve_chunk_elements<T: Element>(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Vec<T>, ArrayError> {
        self.validate_element_type::<T>()?;
        let bytes = self.retrieve_chunk(chunk_indices)?;
        Ok(transmute_from_bytes_vec::<T>(bytes))
    }

    #[cfg(feature = "ndarray")]
    /// Read and decode the chunk at `chunk_indices` into an [`ndarray::ArrayD`] at the chunk's
    /// bounded shape. It is filled with the fill value if it does not exist.
    ///
    /// # Errors
    /// See [`retrieve_chunk_elements`](Array::retrieve_chunk_elements).
    pub fn retrieve_chunk_ndarray<T: Element>(
        &self,
        chunk_indices: &[u64],
    ) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let shape = self.chunk_shape_bounded(chunk_indices)?;
        elements_to_ndarray(&shape, self.retrieve_chunk_elements::<T>(chunk_indices)?)
    }

    /// Read a variable-length chunk at `chunk_indices` into a vector of its elements if it
    /// exists.
    ///
    /// The element count is declared by the chunk header rather than the chunk grid; fixed-shape
    /// chunks are also accepted. Only supported by the N5 format.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the format is not N5, the element type does not match, or a
    /// [`retrieve_chunk_if_exists`](Array::retrieve_chunk_if_exists) error condition is met.
    pub fn retrieve_chunk_varlen_elements<T: Element>(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<T>>, ArrayError> {
        self.validate_element_type::<T>()?;
        if !self
            .chunk_grid()
            .chunk_indices_inbounds(chunk_indices, self.shape())
        {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        let key = data_key(self.path(), chunk_indices, self.chunk_key_encoding());
        let Some(encoded) = self.storage.get(&key)? else {
            return Ok(None);
        };
        let bytes = self.decode_chunk_varlen(encoded)?;
        Ok(Some(transmute_from_bytes_vec::<T>(bytes)))
    }

    /// Return the shape (C order) of the chunk at `chunk_indices` as recorded by its stored
    /// header, or [`None`] if the chunk has no stored representation.
    ///
    /// For the Zarr format there is no chunk header and the bounded shape derived from the
    /// metadata is returned for stored chunks.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `chunk_indices` is invalid, the header is corrupt, or on an
    /// underlying store error.
    pub fn chunk_shape_from_header(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<u64>>, ArrayError> {
        if !self
            .chunk_grid()
            .chunk_indices_inbounds(chunk_indices, self.shape())
        {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        let key = data_key(self.path(), chunk_indices, self.chunk_key_encoding());
        let Some(encoded) = self.storage.get(&key)? else {
            return Ok(None);
        };
        match self.format() {
            Format::Zarr => Ok(Some(self.chunk_shape_bounded(chunk_indices)?)),
            Format::N5 => {
                let (header, _) = N5BlockHeader::from_bytes(&encoded, self.dimensionality())
                    .map_err(|err| ArrayError::CorruptChunk(err.to_string()))?;
                Ok(Some(
                    header
                        .block_size
                        .iter()
                        .rev()
                        .map(|size| u64::from(*size))
                        .collect(),
                ))
            }
        }
    }

    /// Read and decode the `array_subset` of the array into its bytes with default codec
    /// options.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if:
    ///  - the `array_subset` dimensionality does not match the array or it is out of bounds,
    ///  - a chunk is corrupt or there is a codec decoding error, or
    ///  - an underlying store error.
    pub fn retrieve_array_subset(&self, array_subset: &ArraySubset) -> Result<Vec<u8>, ArrayError> {
        self.retrieve_array_subset_opt(array_subset, &CodecOptions::default())
    }

    /// Read and decode the `array_subset` of the array into a vector of its elements with
    /// default codec options.
    ///
    /// # Errors
    /// See [`retrieve_array_subset`](Array::retrieve_array_subset).
    pub fn retrieve_array_subset_elements<T: Element>(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<Vec<T>, ArrayError> {
        self.retrieve_array_subset_elements_opt(array_subset, &CodecOptions::default())
    }

    #[cfg(feature = "ndarray")]
    /// Read and decode the `array_subset` of the array into an [`ndarray::ArrayD`] with default
    /// codec options.
    ///
    /// # Errors
    /// See [`retrieve_array_subset`](Array::retrieve_array_subset).
    pub fn retrieve_array_subset_ndarray<T: Element>(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let elements = self.retrieve_array_subset_elements_opt::<T>(
            array_subset,
            &CodecOptions::default(),
        )?;
        elements_to_ndarray(array_subset.shape(), elements)
    }

    /// Read and decode a NumPy-style `selection` of the array into a vector of its elements and
    /// the selected (squeezed) shape.
    ///
    /// Integer components select a length-1 slice and are squeezed from the returned shape; at
    /// most one ellipsis is permitted.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the selection is invalid or a
    /// [`retrieve_array_subset`](Array::retrieve_array_subset) error condition is met.
    pub fn retrieve_selection_elements<T: Element>(
        &self,
        selection: &[SliceSpec],
    ) -> Result<(Vec<T>, Vec<u64>), ArrayError> {
        let (subset, squeeze) = normalize_selection(selection, self.shape())?;
        let elements = self.retrieve_array_subset_elements::<T>(&subset)?;
        Ok((elements, squeeze_shape(subset.shape(), &squeeze)))
    }

    /// Explicit options version of [`retrieve_array_subset`](Array::retrieve_array_subset).
    #[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
    pub fn retrieve_array_subset_opt(
        &self,
        array_subset: &ArraySubset,
        options: &CodecOptions,
    ) -> Result<Vec<u8>, ArrayError> {
        if array_subset.dimensionality() != self.dimensionality()
            || !array_subset.inbounds(self.shape())
        {
            return Err(ArrayError::InvalidArraySubset(
                array_subset.clone(),
                self.shape().to_vec(),
            ));
        }
        let element_size = self.data_type().size();
        if array_subset.is_empty() {
            return Ok(vec![]);
        }

        let chunks = self.chunk_grid().chunks_in_array_subset(array_subset)?;
        let num_chunks = chunks.num_elements_usize();
        if num_chunks == 1 {
            let chunk_indices = chunks.start();
            let chunk_subset = self.chunk_subset(chunk_indices)?;
            if &chunk_subset == array_subset {
                // Fast path: the subset is exactly one chunk
                self.retrieve_chunk(chunk_indices)
            } else {
                let chunk_bytes = self.retrieve_chunk(chunk_indices)?;
                let overlap = chunk_subset.overlap(array_subset)?;
                Ok(overlap
                    .relative_to(chunk_subset.start())?
                    .extract_bytes(&chunk_bytes, chunk_subset.shape(), element_size)
                    .map_err(|_| {
                        ArrayError::InvalidArraySubset(
                            array_subset.clone(),
                            self.shape().to_vec(),
                        )
                    })?)
            }
        } else {
            let size_output = array_subset.num_elements_usize() * element_size;
            let mut output: Vec<u8> = vec![0; size_output];
            {
                let output_slice = UnsafeCellSlice::new(output.as_mut_slice());
                let chunk_concurrent_limit =
                    concurrency_chunks(options.concurrent_target(), num_chunks);
                let indices = chunks.indices();
                let retrieve_chunk_into_output =
                    |chunk_indices: Vec<u64>| -> Result<(), ArrayError> {
                        let chunk_subset = self.chunk_subset(&chunk_indices)?;
                        let overlap = chunk_subset.overlap(array_subset)?;
                        let chunk_bytes = self.retrieve_chunk(&chunk_indices)?;
                        let subset_bytes = overlap
                            .relative_to(chunk_subset.start())?
                            .extract_bytes(&chunk_bytes, chunk_subset.shape(), element_size)
                            .expect("overlap is within the chunk");
                        let overlap_in_subset = overlap.relative_to(array_subset.start())?;
                        let output = unsafe { output_slice.get() };
                        let mut offset = 0;
                        for (subset_index, num_elements) in overlap_in_subset
                            .iter_contiguous_linearised_indices(array_subset.shape())?
                        {
                            let byte_index =
                                usize::try_from(subset_index).unwrap() * element_size;
                            let byte_length =
                                usize::try_from(num_elements).unwrap() * element_size;
                            debug_assert!(byte_index + byte_length <= output.len());
                            output[byte_index..byte_index + byte_length]
                                .copy_from_slice(&subset_bytes[offset..offset + byte_length]);
                            offset += byte_length;
                        }
                        Ok(())
                    };
                iter_concurrent_limit!(
                    chunk_concurrent_limit,
                    indices,
                    try_for_each,
                    retrieve_chunk_into_output
                )?;
            }
            Ok(output)
        }
    }

    /// Explicit options version of
    /// [`retrieve_array_subset_elements`](Array::retrieve_array_subset_elements).
    #[allow(clippy::missing_errors_doc)]
    pub fn retrieve_array_subset_elements_opt<T: Element>(
        &self,
        array_subset: &ArraySubset,
        options: &CodecOptions,
    ) -> Result<Vec<T>, ArrayError> {
        self.validate_element_type::<T>()?;
        let bytes = self.retrieve_array_subset_opt(array_subset, options)?;
        Ok(transmute_from_bytes_vec::<T>(bytes))
    }

    /// Read the user attributes of the array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the attribute document is invalid or on an underlying store
    /// error.
    pub fn attributes(&self) -> Result<AttributeMap, ArrayError> {
        Ok(read_attributes(
            &*self.storage,
            self.attribute_codec().as_ref(),
            self.format(),
            self.path(),
        )?)
    }
}
