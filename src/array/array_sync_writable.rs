use crate::{
    attributes::{read_attribute_document, set_attribute, write_attribute_document, AttributeMap},
    file::Format,
    metadata::n5::is_n5_reserved_attribute_key,
    storage::{data_key, meta_key_n5_attributes, meta_key_zarr_array, WritableStorageTraits},
};

use super::{transmute_to_bytes, Array, ArrayError, ArrayMetadata, Element};

#[cfg(feature = "ndarray")]
use super::shape_u64_to_usize;

impl<TStorage: ?Sized + WritableStorageTraits> Array<TStorage> {
    /// Store the array metadata document.
    ///
    /// Must be called for a newly built array.
    /// For the N5 format the metadata and user attributes share one document; existing user
    /// attributes are preserved.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array was opened without write permission or on an
    /// underlying store error.
    pub fn store_metadata(&self) -> Result<(), ArrayError> {
        self.check_writable()?;
        match self.metadata() {
            ArrayMetadata::Zarr(zarr) => {
                let key = meta_key_zarr_array(self.path());
                let json = serde_json::to_vec_pretty(zarr)
                    .map_err(|err| crate::storage::StorageError::from(err.to_string()))?;
                self.storage.set(&key, &json)?;
                Ok(())
            }
            ArrayMetadata::N5(_) => {
                let attributes = read_attribute_document(
                    &*self.storage,
                    self.attribute_codec().as_ref(),
                    Format::N5,
                    self.path(),
                )?;
                let ArrayMetadata::N5(n5) = self.metadata_document(&attributes) else {
                    unreachable!("metadata is N5")
                };
                let key = meta_key_n5_attributes(self.path());
                let json = serde_json::to_vec_pretty(&n5)
                    .map_err(|err| crate::storage::StorageError::from(err.to_string()))?;
                self.storage.set(&key, &json)?;
                Ok(())
            }
        }
    }

    /// Encode `chunk_bytes` (at the chunk's bounded shape, native endian) and store it at
    /// `chunk_indices`.
    ///
    /// A chunk composed entirely of the fill value is not stored; any existing chunk value is
    /// erased instead (the sparse representation).
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the array was opened without write permission,
    ///  - `chunk_indices` are invalid,
    ///  - the length of `chunk_bytes` is not the product of the bounded chunk shape and the
    ///    data type size,
    ///  - there is a codec encoding error, or
    ///  - an underlying store error.
    pub fn store_chunk(
        &self,
        chunk_indices: &[u64],
        chunk_bytes: &[u8],
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        let chunk_shape = self.chunk_shape_bounded(chunk_indices)?;
        let expected_size =
            chunk_shape.iter().product::<u64>() * self.data_type().size() as u64;
        if chunk_bytes.len() as u64 != expected_size {
            return Err(ArrayError::InvalidBytesInputSize(
                chunk_bytes.len(),
                expected_size,
            ));
        }

        if self.fill_value().equals_all(chunk_bytes) {
            self.erase_chunk(chunk_indices)?;
            Ok(())
        } else {
            let chunk_encoded = self.encode_chunk(chunk_bytes, chunk_indices)?;
            let key = data_key(self.path(), chunk_indices, self.chunk_key_encoding());
            self.storage.set(&key, &chunk_encoded)?;
            Ok(())
        }
    }

    /// Encode `chunk_elements` and store at `chunk_indices`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the element type does not match the array data type or a
    /// [`store_chunk`](Array::store_chunk) error condition is met.
    pub fn store_chunk_elements<T: Element>(
        &self,
        chunk_indices: &[u64],
        chunk_elements: &[T],
    ) -> Result<(), ArrayError> {
        self.validate_element_type::<T>()?;
        self.store_chunk(chunk_indices, transmute_to_bytes(chunk_elements))
    }

    #[cfg(feature = "ndarray")]
    /// Encode `chunk_array` and store at `chunk_indices`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array shape does not match the bounded chunk shape or a
    /// [`store_chunk_elements`](Array::store_chunk_elements) error condition is met.
    pub fn store_chunk_ndarray<T: Element, D: ndarray::Dimension>(
        &self,
        chunk_indices: &[u64],
        chunk_array: &ndarray::Array<T, D>,
    ) -> Result<(), ArrayError> {
        let chunk_shape = self.chunk_shape_bounded(chunk_indices)?;
        if chunk_array.shape() != shape_u64_to_usize(&chunk_shape) {
            return Err(ArrayError::InvalidBytesInputSize(
                chunk_array.len() * self.data_type().size(),
                chunk_shape.iter().product::<u64>() * self.data_type().size() as u64,
            ));
        }
        let elements: Vec<T> = chunk_array.iter().copied().collect();
        self.store_chunk_elements(chunk_indices, &elements)
    }

    /// Store a variable-length chunk at `chunk_indices` whose element count is declared by its
    /// header rather than the chunk grid. Only supported by the N5 format.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the format is not N5, the element type does not match, the
    /// element count exceeds `u32::MAX`, or on a codec or store error.
    pub fn store_chunk_varlen_elements<T: Element>(
        &self,
        chunk_indices: &[u64],
        chunk_elements: &[T],
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        self.validate_element_type::<T>()?;
        if !self
            .chunk_grid()
            .chunk_indices_inbounds(chunk_indices, self.shape())
        {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        let num_elements = u32::try_from(chunk_elements.len()).map_err(|_| {
            ArrayError::InvalidBytesInputSize(chunk_elements.len(), u64::from(u32::MAX))
        })?;
        let chunk_encoded = self.encode_chunk_varlen(
            transmute_to_bytes(chunk_elements),
            chunk_indices,
            num_elements,
        )?;
        let key = data_key(self.path(), chunk_indices, self.chunk_key_encoding());
        self.storage.set(&key, &chunk_encoded)?;
        Ok(())
    }

    /// Erase the chunk at `chunk_indices`.
    ///
    /// Succeeds if the chunk does not exist.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array was opened without write permission or on an
    /// underlying store error.
    pub fn erase_chunk(&self, chunk_indices: &[u64]) -> Result<(), ArrayError> {
        self.check_writable()?;
        if !self
            .chunk_grid()
            .chunk_indices_inbounds(chunk_indices, self.shape())
        {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        let key = data_key(self.path(), chunk_indices, self.chunk_key_encoding());
        self.storage.erase(&key)?;
        Ok(())
    }

    /// Set one user attribute of the array.
    ///
    /// Reserved N5 metadata keys are write-protected.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array was opened without write permission, `key` is a
    /// reserved N5 metadata key, or on an underlying store error.
    pub fn set_attribute(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), ArrayError> {
        self.check_writable()?;
        Ok(set_attribute(
            &*self.storage,
            self.attribute_codec().as_ref(),
            self.format(),
            self.path(),
            key,
            value,
        )?)
    }

    /// Replace the user attributes of the array.
    ///
    /// For the N5 format the reserved metadata keys are preserved; attempting to set one is an
    /// error.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array was opened without write permission, a reserved N5
    /// metadata key is present in `attributes`, or on an underlying store error.
    pub fn set_attributes(&self, attributes: AttributeMap) -> Result<(), ArrayError> {
        self.check_writable()?;
        match self.format() {
            Format::Zarr => {
                write_attribute_document(
                    &*self.storage,
                    self.attribute_codec().as_ref(),
                    Format::Zarr,
                    self.path(),
                    &attributes,
                )?;
            }
            Format::N5 => {
                if let Some(key) = attributes
                    .keys()
                    .find(|key| is_n5_reserved_attribute_key(key))
                {
                    return Err(ArrayError::AttributeError(
                        crate::attributes::AttributeError::ReservedKey(key.clone()),
                    ));
                }
                let ArrayMetadata::N5(n5) = self.metadata_document(&attributes) else {
                    unreachable!("metadata is N5")
                };
                let key = meta_key_n5_attributes(self.path());
                let json = serde_json::to_vec_pretty(&n5)
                    .map_err(|err| crate::storage::StorageError::from(err.to_string()))?;
                self.storage.set(&key, &json)?;
            }
        }
        Ok(())
    }
}
