//! Arrays.
//!
//! An array is a leaf node in a hierarchy holding a rectangular N-dimensional grid of
//! independently compressed chunks, with per-array metadata as the single source of truth for
//! its shape, chunk shape, data type, compression, and fill value.
//!
//! An [`Array`] is parameterised by its backing [storage](crate::storage) and carries the format
//! ([Zarr or N5](crate::file::Format)) and open mode it was created with.
//! The core operations are:
//!  - [`retrieve_chunk`](Array::retrieve_chunk) / [`retrieve_chunk_if_exists`](Array::retrieve_chunk_if_exists) / [`retrieve_array_subset`](Array::retrieve_array_subset)
//!  - [`store_chunk`](Array::store_chunk) / [`store_chunk_subset`](Array::store_chunk_subset) / [`store_array_subset`](Array::store_array_subset)
//!  - [`erase_chunk`](Array::erase_chunk) and the sparse-chunk invariant: a chunk whose content
//!    is entirely the fill value has no stored representation, and reading an absent chunk
//!    yields the fill value.
//!
//! Most operations have `_elements` variants (typed via [`Element`]), `_ndarray` variants
//! (behind the `ndarray` feature), and `_opt` variants taking [`CodecOptions`] for per-request
//! concurrency control.

mod array_builder;
mod array_errors;
mod array_sync_readable;
mod array_sync_readable_writable;
mod array_sync_writable;
pub mod chunk_grid;
pub mod chunk_key_encoding;
pub mod codec;
pub mod concurrency;
pub mod data_type;
mod element;
mod endianness;
mod fill_value;
mod n5_block;
mod unsafe_cell_slice;

use std::sync::Arc;

pub use self::{
    array_builder::ArrayBuilder,
    array_errors::{ArrayCreateError, ArrayError},
    chunk_grid::RegularChunkGrid,
    chunk_key_encoding::{ChunkKeyEncoding, ChunkKeySeparator},
    codec::{CodecOptions, Compression},
    data_type::DataType,
    element::{transmute_from_bytes_vec, transmute_to_bytes, Element},
    endianness::{Endianness, NATIVE_ENDIAN},
    fill_value::FillValue,
    n5_block::{N5BlockHeader, N5BlockMode},
    unsafe_cell_slice::UnsafeCellSlice,
};
pub use crate::metadata::{n5::N5ArrayMetadata, zarr::ZarrArrayMetadata};

use crate::{
    array_subset::ArraySubset,
    attributes::{AttributeCodec, JsonAttributeCodec},
    file::{FileMode, Format},
    metadata::n5::is_n5_reserved_attribute_key,
    node::NodePath,
};

use self::{
    codec::{BytesRepresentation, BytesToBytesCodecTraits},
    endianness::convert_endianness_inplace,
};

/// Array metadata, one variant per format.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayMetadata {
    /// Zarr V2 array metadata (`.zarray`).
    Zarr(ZarrArrayMetadata),
    /// N5 array metadata (`attributes.json`).
    N5(N5ArrayMetadata),
}

impl From<ZarrArrayMetadata> for ArrayMetadata {
    fn from(metadata: ZarrArrayMetadata) -> Self {
        Self::Zarr(metadata)
    }
}

impl From<N5ArrayMetadata> for ArrayMetadata {
    fn from(metadata: N5ArrayMetadata) -> Self {
        Self::N5(metadata)
    }
}

impl ArrayMetadata {
    /// Returns the format of the metadata.
    #[must_use]
    pub const fn format(&self) -> Format {
        match self {
            Self::Zarr(_) => Format::Zarr,
            Self::N5(_) => Format::N5,
        }
    }
}

/// An array.
#[derive(Debug)]
pub struct Array<TStorage: ?Sized> {
    /// The storage.
    storage: Arc<TStorage>,
    /// The path of the array in the store.
    path: NodePath,
    /// The open mode in force; mutating operations are checked against it before any I/O.
    mode: FileMode,
    /// The array shape in C order.
    shape: Vec<u64>,
    /// The data type.
    data_type: DataType,
    /// The chunk grid.
    chunk_grid: RegularChunkGrid,
    /// The mapping from chunk grid indices to store keys.
    chunk_key_encoding: ChunkKeyEncoding,
    /// The byte order of chunk payloads on disk.
    endianness: Endianness,
    /// The fill value observed for unstored chunks.
    fill_value: FillValue,
    /// The chunk compression codec, or [`None`] for raw chunks.
    compressor: Option<Arc<dyn BytesToBytesCodecTraits>>,
    /// The attribute document codec.
    attribute_codec: Arc<dyn AttributeCodec>,
    /// The metadata used to create the array.
    metadata: ArrayMetadata,
}

impl<TStorage: ?Sized> Array<TStorage> {
    /// Create an array in `storage` at `path` with `metadata`, opened with `mode`.
    ///
    /// This does **not** write to the store; use [`store_metadata`](Array::store_metadata) to
    /// write `metadata` to `storage` for a new array.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the metadata is invalid:
    ///  - an unsupported data type, order, or filter,
    ///  - a chunk shape incompatible with the array shape,
    ///  - an unsupported or invalid compression configuration, or
    ///  - an invalid fill value.
    pub fn new_with_metadata(
        storage: Arc<TStorage>,
        path: &str,
        mode: FileMode,
        metadata: ArrayMetadata,
    ) -> Result<Self, ArrayCreateError> {
        let path = NodePath::new(path)?;
        match metadata {
            ArrayMetadata::Zarr(zarr) => {
                let (data_type, endianness) = DataType::from_zarr_typestr(&zarr.dtype)?;
                if zarr.order != crate::metadata::zarr::ZarrOrder::C {
                    return Err(ArrayCreateError::UnsupportedOrder);
                }
                if zarr.filters.as_ref().is_some_and(|filters| !filters.is_empty()) {
                    return Err(ArrayCreateError::UnsupportedFilters);
                }
                validate_shapes(&zarr.shape, &zarr.chunks)?;
                let fill_value = data_type
                    .fill_value_from_zarr_metadata(&zarr.fill_value)
                    .map_err(|err| ArrayCreateError::InvalidFillValue(err.to_string()))?;
                let compressor = Compression::from_zarr_metadata(zarr.compressor.as_ref())?
                    .to_codec(data_type.size())?;
                Ok(Self {
                    storage,
                    path,
                    mode,
                    shape: zarr.shape.clone(),
                    data_type,
                    chunk_grid: RegularChunkGrid::new(zarr.chunks.clone()),
                    chunk_key_encoding: ChunkKeyEncoding::zarr(zarr.dimension_separator),
                    endianness,
                    fill_value,
                    compressor,
                    attribute_codec: Arc::new(JsonAttributeCodec),
                    metadata: ArrayMetadata::Zarr(zarr),
                })
            }
            ArrayMetadata::N5(n5) => {
                let data_type = DataType::from_n5_name(&n5.data_type)?;
                let shape: Vec<u64> = n5.dimensions.iter().rev().copied().collect();
                let chunks: Vec<u64> = n5.block_size.iter().rev().copied().collect();
                validate_shapes(&shape, &chunks)?;
                let compressor = Compression::from_n5_metadata(&n5.resolved_compression())?
                    .to_codec(data_type.size())?;
                Ok(Self {
                    storage,
                    path,
                    mode,
                    shape,
                    data_type,
                    chunk_grid: RegularChunkGrid::new(chunks),
                    chunk_key_encoding: ChunkKeyEncoding::n5(),
                    endianness: Endianness::Big,
                    fill_value: data_type.zero_fill_value(),
                    compressor,
                    attribute_codec: Arc::new(JsonAttributeCodec),
                    metadata: ArrayMetadata::N5(n5),
                })
            }
        }
    }

    /// Replace the attribute codec consulted for user attribute access.
    #[must_use]
    pub fn with_attribute_codec(mut self, attribute_codec: Arc<dyn AttributeCodec>) -> Self {
        self.attribute_codec = attribute_codec;
        self
    }

    /// Get the node path.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Get the format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.metadata.format()
    }

    /// Get the open mode.
    #[must_use]
    pub const fn mode(&self) -> FileMode {
        self.mode
    }

    /// Get the data type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Get the fill value.
    #[must_use]
    pub const fn fill_value(&self) -> &FillValue {
        &self.fill_value
    }

    /// Get the array shape (C order).
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Get the array dimensionality.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape.len()
    }

    /// Get the number of elements of the array.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Get the canonical chunk shape (C order).
    #[must_use]
    pub fn chunk_shape(&self) -> &[u64] {
        self.chunk_grid.chunk_shape()
    }

    /// Get the chunk grid.
    #[must_use]
    pub const fn chunk_grid(&self) -> &RegularChunkGrid {
        &self.chunk_grid
    }

    /// Get the chunk key encoding.
    #[must_use]
    pub const fn chunk_key_encoding(&self) -> &ChunkKeyEncoding {
        &self.chunk_key_encoding
    }

    /// Get the byte order of chunk payloads on disk.
    #[must_use]
    pub const fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Get the number of chunks per axis.
    #[must_use]
    pub fn chunk_grid_shape(&self) -> Vec<u64> {
        self.chunk_grid.grid_shape(&self.shape)
    }

    /// Get the total number of chunks of the array.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.chunk_grid_shape().iter().product()
    }

    /// Return the underlying array metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArrayMetadata {
        &self.metadata
    }

    /// Return the array subset covered by the chunk at `chunk_indices`, clamped to the array
    /// bounds.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndices`] if `chunk_indices` is out of bounds.
    pub fn chunk_subset(&self, chunk_indices: &[u64]) -> Result<ArraySubset, ArrayError> {
        if !self
            .chunk_grid
            .chunk_indices_inbounds(chunk_indices, &self.shape)
        {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        Ok(self.chunk_grid.chunk_subset_bounded(chunk_indices, &self.shape))
    }

    /// Return the shape of the chunk at `chunk_indices`, clamped to the array bounds.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidChunkGridIndices`] if `chunk_indices` is out of bounds.
    pub fn chunk_shape_bounded(&self, chunk_indices: &[u64]) -> Result<Vec<u64>, ArrayError> {
        if !self
            .chunk_grid
            .chunk_indices_inbounds(chunk_indices, &self.shape)
        {
            return Err(ArrayError::InvalidChunkGridIndices(chunk_indices.to_vec()));
        }
        Ok(self
            .chunk_grid
            .chunk_shape_bounded(chunk_indices, &self.shape))
    }

    pub(crate) fn validate_element_type<T: Element>(&self) -> Result<(), ArrayError> {
        if T::DATA_TYPE == self.data_type {
            Ok(())
        } else {
            Err(ArrayError::IncompatibleElementType(
                T::DATA_TYPE,
                self.data_type,
            ))
        }
    }

    pub(crate) fn check_writable(&self) -> Result<(), ArrayError> {
        if self.mode.can_write() {
            Ok(())
        } else {
            Err(ArrayError::PermissionDenied)
        }
    }

    /// Encode the native-endian `chunk_bytes` of the chunk at `chunk_indices` (at its bounded
    /// shape) into its store value.
    pub(crate) fn encode_chunk(
        &self,
        chunk_bytes: &[u8],
        chunk_indices: &[u64],
    ) -> Result<Vec<u8>, ArrayError> {
        let element_size = self.data_type.size();
        let bounded_shape = self
            .chunk_grid
            .chunk_shape_bounded(chunk_indices, &self.shape);
        match self.format() {
            Format::Zarr => {
                // Zarr chunk files hold the full chunk shape; border chunks are fill-padded.
                let chunk_shape = self.chunk_grid.chunk_shape();
                let mut full_bytes = if bounded_shape == chunk_shape {
                    chunk_bytes.to_vec()
                } else {
                    let full_num_elements =
                        usize::try_from(chunk_shape.iter().product::<u64>()).unwrap();
                    let mut full_bytes = self.fill_value.as_ne_bytes().repeat(full_num_elements);
                    let bounded_subset = ArraySubset::new_with_shape(bounded_shape);
                    let mut offset = 0;
                    for (chunk_index, num_elements) in bounded_subset
                        .iter_contiguous_linearised_indices(chunk_shape)
                        .expect("subset and chunk dimensionality match")
                    {
                        let byte_index = usize::try_from(chunk_index).unwrap() * element_size;
                        let byte_length = usize::try_from(num_elements).unwrap() * element_size;
                        full_bytes[byte_index..byte_index + byte_length]
                            .copy_from_slice(&chunk_bytes[offset..offset + byte_length]);
                        offset += byte_length;
                    }
                    full_bytes
                };
                convert_endianness_inplace(&mut full_bytes, element_size, self.endianness);
                match &self.compressor {
                    Some(compressor) => Ok(compressor.encode(full_bytes)?),
                    None => Ok(full_bytes),
                }
            }
            Format::N5 => {
                let header = N5BlockHeader::new(
                    &bounded_shape.iter().rev().copied().collect::<Vec<u64>>(),
                );
                let mut payload = chunk_bytes.to_vec();
                convert_endianness_inplace(&mut payload, element_size, self.endianness);
                let payload = match &self.compressor {
                    Some(compressor) => compressor.encode(payload)?,
                    None => payload,
                };
                let mut encoded = header.to_bytes();
                encoded.extend_from_slice(&payload);
                Ok(encoded)
            }
        }
    }

    /// Decode the store value of the chunk at `chunk_indices` into native-endian bytes at the
    /// chunk's bounded shape.
    pub(crate) fn decode_chunk(
        &self,
        encoded: Vec<u8>,
        chunk_indices: &[u64],
    ) -> Result<Vec<u8>, ArrayError> {
        let element_size = self.data_type.size();
        let bounded_shape = self
            .chunk_grid
            .chunk_shape_bounded(chunk_indices, &self.shape);
        let bounded_size =
            bounded_shape.iter().product::<u64>() * element_size as u64;
        match self.format() {
            Format::Zarr => {
                let chunk_shape = self.chunk_grid.chunk_shape();
                let full_size = chunk_shape.iter().product::<u64>() * element_size as u64;
                let mut bytes = match &self.compressor {
                    Some(compressor) => {
                        compressor.decode(encoded, &BytesRepresentation::FixedSize(full_size))?
                    }
                    None => encoded,
                };
                if bytes.len() as u64 != full_size {
                    return Err(ArrayError::UnexpectedChunkDecodedSize(bytes.len(), full_size));
                }
                convert_endianness_inplace(&mut bytes, element_size, self.endianness);
                if bounded_shape == chunk_shape {
                    Ok(bytes)
                } else {
                    // trim the fill-padded border region
                    Ok(ArraySubset::new_with_shape(bounded_shape)
                        .extract_bytes(&bytes, chunk_shape, element_size)
                        .expect("bounded shape is within the chunk shape"))
                }
            }
            Format::N5 => {
                let (header, payload_offset) =
                    N5BlockHeader::from_bytes(&encoded, self.dimensionality())
                        .map_err(|err| ArrayError::CorruptChunk(err.to_string()))?;
                if header.mode != N5BlockMode::Default {
                    return Err(ArrayError::CorruptChunk(
                        "unexpected variable-length block".to_string(),
                    ));
                }
                let header_shape: Vec<u64> = header
                    .block_size
                    .iter()
                    .rev()
                    .map(|size| u64::from(*size))
                    .collect();
                if header_shape != bounded_shape {
                    return Err(ArrayError::CorruptChunk(format!(
                        "block shape {header_shape:?} does not match the expected chunk shape {bounded_shape:?}"
                    )));
                }
                let payload = encoded[payload_offset..].to_vec();
                let mut bytes = match &self.compressor {
                    Some(compressor) => compressor
                        .decode(payload, &BytesRepresentation::FixedSize(bounded_size))?,
                    None => payload,
                };
                if bytes.len() as u64 != bounded_size {
                    return Err(ArrayError::UnexpectedChunkDecodedSize(
                        bytes.len(),
                        bounded_size,
                    ));
                }
                convert_endianness_inplace(&mut bytes, element_size, self.endianness);
                Ok(bytes)
            }
        }
    }

    /// Encode a variable-length chunk payload (N5 only).
    pub(crate) fn encode_chunk_varlen(
        &self,
        chunk_bytes: &[u8],
        chunk_indices: &[u64],
        num_elements: u32,
    ) -> Result<Vec<u8>, ArrayError> {
        if self.format() != Format::N5 {
            return Err(ArrayError::UnsupportedVarlenChunks(self.format()));
        }
        let element_size = self.data_type.size();
        let bounded_shape = self
            .chunk_grid
            .chunk_shape_bounded(chunk_indices, &self.shape);
        let header = N5BlockHeader::new_varlen(
            &bounded_shape.iter().rev().copied().collect::<Vec<u64>>(),
            num_elements,
        );
        let mut payload = chunk_bytes.to_vec();
        convert_endianness_inplace(&mut payload, element_size, self.endianness);
        let payload = match &self.compressor {
            Some(compressor) => compressor.encode(payload)?,
            None => payload,
        };
        let mut encoded = header.to_bytes();
        encoded.extend_from_slice(&payload);
        Ok(encoded)
    }

    /// Decode a chunk value using the element count declared by its header (N5 only).
    ///
    /// Accepts both fixed-shape and variable-length blocks.
    pub(crate) fn decode_chunk_varlen(&self, encoded: Vec<u8>) -> Result<Vec<u8>, ArrayError> {
        if self.format() != Format::N5 {
            return Err(ArrayError::UnsupportedVarlenChunks(self.format()));
        }
        let element_size = self.data_type.size();
        let (header, payload_offset) = N5BlockHeader::from_bytes(&encoded, self.dimensionality())
            .map_err(|err| ArrayError::CorruptChunk(err.to_string()))?;
        let expected_size = header.num_elements() * element_size as u64;
        let payload = encoded[payload_offset..].to_vec();
        let mut bytes = match &self.compressor {
            Some(compressor) => {
                compressor.decode(payload, &BytesRepresentation::FixedSize(expected_size))?
            }
            None => payload,
        };
        if bytes.len() as u64 != expected_size {
            return Err(ArrayError::UnexpectedChunkDecodedSize(
                bytes.len(),
                expected_size,
            ));
        }
        convert_endianness_inplace(&mut bytes, element_size, self.endianness);
        Ok(bytes)
    }
}

fn validate_shapes(shape: &[u64], chunks: &[u64]) -> Result<(), ArrayCreateError> {
    if chunks.len() != shape.len() || chunks.iter().any(|chunk| *chunk == 0) {
        return Err(ArrayCreateError::InvalidChunkShape {
            chunks: chunks.to_vec(),
            shape: shape.to_vec(),
        });
    }
    Ok(())
}

/// Convert a shape to a [`usize`] vector.
///
/// # Panics
/// Panics if a component exceeds [`usize::MAX`].
#[must_use]
pub(crate) fn shape_u64_to_usize(shape: &[u64]) -> Vec<usize> {
    shape
        .iter()
        .map(|size| usize::try_from(*size).unwrap())
        .collect()
}

#[cfg(feature = "ndarray")]
pub(crate) fn elements_to_ndarray<T>(
    shape: &[u64],
    elements: Vec<T>,
) -> Result<ndarray::ArrayD<T>, ArrayError> {
    let length = elements.len();
    ndarray::ArrayD::<T>::from_shape_vec(shape_u64_to_usize(shape), elements)
        .map_err(|_| ArrayError::CouldNotCreateNdarray(length, shape.to_vec()))
}

impl<TStorage: ?Sized> Array<TStorage> {
    pub(crate) fn attribute_codec(&self) -> &Arc<dyn AttributeCodec> {
        &self.attribute_codec
    }

    /// Produce the metadata document for storage, merging current user `attributes` for the N5
    /// format (whose metadata and user attributes share one document).
    pub(crate) fn metadata_document(
        &self,
        attributes: &crate::attributes::AttributeMap,
    ) -> ArrayMetadata {
        match &self.metadata {
            ArrayMetadata::Zarr(zarr) => ArrayMetadata::Zarr(zarr.clone()),
            ArrayMetadata::N5(n5) => {
                let mut n5 = n5.clone();
                n5.attributes = attributes
                    .iter()
                    .filter(|(key, _)| !is_n5_reserved_attribute_key(key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                ArrayMetadata::N5(n5)
            }
        }
    }
}
