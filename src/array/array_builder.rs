use std::sync::Arc;

use crate::{
    file::{FileMode, Format},
    metadata::{
        n5::N5ArrayMetadata,
        zarr::{ZarrArrayMetadata, ZarrOrder},
    },
};

use super::{
    Array, ArrayCreateError, ArrayMetadata, ChunkKeySeparator, Compression, DataType, FillValue,
};

/// An [`Array`] builder.
///
/// The builder is format-independent; the format is supplied at [`build`](ArrayBuilder::build)
/// time and determines the metadata document produced.
///
/// Defaults:
///  - chunk shape: roughly 64^3 elements per chunk, clamped to the array shape
///    (any given chunk shape is also clamped per axis at build time),
///  - compression: the format default (blosc for Zarr, gzip for N5),
///  - fill value: zero (Zarr only; N5 has no stored fill value),
///  - dimension separator: `.` (Zarr only).
///
/// ```
/// # use std::sync::Arc;
/// use z5::array::{ArrayBuilder, Compression, DataType};
/// use z5::file::{FileMode, Format};
/// use z5::storage::store::MemoryStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let array = ArrayBuilder::new(vec![100, 100], DataType::UInt16)
///     .chunk_shape(vec![10, 10])
///     .compression(Compression::Gzip { level: 5 })
///     .build(
///         Arc::new(MemoryStore::new()),
///         "/data",
///         Format::N5,
///         FileMode::Append,
///     )?;
/// array.store_metadata()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ArrayBuilder {
    shape: Vec<u64>,
    data_type: DataType,
    chunk_shape: Option<Vec<u64>>,
    compression: Option<Compression>,
    fill_value: Option<FillValue>,
    dimension_separator: ChunkKeySeparator,
}

impl ArrayBuilder {
    /// Create a new array builder for an array with `shape` and `data_type`.
    #[must_use]
    pub fn new(shape: Vec<u64>, data_type: DataType) -> Self {
        Self {
            shape,
            data_type,
            chunk_shape: None,
            compression: None,
            fill_value: None,
            dimension_separator: ChunkKeySeparator::Dot,
        }
    }

    /// Set the array shape.
    #[must_use]
    pub fn shape(mut self, shape: Vec<u64>) -> Self {
        self.shape = shape;
        self
    }

    /// Set the chunk shape. It is clamped per axis to the array shape at build time.
    #[must_use]
    pub fn chunk_shape(mut self, chunk_shape: Vec<u64>) -> Self {
        self.chunk_shape = Some(chunk_shape);
        self
    }

    /// Set the compression. Defaults to the format default.
    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Set the fill value. Defaults to zero. Only recorded by the Zarr format.
    #[must_use]
    pub fn fill_value(mut self, fill_value: FillValue) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    /// Set the Zarr dimension separator. Defaults to `.`.
    #[must_use]
    pub fn dimension_separator(mut self, separator: ChunkKeySeparator) -> Self {
        self.dimension_separator = separator;
        self
    }

    /// Return the configured array shape.
    #[must_use]
    pub fn array_shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the configured data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the configured chunk shape, if set.
    #[must_use]
    pub fn configured_chunk_shape(&self) -> Option<&[u64]> {
        self.chunk_shape.as_deref()
    }

    /// Return the chunk shape the built array will use: the configured chunk shape clamped per
    /// axis to the array shape, or the default chunk shape.
    #[must_use]
    pub fn effective_chunk_shape(&self) -> Vec<u64> {
        match &self.chunk_shape {
            Some(chunk_shape) => std::iter::zip(chunk_shape, &self.shape)
                .map(|(chunk, array)| {
                    if *array == 0 {
                        *chunk
                    } else {
                        std::cmp::min(*chunk, *array)
                    }
                })
                .collect(),
            None => default_chunk_shape(&self.shape),
        }
    }

    /// Build the metadata document for `format`.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the configuration is invalid for `format` (e.g. a
    /// compression the format does not support).
    pub fn build_metadata(&self, format: Format) -> Result<ArrayMetadata, ArrayCreateError> {
        let chunks = self.effective_chunk_shape();
        if chunks.len() != self.shape.len() || chunks.iter().any(|chunk| *chunk == 0) {
            return Err(ArrayCreateError::InvalidChunkShape {
                chunks,
                shape: self.shape.clone(),
            });
        }
        let compression = self
            .compression
            .clone()
            .unwrap_or_else(|| Compression::default_for(format));
        match format {
            Format::Zarr => {
                let fill_value = self
                    .fill_value
                    .clone()
                    .unwrap_or_else(|| self.data_type.zero_fill_value());
                if fill_value.size() != self.data_type.size() {
                    return Err(ArrayCreateError::InvalidFillValue(format!(
                        "fill value has {} bytes, data type {} has {}",
                        fill_value.size(),
                        self.data_type,
                        self.data_type.size()
                    )));
                }
                Ok(ArrayMetadata::Zarr(ZarrArrayMetadata {
                    zarr_format: monostate::MustBe!(2u64),
                    shape: self.shape.clone(),
                    chunks,
                    dtype: self.data_type.zarr_typestr().to_string(),
                    compressor: compression.to_zarr_metadata()?,
                    fill_value: self.data_type.fill_value_to_zarr_metadata(&fill_value),
                    order: ZarrOrder::C,
                    filters: None,
                    dimension_separator: self.dimension_separator,
                }))
            }
            Format::N5 => Ok(ArrayMetadata::N5(N5ArrayMetadata {
                data_type: self.data_type.n5_name(),
                dimensions: self.shape.iter().rev().copied().collect(),
                block_size: chunks.iter().rev().copied().collect(),
                compression: Some(compression.to_n5_metadata()?),
                compression_type: None,
                n5_version: None,
                attributes: serde_json::Map::default(),
            })),
        }
    }

    /// Build the array in `storage` at `path` for `format`, opened with `mode`.
    ///
    /// This does **not** write the metadata to the store; use
    /// [`store_metadata`](Array::store_metadata) afterwards for a new array.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the configuration is invalid.
    pub fn build<TStorage: ?Sized>(
        &self,
        storage: Arc<TStorage>,
        path: &str,
        format: Format,
        mode: FileMode,
    ) -> Result<Array<TStorage>, ArrayCreateError> {
        Array::new_with_metadata(storage, path, mode, self.build_metadata(format)?)
    }
}

/// The default chunk shape: roughly 64^3 elements per chunk, clamped to the array shape.
fn default_chunk_shape(shape: &[u64]) -> Vec<u64> {
    const DEFAULT_CHUNK_NUM_ELEMENTS: f64 = 262_144.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let default_per_axis = DEFAULT_CHUNK_NUM_ELEMENTS
        .powf(1.0 / shape.len() as f64)
        .round() as u64;
    shape
        .iter()
        .map(|size| {
            if *size == 0 {
                default_per_axis.max(1)
            } else {
                std::cmp::min(default_per_axis.max(1), *size)
            }
        })
        .collect()
}
