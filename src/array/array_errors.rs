use thiserror::Error;

use crate::{
    array_subset::{selection::SelectionError, ArraySubset, IncompatibleDimensionalityError},
    file::Format,
    node::NodePathError,
    storage::StorageError,
};

use super::{codec::CodecError, data_type::UnsupportedDataTypeError, DataType};

/// An array creation or open error.
#[derive(Debug, Error)]
pub enum ArrayCreateError {
    /// The array metadata document is missing.
    #[error("array metadata is missing")]
    MissingMetadata,
    /// Unsupported data type.
    #[error(transparent)]
    DataTypeCreateError(#[from] UnsupportedDataTypeError),
    /// Invalid fill value metadata.
    #[error("invalid fill value: {0}")]
    InvalidFillValue(String),
    /// The compressor is not supported by the format.
    #[error("compressor {name} is not supported by the {format} format")]
    UnsupportedCompressor {
        /// The compressor name.
        name: String,
        /// The format.
        format: Format,
    },
    /// Invalid compression configuration.
    #[error("invalid compression configuration: {0}")]
    InvalidCompression(String),
    /// Only C order arrays are supported.
    #[error("only C order arrays are supported")]
    UnsupportedOrder,
    /// Filters are not supported.
    #[error("filters are not supported")]
    UnsupportedFilters,
    /// An invalid array shape or chunk shape.
    #[error("invalid chunk shape {chunks:?} for array shape {shape:?}")]
    InvalidChunkShape {
        /// The chunk shape.
        chunks: Vec<u64>,
        /// The array shape.
        shape: Vec<u64>,
    },
    /// An invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// An array operation error.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A codec error.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// A mutating operation on an array opened without write permission.
    #[error("the array was opened without write permission")]
    PermissionDenied,
    /// A chunk value could not be interpreted.
    #[error("corrupt chunk: {0}")]
    CorruptChunk(String),
    /// The decoded chunk length does not match the expected length.
    #[error("the decoded chunk has {0} bytes, expected {1}")]
    UnexpectedChunkDecodedSize(usize, u64),
    /// Invalid chunk grid indices.
    #[error("invalid chunk grid indices {0:?}")]
    InvalidChunkGridIndices(Vec<u64>),
    /// An array subset is incompatible with or outside the bounds of the array.
    #[error("array subset {0} is invalid for array of shape {1:?}")]
    InvalidArraySubset(ArraySubset, Vec<u64>),
    /// The input bytes have an unexpected length.
    #[error("the input has {0} bytes, expected {1}")]
    InvalidBytesInputSize(usize, u64),
    /// The element type does not match the array data type.
    #[error("element type {0} is incompatible with array data type {1}")]
    IncompatibleElementType(DataType, DataType),
    /// An incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// An invalid selection.
    #[error(transparent)]
    SelectionError(#[from] SelectionError),
    /// Variable-length chunks are only supported by the N5 format.
    #[error("variable-length chunks are not supported by the {0} format")]
    UnsupportedVarlenChunks(Format),
    /// An attribute error.
    #[error(transparent)]
    AttributeError(#[from] crate::attributes::AttributeError),
    #[cfg(feature = "ndarray")]
    /// The elements could not be converted to an ndarray.
    #[error("could not create an ndarray of {0} elements with shape {1:?}")]
    CouldNotCreateNdarray(usize, Vec<u64>),
}
