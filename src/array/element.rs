//! Typed array elements.
//!
//! [`Element`] ties a Rust numeric type to its array [`DataType`]. The `_elements` method
//! variants of [`Array`](crate::array::Array) are typed views over the type-erased array: the
//! element type is checked against the array data type before any I/O.

use super::DataType;

/// A Rust type that can represent the elements of an array of a matching [`DataType`].
pub trait Element: bytemuck::Pod + Send + Sync {
    /// The array data type represented by this type.
    const DATA_TYPE: DataType;
}

impl Element for i8 {
    const DATA_TYPE: DataType = DataType::Int8;
}

impl Element for i16 {
    const DATA_TYPE: DataType = DataType::Int16;
}

impl Element for i32 {
    const DATA_TYPE: DataType = DataType::Int32;
}

impl Element for i64 {
    const DATA_TYPE: DataType = DataType::Int64;
}

impl Element for u8 {
    const DATA_TYPE: DataType = DataType::UInt8;
}

impl Element for u16 {
    const DATA_TYPE: DataType = DataType::UInt16;
}

impl Element for u32 {
    const DATA_TYPE: DataType = DataType::UInt32;
}

impl Element for u64 {
    const DATA_TYPE: DataType = DataType::UInt64;
}

impl Element for f32 {
    const DATA_TYPE: DataType = DataType::Float32;
}

impl Element for f64 {
    const DATA_TYPE: DataType = DataType::Float64;
}

/// Convert a slice of elements to its byte representation.
#[must_use]
pub fn transmute_to_bytes<T: bytemuck::Pod>(elements: &[T]) -> &[u8] {
    bytemuck::cast_slice(elements)
}

/// Convert a byte vector to a vector of elements, avoiding an allocation where possible.
///
/// # Panics
/// Panics if the length of `bytes` is not a multiple of the element size.
#[must_use]
pub fn transmute_from_bytes_vec<T: bytemuck::Pod>(bytes: Vec<u8>) -> Vec<T> {
    bytemuck::allocation::try_cast_vec(bytes)
        .unwrap_or_else(|(_err, bytes)| bytemuck::allocation::pod_collect_to_vec(&bytes))
}
