//! Array data types.

use derive_more::Display;
use thiserror::Error;

use crate::metadata::zarr::ZarrFillValueMetadata;

use super::{endianness::Endianness, fill_value::FillValue};

/// An array data type.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum DataType {
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    #[display("int8")]
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    #[display("int16")]
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    #[display("int32")]
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    #[display("int64")]
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    #[display("uint8")]
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    #[display("uint16")]
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    #[display("uint32")]
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    #[display("uint64")]
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    #[display("float32")]
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    #[display("float64")]
    Float64,
}

/// An unsupported data type error.
#[derive(Debug, Error)]
#[error("data type {0} is not supported")]
pub struct UnsupportedDataTypeError(String);

/// An incompatible fill value error.
#[derive(Debug, Error)]
#[error("fill value {1} is incompatible with data type {0}")]
pub struct IncompatibleFillValueMetadataError(DataType, String);

impl DataType {
    /// All supported data types.
    pub const ALL: [DataType; 10] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the size in bytes of an element of this data type.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns the plain data type name used by N5 metadata (e.g. `uint16`).
    #[must_use]
    pub fn n5_name(&self) -> String {
        self.to_string()
    }

    /// Create a data type from the plain name used by N5 metadata.
    ///
    /// # Errors
    /// Returns an [`UnsupportedDataTypeError`] if the name is not recognised.
    pub fn from_n5_name(name: &str) -> Result<Self, UnsupportedDataTypeError> {
        match name {
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "uint8" => Ok(Self::UInt8),
            "uint16" => Ok(Self::UInt16),
            "uint32" => Ok(Self::UInt32),
            "uint64" => Ok(Self::UInt64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => Err(UnsupportedDataTypeError(name.to_string())),
        }
    }

    /// Returns the NumPy typestr used by Zarr V2 metadata (e.g. `<i4`, `|u1`).
    ///
    /// Multi-byte data types are reported little-endian.
    #[must_use]
    pub const fn zarr_typestr(&self) -> &'static str {
        match self {
            Self::Int8 => "|i1",
            Self::Int16 => "<i2",
            Self::Int32 => "<i4",
            Self::Int64 => "<i8",
            Self::UInt8 => "|u1",
            Self::UInt16 => "<u2",
            Self::UInt32 => "<u4",
            Self::UInt64 => "<u8",
            Self::Float32 => "<f4",
            Self::Float64 => "<f8",
        }
    }

    /// Create a data type and the byte order of its on-disk representation from a Zarr V2
    /// typestr.
    ///
    /// Accepts `<` (little-endian), `>` (big-endian), and `|` (not applicable) byte order
    /// prefixes.
    ///
    /// # Errors
    /// Returns an [`UnsupportedDataTypeError`] if the typestr is not recognised.
    pub fn from_zarr_typestr(
        dtype: &str,
    ) -> Result<(Self, Endianness), UnsupportedDataTypeError> {
        let endianness = match dtype.as_bytes().first() {
            Some(b'<' | b'|') => Endianness::Little,
            Some(b'>') => Endianness::Big,
            _ => return Err(UnsupportedDataTypeError(dtype.to_string())),
        };
        let data_type = match &dtype[1..] {
            "i1" => Self::Int8,
            "i2" => Self::Int16,
            "i4" => Self::Int32,
            "i8" => Self::Int64,
            "u1" => Self::UInt8,
            "u2" => Self::UInt16,
            "u4" => Self::UInt32,
            "u8" => Self::UInt64,
            "f4" => Self::Float32,
            "f8" => Self::Float64,
            _ => return Err(UnsupportedDataTypeError(dtype.to_string())),
        };
        Ok((data_type, endianness))
    }

    /// Create a fill value from Zarr V2 fill value metadata.
    ///
    /// A null fill value maps to zero.
    ///
    /// # Errors
    /// Returns an [`IncompatibleFillValueMetadataError`] if the metadata is incompatible with
    /// this data type (e.g. a non-finite float for an integer data type, or an out-of-range
    /// number).
    #[allow(clippy::cast_possible_truncation)]
    pub fn fill_value_from_zarr_metadata(
        &self,
        fill_value: &ZarrFillValueMetadata,
    ) -> Result<FillValue, IncompatibleFillValueMetadataError> {
        let err =
            || IncompatibleFillValueMetadataError(*self, format!("{fill_value:?}"));
        match fill_value {
            ZarrFillValueMetadata::Null => Ok(self.zero_fill_value()),
            ZarrFillValueMetadata::NaN => match self {
                Self::Float32 => Ok(FillValue::from(f32::NAN)),
                Self::Float64 => Ok(FillValue::from(f64::NAN)),
                _ => Err(err()),
            },
            ZarrFillValueMetadata::Infinity => match self {
                Self::Float32 => Ok(FillValue::from(f32::INFINITY)),
                Self::Float64 => Ok(FillValue::from(f64::INFINITY)),
                _ => Err(err()),
            },
            ZarrFillValueMetadata::NegInfinity => match self {
                Self::Float32 => Ok(FillValue::from(f32::NEG_INFINITY)),
                Self::Float64 => Ok(FillValue::from(f64::NEG_INFINITY)),
                _ => Err(err()),
            },
            ZarrFillValueMetadata::Number(number) => match self {
                Self::Int8 => i8::try_from(number.as_i64().ok_or_else(err)?)
                    .map(FillValue::from)
                    .map_err(|_| err()),
                Self::Int16 => i16::try_from(number.as_i64().ok_or_else(err)?)
                    .map(FillValue::from)
                    .map_err(|_| err()),
                Self::Int32 => i32::try_from(number.as_i64().ok_or_else(err)?)
                    .map(FillValue::from)
                    .map_err(|_| err()),
                Self::Int64 => number.as_i64().map(FillValue::from).ok_or_else(err),
                Self::UInt8 => u8::try_from(number.as_u64().ok_or_else(err)?)
                    .map(FillValue::from)
                    .map_err(|_| err()),
                Self::UInt16 => u16::try_from(number.as_u64().ok_or_else(err)?)
                    .map(FillValue::from)
                    .map_err(|_| err()),
                Self::UInt32 => u32::try_from(number.as_u64().ok_or_else(err)?)
                    .map(FillValue::from)
                    .map_err(|_| err()),
                Self::UInt64 => number.as_u64().map(FillValue::from).ok_or_else(err),
                Self::Float32 => number
                    .as_f64()
                    .map(|f| FillValue::from(f as f32))
                    .ok_or_else(err),
                Self::Float64 => number.as_f64().map(FillValue::from).ok_or_else(err),
            },
        }
    }

    /// Create Zarr V2 fill value metadata from a fill value.
    ///
    /// # Panics
    /// Panics if the length of `fill_value` does not match the data type size.
    #[must_use]
    pub fn fill_value_to_zarr_metadata(&self, fill_value: &FillValue) -> ZarrFillValueMetadata {
        assert_eq!(fill_value.size(), self.size());
        let bytes = fill_value.as_ne_bytes();
        let float_metadata = |f: f64| {
            if f.is_nan() {
                ZarrFillValueMetadata::NaN
            } else if f == f64::INFINITY {
                ZarrFillValueMetadata::Infinity
            } else if f == f64::NEG_INFINITY {
                ZarrFillValueMetadata::NegInfinity
            } else {
                ZarrFillValueMetadata::Number(
                    serde_json::Number::from_f64(f).unwrap_or_else(|| serde_json::Number::from(0)),
                )
            }
        };
        match self {
            Self::Int8 => ZarrFillValueMetadata::Number(
                i8::from_ne_bytes(bytes.try_into().unwrap()).into(),
            ),
            Self::Int16 => ZarrFillValueMetadata::Number(
                i16::from_ne_bytes(bytes.try_into().unwrap()).into(),
            ),
            Self::Int32 => ZarrFillValueMetadata::Number(
                i32::from_ne_bytes(bytes.try_into().unwrap()).into(),
            ),
            Self::Int64 => ZarrFillValueMetadata::Number(
                i64::from_ne_bytes(bytes.try_into().unwrap()).into(),
            ),
            Self::UInt8 => ZarrFillValueMetadata::Number(
                u8::from_ne_bytes(bytes.try_into().unwrap()).into(),
            ),
            Self::UInt16 => ZarrFillValueMetadata::Number(
                u16::from_ne_bytes(bytes.try_into().unwrap()).into(),
            ),
            Self::UInt32 => ZarrFillValueMetadata::Number(
                u32::from_ne_bytes(bytes.try_into().unwrap()).into(),
            ),
            Self::UInt64 => ZarrFillValueMetadata::Number(
                u64::from_ne_bytes(bytes.try_into().unwrap()).into(),
            ),
            Self::Float32 => {
                float_metadata(f32::from_ne_bytes(bytes.try_into().unwrap()).into())
            }
            Self::Float64 => float_metadata(f64::from_ne_bytes(bytes.try_into().unwrap())),
        }
    }

    /// Returns the all-zero fill value of this data type.
    #[must_use]
    pub fn zero_fill_value(&self) -> FillValue {
        FillValue::new(vec![0u8; self.size()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_sizes_and_names() {
        assert_eq!(DataType::UInt8.size(), 1);
        assert_eq!(DataType::Int16.size(), 2);
        assert_eq!(DataType::Float64.size(), 8);
        assert_eq!(DataType::UInt16.n5_name(), "uint16");
        assert_eq!(DataType::Float32.zarr_typestr(), "<f4");
        assert_eq!(DataType::UInt8.zarr_typestr(), "|u1");
    }

    #[test]
    fn data_type_from_zarr_typestr() {
        assert_eq!(
            DataType::from_zarr_typestr("<i4").unwrap(),
            (DataType::Int32, Endianness::Little)
        );
        assert_eq!(
            DataType::from_zarr_typestr(">f8").unwrap(),
            (DataType::Float64, Endianness::Big)
        );
        assert_eq!(
            DataType::from_zarr_typestr("|u1").unwrap(),
            (DataType::UInt8, Endianness::Little)
        );
        assert!(DataType::from_zarr_typestr("<c16").is_err());
        assert!(DataType::from_zarr_typestr("u1").is_err());
    }

    #[test]
    fn data_type_from_n5_name() {
        assert_eq!(DataType::from_n5_name("uint64").unwrap(), DataType::UInt64);
        assert!(DataType::from_n5_name("complex64").is_err());
    }

    #[test]
    fn fill_value_from_metadata() {
        let fill_value = DataType::UInt8
            .fill_value_from_zarr_metadata(&ZarrFillValueMetadata::Number(42.into()))
            .unwrap();
        assert_eq!(fill_value.as_ne_bytes(), &[42]);
        assert!(DataType::UInt8
            .fill_value_from_zarr_metadata(&ZarrFillValueMetadata::NaN)
            .is_err());
        let fill_value = DataType::Float32
            .fill_value_from_zarr_metadata(&ZarrFillValueMetadata::NaN)
            .unwrap();
        assert_eq!(fill_value.as_ne_bytes(), f32::NAN.to_ne_bytes());
        assert_eq!(
            DataType::Int16
                .fill_value_from_zarr_metadata(&ZarrFillValueMetadata::Null)
                .unwrap(),
            DataType::Int16.zero_fill_value()
        );
    }

    #[test]
    fn fill_value_to_metadata_roundtrip() {
        for data_type in DataType::ALL {
            let zero = data_type.zero_fill_value();
            let metadata = data_type.fill_value_to_zarr_metadata(&zero);
            let back = data_type.fill_value_from_zarr_metadata(&metadata).unwrap();
            assert_eq!(zero, back);
        }
        let metadata = DataType::Float64.fill_value_to_zarr_metadata(&FillValue::from(f64::NAN));
        assert_eq!(metadata, ZarrFillValueMetadata::NaN);
    }
}
