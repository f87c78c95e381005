//! Zarr V2 metadata documents.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::Metadata;

/// Zarr V2 array metadata (the `.zarray` document).
///
/// An example `.zarray` document:
/// ```json
/// {
///     "zarr_format": 2,
///     "shape": [10000, 10000],
///     "chunks": [1000, 1000],
///     "dtype": "<f8",
///     "compressor": {
///         "id": "blosc",
///         "cname": "lz4",
///         "clevel": 5,
///         "shuffle": 1
///     },
///     "fill_value": 0,
///     "order": "C",
///     "filters": null
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct ZarrArrayMetadata {
    /// An integer defining the version of the storage specification to which the array adheres. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
    /// An array of integers providing the length of each dimension of the array, in C order.
    pub shape: Vec<u64>,
    /// A list of integers defining the length of each dimension of a chunk of the array, in C order.
    pub chunks: Vec<u64>,
    /// The data type of the array as a NumPy typestr (e.g. `<i4`, `<f8`, `|u1`).
    pub dtype: String,
    /// A JSON object identifying the primary compression codec and providing configuration parameters, or null if no compressor is to be used.
    #[serde(default)]
    pub compressor: Option<Metadata>,
    /// A scalar value providing the default value to use for uninitialized portions of the array, or null if no fill value is to be used.
    #[serde(default)]
    pub fill_value: ZarrFillValueMetadata,
    /// Either `C` or `F`, defining the layout of bytes within each chunk of the array. Only `C` is supported.
    pub order: ZarrOrder,
    /// A list of JSON objects providing codec configurations, or null if no filters are to be applied.
    #[serde(default)]
    pub filters: Option<Vec<Metadata>>,
    /// If present, either the string `.` or `/` defining the separator placed between the dimensions of a chunk.
    #[serde(
        default = "chunk_key_separator_default",
        skip_serializing_if = "chunk_key_separator_is_default"
    )]
    pub dimension_separator: ChunkKeySeparator,
}

const fn chunk_key_separator_default() -> ChunkKeySeparator {
    ChunkKeySeparator::Dot
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn chunk_key_separator_is_default(separator: &ChunkKeySeparator) -> bool {
    *separator == ChunkKeySeparator::Dot
}

/// Zarr V2 group metadata (the `.zgroup` document).
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
pub struct ZarrGroupMetadata {
    /// An integer defining the version of the storage specification to which the group adheres. Must be `2`.
    pub zarr_format: monostate::MustBe!(2u64),
}

/// The character placed between the dimensions of a chunk key.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug, Display)]
pub enum ChunkKeySeparator {
    /// The `.` character.
    #[serde(rename = ".")]
    #[display(".")]
    Dot,
    /// The `/` character.
    #[serde(rename = "/")]
    #[display("/")]
    Slash,
}

/// The layout of bytes within each chunk of the array.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
pub enum ZarrOrder {
    /// Row-major order. The last dimension varies fastest.
    C,
    /// Column-major order. The first dimension varies fastest.
    F,
}

/// A scalar value providing the default value to use for uninitialized portions of the array, or null if no fill value is to be used.
#[derive(Clone, PartialEq, Debug, Default)]
pub enum ZarrFillValueMetadata {
    /// No fill value.
    #[default]
    Null,
    /// NaN (not-a-number).
    NaN,
    /// Positive infinity.
    Infinity,
    /// Negative infinity.
    NegInfinity,
    /// A number.
    Number(serde_json::Number),
}

impl<'de> serde::Deserialize<'de> for ZarrFillValueMetadata {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ZarrFillValueMetadataType {
            String(String),
            Number(serde_json::Number),
            Null,
        }
        let fill_value = ZarrFillValueMetadataType::deserialize(d)?;
        match fill_value {
            ZarrFillValueMetadataType::String(string) => match string.as_str() {
                "NaN" => Ok(Self::NaN),
                "Infinity" => Ok(Self::Infinity),
                "-Infinity" => Ok(Self::NegInfinity),
                _ => Err(serde::de::Error::custom("unsupported fill value")),
            },
            ZarrFillValueMetadataType::Number(number) => Ok(Self::Number(number)),
            ZarrFillValueMetadataType::Null => Ok(Self::Null),
        }
    }
}

impl Serialize for ZarrFillValueMetadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::NaN => serializer.serialize_str("NaN"),
            Self::Infinity => serializer.serialize_str("Infinity"),
            Self::NegInfinity => serializer.serialize_str("-Infinity"),
            Self::Number(number) => number.serialize(serializer),
        }
    }
}

/// Configuration parameters for the Zarr `zlib` and `gzip` compressors.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ZarrDeflateConfiguration {
    /// The compression level (1-9).
    pub level: u32,
}

/// Configuration parameters for the Zarr `bzip2` compressor.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ZarrBzip2Configuration {
    /// The compression level (1-9).
    pub level: u32,
}

/// Configuration parameters for the Zarr `blosc` compressor.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct ZarrBloscConfiguration {
    /// The internal blosc compressor.
    pub cname: BloscCompressor,
    /// The compression level (0-9).
    pub clevel: u8,
    /// The shuffle mode.
    pub shuffle: BloscShuffleMode,
    /// The blosc block size. 0 lets blosc choose automatically.
    #[serde(default)]
    pub blocksize: usize,
}

/// The internal compressor of a blosc container.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum BloscCompressor {
    /// [BloscLZ](https://github.com/Blosc/c-blosc/blob/master/blosc/blosclz.h): the blosc default compressor.
    BloscLZ,
    /// [LZ4](https://lz4.org/): a compact, very popular and fast compressor.
    LZ4,
    /// [LZ4HC](https://lz4.org/): a tweaked version of LZ4, produces better compression ratios at the expense of speed.
    LZ4HC,
    /// [Snappy](https://github.com/google/snappy): a popular compressor used in many places.
    Snappy,
    /// [Zlib](https://www.zlib.net/): a classic, achieving good compression ratios.
    Zlib,
    /// [Zstd](https://facebook.github.io/zstd/): an extremely well balanced codec.
    Zstd,
}

/// The blosc shuffle mode, recorded numerically in the compressor metadata.
#[derive(Serialize_repr, Deserialize_repr, Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum BloscShuffleMode {
    /// No shuffling.
    NoShuffle = 0,
    /// Byte-wise shuffling.
    Shuffle = 1,
    /// Bit-wise shuffling.
    BitShuffle = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zarr_array_metadata_roundtrip() {
        let json = r#"{
            "zarr_format": 2,
            "shape": [100, 100],
            "chunks": [10, 10],
            "dtype": "<i4",
            "compressor": {"id": "zlib", "level": 5},
            "fill_value": 0,
            "order": "C",
            "filters": null
        }"#;
        let metadata: ZarrArrayMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.shape, vec![100, 100]);
        assert_eq!(metadata.chunks, vec![10, 10]);
        assert_eq!(metadata.dtype, "<i4");
        assert_eq!(metadata.dimension_separator, ChunkKeySeparator::Dot);
        assert_eq!(metadata.order, ZarrOrder::C);
        let serialized = serde_json::to_value(&metadata).unwrap();
        assert_eq!(serialized["zarr_format"], 2);
        assert_eq!(serialized["filters"], serde_json::Value::Null);
        assert!(serialized.get("dimension_separator").is_none());
    }

    #[test]
    fn zarr_array_metadata_separator() {
        let json = r#"{
            "zarr_format": 2,
            "shape": [100],
            "chunks": [10],
            "dtype": "|u1",
            "compressor": null,
            "fill_value": null,
            "order": "C",
            "filters": null,
            "dimension_separator": "/"
        }"#;
        let metadata: ZarrArrayMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.dimension_separator, ChunkKeySeparator::Slash);
        assert!(metadata.compressor.is_none());
        assert_eq!(metadata.fill_value, ZarrFillValueMetadata::Null);
        let serialized = serde_json::to_value(&metadata).unwrap();
        assert_eq!(serialized["dimension_separator"], "/");
    }

    #[test]
    fn zarr_array_metadata_rejects_other_versions() {
        let json = r#"{
            "zarr_format": 3,
            "shape": [100],
            "chunks": [10],
            "dtype": "|u1",
            "compressor": null,
            "fill_value": 0,
            "order": "C",
            "filters": null
        }"#;
        assert!(serde_json::from_str::<ZarrArrayMetadata>(json).is_err());
    }

    #[test]
    fn zarr_fill_value_non_finite() {
        let metadata: ZarrFillValueMetadata = serde_json::from_str("\"NaN\"").unwrap();
        assert_eq!(metadata, ZarrFillValueMetadata::NaN);
        assert_eq!(serde_json::to_string(&metadata).unwrap(), "\"NaN\"");
        let metadata: ZarrFillValueMetadata = serde_json::from_str("\"-Infinity\"").unwrap();
        assert_eq!(metadata, ZarrFillValueMetadata::NegInfinity);
        assert!(serde_json::from_str::<ZarrFillValueMetadata>("\"nan\"").is_err());
    }

    #[test]
    fn zarr_blosc_configuration() {
        let json = r#"{"cname": "lz4", "clevel": 5, "shuffle": 1}"#;
        let configuration: ZarrBloscConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(configuration.cname, BloscCompressor::LZ4);
        assert_eq!(configuration.shuffle, BloscShuffleMode::Shuffle);
        assert_eq!(configuration.blocksize, 0);
    }

    #[test]
    fn zarr_deflate_configuration_rejects_extras() {
        let json = r#"{"level": 5, "strategy": 0}"#;
        assert!(serde_json::from_str::<ZarrDeflateConfiguration>(json).is_err());
    }
}
