//! N5 metadata documents.
//!
//! N5 array metadata and user attributes coexist in a single `attributes.json` document per
//! node; the reserved metadata keys are managed by this module and are never exposed through
//! user attribute access.
//! Array shapes and chunk shapes are recorded in *reversed* axis order on disk relative to the
//! C-order axes of the in-memory API.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::MetadataConfigurationError;
use crate::metadata::zarr::{BloscCompressor, BloscShuffleMode};

/// The N5 format version written to the root `attributes.json` of a new hierarchy.
pub const N5_VERSION: &str = "2.0.0";

/// The attribute keys reserved for N5 metadata.
///
/// These are filtered from user attribute enumeration and are write-protected.
pub const N5_RESERVED_ATTRIBUTE_KEYS: [&str; 6] = [
    "dimensions",
    "blockSize",
    "dataType",
    "compression",
    "compressionType",
    "n5",
];

/// Returns true if `key` is a reserved N5 metadata key.
#[must_use]
pub fn is_n5_reserved_attribute_key(key: &str) -> bool {
    N5_RESERVED_ATTRIBUTE_KEYS.contains(&key)
}

/// Returns the major component of an N5 version tag (e.g. `"2.0.0"` -> `2`).
#[must_use]
pub fn n5_major_version(tag: &str) -> Option<u64> {
    tag.split('.').next().and_then(|major| major.parse().ok())
}

/// N5 array metadata (the array fields of an `attributes.json` document).
///
/// An example `attributes.json` document for an array:
/// ```json
/// {
///     "dataType": "uint16",
///     "dimensions": [211, 54, 123],
///     "blockSize": [22, 33, 13],
///     "compression": {"type": "gzip", "level": 5}
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct N5ArrayMetadata {
    /// The data type of the array as a plain name (e.g. `uint16`).
    #[serde(rename = "dataType")]
    pub data_type: String,
    /// The length of each dimension of the array, in reversed (disk) axis order.
    pub dimensions: Vec<u64>,
    /// The length of each dimension of a chunk, in reversed (disk) axis order.
    #[serde(rename = "blockSize")]
    pub block_size: Vec<u64>,
    /// The chunk compression configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<N5CompressionMetadata>,
    /// Legacy (N5 version 1) compression configuration: a plain codec name with default options.
    #[serde(
        rename = "compressionType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub compression_type: Option<String>,
    /// The N5 version tag; present only at the hierarchy root.
    #[serde(rename = "n5", default, skip_serializing_if = "Option::is_none")]
    pub n5_version: Option<String>,
    /// User attributes sharing the document with the reserved keys.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl N5ArrayMetadata {
    /// Return the compression configuration, resolving the legacy `compressionType` form.
    ///
    /// Readers accept either `compression` (an object with a `type` key) or the legacy top-level
    /// `compressionType` name; absence of both means uncompressed.
    #[must_use]
    pub fn resolved_compression(&self) -> N5CompressionMetadata {
        if let Some(compression) = &self.compression {
            compression.clone()
        } else if let Some(name) = &self.compression_type {
            N5CompressionMetadata::new(name)
        } else {
            N5CompressionMetadata::new("raw")
        }
    }
}

/// N5 compression metadata: a JSON object of the form `{"type": "<name>", ...configuration}`.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct N5CompressionMetadata {
    #[serde(rename = "type")]
    name: String,
    #[serde(flatten)]
    configuration: serde_json::Map<String, serde_json::Value>,
}

impl N5CompressionMetadata {
    /// Create compression metadata from `name` with no configuration.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            configuration: serde_json::Map::default(),
        }
    }

    /// Create compression metadata from `name` and a serializable `configuration`.
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] if `configuration` cannot be converted to a JSON object.
    pub fn new_with_serializable_configuration<T: Serialize>(
        name: &str,
        configuration: &T,
    ) -> Result<Self, serde_json::Error> {
        let configuration = serde_json::to_value(configuration)?;
        if let serde_json::Value::Object(configuration) = configuration {
            Ok(Self {
                name: name.into(),
                configuration,
            })
        } else {
            Err(serde::ser::Error::custom(
                "the configuration cannot be serialized to a JSON object",
            ))
        }
    }

    /// Convert the configuration to a typed configuration `T`.
    ///
    /// # Errors
    /// Returns a [`MetadataConfigurationError`] if the configuration is invalid or has
    /// unrecognised options.
    pub fn to_configuration<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, MetadataConfigurationError> {
        serde_json::from_value(serde_json::Value::Object(self.configuration.clone())).map_err(
            |err| MetadataConfigurationError::new(self.name.clone(), err.to_string()),
        )
    }

    /// Returns the compression name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Configuration parameters for the N5 `gzip` compression.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct N5GzipConfiguration {
    /// The compression level. `-1` selects the implementation default.
    #[serde(default = "default_gzip_level")]
    pub level: i32,
}

const fn default_gzip_level() -> i32 {
    -1
}

/// Configuration parameters for the N5 `bzip2` compression.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct N5Bzip2Configuration {
    /// The compression work factor (1-9).
    #[serde(rename = "blockSize", default = "default_bzip2_block_size")]
    pub block_size: u32,
}

const fn default_bzip2_block_size() -> u32 {
    9
}

/// Configuration parameters for the N5 `xz` compression.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct N5XzConfiguration {
    /// The xz preset (0-9).
    #[serde(default = "default_xz_preset")]
    pub preset: u32,
}

const fn default_xz_preset() -> u32 {
    6
}

/// Configuration parameters for the N5 `lz4` compression.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct N5Lz4Configuration {
    /// The lz4 block size in bytes.
    #[serde(rename = "blockSize", default = "default_lz4_block_size")]
    pub block_size: u32,
}

const fn default_lz4_block_size() -> u32 {
    65536
}

/// Configuration parameters for the N5 `blosc` compression.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
pub struct N5BloscConfiguration {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n5_array_metadata_roundtrip() {
        let json = r#"{
            "dataType": "uint16",
            "dimensions": [211, 54, 123],
            "blockSize": [22, 33, 13],
            "compression": {"type": "gzip", "level": 5},
            "resolution": [4, 4, 40]
        }"#;
        let metadata: N5ArrayMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.data_type, "uint16");
        assert_eq!(metadata.dimensions, vec![211, 54, 123]);
        assert_eq!(metadata.block_size, vec![22, 33, 13]);
        assert_eq!(metadata.resolved_compression().name(), "gzip");
        assert!(metadata.attributes.contains_key("resolution"));
        let serialized = serde_json::to_value(&metadata).unwrap();
        assert_eq!(serialized["compression"]["type"], "gzip");
        assert_eq!(serialized["resolution"], serde_json::json!([4, 4, 40]));
    }

    #[test]
    fn n5_array_metadata_legacy_compression() {
        let json = r#"{
            "dataType": "uint8",
            "dimensions": [10],
            "blockSize": [5],
            "compressionType": "bzip2"
        }"#;
        let metadata: N5ArrayMetadata = serde_json::from_str(json).unwrap();
        let compression = metadata.resolved_compression();
        assert_eq!(compression.name(), "bzip2");
        let configuration: N5Bzip2Configuration = compression.to_configuration().unwrap();
        assert_eq!(configuration.block_size, 9);
    }

    #[test]
    fn n5_version_tags() {
        assert_eq!(n5_major_version("2.0.0"), Some(2));
        assert_eq!(n5_major_version("3.1"), Some(3));
        assert_eq!(n5_major_version("two"), None);
    }

    #[test]
    fn n5_gzip_configuration_defaults() {
        let configuration: N5GzipConfiguration = serde_json::from_str("{}").unwrap();
        assert_eq!(configuration.level, -1);
        let configuration: N5GzipConfiguration =
            serde_json::from_str(r#"{"level": 2}"#).unwrap();
        assert_eq!(configuration.level, 2);
        assert!(serde_json::from_str::<N5GzipConfiguration>(r#"{"level": 2, "extra": 1}"#).is_err());
    }

    #[test]
    fn n5_lz4_configuration_defaults() {
        let configuration: N5Lz4Configuration = serde_json::from_str("{}").unwrap();
        assert_eq!(configuration.block_size, 65536);
    }
}
