//! User attributes.
//!
//! Groups and arrays carry a JSON object of user attributes.
//! In the Zarr format they live in a `.zattributes` document next to the node metadata; in the
//! N5 format they share the node's `attributes.json` document with the reserved metadata keys,
//! which are filtered from enumeration and write-protected.
//!
//! Attribute JSON encoding and decoding is pluggable through [`AttributeCodec`], configured per
//! container with [`FileBuilder::attribute_codec`](crate::file::FileBuilder::attribute_codec).

use thiserror::Error;

use crate::{
    file::Format,
    metadata::n5::is_n5_reserved_attribute_key,
    node::NodePath,
    storage::{
        meta_key_n5_attributes, meta_key_zarr_attributes, ReadableStorageTraits, StorageError,
        StoreKey, WritableStorageTraits,
    },
};

/// A JSON object of user attributes.
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// An attribute access error.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// The attribute document is not a JSON object.
    #[error("invalid attributes for {0}: {1}")]
    InvalidAttributes(StoreKey, String),
    /// A reserved N5 metadata key was mutated.
    #[error("N5 metadata key {0} cannot be mutated")]
    ReservedKey(String),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// Encodes and decodes attribute documents.
///
/// The default implementation is [`JsonAttributeCodec`]; containers can be configured with a
/// custom codec to customise JSON encoding and decoding.
pub trait AttributeCodec: Send + Sync + core::fmt::Debug {
    /// Decode an attribute document.
    ///
    /// An empty document decodes to an empty map.
    ///
    /// # Errors
    /// Returns an error `String` if `bytes` is not a JSON object.
    fn decode(&self, bytes: &[u8]) -> Result<AttributeMap, String>;

    /// Encode an attribute document.
    ///
    /// # Errors
    /// Returns an error `String` if `attributes` cannot be encoded.
    fn encode(&self, attributes: &AttributeMap) -> Result<Vec<u8>, String>;
}

/// The default [`AttributeCodec`], backed by `serde_json`.
///
/// Tolerates empty and whitespace-only documents on decode (an N5 `attributes.json` may be
/// empty).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonAttributeCodec;

impl AttributeCodec for JsonAttributeCodec {
    fn decode(&self, bytes: &[u8]) -> Result<AttributeMap, String> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(AttributeMap::default());
        }
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|err| err.to_string())?;
        match value {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err("expected a JSON object".to_string()),
        }
    }

    fn encode(&self, attributes: &AttributeMap) -> Result<Vec<u8>, String> {
        serde_json::to_vec_pretty(attributes).map_err(|err| err.to_string())
    }
}

/// The attribute document key of a node.
#[must_use]
pub(crate) fn attributes_key(format: Format, path: &NodePath) -> StoreKey {
    match format {
        Format::Zarr => meta_key_zarr_attributes(path),
        Format::N5 => meta_key_n5_attributes(path),
    }
}

/// Read the raw attribute document of a node (reserved keys included).
pub(crate) fn read_attribute_document<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    codec: &dyn AttributeCodec,
    format: Format,
    path: &NodePath,
) -> Result<AttributeMap, AttributeError> {
    let key = attributes_key(format, path);
    let Some(bytes) = storage.get(&key)? else {
        return Ok(AttributeMap::default());
    };
    codec
        .decode(&bytes)
        .map_err(|err| AttributeError::InvalidAttributes(key, err))
}

/// Read the user attributes of a node, with N5 reserved keys filtered out.
pub(crate) fn read_attributes<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    codec: &dyn AttributeCodec,
    format: Format,
    path: &NodePath,
) -> Result<AttributeMap, AttributeError> {
    let mut attributes = read_attribute_document(storage, codec, format, path)?;
    if format == Format::N5 {
        attributes.retain(|key, _| !is_n5_reserved_attribute_key(key));
    }
    Ok(attributes)
}

/// Set one user attribute of a node with a full read-modify-write cycle.
pub(crate) fn set_attribute<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    codec: &dyn AttributeCodec,
    format: Format,
    path: &NodePath,
    key: &str,
    value: serde_json::Value,
) -> Result<(), AttributeError> {
    if format == Format::N5 && is_n5_reserved_attribute_key(key) {
        return Err(AttributeError::ReservedKey(key.to_string()));
    }
    let mut document = read_attribute_document(storage, codec, format, path)?;
    document.insert(key.to_string(), value);
    write_attribute_document(storage, codec, format, path, &document)
}

/// Remove one user attribute of a node with a full read-modify-write cycle.
///
/// Returns true if the attribute existed.
pub(crate) fn remove_attribute<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    codec: &dyn AttributeCodec,
    format: Format,
    path: &NodePath,
    key: &str,
) -> Result<bool, AttributeError> {
    if format == Format::N5 && is_n5_reserved_attribute_key(key) {
        return Err(AttributeError::ReservedKey(key.to_string()));
    }
    let mut document = read_attribute_document(storage, codec, format, path)?;
    let existed = document.remove(key).is_some();
    if existed {
        write_attribute_document(storage, codec, format, path, &document)?;
    }
    Ok(existed)
}

/// Write the raw attribute document of a node.
pub(crate) fn write_attribute_document<TStorage: ?Sized + WritableStorageTraits>(
    storage: &TStorage,
    codec: &dyn AttributeCodec,
    format: Format,
    path: &NodePath,
    document: &AttributeMap,
) -> Result<(), AttributeError> {
    let key = attributes_key(format, path);
    let bytes = codec
        .encode(document)
        .map_err(|err| AttributeError::InvalidAttributes(key.clone(), err))?;
    storage.set(&key, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_attribute_codec_tolerates_empty() {
        let codec = JsonAttributeCodec;
        assert!(codec.decode(b"").unwrap().is_empty());
        assert!(codec.decode(b"  \n").unwrap().is_empty());
        assert!(codec.decode(b"[1, 2]").is_err());
        let map = codec.decode(br#"{"a": 1}"#).unwrap();
        assert_eq!(map["a"], 1);
    }
}
