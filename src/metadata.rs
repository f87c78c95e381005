//! Array and group metadata.
//!
//! The [`zarr`] module holds the Zarr V2 metadata documents (`.zarray`, `.zgroup`) and the [`n5`]
//! module holds the N5 `attributes.json` document.
//! Both serialise through `serde` to the exact on-disk JSON of their format.

pub mod n5;
pub mod zarr;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata with a name and optional configuration, in the Zarr V2 compressor form.
///
/// Represents a JSON object of the form `{"id": "<name>", ...configuration}`.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Display)]
#[display("{}", serde_json::to_string(self).unwrap_or_default())]
pub struct Metadata {
    #[serde(rename = "id")]
    name: String,
    #[serde(flatten)]
    configuration: serde_json::Map<String, serde_json::Value>,
}

/// An error converting [`Metadata`] configuration to a typed configuration.
#[derive(Debug, Error)]
#[error("{name} configuration is invalid: {error}")]
pub struct MetadataConfigurationError {
    name: String,
    error: String,
}

impl MetadataConfigurationError {
    /// Create a new [`MetadataConfigurationError`].
    #[must_use]
    pub fn new(name: String, error: String) -> Self {
        Self { name, error }
    }
}

impl Metadata {
    /// Create metadata from `name` with no configuration.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            configuration: serde_json::Map::default(),
        }
    }

    /// Create metadata from `name` and a serializable `configuration`.
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
            |err| MetadataConfigurationError {
                name: self.name.clone(),
                error: err.to_string(),
            },
        )
    }

    /// Returns the metadata name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metadata configuration.
    #[must_use]
    pub const fn configuration(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.configuration
    }
}
