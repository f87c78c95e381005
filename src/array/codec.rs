//! Chunk compression codecs.
//!
//! A codec is a lossless byte-sequence transform applied to a chunk's raw payload.
//! [`Compression`] is the format-independent description of a codec and its options; it converts
//! to and from the per-format metadata representations (the Zarr `compressor` object and the N5
//! `compression` object, whose option names differ) and constructs the codec itself.

mod blosc;
mod bzip2_codec;
mod gzip;
mod lz4_codec;
pub mod options;
mod xz;
mod zlib;

pub use blosc::BloscCodec;
pub use bzip2_codec::Bzip2Codec;
pub use gzip::GzipCodec;
pub use lz4_codec::Lz4Codec;
pub use options::{CodecOptions, CodecOptionsBuilder};
pub use xz::XzCodec;
pub use zlib::ZlibCodec;

use std::sync::Arc;

use thiserror::Error;

use crate::{
    file::Format,
    metadata::{
        n5::{
            N5BloscConfiguration, N5Bzip2Configuration, N5CompressionMetadata,
            N5GzipConfiguration, N5Lz4Configuration, N5XzConfiguration,
        },
        zarr::{
            BloscCompressor, BloscShuffleMode, ZarrBloscConfiguration, ZarrBzip2Configuration,
            ZarrDeflateConfiguration,
        },
        Metadata, MetadataConfigurationError,
    },
};

use super::array_errors::ArrayCreateError;

/// Traits for a codec which converts between a decoded chunk payload and its encoded store
/// value.
pub trait BytesToBytesCodecTraits: Send + Sync + core::fmt::Debug {
    /// Encode `decoded_value`.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the underlying compression library fails.
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Decode `encoded_value`.
    ///
    /// The decoded output is not validated against `decoded_representation` here; the chunk
    /// engine checks the decoded length.
    ///
    /// # Errors
    /// Returns [`CodecError`] if the underlying compression library fails.
    fn decode(
        &self,
        encoded_value: Vec<u8>,
        decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError>;
}

/// The representation of a byte sequence as known before decoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BytesRepresentation {
    /// The size is fixed and known.
    FixedSize(u64),
    /// The size is bounded above.
    BoundedSize(u64),
    /// The size is unbounded.
    UnboundedSize,
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid compression level or option value.
    #[error("invalid compression option: {0}")]
    InvalidOption(String),
    /// Any other codec error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for CodecError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// A format-independent chunk compression description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Compression {
    /// No compression.
    Raw,
    /// Deflate with a zlib stream wrapper (Zarr only, `zlib` compressor id).
    Zlib {
        /// The compression level (1-9).
        level: u32,
    },
    /// Deflate with a gzip stream wrapper (Zarr `gzip` compressor id, N5 `gzip` compression).
    Gzip {
        /// The compression level (1-9).
        level: u32,
    },
    /// Bzip2.
    Bzip2 {
        /// The compression level (1-9). Recorded as `blockSize` in N5 metadata.
        level: u32,
    },
    /// Xz (N5 only).
    Xz {
        /// The xz preset (0-9).
        preset: u32,
    },
    /// Lz4 (N5 only).
    Lz4 {
        /// The lz4 block size in bytes.
        block_size: u32,
    },
    /// Blosc.
    Blosc {
        /// The internal blosc compressor.
        cname: BloscCompressor,
        /// The compression level (0-9).
        clevel: u8,
        /// The shuffle mode.
        shuffle: BloscShuffleMode,
        /// The blosc block size. 0 lets blosc choose automatically.
        blocksize: usize,
    },
}

impl Compression {
    /// The default compression of `format`: blosc (lz4, level 5, byte shuffle) for Zarr and gzip
    /// (level 5) for N5.
    #[must_use]
    pub const fn default_for(format: Format) -> Self {
        match format {
            Format::Zarr => Self::Blosc {
                cname: BloscCompressor::LZ4,
                clevel: 5,
                shuffle: BloscShuffleMode::Shuffle,
                blocksize: 0,
            },
            Format::N5 => Self::Gzip { level: 5 },
        }
    }

    /// The compression name used in metadata and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Zlib { .. } => "zlib",
            Self::Gzip { .. } => "gzip",
            Self::Bzip2 { .. } => "bzip2",
            Self::Xz { .. } => "xz",
            Self::Lz4 { .. } => "lz4",
            Self::Blosc { .. } => "blosc",
        }
    }

    /// Create a compression from the Zarr V2 `compressor` metadata.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the compressor is not supported by the Zarr format or its
    /// configuration is invalid (including unrecognised options).
    pub fn from_zarr_metadata(
        compressor: Option<&Metadata>,
    ) -> Result<Self, ArrayCreateError> {
        let Some(compressor) = compressor else {
            return Ok(Self::Raw);
        };
        let invalid = |err: MetadataConfigurationError| {
            ArrayCreateError::InvalidCompression(err.to_string())
        };
        match compressor.name() {
            "zlib" => {
                let configuration: ZarrDeflateConfiguration =
                    compressor.to_configuration().map_err(invalid)?;
                Ok(Self::Zlib {
                    level: configuration.level,
                })
            }
            "gzip" => {
                let configuration: ZarrDeflateConfiguration =
                    compressor.to_configuration().map_err(invalid)?;
                Ok(Self::Gzip {
                    level: configuration.level,
                })
            }
            "bzip2" => {
                let configuration: ZarrBzip2Configuration =
                    compressor.to_configuration().map_err(invalid)?;
                Ok(Self::Bzip2 {
                    level: configuration.level,
                })
            }
            "blosc" => {
                let configuration: ZarrBloscConfiguration =
                    compressor.to_configuration().map_err(invalid)?;
                Ok(Self::Blosc {
                    cname: configuration.cname,
                    clevel: configuration.clevel,
                    shuffle: configuration.shuffle,
                    blocksize: configuration.blocksize,
                })
            }
            name => Err(ArrayCreateError::UnsupportedCompressor {
                name: name.to_string(),
                format: Format::Zarr,
            }),
        }
    }

    /// Create a compression from N5 `compression` metadata.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError`] if the compression is not supported by the N5 format or its
    /// configuration is invalid (including unrecognised options).
    pub fn from_n5_metadata(
        compression: &N5CompressionMetadata,
    ) -> Result<Self, ArrayCreateError> {
        let invalid = |err: MetadataConfigurationError| {
            ArrayCreateError::InvalidCompression(err.to_string())
        };
        match compression.name() {
            "raw" => Ok(Self::Raw),
            "gzip" => {
                let configuration: N5GzipConfiguration =
                    compression.to_configuration().map_err(invalid)?;
                let level = match configuration.level {
                    // -1 selects the implementation default
                    -1 => 6,
                    level if level >= 0 => {
                        u32::try_from(level).expect("level is non-negative")
                    }
                    level => {
                        return Err(ArrayCreateError::InvalidCompression(format!(
                            "invalid gzip compression level {level}"
                        )))
                    }
                };
                Ok(Self::Gzip { level })
            }
            "bzip2" => {
                let configuration: N5Bzip2Configuration =
                    compression.to_configuration().map_err(invalid)?;
                Ok(Self::Bzip2 {
                    level: configuration.block_size,
                })
            }
            "xz" => {
                let configuration: N5XzConfiguration =
                    compression.to_configuration().map_err(invalid)?;
                Ok(Self::Xz {
                    preset: configuration.preset,
                })
            }
            "lz4" => {
                let configuration: N5Lz4Configuration =
                    compression.to_configuration().map_err(invalid)?;
                Ok(Self::Lz4 {
                    block_size: configuration.block_size,
                })
            }
            "blosc" => {
                let configuration: N5BloscConfiguration =
                    compression.to_configuration().map_err(invalid)?;
                Ok(Self::Blosc {
                    cname: configuration.cname,
                    clevel: configuration.clevel,
                    shuffle: configuration.shuffle,
                    blocksize: configuration.blocksize,
                })
            }
            name => Err(ArrayCreateError::UnsupportedCompressor {
                name: name.to_string(),
                format: Format::N5,
            }),
        }
    }

    /// Convert to the Zarr V2 `compressor` metadata (`None` for raw).
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::UnsupportedCompressor`] if the compression is not available in
    /// the Zarr format.
    pub fn to_zarr_metadata(&self) -> Result<Option<Metadata>, ArrayCreateError> {
        match self {
            Self::Raw => Ok(None),
            Self::Zlib { level } => Ok(Some(
                Metadata::new_with_serializable_configuration(
                    "zlib",
                    &ZarrDeflateConfiguration { level: *level },
                )
                .expect("configuration is serializable"),
            )),
            Self::Gzip { level } => Ok(Some(
                Metadata::new_with_serializable_configuration(
                    "gzip",
                    &ZarrDeflateConfiguration { level: *level },
                )
                .expect("configuration is serializable"),
            )),
            Self::Bzip2 { level } => Ok(Some(
                Metadata::new_with_serializable_configuration(
                    "bzip2",
                    &ZarrBzip2Configuration { level: *level },
                )
                .expect("configuration is serializable"),
            )),
            Self::Blosc {
                cname,
                clevel,
                shuffle,
                blocksize,
            } => Ok(Some(
                Metadata::new_with_serializable_configuration(
                    "blosc",
                    &ZarrBloscConfiguration {
                        cname: *cname,
                        clevel: *clevel,
                        shuffle: *shuffle,
                        blocksize: *blocksize,
                    },
                )
                .expect("configuration is serializable"),
            )),
            Self::Xz { .. } | Self::Lz4 { .. } => {
                Err(ArrayCreateError::UnsupportedCompressor {
                    name: self.name().to_string(),
                    format: Format::Zarr,
                })
            }
        }
    }

    /// Convert to the N5 `compression` metadata.
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::UnsupportedCompressor`] if the compression is not available in
    /// the N5 format.
    pub fn to_n5_metadata(&self) -> Result<N5CompressionMetadata, ArrayCreateError> {
        match self {
            Self::Raw => Ok(N5CompressionMetadata::new("raw")),
            Self::Gzip { level } => Ok(N5CompressionMetadata::new_with_serializable_configuration(
                "gzip",
                &N5GzipConfiguration {
                    level: i32::try_from(*level).unwrap_or(-1),
                },
            )
            .expect("configuration is serializable")),
            Self::Bzip2 { level } => {
                Ok(N5CompressionMetadata::new_with_serializable_configuration(
                    "bzip2",
                    &N5Bzip2Configuration { block_size: *level },
                )
                .expect("configuration is serializable"))
            }
            Self::Xz { preset } => {
                Ok(N5CompressionMetadata::new_with_serializable_configuration(
                    "xz",
                    &N5XzConfiguration { preset: *preset },
                )
                .expect("configuration is serializable"))
            }
            Self::Lz4 { block_size } => {
                Ok(N5CompressionMetadata::new_with_serializable_configuration(
                    "lz4",
                    &N5Lz4Configuration {
                        block_size: *block_size,
                    },
                )
                .expect("configuration is serializable"))
            }
            Self::Blosc {
                cname,
                clevel,
                shuffle,
                blocksize,
            } => Ok(N5CompressionMetadata::new_with_serializable_configuration(
                "blosc",
                &N5BloscConfiguration {
                    cname: *cname,
                    clevel: *clevel,
                    shuffle: *shuffle,
                    blocksize: *blocksize,
                },
            )
            .expect("configuration is serializable")),
            Self::Zlib { .. } => Err(ArrayCreateError::UnsupportedCompressor {
                name: self.name().to_string(),
                format: Format::N5,
            }),
        }
    }

    /// Construct the codec for this compression, or [`None`] for raw.
    ///
    /// `element_size` is the array element size in bytes (used by the blosc shuffle filter).
    ///
    /// # Errors
    /// Returns [`ArrayCreateError::InvalidCompression`] if an option is out of range.
    pub fn to_codec(
        &self,
        element_size: usize,
    ) -> Result<Option<Arc<dyn BytesToBytesCodecTraits>>, ArrayCreateError> {
        let invalid =
            |err: CodecError| ArrayCreateError::InvalidCompression(err.to_string());
        match self {
            Self::Raw => Ok(None),
            Self::Zlib { level } => Ok(Some(Arc::new(
                ZlibCodec::new(*level).map_err(invalid)?,
            ))),
            Self::Gzip { level } => Ok(Some(Arc::new(
                GzipCodec::new(*level).map_err(invalid)?,
            ))),
            Self::Bzip2 { level } => Ok(Some(Arc::new(
                Bzip2Codec::new(*level).map_err(invalid)?,
            ))),
            Self::Xz { preset } => Ok(Some(Arc::new(XzCodec::new(*preset).map_err(invalid)?))),
            Self::Lz4 { block_size } => Ok(Some(Arc::new(Lz4Codec::new(*block_size)))),
            Self::Blosc {
                cname,
                clevel,
                shuffle,
                blocksize,
            } => Ok(Some(Arc::new(
                BloscCodec::new(*cname, *clevel, *shuffle, *blocksize, element_size)
                    .map_err(invalid)?,
            ))),
        }
    }
}
