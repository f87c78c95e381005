use std::io::{Cursor, Read};

use flate2::bufread::{ZlibDecoder, ZlibEncoder};

use super::{BytesRepresentation, BytesToBytesCodecTraits, CodecError};

/// A deflate codec with a zlib stream wrapper.
///
/// Used by the Zarr `zlib` compressor id.
#[derive(Clone, Debug)]
pub struct ZlibCodec {
    compression_level: u32,
}

impl ZlibCodec {
    /// Create a new `zlib` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidOption`] if `compression_level` is not in `0..=9`.
    pub fn new(compression_level: u32) -> Result<Self, CodecError> {
        if compression_level > 9 {
            return Err(CodecError::InvalidOption(format!(
                "zlib compression level {compression_level} is not in 0..=9"
            )));
        }
        Ok(Self { compression_level })
    }
}

impl BytesToBytesCodecTraits for ZlibCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = ZlibEncoder::new(
            Cursor::new(decoded_value),
            flate2::Compression::new(self.compression_level),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let mut decoder = ZlibDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
