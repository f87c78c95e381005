use std::io::{Cursor, Read};

use flate2::bufread::{GzDecoder, GzEncoder};

use super::{BytesRepresentation, BytesToBytesCodecTraits, CodecError};

/// A deflate codec with a gzip stream wrapper.
///
/// Used by the Zarr `gzip` compressor id and the N5 `gzip` compression type.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    compression_level: u32,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidOption`] if `compression_level` is not in `0..=9`.
    pub fn new(compression_level: u32) -> Result<Self, CodecError> {
        if compression_level > 9 {
            return Err(CodecError::InvalidOption(format!(
                "gzip compression level {compression_level} is not in 0..=9"
            )));
        }
        Ok(Self { compression_level })
    }
}

impl BytesToBytesCodecTraits for GzipCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(
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
        let mut decoder = GzDecoder::new(Cursor::new(encoded_value));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_gzip_round_trip() {
        let bytes: Vec<u8> = (0..128).collect();
        let codec = GzipCodec::new(5).unwrap();
        let encoded = codec.encode(bytes.clone()).unwrap();
        // gzip magic
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
        let decoded = codec
            .decode(encoded, &BytesRepresentation::FixedSize(bytes.len() as u64))
            .unwrap();
        assert_eq!(bytes, decoded);
    }

    #[test]
    fn codec_gzip_invalid_level() {
        assert!(GzipCodec::new(10).is_err());
    }
}
