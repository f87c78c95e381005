use std::io::Read;

use super::{BytesRepresentation, BytesToBytesCodecTraits, CodecError};

/// A `bzip2` codec.
#[derive(Clone, Debug)]
pub struct Bzip2Codec {
    compression: bzip2::Compression,
}

impl Bzip2Codec {
    /// Create a new `bzip2` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidOption`] if `level` is not in `1..=9`.
    pub fn new(level: u32) -> Result<Self, CodecError> {
        if !(1..=9).contains(&level) {
            return Err(CodecError::InvalidOption(format!(
                "bzip2 compression level {level} is not in 1..=9"
            )));
        }
        Ok(Self {
            compression: bzip2::Compression::new(level),
        })
    }
}

impl BytesToBytesCodecTraits for Bzip2Codec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = bzip2::read::BzEncoder::new(decoded_value.as_slice(), self.compression);
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let mut decoder = bzip2::read::BzDecoder::new(encoded_value.as_slice());
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
