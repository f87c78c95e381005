use super::{BytesRepresentation, BytesToBytesCodecTraits, CodecError};

/// An `xz` codec.
///
/// Produces an xz container; used by the N5 `xz` compression type.
#[derive(Clone, Debug)]
pub struct XzCodec {
    preset: u32,
}

impl XzCodec {
    /// Create a new `xz` codec.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidOption`] if `preset` is not in `0..=9`.
    pub fn new(preset: u32) -> Result<Self, CodecError> {
        if preset > 9 {
            return Err(CodecError::InvalidOption(format!(
                "xz preset {preset} is not in 0..=9"
            )));
        }
        Ok(Self { preset })
    }
}

impl BytesToBytesCodecTraits for XzCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        lzma::compress(&decoded_value, self.preset).map_err(|err| CodecError::Other(err.to_string()))
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        lzma::decompress(&encoded_value).map_err(|err| CodecError::Other(err.to_string()))
    }
}
