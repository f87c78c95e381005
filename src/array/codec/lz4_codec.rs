use std::io::{Read, Write};

use super::{BytesRepresentation, BytesToBytesCodecTraits, CodecError};

/// An `lz4` codec.
///
/// Produces an lz4 frame; used by the N5 `lz4` compression type.
#[derive(Clone, Debug)]
pub struct Lz4Codec {
    block_size: u32,
}

impl Lz4Codec {
    /// Create a new `lz4` codec with a target `block_size` in bytes.
    #[must_use]
    pub const fn new(block_size: u32) -> Self {
        Self { block_size }
    }
}

impl BytesToBytesCodecTraits for Lz4Codec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let block_size = match self.block_size {
            0..=65536 => lz4::BlockSize::Max64KB,
            65537..=262_144 => lz4::BlockSize::Max256KB,
            262_145..=1_048_576 => lz4::BlockSize::Max1MB,
            _ => lz4::BlockSize::Max4MB,
        };
        let mut encoder = lz4::EncoderBuilder::new()
            .block_size(block_size)
            .build(Vec::new())?;
        encoder.write_all(&decoded_value)?;
        let (out, result) = encoder.finish();
        result?;
        Ok(out)
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let mut decoder = lz4::Decoder::new(std::io::Cursor::new(encoded_value))?;
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
