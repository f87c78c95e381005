//! The N5 block format.
//!
//! An N5 chunk file ("block") is a big-endian binary header followed by the compressed payload:
//! ```text
//! u16 mode | u16 nDim | u32 blockSize[nDim] | (u32 numElements if mode == 1) | payload
//! ```
//! `blockSize` is recorded in disk (reversed) axis order and holds the *actual* shape of this
//! block, which is trimmed on the array borders.
//! In variable-length mode (`mode == 1`) the element count of the payload is declared by
//! `numElements` instead of the block shape product.

use thiserror::Error;

/// The mode of an N5 block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum N5BlockMode {
    /// A fixed-shape block: the payload holds the product of the block sizes elements.
    Default,
    /// A variable-length block: the payload element count is declared in the header.
    VarLength,
}

/// An invalid N5 block header.
#[derive(Debug, Error)]
#[error("invalid N5 block header: {0}")]
pub struct N5BlockHeaderError(String);

impl From<&str> for N5BlockHeaderError {
    fn from(err: &str) -> Self {
        Self(err.to_string())
    }
}

impl From<String> for N5BlockHeaderError {
    fn from(err: String) -> Self {
        Self(err)
    }
}

/// The binary header of an N5 block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct N5BlockHeader {
    /// The block mode.
    pub mode: N5BlockMode,
    /// The per-dimension shape of this block, in disk (reversed) axis order.
    pub block_size: Vec<u32>,
    /// The declared element count for variable-length blocks.
    pub num_elements: Option<u32>,
}

impl N5BlockHeader {
    /// Create a default-mode header from the block shape in disk axis order.
    ///
    /// # Panics
    /// Panics if a block size component exceeds `u32::MAX`.
    #[must_use]
    pub fn new(block_size_disk_order: &[u64]) -> Self {
        Self {
            mode: N5BlockMode::Default,
            block_size: block_size_disk_order
                .iter()
                .map(|size| u32::try_from(*size).unwrap())
                .collect(),
            num_elements: None,
        }
    }

    /// Create a variable-length header from the block shape in disk axis order and the payload
    /// element count.
    ///
    /// # Panics
    /// Panics if a block size component exceeds `u32::MAX`.
    #[must_use]
    pub fn new_varlen(block_size_disk_order: &[u64], num_elements: u32) -> Self {
        Self {
            mode: N5BlockMode::VarLength,
            block_size: block_size_disk_order
                .iter()
                .map(|size| u32::try_from(*size).unwrap())
                .collect(),
            num_elements: Some(num_elements),
        }
    }

    /// Return the number of payload elements declared by this header.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        match self.mode {
            N5BlockMode::Default => self
                .block_size
                .iter()
                .map(|size| u64::from(*size))
                .product(),
            N5BlockMode::VarLength => u64::from(self.num_elements.unwrap_or(0)),
        }
    }

    /// Return the size in bytes of the serialised header.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        2 + 2
            + 4 * self.block_size.len()
            + match self.mode {
                N5BlockMode::Default => 0,
                N5BlockMode::VarLength => 4,
            }
    }

    /// Serialise the header to its big-endian byte representation.
    ///
    /// # Panics
    /// Panics if the dimensionality exceeds `u16::MAX`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        let mode: u16 = match self.mode {
            N5BlockMode::Default => 0,
            N5BlockMode::VarLength => 1,
        };
        bytes.extend_from_slice(&mode.to_be_bytes());
        bytes.extend_from_slice(&u16::try_from(self.block_size.len()).unwrap().to_be_bytes());
        for size in &self.block_size {
            bytes.extend_from_slice(&size.to_be_bytes());
        }
        if self.mode == N5BlockMode::VarLength {
            bytes.extend_from_slice(&self.num_elements.unwrap_or(0).to_be_bytes());
        }
        bytes
    }

    /// Parse a header from the start of `bytes`.
    ///
    /// Returns the header and the offset of the payload.
    ///
    /// # Errors
    /// Returns an [`N5BlockHeaderError`] if `bytes` is truncated, the mode is unknown, or the
    /// dimensionality does not equal `dimensionality`.
    pub fn from_bytes(
        bytes: &[u8],
        dimensionality: usize,
    ) -> Result<(Self, usize), N5BlockHeaderError> {
        if bytes.len() < 4 {
            return Err("truncated header".into());
        }
        let mode = u16::from_be_bytes(bytes[0..2].try_into().unwrap());
        let mode = match mode {
            0 => N5BlockMode::Default,
            1 => N5BlockMode::VarLength,
            mode => return Err(format!("unknown block mode {mode}").into()),
        };
        let n_dim = usize::from(u16::from_be_bytes(bytes[2..4].try_into().unwrap()));
        if n_dim != dimensionality {
            return Err(format!(
                "block dimensionality {n_dim} does not match array dimensionality {dimensionality}"
            )
            .into());
        }
        let mut offset = 4;
        let mut block_size = Vec::with_capacity(n_dim);
        for _ in 0..n_dim {
            let Some(size_bytes) = bytes.get(offset..offset + 4) else {
                return Err("truncated header".into());
            };
            block_size.push(u32::from_be_bytes(size_bytes.try_into().unwrap()));
            offset += 4;
        }
        let num_elements = if mode == N5BlockMode::VarLength {
            let Some(count_bytes) = bytes.get(offset..offset + 4) else {
                return Err("truncated header".into());
            };
            offset += 4;
            Some(u32::from_be_bytes(count_bytes.try_into().unwrap()))
        } else {
            None
        };
        Ok((
            Self {
                mode,
                block_size,
                num_elements,
            },
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n5_block_header_default_bytes() {
        let header = N5BlockHeader::new(&[22, 33, 13]);
        let bytes = header.to_bytes();
        #[rustfmt::skip]
        assert_eq!(
            bytes,
            vec![
                0, 0,       // mode
                0, 3,       // nDim
                0, 0, 0, 22,
                0, 0, 0, 33,
                0, 0, 0, 13,
            ]
        );
        let (parsed, offset) = N5BlockHeader::from_bytes(&bytes, 3).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(offset, 16);
        assert_eq!(parsed.num_elements(), 22 * 33 * 13);
    }

    #[test]
    fn n5_block_header_varlen_bytes() {
        let header = N5BlockHeader::new_varlen(&[10], 7);
        let bytes = header.to_bytes();
        assert_eq!(bytes, vec![0, 1, 0, 1, 0, 0, 0, 10, 0, 0, 0, 7]);
        let (parsed, offset) = N5BlockHeader::from_bytes(&bytes, 1).unwrap();
        assert_eq!(parsed.mode, N5BlockMode::VarLength);
        assert_eq!(parsed.num_elements(), 7);
        assert_eq!(offset, 12);
    }

    #[test]
    fn n5_block_header_invalid() {
        assert!(N5BlockHeader::from_bytes(&[0, 0], 1).is_err());
        // unknown mode
        assert!(N5BlockHeader::from_bytes(&[0, 2, 0, 1, 0, 0, 0, 1], 1).is_err());
        // dimensionality mismatch
        assert!(N5BlockHeader::from_bytes(&[0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 1], 3).is_err());
        // truncated block sizes
        assert!(N5BlockHeader::from_bytes(&[0, 0, 0, 2, 0, 0, 0, 1], 2).is_err());
    }
}
