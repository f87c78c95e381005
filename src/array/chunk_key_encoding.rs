//! Chunk key encodings.
//!
//! The chunk key encoding maps chunk grid indices to store keys below the array path:
//!  - Zarr V2: indices joined in C order by the dimension separator (`1.2.3`, or `1/2/3` with the
//!    `/` separator).
//!  - N5: indices joined by `/` in *reversed* (disk) axis order (`3/2/1`).

use itertools::Itertools;

use crate::storage::StoreKey;

pub use crate::metadata::zarr::ChunkKeySeparator;

/// A chunk key encoding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChunkKeyEncoding {
    /// The Zarr V2 encoding with a configurable dimension separator.
    Zarr(ChunkKeySeparator),
    /// The N5 encoding: `/`-separated indices in reversed axis order.
    N5,
}

impl ChunkKeyEncoding {
    /// Create the Zarr V2 chunk key encoding with `separator`.
    #[must_use]
    pub const fn zarr(separator: ChunkKeySeparator) -> Self {
        Self::Zarr(separator)
    }

    /// Create the N5 chunk key encoding.
    #[must_use]
    pub const fn n5() -> Self {
        Self::N5
    }

    /// Encode `chunk_indices` (C order) as a store key relative to the array path.
    #[must_use]
    pub fn encode(&self, chunk_indices: &[u64]) -> StoreKey {
        let key = match self {
            Self::Zarr(separator) => {
                chunk_indices.iter().join(&separator.to_string())
            }
            Self::N5 => chunk_indices.iter().rev().join("/"),
        };
        unsafe { StoreKey::new_unchecked(key) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_key_encoding_zarr() {
        let encoding = ChunkKeyEncoding::zarr(ChunkKeySeparator::Dot);
        assert_eq!(encoding.encode(&[1, 23, 45]).as_str(), "1.23.45");
        let encoding = ChunkKeyEncoding::zarr(ChunkKeySeparator::Slash);
        assert_eq!(encoding.encode(&[1, 23, 45]).as_str(), "1/23/45");
    }

    #[test]
    fn chunk_key_encoding_n5() {
        let encoding = ChunkKeyEncoding::n5();
        assert_eq!(encoding.encode(&[1, 23, 45]).as_str(), "45/23/1");
        assert_eq!(encoding.encode(&[7]).as_str(), "7");
    }
}
