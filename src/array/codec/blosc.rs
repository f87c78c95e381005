//! The `blosc` codec.
//!
//! Chunk payloads are wrapped in the self-describing [blosc](https://www.blosc.org/) container
//! format, as written by other Zarr V2 and N5 implementations of blosc compression.

use std::ffi::{c_char, c_int, c_void};

use blosc_sys::{
    blosc_cbuffer_sizes, blosc_cbuffer_validate, blosc_compress_ctx, blosc_decompress_ctx,
    BLOSC_BLOSCLZ_COMPNAME, BLOSC_LZ4HC_COMPNAME, BLOSC_LZ4_COMPNAME, BLOSC_MAX_OVERHEAD,
    BLOSC_SNAPPY_COMPNAME, BLOSC_ZLIB_COMPNAME, BLOSC_ZSTD_COMPNAME,
};

use crate::metadata::zarr::{BloscCompressor, BloscShuffleMode};

use super::{BytesRepresentation, BytesToBytesCodecTraits, CodecError};

impl BloscCompressor {
    const fn as_cstr(self) -> *const u8 {
        match self {
            Self::BloscLZ => BLOSC_BLOSCLZ_COMPNAME.as_ptr(),
            Self::LZ4 => BLOSC_LZ4_COMPNAME.as_ptr(),
            Self::LZ4HC => BLOSC_LZ4HC_COMPNAME.as_ptr(),
            Self::Snappy => BLOSC_SNAPPY_COMPNAME.as_ptr(),
            Self::Zlib => BLOSC_ZLIB_COMPNAME.as_ptr(),
            Self::Zstd => BLOSC_ZSTD_COMPNAME.as_ptr(),
        }
    }
}

/// A `blosc` codec.
#[derive(Clone, Debug)]
pub struct BloscCodec {
    compressor: BloscCompressor,
    clevel: u8,
    shuffle: BloscShuffleMode,
    blocksize: usize,
    typesize: usize,
}

impl BloscCodec {
    /// Create a new `blosc` codec.
    ///
    /// `typesize` is the array element size in bytes, consulted by the shuffle filter.
    /// A `blocksize` of zero lets blosc choose the block size.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidOption`] if `clevel` is not in `0..=9` or `typesize` is zero
    /// with shuffling enabled.
    pub fn new(
        compressor: BloscCompressor,
        clevel: u8,
        shuffle: BloscShuffleMode,
        blocksize: usize,
        typesize: usize,
    ) -> Result<Self, CodecError> {
        if clevel > 9 {
            return Err(CodecError::InvalidOption(format!(
                "blosc clevel {clevel} is not in 0..=9"
            )));
        }
        if typesize == 0 && shuffle != BloscShuffleMode::NoShuffle {
            return Err(CodecError::InvalidOption(
                "blosc shuffling requires a non-zero typesize".to_string(),
            ));
        }
        Ok(Self {
            compressor,
            clevel,
            shuffle,
            blocksize,
            typesize,
        })
    }
}

fn blosc_compress_bytes(
    src: &[u8],
    clevel: u8,
    shuffle: BloscShuffleMode,
    typesize: usize,
    compressor: BloscCompressor,
    blocksize: usize,
) -> Result<Vec<u8>, CodecError> {
    let destsize = src.len() + BLOSC_MAX_OVERHEAD as usize;
    let mut dest: Vec<u8> = Vec::with_capacity(destsize);
    let destsize = unsafe {
        blosc_compress_ctx(
            c_int::from(clevel),
            shuffle as c_int,
            typesize,
            src.len(),
            src.as_ptr().cast::<c_void>(),
            dest.as_mut_ptr().cast::<c_void>(),
            destsize,
            compressor.as_cstr().cast::<c_char>(),
            blocksize,
            1,
        )
    };
    if destsize > 0 {
        unsafe {
            #[allow(clippy::cast_sign_loss)]
            dest.set_len(destsize as usize);
        }
        dest.shrink_to_fit();
        Ok(dest)
    } else {
        Err(CodecError::from(format!(
            "blosc_compress_ctx(clevel: {clevel}, doshuffle: {shuffle:?}, typesize: {typesize}, nbytes: {}, compressor: {compressor:?}, blocksize: {blocksize}) -> {destsize} (failure)",
            src.len()
        )))
    }
}

/// Validate a blosc container and return its uncompressed length.
fn blosc_validate(src: &[u8]) -> Option<usize> {
    let mut destsize: usize = 0;
    let valid = unsafe {
        blosc_cbuffer_validate(
            src.as_ptr().cast::<c_void>(),
            src.len(),
            std::ptr::addr_of_mut!(destsize),
        )
    } == 0;
    valid.then_some(destsize)
}

/// Returns the length of the uncompressed bytes of a blosc container.
///
/// # Safety
/// Validate the container first.
fn blosc_nbytes(src: &[u8]) -> Option<usize> {
    let mut uncompressed_bytes: usize = 0;
    let mut cbytes: usize = 0;
    let mut blocksize: usize = 0;
    unsafe {
        blosc_cbuffer_sizes(
            src.as_ptr().cast::<c_void>(),
            std::ptr::addr_of_mut!(uncompressed_bytes),
            std::ptr::addr_of_mut!(cbytes),
            std::ptr::addr_of_mut!(blocksize),
        );
    };
    (uncompressed_bytes > 0 && cbytes > 0 && blocksize > 0).then_some(uncompressed_bytes)
}

fn blosc_decompress_bytes(src: &[u8], destsize: usize) -> Result<Vec<u8>, CodecError> {
    let mut dest: Vec<u8> = Vec::with_capacity(destsize);
    let destsize = unsafe {
        blosc_decompress_ctx(
            src.as_ptr().cast::<c_void>(),
            dest.as_mut_ptr().cast::<c_void>(),
            destsize,
            1,
        )
    };
    if destsize > 0 {
        unsafe {
            #[allow(clippy::cast_sign_loss)]
            dest.set_len(destsize as usize);
        }
        dest.shrink_to_fit();
        Ok(dest)
    } else if destsize == 0 {
        Ok(Vec::new())
    } else {
        Err(CodecError::from("blosc_decompress_ctx failed"))
    }
}

impl BytesToBytesCodecTraits for BloscCodec {
    fn encode(&self, decoded_value: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        blosc_compress_bytes(
            &decoded_value,
            self.clevel,
            self.shuffle,
            self.typesize,
            self.compressor,
            self.blocksize,
        )
    }

    fn decode(
        &self,
        encoded_value: Vec<u8>,
        _decoded_representation: &BytesRepresentation,
    ) -> Result<Vec<u8>, CodecError> {
        let destsize = blosc_validate(&encoded_value)
            .and_then(|_| blosc_nbytes(&encoded_value))
            .ok_or_else(|| CodecError::from("blosc container validation failed"))?;
        blosc_decompress_bytes(&encoded_value, destsize)
    }
}
