//! A rust library for the [Zarr V2](https://zarr-specs.readthedocs.io/en/latest/v2/v2.0.html) and [N5](https://github.com/saalfeldlab/n5) storage formats for multidimensional arrays and metadata.
//!
//! Arrays are stored as a grid of independently compressed chunks, readable and writable in
//! parallel at chunk granularity. Both on-disk layouts are binary compatible with existing data:
//! Zarr V2 (`.zarray`/`.zgroup` metadata, separator-joined chunk keys, little-endian chunk
//! payloads) and N5 (`attributes.json` metadata, reversed on-disk axis order, big-endian chunk
//! payloads with a binary block header).
//!
//! ## Features
//!  - Stores: [`filesystem`](crate::storage::store::FilesystemStore), [`memory`](crate::storage::store::MemoryStore), or any implementation of the [storage traits](crate::storage).
//!  - Data types: `int8`..`int64`, `uint8`..`uint64`, `float32`, `float64`.
//!  - Compression: raw, zlib, gzip, bzip2, xz, lz4, blosc (per-format availability follows the format specifications).
//!  - h5py-style hierarchy handles: [`File`](crate::file::File), [`Group`](crate::group::Group), and [`Array`](crate::array::Array) with open modes `r`, `r+`, `a`, `w`, `w-`/`x`.
//!  - `ndarray`: adds [`ndarray`] utility functions to [`Array`](crate::array::Array).
//!
//! ## Example
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use z5::array::{ArrayBuilder, Compression, DataType};
//! use z5::array_subset::ArraySubset;
//! use z5::file::File;
//!
//! let file = File::open("hierarchy.zarr", "a")?;
//! let group = file.require_group("volumes")?;
//! let array = group.create_array(
//!     "raw",
//!     ArrayBuilder::new(vec![100, 100], DataType::UInt8)
//!         .chunk_shape(vec![10, 10])
//!         .compression(Compression::Zlib { level: 5 }),
//! )?;
//! array.store_array_subset_elements::<u8>(
//!     &ArraySubset::new_with_ranges(&[0..10, 0..10]),
//!     &[1u8; 100],
//! )?;
//! # Ok(())
//! # }
//! ```

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod array;
pub mod array_subset;
pub mod attributes;
pub mod config;
pub mod file;
pub mod group;
pub mod metadata;
pub mod node;
pub mod storage;
