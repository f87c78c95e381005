use std::sync::Arc;

use z5::array::{Array, ArrayBuilder, Compression, DataType, Element, FillValue};
use z5::array_subset::selection::SliceSpec;
use z5::array_subset::ArraySubset;
use z5::file::{FileMode, Format};
use z5::metadata::zarr::{BloscCompressor, BloscShuffleMode};
use z5::storage::store::MemoryStore;
use z5::storage::{ListableStorageTraits, ReadableStorageTraits, StoreKey};

fn build_zarr_array(
    store: &Arc<MemoryStore>,
    shape: Vec<u64>,
    chunks: Vec<u64>,
    data_type: DataType,
    compression: Compression,
) -> Array<MemoryStore> {
    let array = ArrayBuilder::new(shape, data_type)
        .chunk_shape(chunks)
        .compression(compression)
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array
}

#[test]
fn zarr_basic_roundtrip() {
    // shape (100, 100, 100), chunks (10, 10, 10), uint8, raw
    let store = Arc::new(MemoryStore::new());
    let array = build_zarr_array(
        &store,
        vec![100, 100, 100],
        vec![10, 10, 10],
        DataType::UInt8,
        Compression::Raw,
    );

    let ones = vec![1u8; 100 * 100 * 100];
    array
        .store_array_subset_elements::<u8>(
            &ArraySubset::new_with_shape(vec![100, 100, 100]),
            &ones,
        )
        .unwrap();

    // full read
    let full = array
        .retrieve_array_subset_elements::<u8>(&ArraySubset::new_with_shape(vec![100, 100, 100]))
        .unwrap();
    assert_eq!(full, ones);

    // A[1, :, :] -> shape (100, 100), all ones
    let (elements, shape) = array
        .retrieve_selection_elements::<u8>(&[1.into(), SliceSpec::Full, SliceSpec::Full])
        .unwrap();
    assert_eq!(shape, vec![100, 100]);
    assert!(elements.iter().all(|&v| v == 1));
    assert_eq!(elements.len(), 100 * 100);

    // A[-20:, :, :] -> shape (20, 100, 100), all ones
    let (elements, shape) = array
        .retrieve_selection_elements::<u8>(&[(-20i64..).into(), SliceSpec::Full, SliceSpec::Full])
        .unwrap();
    assert_eq!(shape, vec![20, 100, 100]);
    assert!(elements.iter().all(|&v| v == 1));
}

#[test]
fn zarr_sparse_chunks() {
    // writing the fill value everywhere in a chunk leaves no chunk key behind
    let store = Arc::new(MemoryStore::new());
    let array = build_zarr_array(
        &store,
        vec![100, 100],
        vec![25, 25],
        DataType::UInt8,
        Compression::Raw,
    );
    let chunk_key = StoreKey::new("data/0.0").unwrap();

    array
        .store_array_subset_elements::<u8>(
            &ArraySubset::new_with_ranges(&[0..25, 0..25]),
            &[0u8; 25 * 25],
        )
        .unwrap();
    assert!(store.get(&chunk_key).unwrap().is_none());

    array
        .store_array_subset_elements::<u8>(
            &ArraySubset::new_with_ranges(&[0..10, 0..10]),
            &[1u8; 100],
        )
        .unwrap();
    assert!(store.get(&chunk_key).unwrap().is_some());

    array
        .store_array_subset_elements::<u8>(
            &ArraySubset::new_with_ranges(&[0..10, 0..10]),
            &[0u8; 100],
        )
        .unwrap();
    assert!(store.get(&chunk_key).unwrap().is_none());
}

#[test]
fn zarr_non_aligned_write_then_whole_chunk_read() {
    // shape (128,), chunks (32,)
    let store = Arc::new(MemoryStore::new());
    let array = build_zarr_array(
        &store,
        vec![128],
        vec![32],
        DataType::UInt8,
        Compression::Raw,
    );

    array
        .store_array_subset_elements::<u8>(&ArraySubset::new_with_ranges(&[0..100]), &[1u8; 100])
        .unwrap();
    array
        .store_array_subset_elements::<u8>(&ArraySubset::new_with_ranges(&[90..100]), &[0u8; 10])
        .unwrap();

    // A[-32:] covers the last chunk exactly: all zeros, and the chunk is absent
    let (elements, shape) = array
        .retrieve_selection_elements::<u8>(&[(-32i64..).into()])
        .unwrap();
    assert_eq!(shape, vec![32]);
    assert_eq!(elements, vec![0u8; 32]);
    assert!(store.get(&StoreKey::new("data/3").unwrap()).unwrap().is_none());

    // the straddling chunk retains the mixed content
    assert_eq!(
        array.retrieve_chunk_elements::<u8>(&[2]).unwrap(),
        [vec![1u8; 26], vec![0u8; 6]].concat()
    );
}

#[test]
fn zarr_scalar_broadcast_and_squeeze() {
    let store = Arc::new(MemoryStore::new());
    let array = build_zarr_array(
        &store,
        vec![5, 5, 5],
        vec![2, 2, 2],
        DataType::UInt8,
        Compression::Raw,
    );

    array
        .store_array_subset_scalar::<u8>(&ArraySubset::new_with_shape(vec![5, 5, 5]), 1)
        .unwrap();

    // A[1, 1, 1] is a single element with an empty (scalar) shape
    let (elements, shape) = array
        .retrieve_selection_elements::<u8>(&[1.into(), 1.into(), 1.into()])
        .unwrap();
    assert!(shape.is_empty());
    assert_eq!(elements, vec![1]);

    // A[:, 0:1, :] has shape (5, 1, 5)
    let (_, shape) = array
        .retrieve_selection_elements::<u8>(&[SliceSpec::Full, (0..1).into(), SliceSpec::Full])
        .unwrap();
    assert_eq!(shape, vec![5, 1, 5]);

    // A[:, 1, :] has shape (5, 5)
    let (_, shape) = array
        .retrieve_selection_elements::<u8>(&[SliceSpec::Full, 1.into(), SliceSpec::Full])
        .unwrap();
    assert_eq!(shape, vec![5, 5]);
}

#[test]
fn zarr_scalar_broadcast_sparse() {
    // broadcasting the fill value erases covered chunks
    let store = Arc::new(MemoryStore::new());
    let array = build_zarr_array(
        &store,
        vec![8, 8],
        vec![4, 4],
        DataType::UInt8,
        Compression::Raw,
    );
    array
        .store_array_subset_scalar::<u8>(&ArraySubset::new_with_shape(vec![8, 8]), 7)
        .unwrap();
    assert!(store.get(&StoreKey::new("data/1.1").unwrap()).unwrap().is_some());
    array
        .store_array_subset_scalar::<u8>(&ArraySubset::new_with_shape(vec![8, 8]), 0)
        .unwrap();
    assert!(store.get(&StoreKey::new("data/1.1").unwrap()).unwrap().is_none());
}

#[test]
fn zarr_fill_value_defaults() {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![10, 10], DataType::Int32)
        .chunk_shape(vec![4, 4])
        .compression(Compression::Raw)
        .fill_value(FillValue::from(-7i32))
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();

    // a never-written region reads as the fill value
    let elements = array
        .retrieve_array_subset_elements::<i32>(&ArraySubset::new_with_ranges(&[3..7, 3..7]))
        .unwrap();
    assert_eq!(elements, vec![-7i32; 16]);

    // reopening picks the fill value up from the metadata
    let array = Array::open(store, "/data", Format::Zarr, FileMode::Read).unwrap();
    assert_eq!(array.fill_value().as_ne_bytes(), (-7i32).to_ne_bytes());
}

#[test]
fn zarr_chunk_independence() {
    // non-overlapping writes commute
    let store_a = Arc::new(MemoryStore::new());
    let store_b = Arc::new(MemoryStore::new());
    let r1 = ArraySubset::new_with_ranges(&[0..6, 0..6]);
    let r2 = ArraySubset::new_with_ranges(&[6..12, 6..12]);
    let x1 = vec![1u8; 36];
    let x2 = vec![2u8; 36];

    let array_a = build_zarr_array(
        &store_a,
        vec![12, 12],
        vec![4, 4],
        DataType::UInt8,
        Compression::Raw,
    );
    array_a.store_array_subset_elements::<u8>(&r1, &x1).unwrap();
    array_a.store_array_subset_elements::<u8>(&r2, &x2).unwrap();

    let array_b = build_zarr_array(
        &store_b,
        vec![12, 12],
        vec![4, 4],
        DataType::UInt8,
        Compression::Raw,
    );
    array_b.store_array_subset_elements::<u8>(&r2, &x2).unwrap();
    array_b.store_array_subset_elements::<u8>(&r1, &x1).unwrap();

    let full = ArraySubset::new_with_shape(vec![12, 12]);
    assert_eq!(
        array_a.retrieve_array_subset_elements::<u8>(&full).unwrap(),
        array_b.retrieve_array_subset_elements::<u8>(&full).unwrap()
    );
    assert_eq!(
        array_a.retrieve_array_subset_elements::<u8>(&r1).unwrap(),
        x1
    );
}

#[test]
fn zarr_out_of_bounds_subset_errors() {
    let store = Arc::new(MemoryStore::new());
    let array = build_zarr_array(
        &store,
        vec![10, 10],
        vec![4, 4],
        DataType::UInt8,
        Compression::Raw,
    );
    assert!(array
        .retrieve_array_subset_elements::<u8>(&ArraySubset::new_with_ranges(&[5..11, 0..10]))
        .is_err());
    assert!(array
        .retrieve_array_subset_elements::<u8>(&ArraySubset::new_with_ranges(&[0..10]))
        .is_err());
    assert!(array
        .store_array_subset_elements::<u8>(
            &ArraySubset::new_with_ranges(&[5..11, 0..10]),
            &[0u8; 60]
        )
        .is_err());
    // element type mismatch is rejected before any I/O
    assert!(array
        .retrieve_array_subset_elements::<u16>(&ArraySubset::new_with_ranges(&[0..2, 0..2]))
        .is_err());
}

#[test]
fn zarr_zero_extent_requests() {
    let store = Arc::new(MemoryStore::new());
    let array = build_zarr_array(
        &store,
        vec![10, 10],
        vec![4, 4],
        DataType::UInt8,
        Compression::Raw,
    );
    let empty = ArraySubset::new_with_ranges(&[3..3, 0..10]);
    assert!(array
        .retrieve_array_subset_elements::<u8>(&empty)
        .unwrap()
        .is_empty());
    array
        .store_array_subset_elements::<u8>(&empty, &[])
        .unwrap();
    assert!(store.list().unwrap().iter().all(|key| key.as_str() == "data/.zarray"));
}

fn roundtrip_zarr_case<T: Element + PartialEq + std::fmt::Debug>(
    data_type: DataType,
    compression: Compression,
    values: &[T],
) {
    // shape (9, 11), irregular chunks (4, 5)
    assert_eq!(values.len(), 9 * 11);
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![9, 11], data_type)
        .chunk_shape(vec![4, 5])
        .compression(compression.clone())
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();

    let full = ArraySubset::new_with_shape(vec![9, 11]);
    array.store_array_subset_elements::<T>(&full, values).unwrap();
    assert_eq!(
        array.retrieve_array_subset_elements::<T>(&full).unwrap(),
        values
    );

    // partial read straddling chunk borders
    let subset = ArraySubset::new_with_ranges(&[2..7, 3..9]);
    let partial = array.retrieve_array_subset_elements::<T>(&subset).unwrap();
    let mut expected = Vec::new();
    for row in 2..7u64 {
        for col in 3..9u64 {
            expected.push(values[usize::try_from(row * 11 + col).unwrap()]);
        }
    }
    assert_eq!(partial, expected);

    // reopening from the stored metadata reads the same data
    let array = Array::open(store, "/data", Format::Zarr, FileMode::Read).unwrap();
    assert_eq!(
        array.retrieve_array_subset_elements::<T>(&full).unwrap(),
        values
    );
}

macro_rules! zarr_roundtrip_all_dtypes {
    ($compression:expr) => {{
        roundtrip_zarr_case::<u8>(
            DataType::UInt8,
            $compression,
            &(0..99u64).map(|i| (i % 251) as u8).collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<u16>(
            DataType::UInt16,
            $compression,
            &(0..99u64).map(|i| (i * 7 % 65521) as u16).collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<u32>(
            DataType::UInt32,
            $compression,
            &(0..99u64)
                .map(|i| (i * 2_654_435_761 % 4_294_967_291) as u32)
                .collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<u64>(
            DataType::UInt64,
            $compression,
            &(0..99u64)
                .map(|i| i.wrapping_mul(6_364_136_223_846_793_005))
                .collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<i8>(
            DataType::Int8,
            $compression,
            &(0..99u64).map(|i| (i % 251) as i8).collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<i16>(
            DataType::Int16,
            $compression,
            &(0..99u64)
                .map(|i| (i * 13 % 32749) as i16 - 16000)
                .collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<i32>(
            DataType::Int32,
            $compression,
            &(0..99u64)
                .map(|i| (i * 104_729) as i32 - 5_000_000)
                .collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<i64>(
            DataType::Int64,
            $compression,
            &(0..99u64)
                .map(|i| (i as i64).wrapping_mul(-9_007_199_254_740_993))
                .collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<f32>(
            DataType::Float32,
            $compression,
            &(0..99u64).map(|i| i as f32 * 0.25 - 10.0).collect::<Vec<_>>(),
        );
        roundtrip_zarr_case::<f64>(
            DataType::Float64,
            $compression,
            &(0..99u64)
                .map(|i| i as f64 * 0.125 - 100.0)
                .collect::<Vec<_>>(),
        );
    }};
}

#[test]
fn zarr_roundtrip_raw() {
    zarr_roundtrip_all_dtypes!(Compression::Raw);
}

#[test]
fn zarr_roundtrip_zlib() {
    zarr_roundtrip_all_dtypes!(Compression::Zlib { level: 5 });
}

#[test]
fn zarr_roundtrip_gzip() {
    zarr_roundtrip_all_dtypes!(Compression::Gzip { level: 1 });
}

#[test]
fn zarr_roundtrip_bzip2() {
    zarr_roundtrip_all_dtypes!(Compression::Bzip2 { level: 9 });
}

#[test]
fn zarr_roundtrip_blosc() {
    zarr_roundtrip_all_dtypes!(Compression::Blosc {
        cname: BloscCompressor::LZ4,
        clevel: 5,
        shuffle: BloscShuffleMode::Shuffle,
        blocksize: 0,
    });
}

#[test]
fn zarr_roundtrip_parallel() {
    // the same data with a multi-worker request
    let store = Arc::new(MemoryStore::new());
    let array = build_zarr_array(
        &store,
        vec![64, 64],
        vec![7, 9],
        DataType::UInt16,
        Compression::Zlib { level: 5 },
    );
    let values: Vec<u16> = (0..64 * 64).map(|i| (i % 8191) as u16).collect();
    let full = ArraySubset::new_with_shape(vec![64, 64]);
    let options = z5::array::CodecOptions::builder().concurrent_target(8).build();
    array
        .store_array_subset_opt(&full, z5::array::transmute_to_bytes(&values), &options)
        .unwrap();
    let bytes = array.retrieve_array_subset_opt(&full, &options).unwrap();
    assert_eq!(z5::array::transmute_from_bytes_vec::<u16>(bytes), values);
}

#[test]
fn zarr_dimension_separator_slash() {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![10, 10], DataType::UInt8)
        .chunk_shape(vec![5, 5])
        .compression(Compression::Raw)
        .dimension_separator(z5::array::ChunkKeySeparator::Slash)
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array
        .store_chunk_elements::<u8>(&[1, 0], &[1u8; 25])
        .unwrap();
    assert!(store.get(&StoreKey::new("data/1/0").unwrap()).unwrap().is_some());

    // the separator round-trips through the metadata
    let array = Array::open(store, "/data", Format::Zarr, FileMode::Read).unwrap();
    assert_eq!(
        array.retrieve_chunk_elements::<u8>(&[1, 0]).unwrap(),
        vec![1u8; 25]
    );
}
