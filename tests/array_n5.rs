use std::sync::Arc;

use z5::array::{
    Array, ArrayBuilder, Compression, DataType, Element, N5BlockHeader, N5BlockMode,
};
use z5::array_subset::ArraySubset;
use z5::file::{FileMode, Format};
use z5::metadata::zarr::{BloscCompressor, BloscShuffleMode};
use z5::storage::store::MemoryStore;
use z5::storage::{ReadableStorageTraits, StoreKey, WritableStorageTraits};

fn build_n5_array(
    store: &Arc<MemoryStore>,
    shape: Vec<u64>,
    chunks: Vec<u64>,
    data_type: DataType,
    compression: Compression,
) -> Array<MemoryStore> {
    let array = ArrayBuilder::new(shape, data_type)
        .chunk_shape(chunks)
        .compression(compression)
        .build(store.clone(), "/data", Format::N5, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array
}

/// A deterministic pseudo-random sequence.
fn lcg_f64(len: usize) -> Vec<f64> {
    let mut state: u64 = 0x853c_49e6_748f_ea9b;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

#[test]
fn n5_edge_chunks_roundtrip() {
    // shape (123, 54, 211), chunks (13, 33, 22), float64, gzip
    let store = Arc::new(MemoryStore::new());
    let array = build_n5_array(
        &store,
        vec![123, 54, 211],
        vec![13, 33, 22],
        DataType::Float64,
        Compression::Gzip { level: 1 },
    );

    let data = lcg_f64(123 * 54 * 211);
    let full = ArraySubset::new_with_shape(vec![123, 54, 211]);
    array.store_array_subset_elements::<f64>(&full, &data).unwrap();
    assert_eq!(
        array.retrieve_array_subset_elements::<f64>(&full).unwrap(),
        data
    );

    // a boundary chunk along every axis: indices (9, 1, 9) has bounded shape (6, 21, 13);
    // the stored header carries that shape in reversed (disk) axis order
    let encoded = store
        .get(&StoreKey::new("data/9/1/9").unwrap())
        .unwrap()
        .expect("boundary chunk is stored");
    let (header, _) = N5BlockHeader::from_bytes(&encoded, 3).unwrap();
    assert_eq!(header.mode, N5BlockMode::Default);
    assert_eq!(header.block_size, vec![13, 21, 6]);
    assert_eq!(
        array.chunk_shape_from_header(&[9, 1, 9]).unwrap(),
        Some(vec![6, 21, 13])
    );

    // the engine-side view agrees
    assert_eq!(array.chunk_shape_bounded(&[9, 1, 9]).unwrap(), vec![6, 21, 13]);
}

#[test]
fn n5_sparse_chunks() {
    let store = Arc::new(MemoryStore::new());
    let array = build_n5_array(
        &store,
        vec![100, 100],
        vec![25, 25],
        DataType::UInt8,
        Compression::Raw,
    );
    let chunk_key = StoreKey::new("data/0/0").unwrap();

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
fn n5_chunk_keys_are_reversed() {
    let store = Arc::new(MemoryStore::new());
    let array = build_n5_array(
        &store,
        vec![10, 20, 30],
        vec![5, 5, 5],
        DataType::UInt8,
        Compression::Raw,
    );
    array
        .store_chunk_elements::<u8>(&[1, 2, 3], &[1u8; 125])
        .unwrap();
    // C-order chunk indices (1, 2, 3) live at the reversed key 3/2/1
    assert!(store.get(&StoreKey::new("data/3/2/1").unwrap()).unwrap().is_some());
    assert!(store.get(&StoreKey::new("data/1/2/3").unwrap()).unwrap().is_none());
}

#[test]
fn n5_metadata_is_reversed_on_disk() {
    let store = Arc::new(MemoryStore::new());
    let array = build_n5_array(
        &store,
        vec![100, 20],
        vec![10, 5],
        DataType::UInt16,
        Compression::Raw,
    );
    assert_eq!(array.shape(), &[100, 20]);
    assert_eq!(array.chunk_shape(), &[10, 5]);

    let bytes = store
        .get(&StoreKey::new("data/attributes.json").unwrap())
        .unwrap()
        .unwrap();
    let document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(document["dimensions"], serde_json::json!([20, 100]));
    assert_eq!(document["blockSize"], serde_json::json!([5, 10]));
    assert_eq!(document["dataType"], "uint16");
    assert_eq!(document["compression"]["type"], "raw");

    // and reads back into C order
    let array = Array::open(store, "/data", Format::N5, FileMode::Read).unwrap();
    assert_eq!(array.shape(), &[100, 20]);
    assert_eq!(array.chunk_shape(), &[10, 5]);
}

#[test]
fn n5_payload_is_big_endian() {
    let store = Arc::new(MemoryStore::new());
    let array = build_n5_array(
        &store,
        vec![3],
        vec![3],
        DataType::UInt16,
        Compression::Raw,
    );
    array
        .store_chunk_elements::<u16>(&[0], &[0x0102, 0x0304, 0x0506])
        .unwrap();
    let encoded = store.get(&StoreKey::new("data/0").unwrap()).unwrap().unwrap();
    // header: mode 0, nDim 1, blockSize [3]; payload: big-endian u16s
    assert_eq!(
        encoded,
        vec![0, 0, 0, 1, 0, 0, 0, 3, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]
    );
    assert_eq!(
        array.retrieve_chunk_elements::<u16>(&[0]).unwrap(),
        vec![0x0102, 0x0304, 0x0506]
    );
}

#[test]
fn n5_varlen_chunks() {
    let store = Arc::new(MemoryStore::new());
    let array = build_n5_array(
        &store,
        vec![100],
        vec![10],
        DataType::UInt8,
        Compression::Gzip { level: 5 },
    );

    array
        .store_chunk_varlen_elements::<u8>(&[2], &[1, 2, 3])
        .unwrap();
    assert_eq!(
        array.retrieve_chunk_varlen_elements::<u8>(&[2]).unwrap(),
        Some(vec![1, 2, 3])
    );
    assert_eq!(array.retrieve_chunk_varlen_elements::<u8>(&[3]).unwrap(), None);

    // the stored header declares the element count
    let encoded = store.get(&StoreKey::new("data/2").unwrap()).unwrap().unwrap();
    let (header, _) = N5BlockHeader::from_bytes(&encoded, 1).unwrap();
    assert_eq!(header.mode, N5BlockMode::VarLength);
    assert_eq!(header.num_elements(), 3);

    // the fixed-shape read path rejects the varlen chunk
    assert!(array.retrieve_chunk_elements::<u8>(&[2]).is_err());

    // fixed-shape chunks are also readable through the varlen path
    array.store_chunk_elements::<u8>(&[0], &[7u8; 10]).unwrap();
    assert_eq!(
        array.retrieve_chunk_varlen_elements::<u8>(&[0]).unwrap(),
        Some(vec![7u8; 10])
    );
}

#[test]
fn n5_varlen_rejected_on_zarr() {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![100], DataType::UInt8)
        .chunk_shape(vec![10])
        .compression(Compression::Raw)
        .build(store, "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    assert!(array
        .store_chunk_varlen_elements::<u8>(&[0], &[1, 2, 3])
        .is_err());
}

#[test]
fn n5_legacy_compression_type() {
    // a legacy attributes.json with a top-level compressionType is accepted
    let store = Arc::new(MemoryStore::new());
    let document = serde_json::json!({
        "dataType": "uint8",
        "dimensions": [10],
        "blockSize": [5],
        "compressionType": "gzip"
    });
    store
        .set(
            &StoreKey::new("data/attributes.json").unwrap(),
            &serde_json::to_vec(&document).unwrap(),
        )
        .unwrap();
    let array = Array::open(store, "/data", Format::N5, FileMode::ReadWrite).unwrap();
    array.store_chunk_elements::<u8>(&[0], &[1, 2, 3, 4, 5]).unwrap();
    assert_eq!(
        array.retrieve_chunk_elements::<u8>(&[0]).unwrap(),
        vec![1, 2, 3, 4, 5]
    );
}

#[test]
fn n5_corrupt_chunk_errors() {
    let store = Arc::new(MemoryStore::new());
    let array = build_n5_array(
        &store,
        vec![10],
        vec![5],
        DataType::UInt8,
        Compression::Raw,
    );
    // truncated header
    store
        .set(&StoreKey::new("data/0").unwrap(), &[0, 0])
        .unwrap();
    assert!(array.retrieve_chunk_elements::<u8>(&[0]).is_err());
    // dimensionality mismatch
    let header = N5BlockHeader::new(&[5, 5]);
    store
        .set(&StoreKey::new("data/0").unwrap(), &header.to_bytes())
        .unwrap();
    assert!(array.retrieve_chunk_elements::<u8>(&[0]).is_err());
    // block shape mismatch with the grid
    let mut value = N5BlockHeader::new(&[4]).to_bytes();
    value.extend_from_slice(&[1, 2, 3, 4]);
    store.set(&StoreKey::new("data/0").unwrap(), &value).unwrap();
    assert!(array.retrieve_chunk_elements::<u8>(&[0]).is_err());
    // payload shorter than the declared shape
    let mut value = N5BlockHeader::new(&[5]).to_bytes();
    value.extend_from_slice(&[1, 2, 3]);
    store.set(&StoreKey::new("data/0").unwrap(), &value).unwrap();
    assert!(array.retrieve_chunk_elements::<u8>(&[0]).is_err());
}

fn roundtrip_n5_case<T: Element + PartialEq + std::fmt::Debug>(
    data_type: DataType,
    compression: Compression,
    values: &[T],
) {
    // shape (9, 11), irregular chunks (4, 5)
    assert_eq!(values.len(), 9 * 11);
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![9, 11], data_type)
        .chunk_shape(vec![4, 5])
        .compression(compression)
        .build(store.clone(), "/data", Format::N5, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();

    let full = ArraySubset::new_with_shape(vec![9, 11]);
    array.store_array_subset_elements::<T>(&full, values).unwrap();
    assert_eq!(
        array.retrieve_array_subset_elements::<T>(&full).unwrap(),
        values
    );

    let array = Array::open(store, "/data", Format::N5, FileMode::Read).unwrap();
    let subset = ArraySubset::new_with_ranges(&[3..9, 2..11]);
    let partial = array.retrieve_array_subset_elements::<T>(&subset).unwrap();
    let mut expected = Vec::new();
    for row in 3..9u64 {
        for col in 2..11u64 {
            expected.push(values[usize::try_from(row * 11 + col).unwrap()]);
        }
    }
    assert_eq!(partial, expected);
}

macro_rules! n5_roundtrip_all_dtypes {
    ($compression:expr) => {{
        roundtrip_n5_case::<u8>(
            DataType::UInt8,
            $compression,
            &(0..99u64).map(|i| (i % 251) as u8).collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<u16>(
            DataType::UInt16,
            $compression,
            &(0..99u64).map(|i| (i * 7 % 65521) as u16).collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<u32>(
            DataType::UInt32,
            $compression,
            &(0..99u64)
                .map(|i| (i * 2_654_435_761 % 4_294_967_291) as u32)
                .collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<u64>(
            DataType::UInt64,
            $compression,
            &(0..99u64)
                .map(|i| i.wrapping_mul(6_364_136_223_846_793_005))
                .collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<i8>(
            DataType::Int8,
            $compression,
            &(0..99u64).map(|i| (i % 251) as i8).collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<i16>(
            DataType::Int16,
            $compression,
            &(0..99u64)
                .map(|i| (i * 13 % 32749) as i16 - 16000)
                .collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<i32>(
            DataType::Int32,
            $compression,
            &(0..99u64)
                .map(|i| (i * 104_729) as i32 - 5_000_000)
                .collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<i64>(
            DataType::Int64,
            $compression,
            &(0..99u64)
                .map(|i| (i as i64).wrapping_mul(-9_007_199_254_740_993))
                .collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<f32>(
            DataType::Float32,
            $compression,
            &(0..99u64).map(|i| i as f32 * 0.25 - 10.0).collect::<Vec<_>>(),
        );
        roundtrip_n5_case::<f64>(
            DataType::Float64,
            $compression,
            &(0..99u64)
                .map(|i| i as f64 * 0.125 - 100.0)
                .collect::<Vec<_>>(),
        );
    }};
}

#[test]
fn n5_roundtrip_raw() {
    n5_roundtrip_all_dtypes!(Compression::Raw);
}

#[test]
fn n5_roundtrip_gzip() {
    n5_roundtrip_all_dtypes!(Compression::Gzip { level: 5 });
}

#[test]
fn n5_roundtrip_bzip2() {
    n5_roundtrip_all_dtypes!(Compression::Bzip2 { level: 1 });
}

#[test]
fn n5_roundtrip_xz() {
    n5_roundtrip_all_dtypes!(Compression::Xz { preset: 3 });
}

#[test]
fn n5_roundtrip_lz4() {
    n5_roundtrip_all_dtypes!(Compression::Lz4 { block_size: 65536 });
}

#[test]
fn n5_roundtrip_blosc() {
    n5_roundtrip_all_dtypes!(Compression::Blosc {
        cname: BloscCompressor::Zstd,
        clevel: 3,
        shuffle: BloscShuffleMode::BitShuffle,
        blocksize: 0,
    });
}

#[test]
fn irregular_shapes_1d_to_5d() {
    // sweep dimensionalities with irregular chunk shapes for both formats
    let cases: &[(&[u64], &[u64])] = &[
        (&[17], &[5]),
        (&[12, 7], &[5, 3]),
        (&[9, 4, 11], &[2, 3, 4]),
        (&[5, 6, 3, 8], &[2, 5, 3, 3]),
        (&[4, 3, 5, 2, 6], &[3, 2, 2, 2, 5]),
    ];
    for format in [Format::Zarr, Format::N5] {
        for (shape, chunks) in cases {
            let store = Arc::new(MemoryStore::new());
            let array = ArrayBuilder::new(shape.to_vec(), DataType::UInt32)
                .chunk_shape(chunks.to_vec())
                .compression(Compression::Gzip { level: 1 })
                .build(store, "/data", format, FileMode::Append)
                .unwrap();
            array.store_metadata().unwrap();
            let num_elements = shape.iter().product::<u64>();
            let values: Vec<u32> = (0..num_elements).map(|i| (i * 2_147_483_629 % 4_000_037) as u32).collect();
            let full = ArraySubset::new_with_shape(shape.to_vec());
            array.store_array_subset_elements::<u32>(&full, &values).unwrap();
            assert_eq!(
                array.retrieve_array_subset_elements::<u32>(&full).unwrap(),
                values,
                "roundtrip failed for {format} shape {shape:?} chunks {chunks:?}"
            );
        }
    }
}
