//! On-disk byte layout checks against the format specifications.

use std::io::Read;
use std::sync::Arc;

use z5::array::{ArrayBuilder, Compression, DataType};
use z5::file::{FileMode, Format};
use z5::storage::store::MemoryStore;
use z5::storage::{ReadableStorageTraits, StoreKey};

fn known_pattern() -> Vec<u8> {
    (0..64).collect()
}

#[test]
fn zarr_raw_chunk_bytes_are_little_endian() {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![8], DataType::UInt16)
        .chunk_shape(vec![4])
        .compression(Compression::Raw)
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array
        .store_chunk_elements::<u16>(&[0], &[0x0102, 0x0304, 0x0506, 0x0708])
        .unwrap();

    let value = store.get(&StoreKey::new("data/0").unwrap()).unwrap().unwrap();
    assert_eq!(
        value,
        vec![0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07]
    );
}

#[test]
fn zarr_edge_chunk_is_fill_padded_to_full_shape() {
    // shape (6,), chunks (4,): the border chunk file still holds 4 elements
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![6], DataType::UInt8)
        .chunk_shape(vec![4])
        .compression(Compression::Raw)
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array.store_chunk_elements::<u8>(&[1], &[5, 6]).unwrap();

    let value = store.get(&StoreKey::new("data/1").unwrap()).unwrap().unwrap();
    assert_eq!(value, vec![5, 6, 0, 0]);

    // the padding is ignored on read
    assert_eq!(
        array.retrieve_chunk_elements::<u8>(&[1]).unwrap(),
        vec![5, 6]
    );
}

#[test]
fn zarr_zlib_chunk_decodes_with_a_zlib_wrapper() {
    // a known 64-byte pattern in chunk (0, 0) with the zlib compressor, level 5
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![8, 8], DataType::UInt8)
        .chunk_shape(vec![8, 8])
        .compression(Compression::Zlib { level: 5 })
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array
        .store_chunk_elements::<u8>(&[0, 0], &known_pattern())
        .unwrap();

    let value = store
        .get(&StoreKey::new("data/0.0").unwrap())
        .unwrap()
        .unwrap();
    // zlib stream header (deflate, 32K window)
    assert_eq!(value[0], 0x78);
    // an independent zlib decode of the stored bytes recovers the pattern
    let mut decoder = flate2::bufread::ZlibDecoder::new(value.as_slice());
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, known_pattern());
}

#[test]
fn zarr_gzip_chunk_uses_a_gzip_wrapper() {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![64], DataType::UInt8)
        .chunk_shape(vec![64])
        .compression(Compression::Gzip { level: 5 })
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array
        .store_chunk_elements::<u8>(&[0], &known_pattern())
        .unwrap();

    let value = store.get(&StoreKey::new("data/0").unwrap()).unwrap().unwrap();
    // gzip magic, not a zlib header
    assert_eq!(&value[..2], &[0x1f, 0x8b]);
    let mut decoder = flate2::bufread::GzDecoder::new(value.as_slice());
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, known_pattern());
}

#[test]
fn n5_gzip_chunk_header_and_payload() {
    // the same pattern in N5 + gzip: a big-endian binary header, then a gzip payload
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![8, 8], DataType::UInt8)
        .chunk_shape(vec![8, 8])
        .compression(Compression::Gzip { level: 5 })
        .build(store.clone(), "/data", Format::N5, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array
        .store_chunk_elements::<u8>(&[0, 0], &known_pattern())
        .unwrap();

    let value = store
        .get(&StoreKey::new("data/0/0").unwrap())
        .unwrap()
        .unwrap();
    // u16 mode = 0, u16 nDim = 2, u32 blockSize = [8, 8]
    assert_eq!(&value[..12], &[0, 0, 0, 2, 0, 0, 0, 8, 0, 0, 0, 8]);
    let mut decoder = flate2::bufread::GzDecoder::new(&value[12..]);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, known_pattern());
}

#[test]
fn n5_multibyte_payload_is_big_endian_after_decode() {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![4], DataType::UInt32)
        .chunk_shape(vec![4])
        .compression(Compression::Gzip { level: 5 })
        .build(store.clone(), "/data", Format::N5, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();
    array
        .store_chunk_elements::<u32>(&[0], &[0x0102_0304, 0x0506_0708, 1, 2])
        .unwrap();

    let value = store.get(&StoreKey::new("data/0").unwrap()).unwrap().unwrap();
    assert_eq!(&value[..8], &[0, 0, 0, 1, 0, 0, 0, 4]);
    let mut decoder = flate2::bufread::GzDecoder::new(&value[8..]);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).unwrap();
    #[rustfmt::skip]
    assert_eq!(
        decoded,
        vec![
            0x01, 0x02, 0x03, 0x04,
            0x05, 0x06, 0x07, 0x08,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x02,
        ]
    );
}

#[test]
fn zarr_metadata_document_shape() {
    let store = Arc::new(MemoryStore::new());
    let array = ArrayBuilder::new(vec![100, 100], DataType::Int32)
        .chunk_shape(vec![10, 10])
        .compression(Compression::Zlib { level: 5 })
        .build(store.clone(), "/data", Format::Zarr, FileMode::Append)
        .unwrap();
    array.store_metadata().unwrap();

    let bytes = store
        .get(&StoreKey::new("data/.zarray").unwrap())
        .unwrap()
        .unwrap();
    let document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(document["zarr_format"], 2);
    assert_eq!(document["shape"], serde_json::json!([100, 100]));
    assert_eq!(document["chunks"], serde_json::json!([10, 10]));
    assert_eq!(document["dtype"], "<i4");
    assert_eq!(
        document["compressor"],
        serde_json::json!({"id": "zlib", "level": 5})
    );
    assert_eq!(document["fill_value"], 0);
    assert_eq!(document["order"], "C");
    assert_eq!(document["filters"], serde_json::Value::Null);
    assert!(document.get("dimension_separator").is_none());
}
