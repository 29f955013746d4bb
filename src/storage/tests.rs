use super::error::Error;
use super::records::{self, BasicClusterRecord, VersionRecord};
use super::*;

const MOCK_ITEM_SIZE: usize = 64;

type MockStore = MemoryStore<8, MOCK_ITEM_SIZE>;

#[test]
fn test_read_write_clear() {
    let mut store = MockStore::new();
    let data = [0xDE, 0xAD, 0xBE, 0xEF];

    store.write(7, &data).unwrap();

    let mut buf = [0; 8];
    let len = store.read(7, &mut buf).unwrap();
    assert_eq!(&buf[..len], &data);

    store.clear_all().unwrap();
    assert_eq!(store.read(7, &mut buf), Err(Error::NotFound));
    assert!(store.is_empty());
}

#[test]
fn test_overwrite_replaces_item() {
    let mut store = MockStore::new();
    store.write(2, b"first;value;").unwrap();
    store.write(2, b"x;y;").unwrap();

    let mut buf = [0; MOCK_ITEM_SIZE];
    let len = store.read(2, &mut buf).unwrap();
    assert_eq!(&buf[..len], b"x;y;");
    assert_eq!(store.len(), 1);
}

#[test]
fn test_size_limits() {
    let mut store = MockStore::new();
    let oversized = [0u8; MOCK_ITEM_SIZE + 1];
    assert_eq!(store.write(1, &oversized), Err(Error::Full));

    store.write(1, &[1, 2, 3, 4]).unwrap();
    let mut small = [0u8; 2];
    assert_eq!(store.read(1, &mut small), Err(Error::SizeMismatch));
}

#[test]
fn test_key_capacity() {
    let mut store = MemoryStore::<2, 4>::new();
    store.write(1, &[1]).unwrap();
    store.write(2, &[2]).unwrap();
    assert_eq!(store.write(3, &[3]), Err(Error::Full));
    // Replacing an existing key still works when the map is full.
    store.write(2, &[9]).unwrap();
}

#[test]
fn test_record_roundtrip() {
    let mut store = MockStore::new();
    let record = BasicClusterRecord {
        network_led_on: false,
    };
    records::store(&mut store, items::BASIC_CLUSTER_DATA, &record).unwrap();

    let loaded: BasicClusterRecord = records::load(&mut store, items::BASIC_CLUSTER_DATA).unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn test_record_detects_corruption() {
    let mut store = MockStore::new();
    records::store(&mut store, items::VERSION, &VersionRecord { version: 3 }).unwrap();

    let mut buf = [0u8; MOCK_ITEM_SIZE];
    let len = store.read(items::VERSION, &mut buf).unwrap();
    buf[1] ^= 0x20;
    store.write(items::VERSION, &buf[..len]).unwrap();

    let loaded: Result<VersionRecord, _> = records::load(&mut store, items::VERSION);
    assert_eq!(loaded, Err(Error::Corrupted));
}

#[test]
fn test_record_rejects_short_item() {
    let mut store = MockStore::new();
    store.write(items::VERSION, &[1, 2]).unwrap();
    let loaded: Result<VersionRecord, _> = records::load(&mut store, items::VERSION);
    assert_eq!(loaded, Err(Error::Corrupted));
}

#[test]
fn test_missing_record() {
    let mut store = MockStore::new();
    let loaded: Result<VersionRecord, _> = records::load(&mut store, items::VERSION);
    assert_eq!(loaded, Err(Error::NotFound));
}

#[test]
fn test_item_keys() {
    assert_eq!(items::switch_cluster_data(0), 4);
    assert_eq!(items::switch_cluster_data(4), 8);
    assert_eq!(items::relay_cluster_data(0), 9);
    assert_eq!(items::relay_cluster_data(4), 13);
    assert!(items::relay_cluster_data(4) < items::DEVICE_TYPE);
}
