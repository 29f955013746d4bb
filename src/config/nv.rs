//! Reading and writing the configuration string in non-volatile storage.

use super::{ConfigBuffer, MAX_CONFIG_LEN};
use crate::storage::{Error, KeyValueStore, items};

/// Read the stored configuration string.
///
/// Falls back to the default configuration when the item is missing, empty,
/// unreadable or does not fit the configuration buffer.
pub fn read_config<S: KeyValueStore + ?Sized>(store: &mut S) -> ConfigBuffer {
    let mut raw = [0u8; MAX_CONFIG_LEN];
    match store.read(items::DEVICE_CONFIG, &mut raw) {
        Ok(len) if len > 0 => match ConfigBuffer::from_bytes(&raw[..len]) {
            Ok(buffer) if !buffer.is_empty() => return buffer,
            _ => warn!("nv: stored config unusable, using default"),
        },
        Ok(_) => warn!("nv: stored config empty, using default"),
        Err(e) => warn!("nv: config read failed ({}), using default", e),
    }
    ConfigBuffer::default_config()
}

/// Store the configuration string.
///
/// # Errors
///
/// Whatever the store reports. The caller keeps running on the in-memory copy.
pub fn write_config<S: KeyValueStore + ?Sized>(
    store: &mut S,
    buffer: &ConfigBuffer,
) -> Result<(), Error> {
    store.write(items::DEVICE_CONFIG, buffer.as_bytes()).inspect_err(|e| {
        error!("nv: config write failed ({})", e);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_missing_config_uses_default() {
        let mut store: MemoryStore<4, MAX_CONFIG_LEN> = MemoryStore::new();
        assert_eq!(read_config(&mut store), ConfigBuffer::default_config());
    }

    #[test]
    fn test_empty_config_uses_default() {
        let mut store: MemoryStore<4, MAX_CONFIG_LEN> = MemoryStore::new();
        store.write(items::DEVICE_CONFIG, b"").unwrap();
        assert_eq!(read_config(&mut store), ConfigBuffer::default_config());
    }

    #[test]
    fn test_write_then_read() {
        let mut store: MemoryStore<4, MAX_CONFIG_LEN> = MemoryStore::new();
        let buffer = ConfigBuffer::from_bytes(b"Acme;ACME-1;RA0;").unwrap();
        write_config(&mut store, &buffer).unwrap();
        assert_eq!(read_config(&mut store), buffer);
    }

    #[test]
    fn test_stored_nul_truncates() {
        let mut store: MemoryStore<4, MAX_CONFIG_LEN> = MemoryStore::new();
        store.write(items::DEVICE_CONFIG, b"a;b;\0\0\0").unwrap();
        assert_eq!(read_config(&mut store).as_bytes(), b"a;b;");
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut store: MemoryStore<4, 8> = MemoryStore::new();
        let buffer = ConfigBuffer::from_bytes(b"Acme;ACME-1;").unwrap();
        assert_eq!(write_config(&mut store, &buffer), Err(Error::Full));
    }
}
