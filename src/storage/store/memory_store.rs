//! An in-memory store.

use parking_lot::RwLock;

use crate::storage::{
    ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey, StoreKeys,
    StoreKeysPrefixes, StorePrefix, WritableStorageTraits,
};

use std::collections::{BTreeMap, BTreeSet};

/// An in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: RwLock<BTreeMap<StoreKey, RwLock<Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new, empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.read();
        if let Some(data) = data_map.get(key) {
            Ok(Some(data.read().clone()))
        } else {
            Ok(None)
        }
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map.get(key).map(|data| data.read().len() as u64))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        let mut data_map = self.data_map.write();
        data_map.insert(key.clone(), RwLock::new(value.to_vec()));
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let mut data_map = self.data_map.write();
        data_map.remove(key);
        Ok(())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let mut data_map = self.data_map.write();
        data_map.retain(|key, _| !key.has_prefix(prefix));
        Ok(())
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map.keys().cloned().collect())
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let data_map = self.data_map.read();
        Ok(data_map
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let data_map = self.data_map.read();
        let mut keys = vec![];
        let mut prefixes = BTreeSet::new();
        for key in data_map.keys().filter(|key| key.has_prefix(prefix)) {
            let remainder = &key.as_str()[prefix.as_str().len()..];
            if let Some((child, _)) = remainder.split_once('/') {
                prefixes.insert(StorePrefix::new(
                    prefix.as_str().to_string() + child + "/",
                )?);
            } else {
                keys.push(key.clone());
            }
        }
        Ok(StoreKeysPrefixes::new(keys, prefixes.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_set_get_list() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/b")?;
        assert!(store.get(&key)?.is_none());
        store.set(&key, &[0, 1, 2])?;
        assert_eq!(store.get(&key)?, Some(vec![0, 1, 2]));
        store.set(&StoreKey::new("a/c/d")?, &[4])?;
        store.set(&StoreKey::new("e")?, &[5])?;

        let children = store.list_dir(&StorePrefix::new("a/")?)?;
        assert_eq!(children.keys(), &[StoreKey::new("a/b")?]);
        assert_eq!(children.prefixes(), &[StorePrefix::new("a/c/")?]);

        let root = store.list_dir(&StorePrefix::root())?;
        assert_eq!(root.keys(), &[StoreKey::new("e")?]);
        assert_eq!(root.prefixes(), &[StorePrefix::new("a/")?]);

        store.erase_prefix(&StorePrefix::new("a/")?)?;
        assert_eq!(store.list()?, &[StoreKey::new("e")?]);
        Ok(())
    }
}
