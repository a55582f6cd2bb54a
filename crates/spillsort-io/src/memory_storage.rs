//! In-memory byte storage for testing.
//!
//! HashMap-backed `Storage` so `SpillCache` can be exercised end to end
//! (serialization, codec, checksums) without touching the filesystem.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use spillsort_mem::error::{Error as MemError, Result as MemResult};
use spillsort_mem::Storage;

/// Thread-safe in-memory storage using a HashMap.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MemResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|_| MemError::Storage("memory storage lock poisoned".into()))
    }

    /// Check if a path exists
    pub fn contains(&self, path: &str) -> MemResult<bool> {
        Ok(self.data()?.contains_key(path))
    }

    /// Number of stored objects
    pub fn len(&self) -> MemResult<usize> {
        Ok(self.data()?.len())
    }

    pub fn is_empty(&self) -> MemResult<bool> {
        Ok(self.data()?.is_empty())
    }
}

impl Storage for MemoryStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        self.data()?.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> MemResult<Vec<u8>> {
        let data = self.data()?;
        let bytes = data
            .get(path)
            .ok_or_else(|| MemError::Storage(format!("path not found: {}", path)))?;

        let start = offset as usize;
        if start > bytes.len() {
            return Err(MemError::Storage(format!(
                "offset {} exceeds size {}",
                offset,
                bytes.len()
            )));
        }
        let end = start.saturating_add(len).min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }

    fn delete(&self, path: &str) -> MemResult<()> {
        self.data()?.remove(path);
        Ok(())
    }

    fn list(&self, prefix: &str) -> MemResult<Vec<String>> {
        let mut result: Vec<String> = self
            .data()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        result.sort();
        Ok(result)
    }

    fn size(&self, path: &str) -> MemResult<u64> {
        let data = self.data()?;
        let bytes = data
            .get(path)
            .ok_or_else(|| MemError::Storage(format!("path not found: {}", path)))?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_read_range() {
        let storage = MemoryStorage::new();
        storage.write("test/file.seg", b"hello world").unwrap();

        assert_eq!(storage.read_range("test/file.seg", 6, 5).unwrap(), b"world");
        assert_eq!(storage.read_range("test/file.seg", 0, 64).unwrap(), b"hello world");
        assert!(storage.read_range("test/file.seg", 64, 1).is_err());
        assert_eq!(storage.size("test/file.seg").unwrap(), 11);
    }

    #[test]
    fn test_memory_storage_delete_and_list() {
        let storage = MemoryStorage::new();
        storage.write("dir/file1.seg", b"1").unwrap();
        storage.write("dir/file2.seg", b"2").unwrap();
        storage.write("other/file3.seg", b"3").unwrap();

        assert_eq!(
            storage.list("dir/").unwrap(),
            vec!["dir/file1.seg".to_string(), "dir/file2.seg".to_string()]
        );

        storage.delete("dir/file1.seg").unwrap();
        storage.delete("dir/file1.seg").unwrap();
        assert!(!storage.contains("dir/file1.seg").unwrap());
        assert_eq!(storage.len().unwrap(), 2);
    }
}
