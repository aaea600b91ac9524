use std::fmt;

use crate::storage::{KeyValueStorage, StorageResult, is_storage_available};

pub const CACHE_KEY_PREFIX: &str = "qrCodeSVG_";

/// Storage key of the cached QR code for `index` (usually a ticket id).
pub fn cache_key(index: impl fmt::Display) -> String {
    format!("{CACHE_KEY_PREFIX}{index}")
}

/// Rendered QR-code markup cache over one storage facility.
///
/// Every operation probes the storage first and turns into a no-op when the
/// probe fails.
pub struct QrCodeCache<'a> {
    storage: &'a mut dyn KeyValueStorage,
}

impl<'a> QrCodeCache<'a> {
    pub fn new(storage: &'a mut dyn KeyValueStorage) -> Self {
        Self { storage }
    }

    pub fn is_available(&mut self) -> bool {
        is_storage_available(&mut *self.storage)
    }

    /// Stores `markup`; `Ok(false)` when the storage is unavailable.
    pub fn save(&mut self, index: impl fmt::Display, markup: &str) -> StorageResult<bool> {
        if !self.is_available() {
            return Ok(false);
        }
        self.storage.set_item(&cache_key(index), markup)?;
        Ok(true)
    }

    pub fn load(&mut self, index: impl fmt::Display) -> StorageResult<Option<String>> {
        if !self.is_available() {
            return Ok(None);
        }
        self.storage.get_item(&cache_key(index))
    }

    /// Clears the whole storage facility, not only QR entries.
    pub fn clear_all(&mut self) -> StorageResult<bool> {
        if !self.is_available() {
            return Ok(false);
        }
        self.storage.clear()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageError};

    #[test]
    fn cache_key_formats_index() {
        assert_eq!(cache_key(42), "qrCodeSVG_42");
        assert_eq!(cache_key("abc"), "qrCodeSVG_abc");
        assert_eq!(cache_key(7), cache_key(7));
        assert_ne!(cache_key(7), cache_key(70));
    }

    #[test]
    fn save_then_load_returns_markup() -> StorageResult<()> {
        let mut storage = MemoryStorage::new();
        let mut cache = QrCodeCache::new(&mut storage);
        assert!(cache.save(42, "<svg>A</svg>")?);
        assert_eq!(cache.load(42)?, Some("<svg>A</svg>".into()));
        assert_eq!(cache.load(43)?, None);
        Ok(())
    }

    #[test]
    fn unavailable_storage_turns_operations_into_no_ops() -> StorageResult<()> {
        let mut storage = MemoryStorage::disabled();
        let mut cache = QrCodeCache::new(&mut storage);
        assert!(!cache.is_available());
        assert!(!cache.save(1, "<svg/>")?);
        assert_eq!(cache.load(1)?, None);
        assert!(!cache.clear_all()?);
        Ok(())
    }

    #[test]
    fn clear_all_erases_foreign_entries_too() -> StorageResult<()> {
        let mut storage = MemoryStorage::new();
        storage.set_item("theme", "dark")?;
        {
            let mut cache = QrCodeCache::new(&mut storage);
            cache.save(1, "<svg>1</svg>")?;
            cache.save(2, "<svg>2</svg>")?;
            assert!(cache.clear_all()?);
        }
        assert!(storage.is_empty());
        Ok(())
    }

    #[test]
    fn write_failure_after_probe_is_reported() {
        let mut storage = MemoryStorage::with_quota(48);
        let mut cache = QrCodeCache::new(&mut storage);
        let result = cache.save(1, &"x".repeat(64));
        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
    }
}
