use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Key written and removed by the availability probe.
pub const STORAGE_PROBE_KEY: &str = "__storage_test__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Local,
    Session,
}

impl StorageKind {
    pub fn window_property(self) -> &'static str {
        match self {
            Self::Local => "localStorage",
            Self::Session => "sessionStorage",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.window_property())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    QuotaExceeded { key: String, needed: usize, quota: usize },
    SecurityError(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded { key, needed, quota } => write!(
                f,
                "quota exceeded writing {key}: needs {needed} bytes, quota {quota}"
            ),
            Self::SecurityError(msg) => write!(f, "storage access denied: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Synchronous per-origin key-value store with the Web Storage surface.
pub trait KeyValueStorage {
    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()>;
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn remove_item(&mut self, key: &str) -> StorageResult<()>;
    fn clear(&mut self) -> StorageResult<()>;
    fn len(&self) -> usize;
    fn keys(&self) -> Vec<String>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Probes `storage` by writing then removing [`STORAGE_PROBE_KEY`].
///
/// Any failure means unavailable; the error itself is swallowed.
pub fn is_storage_available(storage: &mut dyn KeyValueStorage) -> bool {
    storage
        .set_item(STORAGE_PROBE_KEY, STORAGE_PROBE_KEY)
        .and_then(|()| storage.remove_item(STORAGE_PROBE_KEY))
        .is_ok()
}

/// In-memory storage. Sizes count key and value bytes, as browsers budget
/// both against the quota.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Vec<(String, String)>,
    quota_bytes: Option<usize>,
    disabled: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Storage that rejects every access, like private browsing modes that
    /// expose the object but deny its use.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn set_quota(&mut self, quota_bytes: Option<usize>) {
        self.quota_bytes = quota_bytes;
    }

    pub fn used_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }

    fn check_enabled(&self) -> StorageResult<()> {
        if self.disabled {
            return Err(StorageError::SecurityError(
                "storage is disabled for this document".into(),
            ));
        }
        Ok(())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.check_enabled()?;
        let existing = self.entries.iter().position(|(k, _)| k == key);

        if let Some(quota) = self.quota_bytes {
            let replaced = existing
                .map(|pos| self.entries[pos].0.len() + self.entries[pos].1.len())
                .unwrap_or(0);
            let needed = self.used_bytes() - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        match existing {
            Some(pos) => self.entries[pos].1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.check_enabled()?;
        Ok(self
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.clone()))
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.check_enabled()?;
        self.entries.retain(|(k, _)| k != key);
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.check_enabled()?;
        self.entries.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }
}

/// Handle to one storage area shared by several pages of the same origin.
/// Writes from any page are visible to all of them; the last write wins.
#[derive(Debug, Default, Clone)]
pub struct SharedStorage {
    inner: Rc<RefCell<MemoryStorage>>,
}

impl SharedStorage {
    pub fn new(storage: MemoryStorage) -> Self {
        Self {
            inner: Rc::new(RefCell::new(storage)),
        }
    }

    pub fn with_inner<R>(&self, f: impl FnOnce(&mut MemoryStorage) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }
}

impl KeyValueStorage for SharedStorage {
    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.inner.borrow_mut().set_item(key, value)
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.borrow().get_item(key)
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.inner.borrow_mut().remove_item(key)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.inner.borrow_mut().clear()
    }

    fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    fn keys(&self) -> Vec<String> {
        self.inner.borrow().keys()
    }
}
