//! Key-value record store contract.
//!
//! The thinnest possible persistence interface: named keys holding JSON
//! values. Multi-key writes are not guaranteed to be atomic and callers must
//! not rely on it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Result;

/// Async get/set/remove over named JSON records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the given keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>>;

    /// Write every entry of the map.
    async fn set(&self, entries: HashMap<String, Value>) -> Result<()>;

    /// Delete a key. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}

#[cfg(test)]
pub mod memory {
    //! In-memory store for tests, with write-failure injection.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::RecordStore;
    use crate::domain::{AppError, Result};

    #[derive(Default)]
    pub struct MemoryRecordStore {
        records: Mutex<HashMap<String, Value>>,
        fail_writes: AtomicBool,
        fail_key: Mutex<Option<String>>,
    }

    impl MemoryRecordStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every later `set`/`remove` fail like a full quota.
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Make later writes that touch `key` fail, leaving other keys writable.
        pub fn fail_writes_to(&self, key: Option<&str>) {
            *self.fail_key.lock().unwrap() = key.map(String::from);
        }

        pub fn raw(&self, key: &str) -> Option<Value> {
            self.records.lock().unwrap().get(key).cloned()
        }

        pub fn insert_raw(&self, key: &str, value: Value) {
            self.records.lock().unwrap().insert(key.to_string(), value);
        }

        fn check_writable<'a>(&self, mut keys: impl Iterator<Item = &'a str>) -> Result<()> {
            let fail_key = self.fail_key.lock().unwrap().clone();
            let blocked = fail_key.is_some_and(|k| keys.any(|key| key == k));
            if blocked || self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Storage {
                    message: "QUOTA_BYTES quota exceeded".into(),
                    source: None,
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RecordStore for MemoryRecordStore {
        async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
            let records = self.records.lock().unwrap();
            Ok(keys
                .iter()
                .filter_map(|k| records.get(*k).map(|v| ((*k).to_string(), v.clone())))
                .collect())
        }

        async fn set(&self, entries: HashMap<String, Value>) -> Result<()> {
            self.check_writable(entries.keys().map(String::as_str))?;
            self.records.lock().unwrap().extend(entries);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.check_writable(std::iter::once(key))?;
            self.records.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
