//! crates/flower_timer_core/src/memory.rs
//!
//! An in-process `StorageBackend`. Used by tests and by hosts that do not
//! need anything to survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::ports::{PortError, PortResult, StorageBackend};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, as a full quota would.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Stores a blob verbatim, bypassing any serialization.
    pub fn put_raw(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn get_raw(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn entries(&self) -> PortResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Unexpected("memory storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn read(&self, key: &str) -> PortResult<Option<String>> {
        self.get_raw(key)
    }

    async fn write(&self, key: &str, value: &str) -> PortResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(PortError::Storage("quota exceeded".to_string()));
        }
        self.put_raw(key, value)
    }
}
