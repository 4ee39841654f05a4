//! In-memory object backend for unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};

use crate::storage::{ObjectBackend, ObjectEntry, StorageError, StorageResult};

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
}

/// Object backend over a sorted map that records every delete batch.
///
/// Writes get strictly increasing timestamps so listing order is
/// deterministic.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    delete_calls: Mutex<Vec<Vec<String>>>,
    fail_deletes: AtomicBool,
    fail_writes: AtomicBool,
    clock: AtomicI64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object with an explicit timestamp.
    pub fn insert(&self, key: &str, last_modified: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content_type: None,
                last_modified,
            },
        );
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .and_then(|object| object.content_type.clone())
    }

    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn tick(&self) -> DateTime<Utc> {
        let n = self.clock.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_opt(1_800_000_000 + n, 0).unwrap()
    }
}

impl ObjectBackend for MemoryBackend {
    async fn put_object(
        &self,
        key: &str,
        _body: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::operation("write refused"));
        }

        let last_modified = self.tick();
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.map(ToString::to_string),
                last_modified,
            },
        );
        Ok(())
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "https://signed.test/{key}?content-type={content_type}&expires={}",
            ttl.as_secs()
        ))
    }

    async fn list_objects(&self, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectEntry>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, object)| ObjectEntry {
                key: key.clone(),
                last_modified: Some(object.last_modified),
            })
            .collect())
    }

    async fn delete_objects(&self, keys: &[String]) -> StorageResult<()> {
        self.delete_calls.lock().unwrap().push(keys.to_vec());

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::operation("delete refused"));
        }

        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}
