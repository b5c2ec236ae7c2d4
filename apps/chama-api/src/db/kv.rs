use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::ApiError;

/// Abstraction over a key-value store used for session tokens.
///
/// The service ships with an in-memory map; a networked store can be slotted
/// in behind the same trait.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError>;
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    async fn del(&self, key: &str) -> Result<(), ApiError>;
    /// Remove and return a live value in one step.
    async fn take(&self, key: &str) -> Result<Option<String>, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        let mut data = self.lock();
        // Opportunistic sweep so abandoned sessions don't pile up.
        let now = Instant::now();
        data.retain(|_, e| e.expires_at > now);
        data.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let mut data = self.lock();
        match data.get(key) {
            Some(e) if e.expires_at > Instant::now() => Ok(Some(e.value.clone())),
            Some(_) => {
                data.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<(), ApiError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, ApiError> {
        Ok(self
            .lock()
            .remove(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value))
    }
}
