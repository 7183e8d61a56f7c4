use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::configuration::DEFAULT_CACHE_TTL_SECS;

/// Source of the current time for expiry checks.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = add_duration(*guard, by);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

fn add_duration(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A cached response with its absolute expiration time
pub struct CacheEntry<T> {
    pub data: T,
    pub expires_at: DateTime<Utc>,
}

/// A generic time-based cache with TTL support.
///
/// Entries are never purged: an expired entry is skipped on read and
/// overwritten by the next `set` for the same key.
pub struct TimedCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

/// Cache of parsed JSON bodies, shared by reference between callers.
pub type ResponseCache = TimedCache<Arc<Value>>;

impl<T: Clone + Send + Sync> TimedCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Two minutes against the system clock.
    pub fn with_default_ttl() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            Arc::new(SystemClock),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a value if present and its expiry is strictly in the future
    pub async fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > self.clock.now() {
                return Some(entry.data.clone());
            }
        }
        None
    }

    /// Store a value with the configured TTL, replacing any previous entry
    pub async fn set(&self, key: &str, value: T) {
        let expires_at = add_duration(self.clock.now(), self.ttl);
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                expires_at,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<T> Debug for TimedCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedCache")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Request signature used as the cache key: method, path and serialized
/// body joined verbatim. Equivalent bodies serialized differently produce
/// different keys.
pub fn cache_key(method: &str, path: &str, body: Option<&Value>) -> String {
    let body = match body {
        Some(value) => value.to_string(),
        None => String::from("null"),
    };
    format!("{}-{}-{}", method, path, body)
}
