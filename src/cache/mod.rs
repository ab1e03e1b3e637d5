// Namespaced cache front for the expensive vector/LLM calls
// Every operation returns a definite outcome; a broken backing store is a
// first-class branch, never an error the caller has to handle


use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::CacheSettings;

/// Cache keyspace partitions, each with its own TTL default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Embedding,
    Answer,
    Token,
}

impl Namespace {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Embedding => "embed",
            Namespace::Answer => "answer",
            Namespace::Token => "token",
        }
    }
}

/// Outcome of a cache read. `Failed` carries the reason for observability but
/// callers treat it exactly like a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(String),
    Miss,
    Failed(String),
}

impl CacheLookup {
    #[inline]
    pub fn value(&self) -> Option<&str> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss | CacheLookup::Failed(_) => None,
        }
    }
}

/// Backing store seam. The default is the in-process `MemoryBackend`; a
/// networked store plugs in here without touching the layer's contract.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
    async fn ping(&self) -> anyhow::Result<()>;
}

/// Single shared in-memory backend with lazy TTL expiry.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryBackend {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Option<Instant>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((_, Some(expires_at))) if *expires_at <= Instant::now() => {
                // Expired entries are indistinguishable from misses.
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = Instant::now().checked_add(ttl);
        self.lock()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Namespaced cache layer with a feature flag and graceful degradation.
pub struct CacheLayer {
    backend: Arc<dyn CacheBackend>,
    settings: CacheSettings,
    failures: AtomicU64,
}

impl CacheLayer {
    #[inline]
    pub fn new(backend: Arc<dyn CacheBackend>, settings: CacheSettings) -> Self {
        Self {
            backend,
            settings,
            failures: AtomicU64::new(0),
        }
    }

    /// Deterministic key derivation: `namespace:hex(sha256(parts))`. Stable
    /// across process restarts so identical queries hit the same entry.
    #[inline]
    pub fn key(namespace: Namespace, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update([0x1f]);
            }
            hasher.update(part.as_bytes());
        }

        let digest = hasher.finalize();
        let mut key = String::with_capacity(namespace.as_str().len() + 1 + digest.len() * 2);
        key.push_str(namespace.as_str());
        key.push(':');
        for byte in digest {
            let _ = write!(key, "{:02x}", byte);
        }
        key
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Read an entry. Never errors: a backing-store failure is reported as
    /// `Failed` and counted, and the flag is checked before any I/O.
    #[inline]
    pub async fn get(&self, key: &str) -> CacheLookup {
        if !self.settings.enabled {
            return CacheLookup::Miss;
        }

        match self.backend.get(key).await {
            Ok(Some(value)) => {
                debug!("Cache hit for {}", key);
                CacheLookup::Hit(value)
            }
            Ok(None) => {
                debug!("Cache miss for {}", key);
                CacheLookup::Miss
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Cache read failed for {}: {}", key, e);
                CacheLookup::Failed(e.to_string())
            }
        }
    }

    /// Write an entry. Returns `false` instead of erroring when the flag is
    /// off, the effective TTL disables caching, or the backend fails.
    #[inline]
    pub async fn set(
        &self,
        namespace: Namespace,
        key: &str,
        value: &str,
        ttl_override: Option<i64>,
    ) -> bool {
        if !self.settings.enabled {
            return false;
        }

        let ttl_secs = ttl_override.unwrap_or_else(|| self.default_ttl(namespace));
        if ttl_secs <= 0 {
            debug!("Skipping cache write for {} (ttl {})", key, ttl_secs);
            return false;
        }

        match self
            .backend
            .set(key, value, Duration::from_secs(ttl_secs.unsigned_abs()))
            .await
        {
            Ok(()) => {
                debug!("Cached {} for {}s", key, ttl_secs);
                true
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Cache write failed for {}: {}", key, e);
                false
            }
        }
    }

    #[inline]
    pub fn default_ttl(&self, namespace: Namespace) -> i64 {
        match namespace {
            Namespace::Embedding => self.settings.embedding_ttl_secs,
            Namespace::Answer => self.settings.answer_ttl_secs,
            Namespace::Token => self.settings.token_ttl_secs,
        }
    }

    /// Connectivity summary for the health endpoint; a ping, never a scan.
    #[inline]
    pub async fn status(&self) -> &'static str {
        if !self.settings.enabled {
            return "disabled";
        }
        match self.backend.ping().await {
            Ok(()) => "connected",
            Err(_) => "unavailable",
        }
    }

    /// Number of backend failures swallowed so far.
    #[inline]
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
