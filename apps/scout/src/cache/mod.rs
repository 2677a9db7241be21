//! Response Cache: file-backed, TTL-bound memoization for expensive external calls.
//!
//! Best-effort contract: `set` never fails from the caller's point of view and
//! `get` treats anything unreadable or expired as absent. Callers must behave
//! correctly with a cache that never hits.
//!
//! Entries are never evicted. A stale entry is simply ignored and overwritten
//! on the next `set` for the same key.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Default entry lifetime: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Separator placed between key parts so ("ab", "c") and ("a", "bc") differ.
const PART_SEPARATOR: char = '\u{1f}';

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    stored_at: DateTime<Utc>,
    value: Value,
    /// First characters of the logical key, for humans inspecting the directory.
    key_hint: String,
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Cache directory {} unavailable: {e}", dir.display());
        }
        Self { dir, ttl }
    }

    /// Returns the cached value, or `None` when missing, unreadable or expired.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now()).await
    }

    /// Like `get`, decoded into `T`. A value of the wrong shape reads as absent.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!("Ignoring cache entry with unexpected shape: {e}");
                None
            }
        }
    }

    async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let path = self.entry_path(key);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let envelope: CacheEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Unreadable cache entry {}: {e}", path.display());
                return None;
            }
        };

        // Entries stamped in the future (clock skew) count as fresh.
        let age = now
            .signed_duration_since(envelope.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if age > self.ttl {
            debug!("Cache entry expired ({}s old)", age.as_secs());
            return None;
        }
        Some(envelope.value)
    }

    /// Stores `value` under `key`, replacing any previous entry and resetting its age.
    /// Failures are logged and swallowed.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let envelope = match serde_json::to_value(value) {
            Ok(value) => CacheEnvelope {
                stored_at: Utc::now(),
                value,
                key_hint: key.chars().take(100).collect(),
            },
            Err(e) => {
                warn!("Cache value not serializable, skipping write: {e}");
                return;
            }
        };

        let dir = self.dir.clone();
        let path = self.entry_path(key);
        let written =
            tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &envelope)).await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Cache write failed: {e}"),
            Err(e) => warn!("Cache write task failed: {e}"),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sha256_hex(key)))
    }
}

/// Writes to a temp file in the cache directory, then renames it over the entry,
/// so concurrent writers and readers never observe a partial file.
fn write_atomically(dir: &Path, path: &Path, envelope: &CacheEnvelope) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, envelope)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Derives a cache key from a namespace and the request's semantic inputs.
///
/// Each part is trimmed and has internal whitespace collapsed, so requests that
/// differ only in spacing share an entry.
pub fn cache_key(namespace: &str, parts: &[&str]) -> String {
    let mut normalized = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            normalized.push(PART_SEPARATOR);
        }
        normalized.push_str(&part.split_whitespace().collect::<Vec<_>>().join(" "));
    }
    format!("{namespace}:{}", sha256_hex(&normalized))
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache_in(dir: &tempfile::TempDir) -> ResponseCache {
        ResponseCache::new(dir.path(), DEFAULT_TTL)
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        let value = json!({"score": 72, "strengths": ["Rust", "ISO 26262"]});

        cache.set("match:abc", &value).await;
        assert_eq!(cache.get("match:abc").await, Some(value));
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cache_in(&dir).get("nope").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_but_still_stored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.set("k", &json!([1, 2, 3])).await;

        let later = Utc::now() + chrono::Duration::hours(25);
        assert_eq!(cache.get_at("k", later).await, None);
        assert!(cache.entry_path("k").exists());

        let soon = Utc::now() + chrono::Duration::hours(23);
        assert_eq!(cache.get_at("k", soon).await, Some(json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn test_set_overwrites_and_resets_age() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.set("k", &json!("old")).await;
        cache.set("k", &json!("new")).await;
        assert_eq!(cache.get("k").await, Some(json!("new")));
    }

    #[tokio::test]
    async fn test_entries_survive_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        cache_in(&dir).set("k", &json!({"a": 1})).await;
        assert_eq!(cache_in(&dir).get("k").await, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_corrupt_entry_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        std::fs::write(cache.entry_path("k"), b"{not json").unwrap();
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_get_as_rejects_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.set("k", &json!("just a string")).await;
        assert_eq!(cache.get_as::<Vec<u32>>("k").await, None);
    }

    #[tokio::test]
    async fn test_unwritable_cache_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        // The cache "directory" is a regular file, so every write fails.
        let cache = ResponseCache::new(&blocker, DEFAULT_TTL);
        cache.set("k", &json!(1)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[test]
    fn test_cache_key_ignores_whitespace_noise() {
        assert_eq!(
            cache_key("match", &["  Senior  Engineer\n", "ISO 26262"]),
            cache_key("match", &["Senior Engineer", "ISO   26262 "])
        );
    }

    #[test]
    fn test_cache_key_separates_parts_and_namespaces() {
        assert_ne!(cache_key("match", &["ab", "c"]), cache_key("match", &["a", "bc"]));
        assert_ne!(cache_key("match", &["x"]), cache_key("profile", &["x"]));
    }
}
