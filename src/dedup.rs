//! Content-addressed screenshot deduplication for one batch run.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

/// Deterministic SHA-256 hex digest of raw bytes. No normalization is applied.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hash-to-first-URL map with insert-if-absent semantics.
#[derive(Debug, Default)]
pub struct DedupIndex {
    first_seen: Mutex<HashMap<String, String>>,
}

impl DedupIndex {
    /// Records `url` under `hash` unless the hash is already known.
    ///
    /// Returns the URL that first produced the hash when it was already present.
    pub fn insert_if_absent(&self, hash: &str, url: &str) -> Option<String> {
        let mut map = match self.first_seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match map.get(hash) {
            Some(first) => Some(first.clone()),
            None => {
                map.insert(hash.to_string(), url.to_string());
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.first_seen.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of one dedup lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupResult {
    pub hash: String,
    /// Set when an earlier capture in the run had the same hash.
    pub first_seen_url: Option<String>,
}

impl DedupResult {
    pub fn is_duplicate(&self) -> bool {
        self.first_seen_url.is_some()
    }
}

/// Hashes screenshots and remembers them for the lifetime of one run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    index: DedupIndex,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, bytes: &[u8], url: &str) -> DedupResult {
        let hash = content_hash(bytes);
        let first_seen_url = self.index.insert_if_absent(&hash, url);
        if let Some(first) = &first_seen_url {
            log::debug!("Screenshot of {url} duplicates {first} ({hash})");
        }
        DedupResult {
            hash,
            first_seen_url,
        }
    }

    pub fn unique_count(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_content_hash_is_fixed_length_hex() {
        let hash = content_hash(b"png bytes");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, content_hash(b"png bytes"));
    }

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_second_lookup_reports_first_seen_url() {
        let dedup = Deduplicator::new();
        let first = dedup.check(b"same", "https://a.example/");
        let second = dedup.check(b"same", "https://b.example/");
        assert!(!first.is_duplicate());
        assert_eq!(first.hash, second.hash);
        assert_eq!(second.first_seen_url.as_deref(), Some("https://a.example/"));
        assert_eq!(dedup.unique_count(), 1);
    }

    #[test]
    fn test_different_bytes_are_not_duplicates() {
        let dedup = Deduplicator::new();
        dedup.check(b"one", "https://a.example/");
        assert!(!dedup.check(b"two", "https://b.example/").is_duplicate());
        assert_eq!(dedup.unique_count(), 2);
    }

    #[test]
    fn test_concurrent_inserts_keep_exactly_one_first_seen() {
        let dedup = Arc::new(Deduplicator::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let dedup = Arc::clone(&dedup);
                std::thread::spawn(move || dedup.check(b"shared", &format!("https://{i}.example/")))
            })
            .collect();
        let results: Vec<DedupResult> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| !r.is_duplicate()).count(), 1);
    }
}
