//! Integrity wrapper for cached rule sets.
//!
//! The active-rule cache is the only state shared across scoring requests,
//! so entries carry a SHA-256 checksum computed at insert time and verified
//! on every read. A corrupted entry is discarded and the rule set is
//! reloaded from the store.

use sha2::{Digest, Sha256};

/// A cached JSON payload plus its SHA-256 checksum (hex encoded).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    pub data: String,
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// True when the stored checksum still matches the payload.
    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    /// JSON form stored in the cache.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses a cache entry and returns the payload only if the checksum
    /// holds. `None` means the entry is corrupt and must be refetched.
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Rule cache entry failed checksum validation (expected {}, {} bytes)",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}
