use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::capture::reconstruct::line_count;
use crate::utils::{hex, CONTENT_HASH_BYTES};

/// Work-tree content recorded when a file's marks were last reconciled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    /// Full file content at this point
    pub content: String,
    /// SHA-256 hash of content for quick comparison
    pub content_hash: String,
    /// When this snapshot was taken
    pub timestamp: String,
    /// Line count at this snapshot
    pub line_count: usize,
}

impl ContentSnapshot {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            content_hash: compute_hash(content.as_bytes()),
            timestamp: Utc::now().to_rfc3339(),
            line_count: line_count(content.as_bytes()),
        }
    }

    /// Snapshot raw bytes; binary content cannot be diffed and yields `None`
    pub fn from_bytes(content: &[u8]) -> Option<Self> {
        std::str::from_utf8(content).ok().map(Self::new)
    }

    /// Whether `content` is what this snapshot recorded
    pub fn matches(&self, content: &[u8]) -> bool {
        self.content_hash == compute_hash(content)
    }
}

/// Compute a short SHA-256 hash of content
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    hex::encode(&result[..CONTENT_HASH_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_hash_and_lines() {
        let snapshot = ContentSnapshot::new("a\nb\n");
        assert_eq!(snapshot.line_count, 3);
        assert_eq!(snapshot.content_hash.len(), CONTENT_HASH_BYTES * 2);
        assert!(snapshot.matches(b"a\nb\n"));
        assert!(!snapshot.matches(b"a\nb"));
    }

    #[test]
    fn test_binary_content_not_snapshotted() {
        assert!(ContentSnapshot::from_bytes(b"\xff\x00").is_none());
        assert!(ContentSnapshot::from_bytes(b"text").is_some());
    }
}
