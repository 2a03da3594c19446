//! Cache statistics

use serde::{Deserialize, Serialize};

/// Snapshot of the cache store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of keys with at least one span
    pub entries: usize,

    /// Number of span files
    pub spans: usize,

    /// Bytes resident on disk
    pub total_bytes: u64,

    /// Configured ceiling
    pub max_bytes: u64,

    /// Keys currently held by a writer
    pub locked_keys: usize,
}

impl CacheStats {
    /// Usage as a percentage of the ceiling.
    pub fn usage_percentage(&self) -> f64 {
        if self.max_bytes == 0 {
            return 0.0;
        }

        (self.total_bytes as f64 / self.max_bytes as f64) * 100.0
    }

    /// Returns true if the cache is near capacity (>90%).
    pub fn is_near_capacity(&self) -> bool {
        self.usage_percentage() > 90.0
    }

    /// Bytes that would have to be evicted to fit `incoming` more bytes.
    pub fn space_needed(&self, incoming: u64) -> u64 {
        (self.total_bytes + incoming).saturating_sub(self.max_bytes)
    }

    pub fn average_entry_size(&self) -> u64 {
        if self.entries == 0 {
            0
        } else {
            self.total_bytes / self.entries as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total_bytes: u64, max_bytes: u64) -> CacheStats {
        CacheStats {
            entries: 4,
            spans: 6,
            total_bytes,
            max_bytes,
            locked_keys: 0,
        }
    }

    #[test]
    fn test_usage_percentage() {
        assert_eq!(stats(50, 100).usage_percentage(), 50.0);
        assert_eq!(stats(50, 0).usage_percentage(), 0.0);
        assert!(stats(95, 100).is_near_capacity());
        assert!(!stats(80, 100).is_near_capacity());
    }

    #[test]
    fn test_space_needed() {
        assert_eq!(stats(80, 100).space_needed(10), 0);
        assert_eq!(stats(80, 100).space_needed(30), 10);
    }

    #[test]
    fn test_average_entry_size() {
        assert_eq!(stats(400, 1000).average_entry_size(), 100);
        assert_eq!(CacheStats::default().average_entry_size(), 0);
    }
}
