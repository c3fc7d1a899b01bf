use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::query::cache::CacheStats;

/// Catalog statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    // Snapshot
    pub snapshot_version: u64,
    pub snapshot_time: DateTime<Utc>,

    // Index contents
    pub live_records: u64,
    pub deleted_records: u64,
    pub field_count: usize,
    pub term_count: usize,

    // Writer
    pub pending_changes: usize,

    // Query metrics
    pub cache_stats: CacheStats,
}

impl IndexStats {
    /// Share of ordinals that are tombstones; a hint for `compact`
    pub fn deleted_ratio(&self) -> f64 {
        let total = self.live_records + self.deleted_records;
        if total == 0 {
            0.0
        } else {
            self.deleted_records as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_ratio() {
        let mut stats = IndexStats {
            snapshot_version: 1,
            snapshot_time: Utc::now(),
            live_records: 0,
            deleted_records: 0,
            field_count: 0,
            term_count: 0,
            pending_changes: 0,
            cache_stats: CacheStats { hit_count: 0, miss_count: 0, size: 0, capacity: 10 },
        };
        assert_eq!(stats.deleted_ratio(), 0.0);

        stats.live_records = 3;
        stats.deleted_records = 1;
        assert_eq!(stats.deleted_ratio(), 0.25);
    }
}
