use std::sync::Arc;
use crate::core::types::RecordId;

/// Outcome of one local query: every match, in result order
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub ids: Arc<Vec<RecordId>>,
    pub snapshot_version: u64,
    pub took_ms: u64,
    pub from_cache: bool,
}

impl SearchResults {
    pub fn total_matched(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|r| r.as_str() == id)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.ids.iter().map(|id| id.to_string()).collect()
    }
}
