use std::ops::Range;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::{MaterializedRecord, RecordId};

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationWindow {
    start_position: usize,
    max_records: usize,
}

impl PaginationWindow {
    pub fn new(start_position: usize, max_records: usize) -> Result<Self> {
        if start_position == 0 {
            return Err(Error::query_syntax("startPosition", "startPosition is 1-based and must be >= 1"));
        }
        Ok(PaginationWindow { start_position, max_records })
    }

    pub fn start_position(&self) -> usize {
        self.start_position
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Index range of `total` ordered results this window covers
    pub fn slice(&self, total: usize) -> Range<usize> {
        let begin = (self.start_position - 1).min(total);
        let end = (self.start_position - 1).saturating_add(self.max_records).min(total);
        begin..end
    }

    /// `startPosition + maxRecords` while that still points inside `total`, else 0
    pub fn next_record(&self, total: usize) -> usize {
        let next = self.start_position.saturating_add(self.max_records);
        if next <= total { next } else { 0 }
    }

    /// Part of the window that local results of size `local_total` cannot fill
    pub fn remote_plan(&self, local_total: usize) -> DistributedPlan {
        if self.start_position > local_total {
            DistributedPlan {
                start: self.start_position - local_total,
                max: self.max_records,
            }
        } else {
            let consumed = self.slice(local_total).len();
            DistributedPlan {
                start: 1,
                max: self.max_records - consumed,
            }
        }
    }
}

impl Default for PaginationWindow {
    fn default() -> Self {
        PaginationWindow { start_position: 1, max_records: 10 }
    }
}

/// Slice every remote endpoint is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributedPlan {
    pub start: usize,
    pub max: usize,
}

/// Contribution of one endpoint that answered
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedResult {
    pub endpoint: String,
    pub matched_count: usize,
    pub records: Vec<MaterializedRecord>,
}

/// An endpoint that errored, panicked or timed out; it contributed nothing
#[derive(Debug, Clone)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub error: Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageEntry {
    /// Identifier still to be materialized by the metadata store
    Local(RecordId),
    /// Record materialized by a remote catalog
    Remote { endpoint: String, record: MaterializedRecord },
}

/// Final window of a (possibly federated) search
#[derive(Debug, Clone)]
pub struct Page {
    pub entries: Vec<PageEntry>,
    pub total_matched: usize,
    pub next_record: usize,
    /// Set when remote endpoints were consulted
    pub plan: Option<DistributedPlan>,
    pub remote: Vec<DistributedResult>,
    pub failures: Vec<EndpointFailure>,
}

impl Page {
    /// Window over local results only
    pub fn local(window: &PaginationWindow, local: &[RecordId]) -> Self {
        let entries = local[window.slice(local.len())]
            .iter()
            .cloned()
            .map(PageEntry::Local)
            .collect();
        Page {
            entries,
            total_matched: local.len(),
            next_record: window.next_record(local.len()),
            plan: None,
            remote: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn returned(&self) -> usize {
        self.entries.len()
    }

    pub fn local_ids(&self) -> Vec<&RecordId> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                PageEntry::Local(id) => Some(id),
                PageEntry::Remote { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<RecordId> {
        (1..=n).map(|i| RecordId::new(format!("r{:02}", i))).collect()
    }

    #[test]
    fn test_start_position_must_be_positive() {
        let err = PaginationWindow::new(0, 10).unwrap_err();
        assert_eq!(err.parameter.as_deref(), Some("startPosition"));
    }

    #[test]
    fn test_tail_page_has_no_next() {
        let window = PaginationWindow::new(8, 5).unwrap();
        let page = Page::local(&window, &ids(10));
        assert_eq!(page.returned(), 3);
        assert_eq!(page.local_ids()[0].as_str(), "r08");
        assert_eq!(page.next_record, 0);
    }

    #[test]
    fn test_middle_page_points_to_next() {
        let window = PaginationWindow::new(1, 4).unwrap();
        let page = Page::local(&window, &ids(10));
        assert_eq!(page.returned(), 4);
        assert_eq!(page.next_record, 5);
    }

    #[test]
    fn test_start_beyond_total_is_empty() {
        let window = PaginationWindow::new(50, 10).unwrap();
        let page = Page::local(&window, &ids(10));
        assert_eq!(page.returned(), 0);
        assert_eq!(page.next_record, 0);
    }

    #[test]
    fn test_remote_plan() {
        let beyond = PaginationWindow::new(5, 4).unwrap();
        assert_eq!(beyond.remote_plan(3), DistributedPlan { start: 2, max: 4 });

        let straddling = PaginationWindow::new(2, 5).unwrap();
        assert_eq!(straddling.remote_plan(3), DistributedPlan { start: 1, max: 3 });

        let inside = PaginationWindow::new(1, 2).unwrap();
        assert_eq!(inside.remote_plan(10), DistributedPlan { start: 1, max: 0 });
    }

    #[test]
    fn test_huge_max_records_does_not_overflow() {
        let window = PaginationWindow::new(3, usize::MAX).unwrap();
        assert_eq!(window.slice(10), 2..10);
        assert_eq!(window.next_record(10), 0);
    }
}
