use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::{DetailLevel, MaterializedRecord};
use crate::distributed::harvester::RemoteEndpoint;
use crate::distributed::pagination::{EndpointFailure, PaginationWindow};
use crate::query::ast::FilterChain;
use crate::search::sort::SortSpec;

pub const DEFAULT_OUTPUT_PROFILE: &str = "default";

/// Whether a search returns records or only counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    Hits,
    Results,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub constraint: FilterChain,
    pub sort: Option<SortSpec>,
    pub result_type: ResultType,
    pub window: PaginationWindow,
    pub output_profile: String,
    pub detail: DetailLevel,
    pub distributed: bool,
    pub endpoints: Vec<RemoteEndpoint>,
}

impl SearchRequest {
    /// First ten full records, local only
    pub fn new(constraint: FilterChain) -> Self {
        SearchRequest {
            constraint,
            sort: None,
            result_type: ResultType::Results,
            window: PaginationWindow::default(),
            output_profile: DEFAULT_OUTPUT_PROFILE.to_string(),
            detail: DetailLevel::Full,
            distributed: false,
            endpoints: Vec::new(),
        }
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_window(mut self, start_position: usize, max_records: usize) -> Result<Self> {
        self.window = PaginationWindow::new(start_position, max_records)?;
        Ok(self)
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn with_output(mut self, output_profile: &str, detail: DetailLevel) -> Self {
        self.output_profile = output_profile.to_string();
        self.detail = detail;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Vec<RemoteEndpoint>) -> Self {
        self.distributed = true;
        self.endpoints = endpoints;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_profile.trim().is_empty() {
            return Err(Error::query_syntax("outputSchema", "output profile must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseRecord {
    Local(MaterializedRecord),
    Remote { endpoint: String, record: MaterializedRecord },
}

impl ResponseRecord {
    pub fn identifier(&self) -> &str {
        match self {
            ResponseRecord::Local(record) => &record.identifier,
            ResponseRecord::Remote { record, .. } => &record.identifier,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub request_id: String,
    pub records: Vec<ResponseRecord>,
    pub total_matched: usize,
    pub returned: usize,
    /// 1-based position of the next page, 0 when this page is the last
    pub next_record: usize,
    pub snapshot_version: u64,
    pub failures: Vec<EndpointFailure>,
}

impl SearchResponse {
    pub fn identifiers(&self) -> Vec<&str> {
        self.records.iter().map(ResponseRecord::identifier).collect()
    }
}
