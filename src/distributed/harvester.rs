//! Contract with the transport layer that queries federated catalogs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::core::types::MaterializedRecord;
use crate::query::ast::FilterChain;

/// A federated catalog the request fans out to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub id: String,
    pub url: String,
}

impl RemoteEndpoint {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        RemoteEndpoint { id: id.into(), url: url.into() }
    }
}

/// What one endpoint answered: its own total, plus the records of the requested slice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteBatch {
    pub matched_count: usize,
    pub records: Vec<MaterializedRecord>,
}

/// Fetches already materialized records from a remote catalog.
///
/// `start` is 1-based and `max` caps the number of records returned.
/// Implementations report failures as errors; the orchestrator turns them
/// into zero contributions.
#[async_trait]
pub trait Harvester: Send + Sync {
    async fn fetch_remote(
        &self,
        endpoint: &RemoteEndpoint,
        chain: &FilterChain,
        start: usize,
        max: usize,
    ) -> Result<RemoteBatch>;
}
