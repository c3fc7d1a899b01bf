use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::RecordId;
use crate::mvcc::controller::{MvccController, Snapshot};
use crate::query::ast::FilterChain;
use crate::query::cache::{CacheStats, CachedResult, QueryCache, QueryKey};
use crate::query::matcher::FilterMatcher;
use crate::query::validator::QueryValidator;
use crate::schema::schema::Schema;
use crate::search::results::SearchResults;
use crate::search::sort::{ResultSorter, SortSpec};

/// Evaluates chains against the latest published snapshot.
///
/// Read-only and safe to share between threads; each call pins one snapshot
/// for its whole duration.
pub struct QueryExecutor {
    mvcc: Arc<MvccController>,
    schema: Arc<Schema>,
    analyzers: Arc<AnalyzerRegistry>,
    validator: QueryValidator,
    cache: QueryCache,
}

impl QueryExecutor {
    pub fn new(
        mvcc: Arc<MvccController>,
        schema: Arc<Schema>,
        analyzers: Arc<AnalyzerRegistry>,
        config: &Config,
    ) -> Self {
        QueryExecutor {
            mvcc,
            schema,
            analyzers,
            validator: QueryValidator::new(config),
            cache: QueryCache::new(config.query_cache_size),
        }
    }

    pub fn execute(&self, chain: &FilterChain, sort: Option<&SortSpec>) -> Result<SearchResults> {
        let snapshot = self.mvcc.current_snapshot();
        self.execute_on(&snapshot, chain, sort)
    }

    /// Evaluate against a caller-held snapshot
    pub fn execute_on(
        &self,
        snapshot: &Snapshot,
        chain: &FilterChain,
        sort: Option<&SortSpec>,
    ) -> Result<SearchResults> {
        let start = Instant::now();
        self.validator.validate(chain)?;
        if let Some(spec) = sort {
            spec.validate(&self.schema)?;
        }

        let key = QueryKey::new(snapshot.version, chain, sort)?;

        if let Some(cached) = self.cache.get(&key) {
            debug!(version = snapshot.version, matched = cached.ids.len(), "query served from cache");
            return Ok(SearchResults {
                ids: cached.ids,
                snapshot_version: snapshot.version,
                took_ms: start.elapsed().as_millis() as u64,
                from_cache: true,
            });
        }

        let matcher = FilterMatcher::new(snapshot, &self.schema, &self.analyzers);
        let docs = matcher.evaluate(chain)?;

        let empty = SortSpec::default();
        let ids = Arc::new(ResultSorter::new(&snapshot.index).sort(&docs, sort.unwrap_or(&empty)));
        self.cache.put(key, CachedResult { ids: ids.clone() });

        let took_ms = start.elapsed().as_millis() as u64;
        debug!(version = snapshot.version, matched = ids.len(), took_ms, "query executed");

        Ok(SearchResults {
            ids,
            snapshot_version: snapshot.version,
            took_ms,
            from_cache: false,
        })
    }

    /// Case-sensitive, exact identifier resolution against the current snapshot
    pub fn lookup_exact(&self, identifier: &str) -> Option<RecordId> {
        let id = RecordId::new(identifier);
        self.mvcc
            .current_snapshot()
            .index
            .lookup(&id)
            .map(|_| id)
    }

    /// Forget cached results of snapshots older than `version`
    pub fn evict_stale(&self, version: u64) {
        self.cache.evict_before(version);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
