use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::request::{ResponseRecord, ResultType, SearchRequest, SearchResponse};
use crate::core::stats::IndexStats;
use crate::core::types::{DetailLevel, DocId, MaterializedRecord, Record, RecordId};
use crate::distributed::harvester::{Harvester, RemoteEndpoint};
use crate::distributed::orchestrator::DistributedOrchestrator;
use crate::distributed::pagination::{Page, PageEntry, PaginationWindow};
use crate::index::inverted::InvertedIndex;
use crate::mvcc::controller::{MvccController, Snapshot};
use crate::query::ast::FilterChain;
use crate::query::parser::QueryParser;
use crate::schema::schema::Schema;
use crate::search::executor::QueryExecutor;
use crate::search::results::SearchResults;
use crate::search::sort::SortSpec;
use crate::storage::checkpoint::SnapshotStore;
use crate::storage::metadata::{InMemoryMetadataStore, MetadataStore};
use crate::writer::index_writer::IndexWriter;
use crate::writer::indexer::RecordIndexer;

/// Entry point of the engine: one writer, many concurrent searches.
pub struct Catalog {
    config: Config,
    schema: Arc<Schema>,
    mvcc: Arc<MvccController>,
    writer: IndexWriter,
    executor: QueryExecutor,
    parser: QueryParser,
    orchestrator: DistributedOrchestrator,
    metadata: Arc<dyn MetadataStore>,
}

impl Catalog {
    /// Open a catalog, restoring the last commit when `storage_path` is set
    pub fn open(schema: Schema, config: Config) -> Result<Self> {
        config.validate()?;
        let schema = Arc::new(schema);
        let analyzers = Arc::new(AnalyzerRegistry::new());

        let store = config.storage_path.as_ref().map(SnapshotStore::open).transpose()?;
        let restored = match &store {
            Some(store) => store.load()?,
            None => None,
        };

        let (mvcc, initial) = match restored {
            Some(checkpoint) => {
                info!(
                    version = checkpoint.version,
                    records = checkpoint.index.live_count(),
                    committed_at = %checkpoint.timestamp,
                    "checkpoint restored"
                );
                let snapshot = Snapshot::build(checkpoint.version, checkpoint.index.clone())?;
                (Arc::new(MvccController::with_snapshot(snapshot)), checkpoint.index)
            }
            None => (Arc::new(MvccController::new()), InvertedIndex::new()),
        };

        let indexer = RecordIndexer::new(
            schema.clone(),
            analyzers.clone(),
            &config.catalog_crs,
            config.parallel_batch_threshold,
        );
        let writer = IndexWriter::new(indexer, mvcc.clone(), store, initial);
        let executor = QueryExecutor::new(mvcc.clone(), schema.clone(), analyzers, &config);

        Ok(Catalog {
            parser: QueryParser::new(&config),
            orchestrator: DistributedOrchestrator::new(None, config.remote_timeout()),
            metadata: Arc::new(InMemoryMetadataStore::new()),
            config,
            schema,
            mvcc,
            writer,
            executor,
        })
    }

    pub fn with_metadata_store(mut self, metadata: Arc<dyn MetadataStore>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_harvester(mut self, harvester: Arc<dyn Harvester>) -> Self {
        self.orchestrator = DistributedOrchestrator::new(Some(harvester), self.config.remote_timeout());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    // Writes

    pub fn add_or_replace(&self, record: &Record) -> Result<DocId> {
        self.writer.add_or_replace(record)
    }

    pub fn add_batch(&self, records: &[Record]) -> Result<usize> {
        self.writer.add_batch(records)
    }

    pub fn remove(&self, identifier: &str) -> bool {
        self.writer.remove(&RecordId::new(identifier))
    }

    /// Make pending writes visible; returns the new snapshot version
    pub fn refresh(&self) -> Result<u64> {
        let snapshot = self.writer.refresh()?;
        self.executor.evict_stale(snapshot.version);
        Ok(snapshot.version)
    }

    /// Persist (when storage is configured) and publish
    pub fn commit(&self) -> Result<u64> {
        let snapshot = self.writer.commit()?;
        self.executor.evict_stale(snapshot.version);
        Ok(snapshot.version)
    }

    pub fn compact(&self) -> u64 {
        self.writer.compact()
    }

    // Reads

    pub fn parse(&self, constraint: &str) -> Result<FilterChain> {
        self.parser.parse(constraint)
    }

    pub fn execute(&self, chain: &FilterChain, sort: Option<&SortSpec>) -> Result<SearchResults> {
        self.executor.execute(chain, sort)
    }

    pub fn lookup_exact(&self, identifier: &str) -> Option<RecordId> {
        self.executor.lookup_exact(identifier)
    }

    pub async fn paginate(
        &self,
        window: &PaginationWindow,
        local: &[RecordId],
        distributed: bool,
        endpoints: &[RemoteEndpoint],
        chain: &FilterChain,
    ) -> Page {
        self.orchestrator.paginate(window, local, distributed, endpoints, chain).await
    }

    /// Execute, paginate and materialize one search request
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("search", request_id = %request_id);
        self.search_inner(request, request_id).instrument(span).await
    }

    async fn search_inner(&self, request: &SearchRequest, request_id: String) -> Result<SearchResponse> {
        request.validate()?;
        let results = self.execute(&request.constraint, request.sort.as_ref())?;

        if request.result_type == ResultType::Hits {
            info!(matched = results.total_matched(), "hits only");
            return Ok(SearchResponse {
                request_id,
                records: Vec::new(),
                total_matched: results.total_matched(),
                returned: 0,
                next_record: 0,
                snapshot_version: results.snapshot_version,
                failures: Vec::new(),
            });
        }

        let page = self
            .paginate(
                &request.window,
                &results.ids,
                request.distributed,
                &request.endpoints,
                &request.constraint,
            )
            .await;

        let mut records = Vec::with_capacity(page.entries.len());
        for entry in page.entries {
            match entry {
                PageEntry::Local(id) => {
                    match self.metadata.fetch(id.as_str(), &request.output_profile, request.detail)? {
                        Some(record) => records.push(ResponseRecord::Local(record)),
                        // deleted between query and fetch
                        None => warn!(id = %id, "indexed record missing from metadata store"),
                    }
                }
                PageEntry::Remote { endpoint, record } => {
                    records.push(ResponseRecord::Remote { endpoint, record });
                }
            }
        }

        info!(
            matched = page.total_matched,
            returned = records.len(),
            next = page.next_record,
            took_ms = results.took_ms,
            "search complete"
        );

        Ok(SearchResponse {
            request_id,
            returned: records.len(),
            records,
            total_matched: page.total_matched,
            next_record: page.next_record,
            snapshot_version: results.snapshot_version,
            failures: page.failures,
        })
    }

    /// Fetch records by exact identifier; unknown identifiers are omitted
    pub fn get_records_by_id(
        &self,
        identifiers: &[&str],
        output_profile: &str,
        detail: DetailLevel,
    ) -> Result<Vec<MaterializedRecord>> {
        let mut records = Vec::new();
        for identifier in identifiers {
            let Some(id) = self.lookup_exact(identifier) else {
                continue;
            };
            if let Some(record) = self.metadata.fetch(id.as_str(), output_profile, detail)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn stats(&self) -> IndexStats {
        let snapshot = self.mvcc.current_snapshot();
        IndexStats {
            snapshot_version: snapshot.version,
            snapshot_time: snapshot.timestamp,
            live_records: snapshot.index.live_count(),
            deleted_records: snapshot.index.deleted_count(),
            field_count: snapshot.index.fields.len(),
            term_count: snapshot.index.term_count(),
            pending_changes: self.writer.pending_changes(),
            cache_stats: self.executor.cache_stats(),
        }
    }
}
