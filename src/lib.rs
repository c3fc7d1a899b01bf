pub mod core;
pub mod storage;
pub mod analysis;
pub mod schema;
pub mod index;
pub mod search;
pub mod query;
pub mod mvcc;
pub mod writer;
pub mod distributed;

/*
┌──────────────────────────────────── METACAT LAYOUT ────────────────────────────────────┐
│                                                                                        │
│  core::catalog::Catalog                                                                │
│   ├─ writer::IndexWriter ──► index::InvertedIndex (private working copy)               │
│   │    └─ writer::RecordIndexer  (analysis + typed coercion, rayon for batches)       │
│   ├─ mvcc::MvccController ──► Arc<Snapshot> { InvertedIndex, fst dictionaries }       │
│   ├─ search::QueryExecutor                                                             │
│   │    ├─ query::QueryValidator   (depth, clause count, bbox, crs)                     │
│   │    ├─ query::QueryCache       (lru, keyed by snapshot version)                     │
│   │    ├─ query::FilterMatcher    (roaring set algebra, left-to-right fold)           │
│   │    └─ search::ResultSorter    (STRING / DOUBLE / DATE, ties by identifier)        │
│   ├─ distributed::DistributedOrchestrator                                              │
│   │    └─ dyn Harvester           (async fan-out, per-endpoint timeout)               │
│   ├─ storage::SnapshotStore       (bincode + crc32 checkpoint)                         │
│   └─ dyn storage::MetadataStore   (record bodies)                                      │
│                                                                                        │
│  search flow:  parse ─► validate ─► match ─► sort ─► paginate ─► materialize           │
└────────────────────────────────────────────────────────────────────────────────────────┘
*/
