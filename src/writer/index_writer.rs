use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, info};
use crate::core::error::Result;
use crate::core::types::{DocId, Record, RecordId};
use crate::index::inverted::InvertedIndex;
use crate::mvcc::controller::{MvccController, Snapshot};
use crate::storage::checkpoint::SnapshotStore;
use crate::writer::indexer::RecordIndexer;

struct WriterState {
    index: InvertedIndex,
    pending: usize,
}

/// Single writer over the index.
///
/// Changes accumulate in a private working copy; readers only see them once
/// `refresh` (or `commit`) publishes a new snapshot.
pub struct IndexWriter {
    state: Mutex<WriterState>,
    indexer: RecordIndexer,
    mvcc: Arc<MvccController>,
    store: Option<SnapshotStore>,
}

impl IndexWriter {
    pub fn new(
        indexer: RecordIndexer,
        mvcc: Arc<MvccController>,
        store: Option<SnapshotStore>,
        initial: InvertedIndex,
    ) -> Self {
        IndexWriter {
            state: Mutex::new(WriterState { index: initial, pending: 0 }),
            indexer,
            mvcc,
            store,
        }
    }

    /// Index or re-index a record under its identifier
    pub fn add_or_replace(&self, record: &Record) -> Result<DocId> {
        // analysis happens outside the writer lock
        let indexed = self.indexer.index_record(record)?;

        let mut state = self.state.lock();
        let doc = state.index.apply(indexed)?;
        state.pending += 1;
        debug!(id = %record.id, doc = doc.0, "record indexed");
        Ok(doc)
    }

    /// All-or-nothing: nothing is applied if any record is invalid
    pub fn add_batch(&self, records: &[Record]) -> Result<usize> {
        let indexed = self.indexer.index_batch(records)?;
        let count = indexed.len();

        let mut state = self.state.lock();
        for record in indexed {
            state.index.apply(record)?;
        }
        state.pending += count;
        info!(count, "batch indexed");
        Ok(count)
    }

    /// Silently ignores identifiers that are not indexed
    pub fn remove(&self, id: &RecordId) -> bool {
        let mut state = self.state.lock();
        let removed = state.index.remove(id);
        if removed {
            state.pending += 1;
        }
        debug!(id = %id, removed, "record removal");
        removed
    }

    /// Publish every change made so far to readers
    pub fn refresh(&self) -> Result<Arc<Snapshot>> {
        let mut state = self.state.lock();
        let snapshot = self.mvcc.publish(state.index.clone())?;
        debug!(version = snapshot.version, changes = state.pending, "snapshot published");
        state.pending = 0;
        Ok(snapshot)
    }

    /// Persist the working state, then publish it.
    ///
    /// A failed write leaves the previously published snapshot in place.
    pub fn commit(&self) -> Result<Arc<Snapshot>> {
        let mut state = self.state.lock();
        if let Some(store) = &self.store {
            store.save(self.mvcc.next_version(), &state.index)?;
        }
        let snapshot = self.mvcc.publish(state.index.clone())?;
        info!(version = snapshot.version, records = snapshot.doc_count(), persisted = self.store.is_some(), "commit");
        state.pending = 0;
        Ok(snapshot)
    }

    /// Physically drop tombstoned ordinals; visible to readers after the next refresh
    pub fn compact(&self) -> u64 {
        let purged = self.state.lock().index.compact();
        info!(purged, "index compacted");
        purged
    }

    pub fn pending_changes(&self) -> usize {
        self.state.lock().pending
    }
}
