use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::core::error::Result;
use crate::index::dictionary::TermDictionary;
use crate::index::inverted::InvertedIndex;

/// Immutable, point-in-time view of the index.
///
/// Readers hold an `Arc<Snapshot>` for the whole query; writes made after the
/// snapshot was taken are invisible until the next refresh publishes a new one.
#[derive(Debug)]
pub struct Snapshot {
    pub version: u64,
    pub index: InvertedIndex,
    /// Sorted term sets of textual fields, for wildcard expansion
    pub dictionaries: HashMap<String, TermDictionary>,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn build(version: u64, index: InvertedIndex) -> Result<Self> {
        let mut dictionaries = HashMap::new();
        for (name, postings) in &index.fields {
            if postings.terms.is_empty() {
                continue;
            }
            dictionaries.insert(name.clone(), TermDictionary::build(postings.terms.keys())?);
        }

        Ok(Snapshot {
            version,
            index,
            dictionaries,
            timestamp: Utc::now(),
        })
    }

    pub fn empty() -> Self {
        Snapshot {
            version: 0,
            index: InvertedIndex::new(),
            dictionaries: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn doc_count(&self) -> u64 {
        self.index.live_count()
    }

    pub fn dictionary(&self, field: &str) -> Option<&TermDictionary> {
        self.dictionaries.get(field)
    }
}

/// Publishes snapshots and hands the latest one to readers
pub struct MvccController {
    current: RwLock<Arc<Snapshot>>,
    current_version: AtomicU64,
}

impl MvccController {
    pub fn new() -> Self {
        MvccController {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            current_version: AtomicU64::new(0),
        }
    }

    /// Resume numbering after a restored checkpoint
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let version = snapshot.version;
        MvccController {
            current: RwLock::new(Arc::new(snapshot)),
            current_version: AtomicU64::new(version),
        }
    }

    pub fn next_version(&self) -> u64 {
        self.current_version.load(Ordering::Acquire) + 1
    }

    /// Build and publish a snapshot over `index`; returns it
    pub fn publish(&self, index: InvertedIndex) -> Result<Arc<Snapshot>> {
        let version = self.next_version();
        let snapshot = Arc::new(Snapshot::build(version, index)?);

        *self.current.write() = snapshot.clone();
        self.current_version.store(version, Ordering::Release);

        Ok(snapshot)
    }

    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::Acquire)
    }
}

impl Default for MvccController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RecordId;
    use crate::schema::schema::FieldType;
    use crate::writer::indexer::{IndexedField, IndexedRecord};

    fn keyword_record(id: &str, term: &str) -> IndexedRecord {
        IndexedRecord {
            id: RecordId::new(id),
            fields: vec![IndexedField {
                name: "type".into(),
                field_type: FieldType::Keyword,
                terms: vec![term.to_string()],
                points: vec![],
                sort_value: None,
            }],
            envelope: None,
        }
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let mvcc = MvccController::new();
        let mut index = InvertedIndex::new();
        index.apply(keyword_record("a", "dataset")).unwrap();
        mvcc.publish(index.clone()).unwrap();

        let held = mvcc.current_snapshot();
        index.apply(keyword_record("b", "service")).unwrap();
        mvcc.publish(index).unwrap();

        assert_eq!(held.version, 1);
        assert_eq!(held.doc_count(), 1);
        assert_eq!(mvcc.current_snapshot().doc_count(), 2);
        assert_eq!(mvcc.current_version(), 2);
    }

    #[test]
    fn test_dictionaries_built_for_terms() {
        let mut index = InvertedIndex::new();
        index.apply(keyword_record("a", "dataset")).unwrap();
        let snapshot = Snapshot::build(1, index).unwrap();

        assert!(snapshot.dictionary("type").unwrap().contains("dataset"));
        assert!(snapshot.dictionary("missing").is_none());
    }
}
