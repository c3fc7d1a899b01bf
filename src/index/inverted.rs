use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::{BoundingBox, DocId, RecordId};
use crate::index::point::PointKey;
use crate::schema::schema::FieldType;
use crate::writer::indexer::IndexedRecord;

/// Per-record value of a field used for ordering results.
///
/// All three representations are computed at index time so the sorter can
/// compare in whichever type the request asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortValue {
    pub text: String,
    pub number: Option<f64>,
    /// Milliseconds since the epoch, UTC
    pub instant: Option<i64>,
}

impl SortValue {
    pub fn text(text: impl Into<String>) -> Self {
        SortValue { text: text.into(), number: None, instant: None }
    }
}

/// Postings of one field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPostings {
    pub field_type: FieldType,
    /// Analyzed term -> records containing it
    pub terms: BTreeMap<String, RoaringBitmap>,
    /// Order-preserving key -> records holding that Number/Date value
    pub points: BTreeMap<PointKey, RoaringBitmap>,
    pub sort_values: HashMap<u32, SortValue>,
}

impl FieldPostings {
    pub fn new(field_type: FieldType) -> Self {
        FieldPostings {
            field_type,
            terms: BTreeMap::new(),
            points: BTreeMap::new(),
            sort_values: HashMap::new(),
        }
    }

    pub fn term(&self, term: &str) -> Option<&RoaringBitmap> {
        self.terms.get(term)
    }

    /// Union of postings for terms between the bounds, compared lexicographically
    pub fn term_range(&self, lower: Bound<&str>, upper: Bound<&str>) -> RoaringBitmap {
        if bounds_inverted(&lower, &upper) {
            return RoaringBitmap::new();
        }
        self.terms
            .range::<str, _>((lower, upper))
            .fold(RoaringBitmap::new(), |acc, (_, docs)| acc | docs)
    }

    /// Union of postings for point keys between the bounds
    pub fn point_range(&self, lower: Bound<PointKey>, upper: Bound<PointKey>) -> RoaringBitmap {
        if bounds_inverted(&lower, &upper) {
            return RoaringBitmap::new();
        }
        self.points
            .range((lower, upper))
            .fold(RoaringBitmap::new(), |acc, (_, docs)| acc | docs)
    }

    fn forget(&mut self, doc: u32) {
        self.sort_values.remove(&doc);
    }

    fn drop_deleted(&mut self, deleted: &RoaringBitmap) {
        self.terms.retain(|_, docs| {
            *docs -= deleted;
            !docs.is_empty()
        });
        self.points.retain(|_, docs| {
            *docs -= deleted;
            !docs.is_empty()
        });
    }
}

/// `BTreeMap::range` panics on start > end, and such a range is empty anyway
fn bounds_inverted<T: Ord>(lower: &Bound<T>, upper: &Bound<T>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}

/// Mutable index state owned by the writer.
///
/// Every add allocates a fresh ordinal; replacing or removing a record
/// tombstones its previous ordinal in `deleted` until `compact` drops the
/// dead bits from the postings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub fields: BTreeMap<String, FieldPostings>,
    pub geometries: HashMap<u32, BoundingBox>,
    pub live: RoaringBitmap,
    pub deleted: RoaringBitmap,
    ordinals: HashMap<RecordId, u32>,
    identifiers: HashMap<u32, RecordId>,
    next_doc: u32,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a prepared record, replacing any live record with the same identifier
    pub fn apply(&mut self, record: IndexedRecord) -> Result<DocId> {
        if self.next_doc == u32::MAX {
            return Err(Error::index_unavailable("record ordinals exhausted"));
        }

        if let Some(previous) = self.ordinals.get(&record.id).copied() {
            self.tombstone(previous);
        }

        let doc = self.next_doc;
        self.next_doc += 1;

        for field in record.fields {
            let postings = self
                .fields
                .entry(field.name)
                .or_insert_with(|| FieldPostings::new(field.field_type));

            for term in field.terms {
                postings.terms.entry(term).or_default().insert(doc);
            }
            for key in field.points {
                postings.points.entry(key).or_default().insert(doc);
            }
            if let Some(sort_value) = field.sort_value {
                postings.sort_values.insert(doc, sort_value);
            }
        }

        if let Some(envelope) = record.envelope {
            self.geometries.insert(doc, envelope);
        }

        self.ordinals.insert(record.id.clone(), doc);
        self.identifiers.insert(doc, record.id);
        self.live.insert(doc);

        Ok(DocId(doc))
    }

    /// Returns false when no live record carries `id`
    pub fn remove(&mut self, id: &RecordId) -> bool {
        match self.ordinals.get(id).copied() {
            Some(doc) => {
                self.tombstone(doc);
                true
            }
            None => false,
        }
    }

    fn tombstone(&mut self, doc: u32) {
        self.live.remove(doc);
        self.deleted.insert(doc);
        self.geometries.remove(&doc);
        for postings in self.fields.values_mut() {
            postings.forget(doc);
        }
        if let Some(id) = self.identifiers.remove(&doc) {
            self.ordinals.remove(&id);
        }
    }

    pub fn lookup(&self, id: &RecordId) -> Option<DocId> {
        self.ordinals.get(id).map(|doc| DocId(*doc))
    }

    pub fn identifier(&self, doc: u32) -> Option<&RecordId> {
        self.identifiers.get(&doc)
    }

    pub fn field(&self, name: &str) -> Option<&FieldPostings> {
        self.fields.get(name)
    }

    pub fn live_count(&self) -> u64 {
        self.live.len()
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted.len()
    }

    pub fn term_count(&self) -> usize {
        self.fields.values().map(|f| f.terms.len()).sum()
    }

    /// Drop tombstoned ordinals from every posting; returns how many were purged
    pub fn compact(&mut self) -> u64 {
        let purged = self.deleted.len();
        if purged == 0 {
            return 0;
        }
        for postings in self.fields.values_mut() {
            postings.drop_deleted(&self.deleted);
        }
        self.fields.retain(|_, postings| {
            !postings.terms.is_empty() || !postings.points.is_empty() || !postings.sort_values.is_empty()
        });
        self.deleted.clear();
        purged
    }
}
