use std::cmp::Ordering;
use std::fmt;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::RecordId;
use crate::index::inverted::{InvertedIndex, SortValue};
use crate::schema::schema::{FieldType, Schema};

/// Type the sort companion is compared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortType {
    /// Byte-wise
    String,
    /// Numeric
    Double,
    /// Chronological
    Date,
}

impl SortType {
    pub fn for_field(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Number => SortType::Double,
            FieldType::Date => SortType::Date,
            _ => SortType::String,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "STRING" => Some(SortType::String),
            "DOUBLE" | "NUMBER" => Some(SortType::Double),
            "DATE" => Some(SortType::Date),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub sort_type: SortType,
    pub descending: bool,
}

impl SortKey {
    pub fn new(field: &str, sort_type: SortType, descending: bool) -> Self {
        SortKey { field: field.to_string(), sort_type, descending }
    }

    pub fn ascending(field: &str, sort_type: SortType) -> Self {
        Self::new(field, sort_type, false)
    }

    pub fn descending(field: &str, sort_type: SortType) -> Self {
        Self::new(field, sort_type, true)
    }
}

/// Ordered sort keys; earlier keys take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        SortSpec { keys }
    }

    pub fn by(key: SortKey) -> Self {
        SortSpec { keys: vec![key] }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parse `field[:TYPE][:A|D]` entries separated by commas, e.g.
    /// `modified:D,title:A` or `size:DOUBLE:D`. A missing type follows the
    /// field's declared type.
    pub fn parse(raw: &str, schema: &Schema) -> Result<Self> {
        let mut keys = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let field = parts[0];
            if field.is_empty() {
                return Err(Error::query_syntax("sortBy", format!("missing field in '{}'", entry)));
            }

            let mut sort_type = None;
            let mut descending = false;
            for part in &parts[1..] {
                match part.to_ascii_uppercase().as_str() {
                    "A" | "ASC" => descending = false,
                    "D" | "DESC" => descending = true,
                    other => match SortType::parse(other) {
                        Some(parsed) if sort_type.is_none() => sort_type = Some(parsed),
                        _ => {
                            return Err(Error::query_syntax(
                                "sortBy",
                                format!("unexpected '{}' in '{}'", part, entry),
                            ))
                        }
                    },
                }
            }

            let sort_type = sort_type.unwrap_or_else(|| SortType::for_field(schema.field_type(field)));
            keys.push(SortKey::new(field, sort_type, descending));
        }
        Ok(SortSpec { keys })
    }

    pub fn validate(&self, schema: &Schema) -> Result<()> {
        for key in &self.keys {
            if schema.field_type(&key.field) == FieldType::Geometry {
                return Err(Error::query_syntax(
                    "sortBy",
                    format!("cannot sort on geometry field '{}'", key.field),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let sort_type = match key.sort_type {
                SortType::String => "STRING",
                SortType::Double => "DOUBLE",
                SortType::Date => "DATE",
            };
            write!(f, "{}:{}:{}", key.field, sort_type, if key.descending { "D" } else { "A" })?;
        }
        Ok(())
    }
}

/// Orders a match set by sort companions, ties by identifier
pub struct ResultSorter<'a> {
    index: &'a InvertedIndex,
}

impl<'a> ResultSorter<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        ResultSorter { index }
    }

    /// Identifier order when `spec` is empty
    pub fn sort(&self, docs: &RoaringBitmap, spec: &SortSpec) -> Vec<RecordId> {
        let columns: Vec<_> = spec
            .keys
            .iter()
            .map(|key| self.index.field(&key.field).map(|postings| &postings.sort_values))
            .collect();

        let mut rows: Vec<(&RecordId, Vec<Option<&SortValue>>)> = docs
            .iter()
            .filter_map(|doc| {
                let id = self.index.identifier(doc)?;
                let values = columns
                    .iter()
                    .map(|column| column.and_then(|values| values.get(&doc)))
                    .collect();
                Some((id, values))
            })
            .collect();

        rows.sort_by(|(a_id, a_values), (b_id, b_values)| {
            spec.keys
                .iter()
                .zip(a_values.iter().zip(b_values.iter()))
                .map(|(key, (a, b))| compare_values(key, *a, *b))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or_else(|| a_id.cmp(b_id))
        });

        rows.into_iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Missing values sort last in either direction, and so do values with no
/// reading in the requested type; those compare by their text among themselves
fn compare_values(key: &SortKey, a: Option<&SortValue>, b: Option<&SortValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (readable(key.sort_type, a), readable(key.sort_type, b)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (both_typed, _) => {
                let ordering = if both_typed {
                    compare_typed(key.sort_type, a, b)
                } else {
                    a.text.as_bytes().cmp(b.text.as_bytes())
                };
                if key.descending { ordering.reverse() } else { ordering }
            }
        },
    }
}

fn readable(sort_type: SortType, value: &SortValue) -> bool {
    match sort_type {
        SortType::Double => value.number.is_some(),
        SortType::Date => value.instant.is_some(),
        SortType::String => true,
    }
}

/// Both sides must be readable in `sort_type`
fn compare_typed(sort_type: SortType, a: &SortValue, b: &SortValue) -> Ordering {
    match sort_type {
        SortType::Double => match (a.number, b.number) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
        SortType::Date => a.instant.cmp(&b.instant),
        SortType::String => a.text.as_bytes().cmp(b.text.as_bytes()),
    }
}
