use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, Utc};

/// Internal ordinal of a record inside one index generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

/// Globally unique record identifier, compared byte for byte
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId(id)
    }
}

/// Axis aligned rectangle with its coordinate reference system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub crs: String,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: impl Into<String>) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y, crs: crs.into() }
    }

    /// Finite coordinates with min <= max on both axes
    pub fn is_well_formed(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y].iter().all(|c| c.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// Touching edges count as intersecting
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
            crs: self.crs.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Geometry(BoundingBox),
}

impl FieldValue {
    /// Textual form used for display and STRING sorting
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Date(d) => d.to_rfc3339(),
            FieldValue::Geometry(b) => {
                format!("{} {} {} {} {}", b.min_x, b.min_y, b.max_x, b.max_y, b.crs)
            }
        }
    }
}

/// A metadata record as seen by the index: identifier plus typed field values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub fields: BTreeMap<String, Vec<FieldValue>>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Record {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn add_field(&mut self, name: &str, value: FieldValue) {
        self.fields.entry(name.to_string()).or_default().push(value);
    }

    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.add_field(name, value);
        self
    }

    pub fn with_text(self, name: &str, value: &str) -> Self {
        self.with_field(name, FieldValue::Text(value.to_string()))
    }

    pub fn with_number(self, name: &str, value: f64) -> Self {
        self.with_field(name, FieldValue::Number(value))
    }

    pub fn with_date(self, name: &str, value: DateTime<Utc>) -> Self {
        self.with_field(name, FieldValue::Date(value))
    }

    pub fn with_bbox(self, name: &str, bbox: BoundingBox) -> Self {
        self.with_field(name, FieldValue::Geometry(bbox))
    }

    pub fn get_field(&self, name: &str) -> Option<&[FieldValue]> {
        self.fields.get(name).map(|v| v.as_slice())
    }
}

/// How much of a record the metadata store should materialize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetailLevel {
    Brief,
    Summary,
    Full,
}

/// A full record body ready for response assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedRecord {
    pub identifier: String,
    pub body: String,
}

impl MaterializedRecord {
    pub fn new(identifier: impl Into<String>, body: impl Into<String>) -> Self {
        MaterializedRecord {
            identifier: identifier.into(),
            body: body.into(),
        }
    }
}
