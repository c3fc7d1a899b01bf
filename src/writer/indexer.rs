use rayon::prelude::*;
use std::sync::Arc;
use crate::analysis::analyzer::{AnalyzerRegistry, STANDARD_ANALYZER};
use crate::core::error::{Error, Result};
use crate::core::types::{BoundingBox, FieldValue, Record, RecordId};
use crate::index::inverted::SortValue;
use crate::index::point::{date_key, number_key, parse_date, parse_number, PointKey};
use crate::index::spatial::same_crs;
use crate::schema::schema::{FieldType, Schema, ALL_FIELDS, ID_FIELD};

/// One field of a record, analyzed and coerced to its declared type
#[derive(Debug, Clone)]
pub struct IndexedField {
    pub name: String,
    pub field_type: FieldType,
    pub terms: Vec<String>,
    pub points: Vec<PointKey>,
    pub sort_value: Option<SortValue>,
}

/// A record ready to be applied to the inverted index
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub id: RecordId,
    pub fields: Vec<IndexedField>,
    /// Envelope of every geometry value on the record
    pub envelope: Option<BoundingBox>,
}

/// Turns records into index entries; pure, so batches can run on the rayon pool
pub struct RecordIndexer {
    schema: Arc<Schema>,
    analyzers: Arc<AnalyzerRegistry>,
    catalog_crs: String,
    parallel_threshold: usize,
}

impl RecordIndexer {
    pub fn new(
        schema: Arc<Schema>,
        analyzers: Arc<AnalyzerRegistry>,
        catalog_crs: &str,
        parallel_threshold: usize,
    ) -> Self {
        RecordIndexer {
            schema,
            analyzers,
            catalog_crs: catalog_crs.to_string(),
            parallel_threshold,
        }
    }

    /// Index a batch; the first invalid record fails the whole batch
    pub fn index_batch(&self, records: &[Record]) -> Result<Vec<IndexedRecord>> {
        if records.len() > self.parallel_threshold {
            records.par_iter().map(|r| self.index_record(r)).collect()
        } else {
            records.iter().map(|r| self.index_record(r)).collect()
        }
    }

    pub fn index_record(&self, record: &Record) -> Result<IndexedRecord> {
        if record.id.is_empty() {
            return Err(Error::invalid_record("record identifier is empty"));
        }

        let mut fields = Vec::with_capacity(record.fields.len() + 2);
        fields.push(IndexedField {
            name: ID_FIELD.to_string(),
            field_type: FieldType::Keyword,
            terms: vec![record.id.as_str().to_string()],
            points: Vec::new(),
            sort_value: Some(SortValue::text(record.id.as_str())),
        });

        let all_analyzer = self.analyzers.require(STANDARD_ANALYZER)?;
        let mut all_terms = Vec::new();
        let mut envelope: Option<BoundingBox> = None;

        for (name, values) in &record.fields {
            // the identifier is authoritative, never a record attribute
            if name == ID_FIELD || name == ALL_FIELDS || values.is_empty() {
                continue;
            }

            let field_type = self.schema.field_type(name);
            match field_type {
                FieldType::Text | FieldType::Keyword => {
                    let analyzer = self.analyzers.require(self.schema.analyzer_for(name))?;
                    let mut terms = Vec::new();
                    for value in values {
                        let text = self.textual(&record.id, name, value)?;
                        terms.extend(analyzer.terms(&text));
                        all_terms.extend(all_analyzer.terms(&text));
                    }
                    let first = self.textual(&record.id, name, &values[0])?;
                    fields.push(IndexedField {
                        name: name.clone(),
                        field_type,
                        terms,
                        points: Vec::new(),
                        sort_value: Some(textual_sort_value(first)),
                    });
                }
                FieldType::Number => {
                    let numbers = values
                        .iter()
                        .map(|v| coerce_number(&record.id, name, v))
                        .collect::<Result<Vec<f64>>>()?;
                    fields.push(IndexedField {
                        name: name.clone(),
                        field_type,
                        terms: Vec::new(),
                        points: numbers.iter().map(|n| number_key(*n)).collect(),
                        sort_value: Some(SortValue {
                            text: values[0].display(),
                            number: Some(numbers[0]),
                            instant: None,
                        }),
                    });
                }
                FieldType::Date => {
                    let instants = values
                        .iter()
                        .map(|v| coerce_date(&record.id, name, v))
                        .collect::<Result<Vec<_>>>()?;
                    fields.push(IndexedField {
                        name: name.clone(),
                        field_type,
                        terms: Vec::new(),
                        points: instants.iter().map(date_key).collect(),
                        sort_value: Some(SortValue {
                            text: instants[0].to_rfc3339(),
                            number: None,
                            instant: Some(instants[0].timestamp_millis()),
                        }),
                    });
                }
                FieldType::Geometry => {
                    for value in values {
                        let bbox = self.coerce_geometry(&record.id, name, value)?;
                        envelope = Some(match envelope {
                            Some(current) => current.union(&bbox),
                            None => bbox,
                        });
                    }
                }
            }
        }

        if !all_terms.is_empty() {
            fields.push(IndexedField {
                name: ALL_FIELDS.to_string(),
                field_type: FieldType::Text,
                terms: all_terms,
                points: Vec::new(),
                sort_value: None,
            });
        }

        Ok(IndexedRecord {
            id: record.id.clone(),
            fields,
            envelope,
        })
    }

    fn textual(&self, id: &RecordId, field: &str, value: &FieldValue) -> Result<String> {
        match value {
            FieldValue::Geometry(_) => Err(Error::invalid_record(format!(
                "record '{}': geometry value on text field '{}'", id, field
            ))),
            other => Ok(other.display()),
        }
    }

    fn coerce_geometry(&self, id: &RecordId, field: &str, value: &FieldValue) -> Result<BoundingBox> {
        let FieldValue::Geometry(bbox) = value else {
            return Err(Error::invalid_record(format!(
                "record '{}': field '{}' expects a geometry", id, field
            )));
        };
        if !bbox.is_well_formed() {
            return Err(Error::invalid_record(format!(
                "record '{}': malformed bounding box on '{}'", id, field
            )));
        }
        if !same_crs(&bbox.crs, &self.catalog_crs) {
            return Err(Error::invalid_record(format!(
                "record '{}': geometry CRS '{}' differs from catalog CRS '{}'",
                id, bbox.crs, self.catalog_crs
            )));
        }
        Ok(bbox.clone())
    }
}

/// Sort companion for a textual value; numeric and temporal readings are kept
/// when the raw text happens to parse, so DOUBLE/DATE sorts still order sensibly
fn textual_sort_value(text: String) -> SortValue {
    SortValue {
        number: parse_number(&text),
        instant: parse_date(&text).map(|(d, _)| d.timestamp_millis()),
        text,
    }
}

fn coerce_number(id: &RecordId, field: &str, value: &FieldValue) -> Result<f64> {
    let parsed = match value {
        FieldValue::Number(n) if n.is_finite() => Some(*n),
        FieldValue::Text(raw) => parse_number(raw),
        _ => None,
    };
    parsed.ok_or_else(|| {
        Error::invalid_record(format!(
            "record '{}': '{}' is not a finite number for field '{}'", id, value.display(), field
        ))
    })
}

fn coerce_date(id: &RecordId, field: &str, value: &FieldValue) -> Result<chrono::DateTime<chrono::Utc>> {
    let parsed = match value {
        FieldValue::Date(instant) => Some(*instant),
        FieldValue::Text(raw) => parse_date(raw).map(|(instant, _)| instant),
        _ => None,
    };
    parsed.ok_or_else(|| {
        Error::invalid_record(format!(
            "record '{}': '{}' is not a date for field '{}'", id, value.display(), field
        ))
    })
}
