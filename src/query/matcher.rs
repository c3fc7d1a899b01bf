use std::ops::Bound;
use chrono::{Days, DateTime, Utc};
use roaring::RoaringBitmap;
use crate::analysis::analyzer::{AnalyzerRegistry, KEYWORD_ANALYZER};
use crate::core::error::{Error, Result};
use crate::index::dictionary::WildcardPattern;
use crate::index::inverted::FieldPostings;
use crate::index::point::{date_key, number_key, parse_date, parse_number, DatePrecision, PointKey};
use crate::index::spatial::intersecting;
use crate::mvcc::controller::Snapshot;
use crate::query::ast::{Clause, Combinator, FilterChain, FilterExpression, Predicate, RangeBound};
use crate::schema::schema::{FieldType, Schema};

/// Evaluates filter chains against one snapshot.
///
/// Every leaf result is masked by the snapshot's live set, so tombstoned
/// ordinals never leak through unions or differences.
pub struct FilterMatcher<'a> {
    snapshot: &'a Snapshot,
    schema: &'a Schema,
    analyzers: &'a AnalyzerRegistry,
}

impl<'a> FilterMatcher<'a> {
    pub fn new(snapshot: &'a Snapshot, schema: &'a Schema, analyzers: &'a AnalyzerRegistry) -> Self {
        FilterMatcher { snapshot, schema, analyzers }
    }

    pub fn evaluate(&self, chain: &FilterChain) -> Result<RoaringBitmap> {
        match chain {
            FilterChain::Leaf(expression) => self.evaluate_expression(expression),
            FilterChain::Chain { base, children } => {
                let mut acc = self.evaluate(base)?;
                for (combinator, child) in children {
                    // children are still evaluated on an empty accumulator so a
                    // malformed literal anywhere aborts the search
                    let matches = self.evaluate(child)?;
                    match combinator {
                        Combinator::And => acc &= matches,
                        Combinator::Or => acc |= matches,
                        Combinator::Not => acc -= matches,
                    }
                }
                Ok(acc)
            }
        }
    }

    pub fn evaluate_expression(&self, expression: &FilterExpression) -> Result<RoaringBitmap> {
        let live = &self.snapshot.index.live;

        let mut matches = match &expression.clause {
            Some(clause) => self.evaluate_clause(clause)? & live,
            None => live.clone(),
        };

        if let Some(bbox) = &expression.spatial {
            matches &= intersecting(&self.snapshot.index.geometries, bbox);
        }
        Ok(matches)
    }

    fn evaluate_clause(&self, clause: &Clause) -> Result<RoaringBitmap> {
        let field_type = self.schema.field_type(&clause.field);
        let postings = self.snapshot.index.field(&clause.field);

        match (&clause.predicate, field_type) {
            (_, FieldType::Geometry) => Err(Error::query_syntax(
                "constraint",
                format!("field '{}' holds geometries; use BBOX", clause.field),
            )),

            (Predicate::Equals(literal), FieldType::Text | FieldType::Keyword) => {
                let analyzer = self.analyzers.require(self.schema.analyzer_for(&clause.field))?;
                let terms = analyzer.terms(literal);
                let Some(postings) = postings else {
                    return Ok(RoaringBitmap::new());
                };
                if terms.is_empty() {
                    return Ok(RoaringBitmap::new());
                }
                // every token of the literal must be present
                let mut acc: Option<RoaringBitmap> = None;
                for term in &terms {
                    let docs = postings.term(term).cloned().unwrap_or_default();
                    acc = Some(match acc {
                        Some(current) => current & docs,
                        None => docs,
                    });
                }
                Ok(acc.unwrap_or_default())
            }

            (Predicate::Equals(literal), FieldType::Number) => {
                let key = number_key(number_literal(&clause.field, literal)?);
                Ok(points(postings, Bound::Included(key), Bound::Included(key)))
            }

            (Predicate::Equals(literal), FieldType::Date) => {
                let (instant, precision) = date_literal(&clause.field, literal)?;
                let (lower, upper) = match precision {
                    DatePrecision::Instant => {
                        let key = date_key(&instant);
                        (Bound::Included(key), Bound::Included(key))
                    }
                    DatePrecision::Day => (
                        Bound::Included(date_key(&instant)),
                        Bound::Excluded(date_key(&next_day(instant))),
                    ),
                };
                Ok(points(postings, lower, upper))
            }

            (Predicate::Range { lower, upper }, FieldType::Text | FieldType::Keyword) => {
                let Some(postings) = postings else {
                    return Ok(RoaringBitmap::new());
                };
                let lower = lower.literal().map(|v| self.normalize_term(&clause.field, v)).transpose()?;
                let upper = upper.literal().map(|v| self.normalize_term(&clause.field, v)).transpose()?;
                let lower_bound = text_bound(&clause.predicate, true, lower.as_deref());
                let upper_bound = text_bound(&clause.predicate, false, upper.as_deref());
                Ok(postings.term_range(lower_bound, upper_bound))
            }

            (Predicate::Range { lower, upper }, FieldType::Number) => {
                let lower = point_bound(lower, |v| number_literal(&clause.field, v).map(number_key))?;
                let upper = point_bound(upper, |v| number_literal(&clause.field, v).map(number_key))?;
                Ok(points(postings, lower, upper))
            }

            (Predicate::Range { lower, upper }, FieldType::Date) => {
                let lower = date_bound(&clause.field, lower, true)?;
                let upper = date_bound(&clause.field, upper, false)?;
                Ok(points(postings, lower, upper))
            }

            (Predicate::Wildcard(pattern), FieldType::Text | FieldType::Keyword) => {
                let pattern = if self.schema.analyzer_for(&clause.field) == KEYWORD_ANALYZER {
                    WildcardPattern::compile(pattern)?
                } else {
                    WildcardPattern::compile(&pattern.to_lowercase())?
                };
                let (Some(postings), Some(dictionary)) = (postings, self.snapshot.dictionary(&clause.field)) else {
                    return Ok(RoaringBitmap::new());
                };
                Ok(dictionary
                    .expand(&pattern)
                    .iter()
                    .filter_map(|term| postings.term(term))
                    .fold(RoaringBitmap::new(), |acc, docs| acc | docs))
            }

            (Predicate::Wildcard(_), FieldType::Number | FieldType::Date) => Err(Error::query_syntax(
                "constraint",
                format!("wildcards are not supported on {:?} field '{}'", field_type, clause.field),
            )),
        }
    }

    /// Range bounds on text go through the field's analyzer when it yields a single term
    fn normalize_term(&self, field: &str, raw: &str) -> Result<String> {
        let analyzer = self.analyzers.require(self.schema.analyzer_for(field))?;
        let mut terms = analyzer.terms(raw);
        Ok(if terms.len() == 1 { terms.remove(0) } else { raw.to_string() })
    }
}

fn points(postings: Option<&FieldPostings>, lower: Bound<PointKey>, upper: Bound<PointKey>) -> RoaringBitmap {
    postings
        .map(|p| p.point_range(lower, upper))
        .unwrap_or_default()
}

fn text_bound<'s>(predicate: &Predicate, is_lower: bool, value: Option<&'s str>) -> Bound<&'s str> {
    let Predicate::Range { lower, upper } = predicate else {
        return Bound::Unbounded;
    };
    let side = if is_lower { lower } else { upper };
    match (side, value) {
        (RangeBound::Inclusive(_), Some(v)) => Bound::Included(v),
        (RangeBound::Exclusive(_), Some(v)) => Bound::Excluded(v),
        _ => Bound::Unbounded,
    }
}

fn point_bound(bound: &RangeBound, key: impl Fn(&str) -> Result<PointKey>) -> Result<Bound<PointKey>> {
    Ok(match bound {
        RangeBound::Unbounded => Bound::Unbounded,
        RangeBound::Inclusive(v) => Bound::Included(key(v)?),
        RangeBound::Exclusive(v) => Bound::Excluded(key(v)?),
    })
}

/// A date-only bound covers its whole UTC day
fn date_bound(field: &str, bound: &RangeBound, is_lower: bool) -> Result<Bound<PointKey>> {
    let (literal, inclusive) = match bound {
        RangeBound::Unbounded => return Ok(Bound::Unbounded),
        RangeBound::Inclusive(v) => (v, true),
        RangeBound::Exclusive(v) => (v, false),
    };
    let (instant, precision) = date_literal(field, literal)?;

    Ok(match (precision, is_lower, inclusive) {
        (DatePrecision::Instant, _, true) => Bound::Included(date_key(&instant)),
        (DatePrecision::Instant, _, false) => Bound::Excluded(date_key(&instant)),
        // [day TO   starts at midnight;   {day TO   starts the day after
        (DatePrecision::Day, true, true) => Bound::Included(date_key(&instant)),
        (DatePrecision::Day, true, false) => Bound::Included(date_key(&next_day(instant))),
        // TO day]   ends before the next midnight;   TO day}   ends before this one
        (DatePrecision::Day, false, true) => Bound::Excluded(date_key(&next_day(instant))),
        (DatePrecision::Day, false, false) => Bound::Excluded(date_key(&instant)),
    })
}

fn next_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.checked_add_days(Days::new(1)).unwrap_or(instant)
}

fn number_literal(field: &str, literal: &str) -> Result<f64> {
    parse_number(literal).ok_or_else(|| {
        Error::query_syntax("constraint", format!("'{}' is not a number for field '{}'", literal, field))
    })
}

fn date_literal(field: &str, literal: &str) -> Result<(DateTime<Utc>, DatePrecision)> {
    parse_date(literal).ok_or_else(|| {
        Error::query_syntax("constraint", format!("'{}' is not a date for field '{}'", literal, field))
    })
}
