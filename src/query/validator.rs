use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::index::spatial::same_crs;
use crate::query::ast::{FilterChain, FilterExpression, Predicate};

/// Structural checks run before a chain touches the index
#[derive(Debug, Clone)]
pub struct QueryValidator {
    pub max_depth: usize,
    pub max_clauses: usize,
    pub catalog_crs: String,
}

impl QueryValidator {
    pub fn new(config: &Config) -> Self {
        QueryValidator {
            max_depth: config.max_query_depth,
            max_clauses: config.max_bool_clauses,
            catalog_crs: config.catalog_crs.clone(),
        }
    }

    pub fn validate(&self, chain: &FilterChain) -> Result<()> {
        let depth = chain.depth();
        if depth > self.max_depth {
            return Err(Error::query_syntax(
                "constraint",
                format!("filter nests {} levels, limit is {}", depth, self.max_depth),
            ));
        }

        let clauses = chain.leaf_count();
        if clauses > self.max_clauses {
            return Err(Error::query_syntax(
                "constraint",
                format!("filter has {} clauses, limit is {}", clauses, self.max_clauses),
            ));
        }

        let mut outcome = Ok(());
        chain.for_each_leaf(&mut |expression| {
            if outcome.is_ok() {
                outcome = self.validate_expression(expression);
            }
        });
        outcome
    }

    fn validate_expression(&self, expression: &FilterExpression) -> Result<()> {
        if let Some(clause) = &expression.clause {
            if clause.field.trim().is_empty() {
                return Err(Error::query_syntax("constraint", "empty field name"));
            }
            if let Predicate::Wildcard(pattern) = &clause.predicate {
                if pattern.is_empty() {
                    return Err(Error::query_syntax("constraint", "empty wildcard pattern"));
                }
            }
        }

        if let Some(bbox) = &expression.spatial {
            if !bbox.is_well_formed() {
                return Err(Error::query_syntax(
                    "bbox",
                    format!(
                        "bounding box ({}, {}, {}, {}) must have finite corners with min <= max",
                        bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
                    ),
                ));
            }
            if !same_crs(&bbox.crs, &self.catalog_crs) {
                return Err(Error::query_syntax(
                    "crs",
                    format!("'{}' is not the catalog CRS '{}'", bbox.crs, self.catalog_crs),
                ));
            }
        }
        Ok(())
    }
}
