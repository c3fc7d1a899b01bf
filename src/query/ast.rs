use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::types::BoundingBox;

/// How a child chain folds into the accumulated result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combinator {
    /// Intersection
    And,
    /// Union
    Or,
    /// Set difference: removes the child's matches from the accumulator
    Not,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
            Combinator::Not => "NOT",
        }
    }
}

/// One end of a range; literals stay textual until the field type is known
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeBound {
    Unbounded,
    Inclusive(String),
    Exclusive(String),
}

impl RangeBound {
    pub fn literal(&self) -> Option<&str> {
        match self {
            RangeBound::Unbounded => None,
            RangeBound::Inclusive(v) | RangeBound::Exclusive(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    Equals(String),
    Range { lower: RangeBound, upper: RangeBound },
    /// `*` matches any run of characters, `?` exactly one
    Wildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clause {
    /// Field name, or `_all` for every text and keyword field
    pub field: String,
    pub predicate: Predicate,
}

/// Leaf predicate: an optional textual clause and an optional bounding box.
///
/// Both present means both must hold; neither present matches every live record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpression {
    pub clause: Option<Clause>,
    pub spatial: Option<BoundingBox>,
}

impl FilterExpression {
    pub fn match_all() -> Self {
        FilterExpression { clause: None, spatial: None }
    }

    pub fn equals(field: &str, value: &str) -> Self {
        Self::from_clause(field, Predicate::Equals(value.to_string()))
    }

    pub fn range(field: &str, lower: RangeBound, upper: RangeBound) -> Self {
        Self::from_clause(field, Predicate::Range { lower, upper })
    }

    pub fn wildcard(field: &str, pattern: &str) -> Self {
        Self::from_clause(field, Predicate::Wildcard(pattern.to_string()))
    }

    pub fn bbox(bbox: BoundingBox) -> Self {
        FilterExpression { clause: None, spatial: Some(bbox) }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.spatial = Some(bbox);
        self
    }

    fn from_clause(field: &str, predicate: Predicate) -> Self {
        FilterExpression {
            clause: Some(Clause { field: field.to_string(), predicate }),
            spatial: None,
        }
    }
}

/// Filter tree evaluated as a left-to-right fold:
/// `acc = eval(base)`, then each child is combined into `acc` in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterChain {
    Leaf(FilterExpression),
    Chain {
        base: Box<FilterChain>,
        children: Vec<(Combinator, FilterChain)>,
    },
}

impl FilterChain {
    pub fn leaf(expression: FilterExpression) -> Self {
        FilterChain::Leaf(expression)
    }

    pub fn match_all() -> Self {
        FilterChain::Leaf(FilterExpression::match_all())
    }

    /// Chain with no children collapses to its base
    pub fn from_parts(base: FilterChain, children: Vec<(Combinator, FilterChain)>) -> Self {
        if children.is_empty() {
            base
        } else {
            FilterChain::Chain { base: Box::new(base), children }
        }
    }

    pub fn and(self, other: impl Into<FilterChain>) -> Self {
        self.push(Combinator::And, other.into())
    }

    pub fn or(self, other: impl Into<FilterChain>) -> Self {
        self.push(Combinator::Or, other.into())
    }

    pub fn not(self, other: impl Into<FilterChain>) -> Self {
        self.push(Combinator::Not, other.into())
    }

    /// Appending keeps the fold order, so an existing chain is extended in place
    pub fn push(self, combinator: Combinator, other: FilterChain) -> Self {
        match self {
            FilterChain::Chain { base, mut children } => {
                children.push((combinator, other));
                FilterChain::Chain { base, children }
            }
            leaf => FilterChain::Chain {
                base: Box::new(leaf),
                children: vec![(combinator, other)],
            },
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            FilterChain::Leaf(_) => 1,
            FilterChain::Chain { base, children } => {
                let deepest = children.iter().map(|(_, c)| c.depth()).max().unwrap_or(0);
                1 + base.depth().max(deepest)
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            FilterChain::Leaf(_) => 1,
            FilterChain::Chain { base, children } => {
                base.leaf_count() + children.iter().map(|(_, c)| c.leaf_count()).sum::<usize>()
            }
        }
    }

    /// Visit every leaf expression, depth first
    pub fn for_each_leaf<'a>(&'a self, visit: &mut dyn FnMut(&'a FilterExpression)) {
        match self {
            FilterChain::Leaf(expression) => visit(expression),
            FilterChain::Chain { base, children } => {
                base.for_each_leaf(visit);
                for (_, child) in children {
                    child.for_each_leaf(visit);
                }
            }
        }
    }
}

impl From<FilterExpression> for FilterChain {
    fn from(expression: FilterExpression) -> Self {
        FilterChain::Leaf(expression)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

fn write_bbox(f: &mut fmt::Formatter<'_>, b: &BoundingBox) -> fmt::Result {
    write!(f, "BBOX({},{},{},{},{})", b.min_x, b.min_y, b.max_x, b.max_y, b.crs)
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.field)?;
        match &self.predicate {
            Predicate::Equals(value) => write_quoted(f, value),
            Predicate::Wildcard(pattern) => f.write_str(pattern),
            Predicate::Range { lower, upper } => {
                f.write_str(if matches!(lower, RangeBound::Exclusive(_)) { "{" } else { "[" })?;
                match lower.literal() {
                    Some(v) => write_quoted(f, v)?,
                    None => f.write_str("*")?,
                }
                f.write_str(" TO ")?;
                match upper.literal() {
                    Some(v) => write_quoted(f, v)?,
                    None => f.write_str("*")?,
                }
                f.write_str(if matches!(upper, RangeBound::Exclusive(_)) { "}" } else { "]" })
            }
        }
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.clause, &self.spatial) {
            (None, None) => f.write_str("*:*"),
            (Some(clause), None) => write!(f, "{}", clause),
            (None, Some(b)) => write_bbox(f, b),
            (Some(clause), Some(b)) => {
                write!(f, "({} AND ", clause)?;
                write_bbox(f, b)?;
                f.write_str(")")
            }
        }
    }
}

/// Renders the textual constraint language; parsing the output yields an
/// equivalent chain
impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterChain::Leaf(expression) => write!(f, "{}", expression),
            FilterChain::Chain { base, children } => {
                write!(f, "({}", base)?;
                for (combinator, child) in children {
                    write!(f, " {} {}", combinator.as_str(), child)?;
                }
                f.write_str(")")
            }
        }
    }
}
