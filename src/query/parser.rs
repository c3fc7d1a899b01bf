use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{cut, not, opt, value},
    number::complete::double,
    sequence::{delimited, preceded, terminated},
};
use crate::core::config::{BooleanOperator, Config};
use crate::core::error::{Error, Result};
use crate::core::types::BoundingBox;
use crate::index::dictionary::WildcardPattern;
use crate::query::ast::{Combinator, FilterChain, FilterExpression, RangeBound};

type Res<'a, T> = IResult<&'a str, T>;

const CONSTRAINT: &str = "constraint";

/// Hard ceiling on group and NOT nesting, whatever the configured query depth
const MAX_NESTING: usize = 128;

/// Parses the textual constraint language into a [`FilterChain`].
///
/// ```text
/// expr    := unary ((AND | OR | NOT | AND NOT)? unary)*
/// unary   := NOT unary | primary
/// primary := '(' expr ')' | BBOX(minx,miny,maxx,maxy[,crs]) | *:* | [field ':'] value
/// value   := '[' | '{' bound TO bound ']' | '}'  |  "quoted"  |  bare (may hold * and ?)
/// ```
///
/// Operators fold left to right without precedence. Two terms written side by
/// side are joined with the default operator. A leading `NOT` subtracts from
/// every live record.
#[derive(Debug, Clone)]
pub struct QueryParser {
    pub default_field: String,
    pub default_operator: BooleanOperator,
    /// CRS given to boxes written without one
    pub default_crs: String,
    /// Deepest nesting of groups and NOTs accepted while parsing
    pub max_nesting: usize,
}

impl QueryParser {
    pub fn new(config: &Config) -> Self {
        QueryParser {
            default_field: config.default_field.clone(),
            default_operator: config.default_operator,
            default_crs: config.catalog_crs.clone(),
            max_nesting: config.max_query_depth.min(MAX_NESTING),
        }
    }

    pub fn parse(&self, input: &str) -> Result<FilterChain> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(FilterChain::match_all());
        }

        match self.expression(input, 0) {
            Ok((rest, chain)) => {
                let rest = rest.trim_start();
                if rest.is_empty() {
                    Ok(chain)
                } else {
                    Err(Error::query_syntax(
                        CONSTRAINT,
                        format!("unexpected input at '{}'", excerpt(rest)),
                    ))
                }
            }
            Err(nom::Err::Failure(e)) if e.code == nom::error::ErrorKind::TooLarge => {
                Err(Error::query_syntax(
                    CONSTRAINT,
                    format!("expression nests deeper than {} levels", self.max_nesting),
                ))
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::query_syntax(
                CONSTRAINT,
                format!("cannot parse near '{}'", excerpt(e.input)),
            )),
            Err(nom::Err::Incomplete(_)) => {
                Err(Error::query_syntax(CONSTRAINT, "incomplete expression"))
            }
        }
    }

    fn implicit_combinator(&self) -> Combinator {
        match self.default_operator {
            BooleanOperator::And => Combinator::And,
            BooleanOperator::Or => Combinator::Or,
        }
    }

    /// Fails for good once `depth` passes the nesting ceiling, before recursing further
    fn descend<'a>(&self, i: &'a str, depth: usize) -> Res<'a, usize> {
        if depth >= self.max_nesting {
            return Err(nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::TooLarge)));
        }
        Ok((i, depth + 1))
    }

    fn expression<'a>(&self, i: &'a str, depth: usize) -> Res<'a, FilterChain> {
        let (mut rest, base) = self.unary(i, depth)?;
        let mut children = Vec::new();

        loop {
            let (after_space, _) = space(rest)?;
            if after_space.is_empty() || after_space.starts_with(')') {
                break;
            }

            let (after_operator, combinator) = match operator(after_space) {
                Ok(parsed) => parsed,
                Err(nom::Err::Error(_)) => (after_space, self.implicit_combinator()),
                Err(e) => return Err(e),
            };

            let (after_operand, operand) = self.unary(after_operator, depth)?;
            children.push((combinator, operand));
            rest = after_operand;
        }

        Ok((rest, FilterChain::from_parts(base, children)))
    }

    fn unary<'a>(&self, i: &'a str, depth: usize) -> Res<'a, FilterChain> {
        let (i, _) = space(i)?;
        if let Ok((rest, _)) = (keyword("NOT"), space).parse(i) {
            let (rest, inner) = self.descend(rest, depth)?;
            let (rest, negated) = cut(|i: &'a str| self.unary(i, inner)).parse(rest)?;
            return Ok((rest, FilterChain::match_all().not(negated)));
        }
        self.primary(i, depth)
    }

    fn primary<'a>(&self, i: &'a str, depth: usize) -> Res<'a, FilterChain> {
        if i.starts_with('(') {
            let (i, inner) = self.descend(i, depth)?;
            return delimited(
                (char('('), space),
                cut(|i: &'a str| self.expression(i, inner)),
                cut((space, char(')'))),
            )
            .parse(i);
        }

        alt((
            |i: &'a str| self.bbox(i).map(|(r, e)| (r, FilterChain::leaf(e))),
            |i: &'a str| match_all(i).map(|(r, e)| (r, FilterChain::leaf(e))),
            |i: &'a str| self.term(i).map(|(r, e)| (r, FilterChain::leaf(e))),
        ))
        .parse(i)
    }

    fn bbox<'a>(&self, i: &'a str) -> Res<'a, FilterExpression> {
        let (i, _) = (tag_no_case("BBOX"), space, char('(')).parse(i)?;

        let coordinate = |i: &'a str| delimited(space, double, space).parse(i);
        let (i, (min_x, _, min_y, _, max_x, _, max_y)) = cut((
            coordinate,
            char(','),
            coordinate,
            char(','),
            coordinate,
            char(','),
            coordinate,
        ))
        .parse(i)?;

        let (i, crs) = opt(preceded(
            char(','),
            take_while1(|c: char| c != ')'),
        ))
        .parse(i)?;
        let (i, _) = cut(char(')')).parse(i)?;

        let crs = crs
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_crs.as_str());
        Ok((i, FilterExpression::bbox(BoundingBox::new(min_x, min_y, max_x, max_y, crs))))
    }

    fn term<'a>(&self, i: &'a str) -> Res<'a, FilterExpression> {
        let (i, field) = opt(terminated(take_while1(is_field_char), char(':'))).parse(i)?;

        if i.starts_with('[') || i.starts_with('{') {
            let (rest, (lower, upper)) = range(i)?;
            let field = field.unwrap_or(self.default_field.as_str());
            return Ok((rest, FilterExpression::range(field, lower, upper)));
        }

        if i.starts_with('"') {
            let (rest, literal) = quoted(i)?;
            let field = field.unwrap_or(self.default_field.as_str());
            return Ok((rest, FilterExpression::equals(field, &literal)));
        }

        let (rest, word) = take_while1(is_value_char).parse(i)?;
        if field.is_none() && matches!(word, "AND" | "OR" | "NOT") {
            return Err(nom::Err::Error(nom::error::Error::new(i, nom::error::ErrorKind::Tag)));
        }

        let field = field.unwrap_or(self.default_field.as_str());
        let expression = if WildcardPattern::has_wildcards(word) {
            FilterExpression::wildcard(field, word)
        } else {
            FilterExpression::equals(field, word)
        };
        Ok((rest, expression))
    }
}

fn space(i: &str) -> Res<'_, &str> {
    multispace0(i)
}

fn is_field_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-'
}

fn is_value_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | '[' | ']' | '{' | '}')
}

/// Upper-case keyword not followed by more word characters
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(satisfy(is_value_char)))
}

fn operator(i: &str) -> Res<'_, Combinator> {
    alt((
        value(Combinator::Not, (keyword("AND"), multispace1, keyword("NOT"))),
        value(Combinator::And, keyword("AND")),
        value(Combinator::Or, keyword("OR")),
        value(Combinator::Not, keyword("NOT")),
    ))
    .parse(i)
}

fn match_all(i: &str) -> Res<'_, FilterExpression> {
    value(FilterExpression::match_all(), terminated(tag("*:*"), not(satisfy(is_value_char)))).parse(i)
}

fn range(i: &str) -> Res<'_, (RangeBound, RangeBound)> {
    let (i, open) = alt((char('['), char('{'))).parse(i)?;
    let (i, (_, lower, _, _, _, upper, _, close)) = cut((
        space,
        bound,
        multispace1,
        tag("TO"),
        multispace1,
        bound,
        space,
        alt((char(']'), char('}'))),
    ))
    .parse(i)?;

    let lower = match lower {
        None => RangeBound::Unbounded,
        Some(v) if open == '[' => RangeBound::Inclusive(v),
        Some(v) => RangeBound::Exclusive(v),
    };
    let upper = match upper {
        None => RangeBound::Unbounded,
        Some(v) if close == ']' => RangeBound::Inclusive(v),
        Some(v) => RangeBound::Exclusive(v),
    };
    Ok((i, (lower, upper)))
}

/// `None` for the open-ended `*`
fn bound(i: &str) -> Res<'_, Option<String>> {
    if i.starts_with('"') {
        let (rest, literal) = quoted(i)?;
        return Ok((rest, Some(literal)));
    }
    let (rest, word) =
        take_while1(|c: char| !c.is_whitespace() && c != ']' && c != '}').parse(i)?;
    Ok((rest, if word == "*" { None } else { Some(word.to_string()) }))
}

/// Double-quoted literal; `\"` and `\\` escape
fn quoted(i: &str) -> Res<'_, String> {
    let (body, _) = char('"').parse(i)?;
    let mut literal = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[idx + 1..], literal)),
            '\\' => match chars.next() {
                Some((_, escaped)) => literal.push(escaped),
                None => break,
            },
            other => literal.push(other),
        }
    }
    Err(nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::Char)))
}

fn excerpt(input: &str) -> String {
    input.chars().take(24).collect()
}
