//! Query filters.
//!
//! A filter document is parsed once into a [`Filter`] and then evaluated
//! against every candidate document. Parsing rejects unknown operators and
//! malformed operands so a bad query fails even on an empty collection.

use bson::{Bson, Document};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

use crate::server::{
    error::store::StoreError,
    store::value::{self, compare, equals, lookup, same_bracket},
};

#[derive(Debug, Clone)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
enum Clause {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Field { path: String, predicates: Vec<Predicate> },
}

#[derive(Debug, Clone)]
enum Predicate {
    Eq(Bson),
    Ne(Bson),
    Cmp(Ordering, bool, Bson),
    In(Vec<Bson>),
    Nin(Vec<Bson>),
    Exists(bool),
    Not(Vec<Predicate>),
    Regex(Regex),
    Size(usize),
    All(Vec<Bson>),
    ElemMatch(ElemMatch),
}

#[derive(Debug, Clone)]
enum ElemMatch {
    Document(Filter),
    Value(Vec<Predicate>),
}

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::InvalidFilter(msg.into())
}

/// Whether a value is an operator document such as `{"$gt": 1}`.
pub(crate) fn is_operator_document(value: &Bson) -> bool {
    match value {
        Bson::Document(doc) => doc.keys().next().is_some_and(|k| k.starts_with('$')),
        _ => false,
    }
}

impl Filter {
    /// Filter matching every document.
    pub fn all() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    pub fn parse(filter: &Document) -> Result<Self, StoreError> {
        let mut clauses = Vec::with_capacity(filter.len());
        for (key, cond) in filter {
            let clause = match key.as_str() {
                "$and" => Clause::And(parse_list(key, cond)?),
                "$or" => Clause::Or(parse_list(key, cond)?),
                "$nor" => Clause::Nor(parse_list(key, cond)?),
                op if op.starts_with('$') => {
                    return Err(invalid(format!("unknown top level operator: {op}")))
                }
                path => Clause::Field {
                    path: path.to_string(),
                    predicates: parse_condition(cond)?,
                },
            };
            clauses.push(clause);
        }
        Ok(Self { clauses })
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Clause::Or(filters) => filters.iter().any(|f| f.matches(doc)),
            Clause::Nor(filters) => !filters.iter().any(|f| f.matches(doc)),
            Clause::Field { path, predicates } => {
                let values = lookup(doc, path);
                predicates.iter().all(|p| p.matches(&values))
            }
        })
    }

    /// The `_id` value when the filter pins it with plain equality, letting the
    /// store narrow the scan to a single row.
    pub fn id_equality(&self) -> Option<&Bson> {
        self.clauses.iter().find_map(|clause| match clause {
            Clause::Field { path, predicates } if path == "_id" => match predicates.as_slice() {
                [Predicate::Eq(value)] if !matches!(value, Bson::Null) => Some(value),
                _ => None,
            },
            _ => None,
        })
    }

    /// Document seeded from the filter's equality conditions, used as the base
    /// of an upserted document.
    pub fn equality_seed(&self) -> Result<Document, StoreError> {
        let mut seed = Document::new();
        self.collect_seed(&mut seed)?;
        Ok(seed)
    }

    fn collect_seed(&self, seed: &mut Document) -> Result<(), StoreError> {
        for clause in &self.clauses {
            match clause {
                Clause::And(filters) => {
                    for filter in filters {
                        filter.collect_seed(seed)?;
                    }
                }
                Clause::Field { path, predicates } => {
                    for predicate in predicates {
                        if let Predicate::Eq(value) = predicate {
                            value::set_path(seed, path, value.clone())?;
                        }
                    }
                }
                Clause::Or(_) | Clause::Nor(_) => {}
            }
        }
        Ok(())
    }
}

fn parse_list(op: &str, cond: &Bson) -> Result<Vec<Filter>, StoreError> {
    let Bson::Array(items) = cond else {
        return Err(invalid(format!("{op} must be an array")));
    };
    if items.is_empty() {
        return Err(invalid(format!("{op} must be a nonempty array")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(doc) => Filter::parse(doc),
            _ => Err(invalid(format!("{op} entries must be objects"))),
        })
        .collect()
}

fn parse_condition(cond: &Bson) -> Result<Vec<Predicate>, StoreError> {
    match cond {
        Bson::Document(ops) if is_operator_document(cond) => parse_operators(ops),
        Bson::RegularExpression(regex) => Ok(vec![Predicate::Regex(build_regex(
            &regex.pattern,
            &regex.options,
        )?)]),
        other => Ok(vec![Predicate::Eq(other.clone())]),
    }
}

fn parse_operators(ops: &Document) -> Result<Vec<Predicate>, StoreError> {
    let mut predicates = Vec::with_capacity(ops.len());
    let options = match ops.get("$options") {
        Some(Bson::String(options)) => Some(options.as_str()),
        Some(_) => return Err(invalid("$options has to be a string")),
        None => None,
    };

    for (op, operand) in ops {
        let predicate = match op.as_str() {
            "$eq" => Predicate::Eq(operand.clone()),
            "$ne" => Predicate::Ne(operand.clone()),
            "$gt" => Predicate::Cmp(Ordering::Greater, false, operand.clone()),
            "$gte" => Predicate::Cmp(Ordering::Greater, true, operand.clone()),
            "$lt" => Predicate::Cmp(Ordering::Less, false, operand.clone()),
            "$lte" => Predicate::Cmp(Ordering::Less, true, operand.clone()),
            "$in" => Predicate::In(array_operand(op, operand)?),
            "$nin" => Predicate::Nin(array_operand(op, operand)?),
            "$all" => Predicate::All(array_operand(op, operand)?),
            "$exists" => Predicate::Exists(value::is_truthy(operand)),
            "$size" => match value::Number::of(operand) {
                Some(value::Number::Int(n)) if n >= 0 => Predicate::Size(n as usize),
                _ => return Err(invalid("$size needs a non-negative integer")),
            },
            "$not" => match operand {
                Bson::Document(inner) if is_operator_document(operand) => {
                    Predicate::Not(parse_operators(inner)?)
                }
                Bson::RegularExpression(regex) => Predicate::Not(vec![Predicate::Regex(
                    build_regex(&regex.pattern, &regex.options)?,
                )]),
                _ => return Err(invalid("$not needs a regex or a document")),
            },
            "$regex" => match operand {
                Bson::String(pattern) => {
                    Predicate::Regex(build_regex(pattern, options.unwrap_or_default())?)
                }
                Bson::RegularExpression(regex) => Predicate::Regex(build_regex(
                    &regex.pattern,
                    options.unwrap_or(&regex.options),
                )?),
                _ => return Err(invalid("$regex has to be a string")),
            },
            "$options" => continue,
            "$elemMatch" => match operand {
                Bson::Document(inner) if is_operator_document(operand) => {
                    Predicate::ElemMatch(ElemMatch::Value(parse_operators(inner)?))
                }
                Bson::Document(inner) => {
                    Predicate::ElemMatch(ElemMatch::Document(Filter::parse(inner)?))
                }
                _ => return Err(invalid("$elemMatch needs an object")),
            },
            unknown => return Err(invalid(format!("unknown operator: {unknown}"))),
        };
        predicates.push(predicate);
    }

    if options.is_some() && !ops.contains_key("$regex") {
        return Err(invalid("$options needs a $regex"));
    }
    Ok(predicates)
}

fn array_operand(op: &str, operand: &Bson) -> Result<Vec<Bson>, StoreError> {
    match operand {
        Bson::Array(items) => Ok(items.clone()),
        _ => Err(invalid(format!("{op} needs an array"))),
    }
}

fn build_regex(pattern: &str, options: &str) -> Result<Regex, StoreError> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => return Err(invalid(format!("invalid regex flag: {other}"))),
        };
    }
    builder
        .build()
        .map_err(|err| invalid(format!("invalid regex {pattern:?}: {err}")))
}

/// Each value plus, for arrays, each element.
fn candidates<'a>(values: &'a [&'a Bson]) -> impl Iterator<Item = &'a Bson> + 'a {
    values.iter().flat_map(|value| {
        let elements: &'a [Bson] = match value {
            Bson::Array(items) => items.as_slice(),
            _ => &[],
        };
        std::iter::once(*value).chain(elements.iter())
    })
}

fn eq_matches(values: &[&Bson], target: &Bson) -> bool {
    if matches!(target, Bson::Null) {
        // null matches a missing field as well as an explicit null
        return values.is_empty() || candidates(values).any(|v| matches!(v, Bson::Null | Bson::Undefined));
    }
    candidates(values).any(|v| equals(v, target))
}

impl Predicate {
    fn matches(&self, values: &[&Bson]) -> bool {
        match self {
            Self::Eq(target) => eq_matches(values, target),
            Self::Ne(target) => !eq_matches(values, target),
            Self::Cmp(direction, inclusive, target) => {
                if matches!(target, Bson::Null) {
                    return *inclusive && eq_matches(values, target);
                }
                candidates(values).any(|v| {
                    if !same_bracket(v, target) {
                        return false;
                    }
                    let ordering = compare(v, target);
                    ordering == *direction || (*inclusive && ordering == Ordering::Equal)
                })
            }
            Self::In(targets) => targets.iter().any(|t| eq_matches(values, t)),
            Self::Nin(targets) => !targets.iter().any(|t| eq_matches(values, t)),
            Self::Exists(expected) => values.is_empty() != *expected,
            Self::Not(predicates) => !predicates.iter().all(|p| p.matches(values)),
            Self::Regex(regex) => candidates(values).any(|v| match v {
                Bson::String(s) | Bson::Symbol(s) => regex.is_match(s),
                _ => false,
            }),
            Self::Size(size) => values
                .iter()
                .any(|v| matches!(v, Bson::Array(items) if items.len() == *size)),
            Self::All(targets) => {
                !targets.is_empty() && targets.iter().all(|t| eq_matches(values, t))
            }
            Self::ElemMatch(elem_match) => values.iter().any(|v| {
                let Bson::Array(items) = v else {
                    return false;
                };
                items.iter().any(|item| match elem_match {
                    ElemMatch::Document(filter) => {
                        matches!(item, Bson::Document(doc) if filter.matches(doc))
                    }
                    ElemMatch::Value(predicates) => {
                        predicates.iter().all(|p| p.matches(&[item]))
                    }
                })
            }),
        }
    }
}
