//! Update documents (`{"$set": {...}, "$inc": {...}}`).

use bson::{Bson, DateTime, Document};
use std::cmp::Ordering;

use crate::server::{
    error::store::StoreError,
    store::{
        filter::{is_operator_document, Filter},
        value::{self, compare, equals, get_path, get_path_mut, remove_path, set_path, Number},
    },
};

#[derive(Debug, Clone)]
pub struct Update {
    ops: Vec<(Operator, Document)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Set,
    Unset,
    Inc,
    Mul,
    Min,
    Max,
    Rename,
    Push,
    AddToSet,
    Pull,
    Pop,
    SetOnInsert,
    CurrentDate,
}

impl Operator {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "$set" => Self::Set,
            "$unset" => Self::Unset,
            "$inc" => Self::Inc,
            "$mul" => Self::Mul,
            "$min" => Self::Min,
            "$max" => Self::Max,
            "$rename" => Self::Rename,
            "$push" => Self::Push,
            "$addToSet" => Self::AddToSet,
            "$pull" => Self::Pull,
            "$pop" => Self::Pop,
            "$setOnInsert" => Self::SetOnInsert,
            "$currentDate" => Self::CurrentDate,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::Set => "$set",
            Self::Unset => "$unset",
            Self::Inc => "$inc",
            Self::Mul => "$mul",
            Self::Min => "$min",
            Self::Max => "$max",
            Self::Rename => "$rename",
            Self::Push => "$push",
            Self::AddToSet => "$addToSet",
            Self::Pull => "$pull",
            Self::Pop => "$pop",
            Self::SetOnInsert => "$setOnInsert",
            Self::CurrentDate => "$currentDate",
        }
    }
}

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::InvalidUpdate(msg.into())
}

impl Update {
    /// Parses an update document. Every top-level key must be a known update
    /// operator mapping to a document; replacement-style updates are rejected.
    pub fn parse(update: &Document) -> Result<Self, StoreError> {
        if update.is_empty() {
            return Err(invalid("update document must not be empty"));
        }
        let mut ops = Vec::with_capacity(update.len());
        for (key, fields) in update {
            let Some(op) = Operator::parse(key) else {
                return Err(if key.starts_with('$') {
                    invalid(format!("unknown update operator: {key}"))
                } else {
                    invalid("update document requires atomic operators")
                });
            };
            let Bson::Document(fields) = fields else {
                return Err(invalid(format!("{key} needs an object")));
            };
            ops.push((op, fields.clone()));
        }
        Ok(Self { ops })
    }

    /// Applies the update in place and reports whether the document changed.
    ///
    /// `inserting` enables `$setOnInsert`. `_id` may only change while
    /// inserting.
    pub fn apply(&self, doc: &mut Document, inserting: bool) -> Result<bool, StoreError> {
        let before = doc.clone();
        let now = DateTime::now();

        for (op, fields) in &self.ops {
            for (path, operand) in fields {
                apply_one(*op, doc, path, operand, inserting, now)?;
            }
        }

        if !inserting && before.get("_id") != doc.get("_id") {
            return Err(invalid(
                "Performing an update on the path '_id' would modify the immutable field '_id'",
            ));
        }
        Ok(*doc != before)
    }
}

fn apply_one(
    op: Operator,
    doc: &mut Document,
    path: &str,
    operand: &Bson,
    inserting: bool,
    now: DateTime,
) -> Result<(), StoreError> {
    match op {
        Operator::Set => set_path(doc, path, operand.clone()),
        Operator::SetOnInsert if inserting => set_path(doc, path, operand.clone()),
        Operator::SetOnInsert => Ok(()),
        Operator::Unset => {
            remove_path(doc, path);
            Ok(())
        }
        Operator::Inc | Operator::Mul => {
            let Some(delta) = Number::of(operand) else {
                return Err(invalid(format!("Cannot {} with non-numeric argument", op.name())));
            };
            let current = match get_path(doc, path) {
                None => None,
                Some(existing) => Some(Number::of(existing).ok_or_else(|| {
                    invalid(format!(
                        "Cannot apply {} to a value of non-numeric type at path '{path}'",
                        op.name()
                    ))
                })?),
            };
            let narrow = matches!(operand, Bson::Int32(_))
                && get_path(doc, path).map_or(true, |v| matches!(v, Bson::Int32(_)));
            let result = match (op, current) {
                (Operator::Inc, Some(current)) => current.add(delta),
                (Operator::Inc, None) => delta,
                (_, Some(current)) => current.mul(delta),
                (_, None) => match delta {
                    Number::Int(_) => Number::Int(0),
                    Number::Float(_) => Number::Float(0.0),
                },
            };
            set_path(doc, path, result.into_bson(narrow))
        }
        Operator::Min | Operator::Max => {
            let wanted = if op == Operator::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let replace = match get_path(doc, path) {
                None => true,
                Some(existing) => compare(operand, existing) == wanted,
            };
            if replace {
                set_path(doc, path, operand.clone())?;
            }
            Ok(())
        }
        Operator::Rename => {
            let Bson::String(target) = operand else {
                return Err(invalid("$rename target must be a string"));
            };
            if target == path {
                return Err(invalid("$rename source and target must differ"));
            }
            if let Some(value) = remove_path(doc, path) {
                set_path(doc, target, value)?;
            }
            Ok(())
        }
        Operator::Push | Operator::AddToSet => {
            let values = each_values(operand);
            let array = array_at(doc, path, op)?;
            for value in values {
                if op == Operator::AddToSet && array.iter().any(|v| equals(v, &value)) {
                    continue;
                }
                array.push(value);
            }
            Ok(())
        }
        Operator::Pull => {
            let condition = PullCondition::parse(operand)?;
            if let Some(existing) = get_path_mut(doc, path) {
                let Bson::Array(items) = existing else {
                    return Err(invalid(format!("Cannot apply $pull to a non-array value at '{path}'")));
                };
                items.retain(|item| !condition.matches(item));
            }
            Ok(())
        }
        Operator::Pop => {
            let from_front = match Number::of(operand) {
                Some(n) if n.as_f64() == -1.0 => true,
                Some(n) if n.as_f64() == 1.0 => false,
                _ => return Err(invalid("$pop expects 1 or -1")),
            };
            if let Some(existing) = get_path_mut(doc, path) {
                let Bson::Array(items) = existing else {
                    return Err(invalid(format!("Cannot apply $pop to a non-array value at '{path}'")));
                };
                if from_front {
                    if !items.is_empty() {
                        items.remove(0);
                    }
                } else {
                    items.pop();
                }
            }
            Ok(())
        }
        Operator::CurrentDate => match operand {
            Bson::Boolean(true) => set_path(doc, path, Bson::DateTime(now)),
            Bson::Document(spec)
                if matches!(spec.get("$type"), Some(Bson::String(t)) if t == "date" || t == "timestamp") =>
            {
                set_path(doc, path, Bson::DateTime(now))
            }
            _ => Err(invalid("$currentDate expects true or {$type: \"date\"}")),
        },
    }
}

/// `{"$each": [...]}` expands to its items, anything else is a single value.
fn each_values(operand: &Bson) -> Vec<Bson> {
    match operand {
        Bson::Document(spec) => match spec.get("$each") {
            Some(Bson::Array(items)) => items.clone(),
            _ => vec![operand.clone()],
        },
        other => vec![other.clone()],
    }
}

fn array_at<'a>(
    doc: &'a mut Document,
    path: &str,
    op: Operator,
) -> Result<&'a mut Vec<Bson>, StoreError> {
    if get_path(doc, path).is_none() {
        set_path(doc, path, Bson::Array(Vec::new()))?;
    }
    match get_path_mut(doc, path) {
        Some(Bson::Array(items)) => Ok(items),
        _ => Err(invalid(format!(
            "The field '{path}' must be an array to apply {}",
            op.name()
        ))),
    }
}

enum PullCondition {
    Value(Bson),
    Predicates(Filter),
    Document(Filter),
}

impl PullCondition {
    fn parse(operand: &Bson) -> Result<Self, StoreError> {
        Ok(match operand {
            Bson::Document(_) if is_operator_document(operand) => {
                // Evaluate the operators against the element itself by wrapping
                // it under a synthetic key.
                let mut wrapper = Document::new();
                wrapper.insert("v", operand.clone());
                Self::Predicates(Filter::parse(&wrapper)?)
            }
            Bson::Document(inner) => Self::Document(Filter::parse(inner)?),
            other => Self::Value(other.clone()),
        })
    }

    fn matches(&self, item: &Bson) -> bool {
        match self {
            Self::Value(value) => equals(item, value),
            Self::Predicates(filter) => {
                let mut wrapper = Document::new();
                wrapper.insert("v", item.clone());
                filter.matches(&wrapper)
            }
            Self::Document(filter) => {
                matches!(item, Bson::Document(doc) if filter.matches(doc))
            }
        }
    }
}
