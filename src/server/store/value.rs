//! Ordering, equality and path access for BSON values.
//!
//! Comparison follows MongoDB's type brackets: values of different brackets are
//! ordered by bracket, numbers of any width compare numerically, documents and
//! arrays compare element by element.

use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::server::error::store::StoreError;

/// Numeric view of a BSON value used for cross-width arithmetic and ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn of(value: &Bson) -> Option<Self> {
        match value {
            Bson::Int32(v) => Some(Self::Int(i64::from(*v))),
            Bson::Int64(v) => Some(Self::Int(*v)),
            Bson::Double(v) => Some(Self::Float(*v)),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    pub fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => match a.checked_add(b) {
                Some(sum) => Self::Int(sum),
                None => Self::Float(a as f64 + b as f64),
            },
            (a, b) => Self::Float(a.as_f64() + b.as_f64()),
        }
    }

    pub fn mul(self, other: Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => match a.checked_mul(b) {
                Some(product) => Self::Int(product),
                None => Self::Float(a as f64 * b as f64),
            },
            (a, b) => Self::Float(a.as_f64() * b.as_f64()),
        }
    }

    /// Converts back to BSON, narrowing integers to `Int32` when `narrow` is set
    /// and the value fits.
    pub fn into_bson(self, narrow: bool) -> Bson {
        match self {
            Self::Int(v) if narrow => match i32::try_from(v) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(v),
            },
            Self::Int(v) => Bson::Int64(v),
            Self::Float(v) => Bson::Double(v),
        }
    }

    fn cmp_total(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(&b),
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                // NaN sorts below every other number
                a.partial_cmp(&b)
                    .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()).reverse())
            }
        }
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::DbPointer(_) => 12,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 13,
        Bson::MaxKey => 14,
    }
}

/// Whether two values belong to the same comparison bracket.
pub fn same_bracket(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b)
}

fn text(value: &Bson) -> Option<&str> {
    match value {
        Bson::String(s) | Bson::Symbol(s) => Some(s),
        _ => None,
    }
}

/// Total order over BSON values.
pub fn compare(a: &Bson, b: &Bson) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    if let (Some(x), Some(y)) = (Number::of(a), Number::of(b)) {
        return x.cmp_total(y);
    }
    if let (Some(x), Some(y)) = (text(a), text(b)) {
        return x.cmp(y);
    }

    match (a, b) {
        (Bson::Document(x), Bson::Document(y)) => compare_documents(x, y),
        (Bson::Array(x), Bson::Array(y)) => compare_arrays(x, y),
        (Bson::Binary(x), Bson::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then_with(|| x.bytes.cmp(&y.bytes)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => x
            .pattern
            .cmp(&y.pattern)
            .then_with(|| x.options.cmp(&y.options)),
        (Bson::Decimal128(x), Bson::Decimal128(y)) => x.bytes().cmp(&y.bytes()),
        // Mixed decimal/native numbers and the remaining exotic kinds have no
        // meaningful order here
        _ => Ordering::Equal,
    }
}

fn compare_documents(a: &Document, b: &Document) -> Ordering {
    for ((key_a, value_a), (key_b, value_b)) in a.iter().zip(b.iter()) {
        let ordering = key_a
            .cmp(key_b)
            .then_with(|| compare(value_a, value_b));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_arrays(a: &[Bson], b: &[Bson]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ordering = compare(x, y);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

/// Value equality with numeric widening (`1i32 == 1i64 == 1.0`).
pub fn equals(a: &Bson, b: &Bson) -> bool {
    compare(a, b) == Ordering::Equal
}

/// Truthiness as used by projections and `$cond`.
pub fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(b) => *b,
        other => match Number::of(other) {
            Some(n) => n.as_f64() != 0.0,
            None => true,
        },
    }
}

/// Canonical string key for a value.
///
/// Numerically equal integers share a key regardless of width, so `1` and
/// `1i64` cannot coexist as `_id` in the same collection.
pub fn canonical_key(value: &Bson) -> String {
    match value {
        Bson::Int32(v) => format!("n:{v}"),
        Bson::Int64(v) => format!("n:{v}"),
        Bson::Double(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => format!("n:{}", *v as i64),
        Bson::Double(v) => format!("d:{v}"),
        Bson::String(s) => format!("s:{s}"),
        Bson::ObjectId(oid) => format!("o:{}", oid.to_hex()),
        other => format!("x:{}", other.clone().into_canonical_extjson()),
    }
}

/// Key used for the `doc_key` column. Arrays and regexes cannot identify a
/// document.
pub fn id_key(id: &Bson) -> Result<String, StoreError> {
    match id {
        Bson::Array(_) | Bson::RegularExpression(_) | Bson::Undefined => Err(
            StoreError::InvalidId(format!("can't use {:?} for _id", id.element_type())),
        ),
        other => Ok(canonical_key(other)),
    }
}

/// Resolves a dotted path to a single value. Numeric segments index arrays.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolves a dotted path the way query predicates see it: arrays of
/// documents fan out, so `tags.name` yields every element's `name`.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((first, rest)) = segments.split_first() {
        if let Some(value) = doc.get(*first) {
            collect_path(value, rest, &mut out);
        }
    }
    out
}

fn collect_path<'a>(value: &'a Bson, segments: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(inner) => {
            if let Some(next) = inner.get(*head) {
                collect_path(next, rest, out);
            }
        }
        Bson::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(next) = items.get(index) {
                    collect_path(next, rest, out);
                }
            }
            for item in items {
                if matches!(item, Bson::Document(_)) {
                    collect_path(item, segments, out);
                }
            }
        }
        _ => {}
    }
}

/// Writes `value` at a dotted path, creating intermediate documents.
pub fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<(), StoreError> {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    };
    let Some(parent) = parent else {
        doc.insert(leaf, value);
        return Ok(());
    };

    let mut current = doc;
    for segment in parent.split('.') {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Bson::Document(Document::new()));
        current = match entry {
            Bson::Document(inner) => inner,
            _ => {
                return Err(StoreError::InvalidUpdate(format!(
                    "Cannot create field '{leaf}' in element {{{segment}: ...}} at path '{path}'"
                )))
            }
        };
    }
    current.insert(leaf, value);
    Ok(())
}

/// Mutable access to the value at a dotted path, if present.
pub fn get_path_mut<'a>(doc: &'a mut Document, path: &str) -> Option<&'a mut Bson> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get_mut(first)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get_mut(segment)?,
            Bson::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Removes the value at a dotted path and returns it.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Bson> {
    match path.rsplit_once('.') {
        None => doc.remove(path),
        Some((parent, leaf)) => match get_path_mut(doc, parent)? {
            Bson::Document(inner) => inner.remove(leaf),
            _ => None,
        },
    }
}
