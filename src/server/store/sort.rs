//! Sort specifications (`{"create_time": -1, "_id": 1}`).

use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::server::{
    error::store::StoreError,
    store::value::{compare, get_path, Number},
};

#[derive(Debug, Clone, Default)]
pub struct SortSpec {
    keys: Vec<(String, bool)>,
}

impl SortSpec {
    /// Parses `{path: 1 | -1, ...}`; key order is significant.
    pub fn parse(spec: &Document) -> Result<Self, StoreError> {
        let mut keys = Vec::with_capacity(spec.len());
        for (path, direction) in spec {
            let ascending = match Number::of(direction).map(Number::as_f64) {
                Some(d) if d == 1.0 => true,
                Some(d) if d == -1.0 => false,
                _ => {
                    return Err(StoreError::InvalidSort(format!(
                        "sort direction for '{path}' must be 1 or -1"
                    )))
                }
            };
            keys.push((path.clone(), ascending));
        }
        Ok(Self { keys })
    }

    /// Builds a spec from `(path, ascending)` pairs.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(|(k, asc)| (k.into(), asc)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Orders two documents. Missing fields sort as null.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (path, ascending) in &self.keys {
            let left = get_path(a, path).unwrap_or(&Bson::Null);
            let right = get_path(b, path).unwrap_or(&Bson::Null);
            let ordering = compare(left, right);
            let ordering = if *ascending { ordering } else { ordering.reverse() };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable sort in place.
    pub fn sort(&self, docs: &mut [Document]) {
        if !self.is_empty() {
            docs.sort_by(|a, b| self.compare(a, b));
        }
    }
}
