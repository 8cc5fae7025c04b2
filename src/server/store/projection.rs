//! Field projections (`{"name": 1, "_id": 0}`).

use bson::{Bson, Document};

use crate::server::{
    error::store::StoreError,
    store::value::{get_path, is_truthy, remove_path, set_path},
};

#[derive(Debug, Clone)]
pub struct Projection {
    mode: Mode,
    paths: Vec<String>,
    include_id: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Include,
    Exclude,
}

impl Projection {
    /// Parses a projection document. Inclusion and exclusion cannot be mixed,
    /// except for `_id` which may be excluded from an inclusion projection.
    pub fn parse(spec: &Document) -> Result<Self, StoreError> {
        let mut mode = None;
        let mut paths = Vec::new();
        let mut include_id = true;

        for (path, flag) in spec {
            let include = match flag {
                Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
                    is_truthy(flag)
                }
                _ => {
                    return Err(StoreError::InvalidProjection(format!(
                        "unsupported projection value for '{path}'"
                    )))
                }
            };
            if path == "_id" {
                include_id = include;
                continue;
            }
            let wanted = if include { Mode::Include } else { Mode::Exclude };
            match mode {
                Some(existing) if existing != wanted => {
                    return Err(StoreError::InvalidProjection(format!(
                        "cannot mix inclusion and exclusion at '{path}'"
                    )))
                }
                _ => mode = Some(wanted),
            }
            paths.push(path.clone());
        }

        Ok(Self {
            // `{_id: 0}` alone is an exclusion projection
            mode: mode.unwrap_or(Mode::Exclude),
            paths,
            include_id,
        })
    }

    pub fn apply(&self, doc: Document) -> Document {
        match self.mode {
            Mode::Include => {
                let mut out = Document::new();
                if self.include_id {
                    if let Some(id) = doc.get("_id") {
                        out.insert("_id", id.clone());
                    }
                }
                for path in &self.paths {
                    if let Some(value) = get_path(&doc, path) {
                        // Paths were validated against `doc`, so intermediate
                        // segments are documents in `out` as well.
                        let _ = set_path(&mut out, path, value.clone());
                    }
                }
                out
            }
            Mode::Exclude => {
                let mut out = doc;
                if !self.include_id {
                    out.remove("_id");
                }
                for path in &self.paths {
                    remove_path(&mut out, path);
                }
                out
            }
        }
    }
}
