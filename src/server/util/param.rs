//! Named request parameters with required/optional semantics.
//!
//! [`Params`] is an axum extractor holding both the query string and the
//! request body. Lookups go to the source implied by the request method
//! unless the handler picks one: `GET`, `HEAD` and `DELETE` read the query
//! string, every other method reads the body.

use axum::{
    body::Bytes,
    extract::{FromRequest, Query, Request},
    http::Method,
};
use serde_json::{Map, Value};

use crate::server::error::{param::ParamError, AppError, Fault};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Query,
    Body,
}

/// Parsed request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// Body that is not valid JSON, kept as text
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct Params {
    method: Method,
    query: Map<String, Value>,
    body: Body,
}

impl<S> FromRequest<S> for Params
where
    S: Send + Sync,
{
    type Rejection = Fault;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();

        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let mut query = Map::new();
        for (name, value) in pairs {
            // Repeated keys keep their first value
            query.entry(name).or_insert(Value::String(value));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        Ok(Self::new(method, query, Body::parse(&bytes)))
    }
}

impl Body {
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Raw(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

impl Params {
    pub fn new(method: Method, query: Map<String, Value>, body: Body) -> Self {
        Self {
            method,
            query,
            body,
        }
    }

    /// Source read by [`get`](Self::get) and [`get_as`](Self::get_as).
    pub fn default_source(&self) -> Source {
        match self.method {
            Method::GET | Method::HEAD | Method::DELETE => Source::Query,
            _ => Source::Body,
        }
    }

    /// Body fields when the body is a JSON object.
    pub fn body_object(&self) -> Option<&Map<String, Value>> {
        match &self.body {
            Body::Json(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    fn lookup(&self, source: Source, name: &str) -> Option<&Value> {
        match source {
            Source::Query => self.query.get(name),
            Source::Body => self.body_object().and_then(|map| map.get(name)),
        }
    }

    /// Reads `name` from the default source.
    ///
    /// # Arguments
    /// - `name` - Parameter name
    /// - `default` - Value used when the key is absent; `None` makes the
    ///   parameter required
    ///
    /// # Returns
    /// - `Ok(Value)` - The value found, which may be `null` or `""`
    /// - `Err(ParamError::Missing)` - Key absent and no default
    pub fn get(&self, name: &str, default: Option<Value>) -> Result<Value, ParamError> {
        self.get_from(self.default_source(), name, default)
    }

    pub fn get_from(
        &self,
        source: Source,
        name: &str,
        default: Option<Value>,
    ) -> Result<Value, ParamError> {
        match self.lookup(source, name) {
            Some(value) => Ok(value.clone()),
            None => default.ok_or_else(|| ParamError::Missing(name.to_string())),
        }
    }

    /// Reads `name` from the default source and coerces non-null values.
    ///
    /// Returns `Ok(None)` for a null value. A coercion failure is reported as
    /// [`ParamError::Coercion`] naming the parameter.
    pub fn get_as<T, F>(
        &self,
        name: &str,
        default: Option<Value>,
        coerce: F,
    ) -> Result<Option<T>, ParamError>
    where
        F: FnOnce(&Value) -> Result<T, String>,
    {
        self.get_as_from(self.default_source(), name, default, coerce)
    }

    pub fn get_as_from<T, F>(
        &self,
        source: Source,
        name: &str,
        default: Option<Value>,
        coerce: F,
    ) -> Result<Option<T>, ParamError>
    where
        F: FnOnce(&Value) -> Result<T, String>,
    {
        let value = self.get_from(source, name, default)?;
        if value.is_null() {
            return Ok(None);
        }
        coerce(&value)
            .map(Some)
            .map_err(|reason| ParamError::Coercion {
                name: name.to_string(),
                reason,
            })
    }
}

/// Ready-made coercions for [`Params::get_as`].
pub mod coerce {
    use bson::{oid::ObjectId, Bson};
    use serde_json::Value;

    pub fn integer(value: &Value) -> Result<i64, String> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| format!("{n} is not an integer")),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("'{s}' is not an integer")),
            other => Err(format!("{other} is not an integer")),
        }
    }

    pub fn float(value: &Value) -> Result<f64, String> {
        match value {
            Value::Number(n) => n.as_f64().ok_or_else(|| format!("{n} is not a number")),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("'{s}' is not a number")),
            other => Err(format!("{other} is not a number")),
        }
    }

    pub fn boolean(value: &Value) -> Result<bool, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" | "" => Ok(false),
                _ => Err(format!("'{s}' is not a boolean")),
            },
            other => Err(format!("{other} is not a boolean")),
        }
    }

    pub fn string(value: &Value) -> Result<String, String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(format!("{other} is not a string")),
        }
    }

    /// Document identifier as an `_id` filter condition.
    ///
    /// Identifiers arrive as text, yet the stored `_id` may be an `ObjectId`,
    /// a string or an integer. Text that also reads as an `ObjectId` or an
    /// integer yields `{"$in": [..candidates]}`, anything else a plain value.
    pub fn identifier(value: &Value) -> Result<Bson, String> {
        let mut candidates = Vec::new();
        match value {
            Value::String(s) if s.is_empty() => return Err("identifier is empty".to_string()),
            Value::String(s) => {
                if let Ok(oid) = ObjectId::parse_str(s) {
                    candidates.push(Bson::ObjectId(oid));
                }
                if let Ok(n) = s.parse::<i64>() {
                    candidates.push(narrow(n));
                }
                candidates.push(Bson::String(s.clone()));
            }
            Value::Number(n) => match n.as_i64() {
                Some(i) => candidates.push(narrow(i)),
                None => return Err(format!("{n} is not an identifier")),
            },
            other => return Err(format!("{other} is not an identifier")),
        }

        Ok(match candidates.len() {
            1 => candidates.remove(0),
            _ => Bson::Document(bson::doc! { "$in": candidates }),
        })
    }

    fn narrow(n: i64) -> Bson {
        match i32::try_from(n) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(n),
        }
    }
}
